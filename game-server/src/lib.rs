use std::sync::Arc;
use warp::Filter;

use crate::registry::RoomRegistry;

pub mod config;
pub mod registry;
pub mod timers;
pub mod websocket;

pub fn create_routes(registry: Arc<RoomRegistry>) -> warp::filters::BoxedFilter<(impl warp::Reply,)> {
    let registry_filter = warp::any().map({
        let registry = registry.clone();
        move || registry.clone()
    });

    // WebSocket endpoint
    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(registry_filter)
        .map(|ws: warp::ws::Ws, registry| {
            ws.on_upgrade(move |socket| websocket::handle_connection(socket, registry))
        });

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET"]);

    websocket
        .or(health)
        .with(cors)
        .with(warp::log("word_rooms"))
        .boxed()
}
