use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Typed reasons for a failed rejoin, so the client can distinguish
/// "try again" from "this room is gone".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum RejoinFailReason {
    InvalidParams,
    RoomNotFound,
    PlayerNotFound,
}
