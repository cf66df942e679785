pub mod daily_completions;
pub mod game_results;
pub mod games;
pub mod guesses;

pub mod prelude {
    pub use super::daily_completions::Entity as DailyCompletions;
    pub use super::game_results::Entity as GameResults;
    pub use super::games::Entity as Games;
    pub use super::guesses::Entity as Guesses;
}
