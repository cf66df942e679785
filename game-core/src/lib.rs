pub mod guess;
pub mod room;
pub mod words;

// Re-export main components
pub use guess::*;
pub use room::*;
pub use words::*;
