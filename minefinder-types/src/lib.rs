pub mod board;
pub mod errors;
pub mod messages;
pub mod room;

// Re-export all types
pub use board::*;
pub use errors::*;
pub use messages::*;
pub use room::*;
