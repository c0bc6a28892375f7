pub mod board;
pub mod client;
pub mod room;
pub mod standings;

// Re-export main components
pub use board::*;
pub use client::*;
pub use room::*;
pub use standings::*;
