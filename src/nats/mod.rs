pub mod client;
pub mod messages;

pub use client::TranscriptArchiver;
pub use messages::TranscriptArchiveMessage;
