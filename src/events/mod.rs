pub mod messages;

pub use messages::{ClientEvent, ServerEvent};
