pub mod chat;
pub mod document;

pub use chat::ChatMessage;
pub use document::{Chunk, Document};
