// Public modules
pub mod chat_completion_chunk;
pub mod chat_request;
pub mod conversation;
pub mod message;

// Re-exports
pub use chat_completion_chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
pub use chat_request::{ChatRequest, DEFAULT_TEMPERATURE};
pub use conversation::Conversation;
pub use message::{Message, Role};
