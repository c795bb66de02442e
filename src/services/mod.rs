pub mod llm;
pub mod rag;
pub mod session;

pub use llm::LlmFactory;
pub use session::SessionContext;
