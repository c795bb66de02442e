pub mod store;
pub mod types;

pub use store::LocalVectorStore;
pub use types::{Collection, SearchResult, VectorError, VectorItem};
