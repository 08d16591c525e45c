#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod key;
pub mod kv;
pub mod loader;
pub mod retriever;
pub mod similarity;
pub mod store;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use key::KeyDeriver;
pub use retriever::Retriever;
pub use similarity::cosine_similarity;
pub use store::VectorStore;
pub use types::{Document, DocumentKey, Embedding, ScoredCandidate, StoredRecord};
