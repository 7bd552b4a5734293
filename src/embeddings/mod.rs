// Embeddings: document extraction, embedding providers and similarity ranking

pub mod document_processor;
pub mod hashing;
pub mod openai;
pub mod provider;
pub mod vector_search;

pub use document_processor::*;
pub use provider::*;
pub use vector_search::*;
