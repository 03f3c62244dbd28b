pub mod cache;
pub mod client;

pub use cache::CachedEmbeddingClient;
pub use client::{EmbeddingClientConfig, HttpEmbeddingClient};
