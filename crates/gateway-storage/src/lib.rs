pub mod database;
pub mod dual_write;
pub mod models;
pub mod vector;

pub use database::{Database, TraceFilter};
pub use dual_write::DualWriteCoordinator;
pub use vector::PgVectorStore;
