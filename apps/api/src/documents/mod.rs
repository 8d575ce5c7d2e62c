// Document generation: stamps and receipts, their templates, and payload storage.
// Layout runs inside tokio::task::spawn_blocking; payloads go to S3 before the row is written.

pub mod assembler;
pub mod handlers;
pub mod storage;
pub mod types;

pub use storage::{PayloadStore, S3PayloadStore};
