// Fee schedule: two-tier (bank-wide / lawyer-specific) lookup and guarded writes.

pub mod handlers;
pub mod repository;
pub mod resolver;
pub mod service;

pub use repository::{FeeRepository, PgFeeRepository};
pub use resolver::{resolve_fee, FeeLookup};
