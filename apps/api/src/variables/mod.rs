// Variable resolution: case aggregate → `$token` substitution map.

pub mod resolver;
pub mod spanish;

pub use resolver::{resolve_variables, Variables};
