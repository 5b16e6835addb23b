//! Database access: bounded pool construction and dynamic row decoding.

pub mod pool;
pub mod rows;

pub use pool::{create_pool, create_pool_lazy, map_acquire_error};
pub use rows::row_to_json;
