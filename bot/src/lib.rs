pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod query;
pub mod search;

pub use context::{Context, QuerySettings};
