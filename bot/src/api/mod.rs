pub use shared::upstream::*;

pub mod prometheus;
