mod contributor;
mod error;
pub mod normalize;
mod team;

#[cfg(feature = "client")]
pub mod discord;

#[cfg(feature = "client")]
pub mod upstream;

pub use contributor::*;
pub use error::*;
pub use team::*;

pub type GithubHandle = String;
