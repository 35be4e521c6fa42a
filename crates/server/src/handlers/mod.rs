//! HTTP request handlers.

pub mod serve;
pub mod upload;

pub use serve::*;
pub use upload::*;
