//! CLI command implementations.

pub mod inspect;
pub mod load;
pub mod parse;
pub mod platform;
pub mod resolve;
