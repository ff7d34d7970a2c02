//! Common types, wire protocol definitions, and errors shared across `jsoncrypt` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
