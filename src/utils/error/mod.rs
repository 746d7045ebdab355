//! Error handling utilities

mod error;

pub use error::{ChatError, Result};
