//! Common utilities shared by the resolver, launcher and CLI

pub mod config;
pub mod duration;
pub mod error;
pub mod logging;
pub mod paths;

pub use duration::HumanDuration;
pub use error::{Error, Result};
