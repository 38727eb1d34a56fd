//! Common types for the SPA session workspace
//!
//! Holds what every other crate needs at setup time: the uniform
//! application error, the configuration error type, and the resolved
//! environment document (`AppEnv`).

mod app_error;
pub mod env;
mod error;

pub use app_error::AppError;
pub use env::{AppEnv, EnvSource, load_env};
pub use error::{Error, Result};
