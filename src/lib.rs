pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::error::{AppError, Result};
