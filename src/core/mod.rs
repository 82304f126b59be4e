pub mod currency;
pub mod error;
pub mod shutdown;

pub use error::{AppError, Result};
