pub mod types;
pub mod errors;
pub mod middleware;
pub mod clients;

pub use errors::{ApiError, AppError, AppResult, WikiWriteError};
pub use types::*;
