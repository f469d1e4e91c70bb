pub mod admin;
pub mod app;
pub mod auth;
pub mod entries;
pub mod error;
pub mod middleware;
pub mod slots;

pub use app::{AppState, AppStateInner, build_router};
pub use error::{ApiError, ApiResult};
