pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod middleware;
pub mod model;
pub mod sanitizer;
pub mod service;
pub mod util;

pub use app::build_router;
pub use feed::{transform, FeedTransformer, TransformReport, ValidationError};
pub use sanitizer::sanitize;
