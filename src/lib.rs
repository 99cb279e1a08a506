//! Typed client and terminal front end for a curriculum-content generation
//! backend: generation requests, products, generation jobs, the upload queue
//! and dashboard metrics.

pub mod api;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod tracker;
pub mod ui;

pub use api::{Api, ApiError, ApiVersion, HttpTransport, Transport};
pub use config::GenboardConfig;
pub use error::GenboardError;
