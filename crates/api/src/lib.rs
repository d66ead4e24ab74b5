//! Home-services webhook delivery engine: engine services, background jobs
//! and the management HTTP surface.

pub mod app;
pub mod config;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod services;
