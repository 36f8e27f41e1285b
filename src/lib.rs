pub mod api;
pub mod app;
pub mod config;
pub mod export;
pub mod refresh;
pub mod services;
pub mod session;
pub mod store;
pub mod summary;
