pub mod backends;
pub mod catalog;
pub mod config_loader;
pub mod controller;
pub mod engine;
pub mod panel;
pub mod surface;
