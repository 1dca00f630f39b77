//! Console front end for the triage queue.
mod app;
mod config;
mod console;
mod effects;
mod logging;
mod persistence;
mod render;

pub use app::run_app;
