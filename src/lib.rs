pub mod camera;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod scan;
