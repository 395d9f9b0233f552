//! # nsq_app
//!
//! Composition root for the NSQ publishers: tracing, config loading and CLI helpers.

pub mod cli;
pub mod config_loader;
pub mod tracing_setup;
