//! Fleetdash: a terminal admin dashboard for a fleet of container clients.
//!
//! This library exposes the core modules for use by the binary and by tests.

pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod forms;
pub mod model;
pub mod monitor;
pub mod reconcile;
pub mod scheduler;
pub mod source;
pub mod view;
