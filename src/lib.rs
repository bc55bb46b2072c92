//! Terminal system dashboard.
//!
//! [`system`] samples the OS on independent schedules and publishes immutable
//! snapshots; [`app`] and [`ui`] pull the latest of each and draw them.

pub mod action;
pub mod app;
pub mod config;
pub mod event;
pub mod format;
pub mod logging;
pub mod system;
pub mod ui;
