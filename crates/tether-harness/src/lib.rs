#![forbid(unsafe_code)]

//! Test harness and reference fixtures for tether.
//!
//! - [`fixtures`]: the change-notifying [`Node`] host type plus path helpers.
//! - [`recorder`]: [`Recorder`], a shared sink for asserting on emissions.

pub mod fixtures;
pub mod recorder;

pub use fixtures::{Node, descend, path, spine_handler_count, value_path};
pub use recorder::Recorder;
