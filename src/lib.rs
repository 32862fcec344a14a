//! Idempotent image optimization for statically served sites.
//!
//! Scans a public image directory, backs up every original once, resizes and
//! re-encodes to png or jpeg, and leaves a sentinel per image so later runs
//! skip finished work.

pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod report;
pub mod scan;
pub mod sentinel;
pub mod transcode;
pub mod util;

pub use error::{Error, Result};
