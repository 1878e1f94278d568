//! `dailyfeedback` - A daily feedback log for small teams
//!
//! This library stores dated feedback notes about team members, splits notes
//! into numbered sub-items that can be ticked off, and reads shared snapshots
//! from a URL without writing to them.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod app;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod query;
pub mod record;
pub mod remote;
pub mod render;
pub mod segment;
pub mod storage;
pub mod transfer;

pub use app::{App, DataMode, Draft};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use query::FeedbackFilter;
pub use record::{FeedbackRecord, NewFeedback};
pub use remote::{HttpRemoteSource, RemoteSource};
pub use storage::{RemoteEntryKey, Storage, StorageStats};
