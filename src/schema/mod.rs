//! Schema module - Configuration and snapshot types for neuroevolution runs.

mod config;
mod snapshot;

pub use config::*;
pub use snapshot::*;
