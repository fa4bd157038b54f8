//! Process-wide `tracing` setup with a filter that can be reloaded from settings.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
