//! Content provider abstraction.
//!
//! Every source of episodes implements the [`Provider`] trait and is looked
//! up by name through the [`ProviderRegistry`]. A scan hands each provider the
//! watch-list entries addressed to it plus a [`ShowSink`] feeding the shared
//! merge queue.

mod context;
pub mod json_feed;
pub mod naming;
mod registry;
mod traits;
mod types;

pub use context::{ScanContext, ScanEvent, ShowSink};
pub use json_feed::JsonFeedProvider;
pub use registry::ProviderRegistry;
pub use traits::Provider;
pub use types::*;
