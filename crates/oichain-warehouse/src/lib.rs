pub mod api;
pub mod config;
pub mod extract;
pub mod poll;
pub mod report;
pub mod schema;
pub mod session;
pub mod store;

pub use crate::api::{Fetch, FetchError};
pub use crate::config::{Config, Segment, Symbol};
pub use crate::extract::{extract, ExpiryRow, ExtractError, ExtractionResult};
pub use crate::poll::{FetchOutcome, Poller, RoundReport};
pub use crate::session::Session;
pub use crate::store::SnapshotStore;
