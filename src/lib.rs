//! Resumable, session-scoped directory listing.
//!
//! A listing is streamed one entry per call to a row-oriented consumer, such
//! as a database's set-returning function, across calls that share no stack
//! state. The first call opens a cursor over the directory and registers it
//! under a [`SessionToken`]; each following call classifies one entry and
//! advances the cursor; the call that finds the directory exhausted, or the
//! row limit reached, removes the session again.
//!
//! ```rust
//! # use dirstream::{DirLister, EntryRecord, ListingConfig};
//! let lister = DirLister::with_config(ListingConfig::default());
//! let token = lister.open(100, "./src").unwrap();
//! let mut records: Vec<EntryRecord> = Vec::new();
//! while let Some(record) = lister.next(token).unwrap() {
//!     assert_eq!(record.attributes.len(), 10);
//!     records.push(record);
//! }
//! assert!(records.iter().any(|r| r.name == "lib.rs"));
//! assert!(lister.registry().is_empty().unwrap());
//! ```
//!
//! The same session can be consumed as a stream from async code:
//!
//! ```rust
//! # tokio_test::block_on(async {
//! # use dirstream::{DirLister, ListingConfig};
//! # use futures_lite::StreamExt;
//! let lister = DirLister::with_config(ListingConfig::default());
//! let entries = dirstream::list_dir(lister, 2, "./src".into()).await.unwrap();
//! let entries: Vec<_> = entries.collect().await;
//! assert_eq!(entries.len(), 2);
//! # })
//! ```
//!
//! A record serializes to something like
//! ```json
//! {
//!   "attributes": "-rw-r--r--",
//!   "size": 1581,
//!   "modified": "11/20/25 00:35:58.153 UTC",
//!   "kind": null,
//!   "name": "Cargo.toml"
//! }
//! ```

mod config;
mod cursor;
mod entry;
mod errors;
mod listing;
mod path;
mod registry;
pub mod row;
mod stream;
pub mod utils;

pub use config::DEFAULT_TIME_FORMAT;
pub use config::ErrorPolicy;
pub use config::ListingConfig;
pub use config::TimeZoneChoice;
pub use entry::EntryRecord;
pub use entry::LINK_POINTER;
pub use entry::SpecialKind;
pub use errors::Error;
pub use listing::CallState;
pub use listing::DirLister;
pub use listing::ListingCall;
pub use listing::Next;
pub use path::encode;
pub use registry::SessionRegistry;
pub use registry::SessionToken;
pub use row::RecordSink;
pub use row::TextSink;
pub use row::TupleSink;
pub use stream::list_dir;
pub use stream::session_stream;

#[cfg(feature = "test_utils")]
pub(crate) mod test_utils;
#[cfg(feature = "test_utils")]
pub use test_utils::TestRoot;
