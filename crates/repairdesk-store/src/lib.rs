//! # repairdesk-store
//!
//! Durable storage for accepted repair requests.
//!
//! Records live in a single pretty-printed JSON array on disk. The file is
//! append-only from this crate's point of view: [`RecordStore`] can read the
//! whole history and add one record to the end, nothing else.

pub mod records;

mod error;

pub use error::StoreError;
pub use records::RecordStore;
