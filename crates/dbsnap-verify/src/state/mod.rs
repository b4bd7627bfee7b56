//! State document, transition table and persistence
//!
//! - [`types`]: the states and their transition table
//! - [`document`]: the persisted [`StateDocument`]
//! - [`store`]: the [`StateStore`] seam with S3 and file backends, plus an
//!   in-memory one behind the `test-utils` feature
//! - [`session`]: a document bound to its store, persisting every transition

pub mod document;
pub mod file;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod s3;
pub mod session;
pub mod store;
pub mod types;

pub use document::StateDocument;
pub use file::FileStore;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryStore;
pub use s3::S3Store;
pub use session::StateSession;
pub use store::{AnyStore, StateStore, Versioned};
pub use types::{PersistenceTarget, StateRecord, VerifyState};
