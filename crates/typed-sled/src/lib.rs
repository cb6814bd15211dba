//! # typed-sled
//!
//! A type-safe wrapper around the sled embedded database.
//!
//! Tables are declared as [`Schema`] implementations tying a tree name to
//! key and value types with explicit binary codecs, so the on-disk format
//! never depends on accidental type changes. Multi-tree atomic operations
//! are exposed through [`transaction::SledTransactional`], which also
//! carries a retry-with-backoff entry point for transient storage
//! failures (sled retries write conflicts internally; aborts carrying a
//! caller error are always passed through untouched).

pub mod codec;
pub mod db;
pub mod error;
pub mod schema;
pub mod transaction;
pub mod tree;

// Re-export main types
pub use codec::{CodecError, CodecResult, KeyCodec, ValueCodec};
pub use db::SledDb;
pub use schema::{Schema, TreeName};
pub use tree::SledTree;
