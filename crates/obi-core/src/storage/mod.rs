//! # Persistent Storage
//!
//! redb-backed implementation of [`crate::store::GraduationStore`].

mod redb_store;

pub use redb_store::RedbStore;
