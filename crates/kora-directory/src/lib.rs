//! # kora-directory
//!
//! SQLite-backed user directory and guided-flow context persistence.
//!
//! The directory is the one collaborator Kora cannot start without: an
//! unreachable database aborts initialization. After startup every
//! failure here is logged and degraded, never fatal.

mod store;

pub use store::Directory;
