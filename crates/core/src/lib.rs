//! Domain types shared by every Toonify crate.
//!
//! Nothing in here performs I/O. The job model, its status machine, the
//! clock abstraction used for expiry, and the domain error type live here
//! so the store, worker and API crates agree on a single vocabulary.

pub mod clock;
pub mod error;
pub mod job;
pub mod types;
