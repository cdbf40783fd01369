//! Connection registry
//!
//! Bookkeeping for every peer the server currently knows about.

pub mod registry;

pub use registry::Registry;
