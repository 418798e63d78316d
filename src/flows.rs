//! Linking flow orchestration on top of the exchange client and the link store.

pub mod link;

pub use link::*;
