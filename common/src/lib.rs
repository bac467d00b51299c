//! Library of common MmpCoin consensus functionality shared by all crates.
#![allow(clippy::type_complexity)]
#![deny(missing_docs, unsafe_code)]
pub mod block;
pub mod network;
pub mod params;

pub use bitcoin_hashes;
pub use nonempty;
