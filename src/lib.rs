//! MmpCoin consensus engine.
//!
//! This crate re-exports the workspace members. Most users will want
//! [`chain::pow`] for the difficulty engine and [`common::network`] for
//! per-network parameters.
#[cfg(feature = "mmpcoin-chain")]
pub use mmpcoin_chain as chain;
#[cfg(feature = "mmpcoin-common")]
pub use mmpcoin_common as common;
