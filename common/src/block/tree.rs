//! Types and functions relating to chains of block headers.
use std::cmp::Ordering;

use thiserror::Error;

use crate::block::time::MEDIAN_TIME_SPAN;
use crate::block::{Bits, BlockHash, BlockTime, Height};

/// An error related to extending the header chain.
#[derive(Debug, Error)]
pub enum Error {
    /// The block's proof-of-work is invalid.
    #[error("invalid block proof-of-work")]
    InvalidBlockPoW,

    /// The block's difficulty target is invalid.
    #[error("invalid block difficulty target: {0:#010x}, expected {1:#010x}")]
    InvalidBlockTarget(Bits, Bits),

    /// The block timestamp is invalid.
    #[error("block timestamp {0} is invalid")]
    InvalidBlockTime(BlockTime, Ordering),

    /// The block doesn't connect to the current tip.
    #[error("block parent {0} is not the current tip")]
    InvalidBlockParent(BlockHash),
}

/// Read-only view of a block on the active chain and its ancestry.
///
/// This is the capability the difficulty engine requires from the
/// validator: a cursor that can report its own height, timestamp and
/// difficulty bits, and navigate towards genesis. The cursor must stay
/// consistent for the duration of an engine call; the validator pins the
/// tip before invoking it.
pub trait ChainView: Clone {
    /// Height of this block.
    fn height(&self) -> Height;
    /// Timestamp of this block.
    fn time(&self) -> BlockTime;
    /// Compact difficulty target of this block.
    fn bits(&self) -> Bits;
    /// The parent block, or `None` at genesis.
    fn parent(&self) -> Option<Self>;
    /// The ancestor at the given height, or `None` if it is unknown or
    /// above this block.
    fn ancestor(&self, height: Height) -> Option<Self>;

    /// The median timestamp over this block and up to ten of its
    /// ancestors. Block timestamps are set by miners; the median is the
    /// consensus lower bound used wherever a single timestamp would be
    /// too easy to game.
    fn median_time_past(&self) -> BlockTime {
        let mut times = Vec::with_capacity(MEDIAN_TIME_SPAN as usize);
        let mut cursor = self.clone();

        loop {
            times.push(cursor.time());
            if times.len() == MEDIAN_TIME_SPAN as usize {
                break;
            }
            match cursor.parent() {
                Some(parent) => cursor = parent,
                None => break,
            }
        }
        times.sort_unstable();
        times[times.len() / 2]
    }
}
