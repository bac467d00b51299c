//! An in-memory chain of block headers.
use std::cmp::Ordering;

use nonempty::NonEmpty;

use mmpcoin_common::block::time::{self, Clock};
use mmpcoin_common::block::tree::{ChainView, Error};
use mmpcoin_common::block::{Bits, BlockHeader, BlockTime, CachedBlock, Height};
use mmpcoin_common::network::Network;
use mmpcoin_common::params::ParamsTree;

use crate::pow;

/// An in-memory header chain, always rooted at genesis.
///
/// This is the difficulty engine's view of the world: it holds the active
/// chain only and can only grow at the tip. Fork handling, persistence
/// and reorgs live with the block storage layer, which replays headers
/// into a fresh chain when the tip moves.
#[derive(Debug, Clone)]
pub struct HeaderChain {
    chain: NonEmpty<CachedBlock>,
    params: ParamsTree,
}

impl HeaderChain {
    /// Create a new header chain containing the network's genesis block.
    pub fn new(network: Network) -> Self {
        let genesis = network.genesis();

        Self {
            chain: NonEmpty::new(CachedBlock {
                height: 0,
                hash: genesis.block_hash(),
                header: genesis,
            }),
            params: network.params(),
        }
    }

    /// Return the height of the chain.
    pub fn height(&self) -> Height {
        self.chain.tail.len() as Height
    }

    /// Get the block at the given height.
    pub fn get(&self, height: Height) -> Option<&BlockHeader> {
        self.chain.get(height as usize).map(|blk| &blk.header)
    }

    /// Return a cursor at the tip of the chain.
    pub fn tip(&self) -> Cursor {
        Cursor {
            chain: &self.chain,
            height: self.height(),
        }
    }

    /// The consensus parameter tree governing this chain.
    pub fn params(&self) -> &ParamsTree {
        &self.params
    }

    /// The difficulty bits required of the next block, given its header.
    pub fn next_work_required(&self, header: &BlockHeader, clock: &impl Clock) -> Bits {
        pow::next_work_required(Some(&self.tip()), header, &self.params, clock)
    }

    /// Attempt to extend the chain with a block. Performs header
    /// validation: parent linkage, difficulty bits, proof-of-work and
    /// timestamp sanity. `pow_hash` is the block's scrypt digest,
    /// computed by the caller.
    pub fn extend_tip(
        &mut self,
        header: BlockHeader,
        pow_hash: &[u8; 32],
        clock: &impl Clock,
    ) -> Result<Height, Error> {
        let tip = self.chain.last();
        let height = tip.height + 1;

        if header.prev_blockhash != tip.hash {
            return Err(Error::InvalidBlockParent(header.prev_blockhash));
        }

        let cursor = self.tip();
        let required = pow::next_work_required(Some(&cursor), &header, &self.params, clock);
        if header.bits != required {
            return Err(Error::InvalidBlockTarget(header.bits, required));
        }
        if !pow::check_proof_of_work(pow_hash, header.bits, self.params.select(height)) {
            return Err(Error::InvalidBlockPoW);
        }

        // A timestamp is accepted as valid if it is greater than the
        // median timestamp of the previous blocks, and no more than two
        // hours ahead of the clock.
        if header.time <= cursor.median_time_past() {
            return Err(Error::InvalidBlockTime(header.time, Ordering::Less));
        }
        if header.time > clock.block_time() + time::MAX_FUTURE_BLOCK_TIME {
            return Err(Error::InvalidBlockTime(header.time, Ordering::Greater));
        }

        let hash = header.block_hash();
        self.chain.push(CachedBlock {
            height,
            hash,
            header,
        });

        Ok(height)
    }
}

/// A cheap read-only cursor into a [`HeaderChain`].
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    chain: &'a NonEmpty<CachedBlock>,
    height: Height,
}

impl<'a> Cursor<'a> {
    fn block(&self) -> &'a CachedBlock {
        self.chain
            .get(self.height as usize)
            .expect("cursors only point at blocks on the chain")
    }

    /// The header under the cursor.
    pub fn header(&self) -> &'a BlockHeader {
        &self.block().header
    }
}

impl ChainView for Cursor<'_> {
    fn height(&self) -> Height {
        self.height
    }

    fn time(&self) -> BlockTime {
        self.block().header.time
    }

    fn bits(&self) -> Bits {
        self.block().header.bits
    }

    fn parent(&self) -> Option<Self> {
        self.ancestor(self.height.checked_sub(1)?)
    }

    fn ancestor(&self, height: Height) -> Option<Self> {
        if height > self.height {
            return None;
        }
        Some(Self {
            chain: self.chain,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mmpcoin_common::bitcoin_hashes::Hash;
    use mmpcoin_common::block::time::LocalTime;
    use mmpcoin_common::block::BlockHash;

    /// A proof-of-work digest low enough for any sane target.
    const EASY_POW_HASH: [u8; 32] = [0; 32];

    fn next_header(chain: &HeaderChain, spacing: BlockTime, clock: &LocalTime) -> BlockHeader {
        let tip = chain.tip();
        let mut header = BlockHeader {
            prev_blockhash: tip.block().hash,
            time: tip.time() + spacing,
            nonce: 0,
            ..*tip.header()
        };
        header.bits = chain.next_work_required(&header, clock);
        header
    }

    #[test]
    fn test_genesis_chain() {
        let chain = HeaderChain::new(Network::Mainnet);

        assert_eq!(chain.height(), 0);
        assert_eq!(chain.tip().bits(), 0x1e0ffff0);
        assert_eq!(chain.get(0), Some(&Network::Mainnet.genesis()));
        assert_eq!(chain.get(1), None);
    }

    #[test]
    fn test_extend_tip() {
        let mut chain = HeaderChain::new(Network::Regtest);
        let clock = LocalTime::from_block_time(chain.tip().time() + 60 * 60);

        for height in 1..=24 {
            let header = next_header(&chain, 60, &clock);
            assert_eq!(
                chain.extend_tip(header, &EASY_POW_HASH, &clock).unwrap(),
                height
            );
        }
        assert_eq!(chain.height(), 24);
        // Regtest never retargets.
        assert_eq!(chain.tip().bits(), 0x207fffff);
    }

    #[test]
    fn test_extend_tip_rejects_bad_parent() {
        let mut chain = HeaderChain::new(Network::Regtest);
        let clock = LocalTime::from_block_time(chain.tip().time() + 60 * 60);

        let mut header = next_header(&chain, 60, &clock);
        header.prev_blockhash = BlockHash::from_inner([0xab; 32]);

        assert!(matches!(
            chain.extend_tip(header, &EASY_POW_HASH, &clock),
            Err(Error::InvalidBlockParent(_))
        ));
    }

    #[test]
    fn test_extend_tip_rejects_bad_target() {
        let mut chain = HeaderChain::new(Network::Regtest);
        let clock = LocalTime::from_block_time(chain.tip().time() + 60 * 60);

        let mut header = next_header(&chain, 60, &clock);
        header.bits = 0x1d00ffff;

        assert!(matches!(
            chain.extend_tip(header, &EASY_POW_HASH, &clock),
            Err(Error::InvalidBlockTarget(0x1d00ffff, 0x207fffff))
        ));
    }

    #[test]
    fn test_extend_tip_rejects_insufficient_work() {
        let mut chain = HeaderChain::new(Network::Regtest);
        let clock = LocalTime::from_block_time(chain.tip().time() + 60 * 60);

        let header = next_header(&chain, 60, &clock);

        assert!(matches!(
            chain.extend_tip(header, &[0xff; 32], &clock),
            Err(Error::InvalidBlockPoW)
        ));
    }

    #[test]
    fn test_extend_tip_rejects_bad_timestamps() {
        let mut chain = HeaderChain::new(Network::Regtest);
        let clock = LocalTime::from_block_time(chain.tip().time() + 60 * 60);

        // At or below the median time past.
        let mut header = next_header(&chain, 60, &clock);
        header.time = chain.tip().median_time_past();
        assert!(matches!(
            chain.extend_tip(header, &EASY_POW_HASH, &clock),
            Err(Error::InvalidBlockTime(_, Ordering::Less))
        ));

        // Too far in the future.
        let mut header = next_header(&chain, 60, &clock);
        header.time = clock.block_time() + time::MAX_FUTURE_BLOCK_TIME + 1;
        assert!(matches!(
            chain.extend_tip(header, &EASY_POW_HASH, &clock),
            Err(Error::InvalidBlockTime(_, Ordering::Greater))
        ));
    }

    #[test]
    fn test_cursor_median_time_past() {
        let mut chain = HeaderChain::new(Network::Regtest);
        let clock = LocalTime::from_block_time(chain.tip().time() + 24 * 60 * 60);

        for _ in 0..20 {
            let header = next_header(&chain, 60, &clock);
            chain.extend_tip(header, &EASY_POW_HASH, &clock).unwrap();
        }
        let tip = chain.tip();

        // Median of the last 11 timestamps, spaced a minute apart.
        assert_eq!(tip.median_time_past(), tip.time() - 5 * 60);
        assert_eq!(
            chain.tip().ancestor(3).unwrap().median_time_past(),
            chain.get(2).unwrap().time
        );
    }
}
