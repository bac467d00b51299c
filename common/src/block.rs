//! Block header types and functions.
pub mod genesis;
pub mod target;
pub mod time;
pub mod tree;

use std::ops::Deref;

use bitcoin_hashes::{sha256d, Hash};

/// Hash of a block header.
pub type BlockHash = sha256d::Hash;

/// Difficulty target of a block.
pub type Target = target::Uint256;

/// Compact difficulty bits (target) of a block.
pub type Bits = u32;

/// Height of a block.
pub type Height = u64;

/// Block timestamp, as seconds since Epoch.
///
/// Stored as 32 bits on the wire; all timestamp arithmetic in the
/// consensus code is carried out in `i64`, since timestamps are
/// adversarial and differences may be negative.
pub type BlockTime = u32;

/// An MmpCoin block header.
///
/// The layout matches the 80-byte wire serialization inherited from the
/// Bitcoin lineage. The *proof-of-work* hash of a header is scrypt and is
/// computed by miners and verifiers outside of this crate; the block *id*
/// returned by [`BlockHeader::block_hash`] is double-SHA256.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version.
    pub version: i32,
    /// Hash of the parent block.
    pub prev_blockhash: BlockHash,
    /// Root of the transaction merkle tree.
    pub merkle_root: sha256d::Hash,
    /// Block timestamp, set by the miner.
    pub time: BlockTime,
    /// Compact difficulty target the block claims to meet.
    pub bits: Bits,
    /// Proof-of-work nonce.
    pub nonce: u32,
}

impl BlockHeader {
    /// Serialize the header into its 80-byte wire representation.
    /// Integers are little-endian; hashes are in internal byte order.
    pub fn serialize(&self) -> [u8; 80] {
        let mut bytes = [0; 80];

        bytes[0..4].copy_from_slice(&self.version.to_le_bytes());
        bytes[4..36].copy_from_slice(&self.prev_blockhash.into_inner());
        bytes[36..68].copy_from_slice(&self.merkle_root.into_inner());
        bytes[68..72].copy_from_slice(&self.time.to_le_bytes());
        bytes[72..76].copy_from_slice(&self.bits.to_le_bytes());
        bytes[76..80].copy_from_slice(&self.nonce.to_le_bytes());

        bytes
    }

    /// Compute the block id: double-SHA256 over the serialized header.
    pub fn block_hash(&self) -> BlockHash {
        BlockHash::hash(&self.serialize())
    }
}

/// A block that lives on the active chain, with its height and id cached.
#[derive(Debug, Clone, Copy)]
pub struct CachedBlock {
    /// Height of the block.
    pub height: Height,
    /// Cached block id.
    pub hash: BlockHash,
    /// The block header.
    pub header: BlockHeader,
}

impl Deref for CachedBlock {
    type Target = BlockHeader;

    fn deref(&self) -> &Self::Target {
        &self.header
    }
}
