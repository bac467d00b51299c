//! MmpCoin peer network. Eg. *Mainnet*.
use bitcoin_hashes::Hash;

use crate::block::genesis;
use crate::block::{Bits, BlockHash, BlockHeader, Target};
use crate::params::ParamsTree;

/// MmpCoin peer network.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Network {
    /// The live network.
    Mainnet,
    /// The public test network.
    Testnet,
    /// The local regression test network.
    Regtest,
}

impl Default for Network {
    fn default() -> Self {
        Self::Mainnet
    }
}

impl Network {
    /// Return the default listen port for the network.
    pub fn port(&self) -> u16 {
        match self {
            Network::Mainnet => 10320,
            Network::Testnet => 10420,
            Network::Regtest => 10520,
        }
    }

    /// Get the network magic number for this network. The bytes are
    /// rarely used upper ASCII, not valid as UTF-8, and produce a large
    /// 32-bit integer with any alignment.
    pub fn magic(&self) -> u32 {
        match self {
            Network::Mainnet => 0xc0c0c0c0,
            Network::Testnet => 0xdcb7c1fc,
            Network::Regtest => 0xc0c0c0c0,
        }
    }

    /// Return the short string representation of this network.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }

    /// The proof-of-work limit in compact form. This is also the
    /// difficulty of the genesis block.
    pub fn pow_limit_bits(&self) -> Bits {
        match self {
            Network::Mainnet => 0x1e0ffff0,
            Network::Testnet => 0x1e0ffff0,
            Network::Regtest => 0x207fffff,
        }
    }

    /// The proof-of-work limit: the easiest target a block may claim.
    pub fn pow_limit(&self) -> Target {
        let (limit, _, _) = Target::from_compact(self.pow_limit_bits());
        limit
    }

    /// Get the consensus parameters for this network.
    pub fn params(&self) -> ParamsTree {
        ParamsTree::for_network(*self)
    }

    /// Get the genesis block header.
    ///
    /// ```
    /// use mmpcoin_common::network::Network;
    ///
    /// let network = Network::Mainnet;
    /// let genesis = network.genesis();
    ///
    /// assert_eq!(network.genesis_hash(), genesis.block_hash());
    /// ```
    pub fn genesis(&self) -> BlockHeader {
        BlockHeader {
            version: 1,
            prev_blockhash: BlockHash::from_inner([0; 32]),
            merkle_root: BlockHash::from_inner(*genesis::MERKLE_ROOT),
            time: genesis::TIME,
            bits: self.pow_limit_bits(),
            nonce: match self {
                Network::Mainnet => 2000076429,
                Network::Testnet => 542590,
                Network::Regtest => 0,
            },
        }
    }

    /// Get the hash of the genesis block of this network.
    pub fn genesis_hash(&self) -> BlockHash {
        let hash = match self {
            Self::Mainnet => genesis::MAINNET,
            Self::Testnet => genesis::TESTNET,
            Self::Regtest => genesis::REGTEST,
        };
        BlockHash::from_inner(*hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ports_and_magic() {
        assert_eq!(Network::Mainnet.port(), 10320);
        assert_eq!(Network::Testnet.port(), 10420);
        assert_eq!(Network::Regtest.port(), 10520);

        assert_eq!(Network::Mainnet.magic(), 0xc0c0c0c0);
        assert_eq!(Network::Testnet.magic(), 0xdcb7c1fc);
        assert_eq!(Network::Regtest.magic(), 0xc0c0c0c0);
    }

    #[test]
    fn test_genesis_hashes() {
        for network in &[Network::Mainnet, Network::Testnet, Network::Regtest] {
            assert_eq!(
                network.genesis().block_hash(),
                network.genesis_hash(),
                "genesis header of {} must hash to the known value",
                network.as_str()
            );
        }
    }

    #[test]
    fn test_pow_limit_round_trips() {
        for network in &[Network::Mainnet, Network::Testnet, Network::Regtest] {
            assert_eq!(network.pow_limit().to_compact(), network.pow_limit_bits());
        }
    }

    #[test]
    fn test_genesis_meets_pow_limit() {
        for network in &[Network::Mainnet, Network::Testnet, Network::Regtest] {
            let (target, negative, overflow) = Target::from_compact(network.genesis().bits);

            assert!(!negative && !overflow);
            assert!(target <= network.pow_limit());
        }
    }
}
