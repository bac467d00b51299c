//! Per-network consensus parameters and their height-indexed selection.
//!
//! Every network carries three parameter records inherited from the
//! Dogecoin lineage: the *legacy* record active from genesis, and the
//! *digishield* and *auxpow* records, both pinned to a height that was
//! never scheduled. The records are arranged in a small binary search
//! tree keyed by effective height, and [`ParamsTree::select`] resolves
//! the record with the greatest effective height at or below a target
//! height. The layout is preserved verbatim from the reference client:
//! changing it would change which record governs a given height, and
//! with it the consensus rules.
use crate::block::{Bits, Height, Target};
use crate::network::Network;

/// Effective height of the records that were never scheduled for
/// activation.
pub const HEIGHT_NEVER: Height = u32::MAX as Height;

/// Consensus parameters for one era of a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Params {
    /// Height at which this record becomes active.
    pub height_effective: Height,
    /// Maximum (easiest) proof-of-work target.
    pub pow_limit: Target,
    /// Expected time between blocks, in seconds.
    pub pow_target_spacing: i64,
    /// Expected time of a full retargeting period, in seconds.
    pub pow_target_timespan: i64,
    /// Whether blocks may fall back to the minimum difficulty when the
    /// chain stalls.
    pub allow_min_difficulty_blocks: bool,
    /// Whether the digishield-era stall exception applies.
    pub allow_digishield_min_difficulty: bool,
    /// Whether difficulty retargeting is disabled entirely (regtest).
    pub no_pow_retargeting: bool,
    /// Whether the per-block digishield retarget formula is active.
    pub digishield_difficulty_calculation: bool,
    /// Whether block rewards follow the simplified schedule.
    pub simplified_rewards: bool,
    /// Chain id embedded in merge-mined block versions.
    pub auxpow_chain_id: u32,
    /// Whether merge-mined blocks must carry our chain id.
    pub strict_chain_id: bool,
    /// Whether blocks without merge-mining commitments are accepted.
    pub allow_legacy_blocks: bool,
    /// Number of blocks before a coinbase output may be spent.
    pub coinbase_maturity: u16,
}

impl Params {
    /// Number of blocks between difficulty adjustments.
    pub fn difficulty_adjustment_interval(&self) -> Height {
        (self.pow_target_timespan / self.pow_target_spacing) as Height
    }

    /// The proof-of-work limit in compact form.
    pub fn pow_limit_bits(&self) -> Bits {
        self.pow_limit.to_compact()
    }
}

/// The binary search tree of consensus parameter records for a network.
#[derive(Debug, Clone)]
pub struct ParamsTree {
    root: Node,
}

#[derive(Debug, Clone)]
struct Node {
    params: Params,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl ParamsTree {
    /// Assemble the tree from the three era records: digishield at the
    /// root, legacy to its left, auxpow to its right.
    pub fn new(legacy: Params, digishield: Params, auxpow: Params) -> Self {
        Self {
            root: Node {
                params: digishield,
                left: Some(Box::new(Node {
                    params: legacy,
                    left: None,
                    right: None,
                })),
                right: Some(Box::new(Node {
                    params: auxpow,
                    left: None,
                    right: None,
                })),
            },
        }
    }

    /// Build the parameter tree for the given network.
    pub fn for_network(network: Network) -> Self {
        let legacy = Params {
            height_effective: 0,
            pow_limit: network.pow_limit(),
            pow_target_spacing: 60,
            pow_target_timespan: 20 * 60,
            allow_min_difficulty_blocks: false,
            allow_digishield_min_difficulty: false,
            no_pow_retargeting: network == Network::Regtest,
            digishield_difficulty_calculation: false,
            simplified_rewards: false,
            auxpow_chain_id: 0x00e6,
            strict_chain_id: network != Network::Mainnet,
            allow_legacy_blocks: true,
            coinbase_maturity: match network {
                Network::Mainnet => 90,
                Network::Testnet | Network::Regtest => 30,
            },
        };

        let digishield = Params {
            height_effective: HEIGHT_NEVER,
            pow_target_timespan: 60,
            digishield_difficulty_calculation: true,
            simplified_rewards: true,
            coinbase_maturity: 240,
            ..legacy.clone()
        };

        let auxpow = Params {
            allow_legacy_blocks: network == Network::Testnet,
            ..digishield.clone()
        };

        Self::new(legacy, digishield, auxpow)
    }

    /// Select the record governing the given height: the one with the
    /// greatest effective height at or below it.
    pub fn select(&self, height: Height) -> &Params {
        self.root.select(height)
    }
}

impl Node {
    fn select(&self, height: Height) -> &Params {
        if height < self.params.height_effective {
            if let Some(left) = &self.left {
                return left.select(height);
            }
        } else if height > self.params.height_effective {
            if let Some(right) = &self.right {
                let candidate = right.select(height);
                if candidate.height_effective <= height {
                    return candidate;
                }
            }
        }
        // No better match at or below the target height.
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quickcheck_macros::quickcheck;

    #[test]
    fn test_mainnet_params() {
        let tree = ParamsTree::for_network(Network::Mainnet);
        let params = tree.select(0);

        assert_eq!(params.height_effective, 0);
        assert_eq!(params.pow_target_spacing, 60);
        assert_eq!(params.pow_target_timespan, 20 * 60);
        assert_eq!(params.difficulty_adjustment_interval(), 20);
        assert_eq!(params.pow_limit_bits(), 0x1e0ffff0);
        assert_eq!(params.auxpow_chain_id, 0x00e6);
        assert!(params.allow_legacy_blocks);
        assert!(!params.no_pow_retargeting);
    }

    #[test]
    fn test_regtest_params() {
        let tree = ParamsTree::for_network(Network::Regtest);
        let params = tree.select(100);

        assert_eq!(params.pow_limit_bits(), 0x207fffff);
        assert!(params.no_pow_retargeting);
    }

    #[quickcheck]
    fn prop_selection_is_sound(height: Height) -> bool {
        // The digishield and auxpow records are pinned beyond any real
        // height, so every height resolves to the legacy record.
        for network in &[Network::Mainnet, Network::Testnet, Network::Regtest] {
            let tree = ParamsTree::for_network(*network);
            let params = tree.select(height);

            if params.height_effective > height {
                return false;
            }
            if height < HEIGHT_NEVER && params.height_effective != 0 {
                return false;
            }
        }
        true
    }

    #[test]
    fn test_selection_prefers_greatest_effective_height() {
        let tree = ParamsTree::for_network(Network::Mainnet);
        let mut legacy = tree.select(0).clone();
        let mut digishield = legacy.clone();
        let mut auxpow = legacy.clone();

        legacy.height_effective = 0;
        digishield.height_effective = 1000;
        digishield.pow_target_timespan = 60;
        auxpow.height_effective = 2000;
        auxpow.allow_legacy_blocks = false;

        let tree = ParamsTree::new(legacy, digishield, auxpow);

        assert_eq!(tree.select(0).height_effective, 0);
        assert_eq!(tree.select(999).height_effective, 0);
        assert_eq!(tree.select(1000).height_effective, 1000);
        assert_eq!(tree.select(1999).height_effective, 1000);
        assert_eq!(tree.select(2000).height_effective, 2000);
        assert_eq!(tree.select(50000).height_effective, 2000);
    }
}
