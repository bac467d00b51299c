//! Difficulty retargeting and proof-of-work validation.
//!
//! The chain has gone through three retargeting eras. Up to the adaptive
//! switchover height, blocks follow the interval-based rule inherited from
//! the Bitcoin lineage, with a short stretch of per-block retargeting and
//! a free-mining band used to re-bootstrap the chain. From the switchover
//! on, an adaptive per-block rule analyses a small window of recent block
//! spacings, detects hashrate-switching patterns, and eases difficulty in
//! stages when the chain stalls.
//!
//! Every function here is pure: the same tip, candidate header, parameters
//! and clock always produce the same bits. Any divergence between nodes
//! would split the network, so the arithmetic is carried out exclusively
//! on [`Target`] values and `i64` timestamps, with deterministic clamping.

use mmpcoin_common::block::time::{Clock, MAX_FUTURE_BLOCK_TIME};
use mmpcoin_common::block::tree::ChainView;
use mmpcoin_common::block::{Bits, BlockHeader, Height, Target};
use mmpcoin_common::params::{Params, ParamsTree};

/// Height at which the adaptive retargeting rule activates.
pub const ADAPTIVE_RETARGET_HEIGHT: Height = 155550;

/// Band of tip heights over which blocks are mined at the proof-of-work
/// limit while the adaptive rule re-bootstraps the chain.
pub const ADAPTIVE_BOOTSTRAP_HEIGHTS: std::ops::Range<Height> = 155550..155650;

/// Band of tip heights over which the legacy rule retargeted every block.
pub const PER_BLOCK_RETARGET_HEIGHTS: std::ops::Range<Height> = 145000..145365;

/// Band of tip heights over which the legacy rule allowed free mining at
/// the proof-of-work limit.
pub const LEGACY_BOOTSTRAP_HEIGHTS: std::ops::Range<Height> = 145364..145464;

/// Number of recent block spacings sampled by the adaptive rule.
const LONG_WINDOW: usize = 12;
/// Number of most recent spacings forming the short average.
const SHORT_WINDOW: usize = 6;
/// Spacings are clamped to this many target spacings before averaging.
const MAX_SPACING_FACTOR: i64 = 100;
/// Largest single-step easing multiplier applied when the last block
/// took much longer than expected.
const MAX_EASING: u32 = 50;

/// Compute the difficulty bits required of the block following `tip`.
///
/// `tip` is the current best block, or `None` when the chain is empty;
/// `header` is the candidate block, of which only the timestamp is
/// consulted. The parameter record is selected from `tree` by the
/// candidate's height, and the clock feeds the adaptive stall detection.
pub fn next_work_required<V: ChainView>(
    tip: Option<&V>,
    header: &BlockHeader,
    tree: &ParamsTree,
    clock: &impl Clock,
) -> Bits {
    let tip = match tip {
        Some(tip) => tip,
        None => return tree.select(0).pow_limit_bits(),
    };
    let height = tip.height() + 1;
    let params = tree.select(height);

    if height >= ADAPTIVE_RETARGET_HEIGHT {
        adaptive_work_required(tip, params, clock)
    } else {
        legacy_work_required(tip, header, params)
    }
}

/// The interval-based rule active before the adaptive switchover.
fn legacy_work_required<V: ChainView>(tip: &V, header: &BlockHeader, params: &Params) -> Bits {
    let pow_limit_bits = params.pow_limit_bits();

    // Stall exception carried by the digishield-era records: when the
    // candidate is more than two spacings late, a minimum-difficulty
    // block is acceptable.
    if params.allow_digishield_min_difficulty
        && tip.height() >= params.height_effective
        && i64::from(header.time) > i64::from(tip.time()) + params.pow_target_spacing * 2
    {
        return pow_limit_bits;
    }

    if LEGACY_BOOTSTRAP_HEIGHTS.contains(&tip.height()) {
        return pow_limit_bits;
    }

    let interval = if PER_BLOCK_RETARGET_HEIGHTS.contains(&tip.height()) {
        1
    } else {
        params.difficulty_adjustment_interval()
    };

    // Only change once per difficulty adjustment interval.
    if (tip.height() + 1) % interval != 0 {
        if params.allow_min_difficulty_blocks {
            if i64::from(header.time) > i64::from(tip.time()) + params.pow_target_spacing * 2 {
                return pow_limit_bits;
            }
            // Return the difficulty of the last block that was not mined
            // under the minimum-difficulty exception.
            let full_interval = params.difficulty_adjustment_interval();
            let mut index = tip.clone();

            while index.height() % full_interval != 0 && index.bits() == pow_limit_bits {
                match index.parent() {
                    Some(parent) => index = parent,
                    None => break,
                }
            }
            return index.bits();
        }
        return tip.bits();
    }

    // Go back the full period, unless this is the first retarget after
    // genesis. This keeps a majority miner from choosing the first block
    // of the period.
    let blocks_back = if tip.height() + 1 == interval {
        interval - 1
    } else {
        interval
    };
    let first = match tip.ancestor(tip.height().saturating_sub(blocks_back)) {
        Some(first) => first,
        None => return pow_limit_bits,
    };
    calculate_work_required(tip, i64::from(first.time()), params)
}

/// The timespan retarget applied at each adjustment interval: scale the
/// previous target by the observed timespan over the expected one, with
/// the step limited to a factor of four in either direction.
pub fn calculate_work_required<V: ChainView>(
    tip: &V,
    first_block_time: i64,
    params: &Params,
) -> Bits {
    if params.no_pow_retargeting {
        return tip.bits();
    }

    // Limit adjustment step.
    let mut actual_timespan = i64::from(tip.time()) - first_block_time;
    if actual_timespan < params.pow_target_timespan / 4 {
        actual_timespan = params.pow_target_timespan / 4;
    }
    if actual_timespan > params.pow_target_timespan * 4 {
        actual_timespan = params.pow_target_timespan * 4;
    }

    let (previous, _, _) = Target::from_compact(tip.bits());
    let mut target = previous
        .mul_u32(actual_timespan as u32)
        .div_u32(params.pow_target_timespan as u32);

    if target > params.pow_limit {
        target = params.pow_limit;
    }
    target.to_compact()
}

/// The adaptive per-block rule active from the switchover height.
fn adaptive_work_required<V: ChainView>(tip: &V, params: &Params, clock: &impl Clock) -> Bits {
    let pow_limit_bits = params.pow_limit_bits();

    // Genesis-adjacent blocks have no spacing history to analyse.
    let parent = match tip.parent() {
        Some(parent) => parent,
        None => return pow_limit_bits,
    };

    if ADAPTIVE_BOOTSTRAP_HEIGHTS.contains(&tip.height()) {
        return pow_limit_bits;
    }

    let spacing = params.pow_target_spacing;
    let now = i64::from(clock.block_time());
    let tip_time = i64::from(tip.time());

    // Timestamps are miner-controlled. A tip claiming to be more than two
    // hours ahead of us is not a trustworthy reference point for stall
    // detection, so fall back to the median time past.
    let time_since_tip = if tip_time > now + i64::from(MAX_FUTURE_BLOCK_TIME) {
        log::warn!(
            "block timestamp at height {} is too far in the future",
            tip.height()
        );
        now - i64::from(tip.median_time_past())
    } else {
        now - tip_time
    };
    let last_spacing = clamp_spacing(tip_time - i64::from(parent.time()), spacing);

    // Emergency ladder: keep the chain alive through a hashrate collapse.
    // A long-dead chain resets to the proof-of-work limit outright; a
    // single very slow block eases difficulty in proportion to the delay.
    if time_since_tip > 20 * spacing {
        log::warn!(
            "emergency difficulty reset at height {}: no block for {}s",
            tip.height(),
            time_since_tip
        );
        return pow_limit_bits;
    }
    if last_spacing > 10 * spacing {
        let easing = u32::min((last_spacing / spacing) as u32, MAX_EASING);
        log::debug!(
            "emergency difficulty easing at height {}: {}x",
            tip.height(),
            easing
        );
        let (previous, _, _) = Target::from_compact(tip.bits());
        let mut target = previous.mul_u32(easing);

        if target > params.pow_limit {
            target = params.pow_limit;
        }
        return target.to_compact();
    }

    // Sample the most recent block spacings, newest first.
    let mut spacings = Vec::with_capacity(LONG_WINDOW);
    let mut index = tip.clone();

    while spacings.len() < LONG_WINDOW {
        let parent = match index.parent() {
            Some(parent) => parent,
            None => break,
        };
        spacings.push(clamp_spacing(
            i64::from(index.time()) - i64::from(parent.time()),
            spacing,
        ));
        index = parent;
    }
    if spacings.is_empty() {
        spacings.push(last_spacing);
    }

    let long_average = spacings.iter().sum::<i64>() / spacings.len() as i64;
    let short = &spacings[..usize::min(SHORT_WINDOW, spacings.len())];
    let short_average = short.iter().sum::<i64>() / short.len() as i64;

    // Alternating very fast and very slow blocks point to hashrate
    // switching in and out of the chain. Retargeting on the short average
    // would chase the oscillation, so switch to the long one and tighten
    // the per-block limits.
    let fast = short.iter().filter(|s| **s < spacing / 3).count();
    let slow = short.iter().filter(|s| **s > spacing * 3).count();
    let switching = fast >= 2 && slow >= 2;

    let chosen_spacing = if switching { long_average } else { short_average };

    let (previous, _, _) = Target::from_compact(tip.bits());
    let mut target = previous
        .mul_u32(chosen_spacing as u32)
        .div_u32(spacing as u32);

    // Per-block adjustment limits, in percent of the previous target.
    // A quiet chain gets wider bounds in the easing direction.
    let (tighten, ease) = if switching {
        (25, 25)
    } else if time_since_tip > 3 * spacing {
        (100, 75)
    } else {
        (50, 50)
    };
    let lower = previous.mul_u32(100 - tighten).div_u32(100);
    let upper = previous.mul_u32(100 + ease).div_u32(100);

    if target < lower {
        target = lower;
    }
    if target > upper {
        target = upper;
    }
    if target > params.pow_limit {
        target = params.pow_limit;
    }
    target.to_compact()
}

/// Clamp a block spacing to a sane range before it enters any average:
/// timestamp regressions count as one second, and a single spacing never
/// outweighs a hundred target spacings.
fn clamp_spacing(spacing: i64, target_spacing: i64) -> i64 {
    spacing.max(1).min(target_spacing * MAX_SPACING_FACTOR)
}

/// Check that a block's proof-of-work hash satisfies its claimed
/// difficulty. The hash is the scrypt proof-of-work digest in
/// little-endian byte order, as computed by the block verifier.
pub fn check_proof_of_work(hash: &[u8; 32], bits: Bits, params: &Params) -> bool {
    let (target, negative, overflow) = Target::from_compact(bits);

    // Check range.
    if negative || target.is_zero() || overflow || target > params.pow_limit {
        return false;
    }
    // Check proof of work matches claimed amount.
    Target::from_le_bytes(*hash) <= target
}
