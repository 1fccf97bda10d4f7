//! This module implements the consistency engine that narrows slot domains before search: a node
//! consistency pass enforcing each slot's unary length constraint, and the AC-3 algorithm for
//! establishing arc consistency over the binary crossing constraints. A domain is arc-consistent
//! when every remaining word has, in each crossing slot's domain, at least one word agreeing with
//! it at the shared cell.
//!
//! Termination is guaranteed because each revision only shrinks a finite domain, and the worklist
//! is extended only with pairs targeting the side whose counterpart actually shrank.

use log::debug;
use std::collections::VecDeque;

use crate::domain::DomainStore;
use crate::grid_config::GridConfig;
use crate::types::{SlotId, WordId};

/// Result from a failed attempt to establish arc consistency: some slot's domain was (or had
/// already been) emptied, so the puzzle has no solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcConsistencyFailure {
    pub wiped_slot: SlotId,
}

pub type ArcConsistencyResult = Result<(), ArcConsistencyFailure>;

/// Remove from every slot's domain the words whose length differs from the slot's length. This
/// always succeeds, although it can leave a domain empty. As a side effect, the domain store's
/// support tables are (re)built, since node-consistent domains are exactly what they require.
pub fn enforce_node_consistency(config: &GridConfig, domains: &mut DomainStore) {
    for slot_config in config.slot_configs {
        let removed = domains.retain(config, slot_config.id, |_, word| {
            word.len() == slot_config.length
        });

        if removed > 0 {
            debug!(
                "node consistency removed {} candidates from slot {}",
                removed,
                slot_config.slot_key()
            );
        }
    }

    domains.build_support_counts(config);
}

/// Make slot `x` arc-consistent with slot `y`: remove every word from `x`'s domain that no word
/// in `y`'s domain agrees with at the shared cell. Returns whether anything was removed. If the
/// slots don't cross, there is no binary constraint between them and nothing to revise.
pub fn revise(config: &GridConfig, domains: &mut DomainStore, x: SlotId, y: SlotId) -> bool {
    let Some((x_cell, y_cell)) = config.slot_configs[x].overlap_with(y) else {
        return false;
    };

    let unsupported: Vec<WordId> = domains
        .words(x)
        .iter()
        .copied()
        .filter(|&word_id| {
            let glyph = config.word_list.get_word(word_id).glyphs[x_cell];
            domains.glyph_support(y, y_cell, glyph) == 0
        })
        .collect();

    if unsupported.is_empty() {
        return false;
    }

    domains.remove_words(config, x, &unsupported);
    true
}

/// Establish arc consistency across the whole puzzle using the AC-3 worklist algorithm. The
/// worklist starts as `initial_arcs`, or as every ordered pair of crossing slots if none is
/// given. Whenever a revision removes words from `x`, every other slot crossing `x` has to be
/// revised against it again, since the removals may have destroyed the support its words relied
/// on. Fails as soon as any domain is empty.
pub fn enforce_arc_consistency(
    config: &GridConfig,
    domains: &mut DomainStore,
    initial_arcs: Option<Vec<(SlotId, SlotId)>>,
) -> ArcConsistencyResult {
    // A domain may already have been emptied by node consistency; that's just as fatal as a
    // wipeout during propagation, and slots without crossings would otherwise never be examined.
    if let Some(slot_config) = config
        .slot_configs
        .iter()
        .find(|slot_config| domains.is_empty(slot_config.id))
    {
        debug!("slot {} has an empty domain", slot_config.slot_key());
        return Err(ArcConsistencyFailure {
            wiped_slot: slot_config.id,
        });
    }

    let mut worklist: VecDeque<(SlotId, SlotId)> = match initial_arcs {
        Some(arcs) => arcs.into(),
        None => config
            .slot_configs
            .iter()
            .flat_map(|slot_config| {
                slot_config
                    .crossings_iter()
                    .map(move |(_, crossing)| (slot_config.id, crossing.other_slot_id))
            })
            .collect(),
    };

    let mut revisions = 0_usize;

    while let Some((x, y)) = worklist.pop_front() {
        if !revise(config, domains, x, y) {
            continue;
        }
        revisions += 1;

        if domains.is_empty(x) {
            debug!(
                "arc consistency wiped out the domain of slot {}",
                config.slot_configs[x].slot_key()
            );
            return Err(ArcConsistencyFailure { wiped_slot: x });
        }

        for (_, crossing) in config.slot_configs[x].crossings_iter() {
            if crossing.other_slot_id != y {
                worklist.push_back((crossing.other_slot_id, x));
            }
        }
    }

    debug!("arc consistency converged after {revisions} effective revisions");
    Ok(())
}
