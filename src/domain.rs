//! This module implements the domain store: the per-slot sets of words still considered possible.
//! Every slot's domain starts as the full dictionary and only ever shrinks. The consistency
//! engine narrows the domains before search; during search they are read-only.

use log::debug;

use crate::grid_config::GridConfig;
use crate::types::{GlyphId, SlotId, WordId};
use crate::util::{build_glyph_counts_by_cell, GlyphCountsByCell};
use crate::word_list::Word;

/// The per-slot candidate sets, plus per-cell glyph occurrence counts that give constant-time
/// support lookups once the domains are node-consistent.
pub struct DomainStore {
    /// For each slot, the ids of the words still available to it, in dictionary order.
    options: Vec<Vec<WordId>>,

    /// For each slot, per-cell glyph occurrence counts over `options`. Empty until
    /// `build_support_counts` runs; only valid while every domain word has the slot's exact
    /// length, so it can't be built before node consistency.
    glyph_counts: Vec<GlyphCountsByCell>,
}

impl DomainStore {
    /// Initialize every slot's domain to the full dictionary.
    #[must_use]
    pub fn new(config: &GridConfig) -> DomainStore {
        let all_words: Vec<WordId> = (0..config.word_list.len()).collect();

        DomainStore {
            options: config.slot_configs.iter().map(|_| all_words.clone()).collect(),
            glyph_counts: vec![],
        }
    }

    /// The number of words remaining in the given slot's domain.
    #[must_use]
    pub fn len(&self, slot_id: SlotId) -> usize {
        self.options[slot_id].len()
    }

    #[must_use]
    pub fn is_empty(&self, slot_id: SlotId) -> bool {
        self.options[slot_id].is_empty()
    }

    /// The words remaining in the given slot's domain.
    #[must_use]
    pub fn words(&self, slot_id: SlotId) -> &[WordId] {
        &self.options[slot_id]
    }

    /// Remove every word from the given slot's domain that fails the predicate, returning the
    /// number of words removed.
    pub fn retain(
        &mut self,
        config: &GridConfig,
        slot_id: SlotId,
        mut keep: impl FnMut(WordId, &Word) -> bool,
    ) -> usize {
        let options = &mut self.options[slot_id];
        let mut counts = self.glyph_counts.get_mut(slot_id);
        let before = options.len();

        options.retain(|&word_id| {
            let word = config.word_list.get_word(word_id);
            if keep(word_id, word) {
                return true;
            }

            if let Some(counts) = counts.as_mut() {
                for (cell_idx, &glyph) in word.glyphs.iter().enumerate() {
                    counts[cell_idx][glyph] -= 1;
                }
            }
            false
        });

        before - options.len()
    }

    /// Remove the given words from the given slot's domain.
    pub fn remove_words(&mut self, config: &GridConfig, slot_id: SlotId, word_ids: &[WordId]) {
        self.retain(config, slot_id, |word_id, _| !word_ids.contains(&word_id));
    }

    /// Build the per-cell support tables. The caller must have made every domain node-consistent
    /// first; rebuilding after further removals is allowed but unnecessary, since `retain` keeps
    /// the tables in sync once they exist.
    pub fn build_support_counts(&mut self, config: &GridConfig) {
        self.glyph_counts = config
            .slot_configs
            .iter()
            .map(|slot_config| {
                build_glyph_counts_by_cell(
                    config.word_list,
                    slot_config.length,
                    &self.options[slot_config.id],
                )
            })
            .collect();

        debug!(
            "built support counts for {} slots ({} candidates total)",
            self.options.len(),
            self.options.iter().map(Vec::len).sum::<usize>()
        );
    }

    /// The number of words in the given slot's domain carrying `glyph` at `cell_idx`. Zero means
    /// `glyph` has no support in the slot.
    #[must_use]
    pub fn glyph_support(&self, slot_id: SlotId, cell_idx: usize, glyph: GlyphId) -> u32 {
        let counts = self
            .glyph_counts
            .get(slot_id)
            .expect("support counts must be built before querying support");
        counts[cell_idx][glyph]
    }
}
