//! This module implements the solver's search phase: plain backtracking over partial
//! assignments, choosing slots with the minimum-remaining-values heuristic (degree tie-break)
//! and ordering candidate words with the least-constraining-value heuristic. Constraint
//! propagation happens once, up front, via the consistency engine; during search the domains are
//! read-only and every tentative binding is validated against the full assignment.
//!
//! Selection and ordering are fully deterministic: ties fall back to slot id and to dictionary
//! order respectively, so the same puzzle and word list always produce the same result.

use log::{debug, info};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::arc_consistency::{enforce_arc_consistency, enforce_node_consistency};
use crate::domain::DomainStore;
use crate::grid_config::{Choice, GridConfig};
use crate::types::{SlotId, WordId};
use crate::CHECK_INVARIANTS;

/// A struct tracking stats about the search process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// The number of tentative bindings made.
    pub states: usize,

    /// The number of branches abandoned after trying every candidate.
    pub backtracks: usize,

    pub total_time: Duration,
}

/// A partial assignment of words to slots, built up and torn down during search.
pub struct Assignment {
    words: Vec<Option<WordId>>,
    assigned_count: usize,
}

impl Assignment {
    #[must_use]
    pub fn new(slot_count: usize) -> Assignment {
        Assignment {
            words: vec![None; slot_count],
            assigned_count: 0,
        }
    }

    #[must_use]
    pub fn get(&self, slot_id: SlotId) -> Option<WordId> {
        self.words[slot_id]
    }

    #[must_use]
    pub fn is_assigned(&self, slot_id: SlotId) -> bool {
        self.words[slot_id].is_some()
    }

    /// Is every slot bound?
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.assigned_count == self.words.len()
    }

    /// Tentatively bind a word to an unbound slot.
    pub fn bind(&mut self, slot_id: SlotId, word_id: WordId) {
        debug_assert!(self.words[slot_id].is_none());
        self.words[slot_id] = Some(word_id);
        self.assigned_count += 1;
    }

    /// Undo a binding made by `bind`.
    pub fn unbind(&mut self, slot_id: SlotId) {
        debug_assert!(self.words[slot_id].is_some());
        self.words[slot_id] = None;
        self.assigned_count -= 1;
    }

    /// Turn a complete assignment into a list of choices, in slot id order.
    #[must_use]
    pub fn to_choices(&self) -> Vec<Choice> {
        self.words
            .iter()
            .enumerate()
            .filter_map(|(slot_id, word)| {
                word.map(|word_id| Choice { slot_id, word_id })
            })
            .collect()
    }
}

/// Check whether the given (partial) assignment satisfies every constraint it touches: assigned
/// words are pairwise distinct, each has its slot's exact length, and every pair of assigned
/// crossing slots agrees at the shared cell. This is derived from the puzzle model and the
/// assignment alone; it never consults the domain store.
#[must_use]
pub fn is_consistent(config: &GridConfig, assignment: &Assignment) -> bool {
    let mut used_words: HashSet<WordId> = HashSet::new();

    for slot_config in config.slot_configs {
        let Some(word_id) = assignment.get(slot_config.id) else {
            continue;
        };

        // No word may be used twice anywhere in the grid, not just between crossing slots.
        if !used_words.insert(word_id) {
            return false;
        }

        let word = config.word_list.get_word(word_id);
        if word.len() != slot_config.length {
            return false;
        }

        for (cell_idx, crossing) in slot_config.crossings_iter() {
            // Each crossing shows up once from either side; checking from the lower id is enough.
            if crossing.other_slot_id < slot_config.id {
                continue;
            }
            let Some(other_word_id) = assignment.get(crossing.other_slot_id) else {
                continue;
            };
            let other_word = config.word_list.get_word(other_word_id);
            if other_word.len() <= crossing.other_slot_cell
                || word.glyphs[cell_idx] != other_word.glyphs[crossing.other_slot_cell]
            {
                return false;
            }
        }
    }

    true
}

/// Among the slots not yet assigned, pick the one with the fewest remaining candidates, breaking
/// ties in favor of the slot crossing the most other slots, then in slot id order.
fn select_unassigned_variable(
    config: &GridConfig,
    domains: &DomainStore,
    assignment: &Assignment,
) -> Option<SlotId> {
    config
        .slot_configs
        .iter()
        .filter(|slot_config| !assignment.is_assigned(slot_config.id))
        .min_by_key(|slot_config| (domains.len(slot_config.id), Reverse(slot_config.degree())))
        .map(|slot_config| slot_config.id)
}

/// Order the slot's candidate words ascending by the number of words they would rule out across
/// the domains of its unassigned crossing slots. This only affects which branch is tried first,
/// never which branches exist. Ties keep dictionary order.
fn order_domain_values(
    config: &GridConfig,
    domains: &DomainStore,
    assignment: &Assignment,
    slot_id: SlotId,
) -> Vec<WordId> {
    let slot_config = &config.slot_configs[slot_id];

    let mut values: Vec<WordId> = domains.words(slot_id).to_vec();
    values.sort_by_cached_key(|&word_id| {
        let word = config.word_list.get_word(word_id);

        slot_config
            .crossings_iter()
            .filter(|(_, crossing)| !assignment.is_assigned(crossing.other_slot_id))
            .map(|(cell_idx, crossing)| {
                let support = domains.glyph_support(
                    crossing.other_slot_id,
                    crossing.other_slot_cell,
                    word.glyphs[cell_idx],
                ) as usize;

                domains.len(crossing.other_slot_id) - support
            })
            .sum::<usize>()
    });

    values
}

/// A struct representing the results of a successful solve.
#[derive(Debug)]
pub struct FillSuccess {
    pub statistics: Statistics,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillFailure {
    /// The puzzle has no solution: a domain wiped out during propagation, or the search
    /// exhausted every branch. A defined outcome, not an error.
    Unsatisfiable,

    /// The optional search budget ran out before the search finished.
    ExceededStateLimit(usize),
}

struct SearchContext {
    max_states: Option<usize>,
    statistics: Statistics,
}

/// Recursive backtracking: if the assignment is complete, we're done; otherwise bind each
/// candidate of the selected slot in turn, recursing on the ones that leave the assignment
/// consistent and unbinding on failure. The first success propagates straight up.
fn backtrack(
    config: &GridConfig,
    domains: &DomainStore,
    assignment: &mut Assignment,
    context: &mut SearchContext,
) -> Result<bool, FillFailure> {
    if assignment.is_complete() {
        return Ok(true);
    }

    let slot_id = select_unassigned_variable(config, domains, assignment)
        .expect("an incomplete assignment must leave a slot to select");

    for word_id in order_domain_values(config, domains, assignment, slot_id) {
        context.statistics.states += 1;
        if let Some(max_states) = context.max_states {
            if context.statistics.states > max_states {
                return Err(FillFailure::ExceededStateLimit(max_states));
            }
        }

        if CHECK_INVARIANTS {
            assert_eq!(
                config.word_list.get_word(word_id).len(),
                config.slot_configs[slot_id].length,
                "a wrong-length candidate survived node consistency"
            );
        }

        assignment.bind(slot_id, word_id);
        if is_consistent(config, assignment) && backtrack(config, domains, assignment, context)? {
            return Ok(true);
        }
        assignment.unbind(slot_id);
    }

    context.statistics.backtracks += 1;
    Ok(false)
}

/// Search for a valid fill for the given grid: enforce node and arc consistency, then run
/// backtracking search over the narrowed domains. Returns the complete set of choices or an
/// explicit failure; never a partial assignment. `max_states` optionally bounds the number of
/// tentative bindings without changing which solution is found within the bound.
pub fn find_fill(
    config: &GridConfig,
    max_states: Option<usize>,
) -> Result<FillSuccess, FillFailure> {
    let start = Instant::now();

    let mut domains = DomainStore::new(config);
    enforce_node_consistency(config, &mut domains);

    if let Err(failure) = enforce_arc_consistency(config, &mut domains, None) {
        info!(
            "propagation emptied the domain of slot {}; puzzle is unsolvable",
            config.slot_configs[failure.wiped_slot].slot_key()
        );
        return Err(FillFailure::Unsatisfiable);
    }

    let mut assignment = Assignment::new(config.slot_configs.len());
    let mut context = SearchContext {
        max_states,
        statistics: Statistics::default(),
    };

    let found = backtrack(config, &domains, &mut assignment, &mut context)?;

    let mut statistics = context.statistics;
    statistics.total_time = start.elapsed();

    if found {
        debug!(
            "search bound {} slots in {} states with {} backtracks",
            config.slot_configs.len(),
            statistics.states,
            statistics.backtracks
        );
        Ok(FillSuccess {
            statistics,
            choices: assignment.to_choices(),
        })
    } else {
        info!(
            "search exhausted every branch after {} states; puzzle is unsolvable",
            statistics.states
        );
        Err(FillFailure::Unsatisfiable)
    }
}

#[cfg(test)]
mod tests {
    use crate::arc_consistency::enforce_node_consistency;
    use crate::backtracking_search::{
        find_fill, is_consistent, order_domain_values, select_unassigned_variable, Assignment,
        FillFailure,
    };
    use crate::domain::DomainStore;
    use crate::grid_config::{
        generate_grid_config_from_template_string, GridConfig, OwnedGridConfig,
    };
    use crate::word_list::WordList;

    fn generate_config(words: &[&str], template: &str) -> OwnedGridConfig {
        let word_list = WordList::from_words(words.iter().copied()).unwrap();
        generate_grid_config_from_template_string(word_list, template).unwrap()
    }

    fn word_string<'a>(config: &GridConfig<'a>, word_id: usize) -> &'a str {
        &config.word_list.get_word(word_id).normalized_string
    }

    /// One across slot and one down slot, both of length 3, sharing their first cell.
    const L_SHAPE: &str = "
        ___
        _##
        _##
    ";

    #[test]
    fn test_fills_single_crossing_pair() {
        let config = generate_config(&["cat", "car", "dog"], L_SHAPE);
        let config_ref = config.to_config_ref();

        let result = find_fill(&config_ref, None).expect("failed to fill");
        assert_eq!(result.choices.len(), 2);

        // The two words must be distinct and share their first letter.
        let across = word_string(&config_ref, result.choices[0].word_id);
        let down = word_string(&config_ref, result.choices[1].word_id);
        assert_ne!(across, down);
        assert_eq!(across.chars().next(), down.chars().next());
    }

    #[test]
    fn test_crossing_mismatch_rejected_by_is_consistent() {
        let config = generate_config(&["cat", "car", "dog"], L_SHAPE);
        let config_ref = config.to_config_ref();

        // "cat" across and "car" down agree at the shared first cell.
        let mut assignment = Assignment::new(2);
        assignment.bind(0, 0);
        assignment.bind(1, 1);
        assert!(is_consistent(&config_ref, &assignment));

        // "cat" across and "dog" down disagree there.
        assignment.unbind(1);
        assignment.bind(1, 2);
        assert!(!is_consistent(&config_ref, &assignment));
    }

    #[test]
    fn test_is_consistent_rejects_reused_word() {
        let config = generate_config(&["aaa"], L_SHAPE);
        let config_ref = config.to_config_ref();

        // "aaa" in both slots satisfies the crossing but violates global uniqueness.
        let mut assignment = Assignment::new(2);
        assignment.bind(0, 0);
        assignment.bind(1, 0);
        assert!(!is_consistent(&config_ref, &assignment));
    }

    #[test]
    fn test_missing_length_reports_no_solution() {
        // No word has length 3, so node consistency empties both domains.
        let config = generate_config(&["to", "planet"], L_SHAPE);
        let result = find_fill(&config.to_config_ref(), None);

        assert_eq!(result.err(), Some(FillFailure::Unsatisfiable));
    }

    /// Two across slots of length 3 with no crossing between them.
    const DISJOINT_SLOTS: &str = "
        ___
        ###
        ___
    ";

    #[test]
    fn test_disjoint_slots_get_distinct_words() {
        let config = generate_config(&["cat", "dog"], DISJOINT_SLOTS);
        let config_ref = config.to_config_ref();

        let result = find_fill(&config_ref, None).expect("failed to fill");
        let words: Vec<&str> = result
            .choices
            .iter()
            .map(|choice| word_string(&config_ref, choice.word_id))
            .collect();

        assert_eq!(words.len(), 2);
        assert_ne!(words[0], words[1]);
    }

    #[test]
    fn test_uniqueness_constraint_forces_no_solution() {
        // Two slots, one word of the right length: the uniqueness constraint makes this
        // unsatisfiable even though each slot on its own could be filled.
        let config = generate_config(&["cat"], DISJOINT_SLOTS);
        let result = find_fill(&config.to_config_ref(), None);

        assert_eq!(result.err(), Some(FillFailure::Unsatisfiable));
    }

    #[test]
    fn test_returned_assignment_is_valid() {
        let config = generate_config(
            &["cat", "tab", "bat", "arc", "rat", "car", "art"],
            "
            ___
            #_#
            #_#
            ",
        );
        let config_ref = config.to_config_ref();

        let result = find_fill(&config_ref, None).expect("failed to fill");

        let mut assignment = Assignment::new(config_ref.slot_configs.len());
        for choice in &result.choices {
            assignment.bind(choice.slot_id, choice.word_id);
        }
        assert!(assignment.is_complete());
        assert!(is_consistent(&config_ref, &assignment));
    }

    #[test]
    fn test_deterministic_across_runs() {
        let words = ["cat", "tab", "bat", "arc", "rat", "car", "art"];
        let template = "
            ___
            #_#
            #_#
        ";

        let first = find_fill(&generate_config(&words, template).to_config_ref(), None);
        let second = find_fill(&generate_config(&words, template).to_config_ref(), None);

        assert_eq!(
            first.map(|result| result.choices),
            second.map(|result| result.choices)
        );
    }

    #[test]
    fn test_mrv_prefers_smaller_domain() {
        // The across slot has length 4 (one candidate); the down slot has length 3 (two
        // candidates). MRV picks the across slot first.
        let config = generate_config(
            &["abcd", "axy", "bxy"],
            "
            ____
            _###
            _###
            ",
        );
        let config_ref = config.to_config_ref();

        let mut domains = DomainStore::new(&config_ref);
        enforce_node_consistency(&config_ref, &mut domains);

        let assignment = Assignment::new(config_ref.slot_configs.len());
        let selected = select_unassigned_variable(&config_ref, &domains, &assignment).unwrap();
        assert_eq!(config_ref.slot_configs[selected].length, 4);
    }

    #[test]
    fn test_mrv_ties_break_on_degree() {
        // All three slots have two candidates, but the across slot crosses two others while each
        // down slot crosses only one.
        let config = generate_config(
            &["abcde", "fghij", "bx", "gx"],
            "
            _____
            #_#_#
            ",
        );
        let config_ref = config.to_config_ref();

        let mut domains = DomainStore::new(&config_ref);
        enforce_node_consistency(&config_ref, &mut domains);
        assert_eq!(domains.len(0), 2);

        let assignment = Assignment::new(config_ref.slot_configs.len());
        let selected = select_unassigned_variable(&config_ref, &domains, &assignment).unwrap();
        assert_eq!(config_ref.slot_configs[selected].degree(), 2);
    }

    #[test]
    fn test_lcv_orders_least_constraining_first() {
        // The across slot's middle cell crosses the down slot's first cell.
        let config = generate_config(
            &["dog", "cat", "car", "can", "arc", "rat"],
            "
            ___
            #_#
            #_#
            ",
        );
        let config_ref = config.to_config_ref();

        let mut domains = DomainStore::new(&config_ref);
        enforce_node_consistency(&config_ref, &mut domains);

        let assignment = Assignment::new(config_ref.slot_configs.len());
        let ordered = order_domain_values(&config_ref, &domains, &assignment, 0);
        let ordered_strings: Vec<&str> = ordered
            .iter()
            .map(|&word_id| word_string(&config_ref, word_id))
            .collect();

        // Every word except "dog" leaves the down slot one compatible option (its middle letter
        // is the first letter of exactly one word); "dog"'s middle 'o' rules out all six. The
        // cost-5 words keep their dictionary order.
        assert_eq!(
            ordered_strings,
            ["cat", "car", "can", "arc", "rat", "dog"]
        );
    }

    #[test]
    fn test_state_limit_is_reported() {
        let config = generate_config(&["cat", "car", "dog"], L_SHAPE);
        let result = find_fill(&config.to_config_ref(), Some(0));

        assert_eq!(result.err(), Some(FillFailure::ExceededStateLimit(0)));
    }
}
