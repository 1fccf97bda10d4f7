//! This module implements the puzzle model consumed by the solver: the open/blocked grid, the
//! slots with their crossings, and the structural validation that has to pass before solving
//! starts. It also owns the text rendering of a finished (or failed) fill.

use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{CrossingId, SlotId, WordId};
use crate::word_list::WordList;

/// Zero-indexed x and y coords for a cell in the grid, where y = 0 in the top row.
pub type GridCoord = (usize, usize);

/// The direction that a slot is facing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    Across,
    Down,
}

/// A struct representing a crossing between one slot and another, referencing the other slot's id
/// and the location of the shared cell within the other slot's word.
#[derive(Debug, Clone)]
pub struct Crossing {
    pub other_slot_id: SlotId,
    pub other_slot_cell: usize,
    pub crossing_id: CrossingId,
}

/// A struct representing the static aspects of a slot in the grid.
#[derive(Debug, Clone)]
pub struct SlotConfig {
    pub id: SlotId,
    pub start_cell: GridCoord,
    pub direction: Direction,
    pub length: usize,

    /// One entry per cell of the slot; `Some` iff another slot shares that cell.
    pub crossings: Vec<Option<Crossing>>,
}

impl SlotConfig {
    /// Generate the coords for each cell of this slot.
    #[must_use]
    pub fn cell_coords(&self) -> Vec<GridCoord> {
        (0..self.length)
            .map(|cell_idx| match self.direction {
                Direction::Across => (self.start_cell.0 + cell_idx, self.start_cell.1),
                Direction::Down => (self.start_cell.0, self.start_cell.1 + cell_idx),
            })
            .collect()
    }

    /// Iterate over this slot's crossings as `(cell_idx, crossing)` pairs.
    pub fn crossings_iter(&self) -> impl Iterator<Item = (usize, &Crossing)> {
        self.crossings
            .iter()
            .enumerate()
            .filter_map(|(cell_idx, crossing)| crossing.as_ref().map(|c| (cell_idx, c)))
    }

    /// The number of other slots whose cell spans intersect this one's.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.crossings.iter().flatten().count()
    }

    /// If this slot crosses `other`, the offsets of the shared cell: (index into this slot's
    /// word, index into the other slot's word).
    #[must_use]
    pub fn overlap_with(&self, other: SlotId) -> Option<(usize, usize)> {
        self.crossings_iter()
            .find(|(_, crossing)| crossing.other_slot_id == other)
            .map(|(cell_idx, crossing)| (cell_idx, crossing.other_slot_cell))
    }

    /// Generate a `SlotSpec` identifying this slot.
    #[must_use]
    pub fn slot_spec(&self) -> SlotSpec {
        SlotSpec {
            start_cell: self.start_cell,
            direction: self.direction,
            length: self.length,
        }
    }

    /// Generate a string key identifying this slot.
    #[must_use]
    pub fn slot_key(&self) -> String {
        self.slot_spec().to_key()
    }
}

/// A structural defect that makes a puzzle unusable. These are detected while building a
/// `GridConfig`, before any solving happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    EmptyGrid,
    UnevenRows,
    SlotOutOfBounds(String),
    SlotOverBlockedCell(String),
    CrossingConflict(GridCoord),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::EmptyGrid => write!(f, "grid must have at least one row"),
            GridError::UnevenRows => write!(f, "rows in grid must all be the same length"),
            GridError::SlotOutOfBounds(key) => {
                write!(f, "slot {key} extends outside the grid")
            }
            GridError::SlotOverBlockedCell(key) => {
                write!(f, "slot {key} covers a blocked cell")
            }
            GridError::CrossingConflict((x, y)) => {
                write!(f, "more than two slots share the cell ({x}, {y})")
            }
        }
    }
}

/// A struct holding references to all of the information needed as input to a solve.
#[derive(Clone)]
pub struct GridConfig<'a> {
    /// The word list used to fill the grid; see `word_list.rs`.
    pub word_list: &'a WordList,

    /// A flat array of open/blocked flags, in order of row and then column.
    pub open: &'a [bool],

    /// Config representing all of the slots in the grid and their crossings.
    pub slot_configs: &'a [SlotConfig],

    /// The width and height of the grid.
    pub width: usize,
    pub height: usize,

    /// The number of distinct crossings represented in all of the `slot_configs`.
    pub crossing_count: usize,
}

/// A struct that owns a copy of each piece of information needed by `GridConfig`.
pub struct OwnedGridConfig {
    pub word_list: WordList,
    pub open: Vec<bool>,
    pub slot_configs: Vec<SlotConfig>,
    pub width: usize,
    pub height: usize,
    pub crossing_count: usize,
}

impl OwnedGridConfig {
    #[must_use]
    pub fn to_config_ref(&self) -> GridConfig {
        GridConfig {
            word_list: &self.word_list,
            open: &self.open,
            slot_configs: &self.slot_configs,
            width: self.width,
            height: self.height,
            crossing_count: self.crossing_count,
        }
    }
}

/// A struct identifying a specific slot in the grid.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct SlotSpec {
    pub start_cell: GridCoord,
    pub direction: Direction,
    pub length: usize,
}

impl SlotSpec {
    /// Parse a string like "1,2,down,5" into a `SlotSpec` struct.
    pub fn from_key(key: &str) -> Result<SlotSpec, String> {
        let key_parts: Vec<&str> = key.split(',').collect();
        if key_parts.len() != 4 {
            return Err(format!("invalid slot key: {key}"));
        }

        let x: Result<usize, _> = key_parts[0].parse();
        let y: Result<usize, _> = key_parts[1].parse();
        let direction: Option<Direction> = match key_parts[2] {
            "across" => Some(Direction::Across),
            "down" => Some(Direction::Down),
            _ => None,
        };
        let length: Result<usize, _> = key_parts[3].parse();

        if let (Ok(x), Ok(y), Some(direction), Ok(length)) = (x, y, direction, length) {
            Ok(SlotSpec {
                start_cell: (x, y),
                direction,
                length,
            })
        } else {
            Err(format!("invalid slot key: {key:?}"))
        }
    }

    /// Represent this slot as a string like "1,2,down,5".
    #[must_use]
    pub fn to_key(&self) -> String {
        let direction = match self.direction {
            Direction::Across => "across",
            Direction::Down => "down",
        };
        format!(
            "{},{},{},{}",
            self.start_cell.0, self.start_cell.1, direction, self.length,
        )
    }

    /// Generate the coords for each cell of this entry.
    #[must_use]
    pub fn cell_coords(&self) -> Vec<GridCoord> {
        (0..self.length)
            .map(|cell_idx| match self.direction {
                Direction::Across => (self.start_cell.0 + cell_idx, self.start_cell.1),
                Direction::Down => (self.start_cell.0, self.start_cell.1 + cell_idx),
            })
            .collect()
    }
}

/// Serialize a `SlotSpec` into a string key.
#[cfg(feature = "serde")]
impl Serialize for SlotSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_key())
    }
}

/// Deserialize a `SlotSpec` from a string key.
#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for SlotSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw_string = String::deserialize(deserializer)?;
        SlotSpec::from_key(&raw_string).map_err(serde::de::Error::custom)
    }
}

/// Given `SlotSpec`s specifying the positions of the slots in a grid, generate `SlotConfig`s
/// containing derived information about crossings. The overlap relation is built symmetrically
/// from the shared cell, so `overlap_with` on either side of a pair describes the same cell.
pub fn generate_slot_configs(
    entries: &[SlotSpec],
) -> Result<(Vec<SlotConfig>, usize), GridError> {
    let mut slot_configs: Vec<SlotConfig> = vec![];

    // Build a map from cell location to entries involved, which we can then use to calculate
    // crossings.
    let mut entries_by_loc: HashMap<GridCoord, Vec<(usize, usize)>> = HashMap::new();

    for (entry_idx, entry) in entries.iter().enumerate() {
        for (cell_idx, &loc) in entry.cell_coords().iter().enumerate() {
            entries_by_loc
                .entry(loc)
                .or_default()
                .push((entry_idx, cell_idx));
        }
    }

    // A cell can be shared by at most one across and one down slot; anything else means the
    // entries themselves are malformed.
    for (&loc, cell_entries) in &entries_by_loc {
        if cell_entries.len() > 2 {
            return Err(GridError::CrossingConflict(loc));
        }
        if let [(a, _), (b, _)] = cell_entries[..] {
            if entries[a].direction == entries[b].direction {
                return Err(GridError::CrossingConflict(loc));
            }
        }
    }

    // When we're generating a Crossing, if `(current_slot_id, crossing_slot_id)` is in this list,
    // use its index; if not, use `crossing_id_cache.len()` as the id and push
    // `(crossing_slot_id, current_id)` into the list so we can reuse it when we see the crossing
    // from the other side.
    let mut crossing_id_cache: Vec<(SlotId, SlotId)> = vec![];

    for (entry_idx, entry) in entries.iter().enumerate() {
        let crossings: Vec<Option<Crossing>> = entry
            .cell_coords()
            .iter()
            .map(|loc| {
                let other = entries_by_loc[loc]
                    .iter()
                    .find(|&&(e, _)| e != entry_idx)
                    .copied();

                other.map(|(other_slot_id, other_slot_cell)| {
                    let crossing_id = crossing_id_cache
                        .iter()
                        .position(|&id_pair| id_pair == (entry_idx, other_slot_id))
                        .unwrap_or_else(|| {
                            crossing_id_cache.push((other_slot_id, entry_idx));
                            crossing_id_cache.len() - 1
                        });

                    Crossing {
                        other_slot_id,
                        other_slot_cell,
                        crossing_id,
                    }
                })
            })
            .collect();

        slot_configs.push(SlotConfig {
            id: entry_idx,
            start_cell: entry.start_cell,
            direction: entry.direction,
            length: entry.length,
            crossings,
        });
    }

    Ok((slot_configs, crossing_id_cache.len()))
}

/// Generate an `OwnedGridConfig` representing a grid with specified entries, validating that each
/// entry stays inside the grid and only covers open cells.
pub fn generate_grid_config(
    word_list: WordList,
    entries: &[SlotSpec],
    open: Vec<bool>,
    width: usize,
    height: usize,
) -> Result<OwnedGridConfig, GridError> {
    for entry in entries {
        for (x, y) in entry.cell_coords() {
            if x >= width || y >= height {
                return Err(GridError::SlotOutOfBounds(entry.to_key()));
            }
            if !open[y * width + x] {
                return Err(GridError::SlotOverBlockedCell(entry.to_key()));
            }
        }
    }

    let (slot_configs, crossing_count) = generate_slot_configs(entries)?;

    Ok(OwnedGridConfig {
        word_list,
        open,
        slot_configs,
        width,
        height,
        crossing_count,
    })
}

/// Is the given template character an open cell? Underscores are the structure-file convention;
/// dots are accepted as well for template strings written inline.
fn is_open_cell(cell: char) -> bool {
    cell == '_' || cell == '.'
}

/// Generate a list of `SlotSpec`s from a template string. Every maximal horizontal or vertical
/// run of two or more open cells becomes one slot.
#[must_use]
pub fn generate_slots_from_template_string(template: &[Vec<char>]) -> Vec<SlotSpec> {
    fn build_words(template: &[Vec<char>]) -> Vec<Vec<GridCoord>> {
        let mut result: Vec<Vec<GridCoord>> = vec![];

        for (y, line) in template.iter().enumerate() {
            let mut current_word_coords: Vec<GridCoord> = vec![];

            for (x, &cell) in line.iter().enumerate() {
                if is_open_cell(cell) {
                    current_word_coords.push((x, y));
                } else {
                    if current_word_coords.len() > 1 {
                        result.push(current_word_coords);
                    }
                    current_word_coords = vec![];
                }
            }

            if current_word_coords.len() > 1 {
                result.push(current_word_coords);
            }
        }

        result
    }

    let mut slot_specs: Vec<SlotSpec> = vec![];

    for coords in build_words(template) {
        slot_specs.push(SlotSpec {
            start_cell: coords[0],
            length: coords.len(),
            direction: Direction::Across,
        });
    }

    let transposed_template: Vec<Vec<char>> = (0..template[0].len())
        .map(|y| (0..template.len()).map(|x| template[x][y]).collect())
        .collect();

    for coords in build_words(&transposed_template) {
        let coords: Vec<GridCoord> = coords.iter().copied().map(|(y, x)| (x, y)).collect();
        slot_specs.push(SlotSpec {
            start_cell: coords[0],
            length: coords.len(),
            direction: Direction::Down,
        });
    }

    slot_specs
}

/// Generate an `OwnedGridConfig` from a template string with `_` or `.` representing open cells
/// and anything else representing blocks.
pub fn generate_grid_config_from_template_string(
    word_list: WordList,
    template: &str,
) -> Result<OwnedGridConfig, GridError> {
    let template: Vec<Vec<char>> = template
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                None
            } else {
                Some(line.chars().collect())
            }
        })
        .collect();

    if template.is_empty() {
        return Err(GridError::EmptyGrid);
    }

    let width = template[0].len();
    let height = template.len();

    if template.iter().any(|line| line.len() != width) {
        return Err(GridError::UnevenRows);
    }

    let slot_specs = generate_slots_from_template_string(&template);

    let open: Vec<bool> = template
        .iter()
        .flat_map(|line| line.iter().map(|&cell| is_open_cell(cell)))
        .collect();

    generate_grid_config(word_list, &slot_specs, open, width, height)
}

/// A struct recording a slot assignment made during a solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub slot_id: SlotId,
    pub word_id: WordId,
}

/// Turn the given grid config and fill choices into a rendered string: blocked cells become a
/// block glyph, open unfilled cells a space, and filled cells their letter.
#[must_use]
pub fn render_grid(config: &GridConfig, choices: &[Choice]) -> String {
    let mut grid: Vec<Option<char>> = vec![None; config.width * config.height];

    for &Choice { slot_id, word_id } in choices {
        let slot_config = &config.slot_configs[slot_id];
        let word = config.word_list.get_word(word_id);

        for (cell_idx, &(x, y)) in slot_config.cell_coords().iter().enumerate() {
            grid[y * config.width + x] = Some(config.word_list.glyphs[word.glyphs[cell_idx]]);
        }
    }

    grid.chunks(config.width)
        .enumerate()
        .map(|(y, line)| {
            line.iter()
                .enumerate()
                .map(|(x, cell)| {
                    if config.open[y * config.width + x] {
                        cell.unwrap_or(' ')
                    } else {
                        '█'
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use crate::grid_config::{Direction, SlotSpec};

    #[test]
    fn test_slot_spec_serialization() {
        let slot_spec = SlotSpec {
            start_cell: (1, 2),
            direction: Direction::Across,
            length: 5,
        };

        let slot_key = serde_json::to_string(&slot_spec).unwrap();

        assert_eq!(slot_key, "\"1,2,across,5\"");
    }

    #[test]
    fn test_slot_spec_deserialization() {
        let slot_spec: SlotSpec = serde_json::from_str("\"3,4,down,12\"").unwrap();

        assert_eq!(
            slot_spec,
            SlotSpec {
                start_cell: (3, 4),
                direction: Direction::Down,
                length: 12,
            }
        );
    }
}
