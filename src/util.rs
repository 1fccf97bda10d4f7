use smallvec::SmallVec;

use crate::types::WordId;
use crate::word_list::WordList;
use crate::MAX_GLYPH_COUNT;

/// Structure tracking, for each cell of a slot, the number of occurrences of each glyph among the
/// slot's remaining candidate words. A support lookup is a constant-time index instead of a scan
/// over the candidate list.
pub type GlyphCountsByCell = Vec<SmallVec<[u32; MAX_GLYPH_COUNT]>>;

/// Initialize the `glyph_counts_by_cell` structure for a slot. Every word in `options` must have
/// exactly `slot_length` glyphs.
#[must_use]
pub fn build_glyph_counts_by_cell(
    word_list: &WordList,
    slot_length: usize,
    options: &[WordId],
) -> GlyphCountsByCell {
    let mut result: GlyphCountsByCell = (0..slot_length)
        .map(|_| (0..word_list.glyphs.len()).map(|_| 0).collect())
        .collect();

    for &word_id in options {
        let word = word_list.get_word(word_id);
        for (cell_idx, &glyph) in word.glyphs.iter().enumerate() {
            result[cell_idx][glyph] += 1;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use crate::util::build_glyph_counts_by_cell;
    use crate::word_list::WordList;

    #[test]
    fn test_build_glyph_counts_by_cell() {
        let word_list = WordList::from_words(["cat", "car", "dog"]).unwrap();
        let counts = build_glyph_counts_by_cell(&word_list, 3, &[0, 1, 2]);

        let c = word_list.glyph_id_by_char[&'c'];
        let t = word_list.glyph_id_by_char[&'t'];
        let d = word_list.glyph_id_by_char[&'d'];

        assert_eq!(counts.len(), 3);
        assert_eq!(counts[0][c], 2);
        assert_eq!(counts[0][d], 1);
        assert_eq!(counts[2][t], 1);
    }
}
