//! This module implements loading and normalizing the dictionary of candidate words. Words are
//! interned as sequences of `GlyphId`s so that the consistency and search code can compare cells
//! without touching string data.

use smallvec::{smallvec, SmallVec};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::fmt::Debug;
use std::fs;
use unicode_normalization::UnicodeNormalization;

use crate::types::{GlyphId, WordId};
use crate::{MAX_GLYPH_COUNT, MAX_SLOT_LENGTH};

/// A struct representing a word in the word list.
#[derive(Debug, Clone)]
pub struct Word {
    /// The word as it would appear in a grid -- only lowercase letters or other valid glyphs.
    pub normalized_string: String,

    /// The word as it appears in the user's word list, with arbitrary formatting.
    pub canonical_string: String,

    /// The glyph ids making up `normalized_string`.
    pub glyphs: SmallVec<[GlyphId; MAX_SLOT_LENGTH]>,
}

impl Word {
    /// The number of cells this word occupies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// Given a canonical word string from a dictionary file, turn it into the normalized form we'll
/// use in the actual solver.
#[must_use]
pub fn normalize_word(canonical: &str) -> String {
    canonical
        .to_lowercase()
        .nfc() // Normalize Unicode combining forms
        .filter(|c| !c.is_whitespace())
        .collect()
}

#[derive(Debug, Clone)]
pub enum WordListError {
    InvalidPath(String),
    InvalidWord(String),
}

impl fmt::Display for WordListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            WordListError::InvalidPath(path) => format!("Can’t read file: “{path}”"),
            WordListError::InvalidWord(word) => {
                format!("Word list contains invalid word: “{word}”")
            }
        };
        write!(f, "{string}")
    }
}

/// Configuration describing a source of word list entries.
pub enum WordListSourceConfig {
    Memory { words: Vec<String> },
    File { path: OsString },
    FileContents { contents: &'static str },
}

/// A struct representing the loaded dictionary. This is static for the lifetime of a solve: the
/// per-slot candidate sets held by the `DomainStore` reference into it by `WordId`.
pub struct WordList {
    /// A list of all characters that occur in any (normalized) word. `GlyphId`s used everywhere
    /// else are indices into this list.
    pub glyphs: SmallVec<[char; MAX_GLYPH_COUNT]>,

    /// The inverse of `glyphs`: a map from a character to the `GlyphId` representing it.
    pub glyph_id_by_char: HashMap<char, GlyphId>,

    /// A list of all loaded words. A `WordId` is an index into this list.
    pub words: Vec<Word>,

    /// A map from a normalized string to the id of the `Word` representing it.
    pub word_id_by_string: HashMap<String, WordId>,
}

impl WordList {
    /// Construct a `WordList` from the given source, dropping entries that duplicate an earlier
    /// one after normalization.
    pub fn new(source: WordListSourceConfig) -> Result<WordList, WordListError> {
        let mut instance = WordList {
            glyphs: smallvec![],
            glyph_id_by_char: HashMap::new(),
            words: vec![],
            word_id_by_string: HashMap::new(),
        };

        let canonical_words = match source {
            WordListSourceConfig::Memory { words } => words,
            WordListSourceConfig::File { path } => {
                let contents = fs::read_to_string(&path)
                    .map_err(|_| WordListError::InvalidPath(path.to_string_lossy().into()))?;
                parse_word_list_file_contents(&contents)
            }
            WordListSourceConfig::FileContents { contents } => {
                parse_word_list_file_contents(contents)
            }
        };

        for canonical in canonical_words {
            let normalized = normalize_word(&canonical);
            if normalized.is_empty() {
                return Err(WordListError::InvalidWord(canonical));
            }
            if instance.word_id_by_string.contains_key(&normalized) {
                continue;
            }
            instance.add_word(&normalized, &canonical);
        }

        Ok(instance)
    }

    /// Shorthand for building a word list from plain strings, mostly for tests.
    pub fn from_words<S: Into<String>>(
        words: impl IntoIterator<Item = S>,
    ) -> Result<WordList, WordListError> {
        WordList::new(WordListSourceConfig::Memory {
            words: words.into_iter().map(Into::into).collect(),
        })
    }

    /// Build a word list from a dictionary file with one word per line.
    pub fn from_dict_file(path: impl Into<OsString>) -> Result<WordList, WordListError> {
        WordList::new(WordListSourceConfig::File { path: path.into() })
    }

    /// Borrow an existing word by id.
    #[must_use]
    pub fn get_word(&self, word_id: WordId) -> &Word {
        &self.words[word_id]
    }

    /// The number of words in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Get the id of the glyph representing the given char, interning it if needed.
    pub fn glyph_id_for_char(&mut self, ch: char) -> GlyphId {
        if let Some(&glyph_id) = self.glyph_id_by_char.get(&ch) {
            return glyph_id;
        }
        self.glyphs.push(ch);
        let glyph_id = self.glyphs.len() - 1;
        self.glyph_id_by_char.insert(ch, glyph_id);
        glyph_id
    }

    /// Add the given word to the list. The word must not be part of the list yet.
    fn add_word(&mut self, normalized: &str, canonical: &str) -> WordId {
        let glyphs: SmallVec<[GlyphId; MAX_SLOT_LENGTH]> = normalized
            .chars()
            .map(|c| self.glyph_id_for_char(c))
            .collect();

        let word_id = self.words.len();
        self.words.push(Word {
            normalized_string: normalized.to_string(),
            canonical_string: canonical.to_string(),
            glyphs,
        });
        self.word_id_by_string
            .insert(normalized.to_string(), word_id);

        word_id
    }
}

impl Debug for WordList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordList")
            .field("glyph_count", &self.glyphs.len())
            .field("word_count", &self.words.len())
            .finish()
    }
}

/// Parse the contents of a dictionary file: one word per line, with an optional `;`-separated
/// annotation (such as the score column of scored crossword word lists) which is ignored. Blank
/// lines are skipped.
fn parse_word_list_file_contents(file_contents: &str) -> Vec<String> {
    file_contents
        .lines()
        .filter_map(|line| {
            let canonical = line.split(';').next().unwrap_or("").trim();
            if canonical.is_empty() {
                None
            } else {
                Some(canonical.to_string())
            }
        })
        .collect()
}
