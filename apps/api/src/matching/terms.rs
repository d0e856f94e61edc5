//! Precomputed search terms for one taxonomy snapshot.
//!
//! Short all-word-character terms ("ux", "sql", "sap") are kept in a token
//! table; everything else goes into an Aho-Corasick automaton. Both map a
//! normalized term to every concept ordinal that carries it.

use std::collections::HashMap;

use aho_corasick::{AhoCorasick, BuildError, MatchKind};

/// Terms shorter than this (in chars, after normalization) are never indexed.
pub const MIN_TERM_CHARS: usize = 2;

/// Longest term still treated as an acronym and matched token-wise.
pub const ACRONYM_MAX_CHARS: usize = 4;

/// Lowercased and trimmed. The same normalization is used for lookups and text.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

pub fn is_searchable(normalized: &str) -> bool {
    normalized.chars().count() >= MIN_TERM_CHARS
}

/// Unicode alphanumerics and `_`, the same class as regex `\w`.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_acronym(normalized: &str) -> bool {
    normalized.chars().count() <= ACRONYM_MAX_CHARS && normalized.chars().all(is_word_char)
}

#[derive(Debug, Clone)]
pub struct TermEntry {
    pub term: String,
    /// Concept ordinals in registration order, without duplicates.
    pub owners: Vec<usize>,
}

#[derive(Debug, Default)]
pub struct TermIndexBuilder {
    entries: Vec<TermEntry>,
    by_term: HashMap<String, usize>,
}

impl TermIndexBuilder {
    /// Adds `term` for the concept at `ordinal`. Returns false when the term is
    /// too short to be searchable.
    pub fn add(&mut self, term: &str, ordinal: usize) -> bool {
        let normalized = normalize_term(term);
        if !is_searchable(&normalized) {
            return false;
        }

        let entry_id = match self.by_term.get(&normalized) {
            Some(&id) => id,
            None => {
                self.entries.push(TermEntry {
                    term: normalized.clone(),
                    owners: Vec::new(),
                });
                self.by_term.insert(normalized, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        let owners = &mut self.entries[entry_id].owners;
        if !owners.contains(&ordinal) {
            owners.push(ordinal);
        }
        true
    }

    pub fn build(self) -> Result<TermIndex, BuildError> {
        let mut acronyms = HashMap::new();
        let mut phrase_entries = Vec::new();

        for (id, entry) in self.entries.iter().enumerate() {
            if is_acronym(&entry.term) {
                acronyms.insert(entry.term.clone(), id);
            } else {
                phrase_entries.push(id);
            }
        }

        let automaton = if phrase_entries.is_empty() {
            None
        } else {
            let patterns = phrase_entries.iter().map(|&id| self.entries[id].term.as_str());
            Some(
                AhoCorasick::builder()
                    .match_kind(MatchKind::Standard)
                    .build(patterns)?,
            )
        };

        Ok(TermIndex {
            entries: self.entries,
            automaton,
            phrase_entries,
            acronyms,
        })
    }
}

/// A raw occurrence of an indexed term. Phrase hits are not yet checked for
/// word boundaries.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub entry: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Default)]
pub struct TermIndex {
    entries: Vec<TermEntry>,
    automaton: Option<AhoCorasick>,
    /// Automaton pattern id -> entry id.
    phrase_entries: Vec<usize>,
    acronyms: HashMap<String, usize>,
}

impl TermIndex {
    pub fn entry(&self, id: usize) -> &TermEntry {
        &self.entries[id]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All occurrences of phrase terms in already-lowercased text, overlapping
    /// ones included.
    pub fn phrase_candidates<'a>(&'a self, lowered: &'a str) -> impl Iterator<Item = Candidate> + 'a {
        self.automaton
            .iter()
            .flat_map(move |ac| ac.find_overlapping_iter(lowered))
            .map(move |m| Candidate {
                entry: self.phrase_entries[m.pattern().as_usize()],
                start: m.start(),
                end: m.end(),
            })
    }

    /// Tokens of already-lowercased text that equal an acronym term. Tokens are
    /// split on every non-word character, so these hits are bounded by
    /// construction.
    pub fn acronym_hits<'a>(&'a self, lowered: &'a str) -> impl Iterator<Item = Candidate> + 'a {
        tokens(lowered).filter_map(move |(start, token)| {
            self.acronyms.get(token).map(|&entry| Candidate {
                entry,
                start,
                end: start + token.len(),
            })
        })
    }
}

/// Word tokens with their byte offsets.
fn tokens(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut rest = text.char_indices().peekable();
    std::iter::from_fn(move || {
        while let Some(&(_, c)) = rest.peek() {
            if is_word_char(c) {
                break;
            }
            rest.next();
        }
        let (start, _) = *rest.peek()?;
        let mut end = start;
        while let Some(&(idx, c)) = rest.peek() {
            if !is_word_char(c) {
                break;
            }
            end = idx + c.len_utf8();
            rest.next();
        }
        Some((start, &text[start..end]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(terms: &[(&str, usize)]) -> TermIndex {
        let mut builder = TermIndexBuilder::default();
        for (term, ordinal) in terms {
            builder.add(term, *ordinal);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_normalize_term_trims_and_lowercases() {
        assert_eq!(normalize_term("  UX-Designer "), "ux-designer");
    }

    #[test]
    fn test_single_char_terms_are_not_indexed() {
        let mut builder = TermIndexBuilder::default();
        assert!(!builder.add("R", 0));
        assert!(!builder.add("  ", 0));
        assert!(builder.add("Go", 0));
        assert_eq!(builder.build().unwrap().len(), 1);
    }

    #[test]
    fn test_shared_term_keeps_all_owners() {
        let idx = index(&[("Scrum", 0), ("scrum", 3), ("SCRUM", 0)]);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.entry(0).owners, vec![0, 3]);
    }

    #[test]
    fn test_tokens_split_on_non_word_chars() {
        let found: Vec<(usize, &str)> = tokens("ux-designer / über_all, c#").collect();
        assert_eq!(
            found,
            vec![(0, "ux"), (3, "designer"), (14, "über_all"), (25, "c")]
        );
    }

    #[test]
    fn test_acronym_hits_are_whole_tokens() {
        let idx = index(&[("ux", 0)]);
        assert_eq!(idx.acronym_hits("ux-designer").count(), 1);
        assert_eq!(idx.acronym_hits("luxemburg").count(), 0);
        assert_eq!(idx.acronym_hits("wir suchen ux, sofort").count(), 1);
    }

    #[test]
    fn test_phrase_candidates_include_overlaps() {
        let idx = index(&[("user experience", 0), ("experience design", 1)]);
        let found: Vec<usize> = idx
            .phrase_candidates("user experience design")
            .map(|c| c.entry)
            .collect();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_empty_index_has_no_candidates() {
        let idx = TermIndexBuilder::default().build().unwrap();
        assert!(idx.is_empty());
        assert_eq!(idx.phrase_candidates("anything").count(), 0);
        assert_eq!(idx.acronym_hits("anything").count(), 0);
    }
}
