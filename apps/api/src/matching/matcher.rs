//! Finds taxonomy concepts mentioned in free text.
//!
//! Matching is case-insensitive and word-boundary safe: a term only counts when
//! it is flanked by string edges or non-word characters. "ux" matches in
//! "UX-Designer" but never inside "Luxemburg"; "proto" never inside
//! "Protokolle". Each concept is reported once, at its first position.

use std::collections::HashMap;

use serde::Serialize;

use crate::analytics::blacklist::SkillBlacklist;
use crate::matching::terms::{is_word_char, Candidate, TermIndex};
use crate::taxonomy::models::{OccupationConcept, SkillConcept};
use crate::taxonomy::store::TaxonomySnapshot;

#[derive(Debug, Clone, Copy)]
pub struct SkillMatch<'a> {
    pub skill: &'a SkillConcept,
    /// Normalized term that matched.
    pub matched_term: &'a str,
    /// Byte offset of the first accepted occurrence in the lowercased text.
    pub position: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct OccupationMatch<'a> {
    pub occupation: &'a OccupationConcept,
    pub matched_term: &'a str,
    pub position: usize,
}

/// Owned, serializable form of a skill match handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedSkill {
    pub uri: String,
    pub preferred_label: String,
    pub is_digital: bool,
    pub is_research: bool,
    pub is_transversal: bool,
    pub group_code: Option<String>,
    pub matched_term: String,
    pub position: usize,
}

impl From<&SkillMatch<'_>> for MatchedSkill {
    fn from(m: &SkillMatch<'_>) -> Self {
        Self {
            uri: m.skill.uri.clone(),
            preferred_label: m.skill.preferred_label.clone(),
            is_digital: m.skill.is_digital,
            is_research: m.skill.is_research,
            is_transversal: m.skill.is_transversal,
            group_code: m.skill.group_code.clone(),
            matched_term: m.matched_term.to_string(),
            position: m.position,
        }
    }
}

/// All distinct skills mentioned in `text`, ordered by first occurrence.
pub fn match_skills<'a>(text: &str, taxonomy: &'a TaxonomySnapshot) -> Vec<SkillMatch<'a>> {
    let index = taxonomy.skill_terms();
    locate(index, text)
        .into_iter()
        .map(|hit| SkillMatch {
            skill: taxonomy.skill_at(hit.ordinal),
            matched_term: &index.entry(hit.entry).term,
            position: hit.position,
        })
        .collect()
}

pub fn find_skills_in_text<'a>(text: &str, taxonomy: &'a TaxonomySnapshot) -> Vec<&'a SkillConcept> {
    match_skills(text, taxonomy)
        .into_iter()
        .map(|m| m.skill)
        .collect()
}

/// Like `match_skills`, minus matches whose term or preferred label is
/// blacklisted noise.
pub fn match_skills_filtered<'a>(
    text: &str,
    taxonomy: &'a TaxonomySnapshot,
    blacklist: &SkillBlacklist,
) -> Vec<SkillMatch<'a>> {
    match_skills(text, taxonomy)
        .into_iter()
        .filter(|m| {
            !blacklist.is_blacklisted(m.matched_term)
                && !blacklist.is_blacklisted(&m.skill.preferred_label)
        })
        .collect()
}

pub fn match_occupations<'a>(text: &str, taxonomy: &'a TaxonomySnapshot) -> Vec<OccupationMatch<'a>> {
    let index = taxonomy.occupation_terms();
    locate(index, text)
        .into_iter()
        .map(|hit| OccupationMatch {
            occupation: taxonomy.occupation_at(hit.ordinal),
            matched_term: &index.entry(hit.entry).term,
            position: hit.position,
        })
        .collect()
}

pub fn find_occupations_in_text<'a>(
    text: &str,
    taxonomy: &'a TaxonomySnapshot,
) -> Vec<&'a OccupationConcept> {
    match_occupations(text, taxonomy)
        .into_iter()
        .map(|m| m.occupation)
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Hit {
    ordinal: usize,
    entry: usize,
    position: usize,
}

fn locate(index: &TermIndex, text: &str) -> Vec<Hit> {
    if text.is_empty() || index.is_empty() {
        return Vec::new();
    }
    let lowered = text.to_lowercase();

    let candidates = index
        .phrase_candidates(&lowered)
        .filter(|c| is_bounded(&lowered, c))
        .chain(index.acronym_hits(&lowered));

    let mut first_seen: HashMap<usize, Hit> = HashMap::new();
    for candidate in candidates {
        for &ordinal in &index.entry(candidate.entry).owners {
            let hit = Hit {
                ordinal,
                entry: candidate.entry,
                position: candidate.start,
            };
            first_seen
                .entry(ordinal)
                .and_modify(|best| {
                    if hit.position < best.position {
                        *best = hit;
                    }
                })
                .or_insert(hit);
        }
    }

    let mut hits: Vec<Hit> = first_seen.into_values().collect();
    hits.sort_by_key(|hit| (hit.position, hit.ordinal));
    hits
}

/// True when the candidate is preceded and followed by a string edge or a
/// non-word character.
fn is_bounded(text: &str, candidate: &Candidate) -> bool {
    let before = text[..candidate.start].chars().next_back();
    let after = text[candidate.end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::store::TaxonomyBuilder;

    fn skill(uri: &str, label: &str, synonyms: &[&str]) -> SkillConcept {
        SkillConcept::new(uri, label, synonyms.iter().map(|s| s.to_string()).collect())
    }

    fn taxonomy(skills: Vec<SkillConcept>) -> TaxonomySnapshot {
        let mut builder = TaxonomyBuilder::new();
        for s in skills {
            builder.register_skill(s);
        }
        builder.build().unwrap()
    }

    fn ux_skill() -> SkillConcept {
        skill(
            "esco:skill/ux",
            "Prototyp für User-Experience-Lösung erstellen",
            &["UX-Lösung", "User Experience Design", "UX"],
        )
    }

    fn luxemburgish_skill() -> SkillConcept {
        skill(
            "esco:skill/lux",
            "Geschriebenes Luxemburgisch verstehen",
            &["Luxemburgisch"],
        )
    }

    fn uris(found: &[&SkillConcept]) -> Vec<String> {
        found.iter().map(|s| s.uri.clone()).collect()
    }

    #[test]
    fn test_ux_not_found_inside_luxemburg() {
        let snapshot = taxonomy(vec![skill("esco:skill/ux", "ux", &[])]);
        let found = find_skills_in_text("Der Arbeitsort ist Luxemburg.", &snapshot);
        assert!(found.is_empty());
    }

    #[test]
    fn test_ux_not_found_inside_luxemburgisch() {
        let snapshot = taxonomy(vec![ux_skill()]);
        let found = find_skills_in_text("Sie sprechen fließend luxemburgisch.", &snapshot);
        assert!(found.is_empty());
    }

    #[test]
    fn test_ux_designer_matches_single_concept() {
        let snapshot = taxonomy(vec![ux_skill()]);
        let found = find_skills_in_text("Wir suchen UX Designer für Prototypen.", &snapshot);
        assert_eq!(uris(&found), vec!["esco:skill/ux"]);
    }

    #[test]
    fn test_ux_in_hyphenated_compound() {
        let snapshot = taxonomy(vec![skill("esco:skill/ux", "ux", &[])]);
        let found = find_skills_in_text("Erfahrung als UX-Designer/in", &snapshot);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_trap_sentence_finds_only_real_skills() {
        let snapshot = taxonomy(vec![
            ux_skill(),
            luxemburgish_skill(),
            skill("esco:skill/proto", "Prototypen entwickeln", &["Prototypen"]),
            skill("esco:skill/proto-short", "proto", &[]),
        ]);
        let text = "Wir erstellen Prototypen für UX-Lösungen in Luxemburg und führen Protokolle.";
        let found = find_skills_in_text(text, &snapshot);

        assert_eq!(uris(&found), vec!["esco:skill/proto", "esco:skill/ux"]);
    }

    #[test]
    fn test_prefix_of_longer_word_does_not_match() {
        let snapshot = taxonomy(vec![skill("esco:skill/proto", "Prototyp", &[])]);
        assert!(find_skills_in_text("Wir führen Protokolle.", &snapshot).is_empty());
        assert!(find_skills_in_text("Wir bauen Prototypen.", &snapshot).is_empty());
        assert_eq!(find_skills_in_text("Ein Prototyp, bitte.", &snapshot).len(), 1);
    }

    #[test]
    fn test_german_compound_does_not_match_its_head() {
        let snapshot = taxonomy(vec![skill("esco:skill/db", "Datenbank", &[])]);
        assert!(find_skills_in_text("Datenbankmanagement ist Pflicht", &snapshot).is_empty());
        assert_eq!(find_skills_in_text("Datenbank-Design", &snapshot).len(), 1);
    }

    #[test]
    fn test_repeated_mentions_collapse_to_one() {
        let snapshot = taxonomy(vec![ux_skill()]);
        let found = find_skills_in_text("UX, UX und nochmal UX. User Experience Design!", &snapshot);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_matching_is_idempotent() {
        let snapshot = taxonomy(vec![ux_skill(), luxemburgish_skill()]);
        let text = "UX in Luxemburg, Luxemburgisch erwünscht";
        let first = uris(&find_skills_in_text(text, &snapshot));
        let second = uris(&find_skills_in_text(text, &snapshot));
        assert_eq!(first, second);
        assert_eq!(first, vec!["esco:skill/ux", "esco:skill/lux"]);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        let snapshot = taxonomy(vec![ux_skill()]);
        assert!(find_skills_in_text("", &snapshot).is_empty());
        assert!(find_skills_in_text("   ", &snapshot).is_empty());
    }

    #[test]
    fn test_empty_taxonomy_yields_nothing() {
        let snapshot = TaxonomySnapshot::empty();
        assert!(find_skills_in_text("UX Designer", &snapshot).is_empty());
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let snapshot = taxonomy(vec![skill("esco:skill/java", "Java", &[])]);
        assert_eq!(find_skills_in_text("JAVA und java", &snapshot).len(), 1);
    }

    #[test]
    fn test_results_ordered_by_first_position() {
        let snapshot = taxonomy(vec![
            skill("s/sql", "SQL", &[]),
            skill("s/java", "Java", &[]),
        ]);
        let matches = match_skills("Java und später SQL, wieder Java", &snapshot);
        assert_eq!(matches[0].skill.uri, "s/java");
        assert_eq!(matches[0].position, 0);
        assert_eq!(matches[1].skill.uri, "s/sql");
        assert_eq!(matches[1].matched_term, "sql");
    }

    #[test]
    fn test_first_occurrence_wins_across_terms() {
        let snapshot = taxonomy(vec![ux_skill()]);
        let matches = match_skills("User Experience Design und UX", &snapshot);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matched_term, "user experience design");
        assert_eq!(matches[0].position, 0);
    }

    #[test]
    fn test_shared_synonym_finds_both_concepts() {
        let snapshot = taxonomy(vec![
            skill("s/a", "Projektmanagement", &["Scrum"]),
            skill("s/b", "Agile Methoden anwenden", &["Scrum"]),
        ]);
        assert_eq!(find_skills_in_text("Scrum Master", &snapshot).len(), 2);
    }

    #[test]
    fn test_multi_word_term_matched_as_unit() {
        let snapshot = taxonomy(vec![skill("s/ml", "maschinelles Lernen", &[])]);
        assert_eq!(
            find_skills_in_text("Kenntnisse in maschinelles Lernen.", &snapshot).len(),
            1
        );
        assert!(find_skills_in_text("maschinelles Denken und Lernen", &snapshot).is_empty());
    }

    #[test]
    fn test_term_with_symbols_respects_boundaries() {
        let snapshot = taxonomy(vec![skill("s/cpp", "C++", &[])]);
        assert_eq!(find_skills_in_text("Wir nutzen C++ und Rust", &snapshot).len(), 1);
        assert_eq!(find_skills_in_text("(C++)", &snapshot).len(), 1);
    }

    #[test]
    fn test_occupations_matched_analogously() {
        let mut builder = TaxonomyBuilder::new();
        builder.register_occupation(OccupationConcept::new(
            "o/ux",
            "UX-Designer/UX-Designerin",
            vec!["UX-Designer".to_string()],
        ));
        let snapshot = builder.build().unwrap();
        let found = find_occupations_in_text("Wir suchen eine/n UX-Designer in Luxemburg", &snapshot);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].uri, "o/ux");
    }

    #[test]
    fn test_filtered_matching_drops_blacklisted_terms() {
        let snapshot = taxonomy(vec![
            skill("s/noise", "Kenntnisse", &[]),
            skill("s/rust", "Rust", &[]),
        ]);
        let blacklist = SkillBlacklist::default();
        let matches = match_skills_filtered("Kenntnisse in Rust", &snapshot, &blacklist);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].skill.uri, "s/rust");
    }

    #[test]
    fn test_matched_skill_record_carries_flags() {
        let mut digital = skill("s/sql", "SQL", &[]);
        digital.is_digital = true;
        let snapshot = taxonomy(vec![digital]);
        let matches = match_skills("SQL", &snapshot);
        let record = MatchedSkill::from(&matches[0]);
        assert_eq!(record.uri, "s/sql");
        assert!(record.is_digital);
        assert_eq!(record.matched_term, "sql");
    }
}
