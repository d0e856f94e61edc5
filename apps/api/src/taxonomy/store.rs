//! Concept maps, label lookup indices and occupation→skill relations.
//!
//! A `TaxonomyBuilder` is filled by the loader off to the side and frozen into
//! an immutable `TaxonomySnapshot`. The `TaxonomyStore` hands readers an
//! `Arc` of the current snapshot and swaps in a new one only once it is
//! complete, so nobody ever sees a half-built index.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::{debug, info};

use crate::analytics::blacklist::SkillBlacklist;
use crate::matching::matcher::{match_skills_filtered, MatchedSkill};
use crate::matching::terms::{is_searchable, normalize_term, TermIndex, TermIndexBuilder};
use crate::taxonomy::loader::LoadReport;
use crate::taxonomy::models::{OccupationConcept, OccupationSkillRelation, SkillConcept};

// ────────────────────────────────────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct TaxonomyBuilder {
    skills: Vec<SkillConcept>,
    skill_ordinals: HashMap<String, usize>,
    occupations: Vec<OccupationConcept>,
    occupation_ordinals: HashMap<String, usize>,
    skill_index: HashMap<String, String>,
    occupation_index: HashMap<String, String>,
    /// Approved discovery terms: normalized term -> skill ordinal.
    skill_aliases: Vec<(String, usize)>,
    relations: HashMap<String, Vec<OccupationSkillRelation>>,
    relation_count: usize,
    /// Skill group URI -> group code.
    skill_groups: HashMap<String, String>,
}

impl TaxonomyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a skill and indexes its preferred label and synonyms. A skill
    /// registered again under the same URI (another language file) takes the
    /// new preferred label and keeps the earlier terms as synonyms, so lookups
    /// and text matching see the same set of terms.
    pub fn register_skill(&mut self, mut concept: SkillConcept) {
        if let Some(&ordinal) = self.skill_ordinals.get(&concept.uri) {
            let previous = &self.skills[ordinal];
            carry_over_terms(previous.terms(), &concept.preferred_label, &mut concept.synonyms);
            concept.is_digital |= previous.is_digital;
            concept.is_research |= previous.is_research;
            concept.is_transversal |= previous.is_transversal;
            for parent in &previous.parent_uris {
                if !concept.parent_uris.contains(parent) {
                    concept.parent_uris.push(parent.clone());
                }
            }
            if concept.group_code.is_none() {
                concept.group_code = previous.group_code.clone();
            }
        }
        let uri = concept.uri.clone();
        for term in concept.terms() {
            index_term(&mut self.skill_index, term, &uri, "skill");
        }
        upsert(&mut self.skills, &mut self.skill_ordinals, uri, concept);
    }

    pub fn register_occupation(&mut self, mut concept: OccupationConcept) {
        if let Some(&ordinal) = self.occupation_ordinals.get(&concept.uri) {
            let previous = &self.occupations[ordinal];
            carry_over_terms(previous.terms(), &concept.preferred_label, &mut concept.synonyms);
        }
        let uri = concept.uri.clone();
        for term in concept.terms() {
            index_term(&mut self.occupation_index, term, &uri, "occupation");
        }
        upsert(&mut self.occupations, &mut self.occupation_ordinals, uri, concept);
    }

    /// Records a relation. Neither URI has to be known yet: referential
    /// integrity is not enforced.
    pub fn register_relation(&mut self, relation: OccupationSkillRelation) {
        self.relations
            .entry(relation.occupation_uri.clone())
            .or_default()
            .push(relation);
        self.relation_count += 1;
    }

    pub fn register_skill_group(&mut self, uri: impl Into<String>, code: impl Into<String>) {
        self.skill_groups.insert(uri.into(), code.into());
    }

    /// Maps an approved discovery term onto the skill that `canonical_label`
    /// resolves to. Returns false when the label is unknown or the term is
    /// too short.
    pub fn register_skill_alias(&mut self, term: &str, canonical_label: &str) -> bool {
        let Some(uri) = self.skill_index.get(&normalize_term(canonical_label)).cloned() else {
            return false;
        };
        let Some(&ordinal) = self.skill_ordinals.get(&uri) else {
            return false;
        };
        if !index_term(&mut self.skill_index, term, &uri, "skill") {
            return false;
        }
        self.skill_aliases.push((normalize_term(term), ordinal));
        true
    }

    pub fn skill_mut(&mut self, uri: &str) -> Option<&mut SkillConcept> {
        let ordinal = *self.skill_ordinals.get(uri)?;
        Some(&mut self.skills[ordinal])
    }

    /// Resolves group codes and precomputes the search terms.
    pub fn build(mut self) -> Result<TaxonomySnapshot, aho_corasick::BuildError> {
        for skill in &mut self.skills {
            if skill.group_code.is_none() {
                skill.group_code = skill
                    .parent_uris
                    .iter()
                    .find_map(|parent| self.skill_groups.get(parent))
                    .cloned();
            }
        }

        let mut skill_terms = TermIndexBuilder::default();
        for (ordinal, skill) in self.skills.iter().enumerate() {
            for term in skill.terms() {
                skill_terms.add(term, ordinal);
            }
        }
        for (term, ordinal) in &self.skill_aliases {
            skill_terms.add(term, *ordinal);
        }

        let mut occupation_terms = TermIndexBuilder::default();
        for (ordinal, occupation) in self.occupations.iter().enumerate() {
            for term in occupation.terms() {
                occupation_terms.add(term, ordinal);
            }
        }

        Ok(TaxonomySnapshot {
            skills: self.skills,
            skill_ordinals: self.skill_ordinals,
            occupations: self.occupations,
            occupation_ordinals: self.occupation_ordinals,
            skill_index: self.skill_index,
            occupation_index: self.occupation_index,
            relations: self.relations,
            relation_count: self.relation_count,
            skill_terms: skill_terms.build()?,
            occupation_terms: occupation_terms.build()?,
        })
    }
}

/// Appends every earlier term not already carried by the replacing concept.
fn carry_over_terms<'a>(
    previous: impl Iterator<Item = &'a str>,
    preferred_label: &str,
    synonyms: &mut Vec<String>,
) {
    for term in previous {
        let key = normalize_term(term);
        let known = normalize_term(preferred_label) == key
            || synonyms.iter().any(|s| normalize_term(s) == key);
        if !known {
            synonyms.push(term.to_string());
        }
    }
}

fn upsert<T>(items: &mut Vec<T>, ordinals: &mut HashMap<String, usize>, uri: String, item: T) {
    match ordinals.get(&uri) {
        Some(&ordinal) => items[ordinal] = item,
        None => {
            ordinals.insert(uri, items.len());
            items.push(item);
        }
    }
}

/// Last writer wins on collisions; they are only logged.
fn index_term(index: &mut HashMap<String, String>, term: &str, uri: &str, kind: &str) -> bool {
    let key = normalize_term(term);
    if !is_searchable(&key) {
        return false;
    }
    if let Some(previous) = index.insert(key, uri.to_string()) {
        if previous != uri {
            debug!(
                "{kind} label '{}' moved from {previous} to {uri}",
                term.trim()
            );
        }
    }
    true
}

// ────────────────────────────────────────────────────────────────────────────
// Snapshot
// ────────────────────────────────────────────────────────────────────────────

/// One complete, immutable load of the taxonomy.
#[derive(Debug, Default)]
pub struct TaxonomySnapshot {
    skills: Vec<SkillConcept>,
    skill_ordinals: HashMap<String, usize>,
    occupations: Vec<OccupationConcept>,
    occupation_ordinals: HashMap<String, usize>,
    skill_index: HashMap<String, String>,
    occupation_index: HashMap<String, String>,
    relations: HashMap<String, Vec<OccupationSkillRelation>>,
    relation_count: usize,
    skill_terms: TermIndex,
    occupation_terms: TermIndex,
}

impl TaxonomySnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn lookup_skill_by_label(&self, label: &str) -> Option<&SkillConcept> {
        let uri = self.skill_index.get(&normalize_term(label))?;
        self.skill_by_uri(uri)
    }

    pub fn lookup_occupation_by_label(&self, label: &str) -> Option<&OccupationConcept> {
        let uri = self.occupation_index.get(&normalize_term(label))?;
        self.occupation_by_uri(uri)
    }

    pub fn skill_by_uri(&self, uri: &str) -> Option<&SkillConcept> {
        self.skill_ordinals.get(uri).map(|&i| &self.skills[i])
    }

    pub fn occupation_by_uri(&self, uri: &str) -> Option<&OccupationConcept> {
        self.occupation_ordinals.get(uri).map(|&i| &self.occupations[i])
    }

    /// Never fails: an occupation without relations yields an empty slice.
    pub fn relations_for_occupation(&self, occupation_uri: &str) -> &[OccupationSkillRelation] {
        self.relations
            .get(occupation_uri)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn all_skills(&self) -> &[SkillConcept] {
        &self.skills
    }

    pub fn all_occupations(&self) -> &[OccupationConcept] {
        &self.occupations
    }

    pub(crate) fn skill_at(&self, ordinal: usize) -> &SkillConcept {
        &self.skills[ordinal]
    }

    pub(crate) fn occupation_at(&self, ordinal: usize) -> &OccupationConcept {
        &self.occupations[ordinal]
    }

    pub(crate) fn skill_terms(&self) -> &TermIndex {
        &self.skill_terms
    }

    pub(crate) fn occupation_terms(&self) -> &TermIndex {
        &self.occupation_terms
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            skills: self.skills.len(),
            occupations: self.occupations.len(),
            relations: self.relation_count,
            skill_labels: self.skill_index.len(),
            occupation_labels: self.occupation_index.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub skills: usize,
    pub occupations: usize,
    pub relations: usize,
    pub skill_labels: usize,
    pub occupation_labels: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadState {
    NotStarted,
    Loading,
    Ready,
    Failed(String),
}

/// Process-wide holder of the current snapshot plus the readiness flag.
#[derive(Debug)]
pub struct TaxonomyStore {
    current: RwLock<Arc<TaxonomySnapshot>>,
    ready: AtomicBool,
    state: RwLock<LoadState>,
    last_report: RwLock<Option<LoadReport>>,
}

impl Default for TaxonomyStore {
    fn default() -> Self {
        Self {
            current: RwLock::new(Arc::new(TaxonomySnapshot::empty())),
            ready: AtomicBool::new(false),
            state: RwLock::new(LoadState::NotStarted),
            last_report: RwLock::new(None),
        }
    }
}

impl TaxonomyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot readers should match against. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<TaxonomySnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True once a complete load has been installed. Stays true while a later
    /// reload runs, since the previous snapshot keeps serving.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn state(&self) -> LoadState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_report(&self) -> Option<LoadReport> {
        self.last_report
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Moves to `Loading`. Returns false if a load is already running.
    pub fn begin_load(&self) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *state == LoadState::Loading {
            return false;
        }
        *state = LoadState::Loading;
        true
    }

    /// Swaps in a complete snapshot and flips the readiness flag.
    pub fn install(&self, snapshot: TaxonomySnapshot, report: LoadReport) {
        let stats = snapshot.stats();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
        *self.last_report.write().unwrap_or_else(PoisonError::into_inner) = Some(report);
        self.ready.store(true, Ordering::Release);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = LoadState::Ready;

        info!(
            "Taxonomy ready: {} skills, {} occupations, {} relations, {} lookup labels",
            stats.skills,
            stats.occupations,
            stats.relations,
            stats.skill_labels + stats.occupation_labels
        );
    }

    /// Records a failed load. The current snapshot is left untouched.
    pub fn mark_failed(&self, reason: impl Into<String>) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) =
            LoadState::Failed(reason.into());
    }

    /// Skills mentioned in `text` with blacklisted noise removed. Empty while
    /// no load has completed.
    pub fn match_text(&self, text: &str, blacklist: &SkillBlacklist) -> Vec<MatchedSkill> {
        if !self.is_ready() {
            return Vec::new();
        }
        let snapshot = self.snapshot();
        match_skills_filtered(text, &snapshot, blacklist)
            .iter()
            .map(MatchedSkill::from)
            .collect()
    }

    pub fn lookup_skill_by_label(&self, label: &str) -> Option<SkillConcept> {
        self.snapshot().lookup_skill_by_label(label).cloned()
    }

    pub fn lookup_occupation_by_label(&self, label: &str) -> Option<OccupationConcept> {
        self.snapshot().lookup_occupation_by_label(label).cloned()
    }

    pub fn relations_for_occupation(&self, occupation_uri: &str) -> Vec<OccupationSkillRelation> {
        self.snapshot()
            .relations_for_occupation(occupation_uri)
            .to_vec()
    }

    pub fn all_skills(&self) -> Vec<SkillConcept> {
        self.snapshot().all_skills().to_vec()
    }
}
