//! Finds the ESCO export directory, reads every recognised CSV in dependency
//! order and installs the result in the store.
//!
//! Order: concepts (skills, occupations, skill groups) → enrichment
//! (collections, hierarchy) → relations → approved aliases. Per-file errors
//! are logged and the file is skipped; only a missing directory or a load
//! without any concept file fails the whole run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::TaxonomyError;
use crate::taxonomy::csv::{split_synonyms, CsvSource};
use crate::taxonomy::models::{
    OccupationConcept, OccupationSkillRelation, RelationType, SkillConcept,
};
use crate::taxonomy::store::{TaxonomyBuilder, TaxonomySnapshot, TaxonomyStore};

/// Parent directories tried after the configured base path.
pub const MAX_FALLBACKS: usize = 3;

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub data_path: PathBuf,
    pub approved_aliases: Option<PathBuf>,
}

/// Summary of one completed load.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub data_dir: PathBuf,
    pub files_loaded: Vec<String>,
    pub files_skipped: Vec<String>,
    pub skills: usize,
    pub occupations: usize,
    pub relations: usize,
    pub skill_labels: usize,
    pub occupation_labels: usize,
    pub approved_aliases: usize,
    pub loaded_at: Option<DateTime<Utc>>,
}

// ────────────────────────────────────────────────────────────────────────────
// File classification
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Digital,
    Research,
    Transversal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyFile {
    Skills,
    Occupations,
    SkillGroups,
    Collection(CollectionKind),
    Hierarchy,
    Relations,
}

impl TaxonomyFile {
    /// Classifies by case-insensitive file name substring, most specific
    /// pattern first. Unknown files, and collections that do not set a skill
    /// flag, return `None`.
    pub fn classify(file_name: &str) -> Option<Self> {
        let name = file_name.to_lowercase();
        if name.contains("occupationskillrelations") {
            Some(Self::Relations)
        } else if name.contains("collection") {
            if name.contains("occupation") {
                None
            } else if name.contains("digital") {
                Some(Self::Collection(CollectionKind::Digital))
            } else if name.contains("research") {
                Some(Self::Collection(CollectionKind::Research))
            } else if name.contains("transversal") {
                Some(Self::Collection(CollectionKind::Transversal))
            } else {
                None
            }
        } else if name.contains("broaderrelationsskillpillar") || name.contains("skillshierarchy") {
            Some(Self::Hierarchy)
        } else if name.contains("skillskillrelations") {
            None
        } else if name.contains("skillgroups") {
            Some(Self::SkillGroups)
        } else if name.contains("skills") {
            Some(Self::Skills)
        } else if name.contains("occupations") {
            Some(Self::Occupations)
        } else {
            None
        }
    }

    fn phase(self) -> u8 {
        match self {
            Self::Skills | Self::Occupations | Self::SkillGroups => 0,
            Self::Collection(_) | Self::Hierarchy => 1,
            Self::Relations => 2,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Directory resolution
// ────────────────────────────────────────────────────────────────────────────

/// Candidate directories for `base`: the path itself, then the same relative
/// path under up to `MAX_FALLBACKS` ancestors of `cwd`. Absolute paths have
/// no fallbacks.
pub fn candidate_dirs(cwd: &Path, base: &Path) -> Vec<PathBuf> {
    if base.is_absolute() {
        return vec![base.to_path_buf()];
    }
    let relative = base.strip_prefix(".").unwrap_or(base);
    cwd.ancestors()
        .take(MAX_FALLBACKS + 1)
        .map(|dir| dir.join(relative))
        .collect()
}

pub fn resolve_data_dir_from(cwd: &Path, base: &Path) -> Option<PathBuf> {
    candidate_dirs(cwd, base).into_iter().find(|dir| {
        let found = contains_taxonomy_files(dir);
        debug!("Taxonomy directory candidate {}: {}", dir.display(), found);
        found
    })
}

pub fn resolve_data_dir(base: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_data_dir_from(&cwd, base)
}

/// True when `dir` holds at least one CSV the loader recognises.
fn contains_taxonomy_files(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries.flatten().map(|entry| entry.path()).any(|path| {
                is_csv(&path) && TaxonomyFile::classify(&file_name(&path)).is_some()
            })
        })
        .unwrap_or(false)
}

fn is_csv(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

// ────────────────────────────────────────────────────────────────────────────
// Loading
// ────────────────────────────────────────────────────────────────────────────

/// Reads a complete taxonomy from `settings`. Blocking.
pub fn load_taxonomy(
    settings: &LoaderSettings,
) -> Result<(TaxonomySnapshot, LoadReport), TaxonomyError> {
    let dir = resolve_data_dir(&settings.data_path)
        .ok_or_else(|| TaxonomyError::DataDirNotFound(settings.data_path.clone()))?;
    load_directory(&dir, settings.approved_aliases.as_deref())
}

pub fn load_directory(
    dir: &Path,
    approved_aliases: Option<&Path>,
) -> Result<(TaxonomySnapshot, LoadReport), TaxonomyError> {
    info!("Loading ESCO taxonomy from {}", dir.display());

    let mut files: Vec<(TaxonomyFile, PathBuf)> = std::fs::read_dir(dir)
        .map_err(|source| TaxonomyError::Io {
            path: dir.to_path_buf(),
            source,
        })?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| is_csv(path))
        .filter_map(|path| {
            let kind = TaxonomyFile::classify(&file_name(&path));
            if kind.is_none() {
                debug!("Ignoring unrecognised file {}", path.display());
            }
            kind.map(|kind| (kind, path))
        })
        .collect();
    // Stable by phase, then by name, so last-writer-wins is deterministic.
    files.sort_by(|a, b| (a.0.phase(), &a.1).cmp(&(b.0.phase(), &b.1)));

    let mut builder = TaxonomyBuilder::new();
    let mut report = LoadReport {
        data_dir: dir.to_path_buf(),
        ..LoadReport::default()
    };
    let mut concept_files = 0;

    for (kind, path) in &files {
        let name = file_name(path);
        match load_file(*kind, path, &mut builder) {
            Ok(rows) => {
                debug!("{name}: {rows} rows applied as {kind:?}");
                if kind.phase() == 0 {
                    concept_files += 1;
                }
                report.files_loaded.push(name);
            }
            Err(e) => {
                warn!("Skipping taxonomy file: {e}");
                report.files_skipped.push(name);
            }
        }
    }

    if concept_files == 0 {
        return Err(TaxonomyError::NoConcepts(dir.to_path_buf()));
    }

    if let Some(path) = approved_aliases {
        match load_approved_aliases(path, &mut builder) {
            Ok(count) => report.approved_aliases = count,
            Err(e) => warn!("Skipping approved aliases: {e}"),
        }
    }

    let snapshot = builder.build()?;
    let stats = snapshot.stats();
    report.skills = stats.skills;
    report.occupations = stats.occupations;
    report.relations = stats.relations;
    report.skill_labels = stats.skill_labels;
    report.occupation_labels = stats.occupation_labels;
    report.loaded_at = Some(Utc::now());

    Ok((snapshot, report))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn load_file(
    kind: TaxonomyFile,
    path: &Path,
    builder: &mut TaxonomyBuilder,
) -> Result<usize, TaxonomyError> {
    let source = CsvSource::read(path)?;
    match kind {
        TaxonomyFile::Skills => load_concepts(&source, builder, true),
        TaxonomyFile::Occupations => load_concepts(&source, builder, false),
        TaxonomyFile::SkillGroups => load_skill_groups(&source, builder),
        TaxonomyFile::Collection(collection) => load_collection(&source, builder, collection),
        TaxonomyFile::Hierarchy => load_hierarchy(&source, builder),
        TaxonomyFile::Relations => load_relations(&source, builder),
    }
}

pub fn load_concepts(
    source: &CsvSource,
    builder: &mut TaxonomyBuilder,
    is_skill: bool,
) -> Result<usize, TaxonomyError> {
    let uri_idx = source.require_column("conceptUri")?;
    let label_idx = source.require_column("preferredLabel")?;
    let alt_idx = source.alt_labels_column();

    let mut count = 0;
    for row in source.rows()? {
        let uri = row.cell(uri_idx);
        let label = row.cell(label_idx);
        if uri.is_empty() || label.is_empty() {
            continue;
        }
        let synonyms = alt_idx
            .map(|idx| split_synonyms(row.raw(idx)))
            .unwrap_or_default();

        if is_skill {
            builder.register_skill(SkillConcept::new(uri, label, synonyms));
        } else {
            builder.register_occupation(OccupationConcept::new(uri, label, synonyms));
        }
        count += 1;
    }
    Ok(count)
}

pub fn load_relations(
    source: &CsvSource,
    builder: &mut TaxonomyBuilder,
) -> Result<usize, TaxonomyError> {
    let occupation_idx = source.require_column("occupationUri")?;
    let skill_idx = source.require_column("skillUri")?;
    let type_idx = source.column("relationType");

    let mut count = 0;
    for row in source.rows()? {
        let occupation_uri = row.cell(occupation_idx);
        let skill_uri = row.cell(skill_idx);
        if occupation_uri.is_empty() || skill_uri.is_empty() {
            continue;
        }
        let relation_type = type_idx
            .map(|idx| RelationType::from_cell(row.cell(idx)))
            .unwrap_or(RelationType::Essential);

        builder.register_relation(OccupationSkillRelation {
            occupation_uri: occupation_uri.to_string(),
            skill_uri: skill_uri.to_string(),
            relation_type,
        });
        count += 1;
    }
    Ok(count)
}

/// Flags listed skills. URIs that are not loaded skills are skipped.
pub fn load_collection(
    source: &CsvSource,
    builder: &mut TaxonomyBuilder,
    kind: CollectionKind,
) -> Result<usize, TaxonomyError> {
    let uri_idx = source
        .column("conceptUri")
        .or_else(|| {
            source
                .headers()
                .iter()
                .position(|h| h.to_lowercase().contains("uri"))
        })
        .ok_or_else(|| TaxonomyError::MissingColumn {
            path: source.path().to_path_buf(),
            column: "conceptUri",
        })?;

    let mut count = 0;
    for row in source.rows()? {
        let Some(skill) = builder.skill_mut(row.cell(uri_idx)) else {
            continue;
        };
        match kind {
            CollectionKind::Digital => skill.is_digital = true,
            CollectionKind::Research => skill.is_research = true,
            CollectionKind::Transversal => skill.is_transversal = true,
        }
        count += 1;
    }
    Ok(count)
}

pub fn load_hierarchy(
    source: &CsvSource,
    builder: &mut TaxonomyBuilder,
) -> Result<usize, TaxonomyError> {
    let uri_idx = source.require_column("conceptUri")?;
    let parent_idx = source
        .column("broaderUri")
        .or_else(|| source.column("parentUri"))
        .ok_or_else(|| TaxonomyError::MissingColumn {
            path: source.path().to_path_buf(),
            column: "broaderUri",
        })?;

    let mut count = 0;
    for row in source.rows()? {
        let parent = row.cell(parent_idx);
        if parent.is_empty() {
            continue;
        }
        let Some(skill) = builder.skill_mut(row.cell(uri_idx)) else {
            continue;
        };
        if !skill.parent_uris.iter().any(|p| p == parent) {
            skill.parent_uris.push(parent.to_string());
            count += 1;
        }
    }
    Ok(count)
}

pub fn load_skill_groups(
    source: &CsvSource,
    builder: &mut TaxonomyBuilder,
) -> Result<usize, TaxonomyError> {
    let uri_idx = source.require_column("conceptUri")?;
    let code_idx = source.require_column("code")?;

    let mut count = 0;
    for row in source.rows()? {
        let (uri, code) = (row.cell(uri_idx), row.cell(code_idx));
        if uri.is_empty() || code.is_empty() {
            continue;
        }
        builder.register_skill_group(uri, code);
        count += 1;
    }
    Ok(count)
}

/// Reads `{term: canonical label}` pairs approved in discovery review.
pub fn load_approved_aliases(
    path: &Path,
    builder: &mut TaxonomyBuilder,
) -> Result<usize, TaxonomyError> {
    let text = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let aliases: BTreeMap<String, String> =
        serde_json::from_str(&text).map_err(|source| TaxonomyError::Aliases {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(aliases
        .iter()
        .filter(|(term, canonical)| builder.register_skill_alias(term, canonical))
        .count())
}

// ────────────────────────────────────────────────────────────────────────────
// Background task
// ────────────────────────────────────────────────────────────────────────────

/// Runs one load on the blocking pool. Returns `None` when a load is already
/// in progress.
pub fn spawn_loader(store: Arc<TaxonomyStore>, settings: LoaderSettings) -> Option<JoinHandle<()>> {
    if !store.begin_load() {
        return None;
    }
    info!("ESCO loader started for {}", settings.data_path.display());

    Some(tokio::task::spawn_blocking(move || {
        match load_taxonomy(&settings) {
            Ok((snapshot, report)) => store.install(snapshot, report),
            Err(e) => {
                error!("ESCO taxonomy load failed: {e}");
                store.mark_failed(e.to_string());
            }
        }
    }))
}
