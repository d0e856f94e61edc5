//! Generic noise terms that must not count as skills.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use crate::matching::terms::normalize_term;

/// Only true noise words. Technical words such as "entwicklung" or
/// "management" must never be listed here.
pub const DEFAULT_BLACKLIST: &[&str] = &[
    "erfahrung",
    "kenntnisse",
    "bereich",
    "aufgaben",
    "verantwortung",
    "sowie",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillBlacklist {
    terms: HashSet<String>,
}

impl Default for SkillBlacklist {
    fn default() -> Self {
        Self::new(DEFAULT_BLACKLIST.iter().copied())
    }
}

impl SkillBlacklist {
    /// Terms are normalized; blank entries are dropped.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            terms: terms
                .into_iter()
                .map(|t| normalize_term(t.as_ref()))
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn is_blacklisted(&self, label: &str) -> bool {
        self.terms.contains(&normalize_term(label))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Sorted copy of the terms.
    pub fn terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = self.terms.iter().cloned().collect();
        terms.sort();
        terms
    }
}

/// Blacklist handle shared across requests. The external rule store refreshes
/// it by replacing the whole set.
#[derive(Debug, Default)]
pub struct SharedBlacklist {
    current: RwLock<Arc<SkillBlacklist>>,
}

impl SharedBlacklist {
    pub fn new(blacklist: SkillBlacklist) -> Self {
        Self {
            current: RwLock::new(Arc::new(blacklist)),
        }
    }

    pub fn current(&self) -> Arc<SkillBlacklist> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, blacklist: SkillBlacklist) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(blacklist);
    }
}
