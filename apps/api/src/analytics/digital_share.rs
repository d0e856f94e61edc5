//! Percentage of digital skills among the valid skills of a posting.

use crate::analytics::blacklist::SkillBlacklist;
use crate::taxonomy::store::TaxonomySnapshot;

/// Drops blacklisted labels, resolves the rest against the taxonomy and
/// returns `digital / valid * 100`. Returns exactly `0.0` when nothing valid
/// remains.
pub fn calculate_digital_share<S: AsRef<str>>(
    labels: &[S],
    blacklist: &SkillBlacklist,
    taxonomy: &TaxonomySnapshot,
) -> f64 {
    let valid: Vec<_> = labels
        .iter()
        .map(AsRef::as_ref)
        .filter(|label| !blacklist.is_blacklisted(label))
        .filter_map(|label| taxonomy.lookup_skill_by_label(label))
        .collect();

    if valid.is_empty() {
        return 0.0;
    }

    let digital = valid.iter().filter(|skill| skill.is_digital).count();
    digital as f64 / valid.len() as f64 * 100.0
}
