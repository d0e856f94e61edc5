use serde::{Deserialize, Serialize};

/// A single ESCO skill/competence, keyed by its concept URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillConcept {
    pub uri: String,
    pub preferred_label: String,
    /// Alt labels in file order. Fragments of one character are already dropped.
    pub synonyms: Vec<String>,
    pub is_digital: bool,
    pub is_research: bool,
    pub is_transversal: bool,
    pub parent_uris: Vec<String>,
    pub group_code: Option<String>,
}

impl SkillConcept {
    pub fn new(uri: impl Into<String>, preferred_label: impl Into<String>, synonyms: Vec<String>) -> Self {
        Self {
            uri: uri.into(),
            preferred_label: preferred_label.into(),
            synonyms,
            is_digital: false,
            is_research: false,
            is_transversal: false,
            parent_uris: Vec::new(),
            group_code: None,
        }
    }

    /// Preferred label followed by every synonym.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.preferred_label.as_str()).chain(self.synonyms.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupationConcept {
    pub uri: String,
    pub preferred_label: String,
    pub synonyms: Vec<String>,
}

impl OccupationConcept {
    pub fn new(uri: impl Into<String>, preferred_label: impl Into<String>, synonyms: Vec<String>) -> Self {
        Self {
            uri: uri.into(),
            preferred_label: preferred_label.into(),
            synonyms,
        }
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.preferred_label.as_str()).chain(self.synonyms.iter().map(String::as_str))
    }
}

/// How necessary a skill is to an occupation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    Essential,
    Optional,
}

impl RelationType {
    /// Any cell containing "optional" is optional; everything else, including
    /// an empty or missing cell, is essential.
    pub fn from_cell(cell: &str) -> Self {
        if cell.to_lowercase().contains("optional") {
            RelationType::Optional
        } else {
            RelationType::Essential
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupationSkillRelation {
    pub occupation_uri: String,
    pub skill_uri: String,
    pub relation_type: RelationType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_type_from_cell() {
        assert_eq!(RelationType::from_cell("optional"), RelationType::Optional);
        assert_eq!(RelationType::from_cell("Optional"), RelationType::Optional);
        assert_eq!(RelationType::from_cell("essential"), RelationType::Essential);
        assert_eq!(RelationType::from_cell(""), RelationType::Essential);
    }

    #[test]
    fn test_skill_terms_start_with_preferred_label() {
        let skill = SkillConcept::new(
            "esco:skill/ux",
            "Prototyp für User-Experience-Lösung erstellen",
            vec!["UX".to_string(), "UX-Lösung".to_string()],
        );
        let terms: Vec<&str> = skill.terms().collect();
        assert_eq!(terms[0], "Prototyp für User-Experience-Lösung erstellen");
        assert_eq!(terms.len(), 3);
    }

    #[test]
    fn test_relation_type_serde() {
        let json = serde_json::to_string(&RelationType::Optional).unwrap();
        assert_eq!(json, r#""OPTIONAL""#);
    }
}
