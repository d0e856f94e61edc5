//! Reads ESCO CSV exports whose delimiter varies between `,` and `;`
//! depending on the export tool.
//!
//! Columns are resolved by header name, never by position. Quoted fields may
//! contain the delimiter and may span physical lines (ESCO separates alt labels
//! with newlines inside a single quoted cell).

use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};

use crate::errors::TaxonomyError;

const BOM: char = '\u{feff}';

/// Picks the file delimiter from the header line: `;` when it occurs more
/// often than `,`, otherwise `,`.
pub fn detect_delimiter(header_line: &str) -> u8 {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Splits one line of CSV text into its fields, honouring quotes.
pub fn split_line(line: &str, delimiter: u8) -> Vec<String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => record.iter().map(str::to_string).collect(),
        _ => vec![String::new()],
    }
}

/// Trims surrounding quotes and whitespace from a raw cell.
pub fn clean_cell(raw: &str) -> &str {
    raw.trim_matches(|c: char| c == '"' || c.is_whitespace())
}

/// Splits an alt-labels cell on `|` and newlines. Pieces of one character or
/// less are noise and dropped.
pub fn split_synonyms(cell: &str) -> Vec<String> {
    cell.split(['|', '\n'])
        .map(clean_cell)
        .filter(|piece| piece.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

/// A fully read CSV file with a resolved delimiter and header row.
#[derive(Debug)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: u8,
    headers: Vec<String>,
    body: String,
}

impl CsvSource {
    pub fn read(path: &Path) -> Result<Self, TaxonomyError> {
        let text = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_text(path, &text)
    }

    pub fn from_text(path: &Path, text: &str) -> Result<Self, TaxonomyError> {
        let text = text.trim_start_matches(BOM);
        let header_line = text
            .lines()
            .next()
            .filter(|line| !line.trim().is_empty())
            .ok_or_else(|| TaxonomyError::EmptyFile(path.to_path_buf()))?;

        let delimiter = detect_delimiter(header_line);
        let headers = split_line(header_line, delimiter)
            .iter()
            .map(|h| clean_cell(h).to_string())
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            delimiter,
            headers,
            body: text.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Case-sensitive exact header lookup.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &'static str) -> Result<usize, TaxonomyError> {
        self.column(name).ok_or_else(|| TaxonomyError::MissingColumn {
            path: self.path.clone(),
            column: name,
        })
    }

    /// The alt-labels column: first header containing "altLabels" or
    /// "alternativeLabel", compared case-insensitively.
    pub fn alt_labels_column(&self) -> Option<usize> {
        self.headers.iter().position(|h| {
            let h = h.to_lowercase();
            h.contains("altlabels") || h.contains("alternativelabel")
        })
    }

    /// Data rows after the header, blank rows skipped. The whole body is read
    /// before anything is returned, so a malformed record fails the file
    /// without handing out a prefix of it.
    pub fn rows(&self) -> Result<Vec<Row>, TaxonomyError> {
        let mut rows = Vec::new();
        let records = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(self.body.as_bytes())
            .into_records();
        for record in records {
            let record = record.map_err(|source| TaxonomyError::Csv {
                path: self.path.clone(),
                source,
            })?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            rows.push(Row(record));
        }
        Ok(rows)
    }
}

/// One parsed data row.
#[derive(Debug)]
pub struct Row(StringRecord);

impl Row {
    /// Cleaned cell value, or an empty string when the row is short.
    pub fn cell(&self, idx: usize) -> &str {
        self.0.get(idx).map(clean_cell).unwrap_or("")
    }

    /// Raw cell value without trimming, for multi-value cells.
    pub fn raw(&self, idx: usize) -> &str {
        self.0.get(idx).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_delimiter_semicolon() {
        assert_eq!(detect_delimiter("a;b;c"), b';');
    }

    #[test]
    fn test_detect_delimiter_comma() {
        assert_eq!(detect_delimiter("a,b,c"), b',');
    }

    #[test]
    fn test_detect_delimiter_tie_prefers_comma() {
        assert_eq!(detect_delimiter("a;b,c"), b',');
        assert_eq!(detect_delimiter("abc"), b',');
    }

    #[test]
    fn test_field_counts_follow_detected_delimiter() {
        let semi = detect_delimiter("a;b;c");
        assert_eq!(split_line("1;2,5;3", semi).len(), 3);

        let comma = detect_delimiter("a,b,c");
        assert_eq!(split_line("1,2;5,3", comma).len(), 3);
    }

    #[test]
    fn test_split_line_keeps_quoted_delimiter() {
        let fields = split_line(r#"uri,"Daten, analysieren",x"#, b',');
        assert_eq!(fields, vec!["uri", "Daten, analysieren", "x"]);
    }

    #[test]
    fn test_split_line_empty_input() {
        assert_eq!(split_line("", b','), vec![String::new()]);
    }

    #[test]
    fn test_split_synonyms_pipe_and_newline() {
        let synonyms = split_synonyms("UX | User Experience Design\nUX-Lösung|x| ");
        assert_eq!(synonyms, vec!["UX", "User Experience Design", "UX-Lösung"]);
    }

    #[test]
    fn test_split_synonyms_strips_quotes() {
        assert_eq!(split_synonyms(r#""Scrum"|"Kanban""#), vec!["Scrum", "Kanban"]);
    }

    #[test]
    fn test_source_strips_bom_and_resolves_columns() {
        let text = "\u{feff}conceptType;conceptUri;preferredLabel;altLabels\nSkill;u1;Rust;\n";
        let source = CsvSource::from_text(Path::new("skills_de.csv"), text).unwrap();
        assert_eq!(source.delimiter(), b';');
        assert_eq!(source.column("conceptType"), Some(0));
        assert_eq!(source.column("conceptUri"), Some(1));
        assert_eq!(source.alt_labels_column(), Some(3));
    }

    #[test]
    fn test_alt_labels_column_alternative_name() {
        let text = "conceptUri,preferredLabel,AlternativeLabels\n";
        let source = CsvSource::from_text(Path::new("x.csv"), text).unwrap();
        assert_eq!(source.alt_labels_column(), Some(2));
    }

    #[test]
    fn test_missing_column_is_error() {
        let source = CsvSource::from_text(Path::new("x.csv"), "foo,bar\n").unwrap();
        let err = source.require_column("conceptUri").unwrap_err();
        assert!(matches!(err, TaxonomyError::MissingColumn { column: "conceptUri", .. }));
    }

    #[test]
    fn test_empty_file_is_error() {
        let err = CsvSource::from_text(Path::new("x.csv"), "").unwrap_err();
        assert!(matches!(err, TaxonomyError::EmptyFile(_)));
    }

    #[test]
    fn test_rows_span_multiline_quoted_cells() {
        let text = "conceptUri,preferredLabel,altLabels\n\
                    u1,Prototyp für User-Experience-Lösung erstellen,\"Prototyp für UX-Lösung erstellen\nUX\"\n\
                    \n\
                    u2,Luxemburgisch verstehen,\n";
        let source = CsvSource::from_text(Path::new("skills.csv"), text).unwrap();
        let rows = source.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cell(0), "u1");
        assert_eq!(
            split_synonyms(rows[0].raw(2)),
            vec!["Prototyp für UX-Lösung erstellen", "UX"]
        );
        assert_eq!(rows[1].cell(1), "Luxemburgisch verstehen");
        assert_eq!(rows[1].cell(7), "");
    }

    #[test]
    fn test_rows_of_header_only_file_are_empty() {
        let source = CsvSource::from_text(Path::new("skills.csv"), "conceptUri;preferredLabel\n;\n").unwrap();
        assert!(source.rows().unwrap().is_empty());
    }
}
