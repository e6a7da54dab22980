#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RelayMappingError {
    #[error("cannot read relay mapping `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed relay mapping `{label}`: {source}")]
    Parse {
        label: String,
        #[source]
        source: csv::Error,
    },
}

/// Immutable table of original destination -> forwarding target.
///
/// Built once before the listener starts and shared read-only afterwards,
/// so lookups need no synchronisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayMapping {
    relays: HashMap<String, String>,
    skipped_rows: usize,
}

impl RelayMapping {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RelayMappingError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RelayMappingError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// Parses a headerless two-column CSV table. Rows with the wrong number
    /// of columns or an empty column are skipped with a warning; a reader or
    /// CSV syntax failure rejects the whole table.
    pub fn from_reader<R: Read>(reader: R, label: &str) -> Result<Self, RelayMappingError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut mapping = Self::default();
        for (row, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|source| RelayMappingError::Parse {
                label: label.to_string(),
                source,
            })?;

            if record.len() != 2 {
                warn!(
                    row,
                    columns = record.len(),
                    "malformed row, must have both original and target destination"
                );
                mapping.skipped_rows += 1;
                continue;
            }

            match validate_row(&record[0], &record[1]) {
                Ok((original, target)) => mapping.insert(row, original, target),
                Err(reason) => {
                    warn!(row, reason, "skipping malformed row");
                    mapping.skipped_rows += 1;
                }
            }
        }

        Ok(mapping)
    }

    fn insert(&mut self, row: usize, original: &str, target: &str) {
        if let Some(previous) = self
            .relays
            .insert(original.to_string(), target.to_string())
        {
            debug!(
                row,
                original,
                previous = previous.as_str(),
                target,
                "relay redefined, later row wins"
            );
        }
    }

    pub fn resolve(&self, destination: &str) -> Option<&str> {
        self.relays.get(destination).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

impl<K, V> FromIterator<(K, V)> for RelayMapping
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mapping = Self::default();
        for (row, (original, target)) in iter.into_iter().enumerate() {
            match validate_row(original.as_ref(), target.as_ref()) {
                Ok((original, target)) => mapping.insert(row, original, target),
                Err(_) => mapping.skipped_rows += 1,
            }
        }
        mapping
    }
}

fn validate_row<'a>(original: &'a str, target: &'a str) -> Result<(&'a str, &'a str), &'static str> {
    let original = original.trim();
    let target = target.trim();

    if original.is_empty() {
        return Err("original destination is invalid");
    }
    if target.is_empty() {
        return Err("target destination is invalid");
    }

    Ok((original, target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> RelayMapping {
        RelayMapping::from_reader(raw.as_bytes(), "inline").expect("mapping parses")
    }

    #[test]
    fn trims_both_columns() {
        let mapping = parse(" 15550001111 , 15550002222 \n");

        assert_eq!(mapping.resolve("15550001111"), Some("15550002222"));
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn skips_rows_with_empty_columns_and_keeps_the_rest() {
        let mapping = parse(",target\norig,\n   ,  \nalice,bob\n");

        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.resolve("alice"), Some("bob"));
        assert_eq!(mapping.resolve("orig"), None);
        assert_eq!(mapping.skipped_rows(), 3);
    }

    #[test]
    fn skips_rows_with_wrong_column_count() {
        let mapping = parse("alice\nalice,bob,carol\ndave,erin\n");

        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.resolve("dave"), Some("erin"));
        assert_eq!(mapping.skipped_rows(), 2);
    }

    #[test]
    fn later_rows_override_earlier_ones() {
        let mapping = parse("alice,bob\nalice,carol\n");

        assert_eq!(mapping.resolve("alice"), Some("carol"));
    }

    #[test]
    fn lookup_is_exact() {
        let mapping = parse("alice,bob\n");

        assert_eq!(mapping.resolve("Alice"), None);
        assert_eq!(mapping.resolve("carol"), None);
    }

    #[test]
    fn invalid_utf8_rejects_the_table() {
        let raw: &[u8] = b"alice,bob\n\xff\xfe,carol\n";
        let err = RelayMapping::from_reader(raw, "inline").expect_err("invalid utf-8");

        assert!(matches!(err, RelayMappingError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = RelayMapping::load("/nonexistent/relays.csv").expect_err("missing file");

        assert!(matches!(err, RelayMappingError::Read { .. }));
    }

    #[test]
    fn collects_from_pairs() {
        let mapping: RelayMapping = [("alice", "bob"), ("", "nobody")].into_iter().collect();

        assert_eq!(mapping.resolve("alice"), Some("bob"));
        assert_eq!(mapping.skipped_rows(), 1);
    }
}
