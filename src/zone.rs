//! Zone file loading.
//!
//! This module parses a zone source (YAML document or CSV table) into a
//! sequence of raw record entries. Per-file problems (missing file,
//! undecodable document, wrong extension) are fatal; per-row problems
//! (wrong field count, unparsable TTL) skip the row and continue.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use config::{Config, File, FileFormat};
use log::{info, warn};
use serde::Deserialize;

use crate::errors::ZoneLoadError;

/// Recognized zone file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneFormat {
    /// Structured document: `{ records: [ {name, type, ttl, data}, .. ] }`.
    Yaml,

    /// Tabular file: header row `name,type,ttl,data`, one record per row.
    Csv,
}

impl ZoneFormat {
    /// Whether a file extension is acceptable for this format.
    pub fn matches_extension(self, ext: &str) -> bool {
        match self {
            ZoneFormat::Yaml => ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"),
            ZoneFormat::Csv => ext.eq_ignore_ascii_case("csv"),
        }
    }
}

impl FromStr for ZoneFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yaml" => Ok(ZoneFormat::Yaml),
            "csv" => Ok(ZoneFormat::Csv),
            other => Err(format!("unsupported zone file format: {other}")),
        }
    }
}

impl fmt::Display for ZoneFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneFormat::Yaml => write!(f, "YAML"),
            ZoneFormat::Csv => write!(f, "CSV"),
        }
    }
}

/// A record entry as it appears in a zone source, before type validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawRecordEntry {
    /// Owner name, as spelled in the source.
    pub name: String,

    /// Record type tag, e.g. `A` or `CNAME`.
    #[serde(rename = "type")]
    pub rtype: String,

    /// Time-to-live in seconds.
    pub ttl: u32,

    /// Type-specific record data (address, target name, ..).
    pub data: String,
}

/// Top-level shape of a YAML zone document.
#[derive(Debug, Deserialize)]
struct ZoneDocument {
    records: Vec<RawRecordEntry>,
}

/// Load raw record entries from a zone file.
///
/// The file extension is checked against the declared format before any
/// parsing attempt; a mismatch is fatal.
///
/// # Arguments
/// * `path` - Path to the zone file.
/// * `format` - The declared zone file format.
///
/// # Returns
/// A `Result` containing the raw entries or a fatal `ZoneLoadError`.
pub fn load(path: &str, format: ZoneFormat) -> Result<Vec<RawRecordEntry>, ZoneLoadError> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    if !format.matches_extension(ext) {
        return Err(ZoneLoadError::FormatMismatch {
            path: path.into(),
            format,
        });
    }

    info!("Loading zone data from file: {} with format: {}", path, format);

    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ZoneLoadError::NotFound(path.into()),
        _ => ZoneLoadError::Malformed {
            path: path.into(),
            reason: e.to_string(),
        },
    })?;

    let entries = match format {
        ZoneFormat::Yaml => parse_yaml(path, &text)?,
        ZoneFormat::Csv => parse_csv(&text),
    };

    info!("Zone file loaded successfully ({} entries)", entries.len());
    Ok(entries)
}

/// Parse a YAML zone document. A malformed document fails the whole load.
fn parse_yaml(path: &str, text: &str) -> Result<Vec<RawRecordEntry>, ZoneLoadError> {
    let document: ZoneDocument = Config::builder()
        .add_source(File::from_str(text, FileFormat::Yaml))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ZoneLoadError::Malformed {
            path: path.into(),
            reason: e.to_string(),
        })?;
    Ok(document.records)
}

/// Parse a CSV zone table.
///
/// The first row is a header and is always skipped. Data rows must have
/// exactly four fields (`name,type,ttl,data`) and a TTL that fits in 32
/// bits; offending rows are skipped with a diagnostic. A file with only
/// a header (or nothing at all) is a valid, empty zone.
fn parse_csv(text: &str) -> Vec<RawRecordEntry> {
    let mut entries = Vec::new();
    let mut rows = 0usize;

    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        rows += 1;
        if rows == 1 {
            continue; // Header row
        }

        let fields: Vec<&str> = line.split(',').map(|f| f.trim_start()).collect();
        if fields.len() != 4 {
            warn!("Invalid record format at line {}: {:?}", lineno, line);
            continue;
        }

        let ttl = match fields[2].parse::<u32>() {
            Ok(ttl) => ttl,
            Err(e) => {
                warn!("Invalid TTL value at line {}: {:?}, error: {}", lineno, fields[2], e);
                continue;
            }
        };

        entries.push(RawRecordEntry {
            name: fields[0].to_string(),
            rtype: fields[1].to_string(),
            ttl,
            data: fields[3].to_string(),
        });
    }

    if rows <= 1 {
        info!("CSV file is empty or has only header");
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_zone(dir: &TempDir, filename: &str, content: &str) -> String {
        let path = dir.path().join(filename);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn csv_rows_become_entries() {
        let entries = parse_csv(
            "name,type,ttl,data\n\
             example.com, A, 600, 192.0.2.1\n\
             example.com,CNAME,300,alias.example.com.\n",
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "example.com");
        assert_eq!(entries[0].rtype, "A");
        assert_eq!(entries[0].ttl, 600);
        assert_eq!(entries[0].data, "192.0.2.1");
        assert_eq!(entries[1].rtype, "CNAME");
    }

    #[test]
    fn csv_bad_field_count_is_skipped() {
        let entries = parse_csv(
            "name,type,ttl,data\n\
             short.example.com,A,600\n\
             long.example.com,A,600,192.0.2.1,extra\n\
             good.example.com,A,600,192.0.2.1\n",
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "good.example.com");
    }

    #[test]
    fn csv_bad_ttl_is_skipped() {
        let entries = parse_csv(
            "name,type,ttl,data\n\
             a.example.com,A,soon,192.0.2.1\n\
             b.example.com,A,-5,192.0.2.2\n\
             c.example.com,A,600,192.0.2.3\n",
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "c.example.com");
    }

    #[test]
    fn csv_header_only_is_empty_zone() {
        assert!(parse_csv("name,type,ttl,data\n").is_empty());
        assert!(parse_csv("").is_empty());
        assert!(parse_csv("\n\nname,type,ttl,data\n\n").is_empty());
    }

    #[test]
    fn extension_must_match_format() {
        let dir = TempDir::new().unwrap();
        let path = write_zone(&dir, "zone.csv", "name,type,ttl,data\n");

        let err = load(&path, ZoneFormat::Yaml).unwrap_err();
        assert!(matches!(err, ZoneLoadError::FormatMismatch { .. }));

        // The right format on the same file is fine
        assert!(load(&path, ZoneFormat::Csv).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nosuch.yaml");
        let err = load(path.to_str().unwrap(), ZoneFormat::Yaml).unwrap_err();
        assert!(matches!(err, ZoneLoadError::NotFound(_)));
    }

    #[test]
    fn yaml_document_is_decoded() {
        let dir = TempDir::new().unwrap();
        let yaml = concat!(
            "records:\n",
            "  - name: example.com\n",
            "    type: A\n",
            "    ttl: 600\n",
            "    data: 192.0.2.1\n",
            "  - name: www.example.com\n",
            "    type: CNAME\n",
            "    ttl: 300\n",
            "    data: example.com.\n",
        );
        let path = write_zone(&dir, "zone.yaml", yaml);

        let entries = load(&path, ZoneFormat::Yaml).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rtype, "A");
        assert_eq!(entries[0].ttl, 600);
        assert_eq!(entries[1].name, "www.example.com");
    }

    #[test]
    fn malformed_yaml_fails_the_load() {
        let dir = TempDir::new().unwrap();
        let path = write_zone(&dir, "zone.yaml", ": not yaml\n  - [broken\n");
        let err = load(&path, ZoneFormat::Yaml).unwrap_err();
        assert!(matches!(err, ZoneLoadError::Malformed { .. }));
    }

    #[test]
    fn format_tags_parse_from_settings_values() {
        assert_eq!("yaml".parse::<ZoneFormat>().unwrap(), ZoneFormat::Yaml);
        assert_eq!("csv".parse::<ZoneFormat>().unwrap(), ZoneFormat::Csv);
        assert!("toml".parse::<ZoneFormat>().is_err());
    }
}
