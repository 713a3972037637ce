//! Robust reader for Jira CSV exports
//!
//! Jira flattens multi-value custom fields into several columns that share
//! one header name, so a plain header→value map loses data. The reader
//! merges every column whose header contains the configured related-identity
//! marker into one deduplicated list per record; all other repeated headers
//! fold last-wins.

use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while reading the export file
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Export file not found: {0}")]
    NotFound(String),

    #[error("IO error reading export: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
}

/// One row of the export, immutable once parsed.
///
/// Raw string fields stay raw here; typed derivation happens in
/// [`crate::core::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRecord {
    pub key: String,
    pub summary: String,
    pub description: String,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub labels: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<String>,
    pub created: Option<String>,
    pub original_estimate: Option<String>,
    pub remaining_estimate: Option<String>,
    pub time_spent: Option<String>,
    pub work_ratio: Option<String>,
    pub votes: Option<String>,
    pub parent: Option<String>,
    pub epic: Option<String>,
    /// Merged related identities: comma-split across all marker columns,
    /// trimmed, deduplicated, email-like tokens excluded
    pub identities: Vec<String>,
}

/// Read an export file into ordered records.
///
/// `related_marker` selects the repeated identity columns by substring match
/// (case-insensitive) against the header name.
pub fn read_export(path: &Path, related_marker: &str) -> Result<Vec<SourceRecord>, IngestError> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::NotFound(path.display().to_string())
        } else {
            IngestError::Io(e)
        }
    })?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let marker = related_marker.to_lowercase();
    let identity_indices: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.to_lowercase().contains(&marker))
        .map(|(i, _)| i)
        .collect();

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        records.push(parse_row(&headers, &identity_indices, &row));
    }
    Ok(records)
}

fn parse_row(
    headers: &[String],
    identity_indices: &[usize],
    row: &csv::StringRecord,
) -> SourceRecord {
    // Merge all identity columns: split on comma, trim, dedup (first
    // occurrence wins), exclude email-like tokens
    let mut identities: Vec<String> = Vec::new();
    for &idx in identity_indices {
        let Some(cell) = row.get(idx) else { continue };
        for token in cell.split(',') {
            let token = token.trim();
            if token.is_empty() || token.contains('@') {
                continue;
            }
            if !identities.iter().any(|t| t == token) {
                identities.push(token.to_string());
            }
        }
    }

    // Label→value fold for everything else: the last occurrence of a
    // repeated header name wins, even when it is empty
    let mut fields: HashMap<String, String> = HashMap::new();
    for (header, value) in headers.iter().zip(row.iter()) {
        fields.insert(header.to_lowercase(), value.trim().to_string());
    }

    // An empty stored value reads as absent
    let get = |names: &[&str]| -> Option<String> {
        names
            .iter()
            .filter_map(|n| fields.get(*n))
            .find(|v| !v.is_empty())
            .cloned()
    };

    SourceRecord {
        key: get(&["issue key", "key"]).unwrap_or_default(),
        summary: get(&["summary"]).unwrap_or_default(),
        description: get(&["description"]).unwrap_or_default(),
        issue_type: get(&["issue type", "type"]),
        priority: get(&["priority"]),
        labels: get(&["labels"]),
        assignee: get(&["assignee"]),
        due_date: get(&["due date", "due"]),
        created: get(&["created"]),
        original_estimate: get(&["original estimate", "original estimate (seconds)"]),
        remaining_estimate: get(&["remaining estimate", "remaining estimate (seconds)"]),
        time_spent: get(&["time spent", "time spent (seconds)"]),
        work_ratio: get(&["work ratio"]),
        votes: get(&["votes"]),
        parent: get(&["parent", "parent id"]),
        epic: get(&["epic link", "custom field (epic link)"]),
        identities,
    }
}
