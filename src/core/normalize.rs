//! Field normalization: raw export strings → typed values
//!
//! Every function here is total over messy input: unparseable values come
//! back as `None` and the caller omits the field, never aborts.

use chrono::NaiveDate;

use crate::core::config::{Config, RemainingEstimatePolicy};
use crate::core::ingest::SourceRecord;

/// Datetime layouts seen in Jira exports (`25/Dec/23 10:30 AM` and friends)
const DATETIME_FORMATS: &[&str] = &[
    "%d/%b/%y %I:%M %p",
    "%d/%b/%Y %I:%M %p",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Date-only layouts
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%b/%y",
    "%d/%b/%Y",
    "%d.%m.%Y",
    "%d.%m.%y",
    "%m/%d/%Y",
];

/// Parse a wide range of human/ISO date text. `None` on unparseable input,
/// never an error.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    None
}

/// Parse a date and render it in the ISO form GitLab expects
pub fn iso_date(raw: Option<&str>) -> Option<String> {
    parse_date(raw?).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Parse a raw seconds field (float text accepted, truncated toward zero)
pub fn parse_seconds(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().map(|v| v as i64)
}

/// Convert raw seconds into a GitLab "Hh Mm" duration string.
///
/// Non-positive or unparseable input yields `None`. A positive duration that
/// truncates to zero hours and zero minutes yields the literal `"0m"`; this
/// asymmetry is load-bearing for downstream consumers and must not be
/// "fixed".
pub fn duration_from_seconds(raw: Option<&str>) -> Option<String> {
    let secs = parse_seconds(raw)?;
    if secs <= 0 {
        return None;
    }
    duration_string(secs)
}

fn duration_string(secs: i64) -> Option<String> {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if parts.is_empty() {
        Some("0m".to_string())
    } else {
        Some(parts.join(" "))
    }
}

/// Work ratio percentage: an explicit percent string from the source wins
/// (trailing `%` stripped); else `spent/original*100` rounded to 2 decimals
/// when original > 0; else `None`.
pub fn work_ratio(
    ratio_text: Option<&str>,
    original_secs: Option<i64>,
    spent_secs: Option<i64>,
) -> Option<f64> {
    if let Some(text) = ratio_text.map(str::trim).filter(|s| !s.is_empty()) {
        let text = text.strip_suffix('%').unwrap_or(text).trim();
        if let Ok(value) = text.parse::<f64>() {
            return Some(value);
        }
    }
    match original_secs {
        Some(original) if original > 0 => {
            let spent = spent_secs.unwrap_or(0) as f64;
            Some((spent / original as f64 * 100.0 * 100.0).round() / 100.0)
        }
        _ => None,
    }
}

/// Remaining estimate in seconds: the source value when present; otherwise
/// derived as `max(original - spent, 0)` when the policy allows it and the
/// original estimate is positive.
pub fn remaining_estimate(
    remaining_secs: Option<i64>,
    original_secs: Option<i64>,
    spent_secs: Option<i64>,
    policy: RemainingEstimatePolicy,
) -> Option<i64> {
    if let Some(remaining) = remaining_secs {
        return Some(remaining);
    }
    if policy == RemainingEstimatePolicy::TrustSource {
        return None;
    }
    match original_secs {
        Some(original) if original > 0 => Some((original - spent_secs.unwrap_or(0)).max(0)),
        _ => None,
    }
}

/// Typed values derived from one [`SourceRecord`]; a pure function of the
/// record plus the configured policies.
#[derive(Debug, Clone, Default)]
pub struct NormalizedFields {
    pub title: String,
    pub labels: Vec<String>,
    pub due_date: Option<String>,
    pub created: Option<String>,
    pub estimate: Option<String>,
    pub spent: Option<String>,
    pub remaining: Option<String>,
    pub work_ratio: Option<f64>,
    pub votes: u32,
    /// Composed master description: metadata block + original free text
    pub description: String,
}

impl NormalizedFields {
    pub fn from_record(record: &SourceRecord, config: &Config) -> Self {
        let title = if record.summary.trim().is_empty() {
            "Untitled".to_string()
        } else {
            record.summary.trim().to_string()
        };

        let original_secs = parse_seconds(record.original_estimate.as_deref());
        let spent_secs = parse_seconds(record.time_spent.as_deref());
        let remaining_secs = remaining_estimate(
            parse_seconds(record.remaining_estimate.as_deref()),
            original_secs,
            spent_secs,
            config.remaining_estimate_policy(),
        );

        let estimate = duration_from_seconds(record.original_estimate.as_deref());
        let spent = duration_from_seconds(record.time_spent.as_deref());
        let remaining = remaining_secs.filter(|&s| s > 0).and_then(duration_string);

        let ratio = work_ratio(record.work_ratio.as_deref(), original_secs, spent_secs);
        let due_date = iso_date(record.due_date.as_deref());
        let created = iso_date(record.created.as_deref());

        let mut labels: Vec<String> = Vec::new();
        let mut push_label = |label: &str| {
            let label = label.trim();
            if !label.is_empty() && !labels.iter().any(|l| l == label) {
                labels.push(label.to_string());
            }
        };
        push_label(&record.key);
        if let Some(priority) = &record.priority {
            push_label(priority);
        }
        if let Some(epic) = &record.epic {
            push_label(epic);
        }
        if let Some(raw_labels) = &record.labels {
            for label in raw_labels.split(',') {
                push_label(label);
            }
        }

        let description = compose_description(
            record,
            estimate.as_deref(),
            spent.as_deref(),
            remaining.as_deref(),
            ratio,
            due_date.as_deref(),
            created.as_deref(),
        );

        let votes = record
            .votes
            .as_deref()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0);

        Self {
            title,
            labels,
            due_date,
            created,
            estimate,
            spent,
            remaining,
            work_ratio: ratio,
            votes,
            description,
        }
    }

    pub fn labels_str(&self) -> String {
        self.labels.join(",")
    }
}

fn compose_description(
    record: &SourceRecord,
    estimate: Option<&str>,
    spent: Option<&str>,
    remaining: Option<&str>,
    ratio: Option<f64>,
    due_date: Option<&str>,
    created: Option<&str>,
) -> String {
    let na = |v: Option<&str>| v.unwrap_or("N/A").to_string();
    let key = if record.key.is_empty() {
        "N/A"
    } else {
        record.key.as_str()
    };
    let mut text = String::new();
    text.push_str("**Source issue**\n");
    text.push_str(&format!("- Key: {key}\n"));
    if let Some(issue_type) = &record.issue_type {
        text.push_str(&format!("- Type: {issue_type}\n"));
    }
    if let Some(parent) = &record.parent {
        text.push_str(&format!("- Parent: {parent}\n"));
    }
    text.push_str("\n**Time tracking**\n");
    text.push_str(&format!("- Original estimate: {}\n", na(estimate)));
    text.push_str(&format!("- Time spent: {}\n", na(spent)));
    text.push_str(&format!("- Remaining: {}\n", na(remaining)));
    if let Some(ratio) = ratio {
        text.push_str(&format!("- Work ratio: {ratio}%\n"));
    }
    text.push_str("\n**Dates**\n");
    text.push_str(&format!("- Due date: {}\n", na(due_date)));
    text.push_str(&format!("- Created: {}\n", na(created)));
    text.push_str("\n--- Original description ---\n\n");
    text.push_str(record.description.trim());
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_times(
        original: Option<&str>,
        remaining: Option<&str>,
        spent: Option<&str>,
    ) -> SourceRecord {
        SourceRecord {
            key: "PRJ-1".to_string(),
            summary: "Title".to_string(),
            original_estimate: original.map(String::from),
            remaining_estimate: remaining.map(String::from),
            time_spent: spent.map(String::from),
            ..SourceRecord::default()
        }
    }

    #[test]
    fn test_parse_date_formats() {
        let expect = NaiveDate::from_ymd_opt(2023, 12, 25).unwrap();
        assert_eq!(parse_date("2023-12-25"), Some(expect));
        assert_eq!(parse_date("25/Dec/23 10:30 AM"), Some(expect));
        assert_eq!(parse_date("25/Dec/2023"), Some(expect));
        assert_eq!(parse_date("25.12.2023"), Some(expect));
        assert_eq!(parse_date("2023-12-25T08:15:00+03:00"), Some(expect));
    }

    #[test]
    fn test_parse_date_garbage_is_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("99/99/9999"), None);
    }

    #[test]
    fn test_duration_non_positive_is_none() {
        assert_eq!(duration_from_seconds(Some("0")), None);
        assert_eq!(duration_from_seconds(Some("-5")), None);
        assert_eq!(duration_from_seconds(None), None);
        assert_eq!(duration_from_seconds(Some("")), None);
        assert_eq!(duration_from_seconds(Some("abc")), None);
    }

    #[test]
    fn test_duration_rendering() {
        // Sub-minute positive durations truncate to the literal "0m" while
        // non-positive input is None; both sides of the asymmetry are pinned.
        assert_eq!(duration_from_seconds(Some("30")).as_deref(), Some("0m"));
        assert_eq!(duration_from_seconds(Some("90")).as_deref(), Some("1m"));
        assert_eq!(duration_from_seconds(Some("3600")).as_deref(), Some("1h"));
        assert_eq!(
            duration_from_seconds(Some("5400")).as_deref(),
            Some("1h 30m")
        );
        assert_eq!(
            duration_from_seconds(Some("3661")).as_deref(),
            Some("1h 1m")
        );
        // Float seconds text is accepted and truncated
        assert_eq!(duration_from_seconds(Some("3600.9")).as_deref(), Some("1h"));
    }

    #[test]
    fn test_work_ratio_explicit_text_wins() {
        assert_eq!(work_ratio(Some("40%"), Some(100), Some(99)), Some(40.0));
        assert_eq!(work_ratio(Some(" 12.5 "), None, None), Some(12.5));
    }

    #[test]
    fn test_work_ratio_computed() {
        assert_eq!(work_ratio(None, Some(100), Some(50)), Some(50.0));
        assert_eq!(work_ratio(None, Some(3), Some(1)), Some(33.33));
        assert_eq!(work_ratio(None, Some(0), Some(50)), None);
        assert_eq!(work_ratio(None, None, Some(50)), None);
    }

    #[test]
    fn test_remaining_estimate_derived() {
        // 10h original, 5h spent, remaining absent → 5h derived
        let remaining = remaining_estimate(
            None,
            Some(36000),
            Some(18000),
            RemainingEstimatePolicy::Derive,
        );
        assert_eq!(remaining, Some(18000));
        assert_eq!(duration_string(18000).as_deref(), Some("5h"));
    }

    #[test]
    fn test_remaining_estimate_source_wins_and_floors_at_zero() {
        assert_eq!(
            remaining_estimate(
                Some(60),
                Some(36000),
                Some(18000),
                RemainingEstimatePolicy::Derive
            ),
            Some(60)
        );
        assert_eq!(
            remaining_estimate(None, Some(100), Some(500), RemainingEstimatePolicy::Derive),
            Some(0)
        );
        assert_eq!(
            remaining_estimate(None, None, Some(500), RemainingEstimatePolicy::Derive),
            None
        );
    }

    #[test]
    fn test_remaining_estimate_trust_source_never_derives() {
        assert_eq!(
            remaining_estimate(
                None,
                Some(36000),
                Some(18000),
                RemainingEstimatePolicy::TrustSource
            ),
            None
        );
    }

    #[test]
    fn test_normalized_fields() {
        let mut record = record_with_times(Some("36000"), None, Some("18000"));
        record.summary = "  Fix login  ".to_string();
        record.priority = Some("High".to_string());
        record.labels = Some("auth, backend, auth".to_string());
        record.epic = Some("Login Epic".to_string());
        record.due_date = Some("2024-03-01".to_string());
        record.votes = Some("3".to_string());
        record.description = "Broken login flow".to_string();

        let fields = NormalizedFields::from_record(&record, &Config::default());
        assert_eq!(fields.title, "Fix login");
        assert_eq!(
            fields.labels,
            vec!["PRJ-1", "High", "Login Epic", "auth", "backend"]
        );
        assert_eq!(fields.labels_str(), "PRJ-1,High,Login Epic,auth,backend");
        assert_eq!(fields.due_date.as_deref(), Some("2024-03-01"));
        assert_eq!(fields.estimate.as_deref(), Some("10h"));
        assert_eq!(fields.spent.as_deref(), Some("5h"));
        assert_eq!(fields.remaining.as_deref(), Some("5h"));
        assert_eq!(fields.work_ratio, Some(50.0));
        assert_eq!(fields.votes, 3);
        assert!(fields.description.contains("- Key: PRJ-1"));
        assert!(fields.description.contains("- Original estimate: 10h"));
        assert!(fields
            .description
            .contains("--- Original description ---\n\nBroken login flow"));
    }

    #[test]
    fn test_untitled_fallback() {
        let record = SourceRecord::default();
        let fields = NormalizedFields::from_record(&record, &Config::default());
        assert_eq!(fields.title, "Untitled");
    }
}
