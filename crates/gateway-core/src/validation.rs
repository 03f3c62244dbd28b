// Validator (C1): schema checks, length bounds, text sanitization, enum
// closure. Operates purely on in-memory values; never touches storage.
// Grounded in the size-limit-constant and per-field-validator style of
// control-plane's validation module, generalized into a structured
// failure type instead of a single flattened error.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum byte length for short human-readable names (workflow name,
/// incident_type, playbook_id, action_type, ...).
pub const MAX_NAME_BYTES: usize = 255;

/// Maximum byte length for free-text fields (descriptions, detail strings).
pub const MAX_FREE_TEXT_BYTES: usize = 10 * 1024;

/// Maximum number of entries in a labels map.
pub const MAX_LABEL_ENTRIES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Missing,
    LengthExceeded,
    InvalidEnum,
    InvalidFormat,
    XssDetected,
    SchemaMismatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub field: String,
    pub kind: FailureKind,
    pub detail: String,
}

impl ValidationFailure {
    pub fn missing(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: FailureKind::Missing,
            detail: "field is required".to_string(),
        }
    }

    pub fn length_exceeded(field: impl Into<String>, max_bytes: usize) -> Self {
        Self {
            field: field.into(),
            kind: FailureKind::LengthExceeded,
            detail: format!("exceeds maximum length of {max_bytes} bytes"),
        }
    }

    pub fn invalid_enum(field: impl Into<String>, allowed: &[&str]) -> Self {
        Self {
            field: field.into(),
            kind: FailureKind::InvalidEnum,
            detail: format!("must be one of: {}", allowed.join(", ")),
        }
    }

    pub fn invalid_format(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: FailureKind::InvalidFormat,
            detail: detail.into(),
        }
    }

    pub fn xss_detected(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: FailureKind::XssDetected,
            detail: "contains a script construct, event-handler attribute, or javascript: uri"
                .to_string(),
        }
    }

    pub fn schema_mismatch(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: FailureKind::SchemaMismatch,
            detail: detail.into(),
        }
    }
}

/// Accumulates failures across multiple field checks for one record.
#[derive(Debug, Default)]
pub struct Validator {
    failures: Vec<ValidationFailure>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.failures.push(ValidationFailure::missing(field));
        }
        self
    }

    pub fn bounded_length(&mut self, field: &str, value: &str, max_bytes: usize) -> &mut Self {
        if value.len() > max_bytes {
            self.failures
                .push(ValidationFailure::length_exceeded(field, max_bytes));
        }
        self
    }

    pub fn closed_enum(&mut self, field: &str, value: &str, allowed: &[&str]) -> &mut Self {
        if !allowed.contains(&value) {
            self.failures
                .push(ValidationFailure::invalid_enum(field, allowed));
        }
        self
    }

    pub fn bounded_labels(&mut self, field: &str, count: usize) -> &mut Self {
        if count > MAX_LABEL_ENTRIES {
            self.failures.push(ValidationFailure::invalid_format(
                field,
                format!("at most {MAX_LABEL_ENTRIES} label entries are permitted"),
            ));
        }
        self
    }

    pub fn sanitized_text(&mut self, field: &str, value: &str) -> &mut Self {
        if contains_script_construct(value) {
            self.failures.push(ValidationFailure::xss_detected(field));
        }
        self
    }

    pub fn valid_uuid(&mut self, field: &str, value: &str) -> &mut Self {
        if uuid::Uuid::parse_str(value).is_err() {
            self.failures
                .push(ValidationFailure::invalid_format(field, "not a valid uuid"));
        }
        self
    }

    pub fn push(&mut self, failure: ValidationFailure) -> &mut Self {
        self.failures.push(failure);
        self
    }

    pub fn finish(self) -> std::result::Result<(), Vec<ValidationFailure>> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(self.failures)
        }
    }
}

fn patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?i)<\s*script\b").expect("static pattern"),
            Regex::new(r"(?i)\bon\w+\s*=").expect("static pattern"),
            Regex::new(r"(?i)javascript\s*:").expect("static pattern"),
        ]
    })
}

/// Reject rather than strip: callers must learn their input was dangerous.
pub fn contains_script_construct(value: &str) -> bool {
    patterns().iter().any(|re| re.is_match(value))
}

pub const SEVERITY_VALUES: &[&str] = &["critical", "high", "medium", "low", "unknown"];
pub const EVENT_CATEGORY_VALUES: &[&str] = &["storage", "workflow", "ai_analysis", "signal"];
pub const EVENT_OUTCOME_VALUES: &[&str] = &["success", "failure", "degraded"];

/// Canonical outcome statuses for a playbook execution trace's single
/// action. The aggregation engine's success/failure rollup counts these
/// exact strings, so nothing else may reach the row store.
pub const ACTION_STATUS_VALUES: &[&str] = &["completed", "failed", "in_progress", "skipped"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_script_tag() {
        assert!(contains_script_construct("<script>alert(1)</script>"));
        assert!(contains_script_construct("<SCRIPT src=evil.js>"));
    }

    #[test]
    fn detects_event_handler_attribute() {
        assert!(contains_script_construct(r#"<img onerror=alert(1)>"#));
        assert!(contains_script_construct("onclick= \"doEvil()\""));
    }

    #[test]
    fn detects_javascript_uri() {
        assert!(contains_script_construct("javascript:alert(1)"));
        assert!(contains_script_construct("  JAVASCRIPT:  alert(1)"));
    }

    #[test]
    fn allows_plain_text() {
        assert!(!contains_script_construct("increase memory limit to 512Mi"));
        assert!(!contains_script_construct("内存不足时增加限制"));
    }

    #[test]
    fn length_exceeded_reports_field_and_bound() {
        let mut v = Validator::new();
        v.bounded_length("name", &"a".repeat(300), MAX_NAME_BYTES);
        let failures = v.finish().unwrap_err();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::LengthExceeded);
        assert_eq!(failures[0].field, "name");
    }

    #[test]
    fn closed_enum_rejects_unknown_values() {
        let mut v = Validator::new();
        v.closed_enum("severity", "catastrophic", SEVERITY_VALUES);
        let failures = v.finish().unwrap_err();
        assert_eq!(failures[0].kind, FailureKind::InvalidEnum);
    }

    #[test]
    fn accumulates_multiple_failures() {
        let mut v = Validator::new();
        v.require_non_empty("name", "")
            .closed_enum("severity", "nope", SEVERITY_VALUES)
            .sanitized_text("description", "<script>bad()</script>");
        let failures = v.finish().unwrap_err();
        assert_eq!(failures.len(), 3);
    }

    #[test]
    fn unicode_passes_length_check_by_bytes_not_chars() {
        let mut v = Validator::new();
        // Four-byte emoji repeated; well under the byte bound.
        v.bounded_length("name", "🔥🔥🔥", MAX_NAME_BYTES);
        assert!(v.finish().is_ok());
    }
}
