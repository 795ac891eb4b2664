//! [`SensitiveDataScanner`]: regex classification of regulated data in
//! customer-originated free text.
//!
//! The engine runs every customer utterance through the scanner before it
//! lands in the transcript, so the agent UI can surface insurance numbers,
//! IBANs, dates of birth and the like as structured, individually
//! verifiable findings instead of raw text.
//!
//! Scanning is pure and deterministic: the same input always yields the
//! same `(kind, value, status)` triples, in classifier registration order
//! and then match order within each classifier. Only the generated finding
//! ids differ between calls.

use std::borrow::Cow;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── FieldKind ──────────────────────────────────────────────────────────

/// Category of regulated data detected by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum FieldKind {
    /// Health-insurance member number.
    InsuranceNumber,
    /// Internal customer account id.
    CustomerId,
    /// IBAN bank account number.
    BankAccount,
    /// Date of birth in day-first notation.
    DateOfBirth,
    /// Street address.
    Address,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsuranceNumber => write!(f, "insurance_number"),
            Self::CustomerId => write!(f, "customer_id"),
            Self::BankAccount => write!(f, "bank_account"),
            Self::DateOfBirth => write!(f, "date_of_birth"),
            Self::Address => write!(f, "address"),
        }
    }
}

// ── FieldStatus ────────────────────────────────────────────────────────

/// Verification status of a finding.
///
/// New findings are always `Pending`; the transition to `Valid` or
/// `Invalid` happens only through an explicit user validation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    #[default]
    Pending,
    Valid,
    Invalid,
}

// ── SensitiveField ─────────────────────────────────────────────────────

/// A single regulated-data finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitiveField {
    /// Unique id, fresh per scan.
    pub id: String,
    /// What kind of data matched.
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// The matched text, verbatim.
    pub value: String,
    /// Verification status; starts at `Pending`.
    pub status: FieldStatus,
    /// Whether this kind of data must be verified before use.
    pub requires_verification: bool,
}

impl SensitiveField {
    /// Creates a pending finding with a fresh id.
    #[must_use]
    pub fn pending(kind: FieldKind, value: impl Into<String>, requires_verification: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            value: value.into(),
            status: FieldStatus::Pending,
            requires_verification,
        }
    }
}

// ── Classifier ─────────────────────────────────────────────────────────

/// Metadata for a single pattern classifier.
///
/// The compiled regex is stored separately in the
/// [`SensitiveDataScanner`]'s regex table.
#[derive(Debug, Clone)]
pub struct Classifier {
    /// Unique identifier (e.g. `"iban"`).
    pub id: Cow<'static, str>,
    /// Kind of finding this classifier emits.
    pub kind: FieldKind,
    /// Human-readable description.
    pub description: Cow<'static, str>,
    /// Raw regex pattern string.
    pub regex_str: Cow<'static, str>,
    /// Whether findings of this classifier require verification.
    pub requires_verification: bool,
}

// ── ScanError ──────────────────────────────────────────────────────────

/// Errors that can occur during scanner construction.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ScanError {
    /// A regex pattern failed to compile.
    #[error("regex compilation failed for classifier '{classifier_id}': {reason}")]
    RegexCompilation {
        /// Classifier that failed.
        classifier_id: String,
        /// Underlying error message.
        reason: String,
    },
}

// ── Built-in classifiers ───────────────────────────────────────────────

struct BuiltinClassifier {
    id: &'static str,
    kind: FieldKind,
    description: &'static str,
    regex: &'static str,
    requires_verification: bool,
}

const BUILTIN_CLASSIFIERS: &[BuiltinClassifier] = &[
    BuiltinClassifier {
        id: "insurance-number",
        kind: FieldKind::InsuranceNumber,
        description: "Health-insurance member number (letter + 9 digits)",
        regex: r"\b[A-Z]\d{9}\b",
        requires_verification: true,
    },
    BuiltinClassifier {
        id: "customer-id",
        kind: FieldKind::CustomerId,
        description: "Customer account id (KD prefix)",
        regex: r"\bKD-?\d{6,8}\b",
        requires_verification: false,
    },
    BuiltinClassifier {
        id: "iban",
        kind: FieldKind::BankAccount,
        description: "IBAN bank account number",
        regex: r"\b[A-Z]{2}\d{2}[A-Z0-9]{11,30}\b",
        requires_verification: true,
    },
    BuiltinClassifier {
        id: "date-of-birth",
        kind: FieldKind::DateOfBirth,
        description: "Date in day-first dotted notation",
        regex: r"\b\d{1,2}\.\d{1,2}\.\d{4}\b",
        requires_verification: true,
    },
    BuiltinClassifier {
        id: "address",
        kind: FieldKind::Address,
        description: "Street address with house number",
        regex: r"\b[A-ZÄÖÜ][a-zäöüß]+(?:straße|strasse|weg|gasse|platz|allee)\s+\d+[a-z]?\b",
        requires_verification: false,
    },
];

/// Returns the full set of built-in classifiers, in registration order.
#[must_use]
pub fn builtin_classifiers() -> Vec<Classifier> {
    BUILTIN_CLASSIFIERS
        .iter()
        .map(|c| Classifier {
            id: Cow::Borrowed(c.id),
            kind: c.kind,
            description: Cow::Borrowed(c.description),
            regex_str: Cow::Borrowed(c.regex),
            requires_verification: c.requires_verification,
        })
        .collect()
}

// ── SensitiveDataScanner ───────────────────────────────────────────────

/// Regex-based regulated-data detector.
///
/// Compiles all classifier patterns at construction time; scanning is
/// allocation-light and has no side effects.
#[derive(Debug)]
pub struct SensitiveDataScanner {
    regexes: Vec<Regex>,
    classifiers: Vec<Classifier>,
}

impl SensitiveDataScanner {
    /// Construct a scanner from the given classifiers.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::RegexCompilation`] if any classifier regex is
    /// invalid.
    pub fn new(classifiers: Vec<Classifier>) -> Result<Self, ScanError> {
        let mut regexes = Vec::with_capacity(classifiers.len());
        for classifier in &classifiers {
            let re = Regex::new(&classifier.regex_str).map_err(|e| ScanError::RegexCompilation {
                classifier_id: classifier.id.to_string(),
                reason: e.to_string(),
            })?;
            regexes.push(re);
        }
        Ok(Self {
            regexes,
            classifiers,
        })
    }

    /// Convenience constructor with all built-in classifiers.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::RegexCompilation`] if a built-in pattern is
    /// invalid (should never happen).
    pub fn with_defaults() -> Result<Self, ScanError> {
        Self::new(builtin_classifiers())
    }

    /// Scan free text for regulated data.
    ///
    /// Emits one pending [`SensitiveField`] per non-overlapping match,
    /// ordered by classifier registration order and then match order.
    #[must_use]
    pub fn scan(&self, text: &str) -> Vec<SensitiveField> {
        let mut findings = Vec::new();
        for (re, classifier) in self.regexes.iter().zip(&self.classifiers) {
            for m in re.find_iter(text) {
                findings.push(SensitiveField::pending(
                    classifier.kind,
                    m.as_str(),
                    classifier.requires_verification,
                ));
            }
        }
        findings
    }
}

// ── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_all_kinds() {
        let kinds: std::collections::HashSet<_> =
            builtin_classifiers().iter().map(|c| c.kind).collect();
        assert_eq!(kinds.len(), 5);
    }

    #[test]
    fn all_builtin_patterns_compile() {
        SensitiveDataScanner::with_defaults().unwrap();
    }

    #[test]
    fn detect_iban() {
        let scanner = SensitiveDataScanner::with_defaults().unwrap();
        let findings = scanner.scan("IBAN CH9300762011623852957");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FieldKind::BankAccount);
        assert_eq!(findings[0].value, "CH9300762011623852957");
        assert_eq!(findings[0].status, FieldStatus::Pending);
        assert!(findings[0].requires_verification);
    }

    #[test]
    fn detect_insurance_number() {
        let scanner = SensitiveDataScanner::with_defaults().unwrap();
        let findings = scanner.scan("Meine Nummer ist A123456789.");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FieldKind::InsuranceNumber);
        assert_eq!(findings[0].value, "A123456789");
    }

    #[test]
    fn detect_date_of_birth_and_address() {
        let scanner = SensitiveDataScanner::with_defaults().unwrap();
        let findings = scanner.scan("Geboren am 03.07.1985, wohnhaft Hauptstraße 12a");
        let kinds: Vec<_> = findings.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![FieldKind::DateOfBirth, FieldKind::Address]);
        assert_eq!(findings[1].value, "Hauptstraße 12a");
    }

    #[test]
    fn detect_customer_id() {
        let scanner = SensitiveDataScanner::with_defaults().unwrap();
        let findings = scanner.scan("Kundennummer KD-1234567");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FieldKind::CustomerId);
    }

    #[test]
    fn classifier_order_then_match_order() {
        let scanner = SensitiveDataScanner::with_defaults().unwrap();
        // Address appears first in the text, IBAN first in registration order.
        let findings = scanner.scan("Bahnhofweg 3, Konto DE89370400440532013000");
        let kinds: Vec<_> = findings.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![FieldKind::BankAccount, FieldKind::Address]);
    }

    #[test]
    fn deterministic_apart_from_ids() {
        let scanner = SensitiveDataScanner::with_defaults().unwrap();
        let a = scanner.scan("IBAN CH9300762011623852957");
        let b = scanner.scan("IBAN CH9300762011623852957");
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.kind, y.kind);
            assert_eq!(x.value, y.value);
            assert_eq!(x.status, y.status);
            assert_ne!(x.id, y.id);
        }
    }

    #[test]
    fn no_findings_on_benign_text() {
        let scanner = SensitiveDataScanner::with_defaults().unwrap();
        assert!(scanner.scan("Guten Tag, wie kann ich helfen?").is_empty());
    }

    #[test]
    fn invalid_custom_pattern_is_rejected() {
        let result = SensitiveDataScanner::new(vec![Classifier {
            id: Cow::Borrowed("broken"),
            kind: FieldKind::CustomerId,
            description: Cow::Borrowed("unbalanced group"),
            regex_str: Cow::Borrowed(r"(unclosed"),
            requires_verification: false,
        }]);
        assert!(matches!(
            result,
            Err(ScanError::RegexCompilation { classifier_id, .. }) if classifier_id == "broken"
        ));
    }
}
