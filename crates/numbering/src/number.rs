//! Document kinds and their human-readable sequential numbers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use billquill_core::DomainError;

/// The two document kinds the engine numbers independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Quotation,
    Invoice,
}

impl DocumentKind {
    pub fn prefix(self) -> &'static str {
        match self {
            DocumentKind::Quotation => "QT",
            DocumentKind::Invoice => "INV",
        }
    }

    /// Minimum zero-padded width of the numeric suffix.
    pub fn pad_width(self) -> usize {
        match self {
            DocumentKind::Quotation => 3,
            DocumentKind::Invoice => 5,
        }
    }
}

/// A formatted, tenant-scoped sequential document identifier.
///
/// The padding is a minimum: sequence 1000 on a width-3 kind renders as
/// `QT-1000`, not a truncated value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentNumber(String);

impl DocumentNumber {
    pub fn new(kind: DocumentKind, sequence: u64) -> Self {
        Self(format!(
            "{}-{:0width$}",
            kind.prefix(),
            sequence,
            width = kind.pad_width()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric suffix, used to seed counters from persisted documents.
    pub fn sequence(&self) -> Option<u64> {
        let (_, digits) = self.0.rsplit_once('-')?;
        digits.parse().ok()
    }
}

impl core::fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for DocumentNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('-') {
            Some((prefix, digits))
                if !prefix.is_empty() && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) =>
            {
                Ok(Self(s.to_string()))
            }
            _ => Err(DomainError::invalid_id(format!(
                "DocumentNumber: expected PREFIX-digits, got '{s}'"
            ))),
        }
    }
}
