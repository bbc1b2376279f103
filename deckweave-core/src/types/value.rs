//! Scalar value model and data-kind classification.
//!
//! Extracted values arrive either as numbers or as raw text. Instead of
//! duck-typing, the value is a two-variant sum type and the derived
//! classification lives in [`DataKind`], so consumers match exhaustively.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single extracted scalar value.
///
/// Serialized untagged so exported attribution data round-trips as plain
/// JSON numbers and strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Number(f64),
    Text(String),
}

impl ScalarValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl From<f64> for ScalarValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for ScalarValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Derived classification of a scalar value's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Numeric with magnitude above one million.
    FinancialLarge,
    /// Numeric with magnitude above one thousand.
    FinancialMedium,
    /// Numeric in [0, 1].
    PercentageDecimal,
    /// Any other number.
    Numeric,
    /// Text containing a currency symbol.
    Financial,
    /// Text containing a percent sign.
    Percentage,
    /// A bare four-digit year.
    Year,
    /// Text mentioning a recent year.
    Date,
    /// Plain text.
    Text,
    /// Anything else.
    Other,
}

const CURRENCY_SYMBOLS: [char; 4] = ['$', '€', '£', '¥'];
const KNOWN_YEARS: [&str; 5] = ["2020", "2021", "2022", "2023", "2024"];

impl DataKind {
    /// Classify a value by its shape. Magnitude thresholds first for
    /// numbers, pattern checks in fixed order for text.
    pub fn classify(value: &ScalarValue) -> Self {
        match value {
            ScalarValue::Number(n) => {
                if n.abs() > 1_000_000.0 {
                    Self::FinancialLarge
                } else if n.abs() > 1_000.0 {
                    Self::FinancialMedium
                } else if (0.0..=1.0).contains(n) {
                    Self::PercentageDecimal
                } else {
                    Self::Numeric
                }
            }
            ScalarValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.contains(CURRENCY_SYMBOLS) {
                    Self::Financial
                } else if trimmed.contains('%') {
                    Self::Percentage
                } else if KNOWN_YEARS.iter().any(|y| trimmed.contains(y)) {
                    if trimmed.len() == 4 && trimmed.chars().all(|c| c.is_ascii_digit()) {
                        Self::Year
                    } else {
                        Self::Date
                    }
                } else {
                    Self::Text
                }
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FinancialLarge => "financial_large",
            Self::FinancialMedium => "financial_medium",
            Self::PercentageDecimal => "percentage_decimal",
            Self::Numeric => "numeric",
            Self::Financial => "financial",
            Self::Percentage => "percentage",
            Self::Year => "year",
            Self::Date => "date",
            Self::Text => "text",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_numeric_thresholds() {
        assert_eq!(
            DataKind::classify(&ScalarValue::Number(10_200_000.0)),
            DataKind::FinancialLarge
        );
        assert_eq!(
            DataKind::classify(&ScalarValue::Number(-2_000_000.0)),
            DataKind::FinancialLarge
        );
        assert_eq!(
            DataKind::classify(&ScalarValue::Number(50_000.0)),
            DataKind::FinancialMedium
        );
        assert_eq!(
            DataKind::classify(&ScalarValue::Number(0.35)),
            DataKind::PercentageDecimal
        );
        assert_eq!(DataKind::classify(&ScalarValue::Number(42.0)), DataKind::Numeric);
    }

    #[test]
    fn classify_text_patterns() {
        assert_eq!(DataKind::classify(&"$10.5M".into()), DataKind::Financial);
        assert_eq!(DataKind::classify(&"12.5%".into()), DataKind::Percentage);
        assert_eq!(DataKind::classify(&"2023".into()), DataKind::Year);
        assert_eq!(DataKind::classify(&"Q3 2024".into()), DataKind::Date);
        assert_eq!(DataKind::classify(&"net revenue".into()), DataKind::Text);
    }

    #[test]
    fn currency_beats_percentage() {
        // Order matters: a value with both symbols classifies as financial.
        assert_eq!(DataKind::classify(&"$5 (3%)".into()), DataKind::Financial);
    }

    #[test]
    fn untagged_serde_round_trip() {
        let n: ScalarValue = serde_json::from_str("10200000").unwrap();
        assert_eq!(n, ScalarValue::Number(10_200_000.0));
        let t: ScalarValue = serde_json::from_str("\"Q3 2024\"").unwrap();
        assert_eq!(t, ScalarValue::Text("Q3 2024".to_string()));
    }
}
