use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::NewTransaction;

pub const TEXT_FIELD_MAX_LEN: usize = 255;
pub const DECIMAL_INPUT_MAX_LEN: usize = 64;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T = ()> = Result<T, ValidationError>;

/// Volume and cost arrive either as JSON numbers or as numeric strings
/// (HTML forms post strings).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DecimalInput {
    Number(serde_json::Number),
    Text(String),
}

impl DecimalInput {
    fn as_text(&self) -> String {
        match self {
            DecimalInput::Number(n) => n.to_string(),
            DecimalInput::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for DecimalInput {
    fn from(value: &str) -> Self {
        DecimalInput::Text(value.to_string())
    }
}

/// Unvalidated transaction fields, as posted by a client or typed on the CLI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionDraft {
    pub buyer: Option<String>,
    pub volume: Option<DecimalInput>,
    pub cost: Option<DecimalInput>,
    pub city: Option<String>,
    pub feedstock: Option<String>,
    pub date: Option<String>,
}

/// Collapses whitespace runs (tabs and newlines included) to one space and
/// drops the remaining control characters.
pub fn sanitize_string(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| word.chars().filter(|ch| !ch.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_text(field: &'static str, value: Option<&str>) -> ValidationResult<String> {
    let value = value.ok_or_else(|| ValidationError::new(field, "is required"))?;
    let value = sanitize_string(value);
    validate_required(field, &value)?;
    validate_max_len(field, &value, TEXT_FIELD_MAX_LEN)?;
    Ok(value)
}

pub fn validate_positive_decimal(
    field: &'static str,
    value: Option<&DecimalInput>,
) -> ValidationResult<BigDecimal> {
    let raw = value
        .ok_or_else(|| ValidationError::new(field, "is required"))?
        .as_text();
    let raw = raw.trim();
    validate_required(field, raw)?;
    validate_max_len(field, raw, DECIMAL_INPUT_MAX_LEN)?;

    let amount = BigDecimal::from_str(raw)
        .map_err(|_| ValidationError::new(field, "must be a number"))?;
    if amount <= BigDecimal::from(0) {
        return Err(ValidationError::new(field, "must be greater than zero"));
    }

    Ok(amount)
}

pub fn validate_date(field: &'static str, value: Option<&str>) -> ValidationResult<NaiveDate> {
    let value = value.ok_or_else(|| ValidationError::new(field, "is required"))?;
    let value = value.trim();
    validate_required(field, value)?;

    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| ValidationError::new(field, "must be a date in YYYY-MM-DD format"))
}

/// Checks every required field and returns the first problem found.
pub fn validate_transaction(draft: &TransactionDraft) -> ValidationResult<NewTransaction> {
    Ok(NewTransaction {
        buyer: validate_text("buyer", draft.buyer.as_deref())?,
        volume: validate_positive_decimal("volume", draft.volume.as_ref())?,
        cost: validate_positive_decimal("cost", draft.cost.as_ref())?,
        city: validate_text("city", draft.city.as_deref())?,
        feedstock: validate_text("feedstock", draft.feedstock.as_deref())?,
        date: validate_date("date", draft.date.as_deref())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TransactionDraft {
        TransactionDraft {
            buyer: Some("Acme".to_string()),
            volume: Some("1000".into()),
            cost: Some("50000".into()),
            city: Some("Pune".to_string()),
            feedstock: Some("UCO".to_string()),
            date: Some("2024-01-01".to_string()),
        }
    }

    #[test]
    fn validates_required_field() {
        assert!(validate_required("field", "value").is_ok());
        assert!(validate_required("field", "   ").is_err());
    }

    #[test]
    fn validates_max_len() {
        assert!(validate_max_len("field", "abc", 3).is_ok());
        assert!(validate_max_len("field", "abcd", 3).is_err());
    }

    #[test]
    fn sanitizes_string() {
        assert_eq!(sanitize_string("  hello\tworld  "), "hello world");
        assert_eq!(sanitize_string("single"), "single");
        assert_eq!(sanitize_string(" \n "), "");
        assert_eq!(sanitize_string("ab\u{0000}cd\u{0007}"), "abcd");
        assert_eq!(sanitize_string("Acme\tCorp"), "Acme Corp");
        assert_eq!(sanitize_string("Acme\nCorp"), "Acme Corp");
        assert_eq!(sanitize_string("Acme\r\n Corp"), "Acme Corp");
        assert_eq!(sanitize_string("Acme \u{0007} Corp"), "Acme Corp");
    }

    #[test]
    fn whitespace_controls_keep_buyers_distinct() {
        let mut d = draft();
        d.buyer = Some("Acme\tCorp".to_string());

        assert_eq!(validate_transaction(&d).unwrap().buyer, "Acme Corp");
    }

    #[test]
    fn accepts_complete_draft() {
        let tx = validate_transaction(&draft()).expect("valid draft");

        assert_eq!(tx.buyer, "Acme");
        assert_eq!(tx.volume, BigDecimal::from(1000));
        assert_eq!(tx.cost, BigDecimal::from(50000));
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn reports_each_missing_field() {
        let cases: [(&str, fn(&mut TransactionDraft)); 6] = [
            ("buyer", |d| d.buyer = None),
            ("volume", |d| d.volume = None),
            ("cost", |d| d.cost = None),
            ("city", |d| d.city = None),
            ("feedstock", |d| d.feedstock = None),
            ("date", |d| d.date = None),
        ];

        for (field, clear) in cases {
            let mut d = draft();
            clear(&mut d);
            let err = validate_transaction(&d).unwrap_err();
            assert_eq!(err.field, field);
        }
    }

    #[test]
    fn rejects_blank_text() {
        let mut d = draft();
        d.city = Some(" \t ".to_string());

        assert_eq!(validate_transaction(&d).unwrap_err().field, "city");
    }

    #[test]
    fn validates_positive_amounts() {
        for bad in ["0", "-5", "abc", ""] {
            let mut d = draft();
            d.volume = Some(bad.into());
            assert_eq!(validate_transaction(&d).unwrap_err().field, "volume", "{bad}");
        }

        let mut d = draft();
        d.cost = Some("12.75".into());
        assert_eq!(
            validate_transaction(&d).unwrap().cost,
            BigDecimal::from_str("12.75").unwrap()
        );
    }

    #[test]
    fn accepts_json_numbers_and_strings() {
        let parsed: TransactionDraft = serde_json::from_str(
            r#"{"buyer":"Acme","volume":1000,"cost":"50000.5","city":"Pune","feedstock":"UCO","date":"2024-01-01"}"#,
        )
        .expect("valid payload");

        let tx = validate_transaction(&parsed).unwrap();
        assert_eq!(tx.volume, BigDecimal::from(1000));
        assert_eq!(tx.cost, BigDecimal::from_str("50000.5").unwrap());
    }

    #[test]
    fn rejects_malformed_dates() {
        for bad in ["01/01/2024", "2024-13-01", "yesterday"] {
            let mut d = draft();
            d.date = Some(bad.to_string());
            assert_eq!(validate_transaction(&d).unwrap_err().field, "date");
        }
    }
}
