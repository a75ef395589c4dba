//! Typed view of an Azure Document Intelligence `analyzeResult` payload.
//!
//! Only the parts the pipeline reads are modelled. Shape errors that keep the
//! field collection from being iterated (`documents` not an array, a document
//! without a `fields` object) are reported as [`Error::MalformedResult`] so that
//! no partial invoice is ever produced. Below that level everything is lenient:
//! a field entry or member of the wrong type only degrades that one field.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentAnalysisResult {
    #[serde(default)]
    pub documents: Vec<AnalyzedDocument>,
}

impl DocumentAnalysisResult {
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::MalformedResult(
                "analysis result is not a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| Error::MalformedResult(e.to_string()))
    }

    /// Azure returns one document per submitted invoice; the pipeline submits one.
    pub fn first_document(&self) -> Option<&AnalyzedDocument> {
        self.documents.first()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzedDocument {
    #[serde(rename = "docType", default, deserialize_with = "lenient")]
    pub doc_type: Option<String>,
    #[serde(deserialize_with = "field_entries")]
    pub fields: BTreeMap<String, Option<DocumentField>>,
    #[serde(default, deserialize_with = "lenient")]
    pub confidence: Option<f64>,
}

impl AnalyzedDocument {
    /// Exact, case-sensitive lookup; a `null` entry counts as missing.
    pub fn field(&self, label: &str) -> Option<&DocumentField> {
        self.fields.get(label).and_then(Option::as_ref)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentField {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_string: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_number: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_integer: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_currency: Option<CurrencyValue>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_address: Option<AddressValue>,
    #[serde(default, deserialize_with = "lenient_array")]
    pub value_array: Option<Vec<Option<DocumentField>>>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub value_object: Option<BTreeMap<String, Option<DocumentField>>>,
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub confidence: Option<f64>,
}

impl DocumentField {
    /// `None` for `null` and for entries that are not field objects.
    fn from_entry(label: &str, value: Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        serde_json::from_value(value)
            .map_err(|e| tracing::debug!(label, error = %e, "ignoring unreadable field entry"))
            .ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyValue {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub currency_symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressValue {
    #[serde(default, deserialize_with = "lenient")]
    pub street_address: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub postal_code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub country_region: Option<String>,
}

impl AddressValue {
    fn display(&self) -> Option<String> {
        let parts: Vec<&str> = [
            &self.street_address,
            &self.city,
            &self.state,
            &self.postal_code,
            &self.country_region,
        ]
        .into_iter()
        .filter_map(|p| p.as_deref().map(str::trim).filter(|s| !s.is_empty()))
        .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// A member of the wrong type reads as absent instead of failing the whole result.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| serde_json::from_value(v).ok()))
}

/// The document's field collection must be an object; its entries are read one by one.
fn field_entries<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, Option<DocumentField>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(label, value)| {
            let field = DocumentField::from_entry(&label, value);
            (label, field)
        })
        .collect())
}

fn lenient_object<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<BTreeMap<String, Option<DocumentField>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Object(map)) => Some(
            map.into_iter()
                .map(|(label, value)| {
                    let field = DocumentField::from_entry(&label, value);
                    (label, field)
                })
                .collect(),
        ),
        _ => None,
    })
}

fn lenient_array<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<Option<DocumentField>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Array(rows)) => Some(
            rows.into_iter()
                .enumerate()
                .map(|(i, row)| DocumentField::from_entry(&format!("#{}", i + 1), row))
                .collect(),
        ),
        _ => None,
    })
}

/// Amounts occasionally arrive as numeric strings.
fn lenient_amount<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| {
        v.as_f64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
    }))
}

/// Whitespace-only text counts as absent; anything else is kept as detected.
fn non_empty(s: &str) -> Option<&str> {
    (!s.trim().is_empty()).then_some(s)
}

/// A detected field's value, resolved from its declared `type`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Currency(f64),
    Date(NaiveDate),
    Number(f64),
    Integer(i64),
    Address(String),
    Array(&'a [Option<DocumentField>]),
    Object(&'a BTreeMap<String, Option<DocumentField>>),
    /// Typed value absent or unparsable; only the raw OCR text is left.
    Unrecognized(&'a str),
    Empty,
}

impl<'a> FieldValue<'a> {
    /// Display string for scalar values. Arrays, objects and empty values have none.
    pub fn display(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) | FieldValue::Unrecognized(s) => Some((*s).to_string()),
            FieldValue::Currency(amount) => Some(format!("{amount:.2}")),
            FieldValue::Date(date) => Some(date.format("%Y-%m-%d").to_string()),
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::Integer(n) => Some(n.to_string()),
            FieldValue::Address(s) => Some(s.clone()),
            FieldValue::Array(_) | FieldValue::Object(_) | FieldValue::Empty => None,
        }
    }
}

impl DocumentField {
    pub fn value(&self) -> FieldValue<'_> {
        let typed = match self.kind.as_deref() {
            Some("string") | None => self
                .value_string
                .as_deref()
                .and_then(non_empty)
                .map(FieldValue::Text),
            Some("currency") => self
                .value_currency
                .as_ref()
                .and_then(|c| c.amount)
                .map(FieldValue::Currency),
            Some("date") => self
                .value_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
                .map(FieldValue::Date),
            Some("time") => self
                .value_time
                .as_deref()
                .and_then(non_empty)
                .map(FieldValue::Text),
            Some("number") => self.value_number.map(FieldValue::Number),
            Some("integer") => self.value_integer.map(FieldValue::Integer),
            Some("address") => self
                .value_address
                .as_ref()
                .and_then(AddressValue::display)
                .map(FieldValue::Address),
            Some("array") => self.value_array.as_deref().map(FieldValue::Array),
            Some("object") => self.value_object.as_ref().map(FieldValue::Object),
            Some(_) => None,
        };
        typed.unwrap_or_else(|| self.raw())
    }

    fn raw(&self) -> FieldValue<'_> {
        self.content
            .as_deref()
            .and_then(non_empty)
            .map_or(FieldValue::Empty, FieldValue::Unrecognized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(value: serde_json::Value) -> DocumentField {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn currency_renders_amount_with_two_decimals() {
        let f = field(json!({
            "type": "currency",
            "valueCurrency": { "amount": 245.5, "currencySymbol": "$", "currencyCode": "USD" },
            "content": "$245.50"
        }));
        assert_eq!(f.value(), FieldValue::Currency(245.5));
        assert_eq!(f.value().display().as_deref(), Some("245.50"));
    }

    #[test]
    fn currency_amount_may_be_a_string() {
        let f = field(json!({ "type": "currency", "valueCurrency": { "amount": "12.3" } }));
        assert_eq!(f.value().display().as_deref(), Some("12.30"));
    }

    #[test]
    fn date_renders_iso() {
        let f = field(json!({ "type": "date", "valueDate": "2019-11-15", "content": "11/15/2019" }));
        assert_eq!(f.value().display().as_deref(), Some("2019-11-15"));
    }

    #[test]
    fn unparsable_date_falls_back_to_content() {
        let f = field(json!({ "type": "date", "valueDate": "sometime", "content": "Q4 2019" }));
        assert_eq!(f.value(), FieldValue::Unrecognized("Q4 2019"));
    }

    #[test]
    fn unknown_type_uses_content() {
        let f = field(json!({ "type": "signature", "content": "J. Doe" }));
        assert_eq!(f.value().display().as_deref(), Some("J. Doe"));
    }

    #[test]
    fn string_is_kept_unchanged() {
        let f = field(json!({ "type": "string", "valueString": "  CONTOSO LTD.\n" }));
        assert_eq!(f.value(), FieldValue::Text("  CONTOSO LTD.\n"));
    }

    #[test]
    fn whitespace_only_string_falls_back_to_content() {
        let f = field(json!({ "type": "string", "valueString": "   ", "content": "CONTOSO" }));
        assert_eq!(f.value(), FieldValue::Unrecognized("CONTOSO"));
    }

    #[test]
    fn mistyped_member_falls_back_to_content() {
        let f = field(json!({ "type": "string", "valueString": 12345, "content": "12345", "confidence": "high" }));
        assert_eq!(f.value(), FieldValue::Unrecognized("12345"));
        assert_eq!(f.confidence, None);
    }

    #[test]
    fn bad_entries_inside_items_only_affect_themselves() {
        let f = field(json!({
            "type": "array",
            "valueArray": [
                42,
                { "type": "object", "valueObject": {
                    "Tax": null,
                    "Amount": { "type": "currency", "valueCurrency": { "amount": 60.0 } }
                } }
            ]
        }));
        let FieldValue::Array(rows) = f.value() else {
            panic!("expected an array");
        };
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_none());
        let Some(FieldValue::Object(cells)) = rows[1].as_ref().map(DocumentField::value) else {
            panic!("expected an object row");
        };
        assert!(cells["Tax"].is_none());
        assert_eq!(cells["Amount"].as_ref().unwrap().value(), FieldValue::Currency(60.0));
    }

    #[test]
    fn field_without_any_text_is_empty() {
        let f = field(json!({ "type": "string", "confidence": 0.2 }));
        assert_eq!(f.value(), FieldValue::Empty);
        assert_eq!(f.value().display(), None);
    }

    #[test]
    fn address_joins_parts() {
        let f = field(json!({
            "type": "address",
            "valueAddress": { "streetAddress": "123 Other St", "city": "Redmond", "state": "WA", "postalCode": "98052" }
        }));
        assert_eq!(
            f.value().display().as_deref(),
            Some("123 Other St, Redmond, WA, 98052")
        );
    }

    #[test]
    fn numbers_keep_their_natural_form() {
        let f = field(json!({ "type": "number", "valueNumber": 2.0 }));
        assert_eq!(f.value().display().as_deref(), Some("2"));
        let f = field(json!({ "type": "integer", "valueInteger": 7 }));
        assert_eq!(f.value().display().as_deref(), Some("7"));
    }

    #[test]
    fn null_documents_is_malformed() {
        let err = DocumentAnalysisResult::from_value(json!({ "documents": null })).unwrap_err();
        assert_eq!(err.code(), "malformed_result");
    }

    #[test]
    fn document_without_fields_is_malformed() {
        let err =
            DocumentAnalysisResult::from_value(json!({ "documents": [{ "docType": "invoice" }] }))
                .unwrap_err();
        assert!(matches!(err, Error::MalformedResult(_)));
    }

    #[test]
    fn non_object_field_entry_is_missing() {
        let result = DocumentAnalysisResult::from_value(json!({
            "documents": [{ "fields": { "InvoiceId": 42, "DueDate": "2019-12-15" } }]
        }))
        .unwrap();
        let doc = result.first_document().unwrap();
        assert!(doc.field("InvoiceId").is_none());
        assert!(doc.field("DueDate").is_none());
    }

    #[test]
    fn null_field_entry_is_missing() {
        let result = DocumentAnalysisResult::from_value(json!({
            "documents": [{ "fields": { "DueDate": null } }]
        }))
        .unwrap();
        assert!(result.first_document().unwrap().field("DueDate").is_none());
    }

    #[test]
    fn non_object_payload_is_malformed() {
        assert!(DocumentAnalysisResult::from_value(json!([1, 2, 3])).is_err());
        assert!(DocumentAnalysisResult::from_value(serde_json::Value::Null).is_err());
    }
}
