use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Invoice fields the pipeline extracts, with the Azure prebuilt-invoice label each one reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    InvoiceId,
    VendorName,
    InvoiceTotal,
    InvoiceDate,
    DueDate,
}

impl FieldKey {
    pub const ALL: [FieldKey; 5] = [
        FieldKey::InvoiceId,
        FieldKey::VendorName,
        FieldKey::InvoiceTotal,
        FieldKey::InvoiceDate,
        FieldKey::DueDate,
    ];

    /// Key used in the normalized map and in the JSON files.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::InvoiceId => "invoice_id",
            FieldKey::VendorName => "vendor_name",
            FieldKey::InvoiceTotal => "invoice_total",
            FieldKey::InvoiceDate => "invoice_date",
            FieldKey::DueDate => "due_date",
        }
    }

    pub fn provider_label(self) -> &'static str {
        match self {
            FieldKey::InvoiceId => "InvoiceId",
            FieldKey::VendorName => "VendorName",
            FieldKey::InvoiceTotal => "InvoiceTotal",
            FieldKey::InvoiceDate => "InvoiceDate",
            FieldKey::DueDate => "DueDate",
        }
    }

    /// Heading used in the console summary.
    pub fn display_label(self) -> &'static str {
        match self {
            FieldKey::InvoiceId => "Invoice ID",
            FieldKey::VendorName => "Vendor",
            FieldKey::InvoiceTotal => "Total Amount",
            FieldKey::InvoiceDate => "Invoice Date",
            FieldKey::DueDate => "Due Date",
        }
    }
}

/// One extracted value with the confidence its source attached (0.0 when none was given).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedField {
    pub value: String,
    pub confidence: f64,
}

impl NormalizedField {
    pub fn new(value: impl Into<String>, confidence: Option<f64>) -> Self {
        Self {
            value: value.into(),
            confidence: confidence.unwrap_or(0.0),
        }
    }
}

/// A row from the invoice's `Items` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<NormalizedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_code: Option<NormalizedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<NormalizedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<NormalizedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<NormalizedField>,
}

impl LineItem {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.product_code.is_none()
            && self.quantity.is_none()
            && self.unit_price.is_none()
            && self.amount.is_none()
    }
}

/// Flat invoice map written to disk and handed to the enhancement service.
///
/// Known keys come from [`FieldKey`]; the enhancement step may add others.
/// A key that is absent means "unknown": it is never filled with an empty string or zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedInvoice {
    #[serde(flatten)]
    pub fields: BTreeMap<String, NormalizedField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
}

impl NormalizedInvoice {
    pub fn get(&self, key: FieldKey) -> Option<&NormalizedField> {
        self.fields.get(key.as_str())
    }

    pub fn insert(&mut self, key: FieldKey, field: NormalizedField) {
        self.fields.insert(key.as_str().to_string(), field);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.line_items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn provider_labels_are_distinct() {
        let mut labels: Vec<_> = FieldKey::ALL.iter().map(|k| k.provider_label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), FieldKey::ALL.len());
    }

    #[test]
    fn missing_confidence_defaults_to_zero() {
        assert_eq!(NormalizedField::new("x", None).confidence, 0.0);
        assert_eq!(NormalizedField::new("x", Some(0.42)).confidence, 0.42);
    }

    #[test]
    fn invoice_serializes_flat_and_skips_empty_items() {
        let mut invoice = NormalizedInvoice::default();
        invoice.insert(FieldKey::InvoiceId, NormalizedField::new("INV-1", Some(0.5)));
        let value = serde_json::to_value(&invoice).unwrap();
        assert_eq!(value, json!({ "invoice_id": { "value": "INV-1", "confidence": 0.5 } }));
    }

    #[test]
    fn line_items_key_is_not_swallowed_by_flattened_fields() {
        let value = json!({
            "due_date": { "value": "2024-01-31", "confidence": 0.7 },
            "line_items": [{ "description": { "value": "Widget", "confidence": 0.9 } }]
        });
        let invoice: NormalizedInvoice = serde_json::from_value(value).unwrap();
        assert_eq!(invoice.fields.len(), 1);
        assert_eq!(invoice.line_items.len(), 1);
        assert_eq!(
            invoice.line_items[0].description.as_ref().map(|f| f.value.as_str()),
            Some("Widget")
        );
    }
}
