//! Azure prebuilt-invoice result -> flat invoice map.

use crate::analysis::{AnalyzedDocument, DocumentAnalysisResult, DocumentField, FieldValue};
use crate::error::Result;
use crate::types::{FieldKey, LineItem, NormalizedField, NormalizedInvoice};

const ITEMS_LABEL: &str = "Items";

/// Validate the raw `analyzeResult` shape, then normalize it. Nothing is returned on a shape error.
pub fn normalize_value(raw: serde_json::Value) -> Result<NormalizedInvoice> {
    let result = DocumentAnalysisResult::from_value(raw)?;
    Ok(normalize(&result))
}

pub fn normalize(result: &DocumentAnalysisResult) -> NormalizedInvoice {
    let mut invoice = NormalizedInvoice::default();
    let Some(doc) = result.first_document() else {
        return invoice;
    };

    for key in FieldKey::ALL {
        if let Some(field) = doc.field(key.provider_label()).and_then(normalize_field) {
            invoice.insert(key, field);
        }
    }
    invoice.line_items = line_items(doc);
    invoice
}

/// `None` when the field carries no text at all; confidence is passed through untouched.
fn normalize_field(field: &DocumentField) -> Option<NormalizedField> {
    field
        .value()
        .display()
        .map(|value| NormalizedField::new(value, field.confidence))
}

fn line_items(doc: &AnalyzedDocument) -> Vec<LineItem> {
    let Some(items) = doc.field(ITEMS_LABEL) else {
        return Vec::new();
    };
    let FieldValue::Array(rows) = items.value() else {
        tracing::debug!("Items field is not an array, skipping line items");
        return Vec::new();
    };
    rows.iter()
        .flatten()
        .filter_map(|row| match row.value() {
            FieldValue::Object(cells) => {
                let cell = |name: &str| {
                    cells
                        .get(name)
                        .and_then(Option::as_ref)
                        .and_then(normalize_field)
                };
                let item = LineItem {
                    description: cell("Description"),
                    product_code: cell("ProductCode"),
                    quantity: cell("Quantity"),
                    unit_price: cell("UnitPrice"),
                    amount: cell("Amount"),
                };
                (!item.is_empty()).then_some(item)
            }
            _ => None,
        })
        .collect()
}
