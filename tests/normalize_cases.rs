use invoice_pipeline::{normalize_value, Error, FieldKey, NormalizedField, NormalizedInvoice};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn single_document(fields: Value) -> Value {
    json!({
        "apiVersion": "2024-11-30",
        "modelId": "prebuilt-invoice",
        "content": "INVOICE ...",
        "documents": [{ "docType": "invoice", "confidence": 1.0, "fields": fields }]
    })
}

#[test]
fn invoice_id_and_total_yield_exactly_two_keys() {
    let invoice = normalize_value(single_document(json!({
        "InvoiceId": { "type": "string", "valueString": "INV-1001", "content": "INV-1001", "confidence": 0.98 },
        "InvoiceTotal": {
            "type": "currency",
            "valueCurrency": { "amount": 245.5, "currencySymbol": "$", "currencyCode": "USD" },
            "content": "$245.50",
            "confidence": 0.91
        }
    })))
    .expect("valid result");

    assert_eq!(
        serde_json::to_value(&invoice).unwrap(),
        json!({
            "invoice_id": { "value": "INV-1001", "confidence": 0.98 },
            "invoice_total": { "value": "245.50", "confidence": 0.91 }
        })
    );
}

#[test]
fn every_subset_of_known_fields_maps_to_matching_keys() {
    let all = [
        ("InvoiceId", json!({ "type": "string", "valueString": "INV-7", "confidence": 0.9 })),
        ("VendorName", json!({ "type": "string", "valueString": "CONTOSO LTD." })),
        ("InvoiceTotal", json!({ "type": "currency", "valueCurrency": { "amount": 110.0 }, "confidence": 0.5 })),
        ("InvoiceDate", json!({ "type": "date", "valueDate": "2019-11-15", "confidence": 0.8 })),
        ("DueDate", json!({ "type": "date", "valueDate": "2019-12-15", "confidence": 0.7 })),
    ];

    for mask in 0u32..(1 << all.len()) {
        let mut fields = serde_json::Map::new();
        // Unknown labels must never leak into the output.
        fields.insert(
            "CustomerName".to_string(),
            json!({ "type": "string", "valueString": "MICROSOFT" }),
        );
        for (i, (label, field)) in all.iter().enumerate() {
            if mask & (1 << i) != 0 {
                fields.insert((*label).to_string(), field.clone());
            }
        }

        let invoice = normalize_value(single_document(Value::Object(fields))).unwrap();

        let expected: Vec<&str> = FieldKey::ALL
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, key)| key.as_str())
            .collect();
        let mut actual: Vec<&str> = invoice.fields.keys().map(String::as_str).collect();
        actual.sort_unstable();
        let mut expected_sorted = expected.clone();
        expected_sorted.sort_unstable();
        assert_eq!(actual, expected_sorted, "mask {mask:#07b}");

        for field in invoice.fields.values() {
            assert!((0.0..=1.0).contains(&field.confidence));
        }
    }
}

#[test]
fn missing_confidence_becomes_zero() {
    let invoice = normalize_value(single_document(json!({
        "VendorName": { "type": "string", "valueString": "CONTOSO LTD." }
    })))
    .unwrap();
    assert_eq!(
        invoice.get(FieldKey::VendorName),
        Some(&NormalizedField::new("CONTOSO LTD.", None))
    );
}

#[test]
fn empty_results_are_not_errors() {
    for raw in [
        json!({}),
        json!({ "documents": [] }),
        single_document(json!({})),
    ] {
        let invoice = normalize_value(raw).expect("empty result is valid");
        assert!(invoice.is_empty());
    }
}

#[test]
fn malformed_field_collections_are_rejected() {
    for raw in [
        json!(null),
        json!("documents"),
        json!({ "documents": null }),
        json!({ "documents": { "fields": {} } }),
        json!({ "documents": [{ "fields": null }] }),
        json!({ "documents": [{ "fields": ["InvoiceId"] }] }),
    ] {
        let err = normalize_value(raw.clone()).unwrap_err();
        assert!(matches!(err, Error::MalformedResult(_)), "{raw} -> {err}");
    }
}

#[test]
fn odd_values_elsewhere_do_not_cost_the_known_fields() {
    let invoice = normalize_value(single_document(json!({
        "InvoiceId": { "type": "string", "valueString": "INV-1001", "confidence": 0.98 },
        "CustomerTaxId": { "type": "string", "valueString": 12345 },
        "PaymentTerm": 42,
        "VendorName": { "type": "string", "valueString": ["CONTOSO"], "content": "CONTOSO LTD.", "confidence": 0.6 },
        "Items": { "type": "array", "valueArray": [
            { "type": "object", "valueObject": {
                "Tax": null,
                "Description": { "type": "string", "valueString": "Consulting", "confidence": 0.9 }
            } },
            "not a row"
        ] }
    })))
    .expect("odd values are tolerated");

    assert_eq!(
        invoice.get(FieldKey::InvoiceId),
        Some(&NormalizedField::new("INV-1001", Some(0.98)))
    );
    assert_eq!(
        invoice.get(FieldKey::VendorName),
        Some(&NormalizedField::new("CONTOSO LTD.", Some(0.6)))
    );
    assert_eq!(invoice.fields.len(), 2);
    assert_eq!(invoice.line_items.len(), 1);
    assert_eq!(
        invoice.line_items[0].description.as_ref().unwrap().value,
        "Consulting"
    );
}

#[test]
fn on_disk_shape_round_trips() {
    let invoice = normalize_value(single_document(json!({
        "InvoiceId": { "type": "string", "valueString": "INV-100", "confidence": 0.97 },
        "DueDate": { "type": "date", "valueDate": "2019-12-15", "confidence": 0.94 },
        "Items": { "type": "array", "valueArray": [
            { "type": "object", "valueObject": {
                "Description": { "type": "string", "valueString": "Test for 23 fields", "confidence": 0.9 },
                "Amount": { "type": "currency", "valueCurrency": { "amount": 100.0 }, "confidence": 0.9 }
            } }
        ] }
    })))
    .unwrap();

    let text = serde_json::to_string_pretty(&invoice).unwrap();
    let parsed: NormalizedInvoice = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, invoice);
    assert_eq!(parsed.line_items.len(), 1);
}
