//! LLM enhancement of the OCR invoice via OpenAI chat completions.
//!
//! The model receives the normalized OCR map and answers with a JSON object in
//! the same `{value, confidence}` shape. Its fields are merged over the OCR
//! fields; a `null` or `"nil"` answer means "no value" and leaves the OCR field alone.

use crate::config::{HttpSettings, OpenAiConfig};
use crate::error::{Error, Result};
use crate::types::{LineItem, NormalizedField, NormalizedInvoice};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "You are an invoice data extraction assistant. \
You receive fields extracted by OCR from one invoice as a JSON object whose values are \
{\"value\": string, \"confidence\": number between 0 and 1}. \
Correct OCR mistakes, normalize formats (dates as YYYY-MM-DD, amounts as plain numbers with two decimals) \
and fill in fields you can infer with certainty. \
Return ONLY a JSON object with these keys: invoice_id, vendor_name, vendor_address, customer_name, \
customer_address, invoice_date, due_date, purchase_order, subtotal, total_tax, invoice_total, \
amount_due, currency, payment_terms, and line_items (an array of objects with description, \
product_code, quantity, unit_price, amount). Every field value is {\"value\": string, \"confidence\": number}. \
Use null for any field you cannot determine. Never invent values.";

pub trait Enhancer {
    fn enhance(&self, invoice: &NormalizedInvoice) -> Result<NormalizedInvoice>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f64,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn enhancement_error(e: impl std::fmt::Display) -> Error {
    Error::EnhancementService(e.to_string())
}

fn build_request<'a>(model: &'a str, invoice: &NormalizedInvoice) -> Result<ChatRequest<'a>> {
    let fields = serde_json::to_string_pretty(invoice)?;
    Ok(ChatRequest {
        model,
        messages: vec![
            Message {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            Message {
                role: "user",
                content: format!("OCR fields:\n{fields}"),
            },
        ],
        temperature: 0.0,
        response_format: ResponseFormat {
            r#type: "json_object",
        },
    })
}

pub struct OpenAiEnhancer {
    client: Client,
}

impl OpenAiEnhancer {
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(enhancement_error)?;
        Ok(Self { client })
    }
}

impl Enhancer for OpenAiEnhancer {
    fn enhance(&self, invoice: &NormalizedInvoice) -> Result<NormalizedInvoice> {
        let config = OpenAiConfig::from_env().map_err(enhancement_error)?;
        let request = build_request(&config.model, invoice)?;
        info!(model = %config.model, fields = invoice.fields.len(), "requesting enhancement");

        let response = self
            .client
            .post(config.completions_url())
            .bearer_auth(&config.api_key)
            .json(&request)
            .send()
            .map_err(|e| enhancement_error(format!("Failed to send request to OpenAI: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::EnhancementService(format!(
                "OpenAI API error ({status}): {body}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .map_err(|e| enhancement_error(format!("Failed to parse OpenAI response: {e}")))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| enhancement_error("OpenAI returned no message content"))?;

        let reply = parse_reply(&content)?;
        debug!(fields = reply.fields.len(), items = reply.line_items.len(), "parsed enhancement reply");
        Ok(merge(invoice, reply))
    }
}

/// Strips a ```json fence or surrounding prose from a model reply.
pub fn extract_json(text: &str) -> &str {
    let text = text.trim();
    if text.starts_with("```") {
        if let Some(start) = text.find('\n') {
            let after_first_line = &text[start + 1..];
            if let Some(end) = after_first_line.rfind("```") {
                return after_first_line[..end].trim();
            }
        }
    }
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return &text[start..=end];
        }
    }
    text
}

/// Parses the model's JSON object. Absent, `null` and `"nil"` values are dropped.
pub fn parse_reply(content: &str) -> Result<NormalizedInvoice> {
    let value: Value = serde_json::from_str(extract_json(content))
        .map_err(|e| enhancement_error(format!("reply is not valid JSON: {e}")))?;
    let Value::Object(map) = value else {
        return Err(enhancement_error("reply is not a JSON object"));
    };

    let mut reply = NormalizedInvoice::default();
    for (key, value) in map {
        if key == "line_items" {
            reply.line_items = parse_line_items(&value);
            continue;
        }
        match parse_field(&value) {
            Some(field) => {
                reply.fields.insert(key, field);
            }
            None => debug!(%key, "no value in enhancement reply"),
        }
    }
    Ok(reply)
}

/// Reply fields override OCR fields; OCR line items are kept unless the reply has its own.
pub fn merge(base: &NormalizedInvoice, reply: NormalizedInvoice) -> NormalizedInvoice {
    let mut merged = base.clone();
    merged.fields.extend(reply.fields);
    if !reply.line_items.is_empty() {
        merged.line_items = reply.line_items;
    }
    merged
}

fn is_nil(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || s.eq_ignore_ascii_case("nil") || s.eq_ignore_ascii_case("null")
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !is_nil(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_confidence(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn parse_field(value: &Value) -> Option<NormalizedField> {
    match value {
        Value::Object(obj) => {
            let text = obj.get("value").and_then(scalar_text)?;
            let confidence = obj.get("confidence").and_then(parse_confidence);
            Some(NormalizedField::new(text, confidence))
        }
        other => scalar_text(other).map(|text| NormalizedField::new(text, None)),
    }
}

fn parse_line_items(value: &Value) -> Vec<LineItem> {
    let Some(rows) = value.as_array() else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(Value::as_object)
        .map(|row: &Map<String, Value>| {
            let cell = |name: &str| row.get(name).and_then(parse_field);
            LineItem {
                description: cell("description"),
                product_code: cell("product_code"),
                quantity: cell("quantity"),
                unit_price: cell("unit_price"),
                amount: cell("amount"),
            }
        })
        .filter(|item| !item.is_empty())
        .collect()
}
