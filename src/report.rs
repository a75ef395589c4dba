use crate::analysis::{DocumentAnalysisResult, DocumentField, FieldValue};
use crate::error::{Error, Result};
use crate::pipeline::RunReport;
use crate::types::{FieldKey, LineItem, NormalizedField, NormalizedInvoice};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const OCR_TAG: &str = "ocr_output";
pub const ENHANCED_TAG: &str = "enhanced_invoice";

pub(crate) const RULE: &str = "------------------------------------------------------------";
pub(crate) const DOUBLE_RULE: &str = "============================================================";

/// Timestamp shared by every file written in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp(String);

impl RunStamp {
    pub fn now() -> Self {
        Self::at(Local::now().naive_local())
    }

    pub fn at(time: NaiveDateTime) -> Self {
        Self(time.format("%Y%m%d_%H%M%S").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Writes `<tag>_<stamp>.json` files into the output directory.
pub struct Reporter {
    dir: PathBuf,
    stamp: RunStamp,
}

impl Reporter {
    /// Creates the output directory if it does not exist yet.
    pub fn create(dir: impl Into<PathBuf>, stamp: RunStamp) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| Error::Io {
            path: dir.clone(),
            source,
        })?;
        let dir = fs::canonicalize(&dir).unwrap_or(dir);
        Ok(Self { dir, stamp })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.json", tag, self.stamp))
    }

    pub fn write(&self, tag: &str, invoice: &NormalizedInvoice) -> Result<PathBuf> {
        let path = self.path_for(tag);
        let bytes = to_json_pretty(invoice)?;
        fs::write(&path, bytes).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Four-space indented JSON.
fn to_json_pretty(invoice: &NormalizedInvoice) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    invoice.serialize(&mut serializer)?;
    Ok(buf)
}

/// "vendor_name" -> "Vendor Name".
fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn write_field(f: &mut fmt::Formatter<'_>, label: &str, field: &NormalizedField) -> fmt::Result {
    writeln!(
        f,
        "{}: {} (confidence: {:.2})",
        label, field.value, field.confidence
    )
}

fn write_line_item(f: &mut fmt::Formatter<'_>, index: usize, item: &LineItem) -> fmt::Result {
    let cells = [
        ("Description", &item.description),
        ("Product Code", &item.product_code),
        ("Quantity", &item.quantity),
        ("Unit Price", &item.unit_price),
        ("Amount", &item.amount),
    ];
    let parts: Vec<String> = cells
        .iter()
        .filter_map(|(label, cell)| cell.as_ref().map(|c| format!("{}: {}", label, c.value)))
        .collect();
    writeln!(f, "  #{} {}", index + 1, parts.join(", "))
}

/// Console summary printed at the end of a run.
pub struct Summary<'a>(pub &'a RunReport);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "Key Invoice Fields (OCR):")?;
        writeln!(f, "{RULE}")?;
        if report.ocr.fields.is_empty() {
            writeln!(f, "No known fields detected.")?;
        }
        for key in FieldKey::ALL {
            if let Some(field) = report.ocr.get(key) {
                match key {
                    FieldKey::InvoiceTotal => writeln!(
                        f,
                        "{}: ${} (confidence: {:.2})",
                        key.display_label(),
                        field.value,
                        field.confidence
                    )?,
                    _ => write_field(f, key.display_label(), field)?,
                }
            }
        }
        if !report.ocr.line_items.is_empty() {
            writeln!(f, "Line Items:")?;
            for (i, item) in report.ocr.line_items.iter().enumerate() {
                write_line_item(f, i, item)?;
            }
        }

        if let Some(enhanced) = &report.enhanced {
            writeln!(f)?;
            writeln!(f, "AI-Enhanced Fields:")?;
            writeln!(f, "{RULE}")?;
            for (key, field) in &enhanced.fields {
                write_field(f, &title_case(key), field)?;
            }
            if !enhanced.line_items.is_empty() {
                writeln!(f, "Line Items:")?;
                for (i, item) in enhanced.line_items.iter().enumerate() {
                    write_line_item(f, i, item)?;
                }
            }
        }

        writeln!(f)?;
        writeln!(f, "{DOUBLE_RULE}")?;
        writeln!(f, "PIPELINE COMPLETED SUCCESSFULLY")?;
        writeln!(f, "{DOUBLE_RULE}")?;
        writeln!(f, "Output directory: {}", report.output_dir.display())?;
        writeln!(f, "OCR data: {}", file_name(&report.ocr_file))?;
        if let Some(path) = &report.enhanced_file {
            writeln!(f, "Enhanced data: {}", file_name(path))?;
        }
        write!(f, "{DOUBLE_RULE}")
    }
}

/// Every detected field of the raw analysis, shown with `--verbose`.
pub struct AnalysisDetails<'a>(pub &'a DocumentAnalysisResult);

fn write_detected(
    f: &mut fmt::Formatter<'_>,
    indent: usize,
    label: &str,
    field: &DocumentField,
) -> fmt::Result {
    let pad = " ".repeat(indent);
    let confidence = field.confidence.unwrap_or(0.0);
    match field.value() {
        FieldValue::Array(rows) => {
            writeln!(f, "{pad}{label}: {} entries (confidence: {confidence:.2})", rows.len())?;
            for (i, row) in rows.iter().enumerate() {
                let label = format!("#{}", i + 1);
                match row {
                    Some(row) => write_detected(f, indent + 2, &label, row)?,
                    None => writeln!(f, "{pad}  {label}: <no value>")?,
                }
            }
            Ok(())
        }
        FieldValue::Object(cells) => {
            writeln!(f, "{pad}{label}: (confidence: {confidence:.2})")?;
            for (name, cell) in cells {
                match cell {
                    Some(cell) => write_detected(f, indent + 2, name, cell)?,
                    None => writeln!(f, "{pad}  {name}: <no value>")?,
                }
            }
            Ok(())
        }
        value => match value.display() {
            Some(text) => writeln!(f, "{pad}{label}: {text} (confidence: {confidence:.2})"),
            None => writeln!(f, "{pad}{label}: <no value> (confidence: {confidence:.2})"),
        },
    }
}

impl fmt::Display for AnalysisDetails<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.documents.is_empty() {
            return writeln!(f, "No documents detected.");
        }
        for (i, doc) in self.0.documents.iter().enumerate() {
            writeln!(
                f,
                "Document #{} ({}, confidence: {:.2})",
                i + 1,
                doc.doc_type.as_deref().unwrap_or("unknown"),
                doc.confidence.unwrap_or(0.0)
            )?;
            for (label, field) in &doc.fields {
                match field {
                    Some(field) => write_detected(f, 2, label, field)?,
                    None => writeln!(f, "  {label}: <no value>")?,
                }
            }
        }
        Ok(())
    }
}
