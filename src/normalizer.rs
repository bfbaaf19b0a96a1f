//! Flattens vendor-specific raw hits into the canonical attribute set.
//!
//! Each vendor gets one [`Extractor`] implementation; the merge, history and
//! scoring core only ever sees [`NormalizedFields`]. Missing fields map to
//! `None`, never to an empty string, so the merger can tell "absent" apart
//! from "explicitly empty".

use crate::model::NormalizedFields;
use serde_json::Value;
use tracing::warn;

pub trait Extractor: Send + Sync {
    fn extract(&self, raw: &Value) -> Option<NormalizedFields>;
}

/// Picks the extractor for a configured website name. Unknown vendors fall
/// back to the DirectDial field conventions, which double as the generic
/// search-API shape.
pub fn extractor_for(website: &str) -> Box<dyn Extractor> {
    match website.to_ascii_lowercase().as_str() {
        "insight" => Box::new(InsightExtractor),
        _ => Box::new(DirectDialExtractor),
    }
}

/// Convenience wrapper used by the sync loop.
pub fn normalize(extractor: &dyn Extractor, raw: &Value) -> Option<NormalizedFields> {
    extractor.extract(raw)
}

// ---------------------------------------------------------------------------
// Shared field helpers
// ---------------------------------------------------------------------------

/// Search APIs wrap the record in a "document" envelope; unwrap it if present.
fn document(raw: &Value) -> &Value {
    raw.get("document").unwrap_or(raw)
}

/// String view of a raw field. Lists are joined with ", " in original order;
/// numbers are rendered as text; empty strings collapse to `None`.
fn field_str(hit: &Value, key: &str) -> Option<String> {
    match hit.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() { None } else { Some(s.to_string()) }
        }
        Value::Array(items) => {
            let joined = items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            if joined.is_empty() { None } else { Some(joined) }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn field_f64(hit: &Value, key: &str) -> Option<f64> {
    match hit.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
        _ => None,
    }
}

fn field_i64(hit: &Value, key: &str) -> Option<i64> {
    match hit.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// Parses capacities like "16 GB" or "1 TB" into whole gigabytes.
fn parse_gigabytes(text: &str) -> Option<i64> {
    let upper = text.to_ascii_uppercase();
    if let Some(gb) = upper.strip_suffix("GB") {
        gb.trim().parse::<f64>().ok().map(|v| v.round() as i64)
    } else if let Some(tb) = upper.strip_suffix("TB") {
        tb.trim().parse::<f64>().ok().map(|v| (v * 1000.0).round() as i64)
    } else {
        upper.trim().parse::<f64>().ok().map(|v| v.round() as i64)
    }
}

/// Parses screen sizes like `15.6"` into inches.
fn parse_screen_size(text: &str) -> Option<f64> {
    text.trim().trim_end_matches('"').trim().parse().ok()
}

/// Case-insensitive prefix strip that never slices mid-character, even when
/// case folding changes byte length.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut rest = text.chars();
    for expected in prefix.chars() {
        let c = rest.next()?;
        if !c.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    Some(rest.as_str())
}

/// Canonical desktop form-factor classes used by the scorer.
fn canonical_form_factor(raw: &str) -> Option<String> {
    let class = match raw.trim() {
        "Desktop Mini" | "Micro PC" | "Tiny" | "Mini PC" => "Tiny",
        "Mini-tower" | "Small Form Factor" | "SFF" | "Ultra Small" => "SFF",
        "Tower" => "Tower",
        "Desktop" | "All-in-One" => "All-in-One",
        _ => return None,
    };
    Some(class.to_string())
}

// ---------------------------------------------------------------------------
// DirectDial
// ---------------------------------------------------------------------------

/// DirectDial search hits carry commerce fields under short keys and the
/// spec sheet under the vendor's label strings.
pub struct DirectDialExtractor;

impl DirectDialExtractor {
    /// Product name from line/series/model components, with any SKU echo
    /// stripped out. Falls back to the plain name field.
    fn extract_name(hit: &Value, sku: &str) -> Option<String> {
        let mut name = String::new();
        for key in ["Product Line", "Product Series", "Product Model"] {
            if let Some(part) = field_str(hit, key) {
                if !name.is_empty() {
                    name.push(' ');
                }
                name.push_str(&part);
            }
        }
        if name.is_empty() {
            name = field_str(hit, "name")?;
        }
        let name = name.replace(sku, "").trim().to_string();
        if name.is_empty() { None } else { Some(name) }
    }

    /// CPU string from manufacturer/type/model, avoiding the duplicated
    /// family token ("Core i7" + "i7-10700" -> "Core i7-10700").
    fn extract_cpu(hit: &Value) -> Option<String> {
        let manufacturer = field_str(hit, "Processor Manufacturer");
        let cpu_type = field_str(hit, "Processor Type");
        let model = field_str(hit, "Processor Model");
        match (manufacturer, cpu_type, model) {
            (Some(manu), Some(ty), Some(model)) => {
                let family = ty.split_whitespace().last().unwrap_or_default();
                match strip_prefix_ignore_case(&model, family) {
                    Some(rest) if !family.is_empty() => Some(format!("{manu} {ty}{rest}")),
                    _ => Some(format!("{manu} {ty} {model}")),
                }
            }
            (Some(manu), Some(ty), None) => Some(format!("{manu} {ty}")),
            _ => field_str(hit, "cpu"),
        }
    }

    /// GPU string; shared graphics memory collapses to the "Integrated"
    /// literal the scorer special-cases. Dual-GPU listings pick the
    /// dedicated half.
    fn extract_gpu(hit: &Value) -> Option<String> {
        let accessibility = field_str(hit, "Graphics Memory Accessibility");
        let manufacturer = field_str(hit, "Graphics Controller Manufacturer");
        let model = field_str(hit, "Graphics Controller Model");
        match accessibility.as_deref() {
            Some("Shared") => Some("Integrated".to_string()),
            Some("Dedicated") => match (manufacturer, model) {
                (Some(manu), Some(model)) => Some(format!("{manu} {model}")),
                (_, Some(model)) => Some(model),
                _ => None,
            },
            Some(acc) if acc.contains(',') => {
                let position = acc
                    .split(',')
                    .position(|part| part.trim() == "Dedicated")?;
                let manu = manufacturer?;
                let model = model?;
                let manu = manu.split(',').nth(position)?.trim().to_string();
                let model = model.split(',').nth(position)?.trim().to_string();
                Some(format!("{manu} {model}"))
            }
            _ => field_str(hit, "gpu"),
        }
    }

    fn extract_ram(hit: &Value) -> Option<i64> {
        field_str(hit, "Total Installed System Memory")
            .as_deref()
            .and_then(parse_gigabytes)
            .or_else(|| field_i64(hit, "ram"))
    }

    fn extract_storage(hit: &Value) -> Option<i64> {
        field_str(hit, "Total Solid State Drive Capacity")
            .or_else(|| field_str(hit, "Flash Memory Capacity"))
            .as_deref()
            .and_then(parse_gigabytes)
            .or_else(|| field_i64(hit, "storage"))
    }
}

impl Extractor for DirectDialExtractor {
    fn extract(&self, raw: &Value) -> Option<NormalizedFields> {
        let hit = document(raw);
        let Some(sku) = field_str(hit, "sku").or_else(|| field_str(hit, "id")) else {
            warn!("dropping hit without sku/id: {}", truncate(raw));
            return None;
        };

        let form_factor = field_str(hit, "Form Factor")
            .as_deref()
            .and_then(canonical_form_factor)
            .or_else(|| field_str(hit, "form_factor"));
        let screen_size = field_str(hit, "Screen Size")
            .as_deref()
            .and_then(parse_screen_size);

        Some(NormalizedFields {
            name: Self::extract_name(hit, &sku),
            category: field_str(hit, "Product Type").or_else(|| field_str(hit, "category")),
            brand: field_str(hit, "brand"),
            form_factor,
            price: field_f64(hit, "price"),
            msrp: field_f64(hit, "msrp"),
            stock: field_i64(hit, "stock"),
            cpu: Self::extract_cpu(hit),
            gpu: Self::extract_gpu(hit),
            gpu_memory_mode: field_str(hit, "Graphics Memory Accessibility"),
            ram: Self::extract_ram(hit),
            storage: Self::extract_storage(hit),
            os: field_str(hit, "Operating System Platform").or_else(|| field_str(hit, "os")),
            screen_size,
            screen_resolution: field_str(hit, "Screen Mode")
                .or_else(|| field_str(hit, "screen_resolution")),
            touchscreen: field_str(hit, "Touchscreen"),
            keyboard_locale: field_str(hit, "Keyboard Localization"),
            wifi: field_str(hit, "Wireless LAN"),
            url: field_str(hit, "url"),
            sku,
        })
    }
}

// ---------------------------------------------------------------------------
// Insight
// ---------------------------------------------------------------------------

/// Insight's search API exposes little beyond SKU and live price; the
/// fill-missing merge keeps spec-sheet fields sourced elsewhere intact.
pub struct InsightExtractor;

impl Extractor for InsightExtractor {
    fn extract(&self, raw: &Value) -> Option<NormalizedFields> {
        let hit = document(raw);
        let Some(sku) = field_str(hit, "sku") else {
            warn!("dropping Insight hit without sku: {}", truncate(raw));
            return None;
        };
        Some(NormalizedFields {
            price: field_f64(hit, "insightPrice").or_else(|| field_f64(hit, "price")),
            stock: field_i64(hit, "stock"),
            name: field_str(hit, "description"),
            brand: field_str(hit, "manufacturerName"),
            url: field_str(hit, "url"),
            sku,
            ..Default::default()
        })
    }
}

fn truncate(raw: &Value) -> String {
    raw.to_string().chars().take(120).collect()
}
