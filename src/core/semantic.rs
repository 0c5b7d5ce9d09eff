use crate::models::PropertyRecord;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Remote text-in/text-out model used for semantic matching
///
/// Implementations swallow their own failures: an unreachable or failing
/// model answers with an empty string.
#[async_trait]
pub trait SemanticOracle: Send + Sync {
    async fn ask(&self, prompt: &str, system_prompt: &str) -> String;
}

pub const SYSTEM_PROMPT: &str = "Eres un asistente experto en bienes raíces. \
Identificas qué propiedades de un listado son relevantes para la búsqueda de un usuario. \
Respondes únicamente con JSON válido, sin explicaciones.";

const TITLE_CHARS: usize = 80;
const LOCATION_CHARS: usize = 40;

/// Chunked semantic matcher over a property catalog
///
/// The catalog is capped at `max_properties`, split into chunks of
/// `chunk_size` and sent to the oracle one chunk at a time, pausing after
/// each call. Identifiers are unioned across chunks.
#[derive(Clone)]
pub struct SemanticSearcher {
    oracle: Arc<dyn SemanticOracle>,
    chunk_size: usize,
    max_properties: usize,
    pause: Duration,
}

impl SemanticSearcher {
    pub fn new(oracle: Arc<dyn SemanticOracle>) -> Self {
        Self {
            oracle,
            chunk_size: 50,
            max_properties: 2000,
            pause: Duration::from_millis(150),
        }
    }

    pub fn with_limits(mut self, chunk_size: usize, max_properties: usize, pause: Duration) -> Self {
        self.chunk_size = chunk_size.max(1);
        self.max_properties = max_properties;
        self.pause = pause;
        self
    }

    /// Ask the oracle which properties are relevant to `query`
    ///
    /// Returns the matching records in catalog order. A failed or
    /// unparseable chunk contributes nothing.
    pub async fn search(&self, properties: &[PropertyRecord], query: &str) -> Vec<PropertyRecord> {
        let capped = &properties[..properties.len().min(self.max_properties)];
        if capped.is_empty() {
            return Vec::new();
        }

        let mut relevant: HashSet<i64> = HashSet::new();
        for (index, chunk) in capped.chunks(self.chunk_size).enumerate() {
            let prompt = build_prompt(chunk, query);
            let reply = self.oracle.ask(&prompt, SYSTEM_PROMPT).await;
            let ids = parse_property_ids(&reply);

            debug!(
                chunk = index,
                chunk_len = chunk.len(),
                ids_found = ids.len(),
                "Semantic chunk processed"
            );
            relevant.extend(ids);

            if !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
        }

        let matched: Vec<PropertyRecord> = capped
            .iter()
            .filter(|p| relevant.contains(&p.id))
            .cloned()
            .collect();

        info!(
            analyzed = capped.len(),
            matched = matched.len(),
            "Semantic search finished"
        );

        matched
    }
}

/// One compact line per property
pub fn format_property_line(property: &PropertyRecord) -> String {
    format!(
        "ID:{} | T:{} | Tipo:{} | Precio:{:.0} | Hab:{} | Banos:{} | Area:{} | Ubic:{} | Fecha:{}",
        property.id,
        truncate_chars(&property.title, TITLE_CHARS),
        property.property_type,
        property.price,
        property.rooms,
        property.bathrooms,
        property.area_m2,
        truncate_chars(&property.location, LOCATION_CHARS),
        property.published_on.as_deref().unwrap_or("N/A"),
    )
}

pub fn build_prompt(chunk: &[PropertyRecord], query: &str) -> String {
    let listing: Vec<String> = chunk.iter().map(format_property_line).collect();
    format!(
        "Consulta del usuario: \"{}\"\n\n\
         Propiedades disponibles:\n{}\n\n\
         Selecciona las propiedades que coinciden con la consulta.\n\
         RESPONDE CON UN JSON QUE CONTENGA SOLO LOS IDS DE LAS PROPIEDADES RELEVANTES, \
         con el formato {{\"property_ids\": [1, 2, 3]}}. \
         Si ninguna coincide responde {{\"property_ids\": []}}.\n\
         NO INCLUYAS NINGÚN TEXTO ADICIONAL.",
        query,
        listing.join("\n")
    )
}

/// Identifiers listed under `property_ids` in the first JSON object of a reply
///
/// Accepts numbers and numeric strings; anything else yields no identifiers.
pub fn parse_property_ids(reply: &str) -> Vec<i64> {
    let Some(object) = first_json_object(reply) else {
        return Vec::new();
    };
    let Ok(value) = serde_json::from_str::<Value>(object) else {
        return Vec::new();
    };

    value
        .get("property_ids")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(|id| match id {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The first balanced `{...}` of `text`, ignoring braces inside strings
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
