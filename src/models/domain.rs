use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Kind of listing.
///
/// Serialized with the catalog's Spanish vocabulary (`casa`, `departamento`,
/// `terreno`, `local`, `oficina`); parsing is case-insensitive and accepts
/// plurals and common synonyms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PropertyType {
    House,
    Apartment,
    Land,
    CommercialUnit,
    Office,
}

impl PropertyType {
    pub const ALL: [PropertyType; 5] = [
        PropertyType::House,
        PropertyType::Apartment,
        PropertyType::Land,
        PropertyType::CommercialUnit,
        PropertyType::Office,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::House => "casa",
            PropertyType::Apartment => "departamento",
            PropertyType::Land => "terreno",
            PropertyType::CommercialUnit => "local",
            PropertyType::Office => "oficina",
        }
    }

    /// Resolve a single word (or the stored `tipo` column) to a property type.
    pub fn from_word(word: &str) -> Option<Self> {
        let word = word.trim().to_lowercase();
        let singular = match word.as_str() {
            "locales" => "local",
            w => w.strip_suffix('s').unwrap_or(w),
        };

        match singular {
            "casa" | "house" => Some(PropertyType::House),
            "departamento" | "apartamento" | "apartment" | "depto" => Some(PropertyType::Apartment),
            "terreno" | "lote" | "land" => Some(PropertyType::Land),
            "local" | "local comercial" | "commercial-unit" | "commercial_unit" | "commercial" => {
                Some(PropertyType::CommercialUnit)
            }
            "oficina" | "office" => Some(PropertyType::Office),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for PropertyType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PropertyType::from_word(&value).ok_or_else(|| format!("unknown property type '{}'", value))
    }
}

impl From<PropertyType> for String {
    fn from(value: PropertyType) -> Self {
        value.as_str().to_string()
    }
}

/// One real-estate listing as supplied by the catalog
///
/// The wire names follow the catalog schema (`titulo`, `precio`, ...).
/// Numeric fields accept numbers or numeric strings and default to zero
/// when absent or null, so comparisons are always total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(rename = "titulo", alias = "title", default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(rename = "descripcion", alias = "description", default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(rename = "tipo", alias = "type")]
    pub property_type: PropertyType,
    #[serde(rename = "precio", alias = "price", default, deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(rename = "habitaciones", alias = "rooms", default, deserialize_with = "lenient_u32")]
    pub rooms: u32,
    #[serde(rename = "banos", alias = "bathrooms", default, deserialize_with = "lenient_f64")]
    pub bathrooms: f64,
    #[serde(rename = "area_m2", alias = "area", default, deserialize_with = "lenient_f64")]
    pub area_m2: f64,
    #[serde(rename = "ubicacion", alias = "location", default, deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(rename = "fecha_publicacion", alias = "published_on", default)]
    pub published_on: Option<String>,
    #[serde(rename = "imagen_url", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn value(&self) -> Option<f64> {
        match self {
            Numeric::Number(n) => Some(*n),
            Numeric::Text(s) => s.trim().replace(',', "").parse().ok(),
        }
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Numeric>::deserialize(deserializer)?;
    Ok(value
        .and_then(|n| n.value())
        .filter(|n| n.is_finite() && *n >= 0.0)
        .unwrap_or(0.0))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_f64(deserializer).map(|n| n.round() as u32)
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Numeric::deserialize(deserializer)?;
    value
        .value()
        .filter(|n| n.fract() == 0.0)
        .map(|n| n as i64)
        .ok_or_else(|| serde::de::Error::custom("property id must be an integer"))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A target value with a relative tolerance band (`target × (1 ± tolerance)`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Approx {
    pub target: f64,
    pub tolerance: f64,
}

impl Approx {
    pub fn new(target: f64, tolerance: f64) -> Self {
        Self { target, tolerance }
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        let low = self.target * (1.0 - self.tolerance);
        let high = self.target * (1.0 + self.tolerance);
        value >= low && value <= high
    }
}

/// Inclusive price range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    /// Build a range from two bounds given in any order
    pub fn between(a: f64, b: f64) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Structured search intent extracted from free text
///
/// Every field is an independent, optional criterion; all present criteria
/// are combined conjunctively by the strict matcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Criteria {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_exact: Option<Approx>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooms_exact: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms_exact: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_exact: Option<Approx>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_within_days: Option<u32>,
}

impl Criteria {
    pub fn is_empty(&self) -> bool {
        self == &Criteria::default()
    }

    /// Whether any price criterion has been extracted
    pub fn has_price(&self) -> bool {
        self.price_exact.is_some()
            || self.price_min.is_some()
            || self.price_max.is_some()
            || self.price_range.is_some()
    }
}

/// A listing annotated with its per-query relevance
///
/// `match_score` and `match_reasons` only live for the duration of one
/// search; [`ScoredProperty::into_property`] drops them before records leave
/// the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredProperty {
    #[serde(flatten)]
    pub property: PropertyRecord,
    #[serde(rename = "_match_score")]
    pub match_score: u32,
    #[serde(rename = "_match_reasons")]
    pub match_reasons: Vec<String>,
}

impl ScoredProperty {
    pub fn new(property: PropertyRecord, match_score: u32, match_reasons: Vec<String>) -> Self {
        Self {
            property,
            match_score,
            match_reasons,
        }
    }

    pub fn into_property(self) -> PropertyRecord {
        self.property
    }
}

/// Which cascade stage produced the working set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Empty catalog, no stage ran
    None,
    ExactFilters,
    AiSemantic,
    ExactPlusSemantic,
    TextFilter,
}

impl SearchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStrategy::None => "none",
            SearchStrategy::ExactFilters => "exact_filters",
            SearchStrategy::AiSemantic => "ai_semantic",
            SearchStrategy::ExactPlusSemantic => "exact_plus_semantic",
            SearchStrategy::TextFilter => "text_filter",
        }
    }

    pub fn uses_ai(&self) -> bool {
        matches!(self, SearchStrategy::AiSemantic | SearchStrategy::ExactPlusSemantic)
    }
}

/// Final strategy label: the producing stage plus whether boosting reordered it
///
/// Serialized as a single string such as `exact_filters_with_boost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveStrategy {
    pub stage: SearchStrategy,
    pub boosted: bool,
}

impl ActiveStrategy {
    pub fn new(stage: SearchStrategy, boosted: bool) -> Self {
        Self { stage, boosted }
    }

    pub fn name(&self) -> String {
        if self.boosted {
            format!("{}_with_boost", self.stage.as_str())
        } else {
            self.stage.as_str().to_string()
        }
    }
}

impl fmt::Display for ActiveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for ActiveStrategy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.name())
    }
}

/// Bookkeeping about how a search result was produced
#[derive(Debug, Clone, Serialize)]
pub struct SearchMetadata {
    pub total_found: usize,
    pub search_strategy: ActiveStrategy,
    pub ai_used: bool,
    pub semantic_invoked: bool,
    pub boost_applied: bool,
    pub exact_matches: usize,
    pub total_properties_analyzed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    pub user_query: String,
}

/// Output of one search
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub properties: Vec<PropertyRecord>,
    pub keywords: Vec<String>,
    pub analysis: String,
    pub metadata: SearchMetadata,
}

/// Cascade thresholds and limits
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchTuning {
    /// Strict results below this count trigger the semantic fallback
    pub low_result_threshold: usize,
    /// Semantic results replace strict ones when `|B| > |A| × ratio`
    pub semantic_replace_ratio: f64,
    /// Maximum semantic results appended when blending
    pub blend_extra: usize,
    pub max_results: usize,
    pub max_keywords: usize,
    pub semantic_chunk_size: usize,
    pub semantic_max_properties: usize,
    pub semantic_pause_ms: u64,
}

impl Default for SearchTuning {
    fn default() -> Self {
        Self {
            low_result_threshold: 3,
            semantic_replace_ratio: 1.5,
            blend_extra: 5,
            max_results: 10,
            max_keywords: 5,
            semantic_chunk_size: 50,
            semantic_max_properties: 2000,
            semantic_pause_ms: 150,
        }
    }
}

/// Business-designated "hero" attributes that are surfaced first
///
/// Any attribute can be disabled by setting it to `None`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PriorityProfile {
    pub price: Option<f64>,
    pub price_tolerance: f64,
    pub rooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub bathrooms_tolerance: f64,
    pub area: Option<f64>,
    pub area_tolerance: f64,
    pub location: Option<String>,
    pub published_on: Option<String>,
    pub attribute_bonus: u32,
    pub location_bonus: u32,
    pub mention_bonus: u32,
}

impl Default for PriorityProfile {
    fn default() -> Self {
        Self {
            price: Some(485_000.0),
            price_tolerance: 0.05,
            rooms: Some(3),
            bathrooms: Some(2.5),
            bathrooms_tolerance: 0.5,
            area: Some(220.0),
            area_tolerance: 0.10,
            location: Some("eco villa".to_string()),
            published_on: Some("2025-10-29".to_string()),
            attribute_bonus: 12,
            location_bonus: 15,
            mention_bonus: 6,
        }
    }
}

impl PriorityProfile {
    /// A profile with every priority attribute disabled
    pub fn disabled() -> Self {
        Self {
            price: None,
            rooms: None,
            bathrooms: None,
            area: None,
            location: None,
            published_on: None,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_aliases() {
        assert_eq!(PropertyType::from_word("Casas"), Some(PropertyType::House));
        assert_eq!(PropertyType::from_word("APARTAMENTO"), Some(PropertyType::Apartment));
        assert_eq!(PropertyType::from_word("lotes"), Some(PropertyType::Land));
        assert_eq!(PropertyType::from_word("locales"), Some(PropertyType::CommercialUnit));
        assert_eq!(PropertyType::from_word("oficinas"), Some(PropertyType::Office));
        assert_eq!(PropertyType::from_word("castillo"), None);
    }

    #[test]
    fn test_record_lenient_numbers() {
        let json = r#"{
            "id": "7",
            "titulo": "Casa en Mixco",
            "tipo": "Casa",
            "precio": "350000.00",
            "habitaciones": null,
            "banos": 2.5,
            "ubicacion": null
        }"#;

        let record: PropertyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.property_type, PropertyType::House);
        assert_eq!(record.price, 350_000.0);
        assert_eq!(record.rooms, 0);
        assert_eq!(record.bathrooms, 2.5);
        assert_eq!(record.area_m2, 0.0);
        assert_eq!(record.location, "");
        assert!(record.published_on.is_none());
    }

    #[test]
    fn test_record_rejects_unknown_type() {
        let json = r#"{"id": 1, "tipo": "castillo"}"#;
        assert!(serde_json::from_str::<PropertyRecord>(json).is_err());
    }

    #[test]
    fn test_approx_band() {
        let approx = Approx::new(200.0, 0.05);
        assert!(approx.contains(190.0));
        assert!(approx.contains(210.0));
        assert!(!approx.contains(211.0));
    }

    #[test]
    fn test_strategy_label() {
        let plain = ActiveStrategy::new(SearchStrategy::ExactFilters, false);
        let boosted = ActiveStrategy::new(SearchStrategy::TextFilter, true);
        assert_eq!(plain.name(), "exact_filters");
        assert_eq!(boosted.name(), "text_filter_with_boost");
        assert_eq!(serde_json::to_string(&boosted).unwrap(), "\"text_filter_with_boost\"");
    }

    #[test]
    fn test_criteria_serialization_is_sparse() {
        let criteria = Criteria {
            rooms_exact: Some(3),
            ..Criteria::default()
        };
        assert_eq!(serde_json::to_string(&criteria).unwrap(), r#"{"rooms_exact":3}"#);
        assert!(Criteria::default().is_empty());
    }
}
