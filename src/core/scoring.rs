use crate::core::filters::{bathrooms_match, location_matches, parse_published_on};
use crate::core::keywords::{contains_any_term, contains_term, search_terms};
use crate::models::{Criteria, PriorityProfile, PropertyRecord, PropertyType};
use chrono::{Duration, NaiveDate};

// Text overlap weights, per query word
pub const TITLE_WORD: u32 = 3;
pub const DESCRIPTION_WORD: u32 = 2;
pub const LOCATION_WORD: u32 = 4;
pub const TYPE_MATCH: u32 = 5;

// Satisfied-criterion weights
pub const PRICE_EXACT: u32 = 10;
pub const PRICE_RANGE: u32 = 10;
pub const PRICE_BOUND: u32 = 8;
pub const ROOMS_EXACT: u32 = 10;
pub const BATHROOMS_EXACT: u32 = 10;
pub const BATHROOMS_MIN: u32 = 8;
pub const AREA_EXACT: u32 = 10;
pub const AREA_BOUND: u32 = 8;
pub const LOCATION_MATCH: u32 = 12;
pub const RECENCY: u32 = 8;

/// Lowest weight of any specific-attribute criterion
pub const SPECIFIC_MIN: u32 = 8;

const _: () = assert!(TYPE_MATCH < SPECIFIC_MIN);
const _: () = assert!(PRICE_BOUND >= SPECIFIC_MIN && BATHROOMS_MIN >= SPECIFIC_MIN);
const _: () = assert!(AREA_BOUND >= SPECIFIC_MIN && RECENCY >= SPECIFIC_MIN);

/// Calculate the relevance of a property for a query
///
/// Scoring formula:
/// score = (
///     3 × query words in title +
///     2 × query words in description +
///     4 × query words in location +
///     5 if the query names the property's type +
///     8..12 per satisfied criterion +
///     priority boost
/// )
///
/// Returns the score and the reasons that produced it, in evaluation order.
pub fn calculate_relevance_score(
    property: &PropertyRecord,
    query: &str,
    numbers: &[f64],
    criteria: &Criteria,
    profile: &PriorityProfile,
    today: NaiveDate,
) -> (u32, Vec<String>) {
    let (mut score, mut reasons) = text_score(property, query);

    let (criteria_score, criteria_reasons) = criteria_score(property, criteria, today);
    score += criteria_score;
    reasons.extend(criteria_reasons);

    let (boost, boost_reasons) = priority_boost(property, query, numbers, profile);
    score += boost;
    reasons.extend(boost_reasons);

    (score, reasons)
}

/// Substring overlap between query words and the listing's text fields
pub fn text_score(property: &PropertyRecord, query: &str) -> (u32, Vec<String>) {
    let title = property.title.to_lowercase();
    let description = property.description.to_lowercase();
    let location = property.location.to_lowercase();

    let mut score = 0;
    let mut reasons = Vec::new();
    let mut type_named = false;

    for word in search_terms(query) {
        if title.contains(&word) {
            score += TITLE_WORD;
            reasons.push(format!("'{}' en título", word));
        }
        if description.contains(&word) {
            score += DESCRIPTION_WORD;
            reasons.push(format!("'{}' en descripción", word));
        }
        if location.contains(&word) {
            score += LOCATION_WORD;
            reasons.push(format!("'{}' en ubicación", word));
        }
        if !type_named && PropertyType::from_word(&word) == Some(property.property_type) {
            type_named = true;
            score += TYPE_MATCH;
            reasons.push(format!("Tipo: {}", property.property_type));
        }
    }

    (score, reasons)
}

/// Bonus for each present criterion the property satisfies
pub fn criteria_score(property: &PropertyRecord, criteria: &Criteria, today: NaiveDate) -> (u32, Vec<String>) {
    let mut score = 0;
    let mut reasons = Vec::new();
    let mut add = |weight: u32, reason: String| {
        score += weight;
        reasons.push(reason);
    };

    if criteria.price_exact.is_some_and(|exact| exact.contains(property.price)) {
        add(PRICE_EXACT, format!("Precio aproximado: {:.0}", property.price));
    }
    if criteria.price_range.is_some_and(|range| range.contains(property.price)) {
        add(PRICE_RANGE, format!("Precio en rango: {:.0}", property.price));
    }
    if criteria.price_min.is_some_and(|min| property.price >= min) {
        add(PRICE_BOUND, format!("Precio desde el mínimo: {:.0}", property.price));
    }
    if criteria.price_max.is_some_and(|max| property.price <= max) {
        add(PRICE_BOUND, format!("Precio bajo el máximo: {:.0}", property.price));
    }
    if criteria.rooms_exact == Some(property.rooms) {
        add(ROOMS_EXACT, format!("Habitaciones exactas: {}", property.rooms));
    }
    if criteria.bathrooms_exact.is_some_and(|b| bathrooms_match(property.bathrooms, b)) {
        add(BATHROOMS_EXACT, format!("Baños: {}", property.bathrooms));
    }
    if criteria.bathrooms_min.is_some_and(|min| property.bathrooms >= min) {
        add(BATHROOMS_MIN, format!("Baños suficientes: {}", property.bathrooms));
    }
    if criteria.area_exact.is_some_and(|exact| exact.contains(property.area_m2)) {
        add(AREA_EXACT, format!("Área aproximada: {} m²", property.area_m2));
    }
    if criteria.area_min.is_some_and(|min| property.area_m2 >= min) {
        add(AREA_BOUND, format!("Área mínima cumplida: {} m²", property.area_m2));
    }
    if criteria.area_max.is_some_and(|max| property.area_m2 <= max) {
        add(AREA_BOUND, format!("Área máxima cumplida: {} m²", property.area_m2));
    }
    if let Some(wanted) = &criteria.location_contains {
        if location_matches(&property.location, wanted) {
            add(LOCATION_MATCH, format!("Ubicación: {}", property.location));
        }
    }
    if let Some(days) = criteria.recent_within_days {
        let published = property.published_on.as_deref().and_then(parse_published_on);
        if published.is_some_and(|date| date >= today - Duration::days(i64::from(days))) {
            add(RECENCY, format!("Publicada en los últimos {} días", days));
        }
    }

    (score, reasons)
}

/// Bonus for the business-designated hero attributes
///
/// Each attribute the property carries adds the profile's fixed bonus; each
/// designated value the query itself mentions adds `mention_bonus`.
pub fn priority_boost(
    property: &PropertyRecord,
    query: &str,
    numbers: &[f64],
    profile: &PriorityProfile,
) -> (u32, Vec<String>) {
    let mut score = 0;
    let mut reasons = Vec::new();

    if let Some(price) = profile.price {
        if (property.price - price).abs() <= price * profile.price_tolerance {
            score += profile.attribute_bonus;
            reasons.push(format!("Precio prioritario: {:.0}", property.price));
        }
    }
    if profile.rooms == Some(property.rooms) {
        score += profile.attribute_bonus;
        reasons.push(format!("Habitaciones prioritarias: {}", property.rooms));
    }
    if let Some(bathrooms) = profile.bathrooms {
        if (property.bathrooms - bathrooms).abs() <= profile.bathrooms_tolerance {
            score += profile.attribute_bonus;
            reasons.push(format!("Baños prioritarios: {}", property.bathrooms));
        }
    }
    if let Some(area) = profile.area {
        if (property.area_m2 - area).abs() <= area * profile.area_tolerance {
            score += profile.attribute_bonus;
            reasons.push(format!("Área prioritaria: {} m²", property.area_m2));
        }
    }
    if let Some(location) = &profile.location {
        if property.location.to_lowercase().contains(&location.to_lowercase()) {
            score += profile.location_bonus;
            reasons.push(format!("Ubicación prioritaria: {}", property.location));
        }
    }
    if let Some(date) = profile.published_on.as_deref().and_then(parse_published_on) {
        let published = property.published_on.as_deref().and_then(parse_published_on);
        if published == Some(date) {
            score += profile.attribute_bonus;
            reasons.push(format!("Fecha prioritaria: {}", date));
        }
    }

    let mentions = mentioned_priorities(query, numbers, profile).len() as u32;
    if mentions > 0 {
        score += mentions * profile.mention_bonus;
        reasons.push(format!("{} valores prioritarios mencionados", mentions));
    }

    (score, reasons)
}

/// A designated hero attribute of the [`PriorityProfile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityAttribute {
    Price,
    Rooms,
    Bathrooms,
    Area,
    Location,
    PublishedOn,
}

impl PriorityAttribute {
    pub fn label(&self) -> &'static str {
        match self {
            PriorityAttribute::Price => "precio específico",
            PriorityAttribute::Rooms => "habitaciones específicas",
            PriorityAttribute::Bathrooms => "baños específicos",
            PriorityAttribute::Area => "área específica",
            PriorityAttribute::Location => "ubicación específica",
            PriorityAttribute::PublishedOn => "fecha específica",
        }
    }
}

/// The designated values the query names explicitly, in profile order
pub fn mentioned_priorities(
    query: &str,
    numbers: &[f64],
    profile: &PriorityProfile,
) -> Vec<PriorityAttribute> {
    let query = query.to_lowercase();
    let mentions_number = |value: f64| numbers.iter().any(|n| (n - value).abs() < 1e-6);
    let mentions_count = |value: String, words: &[&str]| {
        words
            .iter()
            .any(|word| contains_term(&query, &format!("{} {}", value, word)))
    };

    let mut mentioned = Vec::new();
    if profile.price.is_some_and(mentions_number) {
        mentioned.push(PriorityAttribute::Price);
    }
    if profile
        .rooms
        .is_some_and(|rooms| mentions_count(rooms.to_string(), &["habitaciones", "habitación", "habitacion", "cuartos"]))
    {
        mentioned.push(PriorityAttribute::Rooms);
    }
    if profile
        .bathrooms
        .is_some_and(|bathrooms| mentions_count(bathrooms.to_string(), &["baños", "banos", "baño"]))
    {
        mentioned.push(PriorityAttribute::Bathrooms);
    }
    if profile
        .area
        .is_some_and(|area| mentions_number(area) && contains_any_term(&query, &["m2", "m²", "metros", "mts"]))
    {
        mentioned.push(PriorityAttribute::Area);
    }
    if profile
        .location
        .as_deref()
        .is_some_and(|location| contains_term(&query, &location.to_lowercase()))
    {
        mentioned.push(PriorityAttribute::Location);
    }
    if profile
        .published_on
        .as_deref()
        .is_some_and(|date| query.contains(date))
    {
        mentioned.push(PriorityAttribute::PublishedOn);
    }
    mentioned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Approx;

    fn create_test_property() -> PropertyRecord {
        PropertyRecord {
            id: 1,
            title: "Casa con jardín".to_string(),
            description: "Jardín amplio y cocina remodelada".to_string(),
            property_type: PropertyType::House,
            price: 290_000.0,
            rooms: 3,
            bathrooms: 2.0,
            area_m2: 180.0,
            location: "Zona 10".to_string(),
            published_on: Some("2025-10-20".to_string()),
            image_url: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 31).unwrap()
    }

    #[test]
    fn test_text_score_weights() {
        let property = create_test_property();
        let (score, reasons) = text_score(&property, "jardín");
        assert_eq!(score, TITLE_WORD + DESCRIPTION_WORD);
        assert_eq!(reasons.len(), 2);

        let (score, _) = text_score(&property, "zona");
        assert_eq!(score, LOCATION_WORD);
    }

    #[test]
    fn test_type_match_counted_once() {
        let property = create_test_property();
        let (score, _) = text_score(&property, "casas");
        // "casas" is not a substring of the title, only the type bonus applies
        assert_eq!(score, TYPE_MATCH);

        let (score, _) = text_score(&property, "departamento");
        assert_eq!(score, 0);
    }

    #[test]
    fn test_specific_criterion_outweighs_type_match() {
        let property = create_test_property();
        let base = Criteria::default();
        let (base_score, _) = criteria_score(&property, &base, today());

        let specific = [
            Criteria { rooms_exact: Some(3), ..Criteria::default() },
            Criteria { bathrooms_exact: Some(2.0), ..Criteria::default() },
            Criteria { bathrooms_min: Some(1.0), ..Criteria::default() },
            Criteria { area_min: Some(100.0), ..Criteria::default() },
            Criteria { area_exact: Some(Approx::new(180.0, 0.05)), ..Criteria::default() },
            Criteria { price_max: Some(300_000.0), ..Criteria::default() },
            Criteria { location_contains: Some("zona 10".to_string()), ..Criteria::default() },
            Criteria { recent_within_days: Some(30), ..Criteria::default() },
        ];

        for criteria in specific {
            let (score, reasons) = criteria_score(&property, &criteria, today());
            assert!(score - base_score > TYPE_MATCH, "{:?}", criteria);
            assert_eq!(reasons.len(), 1);
        }
    }

    #[test]
    fn test_unsatisfied_criteria_add_nothing() {
        let property = create_test_property();
        let criteria = Criteria {
            rooms_exact: Some(5),
            price_min: Some(1_000_000.0),
            recent_within_days: Some(3),
            ..Criteria::default()
        };
        assert_eq!(criteria_score(&property, &criteria, today()), (0, vec![]));
    }

    #[test]
    fn test_priority_boost_attributes() {
        let property = PropertyRecord {
            price: 480_000.0,
            rooms: 3,
            bathrooms: 2.5,
            area_m2: 215.0,
            location: "Residencial Eco Villa".to_string(),
            published_on: Some("2025-10-29".to_string()),
            ..create_test_property()
        };
        let profile = PriorityProfile::default();

        let (score, reasons) = priority_boost(&property, "", &[], &profile);
        assert_eq!(score, 5 * profile.attribute_bonus + profile.location_bonus);
        assert_eq!(reasons.len(), 6);

        let (score, _) = priority_boost(&property, "", &[], &PriorityProfile::disabled());
        assert_eq!(score, 0);
    }

    #[test]
    fn test_priority_mentions() {
        let profile = PriorityProfile::default();
        let query = "casa de 3 habitaciones en eco villa por 485000";
        let mentioned = mentioned_priorities(query, &[3.0, 485_000.0], &profile);
        assert_eq!(
            mentioned,
            vec![
                PriorityAttribute::Price,
                PriorityAttribute::Rooms,
                PriorityAttribute::Location
            ]
        );

        let query = "220 m2 con 2.5 baños";
        let mentioned = mentioned_priorities(query, &[220.0, 2.5], &profile);
        assert_eq!(mentioned, vec![PriorityAttribute::Bathrooms, PriorityAttribute::Area]);

        assert!(mentioned_priorities("algo bonito", &[], &profile).is_empty());
    }

    #[test]
    fn test_relevance_combines_all_parts() {
        let property = create_test_property();
        let criteria = Criteria {
            rooms_exact: Some(3),
            ..Criteria::default()
        };
        let profile = PriorityProfile::disabled();
        let (score, _) =
            calculate_relevance_score(&property, "casa 3 habitaciones", &[3.0], &criteria, &profile, today());
        assert_eq!(score, TITLE_WORD + TYPE_MATCH + ROOMS_EXACT);
    }
}
