use crate::core::keywords::{contains_term, search_terms};
use crate::models::{Criteria, PropertyRecord};
use chrono::{Duration, Local, NaiveDate};

/// Check if a property satisfies every present criterion, as of today
///
/// This is the strict stage of the search cascade.
#[inline]
pub fn matches_criteria(property: &PropertyRecord, criteria: &Criteria) -> bool {
    matches_criteria_on(property, criteria, Local::now().date_naive())
}

/// Check if a property satisfies every present criterion
///
/// All criteria are combined with AND; the first failing one short-circuits.
/// Recency is evaluated against `today`.
pub fn matches_criteria_on(property: &PropertyRecord, criteria: &Criteria, today: NaiveDate) -> bool {
    // Check property type
    if let Some(property_type) = criteria.property_type {
        if property.property_type != property_type {
            return false;
        }
    }

    // Check price
    if let Some(exact) = criteria.price_exact {
        if !exact.contains(property.price) {
            return false;
        }
    }
    if let Some(min) = criteria.price_min {
        if property.price < min {
            return false;
        }
    }
    if let Some(max) = criteria.price_max {
        if property.price > max {
            return false;
        }
    }
    if let Some(range) = criteria.price_range {
        if !range.contains(property.price) {
            return false;
        }
    }

    // Check rooms and bathrooms
    if let Some(rooms) = criteria.rooms_exact {
        if property.rooms != rooms {
            return false;
        }
    }
    if let Some(bathrooms) = criteria.bathrooms_exact {
        if !bathrooms_match(property.bathrooms, bathrooms) {
            return false;
        }
    }
    if let Some(min) = criteria.bathrooms_min {
        if property.bathrooms < min {
            return false;
        }
    }

    // Check area
    if let Some(exact) = criteria.area_exact {
        if !exact.contains(property.area_m2) {
            return false;
        }
    }
    if let Some(min) = criteria.area_min {
        if property.area_m2 < min {
            return false;
        }
    }
    if let Some(max) = criteria.area_max {
        if property.area_m2 > max {
            return false;
        }
    }

    // Check location
    if let Some(wanted) = &criteria.location_contains {
        if !location_matches(&property.location, wanted) {
            return false;
        }
    }

    // Check recency; missing or unreadable dates never exclude
    if let Some(days) = criteria.recent_within_days {
        let published = property.published_on.as_deref().and_then(parse_published_on);
        if let Some(published) = published {
            if published < today - Duration::days(i64::from(days)) {
                return false;
            }
        }
    }

    true
}

/// Bathroom counts match when they differ by less than half a bathroom
#[inline]
pub fn bathrooms_match(actual: f64, wanted: f64) -> bool {
    (actual - wanted).abs() < 0.5
}

/// Check if a listing's location satisfies a location phrase
///
/// Whole-phrase match first. Otherwise every numeric word of the phrase
/// (a zone number) must be present and at least half of the other words.
pub fn location_matches(location: &str, wanted: &str) -> bool {
    let location = location.to_lowercase();
    let wanted = wanted.trim().to_lowercase();

    if wanted.is_empty() || contains_term(&location, &wanted) {
        return true;
    }

    let (numeric, words): (Vec<&str>, Vec<&str>) = wanted
        .split_whitespace()
        .partition(|w| w.chars().all(|c| c.is_ascii_digit()));

    if !numeric.iter().all(|n| contains_term(&location, n)) {
        return false;
    }

    let present = words.iter().filter(|w| contains_term(&location, w)).count();
    present * 2 >= words.len()
}

/// Parse a publication date written as `YYYY-MM-DD` (optionally followed
/// by a time) or `DD/MM/YYYY`
pub fn parse_published_on(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    raw.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
        .or_else(|| NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok())
}

/// Count how many words of the query appear in a listing's text fields
pub fn text_match_count(property: &PropertyRecord, words: &[String]) -> usize {
    let haystack = format!(
        "{} {} {} {}",
        property.title,
        property.description,
        property.property_type,
        property.location
    )
    .to_lowercase();

    words.iter().filter(|w| haystack.contains(w.as_str())).count()
}

/// Plain substring fallback: keep listings mentioning any query word,
/// most mentions first (stable among ties)
pub fn text_filter(properties: &[PropertyRecord], query: &str) -> Vec<PropertyRecord> {
    let words = search_terms(query);

    if words.is_empty() {
        return Vec::new();
    }

    let mut counted: Vec<(usize, &PropertyRecord)> = properties
        .iter()
        .map(|p| (text_match_count(p, &words), p))
        .filter(|(count, _)| *count > 0)
        .collect();

    counted.sort_by(|a, b| b.0.cmp(&a.0));
    counted.into_iter().map(|(_, p)| p.clone()).collect()
}
