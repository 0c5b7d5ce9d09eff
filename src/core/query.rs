use crate::core::extractor::extract_filters;
use crate::core::keywords::{extract_keywords, extract_numbers};
use crate::models::Criteria;

/// Everything derived from the raw query text, computed once per search
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub raw: String,
    pub lower: String,
    pub numbers: Vec<f64>,
    pub criteria: Criteria,
    pub keywords: Vec<String>,
}

impl ParsedQuery {
    pub fn parse(query: &str) -> Self {
        let raw = query.trim().to_string();
        let lower = raw.to_lowercase();
        let numbers = extract_numbers(&lower);
        let criteria = extract_filters(&lower, &numbers);
        let keywords = extract_keywords(&lower);

        Self {
            raw,
            lower,
            numbers,
            criteria,
            keywords,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PropertyType;

    #[test]
    fn test_parse_query() {
        let parsed = ParsedQuery::parse("  Casas de 3 habitaciones en Zona 10 ");
        assert_eq!(parsed.raw, "Casas de 3 habitaciones en Zona 10");
        assert_eq!(parsed.lower, "casas de 3 habitaciones en zona 10");
        assert_eq!(parsed.numbers, vec![3.0, 10.0]);
        assert_eq!(parsed.criteria.property_type, Some(PropertyType::House));
        assert_eq!(parsed.criteria.rooms_exact, Some(3));
        assert_eq!(parsed.keywords[0], "casas");
    }
}
