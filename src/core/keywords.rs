use crate::models::PropertyType;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Numbers as written in a query: `300000`, `2.5`, `300,000`
static NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?").expect("valid number pattern")
});

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?|\w+").expect("valid token pattern")
});

/// Spanish filler words that never carry search intent
pub const STOP_WORDS: &[&str] = &[
    "el", "la", "lo", "de", "en", "y", "a", "o", "que", "con", "por", "para", "un", "una",
    "unos", "unas", "es", "se", "del", "los", "las", "al", "te", "le", "da", "su", "sus",
    "busco", "quiero", "necesito", "tengo", "hay", "está", "esta", "son", "tiene", "tienen",
    "me", "mi", "como", "donde",
];

/// A number found in a query, with its byte span
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberSpan {
    pub start: usize,
    pub end: usize,
    pub value: f64,
}

/// Locate every standalone number in `text`
///
/// Digits glued to a preceding letter (the `2` in `m2`) are not numbers,
/// except after the quetzal sign (`Q300,000`).
pub fn number_spans(text: &str) -> Vec<NumberSpan> {
    NUMBER_PATTERN
        .find_iter(text)
        .filter(|m| {
            !text[..m.start()]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphabetic() && !matches!(c, 'q' | 'Q'))
        })
        .filter_map(|m| {
            let value: f64 = m.as_str().replace(',', "").parse().ok()?;
            Some(NumberSpan {
                start: m.start(),
                end: m.end(),
                value,
            })
        })
        .collect()
}

/// Extract the numeric values of a query, in order of appearance
pub fn extract_numbers(query: &str) -> Vec<f64> {
    number_spans(query).into_iter().map(|n| n.value).collect()
}

/// Byte offsets of every occurrence of `term` that stands as a whole word
///
/// Boundaries are only enforced on the alphanumeric edges of `term`, so
/// symbols such as `$` match anywhere.
pub fn term_positions<'a>(text: &'a str, term: &'a str) -> impl Iterator<Item = usize> + 'a {
    boundary_positions(text, term, false)
}

/// Like [`term_positions`], optionally accepting a digit right before `term`
///
/// With `after_digit` set, `m2` is found in `200m2`.
pub fn boundary_positions<'a>(
    text: &'a str,
    term: &'a str,
    after_digit: bool,
) -> impl Iterator<Item = usize> + 'a {
    let starts_alnum = term.chars().next().is_some_and(|c| c.is_alphanumeric());
    let ends_alnum = term.chars().next_back().is_some_and(|c| c.is_alphanumeric());

    text.match_indices(term).filter_map(move |(idx, _)| {
        let before_ok = !starts_alnum
            || !text[..idx]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() && !(after_digit && c.is_ascii_digit()));
        let after_ok = !ends_alnum
            || !text[idx + term.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric());
        (before_ok && after_ok).then_some(idx)
    })
}

#[inline]
pub fn contains_term(text: &str, term: &str) -> bool {
    term_positions(text, term).next().is_some()
}

#[inline]
pub fn contains_any_term(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| contains_term(text, term))
}

/// Lowercased words longer than two characters, in query order
///
/// This is the word list used for substring scoring and the plain-text
/// fallback; unlike [`extract_keywords`] it keeps duplicates and does not
/// drop stop words.
pub fn significant_words(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Significant words with stop words removed
pub fn search_terms(query: &str) -> Vec<String> {
    significant_words(query)
        .into_iter()
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Extract the deduplicated, ordered set of significant terms of a query
///
/// Property-type words are moved to the front; numbers are kept verbatim
/// regardless of length.
pub fn extract_keywords(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();

    let mut type_terms = Vec::new();
    let mut other_terms = Vec::new();

    for token in TOKEN_PATTERN.find_iter(&lower).map(|m| m.as_str()) {
        let is_number = token.chars().next().is_some_and(|c| c.is_ascii_digit())
            && token.replace(',', "").parse::<f64>().is_ok();

        if is_number {
            other_terms.push(token);
            continue;
        }

        if token.chars().count() <= 2 || STOP_WORDS.contains(&token) {
            continue;
        }

        if PropertyType::from_word(token).is_some() {
            type_terms.push(token);
        } else {
            other_terms.push(token);
        }
    }

    let mut seen = HashSet::new();
    type_terms
        .into_iter()
        .chain(other_terms)
        .filter(|term| seen.insert(*term))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_numbers() {
        assert_eq!(extract_numbers("casa de 3 habitaciones y 2.5 baños"), vec![3.0, 2.5]);
        assert_eq!(extract_numbers("menos de 300,000 quetzales"), vec![300_000.0]);
        assert_eq!(extract_numbers("200 m2 en zona 10"), vec![200.0, 10.0]);
        assert_eq!(extract_numbers("Q450,000"), vec![450_000.0]);
        assert!(extract_numbers("algo bonito").is_empty());
    }

    #[test]
    fn test_term_positions_respect_word_boundaries() {
        assert!(contains_term("zona 10, ciudad", "zona 10"));
        assert!(!contains_term("zona 10, ciudad", "zona 1"));
        assert!(!contains_term("demasiado caro", "mas"));
        assert!(contains_term("precio $ 300", "$"));
        assert_eq!(term_positions("casa y casa", "casa").count(), 2);
    }

    #[test]
    fn test_units_glued_to_digits() {
        assert!(!contains_term("terreno de 200m2", "m2"));
        assert_eq!(boundary_positions("terreno de 200m2", "m2", true).collect::<Vec<_>>(), vec![14]);
        assert_eq!(boundary_positions("200m²", "m²", true).count(), 1);
        assert_eq!(boundary_positions("200 zm2", "m2", true).count(), 0);
    }

    #[test]
    fn test_keywords_promote_property_types() {
        let keywords = extract_keywords("Busco 3 habitaciones en zona 10, casas bonitas");
        assert_eq!(keywords[0], "casas");
        assert!(keywords.contains(&"3".to_string()));
        assert!(keywords.contains(&"10".to_string()));
        assert!(keywords.contains(&"habitaciones".to_string()));
        assert!(!keywords.contains(&"busco".to_string()));
        assert!(!keywords.contains(&"en".to_string()));
    }

    #[test]
    fn test_keywords_keep_thousands_verbatim() {
        assert_eq!(extract_keywords("casa de 300,000"), vec!["casa", "300,000"]);
        assert_eq!(
            extract_keywords("Casa de 1,250,000.50 o 2.5"),
            vec!["casa", "1,250,000.50", "2.5"]
        );
    }

    #[test]
    fn test_keywords_deduplicate_in_order() {
        let keywords = extract_keywords("jardín grande, jardín amplio");
        assert_eq!(keywords, vec!["jardín", "grande", "amplio"]);
    }

    #[test]
    fn test_keywords_empty_query() {
        assert!(extract_keywords("").is_empty());
        assert!(extract_keywords("  ").is_empty());
    }

    #[test]
    fn test_search_terms_drop_stop_words() {
        assert_eq!(search_terms("Busco casa con jardín"), vec!["casa", "jardín"]);
    }

    #[test]
    fn test_significant_words() {
        assert_eq!(
            significant_words("Casa en zona 10, con jardín"),
            vec!["casa", "zona", "con", "jardín"]
        );
    }
}
