use crate::core::keywords::{
    boundary_positions, contains_any_term, contains_term, number_spans, term_positions, NumberSpan,
};
use crate::models::{Approx, Criteria, PriceRange, PropertyType};
use once_cell::sync::Lazy;
use regex::{Captures, Match, Regex};

const NUM: &str = r"(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)";
const MULT: &str = r"(mill[oó]n(?:es)?|miles|mil|k|m)";
const CONNECTORS: &str = r"(?:\s+(?:de|del|que|a|en|por|un|una))*";
const CURRENCY: &str = r"(?:\$|q)?";

static TYPE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(casa|departamento|apartamento|terreno|lote|local|oficina)(?:e?s)?\b")
        .expect("valid type pattern")
});

static RANGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\bentre\s+{CURRENCY}\s*{NUM}(?:\s*{MULT}\b)?\s+(?:y|a)\s+{CURRENCY}\s*{NUM}(?:\s*{MULT}\b)?"
    ))
    .expect("valid range pattern")
});

static CEILING_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(menos|hasta|m[aá]x(?:im[oa])?|tope){CONNECTORS}\s*{CURRENCY}\s*{NUM}(?:\s*{MULT}\b)?"
    ))
    .expect("valid ceiling pattern")
});

static FLOOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(al\s+menos|m[aá]s|desde|m[ií]n(?:im[oa])?|mayor){CONNECTORS}\s*{CURRENCY}\s*{NUM}(?:\s*{MULT}\b)?"
    ))
    .expect("valid floor pattern")
});

static MILLIONS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"{NUM}\s*mill[oó]n(?:es)?\b")).expect("valid millions pattern")
});

static ZONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bzona\s*(\d{1,2})\b").expect("valid zone pattern"));

/// A number followed by one of these is a count or a surface, never money
static NON_PRICE_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:m2|m²|mts?2?|metros?|habitaci|cuartos?|dormitorios?|rec[aá]maras?|ba[ñn]os?)")
        .expect("valid unit pattern")
});

static TIME_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(d[ií]as?|semanas?|mes(?:es)?)\b").expect("valid time unit pattern")
});

const ROOM_WORDS: &[&str] = &[
    "habitacion", "habitación", "habitaciones", "cuarto", "cuartos", "dormitorio",
    "dormitorios", "recamara", "recámara", "recamaras", "recámaras", "alcoba", "alcobas", "hab",
];
const BATHROOM_WORDS: &[&str] = &["baño", "baños", "bano", "banos", "sanitario", "sanitarios"];
const AREA_WORDS: &[&str] = &[
    "metro", "metros", "m2", "m²", "mts", "área", "area", "superficie",
];
const PRICE_WORDS: &[&str] = &[
    "precio", "cuesta", "cueste", "vale", "$", "quetzal", "quetzales", "dolar", "dólar",
    "dolares", "dólares", "usd", "presupuesto", "costo",
];

const UPPER_CUES: &[&str] = &["menos", "hasta", "máximo", "maximo", "máx", "max", "tope"];
const LOWER_CUES: &[&str] = &[
    "más", "mas", "desde", "mínimo", "minimo", "mín", "min", "mayor", "al mínimo",
];
const RECENCY_CUES: &[&str] = &[
    "último", "últimos", "última", "últimas", "ultimo", "ultimos", "ultima", "ultimas",
    "reciente", "recientes", "recientemente", "nuevo", "nuevos", "nueva", "nuevas",
];

/// Localities recognised by name, checked after `zona N`
pub const KNOWN_LOCALITIES: &[&str] = &[
    "eco villa", "antigua", "mixco", "villa nueva", "san lucas", "santa catarina",
    "amatitlán", "amatitlan", "chinautla", "fraijanes", "cayalá", "cayala", "vista hermosa",
    "colina del valle", "zona residencial", "suburbia", "valle campestre", "distrito artístico",
];

const CONTEXT_WINDOW: usize = 30;
const FALLBACK_WINDOW: usize = 20;
const MILLIONS_LOOKBACK: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Upper,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Rooms,
    Bathrooms,
    Area,
    Price,
}

/// Working state of one extraction: the text, its numbers and which of
/// them earlier rules already claimed
struct Extraction<'a> {
    text: &'a str,
    spans: Vec<NumberSpan>,
    consumed: Vec<bool>,
    criteria: Criteria,
}

impl<'a> Extraction<'a> {
    fn new(text: &'a str) -> Self {
        let spans = number_spans(text);
        let consumed = vec![false; spans.len()];
        Self {
            text,
            spans,
            consumed,
            criteria: Criteria::default(),
        }
    }

    /// Mark every number that starts inside `start..end` as claimed
    fn consume_within(&mut self, start: usize, end: usize) {
        for (span, used) in self.spans.iter().zip(self.consumed.iter_mut()) {
            if span.start >= start && span.start < end {
                *used = true;
            }
        }
    }

    fn is_free(&self, start: usize) -> bool {
        self.spans
            .iter()
            .zip(&self.consumed)
            .any(|(span, used)| span.start == start && !used)
    }

    fn free_index_of(&self, value: f64) -> Option<usize> {
        self.spans
            .iter()
            .zip(&self.consumed)
            .position(|(span, used)| !used && span.value == value)
    }

    fn detect_type(&mut self) {
        if let Some(caps) = TYPE_PATTERN.captures(self.text) {
            self.criteria.property_type = caps.get(1).and_then(|m| PropertyType::from_word(m.as_str()));
        }
    }

    fn reserve_zone_numbers(&mut self) {
        let zones: Vec<(usize, usize)> = ZONE_PATTERN
            .captures_iter(self.text)
            .filter_map(|caps| caps.get(1).map(|m| (m.start(), m.end())))
            .collect();
        for (start, end) in zones {
            self.consume_within(start, end);
        }
    }

    fn price_range(&mut self) -> bool {
        for caps in RANGE_PATTERN.captures_iter(self.text) {
            let (Some(first), Some(second)) = (parse_group(&caps, 1), parse_group(&caps, 3)) else {
                continue;
            };
            if is_metre_unit(self.text, caps.get(2)) || is_metre_unit(self.text, caps.get(4)) {
                continue;
            }
            let first_mult = caps.get(2).map(|m| m.as_str());
            let second_mult = caps.get(4).map(|m| m.as_str());

            let second_value = second * multiplier(second_mult);
            let first_value = first * multiplier(first_mult.or(second_mult));

            if first_value < 1000.0 || second_value < 1000.0 {
                continue;
            }

            self.criteria.price_range = Some(PriceRange::between(first_value, second_value));
            if let Some(whole) = caps.get(0) {
                self.consume_within(whole.start(), whole.end());
            }
            return true;
        }
        false
    }

    fn price_bound(&mut self, bound: Bound) {
        let pattern = match bound {
            Bound::Upper => &*CEILING_PATTERN,
            Bound::Lower => &*FLOOR_PATTERN,
        };

        for caps in pattern.captures_iter(self.text) {
            let (Some(whole), Some(number)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            // "al menos" is a floor, not a ceiling
            if bound == Bound::Upper && self.text[..whole.start()].ends_with("al ") {
                continue;
            }
            if !self.is_free(number.start()) || is_metre_unit(self.text, caps.get(3)) {
                continue;
            }
            if caps.get(3).is_none() && NON_PRICE_UNIT.is_match(&self.text[whole.end()..]) {
                continue;
            }
            let Some(value) = parse_group(&caps, 2) else {
                continue;
            };
            let value = value * multiplier(caps.get(3).map(|m| m.as_str()));
            if value < 1000.0 {
                continue;
            }

            match bound {
                Bound::Upper => self.criteria.price_max = Some(value),
                Bound::Lower => self.criteria.price_min = Some(value),
            }
            self.consume_within(whole.start(), whole.end());
            return;
        }
    }

    fn bare_millions(&mut self) {
        let hits: Vec<(usize, usize, f64)> = MILLIONS_PATTERN
            .captures_iter(self.text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let value = parse_group(&caps, 1)?;
                Some((whole.start(), whole.end(), value * 1_000_000.0))
            })
            .collect();

        for (start, end, value) in hits {
            if !self.is_free(start) {
                continue;
            }
            let before = window_before(self.text, start, MILLIONS_LOOKBACK);
            match bound_cue(before) {
                Some(Bound::Upper) if self.criteria.price_max.is_none() => {
                    self.criteria.price_max = Some(value)
                }
                Some(Bound::Lower) if self.criteria.price_min.is_none() => {
                    self.criteria.price_min = Some(value)
                }
                None if !self.criteria.has_price() => {
                    self.criteria.price_exact = Some(Approx::new(value, 0.10))
                }
                _ => continue,
            }
            self.consume_within(start, end);
        }
    }

    /// Classify each remaining number by the closest dimension keyword around it
    fn numeric_context(&mut self, numbers: &[f64]) {
        for &value in numbers {
            let Some(idx) = self.free_index_of(value) else {
                continue;
            };
            let span = self.spans[idx];
            if TIME_UNIT.is_match(&self.text[span.end..]) {
                continue;
            }

            let (window_start, window) = window_around(self.text, span.start, span.end, CONTEXT_WINDOW);
            let before = &self.text[window_start..span.start];
            let after = &self.text[span.end..window_start + window.len()];

            let mut candidates: Vec<(usize, Dimension)> = [
                (Dimension::Rooms, ROOM_WORDS),
                (Dimension::Bathrooms, BATHROOM_WORDS),
                (Dimension::Area, AREA_WORDS),
                (Dimension::Price, PRICE_WORDS),
            ]
            .into_iter()
            .filter_map(|(dimension, words)| {
                // units may be glued to their number, as in "200m2"
                let glued = dimension == Dimension::Area;
                nearest_keyword(window, window_start, &span, words, glued).map(|d| (d, dimension))
            })
            .collect();
            candidates.sort_by_key(|(distance, _)| *distance);

            for (_, dimension) in candidates {
                if self.assign(dimension, value, before, after) {
                    self.consumed[idx] = true;
                    break;
                }
            }
        }
    }

    /// Store `value` under `dimension` when it is plausible and unset
    fn assign(&mut self, dimension: Dimension, value: f64, before: &str, after: &str) -> bool {
        let c = &mut self.criteria;
        match dimension {
            Dimension::Rooms => {
                if c.rooms_exact.is_some() || value.fract() != 0.0 || !(1.0..=10.0).contains(&value) {
                    return false;
                }
                c.rooms_exact = Some(value as u32);
            }
            Dimension::Bathrooms => {
                if c.bathrooms_exact.is_some()
                    || c.bathrooms_min.is_some()
                    || !(0.5..=10.0).contains(&value)
                {
                    return false;
                }
                let at_least = bound_cue(before) == Some(Bound::Lower)
                    || contains_any_term(after, &["o más", "o mas"]);
                if at_least {
                    c.bathrooms_min = Some(value);
                } else {
                    c.bathrooms_exact = Some(value);
                }
            }
            Dimension::Area => {
                if c.area_exact.is_some()
                    || c.area_min.is_some()
                    || c.area_max.is_some()
                    || !(20.0..=2000.0).contains(&value)
                {
                    return false;
                }
                match bound_cue(before) {
                    Some(Bound::Upper) => c.area_max = Some(value),
                    Some(Bound::Lower) => c.area_min = Some(value),
                    None => c.area_exact = Some(Approx::new(value, 0.05)),
                }
            }
            Dimension::Price => {
                if c.has_price() || value <= 1000.0 {
                    return false;
                }
                match bound_cue(before) {
                    Some(Bound::Upper) => c.price_max = Some(value),
                    Some(Bound::Lower) => c.price_min = Some(value),
                    None => c.price_exact = Some(Approx::new(value, 0.05)),
                }
            }
        }
        true
    }

    /// A large number nothing else claimed is read as a price
    fn unclaimed_price(&mut self) {
        if self.criteria.has_price() {
            return;
        }
        let Some(idx) = self
            .spans
            .iter()
            .zip(&self.consumed)
            .position(|(span, used)| !used && span.value >= 50_000.0)
        else {
            return;
        };

        let span = self.spans[idx];
        let (_, context) = window_around(self.text, span.start, span.end, FALLBACK_WINDOW);
        let c = &mut self.criteria;
        if contains_any_term(context, UPPER_CUES) {
            c.price_max = Some(span.value);
        } else if contains_any_term(context, LOWER_CUES) {
            c.price_min = Some(span.value);
        } else {
            c.price_exact = Some(Approx::new(span.value, 0.10));
        }
        self.consumed[idx] = true;
    }

    fn location(&mut self) {
        let text = self.text;
        let zone = ZONE_PATTERN.captures_iter(text).find_map(|caps| {
            let n: u32 = caps.get(1)?.as_str().parse().ok()?;
            (1..=25).contains(&n).then(|| format!("zona {}", n))
        });

        self.criteria.location_contains = zone.or_else(|| {
            KNOWN_LOCALITIES
                .iter()
                .find(|name| contains_term(text, name))
                .map(|name| name.to_string())
        });
    }

    fn recency(&mut self) {
        let cued = contains_any_term(self.text, RECENCY_CUES) || self.text.contains("publicad");
        if !cued {
            return;
        }

        let free: Vec<NumberSpan> = self
            .spans
            .iter()
            .zip(&self.consumed)
            .filter(|(_, used)| !**used)
            .map(|(span, _)| *span)
            .collect();

        let with_unit = free.iter().find_map(|span| {
            let unit = TIME_UNIT.captures(&self.text[span.end..])?.get(1)?.as_str();
            let factor = if unit.starts_with("mes") {
                30.0
            } else if unit.starts_with("semana") {
                7.0
            } else {
                1.0
            };
            Some(span.value * factor)
        });

        let days = with_unit.or_else(|| free.first().map(|span| span.value));
        if let Some(days) = days.filter(|d| d.fract() == 0.0 && (1.0..=365.0).contains(d)) {
            self.criteria.recent_within_days = Some(days as u32);
        }
    }
}

/// Parse a free-text query into structured search criteria
///
/// Rules run in a fixed priority order and a number claimed by one rule is
/// never reconsidered by a later one:
/// 1. property type
/// 2. `entre X y Y` price range
/// 3. price ceiling and 4. price floor
/// 5. bare `X millones`
/// 6. keyword context around each remaining number
/// 7. a large unclaimed number as price
/// 8. zone or named locality
/// 9. recency window
///
/// `numbers` lists the values the context scan may classify, normally the
/// output of [`extract_numbers`](crate::core::keywords::extract_numbers).
/// Never fails; an unrecognised query yields empty criteria.
pub fn extract_filters(query: &str, numbers: &[f64]) -> Criteria {
    let text = query.to_lowercase();
    let mut extraction = Extraction::new(&text);

    extraction.detect_type();
    extraction.reserve_zone_numbers();

    if !extraction.price_range() {
        extraction.price_bound(Bound::Upper);
        extraction.price_bound(Bound::Lower);
    }
    extraction.bare_millions();
    extraction.numeric_context(numbers);
    extraction.unclaimed_price();
    extraction.location();
    extraction.recency();

    extraction.criteria
}

fn parse_group(caps: &Captures<'_>, group: usize) -> Option<f64> {
    caps.get(group)?.as_str().replace(',', "").parse().ok()
}

fn multiplier(word: Option<&str>) -> f64 {
    match word {
        None => 1.0,
        Some(w) if w.starts_with("mill") || w == "m" => 1_000_000.0,
        Some(_) => 1_000.0,
    }
}

/// The bound expressed by the cue word closest to the end of `before`
fn bound_cue(before: &str) -> Option<Bound> {
    let before = before.replace("al menos", "al mínimo");
    let last = |cues: &[&str]| {
        cues.iter()
            .filter_map(|cue| term_positions(&before, cue).last())
            .max()
    };

    match (last(UPPER_CUES), last(LOWER_CUES)) {
        (Some(u), Some(l)) => Some(if u > l { Bound::Upper } else { Bound::Lower }),
        (Some(_), None) => Some(Bound::Upper),
        (None, Some(_)) => Some(Bound::Lower),
        (None, None) => None,
    }
}

/// `m` followed by `²` or `2` is square metres, not millions
fn is_metre_unit(text: &str, multiplier: Option<Match<'_>>) -> bool {
    multiplier.is_some_and(|m| m.as_str() == "m" && NON_PRICE_UNIT.is_match(&text[m.start()..]))
}

/// Distance in bytes from the number to the closest occurrence of any word
fn nearest_keyword(
    window: &str,
    offset: usize,
    span: &NumberSpan,
    words: &[&str],
    after_digit: bool,
) -> Option<usize> {
    words
        .iter()
        .flat_map(|word| {
            boundary_positions(window, word, after_digit).map(move |pos| {
                let start = offset + pos;
                let end = start + word.len();
                if start >= span.end {
                    start - span.end
                } else {
                    span.start.saturating_sub(end)
                }
            })
        })
        .min()
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

fn window_before(text: &str, end: usize, len: usize) -> &str {
    let start = ceil_char_boundary(text, end.saturating_sub(len));
    &text[start..end]
}

/// `radius` bytes either side of `start..end`, snapped to char boundaries
fn window_around(text: &str, start: usize, end: usize, radius: usize) -> (usize, &str) {
    let from = ceil_char_boundary(text, start.saturating_sub(radius));
    let to = floor_char_boundary(text, end + radius);
    (from, &text[from..to])
}
