use crate::core::keywords::contains_any_term;
use crate::core::scoring::PriorityAttribute;
use crate::models::{ActiveStrategy, Criteria, SearchStrategy};

pub const NO_DATA_ANALYSIS: &str = "No hay propiedades disponibles en la base de datos.";

const AMENITY_WORDS: &[&str] = &["jardín", "jardin", "piscina", "garage", "garaje", "parqueo", "terraza"];

fn strategy_description(strategy: &ActiveStrategy) -> &'static str {
    match (strategy.stage, strategy.boosted) {
        (SearchStrategy::ExactFilters, false) => "mediante filtros exactos de características específicas",
        (SearchStrategy::ExactFilters, true) => {
            "con filtros exactos y priorización de características relevantes"
        }
        (SearchStrategy::AiSemantic, false) => "usando búsqueda semántica con inteligencia artificial",
        (SearchStrategy::AiSemantic, true) => {
            "combinando IA semántica con priorización de características específicas"
        }
        (SearchStrategy::ExactPlusSemantic, false) => {
            "combinando filtros exactos con sugerencias de búsqueda semántica"
        }
        (SearchStrategy::ExactPlusSemantic, true) => {
            "combinando filtros exactos, búsqueda semántica y priorización inteligente"
        }
        (SearchStrategy::TextFilter, false) => "mediante filtrado de texto simple",
        (SearchStrategy::TextFilter, true) => "con filtrado de texto y priorización inteligente",
        (SearchStrategy::None, _) => "usando estrategia de búsqueda avanzada",
    }
}

/// Characteristics of the query worth echoing back to the user
pub fn detect_features(query: &str, criteria: &Criteria, mentioned: &[PriorityAttribute]) -> Vec<String> {
    let query = query.to_lowercase();
    let mut features = Vec::new();

    if let Some(rooms) = criteria.rooms_exact {
        features.push(format!("{} habitaciones", rooms));
    }
    if let Some(location) = &criteria.location_contains {
        features.push(location.clone());
    }
    if criteria.has_price() || contains_any_term(&query, &["precio", "$"]) {
        features.push("precio específico".to_string());
    }
    if contains_any_term(&query, AMENITY_WORDS) {
        features.push("características especiales".to_string());
    }

    for attribute in mentioned {
        let already_covered = match attribute {
            PriorityAttribute::Price => criteria.has_price(),
            PriorityAttribute::Rooms => criteria.rooms_exact.is_some(),
            PriorityAttribute::Location => criteria.location_contains.is_some(),
            _ => false,
        };
        let label = attribute.label().to_string();
        if !already_covered && !features.contains(&label) {
            features.push(label);
        }
    }

    features
}

/// Build the natural-language summary of a search
pub fn generate_analysis(query: &str, count: usize, strategy: ActiveStrategy, features: &[String]) -> String {
    if count == 0 {
        return format!(
            "No se encontraron propiedades que coincidan con '{}'. \
             Intenta con criterios más amplios o diferentes palabras clave.",
            query
        );
    }

    let found = if count == 1 {
        "Se encontró 1 propiedad".to_string()
    } else {
        format!("Se encontraron {} propiedades", count)
    };

    let mut parts = vec![format!("{} {}", found, strategy_description(&strategy))];
    if !features.is_empty() {
        parts.push(format!("Priorizando: {}", features.join(", ")));
    }

    let mut recommendations = Vec::new();
    if count > 8 {
        recommendations.push("Considera refinar tu búsqueda con criterios más específicos");
    } else if count < 3 {
        recommendations.push("Intenta ampliar los criterios de búsqueda para más opciones");
    }
    if strategy.boosted {
        recommendations.push("Los resultados están ordenados por relevancia según tus criterios");
    }

    let mut analysis = format!("{}.", parts.join(". "));
    if !recommendations.is_empty() {
        analysis.push(' ');
        analysis.push_str(&recommendations.join(". "));
        analysis.push('.');
    }
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_results_message() {
        let strategy = ActiveStrategy::new(SearchStrategy::TextFilter, false);
        let analysis = generate_analysis("castillo", 0, strategy, &[]);
        assert_eq!(
            analysis,
            "No se encontraron propiedades que coincidan con 'castillo'. \
             Intenta con criterios más amplios o diferentes palabras clave."
        );
    }

    #[test]
    fn test_single_result_analysis() {
        let strategy = ActiveStrategy::new(SearchStrategy::ExactFilters, false);
        let features = vec!["3 habitaciones".to_string(), "zona 10".to_string()];
        let analysis = generate_analysis("casa", 1, strategy, &features);
        assert_eq!(
            analysis,
            "Se encontró 1 propiedad mediante filtros exactos de características específicas. \
             Priorizando: 3 habitaciones, zona 10. \
             Intenta ampliar los criterios de búsqueda para más opciones."
        );
    }

    #[test]
    fn test_boosted_many_results() {
        let strategy = ActiveStrategy::new(SearchStrategy::AiSemantic, true);
        let analysis = generate_analysis("casa", 10, strategy, &[]);
        assert!(analysis.starts_with(
            "Se encontraron 10 propiedades combinando IA semántica con priorización"
        ));
        assert!(analysis.contains("refinar"));
        assert!(analysis.ends_with("ordenados por relevancia según tus criterios."));
    }

    #[test]
    fn test_detect_features() {
        let criteria = Criteria {
            rooms_exact: Some(3),
            location_contains: Some("zona 10".to_string()),
            price_max: Some(300_000.0),
            ..Criteria::default()
        };
        let mentioned = [PriorityAttribute::Rooms, PriorityAttribute::Area];
        let features = detect_features("Casa con jardín", &criteria, &mentioned);
        assert_eq!(
            features,
            vec![
                "3 habitaciones",
                "zona 10",
                "precio específico",
                "características especiales",
                "área específica"
            ]
        );
    }
}
