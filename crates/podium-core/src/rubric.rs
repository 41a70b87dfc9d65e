//! The fixed judging rubric: 12 criteria in three display groups, each
//! scored 0..=10 by a judge. The criterion names double as sheet column
//! headers, so they are spelled exactly as the competition sheet spells
//! them.

use serde_json::Value;

use crate::model::ScoreMap;

/// Logo evaluation group (max 50).
pub const LOGO: &[&str] = &[
    "Reflects Creativity and Innovation",
    "Demonstrates clear thought",
    "Clearly representation of the Concept",
    "Visually appealing",
    "Distinctive and Memorable",
];

/// Theme music evaluation group (max 30).
pub const THEME_MUSIC: &[&str] = &[
    "Relevance to Theme",
    "Audience Appeal",
    "Creativity",
];

/// Presentation evaluation group (max 40).
pub const PRESENTATION: &[&str] = &[
    "Overall Creativity",
    "Integration of Logo and Music",
    "How clearly the content is presented",
    "How synced the presentation with Logo and Theme Music",
];

/// Upper bound for a single criterion score.
pub const MAX_SCORE: u8 = 10;

/// All criteria in sheet column order.
pub fn criteria() -> impl Iterator<Item = &'static str> {
    LOGO.iter()
        .chain(THEME_MUSIC.iter())
        .chain(PRESENTATION.iter())
        .copied()
}

/// Number of criteria in the rubric.
pub fn criterion_count() -> usize {
    LOGO.len() + THEME_MUSIC.len() + PRESENTATION.len()
}

/// Normalize a raw JSON score map into the canonical rubric shape.
///
/// Every rubric criterion is present in the result; unknown keys are
/// dropped, missing or non-numeric values read as 0, and everything is
/// clamped to 0..=MAX_SCORE. Callers always get a complete map back.
pub fn normalize_json(raw: &serde_json::Map<String, Value>) -> ScoreMap {
    criteria()
        .map(|name| {
            let score = raw.get(name).map_or(0, json_score);
            (name.to_string(), score)
        })
        .collect()
}

/// Normalize a map of raw cell strings (as read from a sheet row).
pub fn normalize_cells<'a, F>(cell: F) -> ScoreMap
where
    F: Fn(&str) -> Option<&'a str>,
{
    criteria()
        .map(|name| {
            let score = cell(name).map_or(0, parse_score);
            (name.to_string(), score)
        })
        .collect()
}

fn json_score(v: &Value) -> u8 {
    let n = match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    clamp(n)
}

/// Parse a raw cell into a score, treating anything unparseable as 0.
pub fn parse_score(cell: &str) -> u8 {
    clamp(cell.trim().parse::<f64>().unwrap_or(0.0))
}

fn clamp(n: f64) -> u8 {
    if !n.is_finite() || n <= 0.0 {
        0
    } else if n >= f64::from(MAX_SCORE) {
        MAX_SCORE
    } else {
        n as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rubric_has_twelve_criteria() {
        assert_eq!(criterion_count(), 12);
        assert_eq!(criteria().count(), 12);
    }

    #[test]
    fn normalize_fills_missing_and_drops_unknown() {
        let raw = json!({
            "Creativity": 7,
            "Relevance to Theme": "9",
            "Not A Criterion": 10,
        });
        let scores = normalize_json(raw.as_object().unwrap());
        assert_eq!(scores.len(), 12);
        assert_eq!(scores["Creativity"], 7);
        assert_eq!(scores["Relevance to Theme"], 9);
        assert_eq!(scores["Visually appealing"], 0);
        assert!(!scores.contains_key("Not A Criterion"));
    }

    #[test]
    fn normalize_clamps_out_of_range_values() {
        let raw = json!({
            "Creativity": 99,
            "Audience Appeal": -3,
            "Relevance to Theme": "garbage",
        });
        let scores = normalize_json(raw.as_object().unwrap());
        assert_eq!(scores["Creativity"], 10);
        assert_eq!(scores["Audience Appeal"], 0);
        assert_eq!(scores["Relevance to Theme"], 0);
    }

    #[test]
    fn parse_score_handles_blank_and_decimal_cells() {
        assert_eq!(parse_score(""), 0);
        assert_eq!(parse_score(" 8 "), 8);
        assert_eq!(parse_score("7.4"), 7);
        assert_eq!(parse_score("n/a"), 0);
    }
}
