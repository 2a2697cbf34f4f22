//! Keyword-based category inference for reports submitted without one

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::Category;

/// Whole-word keywords per category, checked in order; first match wins
const KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Crime,
        &["robbery", "theft", "assault", "murder", "burglary", "crime", "mugging", "stolen"],
    ),
    (
        Category::Accident,
        &["accident", "crash", "collision", "injury", "injured", "overturned"],
    ),
    (
        Category::Hazard,
        &["hazard", "hazardous", "fire", "flood", "flooding", "pollution", "spill", "landslide"],
    ),
    (
        Category::PoliceInteraction,
        &["police", "checkpoint", "officer", "arrest", "roadblock"],
    ),
];

static MATCHERS: Lazy<Vec<(Category, Regex)>> = Lazy::new(|| {
    KEYWORDS
        .iter()
        .filter_map(|(category, words)| {
            let pattern = format!(r"(?i)\b(?:{})\b", words.join("|"));
            // Patterns are built from the literal table above
            Regex::new(&pattern).ok().map(|re| (*category, re))
        })
        .collect()
});

/// Infer a category from the report text, if any keyword matches
pub fn infer_category(title: &str, description: &str) -> Option<Category> {
    let text = format!("{title} {description}");
    MATCHERS
        .iter()
        .find(|(_, re)| re.is_match(&text))
        .map(|(category, _)| *category)
}
