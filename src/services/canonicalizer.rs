// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exercise name canonicalization.
//!
//! Resolves free-text exercise names (as typed into a tracking app) to a
//! known exercise with muscle-group metadata. Lookup order is exact
//! canonical/alias match, then abbreviation expansion, then fuzzy matching
//! by normalized edit distance.

use crate::models::MuscleGroup;
use serde::Deserialize;
use std::collections::HashMap;

/// Built-in exercise catalog.
const BUILTIN_CATALOG: &str = include_str!("../../data/exercises.json");

/// Minimum normalized similarity for a fuzzy match.
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.90;

/// Confidence reported when a match needed abbreviation expansion.
const EXPANDED_MATCH_CONFIDENCE: f64 = 0.95;

/// Tolerance for floating point comparison against the threshold.
const SCORE_EPSILON: f64 = 1e-9;

/// Word-level abbreviations commonly used in exercise names.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("db", "dumbbell"),
    ("bb", "barbell"),
    ("kb", "kettlebell"),
    ("ez", "ez bar"),
    ("ohp", "overhead press"),
    ("rdl", "romanian deadlift"),
    ("sldl", "stiff leg deadlift"),
    ("lat", "lateral"),
    ("incl", "incline"),
    ("decl", "decline"),
    ("ext", "extension"),
];

/// One catalog entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ExerciseEntry {
    pub canonical_name: String,
    pub primary: MuscleGroup,
    #[serde(default)]
    pub secondary: Vec<MuscleGroup>,
    pub primary_coeff: f64,
    pub secondary_coeff: f64,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Result of looking up an exercise name.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseMatch {
    pub matched: bool,
    /// Empty when unmatched
    pub canonical_name: String,
    pub primary: MuscleGroup,
    pub secondary: Vec<MuscleGroup>,
    pub primary_coeff: f64,
    pub secondary_coeff: f64,
    /// 0.0 (no match) to 1.0 (exact)
    pub confidence: f64,
}

impl ExerciseMatch {
    fn unmatched() -> Self {
        Self {
            matched: false,
            canonical_name: String::new(),
            primary: MuscleGroup::Other,
            secondary: Vec::new(),
            primary_coeff: 0.0,
            secondary_coeff: 0.0,
            confidence: 0.0,
        }
    }

    fn from_entry(entry: &ExerciseEntry, confidence: f64) -> Self {
        Self {
            matched: true,
            canonical_name: entry.canonical_name.clone(),
            primary: entry.primary,
            secondary: entry.secondary.clone(),
            primary_coeff: entry.primary_coeff,
            secondary_coeff: entry.secondary_coeff,
            confidence,
        }
    }
}

/// Indexed exercise catalog.
#[derive(Debug, Clone)]
pub struct ExerciseCatalog {
    entries: Vec<ExerciseEntry>,
    /// Normalized canonical name -> entry index
    by_name: HashMap<String, usize>,
    /// Normalized alias -> entry index
    by_alias: HashMap<String, usize>,
    /// Every normalized name and alias, for fuzzy scoring
    candidates: Vec<(String, usize)>,
}

impl ExerciseCatalog {
    /// Load the catalog bundled with the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::load_from_json(BUILTIN_CATALOG)
    }

    /// Load a catalog from a JSON array of entries.
    pub fn load_from_json(json_data: &str) -> Result<Self, CatalogError> {
        let entries: Vec<ExerciseEntry> =
            serde_json::from_str(json_data).map_err(|e| CatalogError::ParseError(e.to_string()))?;

        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut by_name = HashMap::new();
        let mut by_alias = HashMap::new();
        let mut candidates = Vec::new();

        for (idx, entry) in entries.iter().enumerate() {
            let name = normalize(&entry.canonical_name);
            by_name.entry(name.clone()).or_insert(idx);
            candidates.push((name, idx));

            for alias in &entry.aliases {
                let alias = normalize(alias);
                // First entry to claim an alias keeps it
                by_alias.entry(alias.clone()).or_insert(idx);
                candidates.push((alias, idx));
            }
        }

        tracing::info!(count = entries.len(), "Loaded exercise catalog");

        Ok(Self {
            entries,
            by_name,
            by_alias,
            candidates,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a free-text exercise name.
    pub fn lookup(&self, name: &str) -> ExerciseMatch {
        let normalized = normalize(name);
        if normalized.is_empty() {
            return ExerciseMatch::unmatched();
        }

        if let Some(entry) = self.exact(&normalized) {
            return ExerciseMatch::from_entry(entry, 1.0);
        }

        let expanded = expand_abbreviations(&normalized);
        if expanded != normalized {
            if let Some(entry) = self.exact(&expanded) {
                return ExerciseMatch::from_entry(entry, EXPANDED_MATCH_CONFIDENCE);
            }
        }

        match self.fuzzy(&normalized) {
            Some((entry, score)) if score + SCORE_EPSILON >= FUZZY_MATCH_THRESHOLD => {
                ExerciseMatch::from_entry(entry, score)
            }
            _ => ExerciseMatch::unmatched(),
        }
    }

    fn exact(&self, normalized: &str) -> Option<&ExerciseEntry> {
        self.by_name
            .get(normalized)
            .or_else(|| self.by_alias.get(normalized))
            .map(|&idx| &self.entries[idx])
    }

    /// Best-scoring entry by normalized Levenshtein similarity.
    fn fuzzy(&self, normalized: &str) -> Option<(&ExerciseEntry, f64)> {
        let mut best: Option<(usize, f64)> = None;

        for (candidate, idx) in &self.candidates {
            let score = strsim::normalized_levenshtein(normalized, candidate);
            // Strictly greater keeps the earliest entry on ties
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((*idx, score)),
            }
        }

        best.map(|(idx, score)| (&self.entries[idx], score))
    }
}

/// Lowercase, turn separators into spaces, drop other punctuation and
/// collapse whitespace.
pub fn normalize(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            c if c.is_alphanumeric() => Some(c),
            c if c.is_whitespace() => Some(' '),
            '-' | '(' | ')' | '/' | '_' => Some(' '),
            _ => None,
        })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn expand_abbreviations(normalized: &str) -> String {
    normalized
        .split(' ')
        .map(|word| {
            ABBREVIATIONS
                .iter()
                .find(|(abbr, _)| *abbr == word)
                .map(|(_, full)| *full)
                .unwrap_or(word)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Errors from catalog loading.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to parse exercise catalog: {0}")]
    ParseError(String),

    #[error("Exercise catalog is empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ExerciseCatalog {
        ExerciseCatalog::builtin().expect("builtin catalog should parse")
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Bench   Press "), "bench press");
        assert_eq!(normalize("Chin-Up"), "chin up");
        assert_eq!(normalize("Lateral Raise (Dumbbell)"), "lateral raise dumbbell");
        assert_eq!(normalize("Farmer's Walk"), "farmers walk");
    }

    #[test]
    fn test_exact_and_alias_matches() {
        let catalog = catalog();

        let exact = catalog.lookup("Bench Press");
        assert!(exact.matched);
        assert_eq!(exact.canonical_name, "Bench Press");
        assert_eq!(exact.primary, MuscleGroup::Chest);
        assert_eq!(exact.confidence, 1.0);

        let cases = [
            ("Flat Bench", "Bench Press"),
            ("BB Bench", "Bench Press"),
            ("Military Press", "Overhead Press"),
            ("OHP", "Overhead Press"),
            ("Back Squat", "Squat"),
            ("Chinup", "Chin Up"),
            ("Farmer's Walk", "Farmers Walk"),
            ("Walking Lunge (Dumbbell)", "Walking Lunge"),
            ("Overhead Press (Dumbbell)", "Dumbbell Shoulder Press"),
        ];
        for (input, expected) in cases {
            let result = catalog.lookup(input);
            assert!(result.matched, "Expected a match for {input:?}");
            assert_eq!(result.canonical_name, expected, "Wrong match for {input:?}");
            assert_eq!(result.confidence, 1.0, "{input:?} should be exact");
        }
    }

    #[test]
    fn test_abbreviation_expansion() {
        let catalog = catalog();

        let result = catalog.lookup("Incl Bench Press");
        assert!(result.matched);
        assert_eq!(result.canonical_name, "Incline Bench Press");
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn test_fuzzy_threshold_boundary() {
        let catalog = catalog();

        // One edit in ten characters is exactly 0.90
        let at_threshold = catalog.lookup("Hip Thrist");
        assert!(at_threshold.matched, "similarity 0.90 must match");
        assert_eq!(at_threshold.canonical_name, "Hip Thrust");
        assert!((at_threshold.confidence - 0.90).abs() < 1e-9);

        let close = catalog.lookup("Bench Pres");
        assert!(close.matched);
        assert_eq!(close.canonical_name, "Bench Press");
        assert!(close.confidence < 1.0);

        let typo = catalog.lookup("Bech Press");
        assert!(typo.matched);
        assert_eq!(typo.canonical_name, "Bench Press");

        for input in ["Bench Press Custom", "Squatt", "Deadlit"] {
            let result = catalog.lookup(input);
            assert!(!result.matched, "{input:?} should be below threshold");
        }
    }

    #[test]
    fn test_unmatched_is_other() {
        let catalog = catalog();

        for input in ["", "   ", "Underwater Basket Weaving", "xyzabc123 random exercise"] {
            let result = catalog.lookup(input);
            assert!(!result.matched);
            assert_eq!(result.primary, MuscleGroup::Other);
            assert_eq!(result.confidence, 0.0);
            assert!(result.canonical_name.is_empty());
        }
    }

    #[test]
    fn test_case_insensitive() {
        let catalog = catalog();
        assert_eq!(catalog.lookup("bench PRESS").canonical_name, "Bench Press");
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            ExerciseCatalog::load_from_json("[]"),
            Err(CatalogError::Empty)
        ));
        assert!(matches!(
            ExerciseCatalog::load_from_json("{not json"),
            Err(CatalogError::ParseError(_))
        ));
    }
}
