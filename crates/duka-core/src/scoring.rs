//! # Scoring: Search Relevance, Batch Status, Result Ranking
//!
//! Everything that decides what a search returns and in which order.
//!
//! ## The Score Ladder
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Relevance Ladder (0–100)                           │
//! │                                                                         │
//! │   100  exact match            "rice"  ==  "rice"                       │
//! │    90  prefix                 "rice 2kg"  starts with  "rice"          │
//! │    85  word prefix            "basmati rice"  word starts with "ric"   │
//! │    80  whole-word phrase      " basmati rice "  ⊇  " basmati rice "    │
//! │ 70–79  substring              penalty: 0.5 per char, capped at 10      │
//! │     0  no match                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Selling units take the best of three scores (own name, display name,
//! or 70% of a strong parent score). Ranking puts sellable results
//! first, then score, then sheer availability.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Constants
// =============================================================================

/// Minimum composite score for a selling unit to enter the results.
pub const SELLING_UNIT_MIN_SCORE: f64 = 30.0;

/// Parent score must clear this before a selling unit inherits from it.
pub const PARENT_SCORE_GATE: f64 = 50.0;

/// Fraction of the parent score a selling unit inherits.
pub const PARENT_INHERIT_FACTOR: f64 = 0.7;

// =============================================================================
// Score Ladder
// =============================================================================

/// Scores `text` against `query` on the 0–100 relevance ladder.
///
/// Comparison is case-insensitive. The substring rung charges half a
/// point per character of match position (capped at 10), so "2kg" found
/// early in a name outranks "2kg" buried at the end.
///
/// ## Example
/// ```rust
/// use duka_core::scoring::score;
///
/// assert_eq!(score("Rice", "rice"), 100.0);
/// assert_eq!(score("Rice 2kg", "rice"), 90.0);
/// assert_eq!(score("Basmati Rice", "ric"), 85.0);
/// ```
pub fn score(text: &str, query: &str) -> f64 {
    if text.is_empty() || query.is_empty() {
        return 0.0;
    }

    let text = text.to_lowercase();
    let query = query.to_lowercase();

    if text == query {
        return 100.0;
    }

    if text.starts_with(&query) {
        return 90.0;
    }

    if text.split_whitespace().any(|word| word.starts_with(&query)) {
        return 85.0;
    }

    if format!(" {text} ").contains(&format!(" {query} ")) {
        return 80.0;
    }

    if let Some(byte_pos) = text.find(&query) {
        let position = text[..byte_pos].chars().count() as f64;
        let penalty = (position * 0.5).min(10.0);
        return (79.0 - penalty).max(70.0);
    }

    0.0
}

// =============================================================================
// Selling-Unit Composite Score
// =============================================================================

/// Which text a selling unit matched the query through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    SuName,
    SuDisplay,
    ParentInherited,
}

/// Best score a selling unit achieved, and through which text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitScore {
    pub score: f64,
    pub matched_by: MatchSource,
}

impl UnitScore {
    /// True once the score clears the inclusion threshold.
    pub fn qualifies(&self) -> bool {
        self.score > SELLING_UNIT_MIN_SCORE
    }
}

/// Composite score for one selling unit.
///
/// ## Rules
/// - The unit name and its display name are scored directly.
/// - A parent score above [`PARENT_SCORE_GATE`] contributes
///   `parent × 0.7`, so "Safari Cigarettes" still surfaces its sticks.
/// - The highest source wins; on a tie the earlier source in the order
///   name → display → parent keeps the tag.
///
/// Returns `None` when no source matched at all.
pub fn selling_unit_score(
    unit_name: &str,
    display_name: &str,
    parent_name: &str,
    query: &str,
) -> Option<UnitScore> {
    let mut best: Option<UnitScore> = None;
    let mut consider = |candidate: f64, matched_by: MatchSource| {
        if candidate > 0.0 && best.map_or(true, |b| candidate > b.score) {
            best = Some(UnitScore {
                score: candidate,
                matched_by,
            });
        }
    };

    consider(score(unit_name, query), MatchSource::SuName);
    consider(score(display_name, query), MatchSource::SuDisplay);

    let parent = score(parent_name, query);
    if parent > PARENT_SCORE_GATE {
        consider(parent * PARENT_INHERIT_FACTOR, MatchSource::ParentInherited);
    }

    best
}

// =============================================================================
// Batch Status
// =============================================================================

/// Display status of the batch behind a search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    ActiveHealthy,
    ActiveLowStock,
    /// Less than one whole base unit left; base sales blocked.
    InsufficientForBase,
    Exhausted,
    /// Under one selling unit left, but not empty.
    PartialStock,
    OutOfStock,
    /// Selling unit rendered off a raw batch with no link configured.
    NoBatchLink,
    NoBatches,
}

/// Status for a main-item result from its real base quantity.
///
/// ## Rules
/// - `≥ 1` whole unit: healthy above 3, low stock otherwise
/// - `(0, 1)`: insufficient for base sales
/// - `0`: exhausted
pub fn main_item_status(real_quantity: f64) -> BatchStatus {
    if real_quantity >= 1.0 {
        if real_quantity > 3.0 {
            BatchStatus::ActiveHealthy
        } else {
            BatchStatus::ActiveLowStock
        }
    } else if real_quantity > 0.0 {
        BatchStatus::InsufficientForBase
    } else {
        BatchStatus::Exhausted
    }
}

/// Status for a selling-unit result from its available units.
///
/// Selling units read a wider healthy band (10 instead of 3) because a
/// single base unit usually opens into many of them.
pub fn selling_unit_status(available_units: f64) -> BatchStatus {
    if available_units >= 1.0 {
        if available_units > 10.0 {
            BatchStatus::ActiveHealthy
        } else {
            BatchStatus::ActiveLowStock
        }
    } else if available_units > 0.0 {
        BatchStatus::PartialStock
    } else {
        BatchStatus::OutOfStock
    }
}

// =============================================================================
// Result Ranking
// =============================================================================

/// Sort key for one search result.
///
/// Built once per result before sorting; the name is lowercased here so
/// the comparator never allocates.
#[derive(Debug, Clone, PartialEq)]
pub struct RankKey {
    pub can_fulfill: bool,
    pub score: f64,
    /// Available selling units; main items rank 0 on this key.
    pub available_units: f64,
    pub is_selling_unit: bool,
    /// Lowercased display name for the alphabetical tail.
    pub name: String,
}

impl RankKey {
    pub fn new(
        can_fulfill: bool,
        score: f64,
        available_units: f64,
        is_selling_unit: bool,
        name: &str,
    ) -> Self {
        RankKey {
            can_fulfill,
            score,
            available_units,
            is_selling_unit,
            name: name.to_lowercase(),
        }
    }
}

/// Total order over ranked results.
///
/// ## Priority
/// 1. Results that can fulfil come first
/// 2. Higher search score
/// 3. More available units
/// 4. Main items before selling units
/// 5. Name, alphabetically
///
/// `f64::total_cmp` keeps the order total even if a NaN ever sneaks into
/// a score or quantity.
pub fn compare_ranked(a: &RankKey, b: &RankKey) -> Ordering {
    (!a.can_fulfill)
        .cmp(&!b.can_fulfill)
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| b.available_units.total_cmp(&a.available_units))
        .then_with(|| a.is_selling_unit.cmp(&b.is_selling_unit))
        .then_with(|| a.name.cmp(&b.name))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Score ladder
    // -------------------------------------------------------------------------

    #[test]
    fn exact_match_ignores_case() {
        assert_eq!(score("RICE", "rice"), 100.0);
        assert_eq!(score("rice", "RICE"), 100.0);
    }

    #[test]
    fn prefix_scores_90() {
        assert_eq!(score("Rice 2kg Premium", "rice"), 90.0);
    }

    #[test]
    fn word_prefix_scores_85() {
        assert_eq!(score("Basmati Rice", "ric"), 85.0);
        // A full interior word is still a word prefix.
        assert_eq!(score("Basmati Rice", "rice"), 85.0);
    }

    #[test]
    fn whole_word_phrase_scores_80() {
        // Two-word query: not a prefix, no single word starts with it.
        assert_eq!(score("Golden Basmati Rice", "basmati rice"), 80.0);
    }

    #[test]
    fn substring_charges_position_penalty() {
        // "2kg" sits at char position 4: 79 - 4×0.5 = 77.
        assert_eq!(score("rice2kg premium", "2kg"), 77.0);
    }

    #[test]
    fn substring_penalty_caps_at_ten() {
        // Position 24 would cost 12; the floor holds at 70.
        let text = "xxxxxxxxxxxxxxxxxxxxxxxx2kg";
        assert_eq!(score(text, "2kg"), 70.0);
    }

    #[test]
    fn substring_scores_stay_within_band() {
        for pos in 0..40 {
            let text = format!("{}needle", "x".repeat(pos));
            let s = score(&text, "needle");
            assert!((70.0..=79.0).contains(&s), "pos {pos} scored {s}");
        }
    }

    #[test]
    fn no_match_and_empty_inputs_score_zero() {
        assert_eq!(score("Sugar", "rice"), 0.0);
        assert_eq!(score("", "rice"), 0.0);
        assert_eq!(score("Sugar", ""), 0.0);
    }

    // -------------------------------------------------------------------------
    // Selling-unit composite
    // -------------------------------------------------------------------------

    #[test]
    fn unit_name_wins_ties_over_display() {
        // Both name and display would hit the exact/prefix rungs; the
        // higher one (name, 100) carries the tag.
        let s = selling_unit_score("Stick", "Stick (Safari)", "Safari", "stick").unwrap();
        assert_eq!(s.score, 100.0);
        assert_eq!(s.matched_by, MatchSource::SuName);
    }

    #[test]
    fn display_name_can_outscore_unit_name() {
        let s = selling_unit_score("Stick", "Stick (Safari Cigarettes)", "Milk", "safari").unwrap();
        // Substring of the display name at char position 7: 79 - 3.5.
        assert_eq!(s.score, 75.5);
        assert_eq!(s.matched_by, MatchSource::SuDisplay);
    }

    #[test]
    fn strong_parent_score_is_inherited_at_70_percent() {
        let s = selling_unit_score("Kg", "Kg (Sugar)", "Sugar Crystal", "crystal").unwrap();
        assert_eq!(s.score, 85.0 * 0.7);
        assert_eq!(s.matched_by, MatchSource::ParentInherited);
        assert!(s.qualifies());
    }

    #[test]
    fn no_source_match_returns_none() {
        assert!(selling_unit_score("Stick", "Stick (Safari)", "Safari", "sugar").is_none());
    }

    #[test]
    fn inclusion_threshold_is_thirty() {
        assert_eq!(SELLING_UNIT_MIN_SCORE, 30.0);
        let s = UnitScore {
            score: 30.0,
            matched_by: MatchSource::SuName,
        };
        assert!(!s.qualifies());
    }

    // -------------------------------------------------------------------------
    // Batch status
    // -------------------------------------------------------------------------

    #[test]
    fn main_item_status_bands() {
        assert_eq!(main_item_status(50.0), BatchStatus::ActiveHealthy);
        assert_eq!(main_item_status(3.1), BatchStatus::ActiveHealthy);
        assert_eq!(main_item_status(3.0), BatchStatus::ActiveLowStock);
        assert_eq!(main_item_status(1.0), BatchStatus::ActiveLowStock);
        assert_eq!(main_item_status(0.5), BatchStatus::InsufficientForBase);
        assert_eq!(main_item_status(0.0), BatchStatus::Exhausted);
    }

    #[test]
    fn selling_unit_status_bands() {
        assert_eq!(selling_unit_status(25.0), BatchStatus::ActiveHealthy);
        assert_eq!(selling_unit_status(10.0), BatchStatus::ActiveLowStock);
        assert_eq!(selling_unit_status(1.0), BatchStatus::ActiveLowStock);
        assert_eq!(selling_unit_status(0.5), BatchStatus::PartialStock);
        assert_eq!(selling_unit_status(0.0), BatchStatus::OutOfStock);
    }

    #[test]
    fn batch_status_serializes_snake_case() {
        let json = serde_json::to_string(&BatchStatus::ActiveLowStock).unwrap();
        assert_eq!(json, "\"active_low_stock\"");
        let json = serde_json::to_string(&BatchStatus::InsufficientForBase).unwrap();
        assert_eq!(json, "\"insufficient_for_base\"");
    }

    // -------------------------------------------------------------------------
    // Ranking
    // -------------------------------------------------------------------------

    fn key(
        can_fulfill: bool,
        score: f64,
        available: f64,
        selling_unit: bool,
        name: &str,
    ) -> RankKey {
        RankKey::new(can_fulfill, score, available, selling_unit, name)
    }

    #[test]
    fn fulfillable_results_rank_first_regardless_of_score() {
        let weak_but_sellable = key(true, 70.0, 1.0, false, "b");
        let strong_but_empty = key(false, 100.0, 0.0, false, "a");

        assert_eq!(
            compare_ranked(&weak_but_sellable, &strong_but_empty),
            Ordering::Less
        );
    }

    #[test]
    fn higher_score_wins_within_fulfillable() {
        let high = key(true, 90.0, 1.0, false, "b");
        let low = key(true, 85.0, 99.0, false, "a");

        assert_eq!(compare_ranked(&high, &low), Ordering::Less);
    }

    #[test]
    fn availability_breaks_score_ties() {
        let more = key(true, 85.0, 20.0, true, "b");
        let less = key(true, 85.0, 5.0, true, "a");

        assert_eq!(compare_ranked(&more, &less), Ordering::Less);
    }

    #[test]
    fn main_items_come_before_selling_units() {
        let main = key(true, 85.0, 0.0, false, "zebra");
        let unit = key(true, 85.0, 0.0, true, "aardvark");

        assert_eq!(compare_ranked(&main, &unit), Ordering::Less);
    }

    #[test]
    fn final_tie_break_is_alphabetical_case_insensitive() {
        let apple = key(true, 85.0, 0.0, false, "Apple");
        let banana = key(true, 85.0, 0.0, false, "banana");

        assert_eq!(compare_ranked(&apple, &banana), Ordering::Less);
        assert_eq!(compare_ranked(&apple, &apple.clone()), Ordering::Equal);
    }

    #[test]
    fn sort_produces_expected_order() {
        let mut keys = vec![
            key(false, 100.0, 0.0, false, "exhausted exact"),
            key(true, 70.0, 2.0, true, "weak unit"),
            key(true, 90.0, 0.0, false, "prefix main"),
            key(true, 90.0, 50.0, true, "prefix unit"),
        ];
        keys.sort_by(compare_ranked);

        let names: Vec<&str> = keys.iter().map(|k| k.name.as_str()).collect();
        // 90 with 50 units beats 90 with none; the unfulfillable exact
        // match drops to the bottom no matter its score.
        assert_eq!(
            names,
            vec!["prefix unit", "prefix main", "weak unit", "exhausted exact"]
        );
    }
}
