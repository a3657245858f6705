//! Fuzzy join of two canonical record sets.
//!
//! Correlates deals against coupons across multiple column pairs using an
//! order-insensitive token similarity. A matched column alone is not enough:
//! a secondary brand-identity guard rejects pairs whose brands disagree, so
//! unrelated products sharing a generic descriptive phrase are not joined.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::error::MatchError;
use crate::schema::{DealRecord, TextColumn};

/// Brand similarity below this kills a candidate match outright. Looser than
/// any sensible primary threshold: it only has to catch different-brand
/// products, not rank them.
pub const BRAND_GUARD_THRESHOLD: u32 = 40;

/// Token-sort similarity on a 0-100 scale.
///
/// Both values are lowercased, punctuation is treated as token separators,
/// and tokens are compared in sorted order, so "Soda 12pk" vs "soda 12 pack"
/// scores on content rather than word order.
pub fn token_sort_ratio(a: &str, b: &str) -> u32 {
    let a = sorted_tokens(a);
    let b = sorted_tokens(b);
    if a.is_empty() && b.is_empty() {
        return 100;
    }
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    (strsim::normalized_levenshtein(&a, &b) * 100.0).round() as u32
}

fn sorted_tokens(value: &str) -> String {
    let mut tokens: Vec<String> = value
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Which input set a matched row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSide {
    Left,
    Right,
}

/// Identity of one match: the ordered pair of originating row indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MatchKey {
    pub left_index: usize,
    pub right_index: usize,
}

/// One side of a match, carrying the full record plus match metadata.
#[derive(Debug, Clone, Serialize)]
pub struct MatchedRow {
    pub side: MatchSide,
    pub key: MatchKey,
    pub matched_column: TextColumn,
    pub matched_value: String,
    pub score: u32,
    pub record: DealRecord,
}

/// All rows that matched each other under one key.
///
/// Invariant: at least one row per side. A record may appear in several
/// groups when it matched several counterparts.
#[derive(Debug, Clone, Serialize)]
pub struct MatchGroup {
    pub key: MatchKey,
    pub rows: Vec<MatchedRow>,
}

struct CandidateMatch {
    key: MatchKey,
    column: TextColumn,
    value: String,
    score: u32,
}

/// Joins `set_a` against `set_b` on positionally paired columns.
///
/// Keeps every candidate scoring at least `threshold` (inclusive),
/// optionally capped at the `limit` best per value, then applies the brand
/// guard and groups accepted tuples by their key. Columns with no usable
/// values on the B side simply contribute nothing; an empty result is not an
/// error. Deterministic for fixed inputs.
pub fn match_columns(
    set_a: &[DealRecord],
    set_b: &[DealRecord],
    columns_a: &[TextColumn],
    columns_b: &[TextColumn],
    threshold: u32,
    limit: Option<usize>,
) -> Result<Vec<MatchGroup>, MatchError> {
    if columns_a.len() != columns_b.len() {
        return Err(MatchError::ColumnArity {
            a: columns_a.len(),
            b: columns_b.len(),
        });
    }

    let mut candidates: Vec<CandidateMatch> = Vec::new();

    for (&col_a, &col_b) in columns_a.iter().zip(columns_b) {
        // Distinct, usable values on the B side, first-seen order.
        let mut seen = HashSet::new();
        let distinct_b: Vec<&str> = set_b
            .iter()
            .filter_map(|record| record.text_column(col_b))
            .filter(|value| seen.insert(*value))
            .collect();
        if distinct_b.is_empty() {
            continue;
        }

        for (a_index, record_a) in set_a.iter().enumerate() {
            let Some(value_a) = record_a.text_column(col_a) else {
                continue;
            };

            let mut scored: Vec<(&str, u32)> = distinct_b
                .iter()
                .map(|value_b| (*value_b, token_sort_ratio(value_a, value_b)))
                .filter(|(_, score)| *score >= threshold)
                .collect();
            scored.sort_by(|x, y| y.1.cmp(&x.1));
            if let Some(limit) = limit {
                scored.truncate(limit);
            }

            for (value_b, score) in scored {
                // First record holding the value stands in for all of them.
                let Some(b_index) = set_b
                    .iter()
                    .position(|record| record.text_column(col_b) == Some(value_b))
                else {
                    continue;
                };
                candidates.push(CandidateMatch {
                    key: MatchKey {
                        left_index: a_index,
                        right_index: b_index,
                    },
                    column: col_a,
                    value: value_b.to_string(),
                    score,
                });
            }
        }
    }

    // Materialize the accepted tuples, guard included, grouped by key.
    let mut groups: BTreeMap<MatchKey, Vec<MatchedRow>> = BTreeMap::new();
    for candidate in candidates {
        let record_a = &set_a[candidate.key.left_index];
        let record_b = &set_b[candidate.key.right_index];

        let brand_a = record_a.text_column(TextColumn::BrandName).unwrap_or("");
        let brand_b = record_b.text_column(TextColumn::BrandName).unwrap_or("");
        if token_sort_ratio(brand_a, brand_b) < BRAND_GUARD_THRESHOLD {
            continue;
        }

        let rows = groups.entry(candidate.key).or_default();
        rows.push(MatchedRow {
            side: MatchSide::Left,
            key: candidate.key,
            matched_column: candidate.column,
            matched_value: candidate.value.clone(),
            score: candidate.score,
            record: record_a.clone(),
        });
        rows.push(MatchedRow {
            side: MatchSide::Right,
            key: candidate.key,
            matched_column: candidate.column,
            matched_value: candidate.value,
            score: candidate.score,
            record: record_b.clone(),
        });
    }

    Ok(groups
        .into_iter()
        .map(|(key, rows)| MatchGroup { key, rows })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(brand: &str, product: &str) -> DealRecord {
        DealRecord {
            brand_name: Some(brand.to_string()),
            product_name: Some(product.to_string()),
            ..DealRecord::default()
        }
    }

    fn product_columns() -> ([TextColumn; 1], [TextColumn; 1]) {
        ([TextColumn::ProductName], [TextColumn::ProductName])
    }

    #[test]
    fn token_sort_is_order_insensitive() {
        assert_eq!(
            token_sort_ratio("red seedless grapes", "grapes seedless red"),
            100
        );
        assert_eq!(token_sort_ratio("Coca-Cola", "coca cola"), 100);
        assert!(token_sort_ratio("Soda 12pk", "soda 12 pack") > 60);
        assert!(token_sort_ratio("mayonnaise", "mustard") < 60);
    }

    #[test]
    fn matches_reordered_product_names_with_agreeing_brands() {
        let deals = vec![record("Coca-Cola", "Soda 12pk")];
        let coupons = vec![record("Coca Cola", "soda 12 pack")];
        let (cols_a, cols_b) = product_columns();

        let groups = match_columns(&deals, &coupons, &cols_a, &cols_b, 60, None).expect("groups");
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.rows.len(), 2);
        assert!(group.rows.iter().any(|r| r.side == MatchSide::Left));
        assert!(group.rows.iter().any(|r| r.side == MatchSide::Right));
        assert_eq!(group.rows[0].matched_column, TextColumn::ProductName);
    }

    #[test]
    fn brand_guard_rejects_unrelated_brands() {
        let deals = vec![record("Coca-Cola", "Soda 12pk")];
        let coupons = vec![record("Pepsi", "soda 12 pack")];
        let (cols_a, cols_b) = product_columns();

        let groups = match_columns(&deals, &coupons, &cols_a, &cols_b, 60, None).expect("groups");
        assert!(groups.is_empty(), "brand guard must reject the pair");
    }

    #[test]
    fn threshold_is_an_inclusive_lower_bound() {
        let deals = vec![record("Brand", "alpha beta")];
        let coupons = vec![record("Brand", "alpha bexa")];
        let score = token_sort_ratio("alpha beta", "alpha bexa");
        let (cols_a, cols_b) = product_columns();

        let at = match_columns(&deals, &coupons, &cols_a, &cols_b, score, None).expect("groups");
        assert_eq!(at.len(), 1, "score equal to threshold is accepted");

        let above =
            match_columns(&deals, &coupons, &cols_a, &cols_b, score + 1, None).expect("groups");
        assert!(above.is_empty(), "score below threshold is rejected");
    }

    #[test]
    fn column_arity_mismatch_errors() {
        let err = match_columns(
            &[],
            &[],
            &[TextColumn::ProductName, TextColumn::BrandName],
            &[TextColumn::ProductName],
            90,
            None,
        )
        .expect_err("arity error");
        assert!(matches!(err, MatchError::ColumnArity { a: 2, b: 1 }));
    }

    #[test]
    fn empty_candidate_column_contributes_nothing() {
        let deals = vec![record("Kraft", "Cheese")];
        let coupons = vec![DealRecord::default()];
        let (cols_a, cols_b) = product_columns();

        let groups = match_columns(&deals, &coupons, &cols_a, &cols_b, 60, None).expect("groups");
        assert!(groups.is_empty());
    }

    #[test]
    fn duplicate_values_resolve_to_first_record() {
        let deals = vec![record("Kraft", "Cheese Slices")];
        let coupons = vec![
            record("Kraft", "cheese slices"),
            record("Kraft", "cheese slices"),
        ];
        let (cols_a, cols_b) = product_columns();

        let groups = match_columns(&deals, &coupons, &cols_a, &cols_b, 90, None).expect("groups");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key.right_index, 0);
    }

    #[test]
    fn matching_is_idempotent() {
        let deals = vec![
            record("Coca-Cola", "Soda 12pk"),
            record("Kraft", "Cheese Slices"),
            record("Heinz", "Tomato Ketchup"),
        ];
        let coupons = vec![
            record("Coca Cola", "soda 12 pack"),
            record("Kraft", "cheese slices"),
        ];
        let cols = [TextColumn::BrandName, TextColumn::ProductName];

        let first = match_columns(&deals, &coupons, &cols, &cols, 80, None).expect("groups");
        let second = match_columns(&deals, &coupons, &cols, &cols, 80, None).expect("groups");

        let keys = |groups: &[MatchGroup]| groups.iter().map(|g| g.key).collect::<Vec<_>>();
        let sizes = |groups: &[MatchGroup]| groups.iter().map(|g| g.rows.len()).collect::<Vec<_>>();
        assert_eq!(keys(&first), keys(&second));
        assert_eq!(sizes(&first), sizes(&second));
    }

    #[test]
    fn multi_column_match_lands_in_one_group() {
        // Brand and product both match the same counterpart: one group,
        // four rows (two per matched column).
        let deals = vec![record("Kraft", "Cheese Slices")];
        let coupons = vec![record("Kraft", "cheese slices")];
        let cols = [TextColumn::BrandName, TextColumn::ProductName];

        let groups = match_columns(&deals, &coupons, &cols, &cols, 90, None).expect("groups");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rows.len(), 4);
    }

    #[test]
    fn limit_caps_matches_per_value() {
        let deals = vec![record("Kraft", "cheese")];
        let coupons = vec![
            record("Kraft", "cheese"),
            record("Kraft", "ched cheese"),
            record("Kraft", "cheese wheel"),
        ];
        let (cols_a, cols_b) = product_columns();

        let unlimited = match_columns(&deals, &coupons, &cols_a, &cols_b, 50, None).expect("groups");
        let limited = match_columns(&deals, &coupons, &cols_a, &cols_b, 50, Some(1)).expect("groups");
        assert!(unlimited.len() > 1);
        assert_eq!(limited.len(), 1);
        // The best-scoring candidate survives the cap.
        assert_eq!(limited[0].rows[0].score, 100);
    }
}
