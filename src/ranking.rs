//! Score fusion, attribute boosting, and ranking.
//!
//! The query pipeline over one shop's index:
//! semantic similarity and lexical fuzzy scores are fused into a base score,
//! caller-supplied attribute boosts are added on top, then threshold filter,
//! stable descending sort, and top-K truncation. Every hit keeps its raw
//! component scores so callers can see why it ranked where it did.

use std::cmp::Ordering;

use serde::Serialize;

use crate::embedding::TextEmbedder;
use crate::feed::ProductRecord;
use crate::fuzzy;
use crate::index::TenantIndex;

/// Weight of the semantic similarity in the base score.
pub const DEFAULT_SEMANTIC_WEIGHT: f32 = 0.7;
/// Weight of the lexical fuzzy score in the base score.
pub const DEFAULT_LEXICAL_WEIGHT: f32 = 0.3;
/// Results returned when the caller does not pass a limit.
pub const DEFAULT_LIMIT: usize = 5;

/// Query keyword families for the season boost, one per season.
///
/// A family matches when the query contains any of its keywords and the
/// product's season field contains any of them too. Greek stems appear with
/// and without the accent because feeds write both forms.
const SEASON_FAMILIES: &[&[&str]] = &[
    &["summer", "καλοκαίρ", "καλοκαιρ"],
    &["winter", "χειμών", "χειμων", "χειμεριν"],
    &["spring", "άνοιξ", "ανοιξ"],
    &["autumn", "fall", "φθινόπωρ", "φθινοπωρ"],
];

/// Per-query additive boost weights, keyed by product attribute.
///
/// A zero weight disables the attribute. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoostConfig {
    pub season: f32,
    pub category: f32,
    pub manufacturer: f32,
    pub color: f32,
    pub gender: f32,
    pub fit: f32,
    pub kind_of: f32,
}

impl BoostConfig {
    /// Set a boost by attribute name. Returns false for unknown attributes.
    pub fn set(&mut self, attribute: &str, weight: f32) -> bool {
        match attribute {
            "season" => self.season = weight,
            "category" => self.category = weight,
            "manufacturer" => self.manufacturer = weight,
            "color" => self.color = weight,
            "gender" => self.gender = weight,
            "fit" => self.fit = weight,
            "kind_of" => self.kind_of = weight,
            _ => return false,
        }
        true
    }
}

/// Caller-tunable knobs for one search call.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub limit: usize,
    pub min_threshold: f32,
    pub boosts: BoostConfig,
    pub semantic_weight: f32,
    pub lexical_weight: f32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            min_threshold: 0.0,
            boosts: BoostConfig::default(),
            semantic_weight: DEFAULT_SEMANTIC_WEIGHT,
            lexical_weight: DEFAULT_LEXICAL_WEIGHT,
        }
    }
}

/// One ranked result: the product plus its score breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub product: ProductRecord,
    /// Final boosted score, the ranking key.
    pub score: f32,
    /// Fused score before boosts.
    pub base_score: f32,
    /// Raw semantic similarity.
    pub neural_score: f32,
    /// Raw lexical fuzzy score.
    pub fuzzy_score: f32,
}

/// Rank a shop's products against a free-text query.
///
/// Never fails: an unusable query embedding degrades to an empty result
/// list so one scoring fault cannot take down the request path. The caller
/// decides separately whether the shop is trained at all.
pub fn search_index(
    index: &TenantIndex,
    embedder: &dyn TextEmbedder,
    query: &str,
    params: &SearchParams,
) -> Vec<SearchHit> {
    if index.is_empty() {
        log::warn!("search on empty index for shop {}", index.shop_id);
        return vec![];
    }

    let query_embedding = match embedder.encode(&[query.to_string()]) {
        Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
        Ok(_) => {
            log::error!("embedder returned no vector for query");
            return vec![];
        }
        Err(err) => {
            log::error!("query embedding failed: {err}");
            return vec![];
        }
    };

    if query_embedding.len() != index.dimensions() {
        log::error!(
            "query embedding has {} dimensions, index for shop {} has {}",
            query_embedding.len(),
            index.shop_id,
            index.dimensions()
        );
        return vec![];
    }

    let semantic = index.semantic_scores(&query_embedding);
    let query_lower = query.to_lowercase();

    let mut hits: Vec<SearchHit> = index
        .products
        .iter()
        .zip(semantic)
        .map(|(product, neural_score)| {
            let fuzzy_score = fuzzy::lexical_score(query, product);
            let base_score =
                params.semantic_weight * neural_score + params.lexical_weight * fuzzy_score;
            let score = base_score + boost_for(&query_lower, product, &params.boosts);

            SearchHit {
                product: product.clone(),
                score,
                base_score,
                neural_score,
                fuzzy_score,
            }
        })
        .collect();

    if params.min_threshold > 0.0 {
        hits.retain(|hit| hit.score >= params.min_threshold);
    }

    // stable sort keeps feed order on ties
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    hits.truncate(params.limit);

    hits
}

/// Total additive boost for one product. Each attribute contributes at most
/// once; `query` must already be lowercased.
fn boost_for(query: &str, product: &ProductRecord, boosts: &BoostConfig) -> f32 {
    let mut boost = 0.0;

    if boosts.season > 0.0 && season_matches(query, &product.season) {
        boost += boosts.season;
    }
    if boosts.category > 0.0 && attr_in_query(query, &product.category) {
        boost += boosts.category;
    }
    if boosts.manufacturer > 0.0 && attr_in_query(query, &product.manufacturer) {
        boost += boosts.manufacturer;
    }
    if boosts.color > 0.0 && attr_in_query(query, &product.color) {
        boost += boosts.color;
    }
    if boosts.gender > 0.0 && attr_in_query(query, &product.gender) {
        boost += boosts.gender;
    }
    if boosts.fit > 0.0 && fit_matches(query, &product.fit) {
        boost += boosts.fit;
    }
    if boosts.kind_of > 0.0 && attr_in_query(query, &product.kind_of) {
        boost += boosts.kind_of;
    }

    boost
}

/// Case-insensitive containment of the product attribute in the query.
/// Empty attribute values never match.
fn attr_in_query(query: &str, value: &str) -> bool {
    !value.is_empty() && query.contains(&value.to_lowercase())
}

fn season_matches(query: &str, season: &str) -> bool {
    if season.is_empty() {
        return false;
    }

    let season = season.to_lowercase();
    SEASON_FAMILIES.iter().any(|family| {
        family.iter().any(|keyword| query.contains(keyword))
            && family.iter().any(|keyword| season.contains(keyword))
    })
}

/// The fit boost matches when any whitespace token of the product's fit
/// value appears in the query.
fn fit_matches(query: &str, fit: &str) -> bool {
    fit.to_lowercase()
        .split_whitespace()
        .any(|token| query.contains(token))
}
