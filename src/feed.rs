//! Product feed parsing.
//!
//! Turns a shop's XML catalog feed into normalized product records:
//! - Locates `<product>` nodes anywhere under the root
//! - Extracts known fields by name, with legacy fallbacks for a few
//! - Strips markup and collapses whitespace in every field
//! - Derives the `search_text` used for embedding and fuzzy matching

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum characters the description contributes to `search_text`.
const DESCRIPTION_SEARCH_LIMIT: usize = 500;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Errors that can occur while parsing a feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed is not valid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("feed contains no products")]
    NoProducts,

    #[error("no product in the feed has any searchable text")]
    NoSearchableText,
}

/// One normalized catalog entry.
///
/// All fields are plain text; absent feed fields become empty strings.
/// `search_text` is derived at parse time and stored alongside the rest so
/// the persisted artifact is self-contained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub kind_of: String,
    #[serde(default)]
    pub fit: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub search_text: String,
}

/// Parse a feed into an ordered product list.
///
/// Deterministic: the same input yields the same records in the same order.
/// Fails when the XML is malformed, when no `<product>` node exists, or when
/// no product yields a non-empty `search_text`.
pub fn parse_feed(xml: &str) -> Result<Vec<ProductRecord>, FeedError> {
    let doc = roxmltree::Document::parse(xml)?;

    let products: Vec<ProductRecord> = doc
        .descendants()
        .filter(|node| node.has_tag_name("product"))
        .map(|node| parse_product(node))
        .collect();

    if products.is_empty() {
        return Err(FeedError::NoProducts);
    }

    if products.iter().all(|p| p.search_text.is_empty()) {
        return Err(FeedError::NoSearchableText);
    }

    Ok(products)
}

fn parse_product(node: roxmltree::Node) -> ProductRecord {
    let field = |name: &str| child_text(node, name);

    let mut record = ProductRecord {
        id: field("id"),
        name: field("name"),
        // prefer the manufacturer part number over the legacy model field
        model: first_non_empty(field("mpn"), field("model")),
        description: field("description"),
        category: field("category"),
        season: field("season"),
        gender: field("gender"),
        kind_of: field("kind_of"),
        fit: field("fit"),
        color: field("color"),
        manufacturer: field("manufacturer"),
        price: first_non_empty(field("price_with_vat"), field("price")),
        image: field("image"),
        url: first_non_empty(field("link"), field("url")),
        search_text: String::new(),
    };

    record.search_text = build_search_text(&record);
    record
}

/// Text content of the first child element with the given name, cleaned.
///
/// Collects every text and CDATA chunk of the child, so feeds that wrap
/// descriptions in CDATA (with surrounding whitespace) lose nothing.
fn child_text(node: roxmltree::Node, name: &str) -> String {
    match node.children().find(|child| child.has_tag_name(name)) {
        Some(element) => {
            let raw: String = element
                .children()
                .filter(|child| child.is_text())
                .filter_map(|child| child.text())
                .collect();
            clean_text(&raw)
        }
        None => String::new(),
    }
}

fn first_non_empty(primary: String, fallback: String) -> String {
    if primary.is_empty() {
        fallback
    } else {
        primary
    }
}

/// Strip markup tags, collapse whitespace runs, and trim.
fn clean_text(raw: &str) -> String {
    let stripped = TAG_RE.replace_all(raw, " ");
    let collapsed = WHITESPACE_RE.replace_all(&stripped, " ");
    collapsed.trim().to_string()
}

/// Concatenate the searchable fields in fixed order, skipping empty parts.
fn build_search_text(record: &ProductRecord) -> String {
    let description: String = record
        .description
        .chars()
        .take(DESCRIPTION_SEARCH_LIMIT)
        .collect();

    let parts = [
        record.name.as_str(),
        record.model.as_str(),
        description.as_str(),
        record.category.as_str(),
        record.season.as_str(),
        record.gender.as_str(),
        record.kind_of.as_str(),
        record.fit.as_str(),
        record.color.as_str(),
        record.manufacturer.as_str(),
    ];

    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}
