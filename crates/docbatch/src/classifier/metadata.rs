//! Category-specific structured metadata extracted from chunk text.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::keywords::{self, matching_terms};
use super::rules::{ChunkText, DIMENSION, LIST_ITEM, MEASUREMENT, PRODUCT_COUNT, UPPERCASE_RUN};
use super::ChunkType;

static SPEC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[•\-\*·][ \t]*|\d+[.)][ \t]*)?([^:\n]{1,60}?)[ \t]*:[ \t]*(\S[^\n]*?)[ \t]*$")
        .unwrap()
});
static LIST_ITEM_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[•\-\*·]|\d+[.)])[ \t]+(\S[^\n]*?)[ \t]*$").unwrap()
});
static MARKDOWN_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\(([^)\s]+)[^)]*\)").unwrap());
static HTML_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<img[^>]*\bsrc\s*=\s*["']([^"']+)["']"#).unwrap());
static IMAGE_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:see|shown in)\s+((?:figure|fig\.|image|img)\s*(?:\d+[a-z]?(?:\.\d+)?\b|[\w-]+\.(?:png|jpe?g|gif|webp|svg)\b))",
    )
    .unwrap()
});
static DESIGNER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:designer|designed by|design by|created by)[:\s]+([A-Z][\w{}'&-]*(?:\s+[A-Z][\w{}'&-]*){0,2})")
        .unwrap()
});
static STUDIO_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:[A-Z][\w{}&'-]*\s+){1,3}Studio)\b").unwrap());
static STUDIO_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(Studio\s+[A-Z][\w{}&'-]*(?:\s+[A-Z][\w{}&'-]*){0,2})").unwrap()
});
static PHILOSOPHY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([a-z][\w-]*)\s+(?:design\s+)?philosophy\b").unwrap());
static INSPIRATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\binspired by\s+([^.;,\n]+)").unwrap());
static COLLECTION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b((?:[A-Z][\w'&-]*\s+){1,3})(?:Collection|Series|Range|Family)\b").unwrap()
});

const PHILOSOPHY_STOPWORDS: &[&str] = &["a", "an", "the", "her", "his", "its", "our", "their", "my", "your"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_features: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalMetadata {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub specifications: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub measurements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualMetadata {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_references: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub visual_elements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignerMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub studio_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_philosophy: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inspiration_sources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_count: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_features: Vec<String>,
}

/// Metadata attached to a classification; the variant follows the chunk type.
///
/// Serializes as a plain JSON object. Categories without rich extraction
/// serialize as `{}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ChunkMetadata {
    Product(ProductMetadata),
    Technical(TechnicalMetadata),
    Visual(VisualMetadata),
    Designer(DesignerMetadata),
    Collection(CollectionMetadata),
    #[default]
    Empty,
}

impl Serialize for ChunkMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChunkMetadata::Product(m) => m.serialize(serializer),
            ChunkMetadata::Technical(m) => m.serialize(serializer),
            ChunkMetadata::Visual(m) => m.serialize(serializer),
            ChunkMetadata::Designer(m) => m.serialize(serializer),
            ChunkMetadata::Collection(m) => m.serialize(serializer),
            ChunkMetadata::Empty => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

impl ChunkMetadata {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

/// Runs the extractor for `chunk_type` over `text`.
pub fn extract(text: &ChunkText<'_>, chunk_type: ChunkType) -> ChunkMetadata {
    match chunk_type {
        ChunkType::ProductDescription => ChunkMetadata::Product(extract_product(text)),
        ChunkType::TechnicalSpecs => ChunkMetadata::Technical(extract_technical(text)),
        ChunkType::VisualShowcase => ChunkMetadata::Visual(extract_visual(text)),
        ChunkType::DesignerStory => ChunkMetadata::Designer(extract_designer(text)),
        ChunkType::CollectionOverview => ChunkMetadata::Collection(extract_collection(text)),
        _ => ChunkMetadata::Empty,
    }
}

fn list_items(raw: &str) -> Vec<String> {
    if !LIST_ITEM.is_match(raw) {
        return Vec::new();
    }
    LIST_ITEM_TEXT
        .captures_iter(raw)
        .map(|c| c[1].to_string())
        .collect()
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !value.is_empty() && !values.contains(&value) {
        values.push(value);
    }
}

fn extract_product(text: &ChunkText<'_>) -> ProductMetadata {
    ProductMetadata {
        product_name: UPPERCASE_RUN.find(text.raw).map(|m| m.as_str().to_string()),
        dimensions: DIMENSION.find(text.raw).map(|m| m.as_str().trim().to_string()),
        materials: matching_terms(&text.lower, keywords::MATERIALS),
        colors: matching_terms(&text.lower, keywords::COLORS),
        key_features: list_items(text.raw),
    }
}

fn extract_technical(text: &ChunkText<'_>) -> TechnicalMetadata {
    let mut specifications = BTreeMap::new();
    for caps in SPEC_LINE.captures_iter(text.raw) {
        specifications
            .entry(caps[1].trim().to_string())
            .or_insert_with(|| caps[2].trim().to_string());
    }

    let mut measurements = Vec::new();
    for m in MEASUREMENT.find_iter(text.raw) {
        push_unique(&mut measurements, m.as_str().trim().to_string());
    }

    TechnicalMetadata {
        specifications,
        measurements,
    }
}

fn extract_visual(text: &ChunkText<'_>) -> VisualMetadata {
    let mut image_references = Vec::new();
    for re in [&*MARKDOWN_IMAGE, &*HTML_IMAGE, &*IMAGE_PHRASE] {
        for caps in re.captures_iter(text.raw) {
            push_unique(&mut image_references, caps[1].trim().to_string());
        }
    }

    VisualMetadata {
        image_references,
        visual_elements: matching_terms(&text.lower, keywords::VISUAL),
    }
}

fn extract_designer(text: &ChunkText<'_>) -> DesignerMetadata {
    let studio_name = STUDIO_SUFFIX
        .captures(text.raw)
        .or_else(|| STUDIO_PREFIX.captures(text.raw))
        .map(|c| c[1].trim().to_string());

    let design_philosophy = PHILOSOPHY
        .captures_iter(text.raw)
        .map(|c| c[1].to_lowercase())
        .find(|word| !PHILOSOPHY_STOPWORDS.contains(&word.as_str()));

    let mut inspiration_sources = Vec::new();
    for caps in INSPIRATION.captures_iter(text.raw) {
        for source in caps[1].split(" and ") {
            push_unique(&mut inspiration_sources, source.trim().to_string());
        }
    }

    DesignerMetadata {
        designer_name: DESIGNER_NAME
            .captures(text.raw)
            .map(|c| c[1].trim().to_string()),
        studio_name,
        design_philosophy,
        inspiration_sources,
    }
}

fn extract_collection(text: &ChunkText<'_>) -> CollectionMetadata {
    let collection_name = COLLECTION_NAME.captures(text.raw).and_then(|c| {
        let name = c[1].trim();
        let name = name.strip_prefix("The ").unwrap_or(name).trim();
        (!name.is_empty() && name != "The").then(|| name.to_string())
    });

    CollectionMetadata {
        collection_name,
        product_count: PRODUCT_COUNT
            .captures(text.raw)
            .and_then(|c| c[1].parse().ok()),
        key_features: list_items(text.raw),
    }
}
