//! Ordered classification rules.
//!
//! Rules are evaluated top to bottom and the first match wins, so the order
//! of [`default_rules`] is part of the classifier's behavior.

use std::sync::LazyLock;

use regex::Regex;

use super::keywords::{self, count_terms};
use super::ChunkType;

pub(crate) static UPPERCASE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2,}\b").unwrap());
pub(crate) static DIMENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:[.,]\d+)?\s*[×xX]\s*\d+(?:[.,]\d+)?(?:\s*[×xX]\s*\d+(?:[.,]\d+)?)?")
        .unwrap()
});
pub(crate) static MEASUREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+(?:[.,]\d+)?\s*(?:mm\b|cm\b|kg\b|°c|°f|%|m\b|g\b)").unwrap()
});
pub(crate) static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:[•\-\*·]|\d+[.)])[ \t]+").unwrap());
static PERSON_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+\s+[A-Z][a-z]+\b").unwrap());
pub(crate) static PRODUCT_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)\s+(?:[a-z-]+\s+)?(?:products|items|pieces|models|designs)\b").unwrap()
});
static PAGE_LEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\.{3,}|…)\s*\d+").unwrap());
static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\d+\.\s").unwrap());
static CERTIFICATION_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:ISO|CE|EN|ASTM|ANSI)\s*[-/]?\s*\d+").unwrap());

const IMAGE_MARKERS: &[&str] = &["![", "<img", "see image", "shown in"];

/// Chunk content with its lowercased form computed once.
pub struct ChunkText<'a> {
    pub raw: &'a str,
    pub lower: String,
}

impl<'a> ChunkText<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            lower: raw.to_lowercase(),
        }
    }

    fn count(&self, set: &[&str]) -> usize {
        count_terms(&self.lower, set)
    }

    fn has_list_structure(&self) -> bool {
        LIST_ITEM.is_match(self.raw) || self.raw.contains(':')
    }
}

/// A single entry of the rule table.
pub struct ClassificationRule {
    pub chunk_type: ChunkType,
    pub confidence: f64,
    pub reasoning: &'static str,
    pub matches: fn(&ChunkText<'_>) -> bool,
}

impl std::fmt::Debug for ClassificationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationRule")
            .field("chunk_type", &self.chunk_type)
            .field("confidence", &self.confidence)
            .finish()
    }
}

pub fn is_product_description(text: &ChunkText<'_>) -> bool {
    UPPERCASE_RUN.is_match(text.raw)
        && (text.count(keywords::PRODUCT) >= 2 || DIMENSION.is_match(text.raw))
}

pub fn is_technical_specs(text: &ChunkText<'_>) -> bool {
    text.count(keywords::TECHNICAL) >= 2
        || (MEASUREMENT.is_match(text.raw) && text.has_list_structure())
}

pub fn is_visual_showcase(text: &ChunkText<'_>) -> bool {
    text.count(keywords::VISUAL) >= 2
        || IMAGE_MARKERS.iter().any(|marker| text.lower.contains(marker))
}

pub fn is_designer_story(text: &ChunkText<'_>) -> bool {
    let hits = text.count(keywords::DESIGNER);
    hits >= 3
        || (hits >= 2
            && (PERSON_NAME.is_match(text.raw)
                || text.lower.contains("studio")
                || text.lower.contains("design by")))
}

pub fn is_collection_overview(text: &ChunkText<'_>) -> bool {
    let hits = text.count(keywords::COLLECTION);
    hits >= 2
        || (hits >= 1 && (LIST_ITEM.is_match(text.raw) || PRODUCT_COUNT.is_match(text.raw)))
}

pub fn is_index_content(text: &ChunkText<'_>) -> bool {
    text.count(keywords::INDEX) >= 1
        || PAGE_LEADER.is_match(text.raw)
        || LEADING_NUMBER.is_match(text.raw)
}

pub fn is_sustainability_info(text: &ChunkText<'_>) -> bool {
    text.count(keywords::SUSTAINABILITY) >= 2
}

pub fn is_certification_info(text: &ChunkText<'_>) -> bool {
    text.count(keywords::CERTIFICATION) >= 2 || CERTIFICATION_CODE.is_match(text.raw)
}

/// The built-in rule table, in priority order.
pub fn default_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule {
            chunk_type: ChunkType::ProductDescription,
            confidence: 0.85,
            reasoning: "Contains a product name with product vocabulary or dimensions",
            matches: is_product_description,
        },
        ClassificationRule {
            chunk_type: ChunkType::TechnicalSpecs,
            confidence: 0.90,
            reasoning: "Contains technical vocabulary or listed measurements",
            matches: is_technical_specs,
        },
        ClassificationRule {
            chunk_type: ChunkType::VisualShowcase,
            confidence: 0.80,
            reasoning: "Contains visual vocabulary or image references",
            matches: is_visual_showcase,
        },
        ClassificationRule {
            chunk_type: ChunkType::DesignerStory,
            confidence: 0.85,
            reasoning: "Contains designer vocabulary with attribution",
            matches: is_designer_story,
        },
        ClassificationRule {
            chunk_type: ChunkType::CollectionOverview,
            confidence: 0.80,
            reasoning: "Describes a collection or series of products",
            matches: is_collection_overview,
        },
        ClassificationRule {
            chunk_type: ChunkType::IndexContent,
            confidence: 0.95,
            reasoning: "Contains index or table-of-contents navigation",
            matches: is_index_content,
        },
        ClassificationRule {
            chunk_type: ChunkType::SustainabilityInfo,
            confidence: 0.90,
            reasoning: "Contains sustainability vocabulary",
            matches: is_sustainability_info,
        },
        ClassificationRule {
            chunk_type: ChunkType::CertificationInfo,
            confidence: 0.90,
            reasoning: "Contains certification vocabulary or standard codes",
            matches: is_certification_info,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(raw: &str) -> ChunkText<'_> {
        ChunkText::new(raw)
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let order: Vec<ChunkType> = default_rules().iter().map(|r| r.chunk_type).collect();
        assert_eq!(
            order,
            vec![
                ChunkType::ProductDescription,
                ChunkType::TechnicalSpecs,
                ChunkType::VisualShowcase,
                ChunkType::DesignerStory,
                ChunkType::CollectionOverview,
                ChunkType::IndexContent,
                ChunkType::SustainabilityInfo,
                ChunkType::CertificationInfo,
            ]
        );
    }

    #[test]
    fn test_confidences_are_in_unit_range() {
        for rule in default_rules() {
            assert!((0.0..=1.0).contains(&rule.confidence), "{:?}", rule);
            assert!(!rule.reasoning.is_empty());
        }
    }

    #[test]
    fn test_product_requires_uppercase_run() {
        assert!(is_product_description(&t("ARNE sofa in a modular configuration")));
        assert!(is_product_description(&t("FOLD stool 45×60")));
        assert!(!is_product_description(&t("a modular sofa in any configuration")));
        assert!(!is_product_description(&t("OSLO is a city")));
    }

    #[test]
    fn test_technical_measurement_needs_list_structure() {
        assert!(is_technical_specs(&t("Weight: 12 kg")));
        assert!(is_technical_specs(&t("- 12 kg\n- 30 cm")));
        assert!(!is_technical_specs(&t("It weighs about 12 kg in total")));
        assert!(is_technical_specs(&t("load capacity tested twice")));
        assert!(!is_technical_specs(&t("3. Technical Specifications .......... 12")));
    }

    #[test]
    fn test_collection_listing_categories_is_not_a_product() {
        let text = t("The HARMONY Collection includes seating, tables, and storage solutions.");
        assert!(!is_product_description(&text));
        assert!(is_collection_overview(&t(
            "The HARMONY Collection presents 15 innovative products."
        )));
    }

    #[test]
    fn test_measurement_units_need_boundaries() {
        assert!(MEASUREMENT.is_match("height 75 cm"));
        assert!(MEASUREMENT.is_match("absorption 0.5%"));
        assert!(MEASUREMENT.is_match("max 40°C"));
        assert!(!MEASUREMENT.is_match("3 mats"));
        assert!(!MEASUREMENT.is_match("2 great chairs"));
    }

    #[test]
    fn test_visual_image_markers() {
        assert!(is_visual_showcase(&t("![hero](hero.png)")));
        assert!(is_visual_showcase(&t("As shown in the next spread")));
        assert!(!is_visual_showcase(&t("a single photo")));
    }

    #[test]
    fn test_designer_needs_attribution_with_two_keywords() {
        assert!(is_designer_story(&t("Designed by Anna Berg, inspired by the coast")));
        assert!(is_designer_story(&t("the designer's studio was inspired by light")));
        assert!(!is_designer_story(&t("inspired and creative")));
    }

    #[test]
    fn test_collection_with_product_count() {
        assert!(is_collection_overview(&t("the collection includes 12 products")));
        assert!(is_collection_overview(&t("a series within the wider range")));
        assert!(!is_collection_overview(&t("our collection")));
    }

    #[test]
    fn test_index_patterns() {
        assert!(is_index_content(&t("Index")));
        assert!(is_index_content(&t("Introduction ........ 3")));
        assert!(is_index_content(&t("1. Introduction")));
        assert!(!is_index_content(&t("Introduction")));
    }

    #[test]
    fn test_certification_code() {
        assert!(is_certification_info(&t("meets ISO 9001")));
        assert!(is_certification_info(&t("tested to EN-1335")));
        assert!(!is_certification_info(&t("meets iso requirements")));
        assert!(!is_sustainability_info(&t("recycled only")));
    }
}
