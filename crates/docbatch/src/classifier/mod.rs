//! Chunk classification: assigns a semantic category and structured
//! metadata to extracted text chunks.

pub mod keywords;
pub mod metadata;
pub mod rules;
pub mod service;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DatabaseError;

pub use metadata::ChunkMetadata;
pub use rules::{default_rules, ChunkText, ClassificationRule};
pub use service::{ClassificationOutcome, ClassificationService, ClassificationStats, ReclassifySummary};

const SUPPORTING_MIN_CHARS: usize = 50;

/// Semantic category of a chunk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    ProductDescription,
    TechnicalSpecs,
    VisualShowcase,
    DesignerStory,
    CollectionOverview,
    SupportingContent,
    IndexContent,
    SustainabilityInfo,
    CertificationInfo,
    Unclassified,
}

impl ChunkType {
    pub const ALL: [ChunkType; 10] = [
        ChunkType::ProductDescription,
        ChunkType::TechnicalSpecs,
        ChunkType::VisualShowcase,
        ChunkType::DesignerStory,
        ChunkType::CollectionOverview,
        ChunkType::SupportingContent,
        ChunkType::IndexContent,
        ChunkType::SustainabilityInfo,
        ChunkType::CertificationInfo,
        ChunkType::Unclassified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::ProductDescription => "product_description",
            ChunkType::TechnicalSpecs => "technical_specs",
            ChunkType::VisualShowcase => "visual_showcase",
            ChunkType::DesignerStory => "designer_story",
            ChunkType::CollectionOverview => "collection_overview",
            ChunkType::SupportingContent => "supporting_content",
            ChunkType::IndexContent => "index_content",
            ChunkType::SustainabilityInfo => "sustainability_info",
            ChunkType::CertificationInfo => "certification_info",
            ChunkType::Unclassified => "unclassified",
        }
    }

    /// Categories that get structured metadata extraction.
    pub fn has_rich_metadata(&self) -> bool {
        matches!(
            self,
            ChunkType::ProductDescription
                | ChunkType::TechnicalSpecs
                | ChunkType::VisualShowcase
                | ChunkType::DesignerStory
                | ChunkType::CollectionOverview
        )
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChunkType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown chunk type '{}'", s))
    }
}

/// Result of classifying one chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkClassificationResult {
    pub chunk_type: ChunkType,
    pub confidence: f64,
    pub reasoning: String,
    pub metadata: ChunkMetadata,
}

impl ChunkClassificationResult {
    /// The downgraded result recorded when classifying or persisting a
    /// chunk failed.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            chunk_type: ChunkType::Unclassified,
            confidence: 0.0,
            reasoning: reason.into(),
            metadata: ChunkMetadata::Empty,
        }
    }
}

#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("Invalid chunk '{chunk_id}': {reason}")]
    InvalidChunk { chunk_id: String, reason: String },

    #[error("Failed to store classification: {0}")]
    Persistence(#[from] DatabaseError),
}

/// Rule-based chunk classifier.
#[derive(Debug)]
pub struct ChunkClassifier {
    rules: Vec<ClassificationRule>,
}

impl Default for ChunkClassifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl ChunkClassifier {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Classifies `content`; the first matching rule wins.
    pub fn classify(&self, content: &str) -> ChunkClassificationResult {
        let text = ChunkText::new(content);

        if let Some(rule) = self.rules.iter().find(|rule| (rule.matches)(&text)) {
            return ChunkClassificationResult {
                chunk_type: rule.chunk_type,
                confidence: rule.confidence,
                reasoning: rule.reasoning.to_string(),
                metadata: metadata::extract(&text, rule.chunk_type),
            };
        }

        if content.trim().chars().count() > SUPPORTING_MIN_CHARS {
            ChunkClassificationResult {
                chunk_type: ChunkType::SupportingContent,
                confidence: 0.60,
                reasoning: "General content without category-specific markers".to_string(),
                metadata: ChunkMetadata::Empty,
            }
        } else {
            ChunkClassificationResult {
                chunk_type: ChunkType::Unclassified,
                confidence: 0.30,
                reasoning: "Content too short to classify".to_string(),
                metadata: ChunkMetadata::Empty,
            }
        }
    }

    /// Category-specific metadata for `content`; `Empty` for categories
    /// without rich extraction.
    pub fn extract_metadata(&self, content: &str, chunk_type: ChunkType) -> ChunkMetadata {
        metadata::extract(&ChunkText::new(content), chunk_type)
    }
}
