//! Classification runs over stored chunks.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use super::{ChunkClassificationResult, ChunkClassifier, ChunkType, ClassificationError};
use crate::config::ClassificationConfig;
use crate::db::{ChunkRecord, ChunkRepository};

/// Classification of one chunk inside a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationOutcome {
    pub chunk_id: String,
    pub result: ChunkClassificationResult,
}

/// Counts returned by [`ClassificationService::reclassify_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReclassifySummary {
    /// Chunks that ended up in a category other than `unclassified`.
    pub classified: usize,
    /// Chunks whose classification failed (confidence `0.0`).
    pub errors: usize,
}

/// Per-type breakdown of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassificationStats {
    pub total: usize,
    pub by_type: BTreeMap<ChunkType, usize>,
    pub average_confidence: f64,
}

impl ClassificationStats {
    pub fn from_outcomes(outcomes: &[ClassificationOutcome]) -> Self {
        let mut by_type = BTreeMap::new();
        let mut confidence_sum = 0.0;
        for outcome in outcomes {
            *by_type.entry(outcome.result.chunk_type).or_insert(0) += 1;
            confidence_sum += outcome.result.confidence;
        }
        Self {
            total: outcomes.len(),
            by_type,
            average_confidence: if outcomes.is_empty() {
                0.0
            } else {
                confidence_sum / outcomes.len() as f64
            },
        }
    }
}

impl ReclassifySummary {
    pub fn from_outcomes(outcomes: &[ClassificationOutcome]) -> Self {
        Self {
            classified: outcomes
                .iter()
                .filter(|o| o.result.chunk_type != ChunkType::Unclassified)
                .count(),
            errors: outcomes
                .iter()
                .filter(|o| o.result.confidence == 0.0)
                .count(),
        }
    }
}

/// Classifies chunks and writes the results back through a [`ChunkRepository`].
pub struct ClassificationService {
    classifier: Arc<ChunkClassifier>,
    chunks: Arc<dyn ChunkRepository>,
    group_size: usize,
    group_delay: Duration,
}

impl ClassificationService {
    pub fn new(
        classifier: Arc<ChunkClassifier>,
        chunks: Arc<dyn ChunkRepository>,
        config: &ClassificationConfig,
    ) -> Self {
        Self {
            classifier,
            chunks,
            group_size: config.group_size.max(1),
            group_delay: Duration::from_millis(config.group_delay_ms),
        }
    }

    pub fn classifier(&self) -> &ChunkClassifier {
        &self.classifier
    }

    /// Classifies one chunk and stores the result.
    pub async fn classify_chunk(
        &self,
        chunk_id: &str,
        content: &str,
    ) -> Result<ChunkClassificationResult, ClassificationError> {
        if chunk_id.trim().is_empty() {
            return Err(ClassificationError::InvalidChunk {
                chunk_id: chunk_id.to_string(),
                reason: "chunk id is empty".to_string(),
            });
        }

        let result = self.classifier.classify(content);
        if !self.chunks.update_classification(chunk_id, &result).await? {
            return Err(ClassificationError::InvalidChunk {
                chunk_id: chunk_id.to_string(),
                reason: "chunk does not exist".to_string(),
            });
        }
        Ok(result)
    }

    /// Classifies `chunks` in sequential groups, concurrently within a group.
    ///
    /// A failing chunk is reported as `unclassified` with confidence `0.0`;
    /// the rest of the run continues.
    pub async fn classify_batch(&self, chunks: &[ChunkRecord]) -> Vec<ClassificationOutcome> {
        let mut outcomes = Vec::with_capacity(chunks.len());

        for (index, group) in chunks.chunks(self.group_size).enumerate() {
            if index > 0 && !self.group_delay.is_zero() {
                tokio::time::sleep(self.group_delay).await;
            }

            let results = join_all(group.iter().map(|chunk| async move {
                let result = match self.classify_chunk(&chunk.id, &chunk.content).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(chunk_id = %chunk.id, error = %e, "Chunk classification failed");
                        ChunkClassificationResult::failed(e.to_string())
                    }
                };
                ClassificationOutcome {
                    chunk_id: chunk.id.clone(),
                    result,
                }
            }))
            .await;

            outcomes.extend(results);
        }

        let stats = ClassificationStats::from_outcomes(&outcomes);
        info!(
            total = stats.total,
            average_confidence = stats.average_confidence,
            by_type = ?stats.by_type,
            "Classification batch finished"
        );

        outcomes
    }

    /// Re-runs classification over every chunk of a document.
    pub async fn reclassify_document(
        &self,
        document_id: &str,
    ) -> Result<ReclassifySummary, ClassificationError> {
        let span = info_span!("reclassify", document_id = %document_id);
        async {
            let chunks = self.chunks.list_for_document(document_id).await?;
            let outcomes = self.classify_batch(&chunks).await;
            let summary = ReclassifySummary::from_outcomes(&outcomes);
            info!(
                chunks = chunks.len(),
                classified = summary.classified,
                errors = summary.errors,
                "Document reclassified"
            );
            Ok(summary)
        }
        .instrument(span)
        .await
    }
}
