//! Retrieved evidence attached to assistant turns.
//!
//! The query service returns passages, scores and metadata as three parallel
//! arrays that may disagree in length. They are folded into one record per
//! passage here, so nothing downstream ever indexes the raw arrays.

use crate::types::{EvidenceMetadata, QueryResponse};

/// One passage the service retrieved for an answer, with whatever it knows
/// about that passage.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedEvidence {
    pub passage: String,
    /// Relevance in `0.0..=1.0`. `None` means unknown, never zero.
    pub score: Option<f64>,
    pub metadata: Option<EvidenceMetadata>,
}

impl RetrievedEvidence {
    pub fn new(passage: impl Into<String>) -> Self {
        Self {
            passage: passage.into(),
            score: None,
            metadata: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_metadata(mut self, metadata: EvidenceMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Zips `contexts` with the entries of `scores` and `metadata` that share
/// its index. `contexts` decides the length; surplus scores or metadata are
/// dropped and missing ones become `None`.
pub fn align(
    contexts: Vec<String>,
    scores: &[Option<f64>],
    metadata: &[Option<EvidenceMetadata>],
) -> Vec<RetrievedEvidence> {
    contexts
        .into_iter()
        .enumerate()
        .map(|(i, passage)| RetrievedEvidence {
            passage,
            score: scores.get(i).copied().flatten(),
            metadata: metadata.get(i).cloned().flatten(),
        })
        .collect()
}

impl QueryResponse {
    /// Consumes the parallel arrays of this response into evidence records
    pub fn take_evidence(&mut self) -> Vec<RetrievedEvidence> {
        let contexts = std::mem::take(&mut self.contexts);
        let evidence = align(contexts, &self.scores, &self.metadata);
        self.scores.clear();
        self.metadata.clear();
        evidence
    }
}
