use crate::normalizer::{query_terms, Normalizer};
use crate::persist::Store;
use crate::similarity::{similarity_search, ScoreRecord};
use crate::tfidf::{tfidf_search, TfIdfRecord};
use crate::{EngineConfig, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchStrategy {
    /// Cosine similarity over freshly read documents.
    VectorSpace,
    /// tf-idf from the persisted term index.
    TfIdf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchRecord {
    Similarity(ScoreRecord),
    TfIdf(TfIdfRecord),
}

/// Run one search and append its record to the matching result log.
pub fn search(
    store: &Store,
    config: &EngineConfig,
    normalizer: &dyn Normalizer,
    strategy: SearchStrategy,
    query: &str,
) -> Result<SearchRecord> {
    let registry = store.load_registry()?;
    match strategy {
        SearchStrategy::VectorSpace => {
            let record = similarity_search(query, &registry, config, normalizer)?;
            store.append_similarity(&record)?;
            tracing::info!(num_docs = record.docs.len(), "similarity results saved");
            Ok(SearchRecord::Similarity(record))
        }
        SearchStrategy::TfIdf => {
            let index = store.load_term_index()?;
            let terms = query_terms(normalizer, query);
            let record = tfidf_search(&terms, &registry, &index, config.match_policy)?;
            store.append_tfidf(&record)?;
            tracing::info!(scored_terms = record.terms.len(), "tf-idf results saved");
            Ok(SearchRecord::TfIdf(record))
        }
    }
}
