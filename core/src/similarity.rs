//! Exact vector-space ranking.
//!
//! Every call reads the raw text of the whole registry, builds a tf-idf
//! matrix with the query as row 0 and ranks documents by cosine similarity to
//! that row. The persisted term index is never consulted.

use crate::document::read_content;
use crate::index::{DocId, Registry};
use crate::normalizer::{tokenize, Normalizer};
use crate::{EngineConfig, Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// One entry of the similarity result log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Full query text.
    pub terms: String,
    /// Document scores in ascending order.
    #[serde(with = "ordered_scores")]
    pub docs: Vec<(DocId, f64)>,
}

impl ScoreRecord {
    pub fn score(&self, doc_id: &str) -> Option<f64> {
        self.docs.iter().find(|(id, _)| id == doc_id).map(|(_, s)| *s)
    }

    /// Highest scoring document, if any.
    pub fn best(&self) -> Option<&(DocId, f64)> {
        self.docs.last()
    }
}

/// L2-normalized tf-idf rows, one per input text. Rows are ordered so sums
/// over equal rows come out bit-identical.
#[derive(Debug, Clone)]
pub struct TfIdfMatrix {
    rows: Vec<BTreeMap<String, f64>>,
}

impl TfIdfMatrix {
    /// Smoothed idf: ln((1 + n) / (1 + df)) + 1.
    pub fn fit<S: AsRef<str>>(texts: &[S], normalizer: &dyn Normalizer) -> Self {
        let mut counts: Vec<BTreeMap<String, f64>> = Vec::with_capacity(texts.len());
        let mut df: HashMap<String, usize> = HashMap::new();
        for text in texts {
            let cleaned = normalizer.clean_text(text.as_ref());
            let mut tf: BTreeMap<String, f64> = BTreeMap::new();
            for token in tokenize(&cleaned) {
                *tf.entry(token.to_string()).or_insert(0.0) += 1.0;
            }
            for term in tf.keys() {
                *df.entry(term.clone()).or_insert(0) += 1;
            }
            counts.push(tf);
        }

        let n = texts.len() as f64;
        let rows = counts
            .into_iter()
            .map(|mut row| {
                for (term, w) in row.iter_mut() {
                    let df_t = df.get(term).copied().unwrap_or(0) as f64;
                    *w *= ((1.0 + n) / (1.0 + df_t)).ln() + 1.0;
                }
                let norm = row.values().map(|w| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    row.values_mut().for_each(|w| *w /= norm);
                }
                row
            })
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// Cosine similarity of two rows; 0 when either row is empty.
    pub fn cosine(&self, a: usize, b: usize) -> f64 {
        let (ra, rb) = (&self.rows[a], &self.rows[b]);
        let (small, large) = if ra.len() <= rb.len() { (ra, rb) } else { (rb, ra) };
        small.iter().filter_map(|(t, w)| large.get(t).map(|v| w * v)).sum()
    }

    /// Similarity of row 0 to every other row, row 1 first.
    pub fn similarities_to_first(&self) -> Vec<f64> {
        (1..self.rows.len()).map(|i| self.cosine(0, i)).collect()
    }
}

/// Rank every registered document against `query`.
pub fn similarity_search(
    query: &str,
    registry: &Registry,
    config: &EngineConfig,
    normalizer: &dyn Normalizer,
) -> Result<ScoreRecord> {
    let mut texts: Vec<String> = Vec::with_capacity(registry.len() + 1);
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(registry.len());
    texts.push(query.to_string());
    for (doc_id, info) in registry {
        positions.insert(doc_id.as_str(), texts.len());
        texts.push(read_content(doc_id, &config.content_path(&info.local_path))?);
    }

    let matrix = TfIdfMatrix::fit(&texts, normalizer);
    let sims = matrix.similarities_to_first();

    let mut docs: Vec<(DocId, f64)> = Vec::with_capacity(registry.len());
    for doc_id in registry.keys() {
        let score = positions
            .remove(doc_id.as_str())
            .and_then(|pos| sims.get(pos - 1).copied())
            .ok_or_else(|| Error::UnscoredDocument(doc_id.clone()))?;
        docs.push((doc_id.clone(), score));
    }
    docs.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    tracing::debug!(num_docs = docs.len(), "ranked documents by cosine similarity");

    Ok(ScoreRecord { terms: query.to_string(), docs })
}

/// Serializes `Vec<(K, V)>` as a JSON object, keeping element order.
mod ordered_scores {
    use crate::index::DocId;
    use serde::de::{MapAccess, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(docs: &[(DocId, f64)], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(docs.iter().map(|(k, v)| (k, v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<(DocId, f64)>, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = Vec<(DocId, f64)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of document id to score")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    out.push(entry);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Generic;

    #[test]
    fn identical_texts_have_unit_similarity() {
        let m = TfIdfMatrix::fit(&["rust search engine", "rust search engine", "cooking pasta"], &Generic);
        assert!((m.cosine(0, 1) - 1.0).abs() < 1e-9);
        assert!(m.cosine(0, 2).abs() < 1e-9);
    }

    #[test]
    fn empty_query_scores_zero() {
        let m = TfIdfMatrix::fit(&["", "some words here"], &Generic);
        assert_eq!(m.similarities_to_first(), vec![0.0]);
    }

    #[test]
    fn record_keeps_ascending_order_in_json() {
        let record = ScoreRecord { terms: "q".into(), docs: vec![("zeta".into(), 0.1), ("alpha".into(), 0.9)] };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.find("zeta").unwrap() < json.find("alpha").unwrap());
        let back: ScoreRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
