//! Ranking straight from the persisted term index. No document is re-read;
//! idf is recomputed per query from the current registry size.

use crate::index::{DocId, Registry, TermIndex};
use crate::{Error, MatchPolicy, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type TermScores = BTreeMap<DocId, f64>;

/// One entry of the tf-idf result log: per-term document scores, stored next
/// to the two aggregate maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TfIdfRecord {
    #[serde(flatten)]
    pub terms: BTreeMap<String, TermScores>,
    /// Mean over all registered documents.
    pub average_score_per_term: BTreeMap<String, f64>,
    /// Sum of each term's score divided by the number of scored terms.
    pub average_score_per_document: BTreeMap<DocId, f64>,
}

/// ln(total_docs / docs_with_term).
pub fn idf(total_docs: usize, docs_with_term: usize) -> Result<f64> {
    if total_docs == 0 || docs_with_term == 0 {
        return Err(Error::EmptyCorpus);
    }
    Ok((total_docs as f64 / docs_with_term as f64).ln())
}

/// tf-idf of the index term matching `term`, for every document containing it.
pub fn tf_idf_for_term(term: &str, index: &TermIndex, registry: &Registry, policy: MatchPolicy) -> Result<TermScores> {
    let (key, counts) = index.lookup(term, policy)?;
    if counts.is_empty() {
        return Err(Error::UnknownTerm(term.to_string()));
    }
    if let Some(doc_id) = counts.keys().find(|id| !registry.contains_key(*id)) {
        return Err(Error::InconsistentIndex { term: key.to_string(), doc_id: doc_id.clone() });
    }
    let idf = idf(registry.len(), counts.len())?;
    Ok(counts.iter().map(|(doc_id, tf)| (doc_id.clone(), idf * f64::from(*tf))).collect())
}

pub fn average_score_per_term(terms: &BTreeMap<String, TermScores>, total_docs: usize) -> Result<BTreeMap<String, f64>> {
    if total_docs == 0 {
        return Err(Error::EmptyCorpus);
    }
    Ok(terms.iter().map(|(term, scores)| (term.clone(), scores.values().sum::<f64>() / total_docs as f64)).collect())
}

pub fn average_score_per_document(terms: &BTreeMap<String, TermScores>) -> BTreeMap<DocId, f64> {
    let nb_terms = terms.len() as f64;
    let mut doc_scores: BTreeMap<DocId, f64> = BTreeMap::new();
    for scores in terms.values() {
        for (doc_id, score) in scores {
            *doc_scores.entry(doc_id.clone()).or_insert(0.0) += score / nb_terms;
        }
    }
    doc_scores
}

/// Score already-normalized query terms. Terms without an index entry are
/// skipped.
pub fn tfidf_search(terms: &[String], registry: &Registry, index: &TermIndex, policy: MatchPolicy) -> Result<TfIdfRecord> {
    if registry.is_empty() {
        return Err(Error::EmptyCorpus);
    }
    let mut scored: BTreeMap<String, TermScores> = BTreeMap::new();
    for term in terms {
        match tf_idf_for_term(term, index, registry, policy) {
            Ok(scores) => {
                scored.insert(term.clone(), scores);
            }
            Err(Error::UnknownTerm(t)) => {
                tracing::debug!(term = %t, "query term not in index");
            }
            Err(e) => return Err(e),
        }
    }
    let average_score_per_term = average_score_per_term(&scored, registry.len())?;
    let average_score_per_document = average_score_per_document(&scored);
    tracing::debug!(query_terms = terms.len(), scored_terms = scored.len(), "scored query with tf-idf");
    Ok(TfIdfRecord { terms: scored, average_score_per_term, average_score_per_document })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idf_is_monotone_in_document_frequency() {
        let rare = idf(10, 2).unwrap();
        let common = idf(10, 5).unwrap();
        assert!(rare > common);
        assert_eq!(idf(10, 10).unwrap(), 0.0);
    }

    #[test]
    fn idf_on_empty_corpus_is_an_error() {
        assert!(matches!(idf(0, 0), Err(Error::EmptyCorpus)));
    }

    #[test]
    fn per_document_average_initializes_to_zero() {
        let terms = BTreeMap::from([
            ("a".to_string(), TermScores::from([("D".to_string(), 4.0)])),
            ("b".to_string(), TermScores::from([("D".to_string(), 4.0)])),
        ]);
        let per_doc = average_score_per_document(&terms);
        assert_eq!(per_doc["D"], 4.0);
    }

    #[test]
    fn per_term_average_divides_by_all_documents() {
        let terms = BTreeMap::from([("a".to_string(), TermScores::from([("D".to_string(), 3.0)]))]);
        let per_term = average_score_per_term(&terms, 3).unwrap();
        assert_eq!(per_term["a"], 1.0);
    }

    #[test]
    fn record_flattens_terms_beside_aggregates() {
        let terms = BTreeMap::from([("λογος".to_string(), TermScores::from([("D".to_string(), 1.5)]))]);
        let record = TfIdfRecord {
            average_score_per_term: average_score_per_term(&terms, 1).unwrap(),
            average_score_per_document: average_score_per_document(&terms),
            terms,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["λογος"]["D"], 1.5);
        assert_eq!(value["average_score_per_document"]["D"], 1.5);
        let back: TfIdfRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
