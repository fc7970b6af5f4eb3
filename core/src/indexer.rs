use crate::document::Document;
use crate::index::{DocCounts, DocId, Registry, TermIndex};
use crate::normalizer::Normalizer;
use crate::persist::{IndexMeta, Store};
use crate::{EngineConfig, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of one indexing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Documents whose terms were merged in this pass.
    pub indexed: Vec<DocId>,
    /// Pending documents that cleaned to no terms; nothing of theirs is stored.
    pub empty: Vec<DocId>,
    pub new_terms: usize,
    pub total_terms: usize,
}

/// Registered documents that no term in the index refers to yet.
pub fn pending_documents(registry: &Registry, index: &TermIndex) -> BTreeSet<DocId> {
    let indexed = index.indexed_doc_ids();
    registry.keys().filter(|id| !indexed.contains(id.as_str())).cloned().collect()
}

/// Count the terms of every pending document and merge them into `index`.
/// Nothing is merged unless every pending document builds.
pub fn update_term_index(
    registry: &Registry,
    index: &mut TermIndex,
    config: &EngineConfig,
    normalizer: &dyn Normalizer,
) -> Result<IndexReport> {
    index.check_against(registry)?;
    let pending = pending_documents(registry, index);
    if pending.is_empty() {
        return Ok(IndexReport { total_terms: index.len(), ..IndexReport::default() });
    }

    let mut new_counts: BTreeMap<String, DocCounts> = BTreeMap::new();
    let (mut indexed, mut empty) = (Vec::new(), Vec::new());
    for doc_id in pending {
        let info = &registry[&doc_id];
        let doc = Document::from_info(&doc_id, info, config, normalizer)?;
        tracing::debug!(doc_id = %doc_id, terms = doc.term_freq.len(), chunks = doc.chunks.len(), "counted document");
        for (term, counts) in doc.to_doc_counts() {
            new_counts.entry(term).or_default().extend(counts);
        }
        if doc.term_freq.is_empty() { empty.push(doc_id) } else { indexed.push(doc_id) }
    }

    let before = index.len();
    index.merge(new_counts);
    Ok(IndexReport { indexed, empty, new_terms: index.len() - before, total_terms: index.len() })
}

/// Load registry and term index, index pending documents and persist the
/// whole term index when it changed.
pub fn run_indexer(store: &Store, config: &EngineConfig, normalizer: &dyn Normalizer) -> Result<IndexReport> {
    let registry = store.load_registry()?;
    let mut index = store.load_term_index()?;
    let report = update_term_index(&registry, &mut index, config, normalizer)?;
    if report.indexed.is_empty() {
        tracing::info!(
            num_docs = registry.len(),
            num_terms = index.len(),
            empty = report.empty.len(),
            "term index up to date"
        );
        return Ok(report);
    }
    store.save_term_index(&index)?;
    store.save_meta(&IndexMeta::now(registry.len(), index.len())?)?;
    tracing::info!(
        indexed = report.indexed.len(),
        new_terms = report.new_terms,
        num_terms = report.total_terms,
        normalizer = normalizer.name(),
        "term index updated"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DocumentInfo;

    #[test]
    fn pending_excludes_indexed_documents() {
        let mut registry = Registry::new();
        registry.insert("a".into(), DocumentInfo::new("a.txt", false));
        registry.insert("b".into(), DocumentInfo::new("b.txt", false));
        let mut index = TermIndex::new();
        index.merge(BTreeMap::from([("x".to_string(), DocCounts::from([("a".to_string(), 1)]))]));
        let pending = pending_documents(&registry, &index);
        assert_eq!(pending, BTreeSet::from(["b".to_string()]));
    }
}
