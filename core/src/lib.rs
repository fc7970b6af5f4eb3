//! Incremental term indexing and ranked retrieval over a registered corpus.

pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod indexer;
pub mod normalizer;
pub mod persist;
pub mod search;
pub mod similarity;
pub mod tfidf;

pub use config::{EngineConfig, MatchPolicy};
pub use document::Document;
pub use error::{Error, Result};
pub use index::{DocCounts, DocId, DocumentInfo, Registry, TermIndex};
pub use indexer::{run_indexer, update_term_index, IndexReport};
pub use normalizer::{Normalizer, NormalizerKind};
pub use persist::{IndexMeta, Store, StorePaths};
pub use search::{search, SearchRecord, SearchStrategy};
pub use similarity::ScoreRecord;
pub use tfidf::TfIdfRecord;
