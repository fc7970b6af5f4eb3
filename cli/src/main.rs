use agora_core::indexer::{pending_documents, run_indexer};
use agora_core::{
    search, DocId, DocumentInfo, EngineConfig, MatchPolicy, NormalizerKind, Registry, SearchRecord, SearchStrategy, Store,
};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "agora")]
#[command(about = "Register documents, maintain the term index and search the corpus", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Store directory holding the registry, term index and result logs
    #[arg(long, env = "AGORA_ROOT", default_value = "./agora", global = true)]
    root: PathBuf,
    /// Directory registered paths are relative to [default: <root>/data]
    #[arg(long, env = "AGORA_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,
    /// Text normalizer for indexing and searching
    #[arg(long, value_enum, default_value_t = NormalizerArg::Greek, global = true)]
    normalizer: NormalizerArg,
    /// Separator between terms inside a chunk
    #[arg(long, default_value = " ", global = true)]
    term_sep: String,
    /// How query terms are matched against index terms by the tf-idf scorer
    #[arg(long, value_enum, default_value_t = MatchArg::Substring, global = true)]
    match_policy: MatchArg,
}

#[derive(Subcommand)]
enum Commands {
    /// Register one document
    Add {
        id: String,
        /// Content path, relative to the data directory
        path: String,
        /// Split the document into chunks
        #[arg(long, default_value_t = false)]
        chunks: bool,
        /// Chunk separator; accepts \n, \t, \r and \\ escapes
        #[arg(long, default_value = "\\n")]
        chunk_sep: String,
        #[arg(long)]
        url: Option<String>,
    },
    /// Register every document of a JSON object {id: {has_chunks, local_path, chunk_separator?, url?}}
    BulkAdd { file: PathBuf },
    /// Register every file with the given extension under a directory of the data directory
    AddDir {
        /// Directory relative to the data directory
        dir: String,
        #[arg(long, default_value = "txt")]
        extension: String,
        #[arg(long, default_value_t = false)]
        chunks: bool,
        #[arg(long, default_value = "\\n")]
        chunk_sep: String,
    },
    /// Merge registered documents not yet in the term index
    Index,
    /// Rank documents against a query and append the result to the result log
    Search {
        /// Query text
        #[arg(required_unless_present = "query_file")]
        query: Option<String>,
        /// Read the query from a file, one term per line
        #[arg(long, conflicts_with = "query")]
        query_file: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ScorerArg::TfIdf)]
        scorer: ScorerArg,
        /// Update the term index before searching
        #[arg(long, default_value_t = false)]
        update: bool,
        /// Number of documents to print
        #[arg(long, default_value_t = 10)]
        k: usize,
    },
    /// Show registry and index sizes
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum NormalizerArg {
    Generic,
    Greek,
    English,
}

impl From<NormalizerArg> for NormalizerKind {
    fn from(arg: NormalizerArg) -> Self {
        match arg {
            NormalizerArg::Generic => NormalizerKind::Generic,
            NormalizerArg::Greek => NormalizerKind::Greek,
            NormalizerArg::English => NormalizerKind::English,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ScorerArg {
    /// Cosine similarity over freshly read documents
    Similarity,
    /// tf-idf from the persisted term index
    TfIdf,
}

impl From<ScorerArg> for SearchStrategy {
    fn from(arg: ScorerArg) -> Self {
        match arg {
            ScorerArg::Similarity => SearchStrategy::VectorSpace,
            ScorerArg::TfIdf => SearchStrategy::TfIdf,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MatchArg {
    Substring,
    Exact,
}

impl From<MatchArg> for MatchPolicy {
    fn from(arg: MatchArg) -> Self {
        match arg {
            MatchArg::Substring => MatchPolicy::Substring,
            MatchArg::Exact => MatchPolicy::Exact,
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let global = cli.global;
    let store = Store::open(&global.root).with_context(|| format!("opening store at {}", global.root.display()))?;
    let data_dir = global.data_dir.clone().unwrap_or_else(|| global.root.join("data"));
    let config = EngineConfig::new(&data_dir)
        .with_term_separator(global.term_sep.clone())
        .with_match_policy(global.match_policy.into());
    let kind: NormalizerKind = global.normalizer.into();
    let _lock = store.lock()?;

    match cli.command {
        Commands::Add { id, path, chunks, chunk_sep, url } => {
            ensure_content(&config, &path)?;
            let mut info = DocumentInfo::new(path, chunks).with_chunk_separator(unescape(&chunk_sep));
            info.url = url;
            store.add_document(id, info)?;
        }
        Commands::BulkAdd { file } => {
            let text = fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let infos: Registry = serde_json::from_str(&text).with_context(|| format!("parsing {}", file.display()))?;
            for info in infos.values() {
                ensure_content(&config, &info.local_path)?;
            }
            let added = store.add_documents(infos.into_iter().collect())?;
            println!("registered {added} documents");
        }
        Commands::AddDir { dir, extension, chunks, chunk_sep } => {
            let entries = collect_dir(&config.data_dir, &dir, &extension, chunks, &unescape(&chunk_sep))?;
            let added = store.add_documents(entries)?;
            println!("registered {added} documents");
        }
        Commands::Index => {
            let report = run_indexer(&store, &config, kind.normalizer())?;
            println!("indexed {} documents, {} new terms, {} terms total", report.indexed.len(), report.new_terms, report.total_terms);
            if !report.empty.is_empty() {
                println!("no terms found in: {}", report.empty.join(", "));
            }
        }
        Commands::Search { query, query_file, scorer, update, k } => {
            let query = match (query, query_file) {
                (Some(q), _) => q,
                (None, Some(path)) => fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?,
                (None, None) => bail!("a query or --query-file is required"),
            };
            if update {
                run_indexer(&store, &config, kind.normalizer())?;
            }
            let record = search(&store, &config, kind.normalizer(), scorer.into(), &query)?;
            print_ranking(&record, k);
        }
        Commands::Status => {
            let registry = store.load_registry()?;
            let index = store.load_term_index()?;
            let pending = pending_documents(&registry, &index);
            println!("root:       {}", store.paths.root.display());
            println!("documents:  {}", registry.len());
            println!("indexed:    {}", registry.len() - pending.len());
            println!("pending:    {}", pending.len());
            println!("terms:      {}", index.len());
            if let Some(meta) = store.load_meta()? {
                println!("updated at: {}", meta.updated_at);
            }
        }
    }
    Ok(())
}

fn ensure_content(config: &EngineConfig, local_path: &str) -> Result<()> {
    let path = config.content_path(local_path);
    if !path.is_file() {
        bail!("text path does not exist: {}", path.display());
    }
    Ok(())
}

fn collect_dir(data_dir: &Path, dir: &str, extension: &str, chunks: bool, chunk_sep: &str) -> Result<Vec<(DocId, DocumentInfo)>> {
    let base = data_dir.join(dir);
    if !base.is_dir() {
        bail!("not a directory: {}", base.display());
    }
    let mut entries = Vec::new();
    for entry in WalkDir::new(&base).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        let p = entry.path();
        if !p.is_file() || p.extension().and_then(|s| s.to_str()) != Some(extension) {
            continue;
        }
        let local_path = p.strip_prefix(data_dir)?.to_string_lossy().replace('\\', "/");
        let id = p.strip_prefix(&base)?.with_extension("").to_string_lossy().replace('\\', "/");
        entries.push((id, DocumentInfo::new(local_path, chunks).with_chunk_separator(chunk_sep)));
    }
    tracing::debug!(dir = %base.display(), found = entries.len(), "collected documents");
    Ok(entries)
}

fn print_ranking(record: &SearchRecord, k: usize) {
    match record {
        SearchRecord::Similarity(r) => {
            for (doc_id, score) in r.docs.iter().rev().take(k) {
                println!("{score:.4}\t{doc_id}");
            }
        }
        SearchRecord::TfIdf(r) => {
            let mut docs: Vec<(&String, &f64)> = r.average_score_per_document.iter().collect();
            docs.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
            for (doc_id, score) in docs.into_iter().take(k) {
                println!("{score:.4}\t{doc_id}");
            }
            if r.terms.is_empty() {
                println!("no query term found in the term index");
            }
        }
    }
}

/// Resolve the escapes a shell leaves literal in separator arguments.
fn unescape(sep: &str) -> String {
    let mut out = String::with_capacity(sep.len());
    let mut chars = sep.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
