//! Retrieve command handler.
//!
//! Ranks local files against a query with the retrieval engine, without
//! calling an LLM.

use crate::services;
use clap::Args;
use ragline_core::{config::AppConfig, AppError, AppResult};
use ragline_knowledge::parser;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Rank local documents by relevance to a query
#[derive(Args, Debug)]
pub struct RetrieveCommand {
    /// The query to rank documents against
    pub query: String,

    /// Number of documents to return (default: retrieval.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// File or directory to read documents from (repeatable)
    #[arg(long = "path", required = true)]
    pub paths: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RetrieveCommand {
    /// Execute the retrieve command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing retrieve command");
        tracing::debug!("Retrieve options: {:?}", self);

        let (sources, documents) = collect_documents(&self.paths);
        if documents.is_empty() {
            return Err(AppError::Knowledge(
                "No readable documents found in the given paths".to_string(),
            ));
        }

        let engine = services::retrieval_engine(config).await?;
        let top_k = self.top_k.unwrap_or(config.retrieval.top_k);
        let ranked = engine.retrieve_ranked(&documents, &self.query, top_k).await?;

        if self.json {
            let results: Vec<serde_json::Value> = ranked
                .iter()
                .map(|doc| {
                    serde_json::json!({
                        "path": sources[doc.position].display().to_string(),
                        "distance": doc.distance,
                        "text": doc.text,
                    })
                })
                .collect();
            let output = serde_json::json!({
                "query": self.query,
                "results": results,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            for (rank, doc) in ranked.iter().enumerate() {
                println!(
                    "{}. {} (distance: {:.4})",
                    rank + 1,
                    sources[doc.position].display(),
                    doc.distance
                );
                println!("   {}", preview(&doc.text, 160));
            }
        }

        Ok(())
    }
}

/// Read every parseable file under `paths`, returning each source path next
/// to its text. Unreadable or binary files are skipped.
fn collect_documents(paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<String>) {
    let mut sources = Vec::new();
    let mut documents = Vec::new();

    for root in paths {
        let files: Vec<PathBuf> = if root.is_file() {
            vec![root.clone()]
        } else {
            WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .collect()
        };

        for file in files {
            match parser::parse_file(&file) {
                Ok(text) if !text.trim().is_empty() => {
                    sources.push(file);
                    documents.push(text);
                }
                Ok(_) => tracing::debug!("Skipping empty document {:?}", file),
                Err(e) => tracing::warn!("Skipping {:?}: {}", file, e),
            }
        }
    }

    tracing::debug!("Collected {} documents", documents.len());
    (sources, documents)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// First `max_chars` characters on one line.
fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
