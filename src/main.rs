use std::sync::Arc;

use clap::Parser;

mod cli;
mod config;
mod db;
mod extract;
mod indexer;
mod records;
mod search;
#[cfg(test)]
mod tests;

use config::Config;
use db::Database;
use extract::ocr::TesseractOcr;
use extract::Extractor;
use indexer::ContentIndexer;
use search::{FastembedEmbedder, SearchRequest, SearchService};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();
    let config = Config::load();

    let db = Database::open(config.db_path())?;
    // Idempotent, so every command can run against a fresh database.
    db.init_schema()?;

    match args.command {
        cli::Command::Init {} => {
            println!("schema ready at {}", config.db_path().display());
            Ok(())
        }

        cli::Command::Embed { batch_size } => {
            let service = search_service(&config, db)?;
            let batch_size = batch_size.unwrap_or(config.semantic.batch_size);
            let stats = service.generate_all_missing(batch_size)?;
            service.invalidate_indexes();
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }

        cli::Command::Extract {} => {
            let ocr = TesseractOcr::with_lang(&config.extraction.ocr_lang);
            let indexer = ContentIndexer::new(db, Extractor::new(Box::new(ocr)))?;
            let stats = indexer.index_all_missing()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }

        cli::Command::Search {
            query,
            limit,
            files_only,
            links_only,
            no_content,
        } => {
            let service = search_service(&config, db)?;
            let mut request = SearchRequest::new(query);
            request.limit = limit.unwrap_or(config.search_limit);
            request.include_files = !links_only;
            request.include_links = !files_only;
            request.include_content = !no_content;
            let response = service.search(&request)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }

        cli::Command::Stats {} => {
            let embeddings = db.embedding_stats()?;
            let content = db.content_stats()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "embeddings": embeddings,
                    "content": content,
                    "search_queries": db.search_query_count()?,
                }))?
            );
            Ok(())
        }
    }
}

fn search_service(config: &Config, db: Database) -> anyhow::Result<SearchService> {
    let embedder = FastembedEmbedder::new(&config.semantic.model, config.model_cache_dir())?;
    Ok(SearchService::new(db, Arc::new(embedder)))
}
