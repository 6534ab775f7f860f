use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database schema (idempotent).
    Init {},

    /// Generate embeddings for every file and link that lacks one,
    /// then invalidate the cached vector indexes.
    Embed {
        /// Items per progress-logged batch
        #[clap(long)]
        batch_size: Option<usize>,
    },

    /// Download and extract text content for files that have none yet.
    Extract {},

    /// Hybrid semantic + content search.
    Search {
        /// The query text
        query: String,

        /// Maximum results per kind
        #[clap(short, long)]
        limit: Option<usize>,

        /// Search files only
        #[clap(long, default_value = "false", conflicts_with = "links_only")]
        files_only: bool,

        /// Search links only
        #[clap(long, default_value = "false")]
        links_only: bool,

        /// Skip the extracted-content scan
        #[clap(long, default_value = "false")]
        no_content: bool,
    },

    /// Print embedding and content-extraction coverage.
    Stats {},
}
