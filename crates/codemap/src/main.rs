use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::{EmbeddingArgs, PipelineArgs};

#[derive(Parser)]
#[command(name = "codemap")]
#[command(author, version, about = "Java code graph indexing and semantic retrieval")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    embedding: EmbeddingArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the graph and embeddings for a project
    Index {
        /// Path to the project to index
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Path to the database file (default: .codemap.db in project root)
        #[arg(short, long)]
        database: Option<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank indexed elements by similarity to a query
    Search {
        /// Search query
        query: String,

        /// Path to the project root (default: current directory)
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Maximum results
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Only consider elements whose package starts with this prefix
        #[arg(long)]
        package: Option<String>,
    },

    /// Find the elements closest to an indexed element
    Similar {
        /// Element key, e.g. com.shop.model.Cart
        key: String,

        #[arg(short, long)]
        project: Option<PathBuf>,

        #[arg(short, long)]
        database: Option<PathBuf>,

        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Answer a code query in semantic or structural mode
    Query {
        /// Query text (required unless --structural)
        query: Option<String>,

        /// Package prefix or element key to focus on
        #[arg(short, long)]
        context: Option<String>,

        /// Summarize the graph instead of ranking embeddings
        #[arg(long)]
        structural: bool,

        /// Leave out the source excerpt block
        #[arg(long)]
        no_source: bool,

        #[arg(short = 'n', long, default_value = "5")]
        max_results: usize,

        #[arg(short, long)]
        project: Option<PathBuf>,

        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show the call tree below a method
    Explain {
        /// Method key, e.g. com.shop.service.checkout
        key: String,

        /// How many call levels to expand (at most 12)
        #[arg(long, default_value_t = codemap_retrieval::DEFAULT_EXPLAIN_DEPTH)]
        depth: usize,

        /// Print the tree as JSON, sources included
        #[arg(long)]
        json: bool,

        #[arg(short, long)]
        project: Option<PathBuf>,

        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show index statistics
    Stats {
        #[arg(short, long)]
        project: Option<PathBuf>,

        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Index a project, then rebuild whenever its Java sources change
    Watch {
        #[arg(default_value = ".")]
        path: PathBuf,

        #[arg(short, long)]
        database: Option<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout is reserved for command output
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let embedding = cli.embedding;
    match cli.command {
        Commands::Index {
            path,
            database,
            pipeline,
            json,
        } => commands::index(&path, database, embedding, pipeline, json).await,
        Commands::Search {
            query,
            project,
            database,
            limit,
            package,
        } => commands::search(query, project, database, embedding, limit, package).await,
        Commands::Similar {
            key,
            project,
            database,
            limit,
        } => commands::similar(key, project, database, embedding, limit).await,
        Commands::Query {
            query,
            context,
            structural,
            no_source,
            max_results,
            project,
            database,
        } => {
            let request = commands::query_request(query, context, structural, no_source, max_results);
            commands::query(request, project, database, embedding).await
        }
        Commands::Explain {
            key,
            depth,
            json,
            project,
            database,
        } => commands::explain(key, depth, json, project, database, embedding).await,
        Commands::Stats { project, database } => commands::stats(project, database).await,
        Commands::Watch {
            path,
            database,
            pipeline,
        } => commands::watch(&path, database, embedding, pipeline).await,
    }
}
