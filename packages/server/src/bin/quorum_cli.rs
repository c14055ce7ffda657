//! Operator CLI for post storage
//!
//! Runs migrations, issues signed upload URLs, applies upserts from JSON and
//! prints posts/options as JSON on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use quorum_core::common::{CustomerId, OptionId, PostId};
use quorum_core::config::Config;
use quorum_core::domains::posts::{
    generate_signed_option_url, get_options_by_filter, get_posts_by_filter, upsert_post,
    DesignPhase, GenerateSignedOptionUrlRequest, GetOptionsByFilterRequest,
    GetPostsByFilterRequest, PostCategory, PostError, UpsertPostOptionRequest, UpsertPostRequest,
};
use quorum_core::kernel::{OpendalObjectStore, ServerDeps};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "quorum_cli")]
#[command(about = "Post storage operations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Issue a signed upload URL for an option image
    SignUpload {
        #[arg(long)]
        file_name: String,
        #[arg(long)]
        content_type: String,
    },

    /// Create or update a post from a JSON file
    Upsert { path: PathBuf },

    /// Print posts (all posts when no ids are given)
    ShowPosts { ids: Vec<PostId> },

    /// Print options of the given posts
    ShowOptions { post_ids: Vec<PostId> },
}

// ============================================================================
// JSON Types
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertPostInput {
    id: PostId,
    author_id: CustomerId,
    design_phase: Option<DesignPhase>,
    context: Option<String>,
    category: Option<PostCategory>,
    opens_at: Option<DateTime<Utc>>,
    closes_at: Option<DateTime<Utc>>,
    #[serde(default)]
    options: Vec<UpsertOptionInput>,
    tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertOptionInput {
    id: OptionId,
    position: i32,
    bucket: Option<String>,
    file_key: Option<String>,
}

impl From<UpsertPostInput> for UpsertPostRequest {
    fn from(input: UpsertPostInput) -> Self {
        let options = input
            .options
            .into_iter()
            .map(|o| match (o.bucket, o.file_key) {
                (Some(bucket), Some(file_key)) => {
                    UpsertPostOptionRequest::signed(o.id, o.position, bucket, file_key)
                }
                _ => UpsertPostOptionRequest::existing(o.id, o.position),
            })
            .collect::<Vec<_>>();

        UpsertPostRequest::builder()
            .id(input.id)
            .author_id(input.author_id)
            .design_phase(input.design_phase)
            .context(input.context)
            .category(input.category)
            .opens_at(input.opens_at)
            .closes_at(input.closes_at)
            .options(options)
            .tags(input.tags)
            .build()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    kind: String,
    message: String,
}

fn output<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,quorum_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    if let Commands::Migrate = cli.command {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;
        tracing::info!("Migrations complete");
        return Ok(());
    }

    let object_store = OpendalObjectStore::from_config(&config.storage)
        .context("Failed to configure object store")?;
    let deps = ServerDeps::new(pool, Arc::new(object_store), config.posts);

    let result = run(cli.command, &deps).await;
    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        output(&ErrorResponse {
            success: false,
            kind: format!("{:?}", e.kind()),
            message: e.public_message(),
        })?;
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Commands, deps: &ServerDeps) -> Result<(), PostError> {
    match command {
        Commands::Migrate => Ok(()),
        Commands::SignUpload {
            file_name,
            content_type,
        } => {
            let signed = generate_signed_option_url(
                GenerateSignedOptionUrlRequest {
                    file_name,
                    content_type,
                },
                deps,
            )
            .await?;
            output(&signed)?;
            Ok(())
        }
        Commands::Upsert { path } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let input: UpsertPostInput =
                serde_json::from_str(&raw).context("Invalid upsert request JSON")?;
            let post_id = input.id;

            upsert_post(input.into(), deps).await?;

            let posts = get_posts_by_filter(
                GetPostsByFilterRequest {
                    ids: vec![post_id],
                },
                deps,
            )
            .await?;
            output(&posts)?;
            Ok(())
        }
        Commands::ShowPosts { ids } => {
            let posts = get_posts_by_filter(GetPostsByFilterRequest { ids }, deps).await?;
            output(&posts)?;
            Ok(())
        }
        Commands::ShowOptions { post_ids } => {
            let options = get_options_by_filter(
                GetOptionsByFilterRequest {
                    ids: Vec::new(),
                    post_ids,
                },
                deps,
            )
            .await?;
            output(&options)?;
            Ok(())
        }
    }
}
