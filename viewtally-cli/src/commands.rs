//! CLI command implementations

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use viewtally_core::{ViewCountAggregator, ViewTallyConfig, select_extractor};

/// Corpus location overrides shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct CorpusArgs {
    /// JSON file of content records
    #[arg(long)]
    pub records: Option<PathBuf>,
    /// Content module source text scanned when no records file exists
    #[arg(long)]
    pub source_text: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
        #[command(flatten)]
        corpus: CorpusArgs,
    },
    /// Run one aggregation and print the summary as JSON
    Count {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
    /// Print the extracted identifiers without contacting any provider
    Ids {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the first configuration, corpus, provider or server error
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve { host, port, corpus } => serve(host, port, corpus).await,
        Commands::Count { corpus } => count(corpus).await,
        Commands::Ids { corpus } => ids(corpus).await,
    }
}

/// Reads the environment and applies command-line overrides on top.
fn load_config(corpus: CorpusArgs) -> anyhow::Result<ViewTallyConfig> {
    let mut config = ViewTallyConfig::from_env().context("Invalid environment configuration")?;
    apply_corpus_overrides(&mut config, corpus);
    Ok(config)
}

fn apply_corpus_overrides(config: &mut ViewTallyConfig, corpus: CorpusArgs) {
    if let Some(records) = corpus.records {
        config.corpus.records_path = Some(records);
    }
    if let Some(source_text) = corpus.source_text {
        config.corpus.source_text_path = Some(source_text);
    }
}

async fn serve(host: Option<String>, port: Option<u16>, corpus: CorpusArgs) -> anyhow::Result<()> {
    let mut config = load_config(corpus)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    viewtally_web::run_server(config)
        .await
        .map_err(|e| anyhow::anyhow!("Server failed: {e}"))
}

async fn count(corpus: CorpusArgs) -> anyhow::Result<()> {
    let config = load_config(corpus)?;
    let aggregator = ViewCountAggregator::from_config(&config)?;

    let summary = aggregator.aggregate().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if !summary.failed_providers.is_empty() {
        tracing::warn!(
            "Summary is partial; failed providers: {:?}",
            summary.failed_providers
        );
    }
    Ok(())
}

async fn ids(corpus: CorpusArgs) -> anyhow::Result<()> {
    let config = load_config(corpus)?;

    let mut ids = select_extractor(&config.corpus).extract().await?;
    ids.merge_supplementary(&config.aggregation.supplementary);

    tracing::info!(
        "Extracted {} YouTube videos, {} playlists, {} Vimeo videos",
        ids.youtube_videos.len(),
        ids.youtube_playlists.len(),
        ids.vimeo_videos.len()
    );
    println!("{}", serde_json::to_string_pretty(&ids)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Commands,
    }

    #[test]
    fn test_corpus_overrides_replace_defaults() {
        let mut config = ViewTallyConfig::default();
        apply_corpus_overrides(
            &mut config,
            CorpusArgs {
                records: Some(PathBuf::from("/tmp/records.json")),
                source_text: None,
            },
        );

        assert_eq!(
            config.corpus.records_path,
            Some(PathBuf::from("/tmp/records.json"))
        );
        assert_eq!(
            config.corpus.source_text_path,
            ViewTallyConfig::default().corpus.source_text_path
        );
    }

    #[test]
    fn test_parse_serve_flags() {
        let cli = TestCli::parse_from([
            "viewtally",
            "serve",
            "--port",
            "8080",
            "--records",
            "content.json",
        ]);

        match cli.command {
            Commands::Serve { host, port, corpus } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(8080));
                assert_eq!(corpus.records, Some(PathBuf::from("content.json")));
            }
            _ => panic!("expected serve"),
        }
    }
}
