//! Command implementations for the Reelmatch CLI.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::catalog::builder::Rating;
use crate::catalog::{ArtifactStore, BuildInput, Catalog, CatalogBuilder, FeatureEncoder, MovieRecord};
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::BuildConfig;
use crate::error::{ReelmatchError, Result};
use crate::recommend::{ModelChoice, RawRequest, Recommender, RecommendationRequest};
use crate::storage::StorageConfig;
use crate::storage::file::FileStorage;

/// Execute a CLI command.
pub fn execute_command(args: ReelmatchArgs) -> Result<()> {
    match &args.command {
        Command::Build(build_args) => build_artifacts(build_args, &args),
        Command::Recommend(recommend_args) => recommend(recommend_args, &args),
        Command::Batch(batch_args) => run_batch(batch_args, &args),
        Command::Stats(stats_args) => show_stats(stats_args, &args),
    }
}

/// An item line carrying a `"Title (YYYY)"` title and `|`-separated genres.
#[derive(Debug, Deserialize)]
struct RawMovieLine {
    title: String,
    #[serde(alias = "imdb_id")]
    external_id: String,
    #[serde(default)]
    genres: String,
}

/// Parse a JSON Lines file, skipping blank lines.
fn read_json_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| {
        ReelmatchError::invalid_input(format!("Cannot open {}: {e}", path.display()))
    })?;
    let mut records = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            ReelmatchError::invalid_input(format!(
                "{}:{}: {e}",
                path.display(),
                number + 1
            ))
        })?;
        records.push(record);
    }
    Ok(records)
}

fn load_build_config(args: &BuildArgs) -> Result<BuildConfig> {
    let mut config = match &args.config {
        Some(path) => {
            debug!("Loading build configuration from {}", path.display());
            BuildConfig::from_file(path)?
        }
        None => BuildConfig::default(),
    };
    if let Some(threshold) = args.variance_threshold {
        config = config.with_variance_threshold(threshold)?;
    }
    if let Some(n_trees) = args.n_trees {
        config = config.with_n_trees(n_trees);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    config.validate()?;
    Ok(config)
}

/// Open an existing artifact set and load its catalog.
fn open_catalog(artifact_dir: &Path) -> Result<Catalog> {
    let storage = FileStorage::open(artifact_dir, StorageConfig::default())
        .map_err(|e| e.into_load_error(&artifact_dir.display().to_string()))?;
    ArtifactStore::new(Arc::new(storage)).load()
}

/// Build an artifact set from item and rating tables.
fn build_artifacts(args: &BuildArgs, cli_args: &ReelmatchArgs) -> Result<()> {
    let start = Instant::now();
    let config = load_build_config(args)?;

    let movies: Vec<MovieRecord> = if args.raw_titles {
        read_json_lines::<RawMovieLine>(&args.items)?
            .into_iter()
            .map(|line| MovieRecord::from_raw(&line.title, &line.external_id, &line.genres))
            .collect()
    } else {
        read_json_lines(&args.items)?
    };
    let ratings: Vec<Rating> = read_json_lines(&args.ratings)?;
    info!(
        "Read {} item records and {} ratings",
        movies.len(),
        ratings.len()
    );

    let input = BuildInput {
        features: FeatureEncoder.encode(&movies)?,
        ratings,
    };
    let catalog = CatalogBuilder::new(config).build(&input)?;

    let storage = FileStorage::new(&args.artifact_dir, StorageConfig::default())?;
    let manifest = ArtifactStore::new(Arc::new(storage)).write(&catalog, args.force)?;

    output_result(
        &BuildSummary {
            artifact_dir: args.artifact_dir.display().to_string(),
            build_id: manifest.build_id.to_string(),
            item_count: manifest.item_count,
            rating_count: input.ratings.len(),
            rated_items: manifest.rated_items,
            content_dimension: manifest.content_dimension,
            collaborative_dimension: manifest.collaborative_dimension,
            n_trees: manifest.n_trees,
            duration_ms: start.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

/// Answer one recommendation request.
fn recommend(args: &RecommendArgs, cli_args: &ReelmatchArgs) -> Result<()> {
    let model: ModelChoice = args.model.parse()?;
    let request = RecommendationRequest::new(model, args.count, args.title.as_str());
    request.validate()?;

    let recommender = Recommender::new(Arc::new(open_catalog(&args.artifact_dir)?));
    match recommender.recommend(&request) {
        Ok(recommendations) => output_result(
            &RecommendationOutput {
                title: request.title.clone(),
                model: model.to_string(),
                recommendations: recommendations.into_iter().map(Into::into).collect(),
            },
            cli_args,
        ),
        Err(ReelmatchError::UnknownTitle(title)) => {
            let suggestions = recommender
                .catalog()
                .lookup()
                .suggest(&title, args.suggestions)
                .into_iter()
                .map(|(title, _)| title)
                .collect();
            output_result(
                &NotFoundOutput {
                    title: title.clone(),
                    suggestions,
                },
                cli_args,
            )?;
            Err(ReelmatchError::UnknownTitle(title))
        }
        Err(e) => Err(e),
    }
}

/// Answer a JSON Lines file of requests against one shared catalog.
///
/// Every line yields exactly one result; a bad line never aborts the batch.
fn run_batch(args: &BatchArgs, cli_args: &ReelmatchArgs) -> Result<()> {
    let file = File::open(&args.requests).map_err(|e| {
        ReelmatchError::invalid_input(format!("Cannot open {}: {e}", args.requests.display()))
    })?;
    let lines: Vec<(usize, String)> = BufReader::new(file)
        .lines()
        .enumerate()
        .map(|(i, line)| line.map(|l| (i + 1, l)))
        .collect::<std::io::Result<_>>()?;
    let lines: Vec<(usize, String)> = lines
        .into_iter()
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();

    let recommender = Recommender::new(Arc::new(open_catalog(&args.artifact_dir)?));
    let start = Instant::now();

    let answer = || -> Vec<BatchLine> {
        lines
            .par_iter()
            .map(|(number, line)| answer_line(&recommender, *number, line))
            .collect()
    };
    let results = match args.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| ReelmatchError::invalid_input(format!("Thread pool: {e}")))?
            .install(answer),
        None => answer(),
    };

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        warn!("{failed} of {} requests failed", results.len());
    }

    output_result(
        &BatchOutput {
            succeeded: results.len() - failed,
            failed,
            results,
            duration_ms: start.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

fn answer_line(recommender: &Recommender, number: usize, line: &str) -> BatchLine {
    let outcome = serde_json::from_str::<RawRequest>(line)
        .map_err(|e| ReelmatchError::invalid_request(format!("Malformed request: {e}")))
        .and_then(RecommendationRequest::try_from)
        .and_then(|request| {
            let recommendations = recommender.recommend(&request)?;
            Ok((request.title, recommendations))
        });

    match outcome {
        Ok((title, recommendations)) => BatchLine {
            line: number,
            title: Some(title),
            recommendations: Some(recommendations.into_iter().map(Into::into).collect()),
            error: None,
        },
        Err(e) => BatchLine {
            line: number,
            title: None,
            recommendations: None,
            error: Some(e.to_string()),
        },
    }
}

/// Show the manifest of an artifact set.
fn show_stats(args: &StatsArgs, cli_args: &ReelmatchArgs) -> Result<()> {
    let storage = FileStorage::open(&args.artifact_dir, StorageConfig::default())
        .map_err(|e| e.into_load_error(&args.artifact_dir.display().to_string()))?;
    let manifest = ArtifactStore::new(Arc::new(storage)).read_manifest()?;
    output_result(&manifest, cli_args)
}
