//! Output formatting for CLI commands.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::catalog::{ItemRecord, Manifest};
use crate::cli::args::{OutputFormat, ReelmatchArgs};
use crate::error::Result;
use crate::recommend::Recommendation;

/// Human-readable rendering of a command result.
pub trait HumanReadable {
    fn render(&self, verbosity: u8) -> String;
}

/// Result of a build.
#[derive(Debug, Serialize, Deserialize)]
pub struct BuildSummary {
    pub artifact_dir: String,
    pub build_id: String,
    pub item_count: usize,
    pub rating_count: usize,
    pub rated_items: usize,
    pub content_dimension: usize,
    pub collaborative_dimension: usize,
    pub n_trees: usize,
    pub duration_ms: u64,
}

/// One recommended item as printed.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationLine {
    pub title: String,
    pub external_id: String,
    pub url: String,
}

impl From<Recommendation> for RecommendationLine {
    fn from(recommendation: Recommendation) -> Self {
        let url = ItemRecord::new(&*recommendation.title, &*recommendation.external_id).imdb_url();
        Self {
            title: recommendation.title,
            external_id: recommendation.external_id,
            url,
        }
    }
}

/// Result of a single recommendation.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationOutput {
    pub title: String,
    pub model: String,
    pub recommendations: Vec<RecommendationLine>,
}

/// An unknown title with close matches.
#[derive(Debug, Serialize, Deserialize)]
pub struct NotFoundOutput {
    pub title: String,
    pub suggestions: Vec<String>,
}

/// Outcome of one batch request.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchLine {
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<RecommendationLine>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a batch run.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchOutput {
    pub results: Vec<BatchLine>,
    pub succeeded: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

impl HumanReadable for BuildSummary {
    fn render(&self, verbosity: u8) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Built artifact set in {}", self.artifact_dir);
        let _ = writeln!(
            out,
            "  items: {} ({} rated, {} ratings)",
            self.item_count, self.rated_items, self.rating_count
        );
        let _ = writeln!(out, "  content dimension (k1): {}", self.content_dimension);
        let _ = writeln!(
            out,
            "  collaborative dimension (k2): {}",
            self.collaborative_dimension
        );
        let _ = writeln!(out, "  trees: {}", self.n_trees);
        if verbosity > 1 {
            let _ = writeln!(out, "  build id: {}", self.build_id);
            let _ = writeln!(out, "  duration: {} ms", self.duration_ms);
        }
        out
    }
}

impl HumanReadable for RecommendationOutput {
    fn render(&self, verbosity: u8) -> String {
        let mut out = String::new();
        if verbosity > 0 {
            let _ = writeln!(
                out,
                "({} model) If you liked {}, you should watch:",
                self.model, self.title
            );
        }
        for (rank, line) in self.recommendations.iter().enumerate() {
            let _ = write!(out, "{:>3}. {}", rank + 1, line.title);
            if verbosity > 1 {
                let _ = write!(out, "  <{}>", line.url);
            }
            out.push('\n');
        }
        out
    }
}

impl HumanReadable for NotFoundOutput {
    fn render(&self, _verbosity: u8) -> String {
        let mut out = format!("Movie unrecognized: {:?}\n", self.title);
        if !self.suggestions.is_empty() {
            out.push_str("Did you mean:\n");
            for suggestion in &self.suggestions {
                let _ = writeln!(out, "  {suggestion}");
            }
        }
        out
    }
}

impl HumanReadable for BatchOutput {
    fn render(&self, verbosity: u8) -> String {
        let mut out = String::new();
        for result in &self.results {
            match (&result.recommendations, &result.error) {
                (Some(recommendations), _) => {
                    let titles: Vec<&str> =
                        recommendations.iter().map(|r| r.title.as_str()).collect();
                    let _ = writeln!(
                        out,
                        "[{}] {}: {}",
                        result.line,
                        result.title.as_deref().unwrap_or("?"),
                        titles.join(", ")
                    );
                }
                (None, Some(error)) => {
                    let _ = writeln!(out, "[{}] error: {error}", result.line);
                }
                (None, None) => {}
            }
        }
        if verbosity > 0 {
            let _ = writeln!(
                out,
                "{} succeeded, {} failed in {} ms",
                self.succeeded, self.failed, self.duration_ms
            );
        }
        out
    }
}

impl HumanReadable for Manifest {
    fn render(&self, verbosity: u8) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Build id:        {}", self.build_id);
        let _ = writeln!(out, "Created:         {}", self.created_at.to_rfc3339());
        let _ = writeln!(out, "Items:           {} ({} rated)", self.item_count, self.rated_items);
        let _ = writeln!(
            out,
            "Content dim:     {} ({:.1}% variance)",
            self.content_dimension,
            self.content_variance_retained * 100.0
        );
        let _ = writeln!(
            out,
            "Collab dim:      {} ({:.1}% variance)",
            self.collaborative_dimension,
            self.collaborative_variance_retained * 100.0
        );
        let _ = writeln!(out, "Trees:           {}", self.n_trees);
        if verbosity > 1 {
            for (name, entry) in &self.files {
                let _ = writeln!(out, "  {name:<24} {:>10} bytes  crc32 {:08x}", entry.size, entry.crc32);
            }
        }
        out
    }
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize + HumanReadable>(result: &T, args: &ReelmatchArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            print!("{}", result.render(args.verbosity()));
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &ReelmatchArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}
