//! Serving requests and responses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ReelmatchError, Result};
use crate::vector::index::IndexKind;

/// Which index answers a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelChoice {
    /// Exact search over content embeddings.
    Exact,
    /// Approximate search over collaborative embeddings.
    Approximate,
}

impl ModelChoice {
    pub fn index_kind(&self) -> IndexKind {
        match self {
            ModelChoice::Exact => IndexKind::Flat,
            ModelChoice::Approximate => IndexKind::Forest,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelChoice::Exact => "exact",
            ModelChoice::Approximate => "approximate",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelChoice {
    type Err = ReelmatchError;

    /// Case-insensitive. `faiss` and `annoy` are accepted as aliases.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "exact" | "faiss" => Ok(ModelChoice::Exact),
            "approximate" | "annoy" => Ok(ModelChoice::Approximate),
            _ => Err(ReelmatchError::invalid_request(format!(
                "Unknown model choice {s:?}; expected exact or approximate"
            ))),
        }
    }
}

impl TryFrom<String> for ModelChoice {
    type Error = ReelmatchError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ModelChoice> for String {
    fn from(model: ModelChoice) -> Self {
        model.name().to_string()
    }
}

/// A validated recommendation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRequest")]
pub struct RecommendationRequest {
    pub model: ModelChoice,
    pub n_recommendations: usize,
    pub title: String,
}

impl RecommendationRequest {
    pub fn new<S: Into<String>>(model: ModelChoice, n_recommendations: usize, title: S) -> Self {
        Self {
            model,
            n_recommendations,
            title: title.into(),
        }
    }

    /// Reject requests that can never be answered.
    pub fn validate(&self) -> Result<()> {
        if self.n_recommendations == 0 {
            return Err(ReelmatchError::invalid_request(
                "n_recommendations must be a positive integer",
            ));
        }
        Ok(())
    }
}

/// A request as it arrives on the wire, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRequest {
    pub model: String,
    pub n_recommendations: i64,
    #[serde(alias = "movie_title")]
    pub title: String,
}

impl TryFrom<RawRequest> for RecommendationRequest {
    type Error = ReelmatchError;

    fn try_from(raw: RawRequest) -> Result<Self> {
        let model = raw.model.parse()?;
        let n_recommendations = usize::try_from(raw.n_recommendations).map_err(|_| {
            ReelmatchError::invalid_request(format!(
                "n_recommendations must be a positive integer, got {}",
                raw.n_recommendations
            ))
        })?;
        let request = RecommendationRequest::new(model, n_recommendations, raw.title);
        request.validate()?;
        Ok(request)
    }
}

/// One recommended item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub item: usize,
    pub title: String,
    pub external_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_choice_parsing() {
        assert_eq!("Exact".parse::<ModelChoice>().unwrap(), ModelChoice::Exact);
        assert_eq!("FAISS".parse::<ModelChoice>().unwrap(), ModelChoice::Exact);
        assert_eq!(
            "annoy".parse::<ModelChoice>().unwrap(),
            ModelChoice::Approximate
        );
        assert!(matches!(
            "hnsw".parse::<ModelChoice>(),
            Err(ReelmatchError::InvalidRequest(_))
        ));
        assert_eq!(ModelChoice::Approximate.index_kind(), IndexKind::Forest);
    }

    #[test]
    fn test_request_from_json() {
        let request: RecommendationRequest = serde_json::from_str(
            r#"{"model": "ANNOY", "n_recommendations": 5, "movie_title": "Heat"}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            RecommendationRequest::new(ModelChoice::Approximate, 5, "Heat")
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "approximate");
        assert_eq!(json["title"], "Heat");
    }

    #[test]
    fn test_invalid_requests() {
        for (model, n) in [("exact", 0), ("exact", -3), ("bogus", 3)] {
            let raw = RawRequest {
                model: model.to_string(),
                n_recommendations: n,
                title: "Heat".to_string(),
            };
            assert!(matches!(
                RecommendationRequest::try_from(raw),
                Err(ReelmatchError::InvalidRequest(_))
            ));
        }
    }
}
