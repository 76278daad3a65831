//! Serving-side recommendation.
//!
//! A [`Recommender`] resolves a title, queries the selected index for one
//! extra neighbor, drops the query item and truncates to the requested
//! count.

pub mod engine;
pub mod request;

pub use self::engine::Recommender;
pub use self::request::{ModelChoice, RawRequest, Recommendation, RecommendationRequest};
