mod common;

use reelmatch::catalog::CatalogBuilder;
use reelmatch::config::BuildConfig;
use reelmatch::error::{ReelmatchError, Result};
use reelmatch::matrix::build_rating_matrix;
use reelmatch::reduction::{Pca, TruncatedSvd, VarianceThreshold, reduce};
use reelmatch::vector::NeighborIndex;

#[test]
fn rebuilds_are_bit_identical() -> Result<()> {
    let input = common::sample_input();
    let first = CatalogBuilder::default().build(&input)?;
    let second = CatalogBuilder::default().build(&input)?;

    assert_eq!(first.lookup().to_map(), second.lookup().to_map());
    assert_eq!(first.content_embeddings(), second.content_embeddings());
    for item in 0..first.len() {
        assert_eq!(
            first.exact_index().neighbors_of(item, 5)?,
            second.exact_index().neighbors_of(item, 5)?
        );
        assert_eq!(
            first.approximate_index().search(item, 5)?,
            second.approximate_index().search(item, 5)?
        );
    }
    Ok(())
}

#[test]
fn sequential_and_parallel_forests_agree() -> Result<()> {
    let input = common::sample_input();
    let config = BuildConfig::default().with_n_trees(8).with_seed(7);
    let parallel = CatalogBuilder::new(config.clone()).build(&input)?;
    let sequential = CatalogBuilder::new(config.with_parallel_build(false)).build(&input)?;

    for item in 0..parallel.len() {
        assert_eq!(
            parallel.approximate_index().search(item, 4)?,
            sequential.approximate_index().search(item, 4)?
        );
    }
    Ok(())
}

#[test]
fn record_order_does_not_change_the_build() -> Result<()> {
    let input = common::sample_input();
    let mut shuffled = input.clone();
    shuffled.ratings.reverse();

    let a = build_rating_matrix(&input.ratings)?;
    let b = build_rating_matrix(&shuffled.ratings)?;
    assert_eq!(a.users, b.users);
    assert_eq!(a.items, b.items);
    assert_eq!(a.matrix.nnz(), b.matrix.nnz());

    let first = CatalogBuilder::default().build(&input)?;
    let second = CatalogBuilder::default().build(&shuffled)?;
    assert_eq!(
        first.manifest().collaborative_dimension,
        second.manifest().collaborative_dimension
    );
    Ok(())
}

#[test]
fn higher_threshold_never_keeps_fewer_components() -> Result<()> {
    let input = common::sample_input();
    let features = input.features.to_matrix();
    let ratings = build_rating_matrix(&input.ratings)?.matrix.transpose();

    let mut last_content = 0;
    let mut last_collaborative = 0;
    for value in [0.5, 0.8, 0.9, 0.95, 0.99, 1.0] {
        let threshold = VarianceThreshold::new(value)?;
        let content = reduce(&Pca, &features, threshold)?;
        let collaborative = reduce(&TruncatedSvd, &ratings, threshold)?;

        assert!(content.k >= last_content, "content k dropped at {value}");
        assert!(collaborative.k >= last_collaborative, "collaborative k dropped at {value}");
        let all_kept = content.k == content.explained_variance_ratio.len();
        assert!(all_kept || content.retained_variance() >= value - 1e-9);
        last_content = content.k;
        last_collaborative = collaborative.k;
    }
    Ok(())
}

#[test]
fn empty_tables_abort_the_build() {
    let mut input = common::sample_input();
    input.ratings.clear();
    assert!(matches!(
        CatalogBuilder::default().build(&input),
        Err(ReelmatchError::EmptyInput(_))
    ));

    let mut input = common::sample_input();
    input.features.items.clear();
    input.features.rows.clear();
    assert!(CatalogBuilder::default().build(&input).is_err());
}
