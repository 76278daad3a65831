#![allow(dead_code)]

use reelmatch::catalog::builder::Rating;
use reelmatch::catalog::{BuildInput, FeatureEncoder, MovieRecord};

/// Twelve movies in three genre families; each family has its own
/// audience, plus one user who rates across families.
pub fn sample_movies() -> Vec<MovieRecord> {
    [
        ("Alien (1979)", "78748", "Horror|Sci-Fi"),
        ("Aliens (1986)", "90605", "Action|Horror|Sci-Fi"),
        ("Predator (1987)", "93773", "Action|Sci-Fi|Thriller"),
        ("Terminator, The (1984)", "88247", "Action|Sci-Fi|Thriller"),
        ("Heat (1995)", "113277", "Action|Crime|Thriller"),
        ("Ronin (1998)", "122690", "Action|Crime|Thriller"),
        ("Casino (1995)", "112641", "Crime|Drama"),
        ("Fargo (1996)", "116282", "Comedy|Crime|Drama|Thriller"),
        ("Toy Story (1995)", "114709", "Adventure|Animation|Children|Comedy|Fantasy"),
        ("Toy Story 2 (1999)", "120363", "Adventure|Animation|Children|Comedy|Fantasy"),
        ("Antz (1998)", "120587", "Adventure|Animation|Children|Comedy|Fantasy"),
        ("Chicken Run (2000)", "120630", "Animation|Children|Comedy"),
    ]
    .into_iter()
    .map(|(title, id, genres)| MovieRecord::from_raw(title, id, genres))
    .collect()
}

pub fn sample_ratings() -> Vec<Rating> {
    let families: [&[&str]; 3] = [
        &["78748", "90605", "93773", "88247"],
        &["113277", "122690", "112641", "116282"],
        &["114709", "120363", "120587", "120630"],
    ];
    let mut ratings = Vec::new();
    for (f, family) in families.iter().enumerate() {
        for u in 0..4u64 {
            let user = (f as u64) * 10 + u;
            for (i, item) in family.iter().enumerate() {
                let rating = 3.0 + ((u as usize + i) % 3) as f32;
                ratings.push(Rating::new(user, item.to_string(), rating));
            }
        }
    }
    ratings.push(Rating::new(99, "78748".into(), 2.0));
    ratings.push(Rating::new(99, "113277".into(), 4.0));
    ratings.push(Rating::new(99, "114709".into(), 3.5));
    ratings
}

pub fn sample_input() -> BuildInput {
    BuildInput {
        features: FeatureEncoder.encode(&sample_movies()).unwrap(),
        ratings: sample_ratings(),
    }
}
