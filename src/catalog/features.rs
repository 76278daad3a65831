//! Content feature encoding.
//!
//! Raw movie records become a one-hot feature table: one column per genre,
//! then one column per release decade. Records are keyed by normalized
//! title; records sharing a title are merged rather than dropped.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::catalog::item::ItemRecord;
use crate::error::{ReelmatchError, Result};

/// Decade label used when the release year is unknown.
pub const UNKNOWN_DECADE: &str = "unknown";

/// A movie as it arrives from the item table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub title: String,
    #[serde(alias = "imdb_id")]
    pub external_id: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl MovieRecord {
    /// Build from a raw `"Matrix, The (1999)"` style title and a
    /// `|`-separated genre list.
    pub fn from_raw(raw_title: &str, external_id: &str, genres: &str) -> Self {
        let (title, year) = split_title_year(raw_title);
        Self {
            title,
            external_id: external_id.trim().to_string(),
            genres: genres
                .split('|')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect(),
            year,
        }
    }
}

/// Split a trailing four-digit `(YYYY)` off a title and move a trailing
/// `", The"` article to the front.
///
/// ```
/// use reelmatch::catalog::features::split_title_year;
///
/// assert_eq!(
///     split_title_year("Matrix, The (1999)"),
///     ("The Matrix".to_string(), Some(1999))
/// );
/// assert_eq!(split_title_year("Heat"), ("Heat".to_string(), None));
/// ```
pub fn split_title_year(raw: &str) -> (String, Option<i32>) {
    let raw = raw.trim();
    let (title, year) = match parse_trailing_year(raw) {
        Some((rest, year)) => (rest, Some(year)),
        None => (raw, None),
    };
    (move_article(title), year)
}

fn parse_trailing_year(raw: &str) -> Option<(&str, i32)> {
    let inner = raw.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let digits = &inner[open + 1..];
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = digits.parse().ok()?;
    Some((inner[..open].trim_end(), year))
}

fn move_article(title: &str) -> String {
    let lower = title.to_lowercase();
    for suffix in [", the", ",the"] {
        if lower.ends_with(suffix) && title.is_char_boundary(title.len() - suffix.len()) {
            let stem = title[..title.len() - suffix.len()].trim_end();
            return format!("The {stem}").trim_end().to_string();
        }
    }
    title.to_string()
}

/// `1994` → `"1990s"`; no year → [`UNKNOWN_DECADE`].
pub fn decade_label(year: Option<i32>) -> String {
    match year {
        Some(year) => format!("{}0s", year.div_euclid(10)),
        None => UNKNOWN_DECADE.to_string(),
    }
}

/// Items with their fixed-width numeric feature rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    /// Column names, identical for every row.
    pub columns: Vec<String>,
    /// One item per row; the position is the item index.
    pub items: Vec<ItemRecord>,
    pub rows: Vec<Vec<f32>>,
}

impl FeatureTable {
    /// Check shape and values. Title uniqueness is checked by the lookup.
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(ReelmatchError::empty_input("Feature table has no items"));
        }
        if self.columns.is_empty() {
            return Err(ReelmatchError::empty_input("Feature table has no columns"));
        }
        if self.rows.len() != self.items.len() {
            return Err(ReelmatchError::invalid_input(format!(
                "{} feature rows for {} items",
                self.rows.len(),
                self.items.len()
            )));
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(ReelmatchError::invalid_input(format!(
                    "Feature row {i} has {} values, expected {}",
                    row.len(),
                    self.columns.len()
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(ReelmatchError::invalid_input(format!(
                    "Feature row {i} contains NaN or infinite values"
                )));
            }
        }
        Ok(())
    }

    /// Dense `items × columns` matrix.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.rows.len(), self.columns.len(), |r, c| {
            f64::from(self.rows[r][c])
        })
    }
}

/// One-hot encoder over genres and decades.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder;

struct Merged<'a> {
    external_id: &'a str,
    year: Option<i32>,
    genres: BTreeSet<&'a str>,
}

impl FeatureEncoder {
    /// Encode `records` into a feature table with items ordered by title.
    pub fn encode(&self, records: &[MovieRecord]) -> Result<FeatureTable> {
        if records.is_empty() {
            return Err(ReelmatchError::empty_input("No movie records"));
        }

        let mut merged: BTreeMap<&str, Merged<'_>> = BTreeMap::new();
        let mut duplicates = 0usize;
        for record in records {
            match merged.get_mut(record.title.as_str()) {
                Some(entry) => {
                    duplicates += 1;
                    entry
                        .genres
                        .extend(record.genres.iter().map(String::as_str));
                }
                None => {
                    merged.insert(
                        &record.title,
                        Merged {
                            external_id: &record.external_id,
                            year: record.year,
                            genres: record.genres.iter().map(String::as_str).collect(),
                        },
                    );
                }
            }
        }
        if duplicates > 0 {
            debug!("Merged {duplicates} records sharing a title");
        }

        let genres: BTreeSet<&str> = merged
            .values()
            .flat_map(|m| m.genres.iter().copied())
            .collect();
        let decades: BTreeSet<String> = merged.values().map(|m| decade_label(m.year)).collect();

        let genre_column: BTreeMap<&str, usize> =
            genres.iter().enumerate().map(|(i, &g)| (g, i)).collect();
        let decade_column: BTreeMap<&str, usize> = decades
            .iter()
            .enumerate()
            .map(|(i, d)| (d.as_str(), genres.len() + i))
            .collect();

        let width = genres.len() + decades.len();
        let mut items = Vec::with_capacity(merged.len());
        let mut rows = Vec::with_capacity(merged.len());
        for (title, entry) in &merged {
            let mut row = vec![0.0f32; width];
            for genre in &entry.genres {
                row[genre_column[genre]] = 1.0;
            }
            row[decade_column[decade_label(entry.year).as_str()]] = 1.0;

            items.push(ItemRecord::new(*title, entry.external_id));
            rows.push(row);
        }

        let columns = genres
            .iter()
            .map(|g| g.to_string())
            .chain(decades.iter().cloned())
            .collect();

        info!(
            "Encoded {} items into {} genre and {} decade columns",
            items.len(),
            genres.len(),
            decades.len()
        );
        Ok(FeatureTable {
            columns,
            items,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, id: &str, genres: &[&str], year: Option<i32>) -> MovieRecord {
        MovieRecord {
            title: title.to_string(),
            external_id: id.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            year,
        }
    }

    #[test]
    fn test_split_title_year() {
        assert_eq!(
            split_title_year("Matrix, The (1999)"),
            ("The Matrix".to_string(), Some(1999))
        );
        assert_eq!(
            split_title_year("Shawshank Redemption,The (1994) "),
            ("The Shawshank Redemption".to_string(), Some(1994))
        );
        assert_eq!(
            split_title_year("Babylon 5"),
            ("Babylon 5".to_string(), None)
        );
        assert_eq!(
            split_title_year("Cosmos (1980-)"),
            ("Cosmos (1980-)".to_string(), None)
        );
        assert_eq!(
            split_title_year("Fantastic Four (2015) (2015)"),
            ("Fantastic Four (2015)".to_string(), Some(2015))
        );
    }

    #[test]
    fn test_decade_label() {
        assert_eq!(decade_label(Some(1999)), "1990s");
        assert_eq!(decade_label(Some(2000)), "2000s");
        assert_eq!(decade_label(None), "unknown");
    }

    #[test]
    fn test_from_raw() {
        let movie = MovieRecord::from_raw("Heat (1995)", " 113277 ", "Action|Crime|Thriller");
        assert_eq!(movie.title, "Heat");
        assert_eq!(movie.external_id, "113277");
        assert_eq!(movie.genres, vec!["Action", "Crime", "Thriller"]);
        assert_eq!(movie.year, Some(1995));
    }

    #[test]
    fn test_encode_columns_and_rows() {
        let table = FeatureEncoder
            .encode(&[
                record("Heat", "3", &["Crime", "Action"], Some(1995)),
                record("Alien", "1", &["Horror"], Some(1979)),
                record("Mystery", "9", &["Drama"], None),
            ])
            .unwrap();

        assert_eq!(
            table.columns,
            vec!["Action", "Crime", "Drama", "Horror", "1970s", "1990s", "unknown"]
        );
        let titles: Vec<&str> = table.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Alien", "Heat", "Mystery"]);
        assert_eq!(table.rows[0], vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
        assert_eq!(table.rows[1], vec![1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(table.rows[2], vec![0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        assert!(table.validate().is_ok());
        assert_eq!(table.to_matrix().shape(), (3, 7));
    }

    #[test]
    fn test_duplicate_titles_merged() {
        let table = FeatureEncoder
            .encode(&[
                record("Emma", "116191", &["Comedy"], Some(1996)),
                record("Emma", "2000001", &["Romance"], Some(2009)),
            ])
            .unwrap();

        assert_eq!(table.items, vec![ItemRecord::new("Emma", "116191")]);
        assert_eq!(table.columns, vec!["Comedy", "Romance", "1990s"]);
        assert_eq!(table.rows[0], vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_validate_shape() {
        let mut table = FeatureEncoder
            .encode(&[record("A", "1", &["X"], Some(2001))])
            .unwrap();
        table.rows[0].push(1.0);
        assert!(matches!(
            table.validate(),
            Err(ReelmatchError::InvalidInput(_))
        ));
        assert!(FeatureEncoder.encode(&[]).is_err());
    }
}
