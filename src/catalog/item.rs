//! Item records.

use serde::{Deserialize, Serialize};

/// A catalog item: its unique display title and external catalog id.
///
/// The item index is the record's position in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRecord {
    pub title: String,
    pub external_id: String,
}

impl ItemRecord {
    pub fn new<T: Into<String>, E: Into<String>>(title: T, external_id: E) -> Self {
        Self {
            title: title.into(),
            external_id: external_id.into(),
        }
    }

    /// IMDb page for the item. Numeric ids are zero-padded to seven digits;
    /// anything else is used verbatim.
    pub fn imdb_url(&self) -> String {
        let id = self.external_id.trim();
        if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
            format!("https://www.imdb.com/title/tt{id:0>7}")
        } else {
            format!("https://www.imdb.com/title/{id}")
        }
    }
}
