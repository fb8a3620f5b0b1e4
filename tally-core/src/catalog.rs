//! Menu catalog: categories, subcategories and funding sources.
//!
//! The catalog is read from the `system` worksheet:
//!   A: category   B: subcategory   ...   F: source
//!
//! A `Catalog` is an immutable snapshot. Reloading produces a fresh value
//! which callers swap in; nothing is mutated in place.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const CATEGORY_COL: usize = 0;
const SUBCATEGORY_COL: usize = 1;
const SOURCE_COL: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Categories in first-seen sheet order
    pub categories: Vec<String>,
    pub subcategories: BTreeMap<String, Vec<String>>,
    /// Sources in first-seen sheet order
    pub sources: Vec<String>,
}

impl Catalog {
    /// Build a snapshot from raw sheet rows. The first row is a header.
    pub fn from_rows<R: AsRef<[String]>>(rows: &[R]) -> Self {
        let mut catalog = Catalog::default();

        for row in rows.iter().skip(1) {
            let row = row.as_ref();
            let category = cell(row, CATEGORY_COL);
            let subcategory = cell(row, SUBCATEGORY_COL);
            let source = cell(row, SOURCE_COL);

            if !category.is_empty() && !catalog.categories.iter().any(|c| c == category) {
                catalog.categories.push(category.to_string());
            }

            if !category.is_empty() && !subcategory.is_empty() {
                catalog
                    .subcategories
                    .entry(category.to_string())
                    .or_default()
                    .push(subcategory.to_string());
            }

            if !source.is_empty() && !catalog.sources.iter().any(|s| s == source) {
                catalog.sources.push(source.to_string());
            }
        }

        catalog
    }

    pub fn subcategories_of(&self, category: &str) -> &[String] {
        self.subcategories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn first_source(&self) -> Option<&str> {
        self.sources.first().map(String::as_str)
    }

    pub fn has_source(&self, source: &str) -> bool {
        self.sources.iter().any(|s| s == source)
    }
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}
