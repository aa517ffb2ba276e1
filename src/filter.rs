//! Category filter applied to a finished result set.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::models::QueryResultSet;

/// Which result sequences a caller wants to see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    All,
    Entities,
    Metrics,
    Documents,
}

impl Category {
    /// Parses like [`FromStr`], but treats unknown values as [`Category::All`].
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            tracing::debug!(filter = s, "unknown category filter; showing all");
            Category::All
        })
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts the canonical names and the `students` / `courses` / `docs`
    /// aliases, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Category::All),
            "entities" | "students" => Ok(Category::Entities),
            "metrics" | "courses" => Ok(Category::Metrics),
            "documents" | "docs" => Ok(Category::Documents),
            other => Err(format!(
                "unknown category '{}'. Use all, entities, metrics, or documents.",
                other
            )),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::All => "all",
            Category::Entities => "entities",
            Category::Metrics => "metrics",
            Category::Documents => "documents",
        };
        f.write_str(name)
    }
}

/// Clears every sequence `category` does not select.
pub fn filter(mut results: QueryResultSet, category: Category) -> QueryResultSet {
    match category {
        Category::All => {}
        Category::Entities => {
            results.metrics.clear();
            results.documents.clear();
        }
        Category::Metrics => {
            results.entities.clear();
            results.documents.clear();
        }
        Category::Documents => {
            results.entities.clear();
            results.metrics.clear();
        }
    }
    results
}
