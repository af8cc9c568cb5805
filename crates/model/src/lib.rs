//! Core domain model for catalog gap reporting.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `SaleRecord`: One row of the sales extract
//! - `Period`: The reporting year and month code
//! - `Roster`: The representatives a report is scoped to
//! - `RepresentativeSummary`: Sold/unsold catalog items for one representative

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One observed sale event from the sales extract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    /// Catalog item identifier, possibly inconsistently formatted
    pub product_label: String,

    /// Product grouping
    #[serde(default)]
    pub category: String,

    /// Salesperson identifier
    pub representative: String,

    /// Calendar year of the sale
    pub year: i32,

    /// Month abbreviation as found in the extract (e.g. "dez", "DEZ")
    pub month_code: String,
}

impl SaleRecord {
    pub fn new(
        product_label: impl Into<String>,
        category: impl Into<String>,
        representative: impl Into<String>,
        year: i32,
        month_code: impl Into<String>,
    ) -> Self {
        Self {
            product_label: product_label.into(),
            category: category.into(),
            representative: representative.into(),
            year,
            month_code: month_code.into(),
        }
    }
}

/// Reporting period: a year plus a month code.
///
/// Month codes compare case-insensitively and ignore surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: String,
}

impl Period {
    pub fn new(year: i32, month: impl AsRef<str>) -> Self {
        Self {
            year,
            month: month_key(month.as_ref()),
        }
    }

    /// Whether a record's year and month code fall in this period.
    pub fn contains(&self, year: i32, month_code: &str) -> bool {
        self.year == year && month_key(month_code) == month_key(&self.month)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.month, self.year)
    }
}

fn month_key(code: &str) -> String {
    code.trim().to_lowercase()
}

/// The set of representatives a report is restricted to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster(BTreeSet<String>);

impl Roster {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, representative: &str) -> bool {
        self.0.contains(representative)
    }

    /// Roster spelling of `representative`, ignoring case and surrounding whitespace.
    pub fn find_ignore_case(&self, representative: &str) -> Option<&str> {
        let wanted = representative.trim().to_lowercase();
        self.iter().find(|name| name.to_lowercase() == wanted)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Roster {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// A catalog item a representative did not sell, as listed in the drill-down.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnsoldItem {
    pub category: String,
    pub product_label: String,
}

/// Per-representative result of a gap report.
///
/// `sold_labels` and `unsold_labels` partition the catalog universe of the
/// run that produced this summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepresentativeSummary {
    pub representative: String,

    /// Normalized labels found in this representative's rows
    pub sold_labels: BTreeSet<String>,

    /// Catalog universe minus `sold_labels`
    pub unsold_labels: BTreeSet<String>,

    /// Size of `unsold_labels`
    pub unsold_count: usize,

    /// Unsold items with their categories, sorted by (category, product_label)
    pub unsold_detail: Vec<UnsoldItem>,
}
