//! Report display.
//!
//! Renders gap reports for the terminal: the summary table (sortable and
//! filterable by unsold count) and the per-representative drill-down.
//! Sorting and filtering produce views over the summaries; the summaries
//! themselves are never modified.

use serde::Serialize;
use skugap_model::RepresentativeSummary;
use std::cmp::Ordering;
use std::fmt::Write;

const REPRESENTATIVE_HEADER: &str = "Representative";
const COUNT_HEADER: &str = "Unsold SKUs";
const CATEGORY_HEADER: &str = "Category";
const PRODUCT_HEADER: &str = "Product";

/// Column the summary table is sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    UnsoldCount,
    Representative,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "count" | "unsold" | "unsold_count" => Ok(Self::UnsoldCount),
            "representative" | "rep" | "name" => Ok(Self::Representative),
            other => Err(format!("unknown sort column '{}'", other)),
        }
    }
}

/// Inclusive bounds on the unsold count; a missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountRange {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl CountRange {
    pub fn new(min: Option<usize>, max: Option<usize>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, count: usize) -> bool {
        self.min.map_or(true, |min| count >= min) && self.max.map_or(true, |max| count <= max)
    }
}

/// One line of the summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow<'a> {
    pub representative: &'a str,
    pub unsold_count: usize,
}

impl<'a> From<&'a RepresentativeSummary> for SummaryRow<'a> {
    fn from(summary: &'a RepresentativeSummary) -> Self {
        Self {
            representative: &summary.representative,
            unsold_count: summary.unsold_count,
        }
    }
}

/// Summaries whose unsold count falls in `range`, in their original order.
pub fn filter_by_unsold_count<'a>(
    summaries: &'a [RepresentativeSummary],
    range: CountRange,
) -> Vec<&'a RepresentativeSummary> {
    summaries
        .iter()
        .filter(|s| range.contains(s.unsold_count))
        .collect()
}

/// Sort a view of the summary table. Ties fall back to representative name.
pub fn sort_view(rows: &mut [&RepresentativeSummary], key: SortKey, descending: bool) {
    rows.sort_by(|a, b| {
        let primary = match key {
            SortKey::UnsoldCount => a.unsold_count.cmp(&b.unsold_count),
            SortKey::Representative => Ordering::Equal,
        };
        let primary = if descending { primary.reverse() } else { primary };
        primary.then_with(|| {
            let names = a.representative.cmp(&b.representative);
            if descending && key == SortKey::Representative {
                names.reverse()
            } else {
                names
            }
        })
    });
}

/// Look up a representative: exact name first, then case-insensitive.
pub fn find_representative<'a>(
    summaries: &'a [RepresentativeSummary],
    name: &str,
) -> Option<&'a RepresentativeSummary> {
    let name = name.trim();
    summaries
        .iter()
        .find(|s| s.representative == name)
        .or_else(|| {
            let wanted = name.to_lowercase();
            summaries
                .iter()
                .find(|s| s.representative.to_lowercase() == wanted)
        })
}

/// Render the summary table as aligned text.
pub fn render_summary_table(rows: &[&RepresentativeSummary]) -> String {
    let lines: Vec<[String; 2]> = rows
        .iter()
        .map(|s| [s.representative.clone(), s.unsold_count.to_string()])
        .collect();
    render_table([REPRESENTATIVE_HEADER, COUNT_HEADER], &lines, &[false, true])
}

/// Render the drill-down for one representative.
pub fn render_detail(summary: &RepresentativeSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", summary.representative);
    let _ = writeln!(out, "Unsold SKUs: {}", summary.unsold_count);

    if summary.unsold_detail.is_empty() {
        out.push_str("Sold every SKU in the catalog.\n");
        return out;
    }

    out.push('\n');
    let lines: Vec<[String; 2]> = summary
        .unsold_detail
        .iter()
        .map(|item| [item.category.clone(), item.product_label.clone()])
        .collect();
    out.push_str(&render_table(
        [CATEGORY_HEADER, PRODUCT_HEADER],
        &lines,
        &[false, false],
    ));
    out
}

/// Serialize the summary table (representative and count only).
pub fn summary_table_json(rows: &[&RepresentativeSummary]) -> serde_json::Result<String> {
    let rows: Vec<SummaryRow<'_>> = rows.iter().map(|s| SummaryRow::from(*s)).collect();
    serde_json::to_string_pretty(&rows)
}

/// Serialize the full drill-down for one representative.
pub fn detail_json(summary: &RepresentativeSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(summary)
}

fn render_table(headers: [&str; 2], lines: &[[String; 2]], right_align: &[bool; 2]) -> String {
    let mut widths = headers.map(|h| h.chars().count());
    for line in lines {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &headers, &widths, right_align);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for line in lines {
        push_row(&mut out, line, &widths, right_align);
    }
    out
}

fn push_row<S: AsRef<str>>(out: &mut String, cells: &[S; 2], widths: &[usize; 2], right: &[bool; 2]) {
    let parts: Vec<String> = cells
        .iter()
        .zip(widths)
        .zip(right)
        .map(|((cell, width), right)| {
            let cell = cell.as_ref();
            let pad = width.saturating_sub(cell.chars().count());
            if *right {
                format!("{}{}", " ".repeat(pad), cell)
            } else {
                format!("{}{}", cell, " ".repeat(pad))
            }
        })
        .collect();
    let _ = writeln!(out, "{}", parts.join("  ").trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use skugap_model::UnsoldItem;
    use std::collections::BTreeSet;

    fn summary(name: &str, count: usize) -> RepresentativeSummary {
        RepresentativeSummary {
            representative: name.to_string(),
            sold_labels: BTreeSet::new(),
            unsold_labels: (0..count).map(|i| format!("SKU {i}")).collect(),
            unsold_count: count,
            unsold_detail: (0..count)
                .map(|i| UnsoldItem {
                    category: "CAT".into(),
                    product_label: format!("SKU {i}"),
                })
                .collect(),
        }
    }

    fn report() -> Vec<RepresentativeSummary> {
        vec![summary("JOSE", 5), summary("ANA", 3), summary("BRUNO", 3), summary("CAIO", 0)]
    }

    fn names(rows: &[&RepresentativeSummary]) -> Vec<String> {
        rows.iter().map(|s| s.representative.clone()).collect()
    }

    #[test]
    fn test_range_filter_is_inclusive() {
        let report = report();
        let rows = filter_by_unsold_count(&report, CountRange::new(Some(3), Some(4)));
        assert_eq!(names(&rows), vec!["ANA", "BRUNO"]);

        let rows = filter_by_unsold_count(&report, CountRange::new(None, Some(0)));
        assert_eq!(names(&rows), vec!["CAIO"]);

        let rows = filter_by_unsold_count(&report, CountRange::default());
        assert_eq!(rows.len(), 4);
        assert_eq!(report.len(), 4);
    }

    #[test]
    fn test_sort_view() {
        let report = report();
        let mut rows: Vec<_> = report.iter().collect();

        sort_view(&mut rows, SortKey::UnsoldCount, false);
        assert_eq!(names(&rows), vec!["CAIO", "ANA", "BRUNO", "JOSE"]);

        sort_view(&mut rows, SortKey::UnsoldCount, true);
        assert_eq!(names(&rows), vec!["JOSE", "ANA", "BRUNO", "CAIO"]);

        sort_view(&mut rows, SortKey::Representative, false);
        assert_eq!(names(&rows), vec!["ANA", "BRUNO", "CAIO", "JOSE"]);

        sort_view(&mut rows, SortKey::Representative, true);
        assert_eq!(names(&rows), vec!["JOSE", "CAIO", "BRUNO", "ANA"]);
    }

    #[test]
    fn test_sort_key_from_str() {
        assert_eq!("count".parse::<SortKey>(), Ok(SortKey::UnsoldCount));
        assert_eq!("Representative".parse::<SortKey>(), Ok(SortKey::Representative));
        assert!("price".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_find_representative() {
        let report = report();
        assert_eq!(find_representative(&report, "ANA").unwrap().unsold_count, 3);
        assert_eq!(find_representative(&report, " bruno ").unwrap().representative, "BRUNO");
        assert!(find_representative(&report, "DIEGO").is_none());
    }

    #[test]
    fn test_render_summary_table() {
        let report = vec![summary("ANA", 12), summary("MICHEL JOSÉ", 3)];
        let rows: Vec<_> = report.iter().collect();
        assert_eq!(
            render_summary_table(&rows),
            "Representative  Unsold SKUs\n\
             --------------  -----------\n\
             ANA                      12\n\
             MICHEL JOSÉ               3\n"
        );
    }

    #[test]
    fn test_render_detail() {
        let out = render_detail(&summary("ANA", 2));
        assert_eq!(
            out,
            "ANA\n\
             Unsold SKUs: 2\n\
             \n\
             Category  Product\n\
             --------  -------\n\
             CAT       SKU 0\n\
             CAT       SKU 1\n"
        );

        let out = render_detail(&summary("CAIO", 0));
        assert!(out.contains("Sold every SKU"));
    }

    #[test]
    fn test_summary_table_json() {
        let report = vec![summary("ANA", 1)];
        let rows: Vec<_> = report.iter().collect();
        let json = summary_table_json(&rows).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["representative"], "ANA");
        assert_eq!(parsed[0]["unsold_count"], 1);
    }
}
