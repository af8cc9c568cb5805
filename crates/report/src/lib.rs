//! Catalog gap reporting.
//!
//! For every representative in scope, computes the catalog items they did
//! not sell: the catalog universe (all normalized labels sold by anyone in
//! scope) minus the labels in their own rows.

use skugap_model::{Period, RepresentativeSummary, Roster, SaleRecord, UnsoldItem};
use skugap_normalize::{normalize_label, LabelRules};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("No rows for period {period} and the configured roster")]
    EmptyResult { period: Period },
}

/// Compute per-representative gaps using the default label rules.
pub fn compute_gap_report(
    records: &[SaleRecord],
    period: &Period,
    roster: &Roster,
) -> Result<Vec<RepresentativeSummary>, ReportError> {
    compute_gap_report_with(records, period, roster, &LabelRules::default())
}

/// Compute per-representative gaps.
///
/// Output is sorted by unsold count descending, then representative
/// ascending. Roster members without rows in the period are omitted.
pub fn compute_gap_report_with(
    records: &[SaleRecord],
    period: &Period,
    roster: &Roster,
    rules: &LabelRules,
) -> Result<Vec<RepresentativeSummary>, ReportError> {
    let scoped = scoped_rows(records, period, roster, rules);
    if scoped.is_empty() {
        return Err(ReportError::EmptyResult {
            period: period.clone(),
        });
    }

    let universe: BTreeSet<&str> = scoped.iter().map(|row| row.label.as_str()).collect();

    let mut sold: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for row in &scoped {
        sold.entry(row.representative)
            .or_default()
            .insert(row.label.as_str());
    }

    // Every (category, label) pair in scope, already in drill-down order
    let items: BTreeSet<(&str, &str)> = scoped
        .iter()
        .map(|row| (row.category, row.label.as_str()))
        .collect();

    tracing::debug!(
        rows = scoped.len(),
        universe = universe.len(),
        representatives = sold.len(),
        "Computing catalog gaps"
    );

    let mut summaries: Vec<RepresentativeSummary> = sold
        .into_iter()
        .map(|(representative, sold_labels)| {
            let unsold_labels: BTreeSet<String> = universe
                .difference(&sold_labels)
                .map(|label| label.to_string())
                .collect();

            let unsold_detail = items
                .iter()
                .filter(|(_, label)| unsold_labels.contains(*label))
                .map(|(category, label)| UnsoldItem {
                    category: category.to_string(),
                    product_label: label.to_string(),
                })
                .collect();

            RepresentativeSummary {
                representative: representative.to_string(),
                sold_labels: sold_labels.into_iter().map(str::to_string).collect(),
                unsold_count: unsold_labels.len(),
                unsold_labels,
                unsold_detail,
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.unsold_count
            .cmp(&a.unsold_count)
            .then_with(|| a.representative.cmp(&b.representative))
    });

    Ok(summaries)
}

/// Distinct normalized labels sold by roster members during `period`.
pub fn catalog_universe(
    records: &[SaleRecord],
    period: &Period,
    roster: &Roster,
    rules: &LabelRules,
) -> BTreeSet<String> {
    scoped_rows(records, period, roster, rules)
        .into_iter()
        .map(|row| row.label)
        .collect()
}

struct ScopedRow<'a> {
    label: String,
    category: &'a str,
    representative: &'a str,
}

fn scoped_rows<'a>(
    records: &'a [SaleRecord],
    period: &'a Period,
    roster: &'a Roster,
    rules: &LabelRules,
) -> Vec<ScopedRow<'a>> {
    skugap_scope::select(records, period, roster)
        .map(|record| ScopedRow {
            label: normalize_label(&record.product_label, rules),
            category: record.category.as_str(),
            representative: record.representative.as_str(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dez() -> Period {
        Period::new(2024, "dez")
    }

    fn labels(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> Vec<SaleRecord> {
        vec![
            SaleRecord::new("PT7L", "AGUA", "X", 2024, "dez"),
            SaleRecord::new("CXABC", "CAIXA", "X", 2024, "DEZ"),
            SaleRecord::new("CX - ABC", "CAIXA", "Y", 2024, "dez"),
            SaleRecord::new("LATA 350", "REFRI", "Y", 2024, "dez"),
            SaleRecord::new("LATA 350", "CERVEJA", "X", 2024, "dez"),
            SaleRecord::new("GARRAFA 1L", "REFRI", "Z", 2024, "dez"),
            SaleRecord::new("PT - 7L", "AGUA", "W", 2024, "dez"),
            SaleRecord::new("GALAO 20L", "AGUA", "W", 2023, "dez"),
        ]
    }

    fn roster() -> Roster {
        Roster::new(["X", "Y", "Z", "W", "V"])
    }

    #[test]
    fn test_two_representative_scenario() {
        let records = vec![
            SaleRecord::new("PT7L", "A", "X", 2024, "dez"),
            SaleRecord::new("CXABC", "B", "Y", 2024, "dez"),
        ];
        let report = compute_gap_report(&records, &dez(), &Roster::new(["X", "Y"])).unwrap();

        assert_eq!(
            report,
            vec![
                RepresentativeSummary {
                    representative: "X".into(),
                    sold_labels: labels(&["PT - 7L"]),
                    unsold_labels: labels(&["CX - ABC"]),
                    unsold_count: 1,
                    unsold_detail: vec![UnsoldItem {
                        category: "B".into(),
                        product_label: "CX - ABC".into(),
                    }],
                },
                RepresentativeSummary {
                    representative: "Y".into(),
                    sold_labels: labels(&["CX - ABC"]),
                    unsold_labels: labels(&["PT - 7L"]),
                    unsold_count: 1,
                    unsold_detail: vec![UnsoldItem {
                        category: "A".into(),
                        product_label: "PT - 7L".into(),
                    }],
                },
            ]
        );
    }

    #[test]
    fn test_complement_partitions_universe() {
        let records = sample();
        let universe = catalog_universe(&records, &dez(), &roster(), &LabelRules::default());
        let report = compute_gap_report(&records, &dez(), &roster()).unwrap();

        for summary in &report {
            assert!(summary.sold_labels.is_disjoint(&summary.unsold_labels));
            let union: BTreeSet<String> = summary
                .sold_labels
                .union(&summary.unsold_labels)
                .cloned()
                .collect();
            assert_eq!(union, universe);
            assert_eq!(summary.unsold_count, summary.unsold_labels.len());
        }
    }

    #[test]
    fn test_sorted_by_count_then_name() {
        let report = compute_gap_report(&sample(), &dez(), &roster()).unwrap();
        let order: Vec<_> = report
            .iter()
            .map(|s| (s.representative.as_str(), s.unsold_count))
            .collect();
        // Universe: PT - 7L, CX - ABC, LATA 350, GARRAFA 1L
        assert_eq!(order, vec![("W", 3), ("Z", 3), ("Y", 2), ("X", 1)]);
    }

    #[test]
    fn test_other_periods_excluded() {
        let universe = catalog_universe(&sample(), &dez(), &roster(), &LabelRules::default());
        assert!(!universe.contains("GALAO 20L"));

        let report = compute_gap_report(&sample(), &dez(), &roster()).unwrap();
        let w = report.iter().find(|s| s.representative == "W").unwrap();
        assert_eq!(w.sold_labels, labels(&["PT - 7L"]));
    }

    #[test]
    fn test_non_roster_sales_excluded_from_universe() {
        let roster = Roster::new(["X", "Y"]);
        let report = compute_gap_report(&sample(), &dez(), &roster).unwrap();

        assert!(report.iter().all(|s| roster.contains(&s.representative)));
        assert!(report
            .iter()
            .all(|s| !s.unsold_labels.contains("GARRAFA 1L")));
    }

    #[test]
    fn test_roster_members_without_rows_omitted() {
        let report = compute_gap_report(&sample(), &dez(), &roster()).unwrap();
        assert!(report.iter().all(|s| s.representative != "V"));
        assert_eq!(report.len(), 4);
    }

    #[test]
    fn test_detail_lists_every_category_sorted() {
        let report = compute_gap_report(&sample(), &dez(), &roster()).unwrap();
        let z = report.iter().find(|s| s.representative == "Z").unwrap();

        let detail: Vec<_> = z
            .unsold_detail
            .iter()
            .map(|i| (i.category.as_str(), i.product_label.as_str()))
            .collect();
        assert_eq!(
            detail,
            vec![
                ("AGUA", "PT - 7L"),
                ("CAIXA", "CX - ABC"),
                ("CERVEJA", "LATA 350"),
                ("REFRI", "LATA 350"),
            ]
        );
    }

    #[test]
    fn test_deterministic() {
        let records = sample();
        let first = compute_gap_report(&records, &dez(), &roster()).unwrap();
        let mut reversed = records.clone();
        reversed.reverse();
        let second = compute_gap_report(&reversed, &dez(), &roster()).unwrap();
        assert_eq!(first, second);
        assert_eq!(records, sample());
    }

    #[test]
    fn test_empty_scope_is_error() {
        let result = compute_gap_report(&sample(), &Period::new(2025, "jan"), &roster());
        assert_eq!(
            result,
            Err(ReportError::EmptyResult {
                period: Period::new(2025, "jan")
            })
        );

        let result = compute_gap_report(&sample(), &dez(), &Roster::new(["NOBODY"]));
        assert!(matches!(result, Err(ReportError::EmptyResult { .. })));
    }

    #[test]
    fn test_custom_rules() {
        let rules = LabelRules {
            exact: vec![],
            spaced_prefixes: vec!["LATA".into()],
        };
        let records = vec![
            SaleRecord::new("LATA350", "REFRI", "X", 2024, "dez"),
            SaleRecord::new("LATA 350", "REFRI", "Y", 2024, "dez"),
        ];
        let report = compute_gap_report_with(&records, &dez(), &Roster::new(["X", "Y"]), &rules)
            .unwrap();
        assert!(report.iter().all(|s| s.unsold_count == 0));
        assert_eq!(report[0].sold_labels, labels(&["LATA - 350"]));
    }
}
