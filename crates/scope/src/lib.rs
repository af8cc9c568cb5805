//! Report scoping.
//!
//! A report only looks at the rows of one period sold by roster members.
//! Everything outside that scope is invisible to the gap computation,
//! including when the catalog universe is built.

use skugap_model::{Period, Roster, SaleRecord};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("Empty month code")]
    EmptyMonth,
    #[error("Empty roster")]
    EmptyRoster,
}

/// The period and roster a report is restricted to.
#[derive(Debug, Clone)]
pub struct ReportScope {
    period: Period,
    roster: Roster,
}

impl ReportScope {
    pub fn new(period: Period, roster: Roster) -> Result<Self, ScopeError> {
        if period.month.trim().is_empty() {
            return Err(ScopeError::EmptyMonth);
        }
        if roster.is_empty() {
            return Err(ScopeError::EmptyRoster);
        }
        Ok(Self { period, roster })
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Whether a record falls inside this scope.
    pub fn admits(&self, record: &SaleRecord) -> bool {
        admits(record, &self.period, &self.roster)
    }
}

/// Whether a record belongs to `period` and was sold by a roster member.
pub fn admits(record: &SaleRecord, period: &Period, roster: &Roster) -> bool {
    period.contains(record.year, &record.month_code) && roster.contains(&record.representative)
}

/// Records inside the period and roster, in input order.
pub fn select<'a>(
    records: &'a [SaleRecord],
    period: &'a Period,
    roster: &'a Roster,
) -> impl Iterator<Item = &'a SaleRecord> + 'a {
    records.iter().filter(move |r| admits(r, period, roster))
}
