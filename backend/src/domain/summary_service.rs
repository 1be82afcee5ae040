//! Summary service: totals, breakdowns and chart data derived from a year's entries.
//!
//! Everything here is a pure function of an entry snapshot. Nothing is cached;
//! callers re-query after every mutation.
//!
//! ## Conventions
//!
//! - Entries with a month outside 0..=11 or a non-finite amount are skipped
//! - Categories are compared after trimming; empty ones fall into `Uncategorized`
//! - Monthly averages divide the annual total by 12, not by the number of months
//!   that actually have entries

use shared::{
    CategoryTotal, ChartDataset, ChartKind, ChartSeries, Entry, EntryKind, MonthlyTotals, YearSummary,
    MONTHS_PER_YEAR, MONTH_LABELS, UNCATEGORIZED,
};

use super::models::Year;

#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryService;

impl SummaryService {
    pub fn new() -> Self {
        Self
    }

    /// Sum amounts into the month bucket of each entry, per kind
    pub fn monthly_totals(&self, entries: &[Entry]) -> MonthlyTotals {
        let mut totals = MonthlyTotals::default();

        for entry in entries {
            let month = entry.month as usize;
            if month >= MONTHS_PER_YEAR || !entry.amount.is_finite() {
                continue;
            }
            match entry.kind {
                EntryKind::Income => totals.income[month] += entry.amount,
                EntryKind::Expense => totals.expense[month] += entry.amount,
            }
        }

        totals
    }

    /// Totals per category for one kind, in the order categories first appear
    pub fn category_totals(&self, entries: &[Entry], kind: EntryKind) -> Vec<CategoryTotal> {
        let mut totals: Vec<CategoryTotal> = Vec::new();

        for entry in entries.iter().filter(|entry| entry.kind == kind) {
            if !entry.amount.is_finite() {
                continue;
            }
            let trimmed = entry.category.trim();
            let category = if trimmed.is_empty() { UNCATEGORIZED } else { trimmed };

            match totals.iter_mut().find(|total| total.category == category) {
                Some(total) => total.total += entry.amount,
                None => totals.push(CategoryTotal {
                    category: category.to_string(),
                    total: entry.amount,
                }),
            }
        }

        totals
    }

    /// The `n` largest totals, largest first. Ties keep their original order.
    pub fn top_n(&self, totals: &[CategoryTotal], n: usize) -> Vec<CategoryTotal> {
        let mut ranked = totals.to_vec();
        ranked.sort_by(|a, b| b.total.total_cmp(&a.total));
        ranked.truncate(n);
        ranked
    }

    pub fn year_summary(&self, year: Year, entries: &[Entry]) -> YearSummary {
        let totals = self.monthly_totals(entries);
        let balance = totals.balance();

        let income_total: f64 = totals.income.iter().sum();
        let expense_total: f64 = totals.expense.iter().sum();
        let balance_total = income_total - expense_total;
        let months = MONTHS_PER_YEAR as f64;

        YearSummary {
            year: year.storage_key(),
            income: totals.income,
            expense: totals.expense,
            balance,
            income_total,
            expense_total,
            balance_total,
            income_monthly_average: income_total / months,
            expense_monthly_average: expense_total / months,
            balance_monthly_average: balance_total / months,
        }
    }

    /// Bar chart of yearly expenses per category
    pub fn expense_category_chart(&self, year: Year, entries: &[Entry]) -> ChartSeries {
        let totals = self.category_totals(entries, EntryKind::Expense);

        ChartSeries {
            kind: ChartKind::Bar,
            title: format!("Gastos por categoria em {}", year),
            labels: totals.iter().map(|total| total.category.clone()).collect(),
            datasets: vec![ChartDataset {
                label: "Gastos (R$ / ano)".to_string(),
                data: totals.iter().map(|total| total.total).collect(),
            }],
        }
    }

    /// Line chart of monthly income against monthly expenses
    pub fn monthly_chart(&self, year: Year, entries: &[Entry]) -> ChartSeries {
        let totals = self.monthly_totals(entries);

        ChartSeries {
            kind: ChartKind::Line,
            title: format!("Ganhos x gastos em {}", year),
            labels: MONTH_LABELS.iter().map(|label| label.to_string()).collect(),
            datasets: vec![
                ChartDataset {
                    label: "Ganhos".to_string(),
                    data: totals.income.to_vec(),
                },
                ChartDataset {
                    label: "Gastos".to_string(),
                    data: totals.expense.to_vec(),
                },
            ],
        }
    }
}
