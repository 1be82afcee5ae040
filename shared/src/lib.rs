use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Number of monthly buckets in a ledger year
pub const MONTHS_PER_YEAR: usize = 12;

/// Short month labels used by summaries and charts (index 0 = January)
pub const MONTH_LABELS: [&str; MONTHS_PER_YEAR] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

/// Bucket name used when an entry has no category
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Whether an entry brings money in or takes money out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntryKind {
    /// Money received (salary, extra income, ...)
    #[serde(rename = "ganho")]
    Income,
    /// Money spent (rent, groceries, ...)
    #[serde(rename = "gasto")]
    Expense,
}

impl EntryKind {
    /// Value stored in the `tipo` field of a persisted entry
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Income => "ganho",
            EntryKind::Expense => "gasto",
        }
    }

    /// Human readable label for tables and badges
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Income => "Ganho",
            EntryKind::Expense => "Gasto",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One income or expense line, exactly as persisted under `lancamentos`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique across every year of the ledger
    pub id: u64,
    #[serde(rename = "tipo")]
    pub kind: EntryKind,
    /// Month index, 0 = January
    #[serde(rename = "mes")]
    pub month: u32,
    #[serde(rename = "categoria", default)]
    pub category: String,
    /// Non-negative amount
    #[serde(rename = "valor")]
    pub amount: f64,
    #[serde(rename = "descricao", default)]
    pub note: String,
}

/// Fields to merge into an existing entry. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub kind: Option<EntryKind>,
    pub month: Option<u32>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub note: Option<String>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.month.is_none()
            && self.category.is_none()
            && self.amount.is_none()
            && self.note.is_none()
    }
}

/// Raw form input for recording a new entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddEntryRequest {
    /// Year as typed or selected by the user (e.g. "2025")
    pub year: String,
    pub kind: EntryKind,
    pub month: u32,
    pub category: String,
    /// Amount as typed; both "1.234,56" and "1,234.56" are accepted
    pub amount: String,
    #[serde(default)]
    pub note: String,
}

/// Raw form input for editing an entry. Absent fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditEntryRequest {
    pub kind: Option<EntryKind>,
    pub month: Option<u32>,
    pub category: Option<String>,
    pub amount: Option<String>,
    pub note: Option<String>,
}

/// Filters for the entry table. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryFilter {
    pub kind: Option<EntryKind>,
    pub month: Option<u32>,
    pub category: Option<String>,
}

impl EntryFilter {
    pub fn matches(&self, entry: &Entry) -> bool {
        self.kind.map_or(true, |kind| entry.kind == kind)
            && self.month.map_or(true, |month| entry.month == month)
            && self
                .category
                .as_ref()
                .map_or(true, |category| &entry.category == category)
    }
}

/// Per-month income and expense sums for one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub income: [f64; MONTHS_PER_YEAR],
    pub expense: [f64; MONTHS_PER_YEAR],
}

impl Default for MonthlyTotals {
    fn default() -> Self {
        Self {
            income: [0.0; MONTHS_PER_YEAR],
            expense: [0.0; MONTHS_PER_YEAR],
        }
    }
}

impl MonthlyTotals {
    /// Income minus expense for every month
    pub fn balance(&self) -> [f64; MONTHS_PER_YEAR] {
        let mut balance = [0.0; MONTHS_PER_YEAR];
        for (month, slot) in balance.iter_mut().enumerate() {
            *slot = self.income[month] - self.expense[month];
        }
        balance
    }
}

/// Everything the summary panel shows for one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: String,
    pub income: [f64; MONTHS_PER_YEAR],
    pub expense: [f64; MONTHS_PER_YEAR],
    pub balance: [f64; MONTHS_PER_YEAR],
    pub income_total: f64,
    pub expense_total: f64,
    pub balance_total: f64,
    /// Annual total divided by 12, regardless of how many months have data
    pub income_monthly_average: f64,
    pub expense_monthly_average: f64,
    pub balance_monthly_average: f64,
}

/// Sum for one category, used for breakdown tables and "top N" lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    Bar,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<f64>,
}

/// Plain chart data handed to whatever draws the charts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub kind: ChartKind,
    pub title: String,
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

/// The signed-in user as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserHandle {
    /// Stable identifier, also used as the document id in the store
    pub id: String,
    pub email: Option<String>,
}

/// Entries of one year as persisted under `dadosPorAno.<year>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearRecord {
    #[serde(rename = "lancamentos", default)]
    pub entries: Vec<Entry>,
}

/// Full per-user document written to the document store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(rename = "dadosPorAno", default)]
    pub years: BTreeMap<String, YearRecord>,
    /// year -> { "<tipo>|<categoria>": true } for recurring-category questions already asked
    #[serde(rename = "perguntasFixasPorAno", default)]
    pub fixed_prompts: BTreeMap<String, BTreeMap<String, bool>>,
    #[serde(rename = "nextId", default)]
    pub next_id: u64,
}

/// Key used in `perguntasFixasPorAno` for a kind/category pair
pub fn fixed_prompt_key(kind: EntryKind, category: &str) -> String {
    format!("{}|{}", kind.as_str(), category)
}
