//! Conversion of older year records into the flat `lancamentos` list.
//!
//! Early versions of the ledger stored each year as nested maps under an income
//! root and an expense root instead of a flat entry list. Two layouts exist:
//!
//! ```text
//! Shape A: root[month][category] = item      e.g. {"gastos": {"0": {"Aluguel": 1200}}}
//! Shape B: root[category][month] = item      e.g. {"gastos": {"Aluguel": {"0": 1200}}}
//! ```
//!
//! A root is Shape A when every one of its keys is a month index (0-11), and Shape B
//! otherwise. An `item` can be a bare number, a numeric string, an object carrying
//! the amount (and maybe a note) under one of several field names, or an array of
//! any of those.
//!
//! Migration is best-effort: anything that does not resolve to a month in 0..=11, a
//! non-empty category and a valid amount is dropped without an error.

use log::{debug, warn};
use serde_json::{Map, Value};
use shared::{Entry, EntryKind};

use super::amount_parser::parse_amount;

/// Field holding the flat entry list of a canonical year record
pub const ENTRIES_FIELD: &str = "lancamentos";

const INCOME_ROOTS: &[&str] = &["ganhos", "receitas", "entradas", "income"];
const EXPENSE_ROOTS: &[&str] = &["gastos", "despesas", "saidas", "expenses", "expense"];
const AMOUNT_FIELDS: &[&str] = &["valor", "value", "amount", "total", "quantia"];
const NOTE_FIELDS: &[&str] = &["descricao", "description", "desc", "nota", "note", "obs"];

/// Entries read from one year record
#[derive(Debug, Default, PartialEq)]
pub struct YearMigration {
    pub entries: Vec<Entry>,
    /// Elements of the canonical list that could not be read as entries
    pub unreadable: usize,
}

/// Turn one stored year record into its entries.
///
/// Canonical records pass through as they are. Legacy records have their roots
/// removed and are rewritten into canonical form, so migrating the same record
/// twice gives the same entries.
pub fn migrate_year_record(record: &mut Value) -> Vec<Entry> {
    migrate_year(record).entries
}

/// Same as [`migrate_year_record`], also reporting how many canonical elements
/// were unreadable and therefore left out
pub fn migrate_year(record: &mut Value) -> YearMigration {
    let Some(object) = record.as_object_mut() else {
        debug!("Year record is not an object, treating it as empty");
        *record = canonical_record(&[]);
        return YearMigration::default();
    };

    let (mut entries, unreadable) = canonical_entries(object.get(ENTRIES_FIELD));

    if !has_legacy_roots(object) {
        if !matches!(object.get(ENTRIES_FIELD), Some(Value::Array(_))) {
            object.insert(ENTRIES_FIELD.to_string(), Value::Array(Vec::new()));
        }
        return YearMigration { entries, unreadable };
    }

    let mut migrated = MigratedEntries::default();
    for (kind, aliases) in [(EntryKind::Income, INCOME_ROOTS), (EntryKind::Expense, EXPENSE_ROOTS)] {
        for alias in aliases {
            if let Some(root) = object.remove(*alias) {
                collect_root(kind, &root, &mut migrated);
            }
        }
    }

    debug!(
        "Migrated {} legacy entries next to {} canonical ones",
        migrated.entries.len(),
        entries.len()
    );

    entries.extend(migrated.entries);
    object.insert(
        ENTRIES_FIELD.to_string(),
        serde_json::to_value(&entries).unwrap_or_else(|_| Value::Array(Vec::new())),
    );
    YearMigration { entries, unreadable }
}

fn canonical_record(entries: &[Entry]) -> Value {
    let mut object = Map::new();
    object.insert(
        ENTRIES_FIELD.to_string(),
        serde_json::to_value(entries).unwrap_or_else(|_| Value::Array(Vec::new())),
    );
    Value::Object(object)
}

fn has_legacy_roots(object: &Map<String, Value>) -> bool {
    INCOME_ROOTS
        .iter()
        .chain(EXPENSE_ROOTS.iter())
        .any(|alias| object.contains_key(*alias))
}

fn canonical_entries(value: Option<&Value>) -> (Vec<Entry>, usize) {
    let Some(Value::Array(items)) = value else {
        return (Vec::new(), 0);
    };

    let mut entries = Vec::with_capacity(items.len());
    let mut unreadable = 0;
    for item in items {
        match serde_json::from_value::<Entry>(item.clone()) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!("Unreadable entry left out of the ledger: {} ({})", item, e);
                unreadable += 1;
            }
        }
    }
    (entries, unreadable)
}

/// Entries produced from legacy roots, numbered locally from 1
#[derive(Default)]
struct MigratedEntries {
    entries: Vec<Entry>,
}

impl MigratedEntries {
    fn push(&mut self, kind: EntryKind, month: u32, category: &str, amount: f64, note: String) {
        let id = self.entries.len() as u64 + 1;
        self.entries.push(Entry {
            id,
            kind,
            month,
            category: category.to_string(),
            amount,
            note,
        });
    }
}

fn parse_month(key: &str) -> Option<u32> {
    key.trim().parse::<u32>().ok().filter(|month| *month < 12)
}

fn collect_root(kind: EntryKind, root: &Value, out: &mut MigratedEntries) {
    let Some(root) = root.as_object() else {
        debug!("Ignoring {} root that is not an object", kind);
        return;
    };

    let month_keyed = root.keys().all(|key| parse_month(key).is_some());

    if month_keyed {
        let mut months: Vec<(u32, &Value)> = root
            .iter()
            .filter_map(|(key, value)| parse_month(key).map(|month| (month, value)))
            .collect();
        months.sort_by_key(|(month, _)| *month);

        for (month, categories) in months {
            let Some(categories) = categories.as_object() else {
                debug!("Ignoring month {} of {} root: not a category map", month, kind);
                continue;
            };
            for (category, item) in categories {
                collect_item(kind, month, category, item, out);
            }
        }
    } else {
        for (category, months) in root {
            let Some(months) = months.as_object() else {
                debug!("Ignoring category '{}' of {} root: not a month map", category, kind);
                continue;
            };
            let mut resolved: Vec<(u32, &Value)> = months
                .iter()
                .filter_map(|(key, item)| parse_month(key).map(|month| (month, item)))
                .collect();
            resolved.sort_by_key(|(month, _)| *month);

            for (month, item) in resolved {
                collect_item(kind, month, category, item, out);
            }
        }
    }
}

fn collect_item(kind: EntryKind, month: u32, category: &str, item: &Value, out: &mut MigratedEntries) {
    let category = category.trim();
    if category.is_empty() {
        debug!("Dropping {} item for month {} without category", kind, month);
        return;
    }

    match item {
        Value::Array(items) => {
            for nested in items {
                collect_item(kind, month, category, nested, out);
            }
        }
        Value::Object(fields) => {
            let amount = AMOUNT_FIELDS
                .iter()
                .find_map(|field| fields.get(*field))
                .and_then(amount_from_value);
            let note = NOTE_FIELDS
                .iter()
                .find_map(|field| fields.get(*field).and_then(Value::as_str))
                .map(|note| note.trim().to_string())
                .unwrap_or_default();

            match amount {
                Some(amount) => out.push(kind, month, category, amount, note),
                None => debug!("Dropping {} '{}' item without a usable amount", kind, category),
            }
        }
        other => match amount_from_value(other) {
            Some(amount) => out.push(kind, month, category, amount, String::new()),
            None => debug!("Dropping {} '{}' item {}", kind, category, other),
        },
    }
}

fn amount_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|amount| amount.is_finite() && *amount >= 0.0),
        Value::String(text) => parse_amount(text).ok(),
        _ => None,
    }
}
