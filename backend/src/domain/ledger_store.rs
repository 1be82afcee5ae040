//! In-memory ledger for the active session.
//!
//! `LedgerStore` owns the `LedgerCollection`, the `IdentifierCounter` and the set of
//! recurring-category questions already answered. Every operation works on an
//! absent year by creating it first, so callers never see a "year not found"
//! failure. Mutations are applied immediately; persisting them is the caller's job
//! (see `LedgerSession`).

use log::{debug, info};
use shared::{fixed_prompt_key, Entry, EntryKind, EntryPatch, LedgerDocument, YearRecord};
use std::collections::{BTreeMap, BTreeSet};

use super::models::{IdentifierCounter, LedgerCollection, Year};
use super::mutation_policy::{MutationPolicy, NewEntry};
use crate::config::MutationPolicyKind;

pub struct LedgerStore {
    collection: LedgerCollection,
    counter: IdentifierCounter,
    policy: Box<dyn MutationPolicy>,
    fixed_prompts: BTreeMap<Year, BTreeSet<String>>,
}

impl LedgerStore {
    pub fn new(policy: Box<dyn MutationPolicy>) -> Self {
        Self {
            collection: LedgerCollection::new(),
            counter: IdentifierCounter::new(),
            policy,
            fixed_prompts: BTreeMap::new(),
        }
    }

    pub fn policy_kind(&self) -> MutationPolicyKind {
        self.policy.kind()
    }

    /// Replace the whole state with freshly loaded data. The counter is
    /// recomputed from the loaded entries.
    pub fn hydrate(&mut self, collection: LedgerCollection, fixed_prompts: BTreeMap<Year, BTreeSet<String>>) {
        self.counter = IdentifierCounter::recomputed(&collection);
        self.collection = collection;
        self.fixed_prompts = fixed_prompts;
        info!(
            "Ledger hydrated with {} years and {} entries, next id {}",
            self.collection.years().len(),
            self.collection.entry_count(),
            self.counter.peek()
        );
    }

    pub fn ensure_year(&mut self, year: Year) {
        self.collection.ensure_year(year);
    }

    /// Record a new submission through the configured mutation policy
    pub fn add(&mut self, year: Year, draft: NewEntry) -> Entry {
        let ledger = self.collection.ensure_year(year);
        let entry = self.policy.record(ledger, &mut self.counter, draft);
        debug!("Recorded entry {} in {}", entry.id, year);
        entry
    }

    /// Merge `patch` into entry `id` of `year`. Returns false when there is no such entry.
    pub fn edit(&mut self, year: Year, id: u64, patch: EntryPatch) -> bool {
        let Some(entry) = self.collection.ensure_year(year).find_mut(id) else {
            debug!("Edit ignored: entry {} not found in {}", id, year);
            return false;
        };

        if let Some(kind) = patch.kind {
            entry.kind = kind;
        }
        if let Some(month) = patch.month {
            entry.month = month;
        }
        if let Some(category) = patch.category {
            entry.category = category;
        }
        if let Some(amount) = patch.amount {
            entry.amount = amount;
        }
        if let Some(note) = patch.note {
            entry.note = note;
        }
        true
    }

    pub fn remove(&mut self, year: Year, id: u64) -> Option<Entry> {
        let removed = self.collection.ensure_year(year).remove(id);
        if removed.is_none() {
            debug!("Remove ignored: entry {} not found in {}", id, year);
        }
        removed
    }

    /// Drop a whole year. If no year remains, `fallback` (normally the current
    /// calendar year) is created empty. The counter is recomputed either way.
    pub fn delete_year(&mut self, year: Year, fallback: Year) -> bool {
        let existed = self.collection.remove_year(year).is_some();
        self.fixed_prompts.remove(&year);

        if self.collection.is_empty() {
            self.collection.ensure_year(fallback);
        }
        self.counter.recompute(&self.collection);

        info!("Deleted year {} (existed: {}), next id {}", year, existed, self.counter.peek());
        existed
    }

    /// Years in ascending order
    pub fn list_years(&self) -> Vec<Year> {
        self.collection.years()
    }

    pub fn entries(&mut self, year: Year) -> &[Entry] {
        self.collection.ensure_year(year).entries()
    }

    pub fn find(&self, year: Year, id: u64) -> Option<&Entry> {
        self.collection.year(year).and_then(|ledger| ledger.find(id))
    }

    pub fn collection(&self) -> &LedgerCollection {
        &self.collection
    }

    pub fn next_id(&self) -> u64 {
        self.counter.peek()
    }

    /// Categories used so far for `kind`, across all years, in first-seen order
    pub fn category_history(&self, kind: EntryKind) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.collection
            .iter()
            .flat_map(|(_, ledger)| ledger.entries().iter())
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.category.trim())
            .filter(|category| !category.is_empty() && seen.insert(category.to_string()))
            .map(str::to_string)
            .collect()
    }

    pub fn has_prompted_fixed(&self, year: Year, kind: EntryKind, category: &str) -> bool {
        self.fixed_prompts
            .get(&year)
            .map_or(false, |asked| asked.contains(&fixed_prompt_key(kind, category)))
    }

    pub fn mark_prompted_fixed(&mut self, year: Year, kind: EntryKind, category: &str) {
        self.fixed_prompts
            .entry(year)
            .or_default()
            .insert(fixed_prompt_key(kind, category));
    }

    /// Snapshot of the full state in the persisted document shape
    pub fn to_document(&self) -> LedgerDocument {
        let years = self
            .collection
            .iter()
            .map(|(year, ledger)| {
                (
                    year.storage_key(),
                    YearRecord {
                        entries: ledger.entries().to_vec(),
                    },
                )
            })
            .collect();

        let fixed_prompts = self
            .fixed_prompts
            .iter()
            .map(|(year, keys)| {
                (
                    year.storage_key(),
                    keys.iter().map(|key| (key.clone(), true)).collect(),
                )
            })
            .collect();

        LedgerDocument {
            years,
            fixed_prompts,
            next_id: self.counter.peek(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mutation_policy::policy_for;

    fn create_test_store() -> LedgerStore {
        LedgerStore::new(policy_for(MutationPolicyKind::AppendOnly))
    }

    fn year(key: &str) -> Year {
        Year::from_storage_key(key).unwrap()
    }

    fn draft(kind: EntryKind, month: u32, category: &str, amount: f64) -> NewEntry {
        NewEntry {
            kind,
            month,
            category: category.to_string(),
            amount,
            note: String::new(),
        }
    }

    #[test]
    fn test_add_then_remove_restores_length() {
        let mut store = create_test_store();
        store.add(year("2025"), draft(EntryKind::Expense, 0, "Aluguel", 1200.0));
        let before = store.entries(year("2025")).len();

        let entry = store.add(year("2025"), draft(EntryKind::Expense, 1, "Lazer", 30.0));
        store.remove(year("2025"), entry.id);

        assert_eq!(store.entries(year("2025")).len(), before);
    }

    #[test]
    fn test_ids_are_unique_across_years() {
        let mut store = create_test_store();

        let a = store.add(year("2024"), draft(EntryKind::Income, 0, "Salário", 1.0));
        let b = store.add(year("2025"), draft(EntryKind::Income, 0, "Salário", 1.0));
        let c = store.add(year("2024"), draft(EntryKind::Income, 1, "Salário", 1.0));

        assert_eq!((a.id, b.id, c.id), (1, 2, 3));
        assert_eq!(store.next_id(), 4);
    }

    #[test]
    fn test_removed_ids_are_not_reused() {
        let mut store = create_test_store();
        let first = store.add(year("2025"), draft(EntryKind::Income, 0, "Salário", 1.0));
        store.add(year("2025"), draft(EntryKind::Income, 1, "Salário", 1.0));

        store.remove(year("2025"), first.id);
        let next = store.add(year("2025"), draft(EntryKind::Income, 2, "Salário", 1.0));

        assert_eq!(next.id, 3);
    }

    #[test]
    fn test_edit_merges_only_given_fields() {
        let mut store = create_test_store();
        let entry = store.add(year("2025"), draft(EntryKind::Expense, 4, "Lazer", 30.0));

        let found = store.edit(
            year("2025"),
            entry.id,
            EntryPatch {
                amount: Some(45.0),
                note: Some("cinema".to_string()),
                ..Default::default()
            },
        );

        assert!(found);
        let edited = store.find(year("2025"), entry.id).unwrap();
        assert_eq!(edited.amount, 45.0);
        assert_eq!(edited.note, "cinema");
        assert_eq!(edited.month, 4);
        assert_eq!(edited.category, "Lazer");
    }

    #[test]
    fn test_edit_and_remove_unknown_id_are_noops() {
        let mut store = create_test_store();
        store.add(year("2025"), draft(EntryKind::Expense, 4, "Lazer", 30.0));

        assert!(!store.edit(year("2025"), 99, EntryPatch { amount: Some(1.0), ..Default::default() }));
        assert!(store.remove(year("2025"), 99).is_none());
        assert!(store.remove(year("2030"), 1).is_none());
        assert_eq!(store.entries(year("2025")).len(), 1);
        assert_eq!(store.list_years(), vec![year("2025"), year("2030")]);
    }

    #[test]
    fn test_delete_only_year_recreates_fallback() {
        let mut store = create_test_store();
        store.add(year("2023"), draft(EntryKind::Expense, 0, "Aluguel", 1.0));

        assert!(store.delete_year(year("2023"), year("2026")));

        assert_eq!(store.list_years(), vec![year("2026")]);
        assert!(store.entries(year("2026")).is_empty());
        assert_eq!(store.next_id(), 1);
    }

    #[test]
    fn test_delete_year_recomputes_counter() {
        let mut store = create_test_store();
        store.add(year("2024"), draft(EntryKind::Expense, 0, "Aluguel", 1.0));
        store.add(year("2025"), draft(EntryKind::Expense, 0, "Aluguel", 1.0));
        store.add(year("2025"), draft(EntryKind::Expense, 1, "Aluguel", 1.0));

        store.delete_year(year("2025"), year("2026"));

        assert_eq!(store.list_years(), vec![year("2024")]);
        assert_eq!(store.next_id(), 2);
    }

    #[test]
    fn test_list_years_ascending() {
        let mut store = create_test_store();
        store.ensure_year(year("2026"));
        store.ensure_year(year("2019"));
        store.ensure_year(year("2024"));

        assert_eq!(store.list_years(), vec![year("2019"), year("2024"), year("2026")]);
    }

    #[test]
    fn test_category_history_first_seen_order() {
        let mut store = create_test_store();
        store.add(year("2024"), draft(EntryKind::Expense, 0, "Pet", 1.0));
        store.add(year("2025"), draft(EntryKind::Expense, 0, "Academia", 1.0));
        store.add(year("2025"), draft(EntryKind::Expense, 1, "Pet", 1.0));
        store.add(year("2025"), draft(EntryKind::Income, 1, "Freela", 1.0));

        assert_eq!(store.category_history(EntryKind::Expense), vec!["Pet", "Academia"]);
        assert_eq!(store.category_history(EntryKind::Income), vec!["Freela"]);
    }

    #[test]
    fn test_fixed_prompts_and_document_snapshot() {
        let mut store = create_test_store();
        store.add(year("2025"), draft(EntryKind::Income, 0, "Salário", 5000.0));
        assert!(!store.has_prompted_fixed(year("2025"), EntryKind::Income, "Salário"));

        store.mark_prompted_fixed(year("2025"), EntryKind::Income, "Salário");

        assert!(store.has_prompted_fixed(year("2025"), EntryKind::Income, "Salário"));
        assert!(!store.has_prompted_fixed(year("2024"), EntryKind::Income, "Salário"));

        let document = store.to_document();
        assert_eq!(document.next_id, 2);
        assert_eq!(document.years["2025"].entries.len(), 1);
        assert_eq!(document.fixed_prompts["2025"].get("ganho|Salário"), Some(&true));
    }

    #[test]
    fn test_hydrate_recomputes_counter() {
        let mut store = create_test_store();
        let mut collection = LedgerCollection::new();
        collection.ensure_year(year("2025")).push(Entry {
            id: 41,
            kind: EntryKind::Expense,
            month: 0,
            category: "Aluguel".to_string(),
            amount: 1.0,
            note: String::new(),
        });

        store.hydrate(collection, BTreeMap::new());

        assert_eq!(store.next_id(), 42);
        let added = store.add(year("2025"), draft(EntryKind::Expense, 1, "Aluguel", 1.0));
        assert_eq!(added.id, 42);
    }
}
