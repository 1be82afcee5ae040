use shared::Entry;
use std::collections::{BTreeMap, HashSet};

use super::year::Year;

/// All entries recorded for one calendar year, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearLedger {
    entries: Vec<Entry>,
}

impl YearLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn find(&self, id: u64) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn find_mut(&mut self, id: u64) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    /// Remove the entry with `id`, keeping the order of the others
    pub fn remove(&mut self, id: u64) -> Option<Entry> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

/// Every `YearLedger` of the signed-in user, keyed by year
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerCollection {
    years: BTreeMap<Year, YearLedger>,
}

impl LedgerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the ledger for `year`, creating an empty one on first reference
    pub fn ensure_year(&mut self, year: Year) -> &mut YearLedger {
        self.years.entry(year).or_default()
    }

    pub fn insert_year(&mut self, year: Year, ledger: YearLedger) {
        self.years.insert(year, ledger);
    }

    pub fn year(&self, year: Year) -> Option<&YearLedger> {
        self.years.get(&year)
    }

    pub fn contains_year(&self, year: Year) -> bool {
        self.years.contains_key(&year)
    }

    pub fn remove_year(&mut self, year: Year) -> Option<YearLedger> {
        self.years.remove(&year)
    }

    /// Years in ascending order
    pub fn years(&self) -> Vec<Year> {
        self.years.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Year, &YearLedger)> {
        self.years.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.years.values().map(YearLedger::len).sum()
    }

    /// Highest entry id across all years, 0 when there are no entries
    pub fn max_id(&self) -> u64 {
        self.years
            .values()
            .flat_map(|ledger| ledger.entries.iter())
            .map(|entry| entry.id)
            .max()
            .unwrap_or(0)
    }

    /// Give every entry whose id was already used (in any year) a fresh id above
    /// the current maximum. Returns how many entries were renumbered.
    pub fn reassign_duplicate_ids(&mut self) -> usize {
        let mut next = self.max_id() + 1;
        let mut seen = HashSet::new();
        let mut reassigned = 0;

        for ledger in self.years.values_mut() {
            for entry in ledger.entries.iter_mut() {
                if !seen.insert(entry.id) {
                    entry.id = next;
                    seen.insert(next);
                    next += 1;
                    reassigned += 1;
                }
            }
        }

        reassigned
    }
}

/// Source of `Entry.id` values for the whole ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierCounter {
    next: u64,
}

impl Default for IdentifierCounter {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdentifierCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter positioned right after the highest id in `collection`
    pub fn recomputed(collection: &LedgerCollection) -> Self {
        Self {
            next: collection.max_id() + 1,
        }
    }

    pub fn recompute(&mut self, collection: &LedgerCollection) {
        *self = Self::recomputed(collection);
    }

    /// The id the next allocation will return
    pub fn peek(&self) -> u64 {
        self.next
    }

    pub fn allocate(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::EntryKind;

    fn create_test_entry(id: u64, month: u32) -> Entry {
        Entry {
            id,
            kind: EntryKind::Expense,
            month,
            category: "Aluguel".to_string(),
            amount: 100.0,
            note: String::new(),
        }
    }

    fn year(key: &str) -> Year {
        Year::from_storage_key(key).unwrap()
    }

    #[test]
    fn test_ensure_year_is_idempotent() {
        let mut collection = LedgerCollection::new();
        collection.ensure_year(year("2025")).push(create_test_entry(1, 0));
        collection.ensure_year(year("2025"));

        assert_eq!(collection.years(), vec![year("2025")]);
        assert_eq!(collection.year(year("2025")).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut ledger = YearLedger::from_entries(vec![
            create_test_entry(1, 0),
            create_test_entry(2, 1),
            create_test_entry(3, 2),
        ]);

        assert_eq!(ledger.remove(2).map(|e| e.id), Some(2));
        assert_eq!(ledger.remove(2), None);
        let ids: Vec<u64> = ledger.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_counter_recompute() {
        let mut collection = LedgerCollection::new();
        let mut counter = IdentifierCounter::new();
        assert_eq!(counter.peek(), 1);

        collection.ensure_year(year("2024")).push(create_test_entry(4, 0));
        collection.ensure_year(year("2025")).push(create_test_entry(9, 0));
        counter.recompute(&collection);

        assert_eq!(counter.allocate(), 10);
        assert_eq!(counter.peek(), 11);
    }

    #[test]
    fn test_reassign_duplicate_ids_across_years() {
        let mut collection = LedgerCollection::new();
        collection.insert_year(
            year("2023"),
            YearLedger::from_entries(vec![create_test_entry(1, 0), create_test_entry(2, 1)]),
        );
        collection.insert_year(
            year("2024"),
            YearLedger::from_entries(vec![create_test_entry(1, 0), create_test_entry(5, 1)]),
        );

        let reassigned = collection.reassign_duplicate_ids();

        assert_eq!(reassigned, 1);
        let ids: Vec<u64> = collection
            .iter()
            .flat_map(|(_, ledger)| ledger.entries().iter().map(|e| e.id))
            .collect();
        assert_eq!(ids, vec![1, 2, 6, 5]);
        assert_eq!(IdentifierCounter::recomputed(&collection).peek(), 7);
    }
}
