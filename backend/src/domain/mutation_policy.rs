//! Strategies for recording a new submission in a year.
//!
//! Two behaviours exist for the same "add" action:
//!
//! - **Append only**: every submission is a new, independently addressable entry.
//!   The same category can appear several times in a month with different notes.
//! - **Upsert by key**: (kind, month, category) identifies an entry. Submitting the
//!   same key again overwrites the amount and note of the existing entry.
//!
//! The strategy is picked once from configuration and then used for every `add`.

use shared::{Entry, EntryKind};

use crate::config::MutationPolicyKind;
use crate::domain::models::{IdentifierCounter, YearLedger};

/// A validated submission that has not been given an id yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub kind: EntryKind,
    pub month: u32,
    pub category: String,
    pub amount: f64,
    pub note: String,
}

impl NewEntry {
    fn into_entry(self, id: u64) -> Entry {
        Entry {
            id,
            kind: self.kind,
            month: self.month,
            category: self.category,
            amount: self.amount,
            note: self.note,
        }
    }
}

pub trait MutationPolicy: Send + Sync {
    fn kind(&self) -> MutationPolicyKind;

    /// Record `draft` in `ledger`, allocating from `counter` when a new entry is
    /// created. Returns the entry as stored.
    fn record(&self, ledger: &mut YearLedger, counter: &mut IdentifierCounter, draft: NewEntry) -> Entry;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AppendOnly;

impl MutationPolicy for AppendOnly {
    fn kind(&self) -> MutationPolicyKind {
        MutationPolicyKind::AppendOnly
    }

    fn record(&self, ledger: &mut YearLedger, counter: &mut IdentifierCounter, draft: NewEntry) -> Entry {
        let entry = draft.into_entry(counter.allocate());
        ledger.push(entry.clone());
        entry
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpsertByKey;

impl MutationPolicy for UpsertByKey {
    fn kind(&self) -> MutationPolicyKind {
        MutationPolicyKind::UpsertByKey
    }

    fn record(&self, ledger: &mut YearLedger, counter: &mut IdentifierCounter, draft: NewEntry) -> Entry {
        let existing_id = ledger
            .entries()
            .iter()
            .find(|entry| {
                entry.kind == draft.kind && entry.month == draft.month && entry.category == draft.category
            })
            .map(|entry| entry.id);

        if let Some(existing) = existing_id.and_then(|id| ledger.find_mut(id)) {
            existing.amount = draft.amount;
            existing.note = draft.note;
            return existing.clone();
        }

        AppendOnly.record(ledger, counter, draft)
    }
}

/// Build the strategy selected in configuration
pub fn policy_for(kind: MutationPolicyKind) -> Box<dyn MutationPolicy> {
    match kind {
        MutationPolicyKind::AppendOnly => Box::new(AppendOnly),
        MutationPolicyKind::UpsertByKey => Box::new(UpsertByKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(month: u32, amount: f64, note: &str) -> NewEntry {
        NewEntry {
            kind: EntryKind::Expense,
            month,
            category: "Lazer".to_string(),
            amount,
            note: note.to_string(),
        }
    }

    #[test]
    fn test_append_only_keeps_duplicates() {
        let policy = policy_for(MutationPolicyKind::AppendOnly);
        let mut ledger = YearLedger::new();
        let mut counter = IdentifierCounter::new();

        let first = policy.record(&mut ledger, &mut counter, draft(3, 50.0, "cinema"));
        let second = policy.record(&mut ledger, &mut counter, draft(3, 80.0, "show"));

        assert_eq!(policy.kind(), MutationPolicyKind::AppendOnly);
        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(ledger.len(), 2);
        assert_eq!(counter.peek(), 3);
    }

    #[test]
    fn test_upsert_replaces_same_key() {
        let policy = policy_for(MutationPolicyKind::UpsertByKey);
        let mut ledger = YearLedger::new();
        let mut counter = IdentifierCounter::new();

        let first = policy.record(&mut ledger, &mut counter, draft(3, 50.0, "cinema"));
        let updated = policy.record(&mut ledger, &mut counter, draft(3, 80.0, "show"));

        assert_eq!(first.id, updated.id);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.entries()[0].amount, 80.0);
        assert_eq!(ledger.entries()[0].note, "show");
        assert_eq!(counter.peek(), 2);
    }

    #[test]
    fn test_upsert_appends_for_different_month() {
        let policy = UpsertByKey;
        let mut ledger = YearLedger::new();
        let mut counter = IdentifierCounter::new();

        policy.record(&mut ledger, &mut counter, draft(3, 50.0, ""));
        policy.record(&mut ledger, &mut counter, draft(4, 50.0, ""));

        assert_eq!(ledger.len(), 2);
    }
}
