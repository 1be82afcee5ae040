//! # Persistence Service
//!
//! Moves the ledger between memory and the document store.
//!
//! ## Key Responsibilities
//!
//! - **Load**: fetch the user's document, migrate every year record to the
//!   canonical shape, make ids unique and hand back a ready-to-use collection.
//!   A failed read is logged and treated as an empty ledger.
//! - **Debounced save**: every mutation re-arms a single timer; only when the
//!   timer runs out is the latest full document written. Several mutations inside
//!   the window produce one write.
//! - **Flush**: write immediately, used when the session ends.
//!
//! Once the timer fires the write runs in its own task, so re-arming the timer
//! never cancels a write that has already started. Writes are serialized through a
//! lock and land in the order they were dispatched.

use log::{debug, error, info, warn};
use serde_json::{Map, Value};
use shared::LedgerDocument;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::errors::LedgerError;
use super::legacy_migration::migrate_year;
use super::models::{LedgerCollection, Year, YearLedger};
use crate::config::{LedgerConfig, WriteMode};
use crate::storage::{DocumentStore, SetOptions};

const YEARS_FIELD: &str = "dadosPorAno";
const FIXED_PROMPTS_FIELD: &str = "perguntasFixasPorAno";

/// Where the loaded ledger came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// No document stored for this user yet
    Missing,
    /// The store could not be read; the ledger starts empty
    Failed,
}

/// Result of loading a user's document
#[derive(Debug)]
pub struct HydratedLedger {
    pub collection: LedgerCollection,
    pub fixed_prompts: BTreeMap<Year, BTreeSet<String>>,
    pub outcome: LoadOutcome,
    /// Migration or id repair changed the data, so the stored copy is stale
    pub needs_rewrite: bool,
    /// Stored entries that could not be read and are missing from `collection`
    pub unreadable_entries: usize,
}

impl HydratedLedger {
    fn empty(outcome: LoadOutcome) -> Self {
        Self {
            collection: LedgerCollection::new(),
            fixed_prompts: BTreeMap::new(),
            outcome,
            needs_rewrite: false,
            unreadable_entries: 0,
        }
    }
}

/// Turn a stored document into a collection. Never fails: anything that cannot be
/// read is skipped.
pub fn hydrate_document(document: Value) -> HydratedLedger {
    let mut hydrated = HydratedLedger::empty(LoadOutcome::Loaded);

    let Value::Object(mut root) = document else {
        warn!("Stored ledger is not an object, starting empty");
        hydrated.needs_rewrite = true;
        return hydrated;
    };

    if let Some(Value::Object(years)) = root.remove(YEARS_FIELD) {
        for (key, mut record) in years {
            let Some(year) = Year::from_storage_key(&key) else {
                warn!("Skipping stored year with invalid key '{}'", key);
                hydrated.needs_rewrite = true;
                continue;
            };

            let original = record.clone();
            let migration = migrate_year(&mut record);
            if record != original {
                hydrated.needs_rewrite = true;
            }
            hydrated.unreadable_entries += migration.unreadable;
            hydrated
                .collection
                .insert_year(year, YearLedger::from_entries(migration.entries));
        }
    }

    if hydrated.unreadable_entries > 0 {
        warn!(
            "{} stored entries could not be read and will not be saved back",
            hydrated.unreadable_entries
        );
    }

    let reassigned = hydrated.collection.reassign_duplicate_ids();
    if reassigned > 0 {
        info!("Reassigned {} duplicate entry ids", reassigned);
        hydrated.needs_rewrite = true;
    }

    if let Some(Value::Object(prompts)) = root.remove(FIXED_PROMPTS_FIELD) {
        for (key, asked) in prompts {
            let (Some(year), Value::Object(asked)) = (Year::from_storage_key(&key), asked) else {
                continue;
            };
            let keys: BTreeSet<String> = asked
                .into_iter()
                .filter(|(_, value)| value.as_bool() == Some(true))
                .map(|(prompt, _)| prompt)
                .collect();
            if !keys.is_empty() {
                hydrated.fixed_prompts.insert(year, keys);
            }
        }
    }

    hydrated
}

/// Years deleted locally and not yet removed remotely, with the revision at
/// which each deletion happened
type DeletedYears = Arc<Mutex<BTreeMap<String, u64>>>;

pub struct PersistenceGateway {
    store: Arc<dyn DocumentStore>,
    collection: String,
    debounce: Duration,
    write_mode: WriteMode,
    pending: Option<JoinHandle<()>>,
    /// Bumped on every deletion and every snapshot, so a write only acts on
    /// deletions that happened before its document was taken
    revision: u64,
    deleted_years: DeletedYears,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn DocumentStore>, config: &LedgerConfig) -> Self {
        Self {
            store,
            collection: config.collection.clone(),
            debounce: config.save_debounce(),
            write_mode: config.write_mode,
            pending: None,
            revision: 0,
            deleted_years: Arc::new(Mutex::new(BTreeMap::new())),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub async fn load(&self, user_id: &str) -> HydratedLedger {
        match self.store.get(&self.collection, user_id).await {
            Ok(Some(document)) => {
                let hydrated = hydrate_document(document);
                info!(
                    "Loaded ledger for {}: {} years, {} entries",
                    user_id,
                    hydrated.collection.years().len(),
                    hydrated.collection.entry_count()
                );
                hydrated
            }
            Ok(None) => {
                info!("No stored ledger for {}", user_id);
                HydratedLedger::empty(LoadOutcome::Missing)
            }
            Err(e) => {
                error!("Failed to load ledger for {}: {:#}", user_id, e);
                HydratedLedger::empty(LoadOutcome::Failed)
            }
        }
    }

    /// Remember that a year was deleted so a merging write can remove it remotely
    pub fn note_deleted_year(&mut self, year: Year) {
        self.revision += 1;
        if let Ok(mut deleted) = self.deleted_years.lock() {
            deleted.insert(year.storage_key(), self.revision);
        }
    }

    /// Re-arm the save timer with the latest document. Any save still waiting
    /// for its timer is dropped.
    pub fn schedule_save(&mut self, user_id: &str, document: LedgerDocument) {
        self.cancel_pending();

        let writer = self.writer(user_id);
        let debounce = self.debounce;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let write = tokio::spawn(async move {
                if let Err(e) = writer.write(document).await {
                    error!("Failed to save ledger for {}: {:#}", writer.user_id, e);
                }
            });
            let _ = write.await;
        }));
        debug!("Save scheduled for {} in {:?}", user_id, debounce);
    }

    pub fn has_pending_save(&self) -> bool {
        self.pending
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Drop a save that is still waiting for its timer. A write already in
    /// progress is not affected.
    pub fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Wait until the scheduled save (if any) has fired and finished writing
    pub async fn wait_for_pending_save(&mut self) {
        if let Some(handle) = self.pending.take() {
            let _ = handle.await;
        }
    }

    /// Write `document` right away, replacing any scheduled save
    pub async fn flush(&mut self, user_id: &str, document: LedgerDocument) -> Result<(), LedgerError> {
        self.cancel_pending();
        self.writer(user_id).write(document).await?;
        info!("Ledger flushed for {}", user_id);
        Ok(())
    }

    fn writer(&mut self, user_id: &str) -> DocumentWriter {
        self.revision += 1;
        DocumentWriter {
            store: Arc::clone(&self.store),
            collection: self.collection.clone(),
            user_id: user_id.to_string(),
            write_mode: self.write_mode,
            revision: self.revision,
            deleted_years: Arc::clone(&self.deleted_years),
            write_lock: Arc::clone(&self.write_lock),
        }
    }
}

impl Drop for PersistenceGateway {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

/// Everything a single write needs, detached from the gateway
struct DocumentWriter {
    store: Arc<dyn DocumentStore>,
    collection: String,
    user_id: String,
    write_mode: WriteMode,
    /// Revision at which the document was taken
    revision: u64,
    deleted_years: DeletedYears,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl DocumentWriter {
    async fn write(&self, document: LedgerDocument) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;

        // Deletions made after this document was taken belong to a later write
        let tombstones: Vec<(String, u64)> = match self.deleted_years.lock() {
            Ok(deleted) => deleted
                .iter()
                .filter(|(_, deleted_at)| **deleted_at < self.revision)
                .map(|(year, deleted_at)| (year.clone(), *deleted_at))
                .collect(),
            Err(_) => Vec::new(),
        };
        let (recreated, removed): (Vec<_>, Vec<_>) = tombstones
            .into_iter()
            .partition(|(year, _)| document.years.contains_key(year));

        let mut value = serde_json::to_value(&document)?;
        let options = match self.write_mode {
            WriteMode::Replace => SetOptions::replace(),
            WriteMode::Merge => {
                // A merge would keep the old remote fields of a year that was
                // deleted and created again, so clear those years first
                if !recreated.is_empty() {
                    let mut clear = Value::Object(Map::new());
                    insert_tombstones(&mut clear, YEARS_FIELD, &recreated);
                    insert_tombstones(&mut clear, FIXED_PROMPTS_FIELD, &recreated);
                    self.store
                        .set(&self.collection, &self.user_id, clear, SetOptions::merge())
                        .await?;
                    self.clear_tombstones(&recreated);
                }
                insert_tombstones(&mut value, YEARS_FIELD, &removed);
                insert_tombstones(&mut value, FIXED_PROMPTS_FIELD, &removed);
                SetOptions::merge()
            }
        };

        self.store
            .set(&self.collection, &self.user_id, value, options)
            .await?;

        self.clear_tombstones(&recreated);
        self.clear_tombstones(&removed);
        debug!("Ledger written for {} ({:?})", self.user_id, self.write_mode);
        Ok(())
    }

    /// Forget tombstones a successful write carried. A year deleted again since
    /// then keeps its newer tombstone.
    fn clear_tombstones(&self, carried: &[(String, u64)]) {
        if let Ok(mut deleted) = self.deleted_years.lock() {
            for (year, deleted_at) in carried {
                if deleted.get(year) == Some(deleted_at) {
                    deleted.remove(year);
                }
            }
        }
    }
}

fn insert_tombstones(document: &mut Value, field: &str, years: &[(String, u64)]) {
    if years.is_empty() {
        return;
    }
    let Some(root) = document.as_object_mut() else {
        return;
    };
    let section = root
        .entry(field.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(section) = section.as_object_mut() {
        for (year, _) in years {
            section.insert(year.clone(), Value::Null);
        }
    }
}
