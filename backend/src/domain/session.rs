//! # Ledger Session
//!
//! Everything the signed-in user does with their ledger goes through a
//! `LedgerSession`. It ties the in-memory `LedgerStore` to the persistence
//! gateway, validates raw input, asks for confirmation where needed and answers
//! the summary queries.
//!
//! ## Lifecycle
//!
//! `Loading` until the stored document has been read, then `Ready`. A mutation that
//! arrives before the session is ready loads first, so nothing is ever recorded on
//! top of an empty ledger that is about to be replaced. When the store cannot be
//! read the session stays `Loading` and mutations fail with
//! `LedgerError::LoadFailed` until a later load succeeds.
//!
//! ## Persistence
//!
//! Every mutation that changed something re-arms the debounced save with a full
//! snapshot. `close` flushes a save that is still waiting.

use log::{info, warn};
use shared::{
    AddEntryRequest, CategoryTotal, EditEntryRequest, Entry, EntryFilter, EntryKind, EntryPatch,
    UserHandle, YearSummary, MONTHS_PER_YEAR,
};
use std::sync::Arc;

use super::amount_parser::parse_amount;
use super::errors::{LedgerError, ValidationError};
use super::ledger_store::LedgerStore;
use super::models::Year;
use super::mutation_policy::{policy_for, NewEntry};
use super::persistence_service::{LoadOutcome, PersistenceGateway};
use super::summary_service::SummaryService;
use crate::config::LedgerConfig;
use crate::io::{ChartRenderer, ConfirmPrompt};
use crate::storage::DocumentStore;

pub const REMOVE_ENTRY_PROMPT: &str = "Deseja realmente excluir este lançamento?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Loading,
    Ready,
}

pub struct LedgerSession {
    config: LedgerConfig,
    user: UserHandle,
    state: SessionState,
    store: LedgerStore,
    gateway: PersistenceGateway,
    summaries: SummaryService,
    confirm: Arc<dyn ConfirmPrompt>,
}

impl LedgerSession {
    pub fn new(
        config: LedgerConfig,
        user: UserHandle,
        document_store: Arc<dyn DocumentStore>,
        confirm: Arc<dyn ConfirmPrompt>,
    ) -> Self {
        let gateway = PersistenceGateway::new(document_store, &config);
        let store = LedgerStore::new(policy_for(config.mutation_policy));
        Self {
            config,
            user,
            state: SessionState::Loading,
            store,
            gateway,
            summaries: SummaryService::new(),
            confirm,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn user(&self) -> &UserHandle {
        &self.user
    }

    /// Load the user's document and make the session ready
    pub async fn start(&mut self) {
        self.state = SessionState::Loading;
        let hydrated = self.gateway.load(&self.user.id).await;
        let outcome = hydrated.outcome;
        let needs_rewrite = hydrated.needs_rewrite;

        self.store.hydrate(hydrated.collection, hydrated.fixed_prompts);
        if self.store.list_years().is_empty() {
            self.store.ensure_year(Year::current());
        }
        if outcome == LoadOutcome::Failed {
            warn!("Ledger for {} could not be loaded, changes are refused", self.user.id);
            return;
        }
        self.state = SessionState::Ready;

        if outcome == LoadOutcome::Loaded && needs_rewrite {
            info!("Rewriting migrated ledger for {}", self.user.id);
            self.schedule_save();
        }
        info!("Session ready for {} ({:?})", self.user.id, outcome);
    }

    async fn ensure_ready(&mut self) -> Result<(), LedgerError> {
        if self.state != SessionState::Ready {
            warn!("Mutation requested before the ledger was loaded, loading now");
            self.start().await;
        }
        if self.state != SessionState::Ready {
            return Err(LedgerError::LoadFailed);
        }
        Ok(())
    }

    fn schedule_save(&mut self) {
        let document = self.store.to_document();
        self.gateway.schedule_save(&self.user.id, document);
    }

    fn parse_year(&self, input: &str) -> Result<Year, ValidationError> {
        Year::parse(input, self.config.min_year, self.config.max_year)
    }

    /// Validate and record a new entry. Returns every entry recorded, which is more
    /// than one when a recurring category was applied to the whole year.
    pub async fn add_entry(&mut self, request: AddEntryRequest) -> Result<Vec<Entry>, LedgerError> {
        self.ensure_ready().await?;

        let year = self.parse_year(&request.year)?;
        let month = validate_month(request.month)?;
        let category = validate_category(&request.category)?;
        let amount = parse_amount(&request.amount).map_err(ValidationError::from)?;
        let note = request.note.trim().to_string();

        let mut recorded = vec![self.store.add(
            year,
            NewEntry {
                kind: request.kind,
                month,
                category: category.clone(),
                amount,
                note: note.clone(),
            },
        )];

        if self.config.categories.is_fixed(request.kind, &category)
            && !self.store.has_prompted_fixed(year, request.kind, &category)
        {
            self.store.mark_prompted_fixed(year, request.kind, &category);
            let question = format!(
                "\"{}\" costuma se repetir todo mês. Lançar este valor nos 12 meses de {}?",
                category, year
            );
            if self.confirm.confirm(&question).await {
                for other in (0..MONTHS_PER_YEAR as u32).filter(|m| *m != month) {
                    recorded.push(self.store.add(
                        year,
                        NewEntry {
                            kind: request.kind,
                            month: other,
                            category: category.clone(),
                            amount,
                            note: note.clone(),
                        },
                    ));
                }
            }
        }

        self.schedule_save();
        Ok(recorded)
    }

    /// Apply the given fields to an entry. Returns false when the entry does not exist.
    pub async fn edit_entry(&mut self, year: Year, id: u64, request: EditEntryRequest) -> Result<bool, LedgerError> {
        self.ensure_ready().await?;

        let patch = EntryPatch {
            kind: request.kind,
            month: request.month.map(validate_month).transpose()?,
            category: request
                .category
                .as_deref()
                .map(validate_category)
                .transpose()?,
            amount: request
                .amount
                .as_deref()
                .map(parse_amount)
                .transpose()
                .map_err(ValidationError::from)?,
            note: request.note.map(|note| note.trim().to_string()),
        };

        if patch.is_empty() {
            return Ok(self.store.find(year, id).is_some());
        }

        let edited = self.store.edit(year, id, patch);
        if edited {
            self.schedule_save();
        }
        Ok(edited)
    }

    /// Remove an entry after confirmation. Returns whether it was removed.
    pub async fn remove_entry(&mut self, year: Year, id: u64) -> Result<bool, LedgerError> {
        self.ensure_ready().await?;

        if self.store.find(year, id).is_none() {
            return Ok(false);
        }
        if !self.confirm.confirm(REMOVE_ENTRY_PROMPT).await {
            return Ok(false);
        }

        let removed = self.store.remove(year, id).is_some();
        if removed {
            self.schedule_save();
        }
        Ok(removed)
    }

    /// Add an empty year typed by the user
    pub async fn create_year(&mut self, input: &str) -> Result<Year, LedgerError> {
        self.ensure_ready().await?;

        let year = self.parse_year(input)?;
        self.store.ensure_year(year);
        self.schedule_save();
        Ok(year)
    }

    /// Delete a whole year after confirmation. Deleting the last year leaves an
    /// empty current year behind.
    pub async fn delete_year(&mut self, year: Year) -> Result<bool, LedgerError> {
        self.ensure_ready().await?;

        let question = format!("Excluir todos os lançamentos de {}? Esta ação não pode ser desfeita.", year);
        if !self.confirm.confirm(&question).await {
            return Ok(false);
        }

        self.store.delete_year(year, Year::current());
        self.gateway.note_deleted_year(year);
        self.schedule_save();
        Ok(true)
    }

    pub fn list_years(&self) -> Vec<Year> {
        self.store.list_years()
    }

    /// Year selected when nothing else was chosen: the latest one
    pub fn default_year(&self) -> Year {
        self.store
            .list_years()
            .last()
            .copied()
            .unwrap_or_else(Year::current)
    }

    fn year_entries(&self, year: Year) -> &[Entry] {
        self.store
            .collection()
            .year(year)
            .map(|ledger| ledger.entries())
            .unwrap_or(&[])
    }

    /// Entries of a year matching `filter`, ordered by month then id
    pub fn entries(&self, year: Year, filter: &EntryFilter) -> Vec<Entry> {
        let mut entries: Vec<Entry> = self
            .year_entries(year)
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect();
        entries.sort_by_key(|entry| (entry.month, entry.id));
        entries
    }

    pub fn summary(&self, year: Year) -> YearSummary {
        self.summaries.year_summary(year, self.year_entries(year))
    }

    pub fn category_totals(&self, year: Year, kind: EntryKind) -> Vec<CategoryTotal> {
        self.summaries.category_totals(self.year_entries(year), kind)
    }

    pub fn top_categories(&self, year: Year, kind: EntryKind, n: usize) -> Vec<CategoryTotal> {
        let totals = self.category_totals(year, kind);
        self.summaries.top_n(&totals, n)
    }

    /// Default categories for `kind`, then any other category already used
    pub fn category_suggestions(&self, kind: EntryKind) -> Vec<String> {
        let mut suggestions = self.config.categories.defaults_for(kind).to_vec();
        for category in self.store.category_history(kind) {
            if !suggestions.contains(&category) {
                suggestions.push(category);
            }
        }
        suggestions
    }

    /// Push both charts of `year` to `renderer`
    pub fn render_charts(&self, year: Year, renderer: &dyn ChartRenderer) {
        let entries = self.year_entries(year);
        renderer.render(&self.summaries.expense_category_chart(year, entries));
        renderer.render(&self.summaries.monthly_chart(year, entries));
    }

    pub fn has_pending_save(&self) -> bool {
        self.gateway.has_pending_save()
    }

    /// Wait for the scheduled save to be written
    pub async fn wait_for_pending_save(&mut self) {
        self.gateway.wait_for_pending_save().await;
    }

    /// End the session, writing any save that is still waiting
    pub async fn close(&mut self) -> Result<(), LedgerError> {
        let pending = self.gateway.has_pending_save();
        self.state = SessionState::Unauthenticated;
        if pending {
            let document = self.store.to_document();
            self.gateway.flush(&self.user.id, document).await?;
        }
        info!("Session closed for {}", self.user.id);
        Ok(())
    }
}

fn validate_month(month: u32) -> Result<u32, ValidationError> {
    if (month as usize) < MONTHS_PER_YEAR {
        Ok(month)
    } else {
        Err(ValidationError::InvalidMonth(month))
    }
}

fn validate_category(category: &str) -> Result<String, ValidationError> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyCategory)
    } else {
        Ok(trimmed.to_string())
    }
}
