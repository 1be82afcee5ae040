//! # Ledger Configuration
//!
//! Settings chosen once at startup. Every field has a default, so a YAML file only
//! needs the keys it wants to change.
//!
//! ## YAML Format
//!
//! ```yaml
//! collection: "usuarios"
//! save_debounce_ms: 500
//! mutation_policy: append_only     # or upsert_by_key
//! write_mode: replace              # or merge
//! min_year: 1900
//! max_year: 9999
//! categories:
//!   income: ["Salário", "Renda extra"]
//!   fixed_expense: ["Aluguel"]
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use shared::EntryKind;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::domain::models::{MAX_YEAR, MIN_YEAR};

/// How new submissions are recorded in a year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationPolicyKind {
    /// Every submission becomes a new entry
    AppendOnly,
    /// A submission with the same kind, month and category replaces the existing entry
    UpsertByKey,
}

/// How the full document is written to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// The stored document becomes exactly the written one
    Replace,
    /// Written fields are merged into the stored document; deleted years are
    /// written as `null` tombstones
    Merge,
}

/// Category suggestions and the categories that usually repeat every month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub income: Vec<String>,
    pub expense: Vec<String>,
    pub fixed_income: Vec<String>,
    pub fixed_expense: Vec<String>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|item| item.to_string()).collect()
        }

        Self {
            income: owned(&["Salário", "Renda extra", "13º salário", "Férias", "Outros ganhos"]),
            expense: owned(&[
                "Aluguel",
                "Supermercado",
                "Combustível",
                "Despesas fixas",
                "Cartões de crédito",
                "Saúde",
                "Educação",
                "Lazer",
                "Impostos",
                "Outros gastos",
            ]),
            fixed_income: owned(&["Salário", "13º salário", "Férias"]),
            fixed_expense: owned(&[
                "Aluguel",
                "Despesas fixas",
                "Cartões de crédito",
                "Saúde",
                "Educação",
                "Impostos",
            ]),
        }
    }
}

impl CategoryConfig {
    /// Default suggestions for a kind
    pub fn defaults_for(&self, kind: EntryKind) -> &[String] {
        match kind {
            EntryKind::Income => &self.income,
            EntryKind::Expense => &self.expense,
        }
    }

    /// Whether a category usually repeats every month for this kind
    pub fn is_fixed(&self, kind: EntryKind, category: &str) -> bool {
        let fixed = match kind {
            EntryKind::Income => &self.fixed_income,
            EntryKind::Expense => &self.fixed_expense,
        };
        fixed.iter().any(|candidate| candidate == category)
    }
}

/// Top-level configuration for a ledger backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Document-store collection holding one document per user
    pub collection: String,
    /// Quiet period after the last mutation before the document is written
    pub save_debounce_ms: u64,
    pub mutation_policy: MutationPolicyKind,
    pub write_mode: WriteMode,
    pub min_year: u16,
    pub max_year: u16,
    pub categories: CategoryConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            collection: "usuarios".to_string(),
            save_debounce_ms: 500,
            mutation_policy: MutationPolicyKind::AppendOnly,
            write_mode: WriteMode::Replace,
            min_year: MIN_YEAR,
            max_year: MAX_YEAR,
            categories: CategoryConfig::default(),
        }
    }
}

impl LedgerConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: LedgerConfig =
            serde_yaml::from_str(yaml).context("Failed to parse ledger configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_yaml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.collection.trim().is_empty() {
            bail!("collection must not be empty");
        }
        if self.min_year < MIN_YEAR || self.max_year > MAX_YEAR || self.min_year > self.max_year {
            bail!(
                "year range {}..={} must lie within {}..={}",
                self.min_year,
                self.max_year,
                MIN_YEAR,
                MAX_YEAR
            );
        }
        Ok(())
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}
