use chrono::{Datelike, Local};
use std::fmt;

use crate::domain::errors::ValidationError;

/// Smallest year accepted anywhere in the ledger
pub const MIN_YEAR: u16 = 1900;
/// Largest year accepted anywhere in the ledger (four digits)
pub const MAX_YEAR: u16 = 9999;

/// A four-digit calendar year keying one `YearLedger`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Year(u16);

impl Year {
    /// Parse user input, accepting only years within `min..=max`
    pub fn parse(input: &str, min: u16, max: u16) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        trimmed
            .parse::<u16>()
            .ok()
            .filter(|year| (min..=max).contains(year))
            .map(Year)
            .ok_or_else(|| ValidationError::InvalidYear {
                input: trimmed.to_string(),
                min,
                max,
            })
    }

    /// Parse a `dadosPorAno` key from a stored document
    pub fn from_storage_key(key: &str) -> Option<Self> {
        Self::parse(key, MIN_YEAR, MAX_YEAR).ok()
    }

    /// The current calendar year on this machine
    pub fn current() -> Self {
        let year = Local::now().year().clamp(MIN_YEAR as i32, MAX_YEAR as i32);
        Year(year as u16)
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    /// Key used for this year in the persisted document
    pub fn storage_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}
