//! Error types shared by the domain services.
//!
//! Validation errors are reported back to whoever submitted the input and the
//! operation does not proceed. Background save and migration problems are logged
//! where they happen. A ledger that could not be loaded refuses mutations until a
//! later load succeeds.

use thiserror::Error;

use super::amount_parser::AmountParseError;

/// Input rejected before it reaches the ledger
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Valor inválido: {0}")]
    InvalidAmount(AmountParseError),
    #[error("O valor não pode ser negativo.")]
    NegativeAmount,
    #[error("Informe uma categoria.")]
    EmptyCategory,
    #[error("Mês inválido: {0}. Use um valor entre 0 e 11.")]
    InvalidMonth(u32),
    #[error("Ano inválido: '{input}'. Use um ano entre {min} e {max}.")]
    InvalidYear { input: String, min: u16, max: u16 },
}

impl From<AmountParseError> for ValidationError {
    fn from(error: AmountParseError) -> Self {
        match error {
            AmountParseError::Negative(_) => ValidationError::NegativeAmount,
            other => ValidationError::InvalidAmount(other),
        }
    }
}

/// Failures returned by session-level ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no user is signed in")]
    NotSignedIn,
    #[error("Não foi possível carregar seus dados. Tente novamente.")]
    LoadFailed,
    #[error("could not write ledger: {0}")]
    Persistence(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_parse_error_becomes_its_own_validation_error() {
        let error: ValidationError = AmountParseError::Negative(-3.0).into();
        assert_eq!(error, ValidationError::NegativeAmount);

        let error: ValidationError = AmountParseError::Empty.into();
        assert_eq!(error, ValidationError::InvalidAmount(AmountParseError::Empty));
    }

    #[test]
    fn test_year_error_message() {
        let error = ValidationError::InvalidYear {
            input: "12".to_string(),
            min: 1900,
            max: 9999,
        };
        assert_eq!(error.to_string(), "Ano inválido: '12'. Use um ano entre 1900 e 9999.");
    }
}
