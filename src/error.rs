use crate::models::BetType;

/// Errors raised by the odds conversion and payout functions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OddsError {
    #[error("Invalid odds: {0}")]
    InvalidOdds(String),

    #[error("A parlay needs at least one leg")]
    EmptyParlay,
}

/// Errors raised while grading a pick.
///
/// Grading is deterministic, so none of these are worth retrying with the
/// same input. Callers route them to manual review.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GradingError {
    #[error("Ungradable {bet_type} bet: {reason}")]
    UngradableBet { bet_type: BetType, reason: String },

    #[error(transparent)]
    Odds(#[from] OddsError),
}

impl GradingError {
    pub fn ungradable(bet_type: BetType, reason: impl Into<String>) -> Self {
        GradingError::UngradableBet {
            bet_type,
            reason: reason.into(),
        }
    }
}

/// A persisted odds row cannot be graded for its bet type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OddsFieldError {
    #[error("{bet_type} odds are missing mandatory field `{field}`")]
    Missing {
        bet_type: BetType,
        field: &'static str,
    },

    /// Only `drawOdds` may be 0, meaning no draw market
    #[error("{bet_type} odds have no price in `{field}`")]
    ZeroPrice {
        bet_type: BetType,
        field: &'static str,
    },
}

impl OddsFieldError {
    pub fn field(&self) -> &'static str {
        match self {
            OddsFieldError::Missing { field, .. } | OddsFieldError::ZeroPrice { field, .. } => {
                field
            }
        }
    }
}
