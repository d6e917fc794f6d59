use crate::error::OddsError;
use crate::models::Odds;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

const HUNDRED: Decimal = dec!(100);

/// Round a decimal price or payout half-up to 2 places
pub(crate) fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub(crate) fn overflow(what: &str) -> OddsError {
    OddsError::InvalidOdds(format!("{what} is too large to compute"))
}

fn invalid_american(odds: Odds) -> OddsError {
    OddsError::InvalidOdds(format!("{odds} is not an American price"))
}

/// Convert American odds to decimal odds, rounded to 2 places
/// Positive odds (+150) pay odds/100 + 1
/// Negative odds (-150) pay 100/|odds| + 1
pub fn american_to_decimal(odds: Odds) -> Result<Decimal, OddsError> {
    if odds == 0 {
        return Err(invalid_american(odds));
    }

    let american = Decimal::from(odds);
    let decimal = if odds > 0 {
        american / HUNDRED + Decimal::ONE
    } else {
        HUNDRED / american.abs() + Decimal::ONE
    };

    Ok(round_cents(decimal))
}

/// Convert decimal odds back to American odds, rounded to the nearest integer
pub fn decimal_to_american(decimal: Decimal) -> Result<Odds, OddsError> {
    if decimal <= Decimal::ONE {
        return Err(OddsError::InvalidOdds(format!(
            "decimal odds of {decimal} do not pay out"
        )));
    }

    let american = if decimal >= dec!(2) {
        (decimal - Decimal::ONE)
            .checked_mul(HUNDRED)
            .ok_or_else(|| overflow("American price"))?
    } else {
        -HUNDRED / (decimal - Decimal::ONE)
    };

    // Ties go toward positive infinity (-312.5 -> -312)
    (american + dec!(0.5))
        .floor()
        .to_i32()
        .ok_or_else(|| OddsError::InvalidOdds(format!("{american} is out of range")))
}

/// Price "team wins or draws" as one outcome from the team's price and the draw price
pub fn combined_win_or_draw_odds(team_odds: Odds, draw_odds: Odds) -> Result<Odds, OddsError> {
    let team_decimal = american_to_decimal(team_odds)?;
    let draw_decimal = american_to_decimal(draw_odds)?;

    let combined = Decimal::ONE / (Decimal::ONE / team_decimal + Decimal::ONE / draw_decimal);

    decimal_to_american(round_cents(combined))
}

/// Product of each leg's decimal odds
pub fn parlay_decimal_multiplier(legs: &[Odds]) -> Result<Decimal, OddsError> {
    legs.iter().try_fold(Decimal::ONE, |acc, &leg| {
        american_to_decimal(leg).and_then(|decimal| {
            acc.checked_mul(decimal)
                .ok_or_else(|| overflow("parlay multiplier"))
        })
    })
}

/// Convert American odds to implied probability
pub fn american_odds_to_probability(odds: Odds) -> f64 {
    if odds > 0 {
        // For positive odds: 100 / (odds + 100)
        100.0 / (odds as f64 + 100.0)
    } else {
        // For negative odds: |odds| / (|odds| + 100)
        let abs_odds = odds.abs() as f64;
        abs_odds / (abs_odds + 100.0)
    }
}
