use crate::error::OddsError;
use crate::models::{GradeResult, Odds, PickResult};
use crate::utils::odds_converter::{overflow, parlay_decimal_multiplier, round_cents};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Points returned on a single winning bet: winnings plus the original wager
pub fn points_awarded(wager: Decimal, odds: Odds) -> Result<Decimal, OddsError> {
    if odds == 0 {
        return Err(OddsError::InvalidOdds(format!(
            "{odds} is not an American price"
        )));
    }

    let american = Decimal::from(odds);
    let winnings = if odds > 0 {
        wager.checked_mul(american / dec!(100))
    } else {
        wager.checked_div(american.abs() / dec!(100))
    };

    winnings
        .and_then(|winnings| winnings.checked_add(wager))
        .map(round_cents)
        .ok_or_else(|| overflow("payout"))
}

/// Points returned on a parlay whose listed legs all won
/// A single leg is paid exactly like a straight bet
pub fn parlay_payout(wager: Decimal, leg_odds: &[Odds]) -> Result<Decimal, OddsError> {
    match leg_odds {
        [] => Err(OddsError::EmptyParlay),
        [single] => points_awarded(wager, *single),
        legs => wager
            .checked_mul(parlay_decimal_multiplier(legs)?)
            .map(round_cents)
            .ok_or_else(|| overflow("payout")),
    }
}

/// Where a parlay stands given the grades of its legs so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ParlaySettlement {
    /// At least one leg has not been graded yet
    Pending,
    /// A leg lost; nothing is paid
    Lost,
    /// Every leg won or pushed
    Paid { payout: Decimal },
}

impl ParlaySettlement {
    /// Points to award once final. Pending parlays have none yet.
    pub fn points_awarded(&self) -> Option<Decimal> {
        match self {
            ParlaySettlement::Pending => None,
            ParlaySettlement::Lost => Some(Decimal::ZERO),
            ParlaySettlement::Paid { payout } => Some(*payout),
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, ParlaySettlement::Pending)
    }
}

/// Settle a parlay from its legs' grades (`None` for a leg not graded yet)
///
/// A losing leg settles the parlay at once, whatever the other legs' state.
/// Pushed legs drop out of the multiplier; if every leg pushed the wager is
/// returned as is.
pub fn settle_parlay(
    wager: Decimal,
    legs: &[Option<GradeResult>],
) -> Result<ParlaySettlement, OddsError> {
    if legs.is_empty() {
        return Err(OddsError::EmptyParlay);
    }

    let graded: Vec<&GradeResult> = legs.iter().flatten().collect();

    if graded.iter().any(|grade| grade.outcome() == PickResult::Loss) {
        return Ok(ParlaySettlement::Lost);
    }

    if graded.len() < legs.len() {
        return Ok(ParlaySettlement::Pending);
    }

    let winning_odds: Vec<Odds> = graded
        .iter()
        .filter_map(|grade| grade.winning_odds())
        .collect();

    let payout = if winning_odds.is_empty() {
        wager
    } else {
        parlay_payout(wager, &winning_odds)?
    };

    Ok(ParlaySettlement::Paid { payout })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::odds_converter::american_to_decimal;

    const BET_SIZE: Decimal = dec!(100);

    #[test]
    fn test_points_awarded_positive_odds() {
        assert_eq!(points_awarded(BET_SIZE, 100).unwrap(), dec!(200));
        assert_eq!(points_awarded(BET_SIZE, 115).unwrap(), dec!(215));
        assert_eq!(points_awarded(BET_SIZE, 215).unwrap(), dec!(315));
        assert_eq!(points_awarded(BET_SIZE, 1000).unwrap(), dec!(1100));
        assert_eq!(points_awarded(BET_SIZE, 10000).unwrap(), dec!(10100));
    }

    #[test]
    fn test_points_awarded_negative_odds() {
        assert_eq!(points_awarded(BET_SIZE, -100).unwrap(), dec!(200));
        assert_eq!(points_awarded(BET_SIZE, -115).unwrap(), dec!(186.96));
        assert_eq!(points_awarded(BET_SIZE, -150).unwrap(), dec!(166.67));
        assert_eq!(points_awarded(BET_SIZE, -230).unwrap(), dec!(143.48));
        assert_eq!(points_awarded(BET_SIZE, -1000).unwrap(), dec!(110));
        assert_eq!(points_awarded(BET_SIZE, -10000).unwrap(), dec!(101));
    }

    #[test]
    fn test_points_awarded_rejects_zero_odds() {
        assert!(points_awarded(BET_SIZE, 0).is_err());
    }

    #[test]
    fn test_oversized_payouts_are_errors() {
        assert!(matches!(
            points_awarded(Decimal::MAX, 10000),
            Err(OddsError::InvalidOdds(_))
        ));
        assert!(points_awarded(Decimal::MAX, -110).is_err());
        assert!(parlay_payout(BET_SIZE, &[10000; 15]).is_err());
        assert!(parlay_payout(Decimal::MAX, &[150, 150]).is_err());
        assert!(settle_parlay(Decimal::MAX, &[Some(GradeResult::win(150))]).is_err());
    }

    #[test]
    fn test_parlay_payout() {
        assert_eq!(parlay_payout(BET_SIZE, &[130, -150]).unwrap(), dec!(384.1));
        assert_eq!(parlay_payout(BET_SIZE, &[150, 150]).unwrap(), BET_SIZE + dec!(525));
        assert_eq!(parlay_payout(BET_SIZE, &[-110, -110]).unwrap(), BET_SIZE + dec!(264.81));
        assert_eq!(parlay_payout(BET_SIZE, &[-10000, -155]).unwrap(), BET_SIZE + dec!(66.65));
    }

    #[test]
    fn test_parlay_payout_is_product_of_decimal_odds() {
        let legs = [(120, -105), (-200, 340), (101, -101)];
        for (first, second) in legs {
            let expected = BET_SIZE
                * american_to_decimal(first).unwrap()
                * american_to_decimal(second).unwrap();
            let payout = parlay_payout(BET_SIZE, &[first, second]).unwrap();
            assert!((payout - expected).abs() <= dec!(0.005), "{first}/{second}");
        }
    }

    #[test]
    fn test_single_leg_parlay_pays_like_a_straight_bet() {
        assert_eq!(
            parlay_payout(BET_SIZE, &[-115]).unwrap(),
            points_awarded(BET_SIZE, -115).unwrap()
        );
    }

    #[test]
    fn test_empty_parlay_is_rejected() {
        assert_eq!(parlay_payout(BET_SIZE, &[]), Err(OddsError::EmptyParlay));
        assert_eq!(settle_parlay(BET_SIZE, &[]), Err(OddsError::EmptyParlay));
    }

    #[test]
    fn test_settle_parlay_loss_wins_over_pending() {
        let legs = [None, Some(GradeResult::loss()), Some(GradeResult::win(150))];
        assert_eq!(settle_parlay(BET_SIZE, &legs).unwrap(), ParlaySettlement::Lost);
        assert_eq!(
            ParlaySettlement::Lost.points_awarded(),
            Some(Decimal::ZERO)
        );
    }

    #[test]
    fn test_settle_parlay_waits_for_every_leg() {
        let legs = [Some(GradeResult::win(150)), None];
        let settlement = settle_parlay(BET_SIZE, &legs).unwrap();
        assert_eq!(settlement, ParlaySettlement::Pending);
        assert!(!settlement.is_final());
        assert_eq!(settlement.points_awarded(), None);
    }

    #[test]
    fn test_settle_parlay_skips_pushed_legs() {
        let legs = [
            Some(GradeResult::win(130)),
            Some(GradeResult::push()),
            Some(GradeResult::win(-150)),
        ];
        assert_eq!(
            settle_parlay(BET_SIZE, &legs).unwrap(),
            ParlaySettlement::Paid {
                payout: dec!(384.1)
            }
        );

        let one_winner = [Some(GradeResult::push()), Some(GradeResult::win(-115))];
        assert_eq!(
            settle_parlay(BET_SIZE, &one_winner).unwrap(),
            ParlaySettlement::Paid {
                payout: dec!(186.96)
            }
        );
    }

    #[test]
    fn test_settle_parlay_all_pushes_returns_wager() {
        let legs = [Some(GradeResult::push()), Some(GradeResult::push())];
        assert_eq!(
            settle_parlay(dec!(50), &legs).unwrap(),
            ParlaySettlement::Paid { payout: dec!(50) }
        );
    }
}
