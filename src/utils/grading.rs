//! Settles a single pick against a finished game.
//!
//! Everything here is a pure function of its input. A pick that cannot be
//! settled with certainty is reported as [`GradingError::UngradableBet`]
//! and never defaulted to a result.

use crate::error::GradingError;
use crate::models::{
    BetType, GradeResult, MatchupOutcome, MoneyLineOdds, Odds, OddsSnapshot, PointSpreadOdds,
    TotalsOdds,
};
use crate::utils::odds_converter::combined_win_or_draw_odds;
use crate::utils::scores::{winner, Winner};
use rust_decimal::Decimal;

/// Grade a pick, dispatching on the bet type
pub fn grade_pick(outcome: &MatchupOutcome) -> Result<GradeResult, GradingError> {
    if outcome.points_total != outcome.away_score + outcome.home_score {
        return Err(GradingError::ungradable(
            outcome.bet_type,
            format!(
                "points total {} is not {} + {}",
                outcome.points_total, outcome.away_score, outcome.home_score
            ),
        ));
    }
    check_prices(outcome.bet_type, &outcome.odds)?;

    match (outcome.bet_type, &outcome.odds) {
        (BetType::Totals, OddsSnapshot::Totals(odds)) => Ok(grade_totals(outcome, odds)),
        (BetType::MoneyLine, OddsSnapshot::MoneyLine(odds)) => grade_money_line(outcome, odds),
        (BetType::PointSpread, OddsSnapshot::PointSpread(odds)) => {
            grade_point_spread(outcome, odds)
        }
        (bet_type, odds) => Err(GradingError::ungradable(
            bet_type,
            format!("{} odds supplied", odds.bet_type()),
        )),
    }
}

/// Every price a pick can win at must pay out. A 0 draw price means no draw market.
fn check_prices(bet_type: BetType, odds: &OddsSnapshot) -> Result<(), GradingError> {
    let prices: [(&str, Odds); 2] = match odds {
        OddsSnapshot::MoneyLine(odds) => [("home", odds.home_odds), ("away", odds.away_odds)],
        OddsSnapshot::PointSpread(odds) => [("home", odds.home_odds), ("away", odds.away_odds)],
        OddsSnapshot::Totals(odds) => [("over", odds.over_odds), ("under", odds.under_odds)],
    };

    match prices.iter().find(|(_, price)| *price == 0) {
        Some((side, _)) => Err(GradingError::ungradable(
            bet_type,
            format!("{side} price is 0"),
        )),
        None => Ok(()),
    }
}

fn grade_totals(outcome: &MatchupOutcome, odds: &TotalsOdds) -> GradeResult {
    let points_total = Decimal::from(outcome.points_total);

    if points_total == odds.total {
        return GradeResult::push();
    }

    let (winning_side, winning_odds) = if points_total > odds.total {
        ("over", odds.over_odds)
    } else {
        ("under", odds.under_odds)
    };

    if outcome.pick == winning_side {
        GradeResult::win(winning_odds)
    } else {
        GradeResult::loss()
    }
}

fn grade_money_line(
    outcome: &MatchupOutcome,
    odds: &MoneyLineOdds,
) -> Result<GradeResult, GradingError> {
    let (winning_team, winning_odds) = match winner(outcome.away_score, outcome.home_score) {
        Winner::Away => (&outcome.away_team, odds.away_odds),
        Winner::Home => (&outcome.home_team, odds.home_odds),
        Winner::Draw => {
            // Sports without a draw market void level games
            if !outcome.draw_eligible {
                return Ok(GradeResult::push());
            }

            // Only the side offered as "win or draw" collects on a draw
            return match outcome.draw_team.as_deref() {
                Some(draw_team) if draw_team == outcome.pick => {
                    let team_odds = if draw_team == outcome.away_team {
                        odds.away_odds
                    } else {
                        odds.home_odds
                    };
                    let winning_odds = combined_win_or_draw_odds(team_odds, odds.draw_odds)?;
                    Ok(GradeResult::win(winning_odds))
                }
                _ => Ok(GradeResult::loss()),
            };
        }
    };

    if outcome.pick == *winning_team {
        Ok(GradeResult::win(winning_odds))
    } else {
        Ok(GradeResult::loss())
    }
}

fn grade_point_spread(
    outcome: &MatchupOutcome,
    odds: &PointSpreadOdds,
) -> Result<GradeResult, GradingError> {
    let away_score = Decimal::from(outcome.away_score);
    let home_score = Decimal::from(outcome.home_score);

    // A pick'em line landing level
    if odds.away_spread.is_zero() && away_score == home_score {
        return Ok(GradeResult::push());
    }

    if odds.away_spread != -odds.home_spread {
        return Err(GradingError::ungradable(
            BetType::PointSpread,
            format!(
                "away spread {} does not mirror home spread {}",
                odds.away_spread, odds.home_spread
            ),
        ));
    }

    let away_covered = if odds.away_spread < odds.home_spread {
        // Away favorite
        let adjusted = away_score - odds.away_spread.abs();
        if adjusted == home_score {
            return Ok(GradeResult::push());
        }
        adjusted > home_score
    } else if odds.away_spread > odds.home_spread {
        // Home favorite
        let adjusted = home_score - odds.home_spread.abs();
        if adjusted == away_score {
            return Ok(GradeResult::push());
        }
        adjusted < away_score
    } else {
        return Err(GradingError::ungradable(
            BetType::PointSpread,
            format!(
                "away spread {} equals home spread {} on a decided game",
                odds.away_spread, odds.home_spread
            ),
        ));
    };

    let (covering_team, covering_odds): (&str, Odds) = if away_covered {
        (outcome.away_team.as_str(), odds.away_odds)
    } else {
        (outcome.home_team.as_str(), odds.home_odds)
    };

    if outcome.pick == covering_team {
        Ok(GradeResult::win(covering_odds))
    } else {
        Ok(GradeResult::loss())
    }
}
