use std::collections::BTreeMap;

/// A league the schedule provider covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct League {
    pub id: &'static str,
    /// Path segment used by the lines provider
    pub slug: &'static str,
    pub soccer: bool,
}

pub const LEAGUES: &[League] = &[
    League { id: "4424", slug: "mlb-baseball", soccer: false },
    League { id: "4346", slug: "major-league-soccer", soccer: true },
    League { id: "4516", slug: "wnba-basketball", soccer: false },
    League { id: "4328", slug: "english-premier-league", soccer: true },
    League { id: "4331", slug: "bundesliga", soccer: true },
    League { id: "4335", slug: "la-liga", soccer: true },
    League { id: "4334", slug: "ligue1", soccer: true },
    League { id: "4332", slug: "serie-a", soccer: true },
    League { id: "4480", slug: "champions-league", soccer: true },
    League { id: "4481", slug: "europa-league", soccer: true },
    League { id: "4391", slug: "nfl-football", soccer: false },
    League { id: "4479", slug: "college-football", soccer: false },
    League { id: "4387", slug: "nba-basketball", soccer: false },
    League { id: "4380", slug: "nhl-hockey", soccer: false },
];

/// League id to relative weight
pub type WeightingModel = BTreeMap<String, f64>;

pub fn league(id: &str) -> Option<&'static League> {
    LEAGUES.iter().find(|league| league.id == id)
}

pub fn league_slug(id: &str) -> Option<&'static str> {
    league(id).map(|league| league.slug)
}

/// Soccer games can end level, so their money lines carry a draw price
pub fn is_draw_eligible(id: &str) -> bool {
    league(id).is_some_and(|league| league.soccer)
}

/// Late-summer weighting: baseball and the NFL preseason dominate
pub fn august_model() -> WeightingModel {
    [
        ("4424", 0.3),
        ("4346", 0.1),
        ("4516", 0.04),
        ("4328", 0.1),
        ("4331", 0.02),
        ("4335", 0.05),
        ("4334", 0.02),
        ("4332", 0.02),
        ("4480", 0.05),
        ("4391", 0.3),
    ]
    .into_iter()
    .map(|(id, weight)| (id.to_string(), weight))
    .collect()
}
