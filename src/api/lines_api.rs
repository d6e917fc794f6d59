use crate::models::{BetType, Line, Matchup};
use crate::orchestrator::{OddsFeed, QuotedLine};
use crate::slate::league_slug;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

/// Only full-game lines are offered on slates
const ODDS_SCOPE: &str = "full-game";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinesPage {
    page_props: PageProps,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageProps {
    #[serde(default)]
    odds_tables: Vec<OddsTable>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OddsTable {
    odds_table_model: OddsTableModel,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OddsTableModel {
    #[serde(default)]
    game_rows: Vec<GameRow>,
}

/// One game and every sportsbook's line on it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRow {
    pub game_view: GameView,
    #[serde(default)]
    pub odds_views: Vec<Option<OddsView>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub away_team: TeamView,
    pub home_team: TeamView,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsView {
    #[serde(default)]
    pub game_id: Option<i64>,
    pub sportsbook: String,
    #[serde(default)]
    pub current_line: Option<Line>,
}

/// Game rows from a lines page. A page without an odds table has no rows.
pub fn parse_game_rows(body: &str) -> Result<Vec<GameRow>> {
    let page: LinesPage = serde_json::from_str(body).context("Failed to parse lines page")?;
    Ok(page
        .page_props
        .odds_tables
        .into_iter()
        .next()
        .map(|table| table.odds_table_model.game_rows)
        .unwrap_or_default())
}

/// The first sportsbook quoting every mandatory field for the matchup's bet type
pub fn find_line(rows: &[GameRow], matchup: &Matchup) -> Option<QuotedLine> {
    let row = rows.iter().find(|row| {
        row.game_view.away_team.full_name == matchup.away_team
            && row.game_view.home_team.full_name == matchup.home_team
    })?;

    row.odds_views
        .iter()
        .flatten()
        .find_map(|view| {
            let line = view.current_line.as_ref()?;
            line.is_complete(matchup.bet_type).then(|| QuotedLine {
                sportsbook: view.sportsbook.clone(),
                odds_game_id: view.game_id.map(|id| id.to_string()),
                line: line.clone(),
            })
        })
}

/// Client for the sportsbook lines provider
pub struct LinesApiClient {
    client: Client,
    base_url: String,
}

impl LinesApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Fetch every game row for a league and bet type on a `YYYY-MM-DD` date
    pub async fn fetch_game_rows(
        &self,
        league_slug: &str,
        bet_type: BetType,
        date: &str,
    ) -> Result<Vec<GameRow>> {
        let url = format!(
            "{}/{}/{}/{}.json",
            self.base_url, league_slug, bet_type, ODDS_SCOPE
        );

        let response = self
            .client
            .get(&url)
            .query(&[("date", date)])
            .send()
            .await
            .context("Failed to fetch lines")?;

        if !response.status().is_success() {
            anyhow::bail!("Lines API returned error: {}", response.status());
        }

        let body = response.text().await.context("Failed to read lines response")?;
        parse_game_rows(&body)
    }
}

#[async_trait]
impl OddsFeed for LinesApiClient {
    async fn fetch_line(&self, matchup: &Matchup) -> Result<Option<QuotedLine>> {
        let slug = league_slug(&matchup.id_league)
            .ok_or_else(|| anyhow!("Unknown league {}", matchup.id_league))?;
        let date = matchup.start_time.format("%Y-%m-%d").to_string();

        let rows = self.fetch_game_rows(slug, matchup.bet_type, &date).await?;
        let line = find_line(&rows, matchup);
        if line.is_none() {
            warn!(matchup_id = %matchup.id, league = slug, bet_type = %matchup.bet_type, "No team match or complete line in game rows");
        }
        Ok(line)
    }
}
