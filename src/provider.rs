//! Player-season statistics from the remote stats provider.
//!
//! One request per competition-season; a failed or empty response is
//! skipped and counted rather than aborting the whole load.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use reqwest::blocking::Client;
use tracing::{info, warn};

use crate::config::ProviderConfig;
use crate::record::{PlayerSeasonRecord, parse_player_season_rows};

static CLIENT: OnceCell<Client> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Competition {
    pub id: u32,
    pub name: &'static str,
    pub seasons: &'static [u32],
}

pub const COMPETITIONS: &[Competition] = &[
    Competition { id: 4, name: "League One", seasons: &[235, 281, 317, 318] },
    Competition { id: 5, name: "League Two", seasons: &[235, 281, 317, 318] },
    Competition { id: 51, name: "Premiership", seasons: &[235, 281, 317, 318] },
    Competition { id: 65, name: "National League", seasons: &[281, 318] },
    Competition { id: 76, name: "Liga", seasons: &[317, 318] },
    Competition { id: 78, name: "1. HNL", seasons: &[317, 318] },
    Competition { id: 89, name: "USL Championship", seasons: &[106, 107, 282, 315] },
    Competition { id: 106, name: "Veikkausliiga", seasons: &[315] },
    Competition { id: 107, name: "Premier Division", seasons: &[106, 107, 282, 315] },
    Competition { id: 129, name: "Championnat National", seasons: &[317, 318] },
    Competition { id: 166, name: "Premier League 2 Division One", seasons: &[318] },
    Competition { id: 179, name: "3. Liga", seasons: &[317, 318] },
    Competition { id: 260, name: "1st Division", seasons: &[317, 318] },
    Competition { id: 1035, name: "First Division B", seasons: &[317, 318] },
    Competition { id: 1385, name: "Championship", seasons: &[235, 281, 317, 318] },
    Competition { id: 1442, name: "1. Division", seasons: &[107, 282, 315] },
    Competition { id: 1581, name: "2. Liga", seasons: &[317, 318] },
    Competition { id: 1607, name: "Úrvalsdeild", seasons: &[315] },
    Competition { id: 1778, name: "First Division", seasons: &[282, 315] },
    Competition { id: 1848, name: "I Liga", seasons: &[281, 317, 318] },
    Competition { id: 1865, name: "First League", seasons: &[318] },
];

#[derive(Debug, Clone, Default)]
pub struct FetchSummary {
    pub records: Vec<PlayerSeasonRecord>,
    pub loads_total: usize,
    pub loads_succeeded: usize,
    pub errors: Vec<String>,
}

pub fn http_client(timeout_secs: u64) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build http client")
    })
}

pub fn fetch_all_player_seasons(
    config: &ProviderConfig,
    competitions: &[Competition],
) -> Result<FetchSummary> {
    let (Some(user), Some(password)) = (config.username.as_deref(), config.password.as_deref())
    else {
        return Err(anyhow!("SCOUT_API_USER and SCOUT_API_PASSWORD must be set to fetch"));
    };
    let client = http_client(config.timeout_secs)?;

    let auth_url = format!("{}/v4/competitions", config.base_url);
    client
        .get(&auth_url)
        .basic_auth(user, Some(password))
        .send()
        .and_then(|resp| resp.error_for_status())
        .context("provider authentication failed; check credentials")?;

    let jobs: Vec<(Competition, u32)> = competitions
        .iter()
        .flat_map(|c| c.seasons.iter().map(move |s| (*c, *s)))
        .collect();

    let results: Vec<Result<Vec<PlayerSeasonRecord>>> = with_fetch_pool(config.parallelism, || {
        jobs.par_iter()
            .map(|(competition, season_id)| {
                fetch_competition_season(client, config, user, password, competition, *season_id)
            })
            .collect()
    });

    let mut summary = FetchSummary {
        loads_total: jobs.len(),
        ..FetchSummary::default()
    };
    for ((competition, season_id), result) in jobs.iter().zip(results) {
        match result {
            Ok(rows) => {
                summary.loads_succeeded += 1;
                summary.records.extend(rows);
            }
            Err(err) => {
                warn!(league = competition.name, season_id, "skipping load: {err:#}");
                summary
                    .errors
                    .push(format!("{} season {season_id}: {err:#}", competition.name));
            }
        }
    }

    if summary.loads_succeeded == 0 {
        return Err(anyhow!(
            "could not load any competition-season ({} attempted)",
            summary.loads_total
        ));
    }
    info!(
        loads = summary.loads_succeeded,
        attempted = summary.loads_total,
        records = summary.records.len(),
        "player-season stats loaded"
    );
    Ok(summary)
}

fn fetch_competition_season(
    client: &Client,
    config: &ProviderConfig,
    user: &str,
    password: &str,
    competition: &Competition,
    season_id: u32,
) -> Result<Vec<PlayerSeasonRecord>> {
    let url = format!(
        "{}/v1/competitions/{}/seasons/{}/player-stats",
        config.base_url, competition.id, season_id
    );
    let body = client
        .get(&url)
        .basic_auth(user, Some(password))
        .send()
        .and_then(|resp| resp.error_for_status())
        .with_context(|| format!("request {url}"))?
        .text()
        .context("failed reading body")?;
    let rows = tag_rows(parse_player_season_rows(&body)?, competition, season_id);
    if rows.is_empty() {
        return Err(anyhow!("empty player-stats response"));
    }
    Ok(rows)
}

/// Stamp league and season identity on rows from one competition-season.
pub fn tag_rows(
    rows: Vec<PlayerSeasonRecord>,
    competition: &Competition,
    season_id: u32,
) -> Vec<PlayerSeasonRecord> {
    rows.into_iter()
        .map(|mut row| {
            row.league_id = Some(competition.id);
            row.league_name = competition.name.to_string();
            row.season_id = Some(season_id);
            row
        })
        .collect()
}

fn with_fetch_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_every_league() {
        assert_eq!(COMPETITIONS.len(), 21);
        let loads: usize = COMPETITIONS.iter().map(|c| c.seasons.len()).sum();
        assert_eq!(loads, 52);
    }

    #[test]
    fn rows_are_tagged_with_competition() {
        let rows = vec![PlayerSeasonRecord {
            player_id: 3,
            ..Default::default()
        }];
        let tagged = tag_rows(rows, &COMPETITIONS[0], 318);
        assert_eq!(tagged[0].league_id, Some(4));
        assert_eq!(tagged[0].league_name, "League One");
        assert_eq!(tagged[0].season_id, Some(318));
    }

    #[test]
    fn fetching_without_credentials_fails_fast() {
        let config = ProviderConfig {
            base_url: "http://127.0.0.1:9".into(),
            username: None,
            password: None,
            parallelism: 1,
            timeout_secs: 5,
        };
        assert!(fetch_all_player_seasons(&config, COMPETITIONS).is_err());
    }
}
