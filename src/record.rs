use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Provider column prefix stripped from every flattened key.
const FIELD_PREFIX: &str = "player_season_";
const MAX_NAME_SUGGESTIONS: usize = 5;

/// One player's statistics for one competition-season.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeasonRecord {
    pub player_id: u64,
    pub player_name: String,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub league_id: Option<u32>,
    #[serde(default)]
    pub league_name: String,
    #[serde(default)]
    pub season_id: Option<u32>,
    #[serde(default)]
    pub season_name: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub primary_position: Option<String>,
    #[serde(default)]
    pub minutes: f64,
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NameLookup {
    Found(usize),
    /// `(player_name, team_name)` of partial matches.
    Suggestions(Vec<(String, String)>),
    NotFound,
}

impl PlayerSeasonRecord {
    pub fn stat(&self, field: &str) -> Option<f64> {
        self.stats.get(field).copied().filter(|v| v.is_finite())
    }

    pub fn with_stat(mut self, field: &str, value: f64) -> Self {
        self.stats.insert(field.to_string(), value);
        self
    }

    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        age_on(self.birth_date.as_deref()?, today)
    }

    /// `player_name (season_name)`, the label used for charts and listings.
    pub fn display_label(&self) -> String {
        let season = if self.season_name.is_empty() {
            "Unknown"
        } else {
            self.season_name.as_str()
        };
        format!("{} ({season})", self.player_name)
    }
}

/// Parse a provider payload (a JSON array of player-season objects).
pub fn parse_player_season_rows(raw: &str) -> Result<Vec<PlayerSeasonRecord>> {
    let value: Value = serde_json::from_str(raw).context("player-stats payload is not json")?;
    let Value::Array(rows) = value else {
        return Err(anyhow!("player-stats payload is not a json array"));
    };
    Ok(rows.iter().filter_map(record_from_value).collect())
}

/// Build a record from one provider row; rows without a player id are skipped.
pub fn record_from_value(row: &Value) -> Option<PlayerSeasonRecord> {
    let Value::Object(obj) = row else {
        return None;
    };
    let mut flat = BTreeMap::new();
    flatten_into("", obj, &mut flat);

    let mut record = PlayerSeasonRecord::default();
    let mut has_id = false;
    for (raw_key, value) in flat {
        let key = raw_key.strip_prefix(FIELD_PREFIX).unwrap_or(&raw_key);
        match key {
            "player_id" => {
                if let Some(id) = as_u64_any(&value) {
                    record.player_id = id;
                    has_id = true;
                }
            }
            "player_name" => record.player_name = clean_string(&value).unwrap_or_default(),
            "team_name" => record.team_name = clean_string(&value).unwrap_or_default(),
            "league_name" => record.league_name = clean_string(&value).unwrap_or_default(),
            "season_name" => record.season_name = clean_string(&value).unwrap_or_default(),
            "birth_date" => record.birth_date = clean_string(&value),
            "primary_position" => record.primary_position = clean_string(&value),
            "competition_id" | "league_id" => {
                record.league_id = as_u64_any(&value).and_then(|v| u32::try_from(v).ok());
            }
            "season_id" => {
                record.season_id = as_u64_any(&value).and_then(|v| u32::try_from(v).ok());
            }
            "minutes" => record.minutes = as_f64_any(&value).unwrap_or(0.0),
            _ => {
                if let Some(v) = as_f64_any(&value) {
                    record.stats.insert(key.to_string(), v);
                }
            }
        }
    }
    has_id.then_some(record)
}

/// Whole years between `birth_date` and `today`; `None` when the date is unusable.
pub fn age_on(birth_date: &str, today: NaiveDate) -> Option<u32> {
    let birth = parse_birth_date(birth_date)?;
    if birth > today {
        return None;
    }
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// Exact (case-insensitive) match first, then up to five substring suggestions.
pub fn find_player_by_name<'a, I>(records: I, name: &str) -> NameLookup
where
    I: IntoIterator<Item = &'a PlayerSeasonRecord>,
{
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return NameLookup::NotFound;
    }
    let mut suggestions = Vec::new();
    for (idx, record) in records.into_iter().enumerate() {
        let candidate = record.player_name.to_lowercase();
        if candidate == needle {
            return NameLookup::Found(idx);
        }
        if suggestions.len() < MAX_NAME_SUGGESTIONS && candidate.contains(&needle) {
            suggestions.push((record.player_name.clone(), record.team_name.clone()));
        }
    }
    if suggestions.is_empty() {
        NameLookup::NotFound
    } else {
        NameLookup::Suggestions(suggestions)
    }
}

fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

fn flatten_into(prefix: &str, obj: &Map<String, Value>, out: &mut BTreeMap<String, Value>) {
    for (key, value) in obj {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) => flatten_into(&full, inner, out),
            other => {
                out.insert(full, other.clone());
            }
        }
    }
}

fn clean_string(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn as_f64_any(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn as_u64_any(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    if let Some(f) = v.as_f64()
        && f >= 0.0
        && f.fract() == 0.0
    {
        return Some(f as u64);
    }
    v.as_str()?.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_counts_whole_years() {
        let today = day(2024, 6, 15);
        assert_eq!(age_on("2000-06-15", today), Some(24));
        assert_eq!(age_on("2000-06-16", today), Some(23));
        assert_eq!(age_on("1999-01-01T00:00:00", today), Some(25));
        assert_eq!(age_on("not a date", today), None);
        assert_eq!(age_on("2030-01-01", today), None);
    }

    #[test]
    fn provider_rows_are_flattened_and_prefix_stripped() {
        let raw = r#"[
            {
                "player_id": 7,
                "player_name": "  Ada Striker ",
                "team_name": "Test FC",
                "competition_id": 4,
                "season_id": 318,
                "season_name": "2024/2025",
                "birth_date": "2001-02-03",
                "primary_position": "Centre Forward",
                "player_season_minutes": 1234.5,
                "player_season_npg_90": 0.42,
                "player_season_passing_ratio": "78.5",
                "extra": {"nested_90": 1.0},
                "player_female": false
            },
            {"player_name": "No Id"}
        ]"#;
        let rows = parse_player_season_rows(raw).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.player_id, 7);
        assert_eq!(row.player_name, "Ada Striker");
        assert_eq!(row.league_id, Some(4));
        assert_eq!(row.season_id, Some(318));
        assert_eq!(row.minutes, 1234.5);
        assert_eq!(row.stat("npg_90"), Some(0.42));
        assert_eq!(row.stat("passing_ratio"), Some(78.5));
        assert_eq!(row.stat("extra.nested_90"), Some(1.0));
        assert!(!row.stats.contains_key("player_female"));
    }

    #[test]
    fn name_lookup_prefers_exact_then_suggests() {
        let rows = vec![
            PlayerSeasonRecord {
                player_id: 1,
                player_name: "John Smithson".into(),
                team_name: "A".into(),
                ..Default::default()
            },
            PlayerSeasonRecord {
                player_id: 2,
                player_name: "John Smith".into(),
                team_name: "B".into(),
                ..Default::default()
            },
        ];
        assert_eq!(find_player_by_name(&rows, "john smith"), NameLookup::Found(1));
        assert_eq!(
            find_player_by_name(&rows, "smi"),
            NameLookup::Suggestions(vec![
                ("John Smithson".into(), "A".into()),
                ("John Smith".into(), "B".into())
            ])
        );
        assert_eq!(find_player_by_name(&rows, "zzz"), NameLookup::NotFound);
    }
}
