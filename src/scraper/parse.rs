//! Shape-specific decoders. Both reduce to [`extract_match`] per event.

use serde_json::Value;
use tracing::{debug, warn};

use crate::scraper::fields;
use crate::scraper::models::Match;
use crate::scraper::normalize::extract_match;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    /// Events array at the top level, under `events`, or under `data`.
    FlatList,
    /// Tournaments each carrying a league name and an events array.
    GroupedSchedule,
}

impl ParserKind {
    pub fn parse(self, document: &Value) -> Vec<Match> {
        match self {
            ParserKind::FlatList => parse_flat_list(document),
            ParserKind::GroupedSchedule => parse_grouped_schedule(document),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ParserKind::FlatList => "flat_list",
            ParserKind::GroupedSchedule => "grouped_schedule",
        }
    }
}

pub fn parse_flat_list(document: &Value) -> Vec<Match> {
    let payload = document.get("data").unwrap_or(document);
    let events = if payload.is_object() {
        payload.get("events").unwrap_or(payload)
    } else {
        payload
    };

    let Some(events) = events.as_array() else {
        warn!(found = json_type(events), "Expected a list of events");
        return Vec::new();
    };

    extract_all(events, None)
}

pub fn parse_grouped_schedule(document: &Value) -> Vec<Match> {
    let tournaments = match document.get("data") {
        Some(Value::Array(tournaments)) => tournaments.as_slice(),
        Some(data) => data
            .get("tournaments")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        None => &[],
    };

    let mut matches = Vec::new();
    for tournament in tournaments {
        let league = fields::pick_text(tournament, fields::TOURNAMENT_NAME)
            .unwrap_or_else(|| fields::DEFAULT_LEAGUE.to_string());
        let Some(events) = tournament.get("events").and_then(Value::as_array) else {
            debug!(league = %league, "Tournament without events");
            continue;
        };
        matches.extend(extract_all(events, Some(&league)));
    }
    matches
}

fn extract_all(events: &[Value], league: Option<&str>) -> Vec<Match> {
    let matches: Vec<Match> = events
        .iter()
        .filter_map(|event| extract_match(event, league))
        .collect();

    let skipped = events.len() - matches.len();
    if skipped > 0 {
        debug!(skipped, kept = matches.len(), "Dropped unusable events");
    }
    matches
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
