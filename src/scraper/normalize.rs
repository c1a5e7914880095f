//! Raw event → canonical [`Match`].
//!
//! Cosmetic fields fall back to placeholders; only a missing event id
//! drops the record.

use std::str::FromStr;

use chrono::DateTime;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use tracing::debug;

use crate::scraper::fields::{self, MarketKind, MarketSpec};
use crate::scraper::models::{Match, OddsMap, UNKNOWN_ODDS};

pub const TEAM_NAME_MAX: usize = 28;
pub const LEAGUE_NAME_MAX: usize = 32;
const ELLIPSIS: char = '…';

/// Build a [`Match`] from one raw event. `league` overrides the event's own
/// league fields (used when a tournament group supplies it).
pub fn extract_match(event: &Value, league: Option<&str>) -> Option<Match> {
    if !event.is_object() {
        debug!("Skipping non-object event");
        return None;
    }

    let Some(event_id) = fields::pick_text(event, fields::EVENT_ID) else {
        debug!("Skipping event without an identifier");
        return None;
    };

    let home = text_or(event, fields::HOME, fields::DEFAULT_HOME);
    let away = text_or(event, fields::AWAY, fields::DEFAULT_AWAY);
    let time = fields::pick(event, fields::START_TIME)
        .and_then(format_start_time)
        .unwrap_or_else(|| fields::TIME_TBD.to_string());
    let league = match league {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => text_or(event, fields::LEAGUE, fields::DEFAULT_LEAGUE),
    };

    let odds = extract_odds(event);

    Some(Match {
        event_id,
        home: truncate(&home, TEAM_NAME_MAX),
        away: truncate(&away, TEAM_NAME_MAX),
        time,
        league: truncate(&league, LEAGUE_NAME_MAX),
        odds_1x2: odds.match_result,
        odds_ou: odds.over_under,
        odds_btts: odds.btts,
    })
}

fn text_or(event: &Value, accessors: &[fields::Accessor], default: &str) -> String {
    fields::pick_text(event, accessors).unwrap_or_else(|| default.to_string())
}

/// Odds per market; `None` when no recognized outcome was found.
#[derive(Debug, Default, PartialEq)]
pub struct ExtractedOdds {
    pub match_result: Option<OddsMap>,
    pub over_under: Option<OddsMap>,
    pub btts: Option<OddsMap>,
}

pub fn extract_odds(event: &Value) -> ExtractedOdds {
    let mut match_result = OddsMap::new();
    let mut over_under = OddsMap::new();
    let mut btts = OddsMap::new();

    let markets = fields::pick(event, fields::MARKETS).and_then(Value::as_array);
    for market in markets.into_iter().flatten() {
        let Some(raw_id) = fields::pick_text(market, fields::MARKET_ID) else {
            continue;
        };
        let Some(spec) = fields::market_for_id(&raw_id) else {
            continue;
        };
        let Some(outcomes) = fields::pick(market, fields::OUTCOMES).and_then(Value::as_array)
        else {
            continue;
        };

        let target = match spec.kind {
            MarketKind::MatchResult => &mut match_result,
            MarketKind::OverUnder25 => {
                if !is_main_goal_line(market) {
                    continue;
                }
                &mut over_under
            }
            MarketKind::BothTeamsToScore => &mut btts,
        };
        fill_outcomes(outcomes, target, spec);
    }

    ExtractedOdds {
        match_result: non_empty(match_result),
        over_under: non_empty(over_under),
        btts: non_empty(btts),
    }
}

/// Over/under markets without a specifier are assumed to be the 2.5 line.
fn is_main_goal_line(market: &Value) -> bool {
    match fields::pick(market, fields::MARKET_SPECIFIER).and_then(Value::as_str) {
        Some(specifier) => specifier
            .split(['|', '&'])
            .any(|part| part.trim().eq_ignore_ascii_case(fields::OVER_UNDER_LINE)),
        None => true,
    }
}

/// First alias match per canonical key wins.
fn fill_outcomes(outcomes: &[Value], target: &mut OddsMap, spec: &MarketSpec) {
    for outcome in outcomes {
        let label = fields::pick_text(outcome, fields::OUTCOME_LABEL).unwrap_or_default();
        let Some(key) = fields::outcome_key(spec, &label) else {
            continue;
        };
        if target.contains_key(key) {
            continue;
        }
        let odds = normalize_odds(fields::pick(outcome, fields::OUTCOME_ODDS));
        target.insert(key.to_string(), odds);
    }
}

fn non_empty(map: OddsMap) -> Option<OddsMap> {
    (!map.is_empty()).then_some(map)
}

/// Render odds with exactly two decimals, or `?` when not numeric.
///
/// Numbers are read from their shortest decimal text, so `2.675` is exactly
/// 2.675 and rounds half-up to `2.68`.
pub fn normalize_odds(raw: Option<&Value>) -> String {
    let decimal = match raw {
        Some(Value::Number(n)) => parse_decimal(&n.to_string()),
        Some(Value::String(s)) => parse_decimal(s.trim()),
        _ => None,
    };
    match decimal {
        Some(d) => format!(
            "{:.2}",
            d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        ),
        None => UNKNOWN_ODDS.to_string(),
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

/// Epoch milliseconds (number or numeric string) → `HH:MM UTC`.
fn format_start_time(raw: &Value) -> Option<String> {
    let millis = match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    let dt = DateTime::from_timestamp_millis(millis)?;
    Some(dt.format("%H:%M UTC").to_string())
}

/// Cut to `max` characters, the last one replaced by an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}
