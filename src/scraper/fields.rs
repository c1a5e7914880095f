//! Field and alias tables.
//!
//! The upstream renames fields between API versions, so every canonical
//! field is resolved through an ordered list of accessors. Supporting a new
//! spelling means adding a row here, not a branch in the normalizer.

use serde_json::Value;

/// One way of reaching a value inside a raw event object.
#[derive(Debug, Clone, Copy)]
pub enum Accessor {
    /// A top-level key.
    Key(&'static str),
    /// A key holding an object, then a key inside it.
    Nested(&'static str, &'static str),
}

use Accessor::{Key, Nested};

pub const EVENT_ID: &[Accessor] = &[Key("eventId"), Key("id"), Key("gameId"), Key("matchId")];

pub const HOME: &[Accessor] = &[
    Key("homeTeamName"),
    Key("homeName"),
    Key("home_name"),
    Nested("home", "name"),
];

pub const AWAY: &[Accessor] = &[
    Key("awayTeamName"),
    Key("awayName"),
    Key("away_name"),
    Nested("away", "name"),
];

pub const START_TIME: &[Accessor] = &[
    Key("estimateStartTime"),
    Key("startTime"),
    Key("matchTime"),
    Key("kickOffTime"),
];

pub const LEAGUE: &[Accessor] = &[
    Key("tournamentName"),
    Key("leagueName"),
    Key("competitionName"),
    Nested("league", "name"),
    Nested("tournament", "name"),
    Nested("competition", "name"),
];

/// League name on a tournament group in the schedule shape.
pub const TOURNAMENT_NAME: &[Accessor] = &[Key("name"), Key("tournamentName"), Key("leagueName")];

pub const MARKETS: &[Accessor] = &[Key("markets"), Key("oddsMap"), Key("marketList"), Key("odds")];
pub const MARKET_ID: &[Accessor] = &[Key("id"), Key("marketId"), Key("typeId")];
pub const MARKET_SPECIFIER: &[Accessor] = &[Key("specifier"), Key("specifiers")];
pub const OUTCOMES: &[Accessor] = &[
    Key("outcomes"),
    Key("odds"),
    Key("selections"),
    Key("outcomeList"),
];
pub const OUTCOME_LABEL: &[Accessor] = &[
    Key("desc"),
    Key("name"),
    Key("description"),
    Key("outcomeName"),
];
pub const OUTCOME_ODDS: &[Accessor] = &[Key("odds"), Key("value"), Key("oddValue"), Key("price")];

pub const DEFAULT_HOME: &str = "Home";
pub const DEFAULT_AWAY: &str = "Away";
pub const DEFAULT_LEAGUE: &str = "Football";
pub const TIME_TBD: &str = "TBD";

/// Markets we extract odds for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketKind {
    /// Home / draw / away.
    MatchResult,
    /// Over / under 2.5 goals.
    OverUnder25,
    /// Both teams to score.
    BothTeamsToScore,
}

/// Known upstream IDs for a market and the aliases for each canonical outcome.
#[derive(Debug)]
pub struct MarketSpec {
    pub kind: MarketKind,
    /// Lower-case market identifiers.
    pub ids: &'static [&'static str],
    /// Canonical outcome key paired with its lower-case label aliases.
    pub outcomes: &'static [(&'static str, &'static [&'static str])],
}

pub const MARKET_SPECS: &[MarketSpec] = &[
    MarketSpec {
        kind: MarketKind::MatchResult,
        ids: &["1", "sr:market:1"],
        outcomes: &[
            ("home", &["1", "w1", "home", "home win", "1 (home)"]),
            ("draw", &["x", "draw", "tie", "x (draw)"]),
            ("away", &["2", "w2", "away", "away win", "2 (away)"]),
        ],
    },
    MarketSpec {
        kind: MarketKind::OverUnder25,
        ids: &["18", "sr:market:18", "sr:market:18:total=2.5"],
        outcomes: &[
            ("over", &["over", "over 2.5", "o2.5", ">2.5"]),
            ("under", &["under", "under 2.5", "u2.5", "<2.5"]),
        ],
    },
    MarketSpec {
        kind: MarketKind::BothTeamsToScore,
        ids: &["10", "sr:market:10"],
        outcomes: &[
            ("yes", &["yes", "gg", "both score", "both teams score"]),
            ("no", &["no", "ng", "not both", "both teams don't score"]),
        ],
    },
];

/// Goal line the over/under market is pinned to.
pub const OVER_UNDER_LINE: &str = "total=2.5";

/// Find the market spec for a raw market identifier.
pub fn market_for_id(raw_id: &str) -> Option<&'static MarketSpec> {
    let id = raw_id.trim().to_lowercase();
    MARKET_SPECS.iter().find(|spec| spec.ids.contains(&id.as_str()))
}

/// Resolve the canonical outcome key for a raw outcome label.
pub fn outcome_key(spec: &MarketSpec, raw_label: &str) -> Option<&'static str> {
    let label = raw_label.trim().to_lowercase();
    spec.outcomes
        .iter()
        .find(|(_, aliases)| aliases.contains(&label.as_str()))
        .map(|(key, _)| *key)
}

/// A value counts as present unless it is null, an empty string or an empty array.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Return the first present value reachable through `accessors`.
pub fn pick<'a>(object: &'a Value, accessors: &[Accessor]) -> Option<&'a Value> {
    accessors
        .iter()
        .filter_map(|accessor| lookup(object, *accessor))
        .find(|value| is_present(value))
}

/// Text of the first present scalar reachable through `accessors`. Objects
/// and arrays are passed over, so they never hide a later spelling.
pub fn pick_text(object: &Value, accessors: &[Accessor]) -> Option<String> {
    accessors
        .iter()
        .filter_map(|accessor| lookup(object, *accessor))
        .filter(|value| is_present(value))
        .find_map(scalar_text)
}

fn lookup(object: &Value, accessor: Accessor) -> Option<&Value> {
    match accessor {
        Key(key) => object.get(key),
        Nested(outer, inner) => object.get(outer).filter(|v| v.is_object())?.get(inner),
    }
}

/// Render a scalar JSON value as text; objects, arrays and null yield nothing.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
