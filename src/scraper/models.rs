use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Canonical outcome key (e.g. `home`, `over`, `yes`) to a normalized odds string.
pub type OddsMap = BTreeMap<String, String>;

/// Sentinel for odds that could not be read as a number.
pub const UNKNOWN_ODDS: &str = "?";

/// One of today's fixtures, normalized from whichever upstream shape served it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub event_id: String,
    pub home: String,
    pub away: String,
    /// `HH:MM UTC`, or `TBD` when the kickoff time is unknown.
    pub time: String,
    pub league: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odds_1x2: Option<OddsMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odds_ou: Option<OddsMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odds_btts: Option<OddsMap>,
}

impl Match {
    pub fn has_odds(&self) -> bool {
        self.odds_1x2.is_some() || self.odds_ou.is_some() || self.odds_btts.is_some()
    }
}
