//! Upstream endpoints in priority order: most specific first, legacy last.

use crate::scraper::parse::ParserKind;

/// Market IDs requested everywhere: 1X2, over/under, both teams to score.
const MARKET_IDS: &str = "1,18,10";

/// Path, static query parameters and parser of one endpoint.
struct EndpointTemplate {
    path: &'static str,
    params: &'static [(&'static str, &'static str)],
    parser: ParserKind,
}

const SPORTYBET_CHAIN: &[EndpointTemplate] = &[
    EndpointTemplate {
        path: "/sport/football/highlights",
        params: &[
            ("sportId", "sr:sport:1"),
            ("marketId", MARKET_IDS),
            ("pageSize", "100"),
        ],
        parser: ParserKind::FlatList,
    },
    EndpointTemplate {
        path: "/sport/football/events/schedule/today",
        params: &[("marketId", MARKET_IDS)],
        parser: ParserKind::GroupedSchedule,
    },
    EndpointTemplate {
        path: "/factsCenter/football",
        params: &[
            ("sportId", "1"),
            ("marketId", MARKET_IDS),
            ("page", "1"),
            ("pageSize", "100"),
        ],
        parser: ParserKind::FlatList,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    params: Vec<(String, String)>,
    parser: ParserKind,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, params: &[(&str, &str)], parser: ParserKind) -> Self {
        Self {
            url: url.into(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            parser,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn parser(&self) -> ParserKind {
        self.parser
    }
}

#[derive(Debug, Clone)]
pub struct EndpointChain {
    endpoints: Vec<Endpoint>,
}

impl EndpointChain {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    /// The default three-endpoint chain rooted at `base_url`.
    pub fn sportybet(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let endpoints = SPORTYBET_CHAIN
            .iter()
            .map(|t| Endpoint::new(format!("{base}{}", t.path), t.params, t.parser))
            .collect();
        Self { endpoints }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
