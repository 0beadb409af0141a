use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One card's worth of data. Keys are whatever the service emits (`Trend`, `Risk`, ...).
pub type Record = Map<String, Value>;

pub const MARKET_TRENDS: &str = "Market_Trends";
pub const JUSTIFICATIONS: &str = "Justifications";
pub const RISK_ASSESSMENT: &str = "Risk_Assessment";
pub const PROJECTED_OUTCOMES: &str = "Projected_Outcomes";

/// Top-level keys that must always be iterable after normalization.
pub const REQUIRED_FIELDS: [&str; 4] = [
    MARKET_TRENDS,
    JUSTIFICATIONS,
    RISK_ASSESSMENT,
    PROJECTED_OUTCOMES,
];

/// Keys the dashboard also renders but which are trusted as-is.
pub const PRESENTATION_FIELDS: [&str; 4] = [
    "Investment_Actions",
    "Top_Mutual_Funds",
    "Diversification_Strategies",
    "Sample_Investment_Plan",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecommendation {
    #[serde(rename = "Market_Trends")]
    pub market_trends: Vec<Record>,
    #[serde(rename = "Justifications")]
    pub justifications: Vec<Record>,
    #[serde(rename = "Risk_Assessment")]
    pub risk_assessment: Vec<Record>,
    #[serde(rename = "Projected_Outcomes")]
    pub projected_outcomes: Vec<Record>,

    /// Everything else the service sent, untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl NormalizedRecommendation {
    pub fn required(&self, field: &str) -> Option<&[Record]> {
        match field {
            MARKET_TRENDS => Some(&self.market_trends),
            JUSTIFICATIONS => Some(&self.justifications),
            RISK_ASSESSMENT => Some(&self.risk_assessment),
            PROJECTED_OUTCOMES => Some(&self.projected_outcomes),
            _ => None,
        }
    }

    /// Presentation fields that are absent or empty. These are not back-filled.
    pub fn missing_presentation_fields(&self) -> Vec<&'static str> {
        PRESENTATION_FIELDS
            .into_iter()
            .filter(|field| match self.extra.get(*field) {
                None | Some(Value::Null) => true,
                Some(Value::Array(items)) => items.is_empty(),
                Some(Value::Object(map)) => map.is_empty(),
                Some(_) => false,
            })
            .collect()
    }
}
