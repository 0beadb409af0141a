use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const KNOWN_GOALS: [&str; 5] = ["retirement", "education", "wealth", "property", "business"];
pub const KNOWN_TIMELINES: [&str; 3] = ["short", "medium", "long"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskTolerance {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskTolerance::Conservative => "conservative",
            RiskTolerance::Moderate => "moderate",
            RiskTolerance::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskTolerance {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(RiskTolerance::Conservative),
            "moderate" => Ok(RiskTolerance::Moderate),
            "aggressive" => Ok(RiskTolerance::Aggressive),
            other => bail!("unknown risk tolerance {other:?} (expected conservative, moderate or aggressive)"),
        }
    }
}

/// Financial profile as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileInput {
    pub risk_tolerance: RiskTolerance,
    pub financial_goal: String,
    pub investment_timeline: String,
    pub monthly_income: String,
    pub monthly_expenses: String,
    pub total_savings: String,
    pub total_debt: String,
}

impl Default for ProfileInput {
    fn default() -> Self {
        Self {
            risk_tolerance: RiskTolerance::Moderate,
            financial_goal: "retirement".to_string(),
            investment_timeline: "medium".to_string(),
            monthly_income: "5000".to_string(),
            monthly_expenses: "3000".to_string(),
            total_savings: "20000".to_string(),
            total_debt: "10000".to_string(),
        }
    }
}

impl ProfileInput {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            !self.financial_goal.trim().is_empty(),
            "Please select at least one goal"
        );
        ensure!(
            !self.investment_timeline.trim().is_empty(),
            "Please select a timeline"
        );

        validate_amount("Monthly income", &self.monthly_income)?;
        validate_amount("Monthly expenses", &self.monthly_expenses)?;
        validate_amount("Total savings", &self.total_savings)?;
        validate_amount("Total debt", &self.total_debt)?;
        Ok(())
    }
}

fn validate_amount(label: &str, value: &str) -> anyhow::Result<()> {
    let trimmed = value.trim();
    ensure!(!trimmed.is_empty(), "{label} is required");
    let parsed = trimmed
        .parse::<f64>()
        .map_err(|_| anyhow::anyhow!("{label} must be a number (got {value:?})"))?;
    ensure!(
        parsed.is_finite() && parsed >= 0.0,
        "{label} must be a non-negative amount (got {value:?})"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_valid() {
        ProfileInput::default().validate().unwrap();
    }

    #[test]
    fn rejects_blank_fields() {
        let mut profile = ProfileInput::default();
        profile.investment_timeline = "  ".to_string();
        assert!(profile.validate().is_err());

        let mut profile = ProfileInput::default();
        profile.total_debt = String::new();
        let err = profile.validate().unwrap_err();
        assert_eq!(err.to_string(), "Total debt is required");
    }

    #[test]
    fn rejects_non_numeric_amounts() {
        let mut profile = ProfileInput::default();
        profile.monthly_income = "lots".to_string();
        assert!(profile.validate().is_err());

        profile.monthly_income = "-5".to_string();
        assert!(profile.validate().is_err());
    }

    #[test]
    fn accepts_unlisted_goal_identifiers() {
        let mut profile = ProfileInput::default();
        profile.financial_goal = "sabbatical".to_string();
        profile.validate().unwrap();
    }

    #[test]
    fn parses_risk_tolerance_case_insensitively() {
        assert_eq!(
            "Aggressive".parse::<RiskTolerance>().unwrap(),
            RiskTolerance::Aggressive
        );
        assert!("reckless".parse::<RiskTolerance>().is_err());
        assert_eq!(RiskTolerance::Conservative.to_string(), "conservative");
    }
}
