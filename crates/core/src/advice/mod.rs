use crate::domain::profile::ProfileInput;
use serde::Serialize;

pub mod error;
pub mod http;
pub mod json;
pub mod submit;

/// Wire body for the prediction endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisorRequest {
    pub risk_tolerance: String,
    pub financial_goals: Vec<String>,
    pub timeline: Vec<String>,
    pub income: String,
    pub expenses: String,
    pub savings: String,
    pub debt_levels: String,
}

impl From<ProfileInput> for AdvisorRequest {
    fn from(profile: ProfileInput) -> Self {
        Self {
            risk_tolerance: profile.risk_tolerance.as_str().to_string(),
            financial_goals: vec![profile.financial_goal],
            timeline: vec![profile.investment_timeline],
            income: profile.monthly_income,
            expenses: profile.monthly_expenses,
            savings: profile.total_savings,
            debt_levels: profile.total_debt,
        }
    }
}

#[async_trait::async_trait]
pub trait AdvisorClient: Send + Sync {
    fn endpoint(&self) -> &str;

    /// Sends the request and returns the raw response body of a 2xx reply.
    ///
    /// Any other outcome is a [`error::TransportError`].
    async fn fetch_recommendations(&self, request: &AdvisorRequest) -> anyhow::Result<String>;
}
