use crate::advice::error::{MalformedReplyError, TransportError};
use crate::advice::json::normalize_service_body;
use crate::advice::{AdvisorClient, AdvisorRequest};
use crate::cooldown::{Admission, AttemptOutcome, Clock, CooldownController, CooldownStore};
use crate::domain::profile::ProfileInput;
use crate::domain::recommendation::NormalizedRecommendation;
use std::fmt;

/// Shown for any failed submission, whatever the cause.
pub const GENERIC_FAILURE_MESSAGE: &str = "AI is cooling down, please try after sometime..!";

#[derive(Debug)]
pub enum SubmitError {
    Invalid(anyhow::Error),
    CoolingDown { seconds_remaining: u64 },
    InFlight,
    Transport(anyhow::Error),
    MalformedReply(MalformedReplyError),
    /// The cooldown store could not be read or written.
    Store(anyhow::Error),
}

impl SubmitError {
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Invalid(err) => err.to_string(),
            SubmitError::CoolingDown { seconds_remaining } => {
                format!("Please wait {seconds_remaining}s before requesting new recommendations.")
            }
            SubmitError::InFlight => "A request is already in progress.".to_string(),
            SubmitError::Transport(_) | SubmitError::MalformedReply(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            SubmitError::Store(err) => format!("Could not access cooldown state: {err}"),
        }
    }

    /// Whether this attempt consumed a cooldown window.
    pub fn started_cooldown(&self) -> bool {
        matches!(self, SubmitError::Transport(_) | SubmitError::MalformedReply(_))
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Invalid(err) => write!(f, "invalid profile: {err}"),
            SubmitError::CoolingDown { seconds_remaining } => {
                write!(f, "submission blocked by cooldown ({seconds_remaining}s remaining)")
            }
            SubmitError::InFlight => f.write_str("a submission is already in flight"),
            SubmitError::Transport(err) => write!(f, "{err:#}"),
            SubmitError::MalformedReply(err) => write!(f, "{err}"),
            SubmitError::Store(err) => write!(f, "cooldown store error: {err:#}"),
        }
    }
}

impl std::error::Error for SubmitError {}

/// Validate, check the cooldown, call the service, normalize, then start a new cooldown.
pub async fn submit_profile<S, C>(
    client: &dyn AdvisorClient,
    controller: &mut CooldownController<S, C>,
    profile: ProfileInput,
) -> Result<NormalizedRecommendation, SubmitError>
where
    S: CooldownStore,
    C: Clock,
{
    profile.validate().map_err(SubmitError::Invalid)?;

    match controller.begin_submit().map_err(SubmitError::Store)? {
        Admission::Granted => {}
        Admission::CoolingDown { seconds_remaining } => {
            tracing::info!(seconds_remaining, "submission rejected; cooldown active");
            return Err(SubmitError::CoolingDown { seconds_remaining });
        }
        Admission::InFlight => return Err(SubmitError::InFlight),
    }

    let request = AdvisorRequest::from(profile);
    tracing::info!(
        endpoint = client.endpoint(),
        risk_tolerance = %request.risk_tolerance,
        "requesting recommendations"
    );

    let result = match client.fetch_recommendations(&request).await {
        Ok(body) => normalize_service_body(&body).map_err(SubmitError::MalformedReply),
        Err(err) => Err(SubmitError::Transport(err)),
    };

    let outcome = match &result {
        Ok(_) => AttemptOutcome::Success,
        Err(_) => AttemptOutcome::Failure,
    };
    controller
        .record_attempt(outcome)
        .map_err(SubmitError::Store)?;

    match &result {
        Ok(rec) => {
            let missing = rec.missing_presentation_fields();
            if !missing.is_empty() {
                tracing::warn!(?missing, "reply lacks presentation fields");
            }
        }
        Err(SubmitError::Transport(err)) => match err.downcast_ref::<TransportError>() {
            Some(diag) => tracing::error!(
                stage = diag.stage,
                detail = %diag.detail,
                service_detail = ?diag.service_detail(),
                body = ?diag.body_excerpt(),
                "recommendation request failed"
            ),
            None => tracing::error!(error = %format!("{err:#}"), "recommendation request failed"),
        },
        Err(SubmitError::MalformedReply(err)) => {
            tracing::error!(detail = %err.detail, "recommendation reply was malformed");
        }
        Err(_) => {}
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooldown::{CooldownState, ManualClock, MemoryCooldownStore};
    use crate::domain::recommendation::Record;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MockClient {
        reply: Result<String, TransportError>,
        calls: AtomicUsize,
    }

    impl MockClient {
        fn replying(body: String) -> Self {
            Self {
                reply: Ok(body),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(TransportError {
                    stage: "http",
                    detail: "status=503 Service Unavailable".to_string(),
                    raw_body: Some("{\"detail\": \"overloaded\"}".to_string()),
                    raw_body_json: Some(json!({"detail": "overloaded"})),
                }),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl AdvisorClient for MockClient {
        fn endpoint(&self) -> &str {
            "mock://advisor"
        }

        async fn fetch_recommendations(&self, request: &AdvisorRequest) -> anyhow::Result<String> {
            assert_eq!(request.financial_goals.len(), 1);
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(body) => Ok(body.clone()),
                Err(err) => Err(err.clone().into()),
            }
        }
    }

    fn controller() -> (
        CooldownController<MemoryCooldownStore, ManualClock>,
        MemoryCooldownStore,
        ManualClock,
    ) {
        let store = MemoryCooldownStore::default();
        let clock = ManualClock::starting_at(Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap());
        let ctl = CooldownController::load(store.clone(), clock.clone(), Duration::from_secs(90))
            .unwrap();
        (ctl, store, clock)
    }

    fn reply_with_market_trends_only() -> String {
        let trends = json!([{"Trend": "Rate cuts expected", "Direction": "Positive"}]);
        let text = format!(
            "Based on your profile:\n```json\n{}\n```",
            json!({ "Market_Trends": trends })
        );
        json!({ "recommendations": text }).to_string()
    }

    #[tokio::test]
    async fn end_to_end_fills_missing_required_fields() {
        let client = MockClient::replying(reply_with_market_trends_only());
        let (mut ctl, store, _clock) = controller();

        let rec = submit_profile(&client, &mut ctl, ProfileInput::default())
            .await
            .unwrap();

        assert_eq!(rec.market_trends.len(), 1);
        assert_eq!(rec.market_trends[0]["Trend"], "Rate cuts expected");
        assert_eq!(rec.market_trends[0]["Direction"], "Positive");
        assert_eq!(rec.justifications, vec![Record::new()]);
        assert_eq!(rec.risk_assessment, vec![Record::new()]);
        assert_eq!(rec.projected_outcomes, vec![Record::new()]);

        assert!(!ctl.can_submit_now());
        assert_eq!(ctl.seconds_remaining(), 90);
        assert!(store.get().unwrap().is_some());
    }

    #[tokio::test]
    async fn second_submit_is_blocked_without_calling_service() {
        let client = MockClient::replying(reply_with_market_trends_only());
        let (mut ctl, _store, clock) = controller();

        submit_profile(&client, &mut ctl, ProfileInput::default())
            .await
            .unwrap();
        clock.advance(Duration::from_secs(10));

        let err = submit_profile(&client, &mut ctl, ProfileInput::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::CoolingDown {
                seconds_remaining: 80
            }
        ));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transport_failure_still_starts_cooldown() {
        let client = MockClient::failing();
        let (mut ctl, _store, _clock) = controller();

        let err = submit_profile(&client, &mut ctl, ProfileInput::default())
            .await
            .unwrap_err();
        let SubmitError::Transport(cause) = &err else {
            panic!("expected transport error, got {err:?}");
        };
        let diag = cause.downcast_ref::<TransportError>().unwrap();
        assert_eq!(diag.stage, "http");
        assert_eq!(diag.service_detail().as_deref(), Some("overloaded"));
        assert!(err.started_cooldown());
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
        assert_eq!(ctl.seconds_remaining(), 90);
    }

    #[tokio::test]
    async fn malformed_reply_gets_generic_message_and_cooldown() {
        let body = json!({"recommendations": "Sorry, I cannot help with that."}).to_string();
        let client = MockClient::replying(body);
        let (mut ctl, _store, _clock) = controller();

        let err = submit_profile(&client, &mut ctl, ProfileInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::MalformedReply(_)));
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
        assert!(matches!(ctl.state(), CooldownState::CooldownActive { .. }));
    }

    #[tokio::test]
    async fn invalid_profile_never_reaches_service() {
        let client = MockClient::replying(reply_with_market_trends_only());
        let (mut ctl, _store, _clock) = controller();
        let profile = ProfileInput {
            monthly_income: String::new(),
            ..ProfileInput::default()
        };

        let err = submit_profile(&client, &mut ctl, profile).await.unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(_)));
        assert!(!err.started_cooldown());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ctl.state(), CooldownState::Idle);
    }
}
