use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use super::model::OnboardingReply;
use super::store::ProfileStore;
use crate::error::FlowError;
use crate::flows::executor::FlowExecutor;
use crate::flows::registry::onboarding_shape;

/// Saves the questionnaire as the user's profile, then asks the coach for a welcome.
#[instrument(skip(flows, profiles, answers))]
pub async fn onboard(
    flows: &FlowExecutor,
    profiles: &ProfileStore,
    user: Uuid,
    answers: Value,
) -> Result<OnboardingReply, FlowError> {
    onboarding_shape().validate(&answers)?;
    profiles.update(user, answers.clone()).await?;
    let reply: OnboardingReply = flows.execute_typed("onboarding", &answers).await?;
    info!(user_id = %user, "user onboarded");
    Ok(reply)
}
