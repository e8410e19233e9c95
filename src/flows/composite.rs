//! Multi-step operations chained on top of single flows.

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use super::executor::FlowExecutor;
use crate::error::FlowError;
use crate::media::{pcm_rate_from_mime, pcm_to_wav, to_data_uri};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInput {
    pub audio_data_uri: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCoachReply {
    pub user_query: String,
    pub coach_response_text: String,
    pub coach_response_audio_uri: String,
}

/// Transcribe the question, answer it, speak the answer back as WAV.
#[instrument(skip_all)]
pub async fn coach_voice(
    exec: &FlowExecutor,
    input: &VoiceInput,
) -> Result<VoiceCoachReply, FlowError> {
    let user_query: String = exec.execute_typed("transcribe", input).await?;
    let answer: String = exec
        .execute_typed("coach", &json!({ "query": user_query }))
        .await?;

    let audio = exec.speak(&answer).await?;
    let rate = pcm_rate_from_mime(&audio.mime_type);
    let wav = pcm_to_wav(&audio.data, 1, rate, 16);
    info!(pcm_bytes = audio.data.len(), rate, "coach reply synthesized");

    Ok(VoiceCoachReply {
        user_query,
        coach_response_text: answer,
        coach_response_audio_uri: to_data_uri(&wav, "audio/wav"),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Deserialize)]
struct MoodAnalysis {
    mood: Mood,
    summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    pub transcription: String,
    pub mood: Mood,
    pub summary: String,
}

#[instrument(skip_all)]
pub async fn journal_voice(
    exec: &FlowExecutor,
    input: &VoiceInput,
) -> Result<JournalEntry, FlowError> {
    let transcription: String = exec.execute_typed("transcribe", input).await?;
    let analysis: MoodAnalysis = exec
        .execute_typed("mood-analysis", &json!({ "transcription": transcription }))
        .await?;
    Ok(JournalEntry {
        transcription,
        mood: analysis.mood,
        summary: analysis.summary,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceKind {
    Supplements,
    Recipe,
    MealPrep,
}

impl AdviceKind {
    fn flow(self) -> &'static str {
        match self {
            AdviceKind::Supplements => "nutrition-advice-supplements",
            AdviceKind::Recipe => "nutrition-advice-recipe",
            AdviceKind::MealPrep => "nutrition-advice-meal-prep",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceRequest {
    pub request_type: AdviceKind,
    #[serde(default)]
    pub ingredients: Option<String>,
    #[serde(default)]
    pub meal_plan: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdviceReply {
    pub response: String,
}

#[instrument(skip(exec, request), fields(kind = ?request.request_type))]
pub async fn nutrition_advice(
    exec: &FlowExecutor,
    request: &AdviceRequest,
) -> Result<AdviceReply, FlowError> {
    let input = json!({
        "ingredients": request.ingredients,
        "mealPlan": request.meal_plan,
    });
    let response: String = exec
        .execute_typed(request.request_type.flow(), &input)
        .await?;
    Ok(AdviceReply { response })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    MealTiming,
    HabitSuggestion,
    HydrationReminder,
    Random,
}

impl InsightKind {
    const CONCRETE: [InsightKind; 3] = [
        InsightKind::MealTiming,
        InsightKind::HabitSuggestion,
        InsightKind::HydrationReminder,
    ];

    /// `Random` becomes one of the concrete kinds; the rest map to themselves.
    pub fn resolve<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        match self {
            InsightKind::Random => Self::CONCRETE
                .choose(rng)
                .copied()
                .unwrap_or(InsightKind::MealTiming),
            other => other,
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            InsightKind::MealTiming => {
                "Provide a random, actionable tip about meal timing for better fitness results. \
                 For example, 'Consider eating a mix of protein and carbs 1-2 hours before your \
                 workout for sustained energy.' or 'A protein-rich snack after your workout can \
                 help with muscle recovery.'"
            }
            InsightKind::HabitSuggestion => {
                "Analyze a common negative eating habit and suggest a positive alternative. \
                 For example, 'Instead of reaching for a sugary snack in the afternoon, try a \
                 handful of almonds or a piece of fruit to keep your energy levels stable.' or \
                 'If you often skip breakfast, a simple protein smoothie can be a quick and \
                 healthy way to start your day.'"
            }
            InsightKind::HydrationReminder => {
                "Generate a creative and motivating reminder to drink water. For example, \
                 'Your body is working hard! Don't forget to hydrate to help it recover and \
                 perform at its best.' or 'A glass of water now can boost your focus and energy \
                 for the next hour.'"
            }
            InsightKind::Random => {
                "Provide a random, interesting, and helpful nutrition tip for someone on a \
                 fitness journey."
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRequest {
    pub insight_type: InsightKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightReply {
    pub insight: String,
}

#[instrument(skip(exec))]
pub async fn nutrition_insight(
    exec: &FlowExecutor,
    kind: InsightKind,
) -> Result<InsightReply, FlowError> {
    let kind = kind.resolve(&mut rand::thread_rng());
    let insight: String = exec
        .execute_typed(
            "nutrition-insight",
            &json!({ "instruction": kind.instruction() }),
        )
        .await?;
    Ok(InsightReply { insight })
}
