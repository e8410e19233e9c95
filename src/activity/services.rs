use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use time::{Date, Duration, Month, Weekday};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::FlowError;
use crate::flows::executor::FlowExecutor;
use crate::flows::schema::Violation;
use crate::logs::model::{DailyGoal, GoalsLog, NutritionLog, WorkoutLog};
use crate::logs::{date_key, parse_date, DailyLogStore, LogKind};
use crate::profiles::ProfileStore;

/// How far back the monthly chart looks, in logged days.
const CHART_HISTORY_DAYS: usize = 366;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInput {
    /// Minutes.
    pub duration: f64,
    pub calories: f64,
    #[serde(default)]
    pub steps: Option<f64>,
}

/// Adds one session to the day's workout log.
///
/// Read, add, write: two concurrent calls for the same day can lose one update.
#[instrument(skip(logs))]
pub async fn log_workout_session(
    logs: &DailyLogStore,
    user: Uuid,
    date: Date,
    input: SessionInput,
) -> Result<WorkoutLog, FlowError> {
    for (field, value) in [
        ("duration", Some(input.duration)),
        ("calories", Some(input.calories)),
        ("steps", input.steps),
    ] {
        if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
            return Err(Violation::new(format!("$.{}", field), "must be a non-negative number").into());
        }
    }

    let current: WorkoutLog = logs
        .get_as(user, date, LogKind::Workout)
        .await?
        .unwrap_or_default();
    let steps = match (current.steps, input.steps) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
    };
    let updated = WorkoutLog {
        sessions: current.sessions + 1.0,
        duration: current.duration + input.duration,
        calories: current.calories + input.calories,
        steps,
    };
    logs.update_with(user, date, LogKind::Workout, &updated).await?;
    info!(user_id = %user, sessions = updated.sessions, "workout session logged");
    Ok(updated)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayActivity {
    pub day: String,
    pub workouts: f64,
    pub duration: f64,
}

fn short_weekday(day: Weekday) -> &'static str {
    match day {
        Weekday::Monday => "Mon",
        Weekday::Tuesday => "Tue",
        Weekday::Wednesday => "Wed",
        Weekday::Thursday => "Thu",
        Weekday::Friday => "Fri",
        Weekday::Saturday => "Sat",
        Weekday::Sunday => "Sun",
    }
}

fn short_month(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

/// The seven days ending at `today`, oldest first.
#[instrument(skip(logs))]
pub async fn weekly_activity(
    logs: &DailyLogStore,
    user: Uuid,
    today: Date,
) -> Result<Vec<DayActivity>, FlowError> {
    let mut week = Vec::with_capacity(7);
    for back in (0..7i64).rev() {
        let date = today - Duration::days(back);
        let log: WorkoutLog = logs
            .get_as(user, date, LogKind::Workout)
            .await?
            .unwrap_or_default();
        week.push(DayActivity {
            day: short_weekday(date.weekday()).to_string(),
            workouts: log.sessions,
            duration: log.duration,
        });
    }
    Ok(week)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub title: String,
    pub summary: String,
}

#[instrument(skip(flows, activity))]
pub async fn weekly_report(
    flows: &FlowExecutor,
    activity: &[DayActivity],
) -> Result<WeeklyReport, FlowError> {
    flows
        .execute_typed("weekly-report", &json!({ "weeklyActivity": activity }))
        .await
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyProgress {
    pub month: String,
    pub workouts: f64,
    pub calories: f64,
    pub weight: f64,
    pub squat: f64,
}

#[derive(Default)]
struct MonthBucket {
    workouts: f64,
    calorie_total: f64,
    calorie_days: u32,
}

fn month_of(key: &str) -> Option<(i32, Month)> {
    match parse_date(key) {
        Ok(d) => Some((d.year(), d.month())),
        Err(e) => {
            warn!(key, error = %e, "skipping log with a non-date id");
            None
        }
    }
}

/// Workout and nutrition history bucketed by calendar month, oldest month first.
#[instrument(skip(logs, profiles))]
pub async fn progress_chart(
    logs: &DailyLogStore,
    profiles: &ProfileStore,
    user: Uuid,
    today: Date,
) -> Result<Vec<MonthlyProgress>, FlowError> {
    let workouts: Vec<(String, WorkoutLog)> =
        logs.history_as(user, LogKind::Workout, CHART_HISTORY_DAYS).await?;
    let nutrition: Vec<(String, NutritionLog)> =
        logs.history_as(user, LogKind::Nutrition, CHART_HISTORY_DAYS).await?;
    let profile = profiles.get(user).await?;

    let mut months: BTreeMap<(i32, u8), MonthBucket> = BTreeMap::new();
    for (key, log) in &workouts {
        if let Some((y, m)) = month_of(key) {
            months.entry((y, m as u8)).or_default().workouts += log.sessions;
        }
    }
    for (key, log) in &nutrition {
        if let Some((y, m)) = month_of(key) {
            let bucket = months.entry((y, m as u8)).or_default();
            bucket.calorie_total += log.calories.current;
            bucket.calorie_days += 1;
        }
    }

    let weight = profile.as_ref().and_then(|p| p.weight);
    if weight.is_some() {
        months
            .entry((today.year(), today.month() as u8))
            .or_default();
    }
    let weight = weight.unwrap_or(0.0).round();

    let mut rows: Vec<MonthlyProgress> = months
        .into_iter()
        .filter_map(|((_, m), bucket)| {
            let month = Month::try_from(m).ok()?;
            let calories = if bucket.calorie_days > 0 {
                (bucket.calorie_total / f64::from(bucket.calorie_days)).round()
            } else {
                0.0
            };
            Some(MonthlyProgress {
                month: short_month(month).to_string(),
                workouts: bucket.workouts,
                calories,
                weight,
                squat: 0.0,
            })
        })
        .collect();

    if rows.is_empty() && profile.is_some() {
        rows.push(MonthlyProgress {
            month: short_month(today.month()).to_string(),
            workouts: 0.0,
            calories: 0.0,
            weight,
            squat: 0.0,
        });
    }
    debug!(months = rows.len(), "progress chart built");
    Ok(rows)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressForecast {
    pub prediction: String,
}

#[instrument(skip(flows, logs, profiles))]
pub async fn progress_forecast(
    flows: &FlowExecutor,
    logs: &DailyLogStore,
    profiles: &ProfileStore,
    user: Uuid,
    today: Date,
) -> Result<ProgressForecast, FlowError> {
    let history = progress_chart(logs, profiles, user, today).await?;
    let goals = profiles
        .get(user)
        .await?
        .and_then(|p| p.goals)
        .unwrap_or_default();
    flows
        .execute_typed(
            "predict-progress",
            &json!({ "history": history, "goals": goals }),
        )
        .await
}

#[derive(Debug, Clone, Serialize)]
pub struct TodaySummary {
    pub date: String,
    pub workout: Option<WorkoutLog>,
    pub nutrition: Option<NutritionLog>,
    pub goals: Vec<DailyGoal>,
}

#[instrument(skip(logs))]
pub async fn today_summary(
    logs: &DailyLogStore,
    user: Uuid,
    today: Date,
) -> Result<TodaySummary, FlowError> {
    let (workout, nutrition, goals) = tokio::try_join!(
        logs.get_as::<WorkoutLog>(user, today, LogKind::Workout),
        logs.get_as::<NutritionLog>(user, today, LogKind::Nutrition),
        logs.get_as::<GoalsLog>(user, today, LogKind::Goals),
    )?;
    Ok(TodaySummary {
        date: date_key(today),
        workout,
        nutrition,
        goals: goals.map(|g| g.goals).unwrap_or_default(),
    })
}

/// Today's goals; generated and saved on the first read of the day.
#[instrument(skip(flows, logs))]
pub async fn daily_goals(
    flows: &FlowExecutor,
    logs: &DailyLogStore,
    user: Uuid,
    today: Date,
) -> Result<Vec<DailyGoal>, FlowError> {
    if let Some(existing) = logs.get_as::<GoalsLog>(user, today, LogKind::Goals).await? {
        if !existing.goals.is_empty() {
            return Ok(existing.goals);
        }
    }

    let generated: GoalsLog = flows.execute_typed("daily-goals", &json!({})).await?;
    logs.update_with(user, today, LogKind::Goals, &generated).await?;
    info!(user_id = %user, count = generated.goals.len(), "daily goals generated");
    Ok(generated.goals)
}

pub async fn replace_goals(
    logs: &DailyLogStore,
    user: Uuid,
    today: Date,
    goals: Vec<DailyGoal>,
) -> Result<Vec<DailyGoal>, FlowError> {
    let log = GoalsLog { goals };
    logs.update_with(user, today, LogKind::Goals, &log).await?;
    Ok(log.goals)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::genai::testing::ScriptedClient;
    use crate::storage::MemoryDocumentStore;

    struct Fixture {
        logs: DailyLogStore,
        profiles: ProfileStore,
        user: Uuid,
    }

    fn fixture() -> Fixture {
        let docs = Arc::new(MemoryDocumentStore::new());
        Fixture {
            logs: DailyLogStore::new(docs.clone()),
            profiles: ProfileStore::new(docs),
            user: Uuid::new_v4(),
        }
    }

    fn day(s: &str) -> Date {
        parse_date(s).unwrap()
    }

    fn session(duration: f64, calories: f64) -> SessionInput {
        SessionInput {
            duration,
            calories,
            steps: None,
        }
    }

    #[tokio::test]
    async fn sessions_accumulate() {
        let f = fixture();
        let d = day("2024-05-01");
        log_workout_session(&f.logs, f.user, d, session(30.0, 200.0)).await.unwrap();
        let log = log_workout_session(&f.logs, f.user, d, session(15.0, 100.0))
            .await
            .unwrap();
        assert_eq!(log.sessions, 2.0);
        assert_eq!(log.duration, 45.0);
        assert_eq!(log.calories, 300.0);
        assert!(log.steps.is_none());

        let stored: WorkoutLog = f.logs.get_as(f.user, d, LogKind::Workout).await.unwrap().unwrap();
        assert_eq!(stored, log);
    }

    #[tokio::test]
    async fn negative_session_values_are_rejected() {
        let f = fixture();
        let err = log_workout_session(&f.logs, f.user, day("2024-05-01"), session(-5.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Validation(ref v) if v.path == "$.duration"));
    }

    #[tokio::test]
    async fn week_is_oldest_first_with_gaps_filled() {
        let f = fixture();
        // 2024-05-05 is a Sunday.
        let today = day("2024-05-05");
        log_workout_session(&f.logs, f.user, day("2024-04-29"), session(40.0, 0.0)).await.unwrap();
        log_workout_session(&f.logs, f.user, day("2024-05-05"), session(20.0, 0.0)).await.unwrap();
        log_workout_session(&f.logs, f.user, day("2024-04-20"), session(90.0, 0.0)).await.unwrap();

        let week = weekly_activity(&f.logs, f.user, today).await.unwrap();
        let days: Vec<&str> = week.iter().map(|d| d.day.as_str()).collect();
        assert_eq!(days, vec!["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);
        assert_eq!(week[0].duration, 40.0);
        assert_eq!(week[3].workouts, 0.0);
        assert_eq!(week[6].workouts, 1.0);
        let total: f64 = week.iter().map(|d| d.duration).sum();
        assert_eq!(total, 60.0);
    }

    #[tokio::test]
    async fn future_logs_do_not_hide_the_current_week() {
        let f = fixture();
        let today = day("2024-05-05");
        log_workout_session(&f.logs, f.user, today, session(25.0, 0.0)).await.unwrap();
        for ahead in 1..=40i64 {
            f.logs
                .update(f.user, today + Duration::days(ahead), LogKind::Workout, json!({"sessions": 1}))
                .await
                .unwrap();
        }

        let week = weekly_activity(&f.logs, f.user, today).await.unwrap();
        assert_eq!(week[6].workouts, 1.0);
        assert_eq!(week[6].duration, 25.0);
    }

    #[tokio::test]
    async fn chart_is_chronological_across_years() {
        let f = fixture();
        f.profiles
            .update(f.user, json!({"weight": 70.4}))
            .await
            .unwrap();
        for d in ["2023-12-30", "2024-01-03", "2024-01-04"] {
            log_workout_session(&f.logs, f.user, day(d), session(30.0, 0.0)).await.unwrap();
        }
        for (d, kcal) in [("2024-01-03", 1800.0), ("2024-01-04", 2101.0)] {
            f.logs
                .update(
                    f.user,
                    day(d),
                    LogKind::Nutrition,
                    json!({"calories": {"current": kcal, "target": 2200}}),
                )
                .await
                .unwrap();
        }

        let rows = progress_chart(&f.logs, &f.profiles, f.user, day("2024-02-10"))
            .await
            .unwrap();
        let months: Vec<&str> = rows.iter().map(|r| r.month.as_str()).collect();
        assert_eq!(months, vec!["Dec", "Jan", "Feb"]);
        assert_eq!(rows[1].workouts, 2.0);
        assert_eq!(rows[1].calories, 1951.0);
        assert_eq!(rows[0].calories, 0.0);
        assert!(rows.iter().all(|r| r.weight == 70.0 && r.squat == 0.0));
    }

    #[tokio::test]
    async fn chart_without_history_has_one_row_for_a_known_user() {
        let f = fixture();
        assert!(progress_chart(&f.logs, &f.profiles, f.user, day("2024-03-01"))
            .await
            .unwrap()
            .is_empty());

        f.profiles.create(f.user, json!({"displayName": "Ana"})).await.unwrap();
        let rows = progress_chart(&f.logs, &f.profiles, f.user, day("2024-03-01"))
            .await
            .unwrap();
        assert_eq!(
            rows,
            vec![MonthlyProgress {
                month: "Mar".into(),
                workouts: 0.0,
                calories: 0.0,
                weight: 0.0,
                squat: 0.0,
            }]
        );
    }

    #[tokio::test]
    async fn goals_are_generated_once_per_day() {
        let f = fixture();
        let client = Arc::new(ScriptedClient::new().reply_text(
            r#"{"goals": [
                {"name": "Walk 10,000 steps", "current": 0, "target": 10000, "unit": "steps"},
                {"name": "Drink water", "current": 0, "target": 8, "unit": "glasses"}
            ]}"#,
        ));
        let flows = FlowExecutor::scripted(client.clone());
        let today = day("2024-05-01");

        let first = daily_goals(&flows, &f.logs, f.user, today).await.unwrap();
        let second = daily_goals(&flows, &f.logs, f.user, today).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(client.calls(), 1);

        let mut edited = first.clone();
        edited[0].current = 4200.0;
        replace_goals(&f.logs, f.user, today, edited).await.unwrap();
        let summary = today_summary(&f.logs, f.user, today).await.unwrap();
        assert_eq!(summary.goals[0].current, 4200.0);
        assert!(summary.workout.is_none());
        assert_eq!(summary.date, "2024-05-01");
    }

    #[tokio::test]
    async fn forecast_feeds_chart_and_goals_to_the_model() {
        let f = fixture();
        f.profiles
            .create(f.user, json!({"weight": 82, "goals": ["weight_loss"]}))
            .await
            .unwrap();
        let client = Arc::new(
            ScriptedClient::new().reply_text(r#"{"prediction": "Expect about 1kg less by June."}"#),
        );
        let flows = FlowExecutor::scripted(client.clone());

        let out = progress_forecast(&flows, &f.logs, &f.profiles, f.user, day("2024-05-01"))
            .await
            .unwrap();
        assert!(out.prediction.contains("1kg"));

        let prompt: String = client
            .request(0)
            .parts
            .iter()
            .filter_map(|p| match p {
                crate::genai::Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert!(prompt.contains("weight_loss"));
        assert!(prompt.contains("- May: weight 82kg"));
    }
}
