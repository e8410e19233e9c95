use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime};

use crate::flows::registry::daily_goal_shape;
use crate::flows::schema::{Field, Shape, Violation};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Workout,
    Nutrition,
    Goals,
}

impl LogKind {
    pub fn collection(self) -> &'static str {
        match self {
            LogKind::Workout => "workouts",
            LogKind::Nutrition => "nutrition",
            LogKind::Goals => "goals",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LogKind::Workout => "workout log",
            LogKind::Nutrition => "nutrition log",
            LogKind::Goals => "goals log",
        }
    }

    pub fn shape(self) -> Shape {
        match self {
            LogKind::Workout => Shape::object(vec![
                Field::required("sessions", Shape::Number, "Workouts completed."),
                Field::required("duration", Shape::Number, "Minutes trained."),
                Field::required("calories", Shape::Number, "Calories burned."),
                Field::optional("steps", Shape::Number, "Steps walked."),
            ]),
            LogKind::Nutrition => {
                let metric = || {
                    Shape::object(vec![
                        Field::required("current", Shape::Number, ""),
                        Field::required("target", Shape::Number, ""),
                    ])
                };
                Shape::object(vec![
                    Field::required("calories", metric(), "kcal"),
                    Field::required("protein", metric(), "grams"),
                    Field::required("carbs", metric(), "grams"),
                    Field::required("fats", metric(), "grams"),
                    Field::required("water", metric(), "glasses"),
                ])
            }
            LogKind::Goals => Shape::object(vec![Field::required(
                "goals",
                Shape::array(daily_goal_shape()),
                "Goals for the day.",
            )]),
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogKind::Workout => "workout",
            LogKind::Nutrition => "nutrition",
            LogKind::Goals => "goals",
        })
    }
}

impl FromStr for LogKind {
    type Err = Violation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workout" | "workouts" => Ok(LogKind::Workout),
            "nutrition" => Ok(LogKind::Nutrition),
            "goals" => Ok(LogKind::Goals),
            other => Err(Violation::new(
                "kind",
                format!("'{}' is not one of workout, nutrition, goals", other),
            )),
        }
    }
}

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// `yyyy-MM-dd`, the document id of a daily log.
pub fn date_key(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Accepts `yyyy-MM-dd` or the literal `today`.
pub fn parse_date(s: &str) -> Result<Date, Violation> {
    if s.eq_ignore_ascii_case("today") {
        return Ok(today());
    }
    Date::parse(s, DATE_FORMAT)
        .map_err(|e| Violation::new("date", format!("'{}' is not yyyy-MM-dd: {}", s, e)))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkoutLog {
    pub sessions: f64,
    pub duration: f64,
    pub calories: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metric {
    pub current: f64,
    pub target: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionLog {
    pub calories: Metric,
    pub protein: Metric,
    pub carbs: Metric,
    pub fats: Metric,
    pub water: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyGoal {
    pub name: String,
    pub current: f64,
    pub target: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalsLog {
    pub goals: Vec<DailyGoal>,
}
