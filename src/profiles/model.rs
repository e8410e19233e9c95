use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::flows::schema::{Field, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    /// Kilograms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Centimeters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fitness_level: Option<FitnessLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<String>>,
}

/// Fields a client may write; `id` always comes from the token.
pub fn profile_shape() -> Shape {
    Shape::object(vec![
        Field::optional("email", Shape::String, ""),
        Field::optional("displayName", Shape::String, ""),
        Field::optional("age", Shape::Number, "Years."),
        Field::optional("gender", Shape::one_of(&["male", "female", "other"]), ""),
        Field::optional("weight", Shape::Number, "Kilograms."),
        Field::optional("height", Shape::Number, "Centimeters."),
        Field::optional(
            "fitnessLevel",
            Shape::one_of(&["beginner", "intermediate", "advanced"]),
            "",
        ),
        Field::optional("goals", Shape::array(Shape::String), ""),
    ])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingReply {
    pub welcome_message: String,
    pub initial_summary: String,
}
