use std::collections::BTreeMap;
use std::sync::Arc;

use super::schema::{Field, Shape};
use super::template::{Template, TemplateError};

/// One named AI-backed operation.
#[derive(Debug)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub input: Shape,
    /// `None` for flows that answer in free text.
    pub output: Option<Shape>,
    /// Overrides the configured default model.
    pub model: Option<&'static str>,
    pub instruction: Template,
}

#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<&'static str, Arc<PromptTemplate>>,
}

impl TemplateRegistry {
    pub fn get(&self, name: &str) -> Option<Arc<PromptTemplate>> {
        self.templates.get(name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PromptTemplate>> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    fn add(
        &mut self,
        name: &'static str,
        description: &'static str,
        input: Shape,
        output: Option<Shape>,
        model: Option<&'static str>,
        instruction: &str,
    ) -> Result<(), TemplateError> {
        let instruction = Template::parse(instruction).map_err(|e| {
            tracing::error!(template = name, error = %e, "prompt template does not parse");
            e
        })?;
        self.templates.insert(
            name,
            Arc::new(PromptTemplate {
                name,
                description,
                input,
                output,
                model,
                instruction,
            }),
        );
        Ok(())
    }

    /// Every flow the service offers. Fails if any instruction is malformed.
    pub fn builtin() -> Result<Self, TemplateError> {
        let mut r = Self::default();

        r.add(
            "analyze-meal",
            "Estimate calories and macros from a meal photo.",
            obj(vec![Field::required(
                "imageDataUri",
                Shape::DataUri,
                "Photo of the meal as a data URI.",
            )]),
            Some(obj(vec![
                Field::required("description", Shape::String, "Short description of the meal."),
                Field::required("calories", Shape::Number, "Estimated total kcal."),
                Field::required("protein", Shape::Number, "Estimated protein in grams."),
                Field::required("carbs", Shape::Number, "Estimated carbohydrates in grams."),
                Field::required("fats", Shape::Number, "Estimated fat in grams."),
            ])),
            None,
            ANALYZE_MEAL,
        )?;

        r.add(
            "calculate-journey",
            "Estimate distance and step count between two places.",
            obj(vec![
                Field::required("startLocation", Shape::String, "Where the journey starts."),
                Field::required("endLocation", Shape::String, "Where the journey ends."),
            ]),
            Some(obj(vec![
                Field::required("distance", Shape::Number, "Distance in kilometers."),
                Field::required("steps", Shape::Number, "Estimated number of steps."),
            ])),
            Some("gemini-2.5-flash"),
            CALCULATE_JOURNEY,
        )?;

        r.add(
            "daily-goals",
            "Suggest two to four daily goals.",
            obj(vec![]),
            Some(obj(vec![Field::required(
                "goals",
                Shape::array(daily_goal_shape()),
                "Two to four daily goals.",
            )])),
            None,
            DAILY_GOALS,
        )?;

        r.add(
            "workout-plan",
            "Build a personalized workout plan.",
            obj(vec![
                Field::required("fitnessGoals", Shape::String, "What the user wants to achieve."),
                Field::required("experienceLevel", fitness_level(), "Training experience."),
                Field::required(
                    "availableEquipment",
                    Shape::String,
                    "Comma separated equipment list, or 'none'.",
                ),
            ]),
            Some(obj(vec![Field::required(
                "workoutPlan",
                Shape::String,
                "Markdown workout plan with exercises, sets and reps.",
            )])),
            Some("gemini-2.5-pro"),
            WORKOUT_PLAN,
        )?;

        r.add(
            "recent-workouts",
            "Produce three plausible recent workout sessions.",
            obj(vec![]),
            Some(obj(vec![Field::required(
                "workouts",
                Shape::array(obj(vec![
                    Field::required("date", Shape::String, "yyyy-MM-dd"),
                    Field::required("type", Shape::String, "Kind of workout."),
                    Field::required("duration", Shape::String, "Human readable duration."),
                ])),
                "Three recent sessions.",
            )])),
            None,
            RECENT_WORKOUTS,
        )?;

        r.add(
            "weekly-report",
            "Title and summary for the last seven days of activity.",
            obj(vec![Field::required(
                "weeklyActivity",
                Shape::array(obj(vec![
                    Field::required("day", Shape::String, ""),
                    Field::required("workouts", Shape::Number, "Sessions that day."),
                    Field::required("duration", Shape::Number, "Minutes trained that day."),
                ])),
                "Activity for each of the last seven days.",
            )]),
            Some(obj(vec![
                Field::required("title", Shape::String, "Short upbeat title."),
                Field::required("summary", Shape::String, "Two to three sentence summary."),
            ])),
            None,
            WEEKLY_REPORT,
        )?;

        r.add(
            "form-feedback",
            "Coach exercise form from a video.",
            obj(vec![
                Field::required("videoDataUri", Shape::DataUri, "Exercise video as a data URI."),
                Field::required("exerciseName", Shape::String, "Exercise being performed."),
            ]),
            Some(obj(vec![Field::required(
                "feedback",
                Shape::String,
                "Form feedback and suggestions.",
            )])),
            Some("gemini-2.5-flash-lite"),
            FORM_FEEDBACK,
        )?;

        r.add(
            "physique-assessment",
            "Qualitative physique assessment from front and side photos.",
            obj(vec![
                Field::required("frontPhotoDataUri", Shape::DataUri, "Front view photo."),
                Field::required("sidePhotoDataUri", Shape::DataUri, "Side view photo."),
            ]),
            Some(obj(vec![Field::required(
                "assessment",
                Shape::String,
                "Markdown assessment grouped by body region.",
            )])),
            None,
            PHYSIQUE_ASSESSMENT,
        )?;

        r.add(
            "post-workout-nutrition",
            "One nutrition tip for the workout just completed.",
            obj(vec![Field::required(
                "workoutType",
                Shape::String,
                "Type of the workout just finished.",
            )]),
            Some(obj(vec![Field::required("advice", Shape::String, "A single actionable tip.")])),
            None,
            POST_WORKOUT_NUTRITION,
        )?;

        r.add(
            "predict-progress",
            "Forecast the next one to two months from monthly history.",
            obj(vec![
                Field::required(
                    "history",
                    Shape::array(obj(vec![
                        Field::required("month", Shape::String, ""),
                        Field::required("weight", Shape::Number, ""),
                        Field::required("squat", Shape::Number, ""),
                        Field::required("calories", Shape::Number, ""),
                        Field::required("workouts", Shape::Number, ""),
                    ])),
                    "Monthly progression data.",
                ),
                Field::required("goals", Shape::array(Shape::String), "The user's goals."),
            ]),
            Some(obj(vec![Field::required(
                "prediction",
                Shape::String,
                "One or two sentence forecast.",
            )])),
            Some("gemini-2.5-flash"),
            PREDICT_PROGRESS,
        )?;

        r.add(
            "onboarding",
            "Welcome message and first summary for a new user.",
            onboarding_shape(),
            Some(obj(vec![
                Field::required("welcomeMessage", Shape::String, "Personal welcome."),
                Field::required("initialSummary", Shape::String, "Profile summary and next step."),
            ])),
            None,
            ONBOARDING,
        )?;

        r.add(
            "transcribe",
            "Transcribe a voice recording.",
            obj(vec![Field::required("audioDataUri", Shape::DataUri, "Recording as a data URI.")]),
            None,
            None,
            TRANSCRIBE,
        )?;

        r.add(
            "coach",
            "Short spoken-style answer from the AI coach.",
            obj(vec![Field::required("query", Shape::String, "The user's question.")]),
            None,
            None,
            COACH,
        )?;

        r.add(
            "mood-analysis",
            "Mood and one-line summary of a journal entry.",
            obj(vec![Field::required("transcription", Shape::String, "Journal text.")]),
            Some(obj(vec![
                Field::required("mood", Shape::one_of(MOODS), "Overall mood."),
                Field::required("summary", Shape::String, "One sentence summary."),
            ])),
            None,
            MOOD_ANALYSIS,
        )?;

        r.add(
            "nutrition-advice-supplements",
            "Overview of common supplements.",
            obj(vec![]),
            None,
            None,
            ADVICE_SUPPLEMENTS,
        )?;

        r.add(
            "nutrition-advice-recipe",
            "Healthy recipe from the ingredients at hand.",
            obj(vec![Field::optional("ingredients", Shape::String, "Comma separated ingredients.")]),
            None,
            None,
            ADVICE_RECIPE,
        )?;

        r.add(
            "nutrition-advice-meal-prep",
            "Shopping list for a simple meal plan.",
            obj(vec![Field::optional("mealPlan", Shape::String, "The meal plan.")]),
            None,
            None,
            ADVICE_MEAL_PREP,
        )?;

        r.add(
            "nutrition-insight",
            "One concise nutrition tip following an instruction.",
            obj(vec![Field::required("instruction", Shape::String, "What kind of tip to give.")]),
            None,
            None,
            NUTRITION_INSIGHT,
        )?;

        Ok(r)
    }
}

pub const MOODS: &[&str] = &["Positive", "Negative", "Neutral"];

fn obj(fields: Vec<Field>) -> Shape {
    Shape::object(fields)
}

fn fitness_level() -> Shape {
    Shape::one_of(&["beginner", "intermediate", "advanced"])
}

pub fn daily_goal_shape() -> Shape {
    obj(vec![
        Field::required("name", Shape::String, "Goal name, e.g. 'Walk 10,000 steps'."),
        Field::required("current", Shape::Number, "Progress so far; starts at 0."),
        Field::required("target", Shape::Number, "Target value."),
        Field::required("unit", Shape::String, "Unit such as steps or minutes."),
    ])
}

pub fn onboarding_shape() -> Shape {
    obj(vec![
        Field::required("age", Shape::Number, "Age in years."),
        Field::required("gender", Shape::one_of(&["male", "female", "other"]), ""),
        Field::required("weight", Shape::Number, "Weight in kilograms."),
        Field::required("height", Shape::Number, "Height in centimeters."),
        Field::required("fitnessLevel", fitness_level(), "Self-assessed level."),
        Field::required("goals", Shape::array(Shape::String), "Fitness goals."),
    ])
}

const ANALYZE_MEAL: &str = r#"You are a nutritionist looking at a photo of a meal.
Identify the foods on the plate and estimate the nutrition of the whole meal:
a one-line description, total calories, and grams of protein, carbohydrates and fat.

Meal photo:
{{media url=imageDataUri}}
"#;

const CALCULATE_JOURNEY: &str = r#"You estimate walking distances.
Estimate the distance in kilometers between the two places below and the number of
steps it takes to walk it, assuming 1,300 to 1,500 steps per kilometer.
Keep the estimate realistic for the scale of the trip.

Start: {{{startLocation}}}
End: {{{endLocation}}}
"#;

const DAILY_GOALS: &str = r#"You are an upbeat fitness coach.
Suggest 2 to 4 varied goals for today mixing activity, mindfulness and nutrition,
for example walking 10,000 steps, meditating for 5 minutes or drinking 8 glasses of water.
Give each goal a name, a numeric target and a unit. Every goal starts with current set to 0.
Make the set different from a generic list.
"#;

const WORKOUT_PLAN: &str = r#"You are a personal trainer. Write a workout plan that fits the user's goals,
experience and equipment. Name concrete exercises with sets and reps, cover different
muscle groups, and format the plan in Markdown.

Fitness goals: {{{fitnessGoals}}}
Experience level: {{{experienceLevel}}}
Available equipment: {{{availableEquipment}}}
"#;

const RECENT_WORKOUTS: &str = r#"Produce three realistic recent workout sessions for a consistent trainee.
Vary the type (strength, cardio, mobility), use recent consecutive dates formatted
as YYYY-MM-DD, and give a realistic duration for each, such as "45 min".
"#;

const WEEKLY_REPORT: &str = r#"You are an encouraging fitness coach reviewing the past week.
Write a short motivating title and a 2-3 sentence summary that mentions how many days
the user trained and their total training time, then ends with a tip for next week.
Separate paragraphs with newlines.

Activity by day:
{{#each weeklyActivity}}- {{day}}: {{workouts}} workout(s), {{duration}} minutes
{{/each}}"#;

const FORM_FEEDBACK: &str = r#"You are a personal trainer reviewing a video of the exercise "{{{exerciseName}}}".
Point out what the user does well, what to fix, and how to fix it.

{{media url=videoDataUri}}
"#;

const PHYSIQUE_ASSESSMENT: &str = r#"You are a fitness coach giving a qualitative read of a physique from two photos.
Rules:
1. No numbers of any kind: no body fat, weight, measurements or ratios.
2. Stay positive and non-judgmental; describe what is visible and where to develop.
3. No medical advice.
4. Use Markdown headings per region (Upper Body, Core, Lower Body, Posture).
5. Limit yourself to 2-3 key observations.

Front view: {{media url=frontPhotoDataUri}}
Side view: {{media url=sidePhotoDataUri}}
"#;

const POST_WORKOUT_NUTRITION: &str = r#"You are a sports nutritionist. The user just finished: {{{workoutType}}}.
Give one concise, actionable nutrition tip. Lean toward protein for strength or power
sessions and toward carbohydrates for cardio or endurance sessions.
"#;

const PREDICT_PROGRESS: &str = r#"You are a data-minded, encouraging fitness coach.
The user's goals are: {{#each goals separator=", "}}{{{this}}}{{/each}}.
Look at the monthly history below and give a short, realistic prediction for the next
1-2 months, focused on the metric that matches their main goal (weight for weight loss,
squat for muscle gain).

History:
{{#each history}}- {{month}}: weight {{weight}}kg, squat {{squat}}kg, avg calories {{calories}}, workouts {{workouts}}
{{/each}}"#;

const ONBOARDING: &str = r#"You are an encouraging fitness coach greeting a new user who just finished onboarding.

Profile:
- Age: {{age}}
- Gender: {{gender}}
- Weight: {{weight}} kg
- Height: {{height}} cm
- Fitness level: {{fitnessLevel}}
- Goals: {{#each goals}}{{{this}}}{{#unless @last}}, {{/unless}}{{/each}}

Write an enthusiastic welcome message, and a short summary acknowledging their goals and
level that says a personalized plan is on its way.
"#;

const TRANSCRIBE: &str = "Transcribe the following audio.\n{{media url=audioDataUri}}";

const COACH: &str = r#"You are Fitness Compass, a friendly and knowledgeable fitness coach.
Answer in 2-3 sentences. You have no access to the user's data or workouts; if asked about
today's workout, suggest a kind of session rather than specific exercises. Do not ask
follow-up questions.

Question: "{{{query}}}""#;

const MOOD_ANALYSIS: &str = r#"Classify the overall mood of this journal entry as Positive, Negative or Neutral,
and summarize it in one sentence.

Entry:
"{{{transcription}}}""#;

const ADVICE_SUPPLEMENTS: &str = r#"You are a careful nutrition advisor. Give a short Markdown overview of common
supplements used for general fitness. Say clearly that this is not medical advice and
that a healthcare professional should be consulted first."#;

const ADVICE_RECIPE: &str = r#"You are a chef. Write a simple, healthy recipe in Markdown (title, ingredient list,
numbered steps) using these ingredients: {{{ingredients}}}
{{#unless ingredients}}No ingredients were listed; suggest a basic pantry recipe.
{{/unless}}If they are not enough for a full meal, say so and suggest what to add."#;

const ADVICE_MEAL_PREP: &str = r#"You are a meal prep assistant. Turn this meal plan into a Markdown shopping list
grouped by category, combining quantities of the same item.

Meal plan:
{{{mealPlan}}}"#;

const NUTRITION_INSIGHT: &str = r#"You are a friendly and knowledgeable AI nutrition coach. A user wants a quick
insight. Generate a single, concise, and actionable tip based on the following instruction:
{{{instruction}}}"#;
