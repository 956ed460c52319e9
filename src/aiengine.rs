//! Older suggestion endpoints kept for existing clients.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::middleware::AuthenticatedUser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::extract::JsonBody;
use crate::llm::{ChatMessage, LlmClient, ToolChoice};
use crate::state::AppState;
use crate::tools::{chat, knowledge};
use crate::trails::models::TrailData;
use crate::trails::repository;

const RECOMMEND_GEAR_FN: &str = "recommend_gear";
const MAX_FALLBACK_GEAR: usize = 5;

const DEFAULT_GEAR: &[&str] = &[
    "Hiking boots",
    "Water bottle",
    "First aid kit",
    "Weather-appropriate clothing",
    "Navigation tools",
];

const DEFAULT_TIPS: &[&str] = &[
    "Check weather conditions before starting",
    "Bring enough water and snacks",
    "Tell someone your hiking plans",
    "Stay on marked trails",
    "Pack out all trash",
];

const TIPS_PREAMBLE: &str = "You are an experienced hiking guide. Reply with exactly five short, \
practical tips as a bulleted list, one per line, and nothing else.";

#[derive(Debug, Deserialize)]
pub struct GearRequest {
    #[serde(default)]
    pub weather: String,
    #[serde(default)]
    pub trail_condition: String,
}

#[derive(Debug, Serialize)]
pub struct GearResponse {
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub gear: Vec<String>,
    pub hike: Vec<String>,
}

pub fn simple_recommendations(req: &GearRequest) -> Vec<String> {
    let mut recommendations = Vec::new();
    if req.weather.trim().eq_ignore_ascii_case("rainy") {
        recommendations.push("Rain Jacket".to_string());
    }
    if req.trail_condition.trim().eq_ignore_ascii_case("rocky") {
        recommendations.push("Hiking Boots".to_string());
    }
    recommendations
}

pub async fn recommend_gear(JsonBody(req): JsonBody<GearRequest>) -> Json<GearResponse> {
    Json(GearResponse {
        recommendations: simple_recommendations(&req),
    })
}

/// Knowledge-base gear, trimmed for display, or the generic essentials.
pub fn fallback_gear(kb_gear: &[String]) -> Vec<String> {
    if kb_gear.is_empty() {
        DEFAULT_GEAR.iter().map(|s| s.to_string()).collect()
    } else {
        kb_gear.iter().take(MAX_FALLBACK_GEAR).cloned().collect()
    }
}

pub fn default_tips() -> Vec<String> {
    DEFAULT_TIPS.iter().map(|s| s.to_string()).collect()
}

/// One tip per non-empty line, bullets and dashes stripped.
pub fn parse_tips(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim_start_matches(['-', '•', '*', ' ', '\t']).trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn recommend_gear_schema() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": RECOMMEND_GEAR_FN,
            "description": "Return the list of gear the hiker should bring.",
            "parameters": {
                "type": "object",
                "properties": {
                    "gear": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Gear items, most important first"
                    }
                },
                "required": ["gear"]
            }
        }
    })
}

fn gear_from_arguments(arguments: &Value) -> Vec<String> {
    arguments
        .get("gear")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

async fn llm_gear(llm: &LlmClient, trail: &TrailData, kb_gear: &[String]) -> Option<Vec<String>> {
    let context = if kb_gear.is_empty() {
        "No specific gear found in the knowledge base.".to_string()
    } else {
        format!("Knowledge base suggests: {}.", kb_gear.join(", "))
    };
    let messages = [
        ChatMessage::system("You are a hiking gear expert. Recommend gear for the described trail."),
        ChatMessage::user(format!("{}\n{context}", trail.summary())),
    ];
    let tools = [recommend_gear_schema()];

    match llm
        .chat(&messages, &tools, Some(ToolChoice::Function(RECOMMEND_GEAR_FN)))
        .await
    {
        Ok(message) => {
            let gear = message
                .first_tool_call()
                .map(|call| gear_from_arguments(&call.function.parsed_arguments()))
                .unwrap_or_default();
            (!gear.is_empty()).then_some(gear)
        }
        Err(err) => {
            warn!(error = %err, "Gear suggestion call failed");
            None
        }
    }
}

async fn llm_tips(config: &Config, trail: &TrailData) -> Option<Vec<String>> {
    let prompt = format!("Give hiking tips for this trail. {}", trail.summary());
    let tips = parse_tips(&chat::complete(config, TIPS_PREAMBLE, &prompt).await?);
    (!tips.is_empty()).then_some(tips)
}

pub async fn gear_and_hike_suggest(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<SuggestionResponse>> {
    let trail = repository::latest_for_user(&state.pool, &user.id)
        .await?
        .ok_or_else(|| AppError::not_found("No trail data found"))?;

    let kb_gear = knowledge::retrieve_gear(
        &trail.trail_conditions,
        trail.elevation_gain_meters,
        trail.distance_meters,
    );

    let (gear, hike) = match LlmClient::from_config(state.http.clone(), &state.config) {
        Some(llm) => {
            let gear = match llm_gear(&llm, &trail, &kb_gear).await {
                Some(gear) => gear,
                None if kb_gear.is_empty() => fallback_gear(&kb_gear),
                None => kb_gear,
            };
            let hike = llm_tips(&state.config, &trail)
                .await
                .unwrap_or_else(default_tips);
            (gear, hike)
        }
        None => (fallback_gear(&kb_gear), default_tips()),
    };

    info!(user_id = %user.id, trail_id = trail.id, gear = gear.len(), "Suggestions generated");
    Ok(Json(SuggestionResponse { gear, hike }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(weather: &str, trail_condition: &str) -> GearRequest {
        GearRequest {
            weather: weather.into(),
            trail_condition: trail_condition.into(),
        }
    }

    #[test]
    fn simple_rules() {
        assert_eq!(
            simple_recommendations(&request("rainy", "rocky")),
            vec!["Rain Jacket", "Hiking Boots"]
        );
        assert_eq!(simple_recommendations(&request("Rainy", "")), vec!["Rain Jacket"]);
        assert!(simple_recommendations(&request("sunny", "flat")).is_empty());
    }

    #[test]
    fn simple_rules_need_the_exact_word() {
        assert!(simple_recommendations(&request("not rainy", "")).is_empty());
        assert!(simple_recommendations(&request("rain", "rocks")).is_empty());
        assert_eq!(
            simple_recommendations(&request("RAINY", " Rocky ")),
            vec!["Rain Jacket", "Hiking Boots"]
        );
    }

    #[test]
    fn fallback_gear_trims_or_defaults() {
        let kb: Vec<String> = (1..=7).map(|i| format!("item {i}")).collect();
        assert_eq!(fallback_gear(&kb).len(), 5);
        assert_eq!(fallback_gear(&kb)[0], "item 1");
        assert_eq!(fallback_gear(&[])[0], "Hiking boots");
        assert_eq!(fallback_gear(&[]).len(), 5);
    }

    #[test]
    fn tips_are_cleaned() {
        let text = "- Start early\n\n• Bring a map\n  * Tell a friend  \n   \nKeep hydrated";
        assert_eq!(
            parse_tips(text),
            vec!["Start early", "Bring a map", "Tell a friend", "Keep hydrated"]
        );
    }

    #[test]
    fn gear_arguments_are_read() {
        let args = json!({"gear": ["Rain Jacket", " ", 3, "Poles"]});
        assert_eq!(gear_from_arguments(&args), vec!["Rain Jacket", "Poles"]);
        assert!(gear_from_arguments(&json!({})).is_empty());
    }

    #[test]
    fn default_tips_are_five() {
        assert_eq!(default_tips().len(), 5);
        assert_eq!(default_tips()[0], "Check weather conditions before starting");
    }
}
