use axum::{extract::State, Json};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::auth::middleware::AuthenticatedUser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::extract::JsonBody;
use crate::llm::{AssistantMessage, ChatMessage, LlmClient, ToolChoice};
use crate::registries::{openai_tools, ToolName};
use crate::state::AppState;
use crate::tools::{chat, gear, knowledge, plan, rental, trail_analysis, wardrobe, weather};
use crate::trails::geo::LatLon;
use crate::trails::models::TrailData;
use crate::trails::repository;

#[derive(Debug, Deserialize)]
pub struct OrchestratorRequest {
    #[serde(default)]
    pub prompt: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub owned_items: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OrchestratorResponse {
    pub response: String,
    pub tool_used: String,
}

/// What a tool can fall back on when its arguments are incomplete.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub prompt: String,
    pub trail: Option<TrailData>,
    pub location: Option<LatLon>,
    pub owned_items: Vec<String>,
}

impl ToolContext {
    fn trail_summary(&self) -> Option<String> {
        self.trail.as_ref().map(TrailData::summary)
    }
}

#[derive(Debug, PartialEq)]
pub enum Decision {
    Call(ToolName, Value),
    Answer(String),
}

/// Ordered keyword table used when no model is available. A keyword matches
/// the start of a word; multi-word keywords match consecutive words.
const KEYWORD_ROUTES: &[(&[&str], ToolName)] = &[
    (&["rental", "rent", "shop"], ToolName::GearRental),
    (&["weather", "rain", "forecast"], ToolName::Weather),
    (&["plan", "schedule", "itinerary"], ToolName::HikingPlan),
    (&["have", "wardrobe", "closet", "own", "check my"], ToolName::WardrobeInventory),
    (&["analy", "difficult", "terrain", "how hard", "how long"], ToolName::TrailAnalysis),
    (&["gear", "bring", "pack", "recommend", "wear"], ToolName::GearRecommendation),
];

fn mentions(words: &[&str], keyword: &str) -> bool {
    let parts: Vec<&str> = keyword.split_whitespace().collect();
    let Some((last, leading)) = parts.split_last() else {
        return false;
    };
    words.windows(parts.len()).any(|window| {
        window[..leading.len()] == *leading && window[leading.len()].starts_with(*last)
    })
}

pub fn route_by_keywords(prompt: &str) -> ToolName {
    let prompt = prompt.to_lowercase();
    let words: Vec<&str> = prompt
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    KEYWORD_ROUTES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| mentions(&words, k)))
        .map(|(_, tool)| *tool)
        .unwrap_or(ToolName::Chat)
}

fn system_prompt(ctx: &ToolContext) -> String {
    let trail = match ctx.trail_summary() {
        Some(summary) => format!("The user's latest trail: {summary}."),
        None => "The user has not uploaded any trail data yet.".to_string(),
    };
    format!(
        "You are TrailMate, a hiking assistant. Pick the single best tool for the user's request \
and extract its arguments from the message. Leave out arguments you don't know; the app fills \
them from the user's trail. Use chat_tool for general questions. {trail}"
    )
}

pub fn decision_from_message(message: AssistantMessage) -> Decision {
    if let Some(call) = message
        .first_tool_call()
        .filter(|c| c.kind.is_empty() || c.kind == "function")
    {
        return match call.function.name.parse::<ToolName>() {
            Ok(tool) => {
                info!(tool_call_id = %call.id, tool = %tool, "Model selected tool");
                Decision::Call(tool, call.function.parsed_arguments())
            }
            Err(err) => {
                warn!(error = %err, "Model asked for an unknown tool, using chat");
                Decision::Call(ToolName::Chat, json!({}))
            }
        };
    }
    match message.content.filter(|c| !c.trim().is_empty()) {
        Some(content) => Decision::Answer(content),
        None => Decision::Call(ToolName::Chat, json!({})),
    }
}

pub async fn decide(http: &reqwest::Client, config: &Config, ctx: &ToolContext) -> Decision {
    let Some(llm) = LlmClient::from_config(http.clone(), config) else {
        return Decision::Call(route_by_keywords(&ctx.prompt), json!({}));
    };

    let messages = [
        ChatMessage::system(system_prompt(ctx)),
        ChatMessage::user(ctx.prompt.clone()),
    ];
    match llm.chat(&messages, &openai_tools(), Some(ToolChoice::Auto)).await {
        Ok(message) => decision_from_message(message),
        Err(err) => {
            warn!(error = %err, "Tool selection failed, routing by keywords");
            Decision::Call(route_by_keywords(&ctx.prompt), json!({}))
        }
    }
}

fn is_missing(args: &Map<String, Value>, key: &str) -> bool {
    match args.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn fill(args: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        if is_missing(args, key) {
            args.insert(key.to_string(), value);
        }
    }
}

fn fill_trail(args: &mut Map<String, Value>, ctx: &ToolContext) {
    let trail = ctx.trail.as_ref();
    fill(args, "distance_m", trail.map(|t| json!(t.distance_meters)));
    fill(args, "elevation_gain_m", trail.map(|t| json!(t.elevation_gain_meters)));
    fill(
        args,
        "trail_conditions",
        trail
            .map(|t| t.trail_conditions.clone())
            .filter(|c| !c.is_empty())
            .or_else(|| Some(knowledge::conditions_mentioned(&ctx.prompt)))
            .map(|c| json!(c)),
    );
}

fn fill_location(args: &mut Map<String, Value>, location: Option<LatLon>) {
    fill(args, "latitude", location.map(|p| json!(p.lat)));
    fill(args, "longitude", location.map(|p| json!(p.lon)));
}

/// Completes model-extracted arguments from the request and trail context.
pub fn fill_arguments(tool: ToolName, args: Value, ctx: &ToolContext) -> Value {
    let mut args = match args {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    match tool {
        ToolName::GearRecommendation | ToolName::TrailAnalysis | ToolName::HikingPlan => {
            fill_trail(&mut args, ctx)
        }
        ToolName::WardrobeInventory => {
            fill_trail(&mut args, ctx);
            let owned = if ctx.owned_items.is_empty() {
                wardrobe::owned_items_from_text(&ctx.prompt)
            } else {
                ctx.owned_items.clone()
            };
            fill(&mut args, "owned_items", Some(json!(owned)));
        }
        ToolName::Weather => fill_location(&mut args, ctx.location),
        ToolName::GearRental => fill_location(
            &mut args,
            ctx.location.or_else(|| ctx.trail.as_ref().and_then(TrailData::start)),
        ),
        ToolName::Chat => fill(&mut args, "message", Some(json!(ctx.prompt))),
    }
    Value::Object(args)
}

/// Typed arguments; a model that sent the wrong types gets the context-only
/// arguments instead.
fn typed_args<T: DeserializeOwned + Default>(tool: ToolName, args: Value, ctx: &ToolContext) -> T {
    match serde_json::from_value(fill_arguments(tool, args, ctx)) {
        Ok(typed) => typed,
        Err(err) => {
            warn!(tool = %tool, error = %err, "Invalid tool arguments, using context only");
            serde_json::from_value(fill_arguments(tool, json!({}), ctx)).unwrap_or_default()
        }
    }
}

pub async fn dispatch(
    http: &reqwest::Client,
    config: &Config,
    tool: ToolName,
    args: Value,
    ctx: &ToolContext,
) -> String {
    match tool {
        ToolName::GearRecommendation => {
            let args: gear::GearArgs = typed_args(tool, args, ctx);
            gear::recommend_gear(&args)
        }
        ToolName::WardrobeInventory => {
            let args: wardrobe::WardrobeArgs = typed_args(tool, args, ctx);
            wardrobe::check_wardrobe(&args)
        }
        ToolName::TrailAnalysis => {
            let args: trail_analysis::TrailAnalysisArgs = typed_args(tool, args, ctx);
            trail_analysis::analyze_trail(&args)
        }
        ToolName::HikingPlan => {
            let args: plan::PlanArgs = typed_args(tool, args, ctx);
            plan::hiking_plan(&args)
        }
        ToolName::Weather => {
            let args: weather::WeatherArgs = typed_args(tool, args, ctx);
            let points = weather::weather_points(args.location(), ctx.trail.as_ref());
            weather::weather_tool(http, config.openweather_api_key.as_deref(), &points).await
        }
        ToolName::GearRental => {
            let args: rental::RentalArgs = typed_args(tool, args, ctx);
            let point = args
                .latitude
                .zip(args.longitude)
                .map(|(lat, lon)| LatLon { lat, lon });
            rental::gear_rental_tool(
                http,
                config.google_places_api_key.as_deref(),
                point,
                args.radius(),
            )
            .await
        }
        ToolName::Chat => {
            let args: chat::ChatArgs = typed_args(tool, args, ctx);
            let summary = ctx.trail_summary();
            chat::chat_tool(config, &args.message, summary.as_deref()).await
        }
    }
}

pub async fn orchestrate(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    JsonBody(req): JsonBody<OrchestratorRequest>,
) -> AppResult<Json<OrchestratorResponse>> {
    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::bad_request("Prompt must not be empty"));
    }

    let trail = repository::latest_for_user(&state.pool, &user.id).await?;
    let ctx = ToolContext {
        prompt: prompt.to_string(),
        trail,
        location: req
            .latitude
            .zip(req.longitude)
            .map(|(lat, lon)| LatLon { lat, lon }),
        owned_items: req.owned_items,
    };

    let (response, tool) = match decide(&state.http, &state.config, &ctx).await {
        Decision::Answer(content) => (content, ToolName::Chat),
        Decision::Call(tool, args) => (
            dispatch(&state.http, &state.config, tool, args, &ctx).await,
            tool,
        ),
    };

    info!(user_id = %user.id, tool = %tool, "Orchestrator answered");
    Ok(Json(OrchestratorResponse {
        response,
        tool_used: tool.to_string(),
    }))
}
