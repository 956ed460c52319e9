use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    GearRecommendation,
    WardrobeInventory,
    TrailAnalysis,
    Weather,
    HikingPlan,
    GearRental,
    Chat,
}

impl ToolName {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::GearRecommendation => "gear_recommendation_tool",
            ToolName::WardrobeInventory => "wardrobe_inventory_tool",
            ToolName::TrailAnalysis => "trail_analysis_tool",
            ToolName::Weather => "weather_tool",
            ToolName::HikingPlan => "hiking_plan_tool",
            ToolName::GearRental => "gear_rental_tool",
            ToolName::Chat => "chat_tool",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TOOL_REGISTRY
            .iter()
            .map(|t| t.name)
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("unknown tool: {s}"))
    }
}

pub struct Tool {
    pub name: ToolName,
    pub description: &'static str,
    pub parameters: Value,
}

impl Tool {
    /// The `tools[]` entry of a chat completions request.
    pub fn as_function(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name.as_str(),
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

fn trail_properties() -> serde_json::Map<String, Value> {
    let mut props = serde_json::Map::new();
    props.insert(
        "distance_m".into(),
        json!({ "type": "number", "description": "Trail length in meters" }),
    );
    props.insert(
        "elevation_gain_m".into(),
        json!({ "type": "number", "description": "Total ascent in meters" }),
    );
    props.insert(
        "trail_conditions".into(),
        json!({
            "type": "array",
            "items": { "type": "string" },
            "description": "Condition tags such as rocky, rainy, snowy, muddy, steep"
        }),
    );
    props
}

fn object(props: serde_json::Map<String, Value>, required: &[&str]) -> Value {
    json!({ "type": "object", "properties": props, "required": required })
}

/// Every tool the orchestrator can call. The same list feeds the model
/// request and the dispatcher.
pub static TOOL_REGISTRY: Lazy<Vec<Tool>> = Lazy::new(|| {
    vec![
        Tool {
            name: ToolName::GearRecommendation,
            description: "Recommend hiking gear for the user's trail based on conditions, distance, elevation gain and temperature.",
            parameters: {
                let mut props = trail_properties();
                props.insert(
                    "temperature_c".into(),
                    json!({ "type": "number", "description": "Expected air temperature in Celsius" }),
                );
                object(props, &[])
            },
        },
        Tool {
            name: ToolName::WardrobeInventory,
            description: "Compare the gear the user already owns with what their trail needs and report what is missing.",
            parameters: {
                let mut props = trail_properties();
                props.insert(
                    "owned_items".into(),
                    json!({
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Items the user says they already have"
                    }),
                );
                object(props, &["owned_items"])
            },
        },
        Tool {
            name: ToolName::TrailAnalysis,
            description: "Analyze trail difficulty and estimate hiking time.",
            parameters: object(trail_properties(), &[]),
        },
        Tool {
            name: ToolName::Weather,
            description: "Get current weather at a location or along the user's latest trail, with hiking advice.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "latitude": { "type": "number" },
                    "longitude": { "type": "number" }
                },
                "required": []
            }),
        },
        Tool {
            name: ToolName::HikingPlan,
            description: "Build a timed hiking schedule with breaks and water needs.",
            parameters: {
                let mut props = trail_properties();
                props.insert(
                    "start_time".into(),
                    json!({ "type": "string", "description": "Start time as HH:MM, default 08:00" }),
                );
                object(props, &[])
            },
        },
        Tool {
            name: ToolName::GearRental,
            description: "Find outdoor gear rental shops near a location.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "latitude": { "type": "number" },
                    "longitude": { "type": "number" },
                    "radius_m": { "type": "integer", "description": "Search radius in meters, default 10000, max 50000" }
                },
                "required": []
            }),
        },
        Tool {
            name: ToolName::Chat,
            description: "General hiking conversation when no other tool fits.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "message": { "type": "string", "description": "The user's message" }
                },
                "required": ["message"]
            }),
        },
    ]
});

pub fn openai_tools() -> Vec<Value> {
    TOOL_REGISTRY.iter().map(Tool::as_function).collect()
}
