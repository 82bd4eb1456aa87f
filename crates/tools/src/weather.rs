//! Weather tool — simulated conditions for a location.
//!
//! No network access: readings are derived from a hash of the location
//! name, so the same location always reports the same weather.

use async_trait::async_trait;
use reagent_core::error::ToolError;
use reagent_core::tool::Tool;
use serde::Serialize;
use serde_json::{Value, json};

const NAME: &str = "get_weather";

const CONDITIONS: [&str; 6] = [
    "Sunny",
    "Partly cloudy",
    "Cloudy",
    "Light rain",
    "Thunderstorms",
    "Foggy",
];

pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Get current weather information for a location (simulated)."
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City or place name"
                },
                "units": {
                    "type": "string",
                    "enum": ["metric", "imperial"],
                    "description": "Temperature units (default: metric)"
                }
            },
            "required": ["location"]
        }))
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let location = input["location"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ToolError::invalid(NAME, "missing 'location' argument"))?;
        let imperial = input["units"].as_str() == Some("imperial");

        serde_json::to_value(simulate(location, imperial))
            .map_err(|e| ToolError::execution(NAME, e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct Reading {
    location: String,
    condition: &'static str,
    temperature: i32,
    unit: &'static str,
    humidity: u32,
}

fn simulate(location: &str, imperial: bool) -> Reading {
    let hash = location
        .to_lowercase()
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));

    // 10 to 39 °C
    let celsius = 10 + (hash % 30) as i32;
    let (temperature, unit) = if imperial {
        (celsius * 9 / 5 + 32, "Fahrenheit")
    } else {
        (celsius, "Celsius")
    };

    Reading {
        location: location.to_string(),
        condition: CONDITIONS[(hash as usize / 7) % CONDITIONS.len()],
        temperature,
        unit,
        humidity: 30 + (hash / 11) % 60,
    }
}
