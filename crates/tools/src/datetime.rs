//! Current date/time tool.
//!
//! Accepts an optional timezone given as `UTC` or a fixed offset
//! (`+02:00`, `-0530`, `UTC-3`). Named zones are not resolved.

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use reagent_core::error::ToolError;
use reagent_core::tool::Tool;
use serde_json::{Value, json};

const NAME: &str = "get_current_datetime";

pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Get the current date and time, optionally in a fixed UTC offset."
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "timezone": {
                    "type": "string",
                    "description": "'UTC' or an offset such as '+02:00' or 'UTC-3' (default: UTC)"
                }
            }
        }))
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let label = input
            .get("timezone")
            .and_then(Value::as_str)
            .unwrap_or("UTC");
        let offset = parse_offset(label).ok_or_else(|| {
            ToolError::invalid(NAME, format!("unsupported timezone '{label}'"))
        })?;

        let now = Utc::now().with_timezone(&offset);
        Ok(json!({
            "datetime": now.to_rfc3339(),
            "date": now.format("%Y-%m-%d").to_string(),
            "time": now.format("%H:%M:%S").to_string(),
            "timezone": label,
        }))
    }
}

/// Parse `UTC`, `Z`, `+HH:MM`, `-HHMM`, `+H`, optionally prefixed by `UTC`/`GMT`.
fn parse_offset(label: &str) -> Option<FixedOffset> {
    let trimmed = label.trim();
    let upper = trimmed.to_ascii_uppercase();
    let rest = upper
        .strip_prefix("UTC")
        .or_else(|| upper.strip_prefix("GMT"))
        .unwrap_or(&upper);

    if rest.is_empty() || rest == "Z" {
        return FixedOffset::east_opt(0);
    }

    let (sign, digits) = match rest.as_bytes().first()? {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => return None,
    };

    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes >= 60 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
