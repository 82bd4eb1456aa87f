//! Built-in tool implementations for reagent.
//!
//! Small, dependency-free tools for demonstrating and testing the ReAct
//! loop: arithmetic, the current date/time, and simulated weather.

pub mod calculator;
pub mod datetime;
pub mod weather;

use std::sync::Arc;

use reagent_core::tool::ToolRegistry;

pub use calculator::CalculatorTool;
pub use datetime::DateTimeTool;
pub use weather::WeatherTool;

/// Create a tool registry with all built-in tools.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in [
        Arc::new(CalculatorTool) as Arc<dyn reagent_core::Tool>,
        Arc::new(DateTimeTool),
        Arc::new(WeatherTool),
    ] {
        let name = tool.name().to_string();
        if let Err(e) = registry.register(tool) {
            tracing::warn!(tool = %name, error = %e, "Skipping built-in tool");
        }
    }
    registry
}
