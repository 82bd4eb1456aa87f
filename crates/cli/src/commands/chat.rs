//! `reagent chat` — one-shot or interactive conversation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use reagent_agent::{AgentProfile, ChatAgent, RunConfig};
use reagent_config::{AgentMode, AppConfig, MemoryStrategy};
use reagent_core::event::{DomainEvent, EventBus};
use reagent_memory::MemoryManager;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

pub async fn run(
    message: Option<String>,
    mode: Option<AgentMode>,
    config_path: Option<PathBuf>,
    verbose: bool,
) -> anyhow::Result<()> {
    let config = super::load_config(config_path.as_deref())?;

    let provider = reagent_providers::build_from_config(&config).with_context(|| {
        format!(
            "Provider '{}' is not usable. Set REAGENT_API_KEY (or OPENAI_API_KEY / ANTHROPIC_API_KEY), \
             or add api_key to {}",
            config.default_provider,
            AppConfig::config_dir().join("config.toml").display()
        )
    })?;

    let mut run_config = RunConfig::from_app_config(&config);
    if let Some(mode) = mode {
        run_config = run_config.with_mode(mode);
    }

    let event_bus = Arc::new(EventBus::default());
    if verbose {
        spawn_event_logger(&event_bus);
    }

    let tools = Arc::new(reagent_tools::default_registry());
    let mut agent = ChatAgent::new(
        provider,
        AgentProfile::from_config(&config.agent),
        tools,
        build_memory(&config),
    )
    .with_event_bus(event_bus);

    if let Some(message) = message {
        eprint!("  Thinking...");
        let response = agent.send_message(&message, &run_config).await;
        eprint!("\r              \r");
        println!("{}", response?);
        return Ok(());
    }

    let mode_name = match run_config.mode {
        AgentMode::Chat => "chat",
        AgentMode::React => "react",
        AgentMode::Auto => "auto",
    };
    let tool_names = agent.tools().names().join(", ");
    println!();
    println!("  reagent — interactive mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", run_config.model);
    println!("  Mode:      {mode_name}");
    println!("  Tools:     {tool_names}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or 'quit' to leave, 'reset' to start over.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"  You > ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "exit" | "quit" => break,
            "reset" => {
                agent.reset();
                println!("  (conversation cleared)");
                println!();
                continue;
            }
            _ => {}
        }

        eprint!("  ...");
        let result = agent.send_message(input, &run_config).await;
        eprint!("\r     \r");
        match result {
            Ok(response) => {
                println!();
                for line in response.lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn build_memory(config: &AppConfig) -> MemoryManager {
    match config.memory.strategy {
        MemoryStrategy::Dynamic => MemoryManager::dynamic(config.memory.max_tokens),
        MemoryStrategy::Fixed => MemoryManager::fixed(config.memory.window_size),
    }
}

/// Log loop events at debug level for `--verbose`.
fn spawn_event_logger(event_bus: &EventBus) {
    tokio::spawn(log_events(event_bus.subscribe()));
}

/// Log events until the bus closes. Returns how many were logged.
async fn log_events(mut rx: broadcast::Receiver<Arc<DomainEvent>>) -> usize {
    let mut logged = 0;
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "event logger fell behind");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        match event.as_ref() {
            DomainEvent::ToolExecuted {
                tool_name,
                success,
                duration_ms,
                ..
            } => debug!(tool = %tool_name, success, duration_ms, "tool executed"),
            DomainEvent::FormatCorrected { missing, .. } => {
                debug!(missing = ?missing, "format corrected")
            }
            DomainEvent::LoopDetected {
                action_name,
                terminal,
                ..
            } => debug!(action = %action_name, terminal, "loop detected"),
            DomainEvent::RunFinished {
                success, iterations, ..
            } => debug!(success, iterations, "run finished"),
            DomainEvent::RunStarted { task_id, .. } => debug!(task_id = %task_id, "run started"),
            DomainEvent::ErrorOccurred { error_message, .. } => {
                debug!(error = %error_message, "run error")
            }
        }
        logged += 1;
    }
    logged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn started(n: usize) -> DomainEvent {
        DomainEvent::RunStarted {
            task_id: format!("task-{n}"),
            task: "t".into(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn event_logger_survives_lag() {
        let bus = EventBus::new(1);
        let rx = bus.subscribe();
        for n in 0..3 {
            bus.publish(started(n));
        }
        drop(bus);
        assert_eq!(log_events(rx).await, 1);
    }

    #[tokio::test]
    async fn event_logger_stops_when_bus_closes() {
        let bus = EventBus::default();
        let rx = bus.subscribe();
        bus.publish(started(0));
        bus.publish(started(1));
        drop(bus);
        assert_eq!(log_events(rx).await, 2);
    }
}
