//! ChatAgent — the conversational front door.
//!
//! Owns the conversation memory and answers each message either with a
//! single model call (`chat` mode) or by running the ReAct loop (`react`
//! mode). The mode comes from the [`RunConfig`] passed with each message;
//! `auto` asks the [`ToolIntentDetector`] to choose per message.

use std::sync::Arc;

use reagent_config::{AgentConfig, AgentMode};
use reagent_core::error::Result;
use reagent_core::event::EventBus;
use reagent_core::message::{Message, Role};
use reagent_core::provider::{Provider, ProviderRequest};
use reagent_core::tool::ToolRegistry;
use reagent_memory::{ContextVariables, MemoryManager};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::intent::ToolIntentDetector;
use crate::react::{AdaptiveLoop, ResponseGrammar, RunState, TextProtocolGrammar};
use crate::run_config::RunConfig;

/// Prefix of the context variables holding archived ReAct runs.
pub const RUN_ARCHIVE_PREFIX: &str = "react_run_";

/// Who the agent is.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    pub name: String,
    /// Standing system instructions; empty means none.
    pub instructions: String,
}

impl AgentProfile {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(&config.name, &config.instructions)
    }
}

pub struct ChatAgent {
    provider: Arc<dyn Provider>,
    profile: AgentProfile,
    tools: Arc<ToolRegistry>,
    memory: MemoryManager,
    grammar: Arc<dyn ResponseGrammar>,
    event_bus: Arc<EventBus>,
    intent: ToolIntentDetector,
    last_run: Option<String>,
}

impl ChatAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        profile: AgentProfile,
        tools: Arc<ToolRegistry>,
        memory: MemoryManager,
    ) -> Self {
        let mut agent = Self {
            provider,
            profile,
            tools,
            memory,
            grammar: Arc::new(TextProtocolGrammar),
            event_bus: Arc::new(EventBus::default()),
            intent: ToolIntentDetector::new(),
            last_run: None,
        };
        agent.pin_instructions();
        agent
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn with_grammar(mut self, grammar: Arc<dyn ResponseGrammar>) -> Self {
        self.grammar = grammar;
        self
    }

    /// Answer one user message.
    ///
    /// The user turn is recorded before the model is called; the reply is
    /// recorded only when one is produced.
    pub async fn send_message(&mut self, text: &str, config: &RunConfig) -> Result<String> {
        let user = Message::user(text);
        let user_id = user.id.clone();
        if self.memory.messages().iter().any(|m| m.role == Role::User) {
            self.memory.add_message(user);
        } else {
            self.memory.add_pinned(user);
        }

        let reply = match self.resolve_mode(text, config) {
            AgentMode::Chat => self.chat(config).await?,
            AgentMode::React | AgentMode::Auto => self.react(text, &user_id, config).await?,
        };

        self.memory.add_message(Message::assistant(reply.as_str()));
        Ok(reply)
    }

    /// The mode `text` will be answered in: `chat` or `react`.
    pub fn resolve_mode(&self, text: &str, config: &RunConfig) -> AgentMode {
        match config.mode {
            AgentMode::Auto => {
                let assessment = self.intent.assess(text, &self.tools.definitions());
                let mode = if assessment.wants_tools() {
                    AgentMode::React
                } else {
                    AgentMode::Chat
                };
                debug!(
                    mode = ?mode,
                    relevance = assessment.relevance,
                    complexity = assessment.complexity,
                    "Auto mode routed message"
                );
                mode
            }
            mode => mode,
        }
    }

    async fn chat(&self, config: &RunConfig) -> Result<String> {
        debug!(agent = %self.profile.name, turns = self.memory.messages().len(), "Direct chat call");
        let response = self
            .provider
            .complete(ProviderRequest {
                model: config.model.clone(),
                messages: self.memory.messages().to_vec(),
                options: config.options.clone(),
            })
            .await?;
        Ok(response.content)
    }

    async fn react(&mut self, task: &str, user_id: &str, config: &RunConfig) -> Result<String> {
        let history: Vec<Message> = self
            .memory
            .messages()
            .iter()
            .filter(|m| m.id != user_id)
            .cloned()
            .collect();

        let controller = AdaptiveLoop::new(Arc::clone(&self.provider), Arc::clone(&self.tools))
            .with_grammar(Arc::clone(&self.grammar))
            .with_event_bus(Arc::clone(&self.event_bus));

        let mut state = RunState::new(task);
        let result = controller.run(&mut state, &history, config).await;
        self.archive(&state);
        result
    }

    /// Store a finished run as the `react_run_<task_id>` context variable.
    fn archive(&mut self, state: &RunState) {
        let key = format!("{RUN_ARCHIVE_PREFIX}{}", state.task_id);
        match serde_json::to_value(state) {
            Ok(value) => {
                info!(key = %key, status = ?state.status, steps = state.steps.len(), "Archived ReAct run");
                self.memory.set_variable(key.clone(), value);
                self.last_run = Some(key);
            }
            Err(e) => warn!(task_id = %state.task_id, error = %e, "Failed to archive ReAct run"),
        }
    }

    /// The archive of the most recent ReAct run.
    pub fn last_run(&self) -> Option<&Value> {
        self.last_run.as_deref().and_then(|key| self.memory.variable(key))
    }

    pub fn history(&self) -> &[Message] {
        self.memory.messages()
    }

    /// Forget the conversation and variables, keeping the instructions.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.last_run = None;
        self.pin_instructions();
    }

    fn pin_instructions(&mut self) {
        if !self.profile.instructions.trim().is_empty() {
            self.memory
                .add_pinned(Message::system(self.profile.instructions.as_str()));
        }
    }

    pub fn set_variable(&mut self, key: impl Into<String>, value: Value) {
        self.memory.set_variable(key, value);
    }

    pub fn variable(&self, key: &str) -> Option<&Value> {
        self.memory.variable(key)
    }

    pub fn variables(&self) -> &ContextVariables {
        self.memory.variables()
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{EchoTool, ScriptedProvider, SearchTool};
    use reagent_core::error::ErrorKind;
    use serde_json::json;

    fn agent(provider: &Arc<ScriptedProvider>) -> ChatAgent {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        ChatAgent::new(
            provider.clone(),
            AgentProfile::new("tester", "You are a test assistant."),
            Arc::new(registry),
            MemoryManager::fixed(10),
        )
    }

    fn chat() -> RunConfig {
        RunConfig::new("test-model").with_mode(AgentMode::Chat)
    }

    fn react() -> RunConfig {
        RunConfig::new("test-model")
    }

    #[tokio::test]
    async fn chat_mode_makes_one_call_with_history() {
        let provider = Arc::new(ScriptedProvider::new(["Hello!", "Still here."]));
        let mut agent = agent(&provider);

        assert_eq!(agent.send_message("Hi", &chat()).await.unwrap(), "Hello!");
        assert_eq!(agent.send_message("Again", &chat()).await.unwrap(), "Still here.");

        assert_eq!(provider.call_count(), 2);
        let request = &provider.requests()[1];
        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(agent.history().len(), 5);
        assert!(agent.last_run().is_none());
    }

    #[tokio::test]
    async fn instructions_and_first_user_turn_are_pinned() {
        let provider = Arc::new(ScriptedProvider::repeating("ok"));
        let mut agent = ChatAgent::new(
            provider.clone(),
            AgentProfile::new("tester", "Be helpful."),
            Arc::new(ToolRegistry::new()),
            MemoryManager::fixed(2),
        );
        for text in ["first", "second", "third"] {
            agent.send_message(text, &chat()).await.unwrap();
        }
        let contents: Vec<&str> = agent.history().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Be helpful.", "first", "third", "ok"]);
    }

    #[tokio::test]
    async fn auto_mode_routes_each_message() {
        let provider = Arc::new(ScriptedProvider::new([
            "Hi! How can I help?",
            "Thought: I know this\nFinal Answer: nothing found",
        ]));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SearchTool)).unwrap();
        let mut agent = ChatAgent::new(
            provider.clone(),
            AgentProfile::new("tester", "You are a test assistant."),
            Arc::new(registry),
            MemoryManager::fixed(10),
        );
        let auto = RunConfig::new("test-model").with_mode(AgentMode::Auto);

        assert_eq!(agent.resolve_mode("Hello there", &auto), AgentMode::Chat);
        assert_eq!(agent.send_message("Hello there", &auto).await.unwrap(), "Hi! How can I help?");
        assert!(agent.last_run().is_none());

        assert_eq!(agent.resolve_mode("search rust", &auto), AgentMode::React);
        assert_eq!(agent.send_message("search rust", &auto).await.unwrap(), "nothing found");
        assert_eq!(agent.last_run().unwrap()["original_task"], "search rust");
        assert!(provider.prompt(1).contains("Current Task: \"search rust\""));
    }

    #[test]
    fn fixed_modes_are_not_rerouted() {
        let provider = Arc::new(ScriptedProvider::repeating("ok"));
        let agent = agent(&provider);
        assert_eq!(agent.resolve_mode("Hello there", &react()), AgentMode::React);
        assert_eq!(agent.resolve_mode("search rust", &chat()), AgentMode::Chat);
    }

    #[tokio::test]
    async fn oversized_first_turn_stays_pinned_in_dynamic_window() {
        let provider = Arc::new(ScriptedProvider::repeating("ok"));
        let mut agent = ChatAgent::new(
            provider.clone(),
            AgentProfile::new("tester", "Be helpful."),
            Arc::new(ToolRegistry::new()),
            MemoryManager::dynamic(10),
        );
        let long = "x".repeat(200);

        agent.send_message(&long, &chat()).await.unwrap();
        let roles: Vec<Role> = provider.requests()[0].messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User]);

        agent.send_message("short", &chat()).await.unwrap();
        let history = agent.history();
        assert_eq!(history[0].role, Role::System);
        assert_eq!(history[1].content, long);
        assert_eq!(agent.memory().pinned_ids().len(), 2);
        assert!(!agent.memory().pinned_ids().contains(&history.last().unwrap().id));
    }

    #[tokio::test]
    async fn react_mode_archives_completed_run() {
        let provider = Arc::new(ScriptedProvider::new([
            "Thought: echo\nAction: echo\nAction Input: {\"text\": \"pong\"}",
            "Thought: done\nAction: final_answer\nAction Input: {\"response\": \"pong\"}",
        ]));
        let mut agent = agent(&provider);

        let answer = agent.send_message("Say pong", &react()).await.unwrap();
        assert_eq!(answer, "pong");

        let run = agent.last_run().unwrap();
        assert_eq!(run["status"], "completed");
        assert_eq!(run["original_task"], "Say pong");
        assert_eq!(run["steps"].as_array().unwrap().len(), 2);
        let key = format!("{RUN_ARCHIVE_PREFIX}{}", run["task_id"].as_str().unwrap());
        assert!(agent.variable(&key).is_some());

        let last = agent.history().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "pong");
    }

    #[tokio::test]
    async fn react_mode_archives_failed_run() {
        let provider = Arc::new(ScriptedProvider::new([
            "Thought: hmm\nAction: nonexistent_tool\nAction Input: {}",
        ]));
        let mut agent = agent(&provider);

        let err = agent.send_message("Do it", &react()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolNotFound);
        assert_eq!(agent.last_run().unwrap()["status"], "failed");
        assert_eq!(agent.history().last().unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn react_prompt_carries_prior_conversation() {
        let provider = Arc::new(ScriptedProvider::new(["Nice to meet you.", "Final Answer: Ana"]));
        let mut agent = agent(&provider);

        agent.send_message("My name is Ana", &chat()).await.unwrap();
        agent.send_message("What is my name?", &react()).await.unwrap();

        let prompt = provider.prompt(1);
        assert!(prompt.contains("user: My name is Ana\nassistant: Nice to meet you."));
        assert!(prompt.contains("Current Task: \"What is my name?\""));
        assert!(!prompt.contains("user: What is my name?"));
        assert_eq!(provider.system_text(1), "You are a test assistant.");
    }

    #[tokio::test]
    async fn reset_keeps_instructions() {
        let provider = Arc::new(ScriptedProvider::repeating("ok"));
        let mut agent = agent(&provider);
        agent.send_message("hi", &chat()).await.unwrap();
        agent.set_variable("locale", json!("en"));

        agent.reset();

        assert_eq!(agent.history().len(), 1);
        assert_eq!(agent.history()[0].role, Role::System);
        assert!(agent.variable("locale").is_none());
        assert!(agent.variables().is_empty());
    }

    #[test]
    fn empty_instructions_add_no_turn() {
        let provider = Arc::new(ScriptedProvider::repeating("ok"));
        let agent = ChatAgent::new(
            provider,
            AgentProfile::new("bare", "  "),
            Arc::new(ToolRegistry::new()),
            MemoryManager::default(),
        );
        assert!(agent.history().is_empty());
        assert!(agent.tools().is_empty());
        assert_eq!(agent.profile().name, "bare");
    }

    #[test]
    fn profile_from_config() {
        let config = AgentConfig::default();
        let profile = AgentProfile::from_config(&config);
        assert_eq!(profile.name, "reagent");
        assert_eq!(profile.instructions, config.instructions);
    }
}
