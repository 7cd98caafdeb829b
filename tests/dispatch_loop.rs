use async_trait::async_trait;
use mockall::mock;
use mockall::predicate::function;
use serde_json::{Map, Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;
use tokio::sync::watch;

use weather_agent::repl::{self, LineReader, LineSource, ReadOutcome, ReplError, ScriptedInput};
use weather_agent::weather::{InMemoryStore, register_weather_tools};
use weather_agent::{
    Agent, AgentConfig, LLMClient, LLMError, ParamSpec, StructuredReply, Tool, ToolError,
    ToolRegistry,
};

mock! {
    Backend {}

    #[async_trait]
    impl LLMClient for Backend {
        async fn structured_choice(&self, prompt: &str) -> Result<StructuredReply, LLMError>;
        async fn free_text(&self, prompt: &str) -> Result<String, LLMError>;
    }
}

/// Counts invocations and returns a fixed payload or a fixed failure.
struct Spy {
    name: &'static str,
    outcome: Result<Value, String>,
    calls: AtomicUsize,
}

impl Spy {
    fn ok(name: &'static str, payload: Value) -> Arc<Self> {
        Arc::new(Self {
            name,
            outcome: Ok(payload),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(name: &'static str, message: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            outcome: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for Spy {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "test double"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    async fn invoke(&self, _args: Map<String, Value>) -> Result<Value, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome
            .clone()
            .map_err(ToolError::ExecutionFailed)
    }
}

fn agent_with(backend: MockBackend, tools: &[Arc<Spy>]) -> Agent {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool.clone());
    }
    Agent::new(Arc::new(backend), Arc::new(registry), AgentConfig::default())
}

fn choice_for(input: &'static str, reply: &'static str, backend: &mut MockBackend) {
    backend
        .expect_structured_choice()
        .with(function(move |prompt: &str| prompt.contains(&format!("User Query: {}\n", input))))
        .times(1)
        .returning(move |_| Ok(StructuredReply::Text(reply.to_string())));
}

async fn run_script(agent: &Agent, script: ScriptedInput) -> String {
    let (_interrupt, signal) = watch::channel(false);
    let mut out = Vec::new();
    repl::run(agent, LineReader::spawn(move || Ok(script)), signal, &mut out)
        .await
        .unwrap();
    String::from_utf8(out).unwrap()
}

/// Serves its lines, then raises the interrupt and blocks like an idle prompt.
struct InterruptWhenIdle {
    lines: VecDeque<String>,
    interrupt: watch::Sender<bool>,
    stall: mpsc::Receiver<()>,
}

impl LineSource for InterruptWhenIdle {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome, ReplError> {
        if let Some(line) = self.lines.pop_front() {
            return Ok(ReadOutcome::Line(line));
        }
        let _ = self.interrupt.send(true);
        let _ = self.stall.recv();
        Ok(ReadOutcome::Eof)
    }
}

/// Runs the loop until an interrupt arrives at an idle prompt.
async fn run_until_idle_interrupt(agent: &Agent, lines: &[&str]) -> String {
    let (interrupt, signal) = watch::channel(false);
    let (_hold, stall) = mpsc::channel();
    let source = InterruptWhenIdle {
        lines: lines.iter().map(|l| l.to_string()).collect(),
        interrupt,
        stall,
    };

    let mut out = Vec::new();
    tokio::time::timeout(
        Duration::from_secs(5),
        repl::run(agent, LineReader::spawn(move || Ok(source)), signal, &mut out),
    )
    .await
    .expect("interrupt at the prompt should end the loop")
    .unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn test_station_summary_end_to_end() {
    let summary = Spy::ok(
        "get_all_stations_summary",
        json!({"stations": [{"_id": "PLAT", "count": 42}]}),
    );

    let mut backend = MockBackend::new();
    choice_for(
        "how many records for PLAT",
        r#"{"tool":"get_all_stations_summary","args":{}}"#,
        &mut backend,
    );
    backend
        .expect_free_text()
        .with(function(|prompt: &str| prompt.contains("\"count\": 42")))
        .times(1)
        .returning(|_| Ok("There are 42 records for station PLAT.".to_string()));

    let agent = agent_with(backend, &[summary.clone()]);
    let output = run_script(&agent, ScriptedInput::new(["how many records for PLAT"])).await;

    assert_eq!(output, "There are 42 records for station PLAT.\n\nExiting...\n");
    assert_eq!(summary.calls(), 1);
}

#[tokio::test]
async fn test_interrupt_before_first_turn_exits_cleanly() {
    let summary = Spy::ok("get_all_stations_summary", json!({}));
    let agent = agent_with(MockBackend::new(), &[summary.clone()]);

    assert_eq!(run_until_idle_interrupt(&agent, &[]).await, "\nExiting...\n");
    assert_eq!(summary.calls(), 0);
}

#[tokio::test]
async fn test_interrupt_at_prompt_after_a_turn() {
    let summary = Spy::ok("get_all_stations_summary", json!({"stations": []}));

    let mut backend = MockBackend::new();
    choice_for("list stations", r#"{"tool": "get_all_stations_summary"}"#, &mut backend);
    backend
        .expect_free_text()
        .times(1)
        .returning(|_| Ok("There are records.".to_string()));

    let agent = agent_with(backend, &[summary.clone()]);
    let output = run_until_idle_interrupt(&agent, &["list stations"]).await;

    assert_eq!(output, "There are records.\n\nExiting...\n");
    assert_eq!(summary.calls(), 1);
}

#[tokio::test]
async fn test_unknown_tool_invokes_nothing() {
    let wind = Spy::ok("get_wind_data", json!({}));
    let summary = Spy::ok("get_all_stations_summary", json!({}));

    let mut backend = MockBackend::new();
    choice_for("moon phase?", r#"{"tool": "get_moon_phase", "args": {}}"#, &mut backend);
    backend
        .expect_free_text()
        .with(function(|prompt: &str| prompt.contains("\"error\": \"Unknown tool 'get_moon_phase'\"")))
        .returning(|_| Ok("I don't have a tool for moon phases.".to_string()));

    let agent = agent_with(backend, &[wind.clone(), summary.clone()]);
    assert_eq!(agent.handle_turn("moon phase?").await, "I don't have a tool for moon phases.");
    assert_eq!(wind.calls() + summary.calls(), 0);
}

#[tokio::test]
async fn test_loop_survives_failing_tool() {
    let broken = Spy::failing("get_pressure_trend", "cursor timed out");
    let summary = Spy::ok("get_all_stations_summary", json!({"stations": []}));

    let mut backend = MockBackend::new();
    choice_for("pressure at PLAT", r#"{"tool": "get_pressure_trend", "args": {}}"#, &mut backend);
    choice_for("list stations", r#"{"tool": "get_all_stations_summary"}"#, &mut backend);
    backend
        .expect_free_text()
        .with(function(|prompt: &str| {
            prompt.contains("\"exception\": \"Execution failed: cursor timed out\"")
                && prompt.contains("\"llm_output\": \"{\\\"tool\\\": \\\"get_pressure_trend\\\"")
        }))
        .times(1)
        .returning(|_| Ok("The pressure lookup failed.".to_string()));
    backend
        .expect_free_text()
        .with(function(|prompt: &str| prompt.contains("'get_all_stations_summary'")))
        .times(1)
        .returning(|_| Ok("No stations recorded.".to_string()));

    let agent = agent_with(backend, &[broken.clone(), summary.clone()]);
    let output = run_script(
        &agent,
        ScriptedInput::new(["pressure at PLAT", "   ", "list stations"]).then_interrupt(),
    )
    .await;

    assert_eq!(output, "The pressure lookup failed.\nNo stations recorded.\n\nExiting...\n");
    assert_eq!(broken.calls(), 1);
    assert_eq!(summary.calls(), 1);
}

#[tokio::test]
async fn test_validation_blocks_apply_leave() {
    let leave = Spy::ok("apply_leave", json!({"status": "submitted"}));

    let mut backend = MockBackend::new();
    choice_for(
        "I want leave tomorrow",
        r#"{"tool": "apply_leave", "args": {"employee_id": "MISSING_EMP_ID"}}"#,
        &mut backend,
    );
    choice_for(
        "I am emp001, I want leave tomorrow",
        r#"{"tool": "apply_leave", "args": {"employee_id": "emp001"}}"#,
        &mut backend,
    );
    backend
        .expect_free_text()
        .with(function(|prompt: &str| prompt.contains("Employee ID is required")))
        .times(1)
        .returning(|_| Ok("Please tell me your employee ID.".to_string()));
    backend
        .expect_free_text()
        .with(function(|prompt: &str| prompt.contains("\"status\": \"submitted\"")))
        .times(1)
        .returning(|_| Ok("Your leave request was submitted.".to_string()));

    let agent = agent_with(backend, &[leave.clone()]);
    assert_eq!(agent.handle_turn("I want leave tomorrow").await, "Please tell me your employee ID.");
    assert_eq!(leave.calls(), 0);

    assert_eq!(
        agent.handle_turn("I am emp001, I want leave tomorrow").await,
        "Your leave request was submitted."
    );
    assert_eq!(leave.calls(), 1);
}

#[tokio::test]
async fn test_malformed_choice_with_formatting_outage() {
    let wind = Spy::ok("get_wind_data", json!({}));

    let mut backend = MockBackend::new();
    choice_for("wind?", "Sure! Let me look that up for you.", &mut backend);
    backend
        .expect_free_text()
        .returning(|_| Err(LLMError::ApiError("503 Service Unavailable".into())));

    let agent = agent_with(backend, &[wind.clone()]);
    let text = agent.handle_turn("wind?").await;

    assert!(text.starts_with("Found data for your query: {"));
    assert!(text.contains("\"llm_output\": \"Sure! Let me look that up for you.\""));
    assert!(text.contains("Invalid JSON returned by LLM"));
    assert!(text.ends_with("(Note: LLM formatting failed: API error: 503 Service Unavailable)"));
    assert_eq!(wind.calls(), 0);
}

#[tokio::test]
async fn test_weather_tools_through_the_loop() {
    let store = InMemoryStore::from_documents(vec![
        json!({"callLetters": "PLAT", "ts": "1984-03-05T13:00:00", "wind": {"speed": {"rate": 2.0}}}),
        json!({"callLetters": "PLAT", "ts": "1984-03-05T15:00:00", "wind": {"speed": {"rate": 4.1}}}),
    ])
    .unwrap();
    let mut registry = ToolRegistry::new();
    register_weather_tools(&mut registry, Arc::new(store));

    let mut backend = MockBackend::new();
    backend
        .expect_structured_choice()
        .with(function(|prompt: &str| {
            prompt.contains("get_wind_data(callLetters: string)")
                && prompt.contains("get_pressure_trend(callLetters: string, limit: integer)")
        }))
        .returning(|_| {
            Ok(StructuredReply::Text(
                r#"{tool: "get_wind_data", args: {callLetters: "PLAT"}}"#.to_string(),
            ))
        });
    backend
        .expect_free_text()
        .with(function(|prompt: &str| {
            prompt.contains("\"timestamp\": \"1984-03-05T15:00:00\"") && prompt.contains("\"rate\": 4.1")
        }))
        .returning(|_| Ok("Latest wind at PLAT: 4.1 m/s.".to_string()));

    let agent = Agent::new(Arc::new(backend), Arc::new(registry), AgentConfig::default());
    assert_eq!(agent.handle_turn("wind at PLAT").await, "Latest wind at PLAT: 4.1 m/s.");
}
