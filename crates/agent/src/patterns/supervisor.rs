//! Supervisor pattern: a planner agent overseeing an executor agent.
//!
//! Round 0 runs the executor on the original input. Every later round asks
//! the planner to review the latest [`Conclusion`] and classifies its reply
//! into a [`Decision`]:
//!
//! - **Terminate**: stop and report.
//! - **Continue / Redirect**: hand the executor a new instruction and run it
//!   again.
//!
//! When the round budget runs out the loop stops with a synthetic
//! "Maximum loops reached" decision. That is a normal outcome, not an error.
//! Any error from either agent aborts the run.

use async_trait::async_trait;
use chrono::Utc;
use minijinja::{Environment, context};
use overseer_config::SupervisorSettings;
use overseer_core::agent::{Agent, AgentBase};
use overseer_core::error::{Error, Result};
use overseer_core::event::{DomainEvent, EventBus};
use overseer_core::hook::HookEvent;
use overseer_core::message::{ContentBlock, Message, Role};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::conclusion::Conclusion;
use super::decision::{Decision, DecisionAction};
use super::react::ReactAgent;

pub const DEFAULT_REVIEW_TEMPLATE: &str = include_str!("prompts/review.md");
pub const DEFAULT_INSTRUCTION_TEMPLATE: &str = include_str!("prompts/instruction.md");

/// Round progress goes to info when verbose, debug otherwise.
macro_rules! round_log {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

/// Configuration for a [`SupervisorAgent`].
#[derive(Clone)]
pub struct SupervisorConfig {
    pub name: String,
    pub planner: Option<Arc<ReactAgent>>,
    pub executor: Option<Arc<ReactAgent>>,
    /// Executor runs allowed before the loop is forced to stop
    pub max_loop_iterations: usize,
    /// Jinja template for the planner's review request
    pub review_template: String,
    /// Jinja template for follow-up executor instructions
    pub instruction_template: String,
    pub verbose_logging: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            name: "supervisor".into(),
            planner: None,
            executor: None,
            max_loop_iterations: 3,
            review_template: DEFAULT_REVIEW_TEMPLATE.into(),
            instruction_template: DEFAULT_INSTRUCTION_TEMPLATE.into(),
            verbose_logging: false,
        }
    }
}

impl SupervisorConfig {
    pub fn new(planner: Arc<ReactAgent>, executor: Arc<ReactAgent>) -> Self {
        Self {
            planner: Some(planner),
            executor: Some(executor),
            ..Self::default()
        }
    }

    /// Apply the `[supervisor]` config section.
    pub fn from_settings(
        planner: Arc<ReactAgent>,
        executor: Arc<ReactAgent>,
        settings: &SupervisorSettings,
    ) -> Self {
        let mut config = Self::new(planner, executor)
            .with_max_loop_iterations(settings.max_loop_iterations)
            .with_verbose_logging(settings.verbose_logging);
        if let Some(template) = &settings.review_template {
            config.review_template = template.clone();
        }
        if let Some(template) = &settings.instruction_template {
            config.instruction_template = template.clone();
        }
        config
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_loop_iterations(mut self, max: usize) -> Self {
        self.max_loop_iterations = max;
        self
    }

    pub fn with_review_template(mut self, template: impl Into<String>) -> Self {
        self.review_template = template.into();
        self
    }

    pub fn with_instruction_template(mut self, template: impl Into<String>) -> Self {
        self.instruction_template = template.into();
        self
    }

    pub fn with_verbose_logging(mut self, enabled: bool) -> Self {
        self.verbose_logging = enabled;
        self
    }

    /// Check agents, loop bound and template syntax.
    pub fn validate(&self) -> Result<()> {
        if self.planner.is_none() {
            return Err(config_error("planner agent is required"));
        }
        if self.executor.is_none() {
            return Err(config_error("executor agent is required"));
        }
        if self.max_loop_iterations == 0 {
            return Err(config_error("max_loop_iterations must be greater than 0"));
        }

        let env = Environment::new();
        for (label, source) in [
            ("review", &self.review_template),
            ("instruction", &self.instruction_template),
        ] {
            if let Err(e) = env.template_from_str(source) {
                return Err(config_error(format!("invalid {label} template: {e}")));
            }
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> Error {
    Error::Config {
        message: message.into(),
    }
}

/// Result of one supervised run.
#[derive(Debug, Clone)]
pub struct SupervisedOutcome {
    /// The final report, as returned by `reply`
    pub response: Message,
    /// Conclusion of the last executor run
    pub conclusion: Conclusion,
    /// The decision that ended the run
    pub decision: Decision,
    /// Rounds started (1..=max_loop_iterations)
    pub rounds: usize,
    /// Planner plus executor replies
    pub sub_agent_calls: usize,
}

/// Drives a planner/executor double loop.
pub struct SupervisorAgent {
    base: AgentBase,
    planner: Arc<ReactAgent>,
    executor: Arc<ReactAgent>,
    max_loop_iterations: usize,
    review_template: String,
    instruction_template: String,
    verbose_logging: bool,
    event_bus: Option<Arc<EventBus>>,
}

impl SupervisorAgent {
    /// Create a supervisor.
    ///
    /// # Panics
    ///
    /// Panics if `config` does not validate. Use [`SupervisorAgent::try_new`]
    /// to get the error instead.
    pub fn new(config: SupervisorConfig) -> Self {
        match Self::try_new(config) {
            Ok(agent) => agent,
            Err(e) => panic!("invalid supervisor config: {e}"),
        }
    }

    pub fn try_new(config: SupervisorConfig) -> Result<Self> {
        config.validate()?;
        let planner = config
            .planner
            .ok_or_else(|| config_error("planner agent is required"))?;
        let executor = config
            .executor
            .ok_or_else(|| config_error("executor agent is required"))?;

        Ok(Self {
            base: AgentBase::new(config.name),
            planner,
            executor,
            max_loop_iterations: config.max_loop_iterations,
            review_template: config.review_template,
            instruction_template: config.instruction_template,
            verbose_logging: config.verbose_logging,
            event_bus: None,
        })
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn with_console_output(self, enabled: bool) -> Self {
        self.base.set_console_output(enabled);
        self
    }

    pub fn planner(&self) -> &Arc<ReactAgent> {
        &self.planner
    }

    pub fn executor(&self) -> &Arc<ReactAgent> {
        &self.executor
    }

    pub fn max_loop_iterations(&self) -> usize {
        self.max_loop_iterations
    }

    /// Run the double loop on `input` without hooks or broadcasting.
    pub async fn run(&self, cancel: &CancellationToken, input: Message) -> Result<SupervisedOutcome> {
        let task = input.text_content();
        let mut sub_agent_calls = 0;

        round_log!(self.verbose_logging, round = 1, "Supervisor: executor starting on original task");
        let mut conclusion = self.execute(cancel, input).await?;
        sub_agent_calls += 1;
        let mut rounds = 1;

        let decision = loop {
            if rounds >= self.max_loop_iterations {
                round_log!(
                    self.verbose_logging,
                    rounds,
                    "Supervisor: max loops reached, returning current conclusion"
                );
                break Decision::max_loops_reached();
            }
            rounds += 1;

            let decision = self.review(cancel, &task, &conclusion).await?;
            sub_agent_calls += 1;

            round_log!(
                self.verbose_logging,
                round = rounds,
                action = %decision.action,
                reasoning = %decision.reasoning,
                "Supervisor: planner decided"
            );
            self.publish_round(rounds, decision.action);

            if decision.action.should_terminate() {
                break decision;
            }

            let instruction = self.render_instruction(&decision)?;
            conclusion = self
                .execute(cancel, Message::user(instruction).named(self.name()))
                .await?;
            sub_agent_calls += 1;
        };

        let response = self.final_response(&task, &conclusion, &decision);
        tracing::info!(
            agent = %self.name(),
            rounds,
            sub_agent_calls,
            action = %decision.action,
            "Supervised run completed"
        );

        Ok(SupervisedOutcome {
            response,
            conclusion,
            decision,
            rounds,
            sub_agent_calls,
        })
    }

    async fn execute(&self, cancel: &CancellationToken, instruction: Message) -> Result<Conclusion> {
        let original_input = instruction.text_content();
        let response = self.executor.reply(cancel, instruction).await?;

        let mut conclusion = Conclusion::extract(&response.text_content());
        conclusion.original_input = original_input;
        conclusion.iteration_count = self
            .executor
            .last_run()
            .await
            .map(|stats| stats.iterations)
            .unwrap_or_default();

        round_log!(
            self.verbose_logging,
            confidence = conclusion.confidence,
            steps = conclusion.steps.len(),
            iterations = conclusion.iteration_count,
            "Supervisor: executor concluded"
        );
        Ok(conclusion)
    }

    async fn review(&self, cancel: &CancellationToken, task: &str, conclusion: &Conclusion) -> Result<Decision> {
        let review = self.render_review(task, conclusion)?;
        let reply = self
            .planner
            .reply(cancel, Message::user(review).named(self.name()))
            .await?;
        Ok(Decision::parse(&reply.text_content()))
    }

    fn render_review(&self, task: &str, conclusion: &Conclusion) -> Result<String> {
        render(
            &self.review_template,
            context! {
                task => task,
                summary => &conclusion.summary,
                steps => &conclusion.steps,
                confidence => format!("{:.2}", conclusion.confidence),
                next_action => &conclusion.suggested_next_action,
            },
        )
    }

    fn render_instruction(&self, decision: &Decision) -> Result<String> {
        render(
            &self.instruction_template,
            context! {
                action => decision.action.to_string(),
                instruction => &decision.new_instruction,
                approach => &decision.modified_approach,
            },
        )
    }

    fn final_response(&self, task: &str, conclusion: &Conclusion, decision: &Decision) -> Message {
        let mut text = format!("## Task: {task}\n\n**Summary:** {}\n\n", conclusion.summary);
        if !conclusion.steps.is_empty() {
            text.push_str("**Steps Taken:**\n");
            for step in &conclusion.steps {
                text.push_str(&format!("  {step}\n"));
            }
            text.push('\n');
        }
        if !decision.reasoning.is_empty() {
            text.push_str(&format!("**Final Decision:** {}\n", decision.reasoning));
        }

        Message::with_blocks(
            self.name(),
            Role::Assistant,
            vec![ContentBlock::text(text.trim_end())],
        )
        .with_metadata("decision", serde_json::json!(decision.action.to_string()))
    }

    fn publish_round(&self, round: usize, action: DecisionAction) {
        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::SupervisorRound {
                agent: self.name().to_string(),
                round,
                action: action.to_string(),
                timestamp: Utc::now(),
            });
        }
    }
}

fn render(template: &str, ctx: minijinja::Value) -> Result<String> {
    Environment::new()
        .render_str(template, ctx)
        .map_err(|e| Error::Template(e.to_string()))
}

#[async_trait]
impl Agent for SupervisorAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    async fn reply(&self, cancel: &CancellationToken, message: Message) -> Result<Message> {
        let (context, input) = self.base.run_pre_hooks(HookEvent::PreReply, message)?;
        let outcome = self.run(cancel, input).await?;

        self.base.print(&outcome.response)?;
        let response = self
            .base
            .run_post_hooks(HookEvent::PostReply, &context, outcome.response)?;
        self.base.broadcast(cancel, &response).await?;
        Ok(response)
    }

    /// Observed messages go to the executor, which holds the working context.
    async fn observe(&self, cancel: &CancellationToken, message: Message) -> Result<()> {
        let (context, message) = self.base.run_pre_hooks(HookEvent::PreObserve, message)?;
        self.executor.observe(cancel, message.clone()).await?;
        self.base
            .run_post_hooks(HookEvent::PostObserve, &context, message)?;
        Ok(())
    }
}
