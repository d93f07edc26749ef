//! Test utilities for lifecycle and orchestrator tests

use async_trait::async_trait;
use redeploy_core::{Operator, OperatorPrompt};
use redeploy_deployer::{CommandExecutionResult, CommandRequest, CommandRunner, SupervisorError};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

/// Canned reply of a [`ScriptedRunner`]
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Output(CommandExecutionResult),
    /// The command could not be started at all
    LaunchFailure(String),
}

impl ScriptedResponse {
    /// Exit 0 with the given stdout lines
    pub fn ok(stdout: &[&str]) -> Self {
        ScriptedResponse::Output(CommandExecutionResult {
            exit_code: 0,
            stdout: stdout.iter().map(|s| s.to_string()).collect(),
            stderr: Vec::new(),
            success: true,
        })
    }

    /// Nonzero exit with the given stderr lines, judged a failure
    pub fn fail(exit_code: i32, stderr: &[&str]) -> Self {
        ScriptedResponse::Output(CommandExecutionResult {
            exit_code,
            stdout: Vec::new(),
            stderr: stderr.iter().map(|s| s.to_string()).collect(),
            success: false,
        })
    }

    fn into_result(self, command: &str) -> Result<CommandExecutionResult, SupervisorError> {
        match self {
            ScriptedResponse::Output(result) => Ok(result),
            ScriptedResponse::LaunchFailure(message) => Err(SupervisorError::Launch {
                command: command.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, message),
            }),
        }
    }
}

struct Rule {
    pattern: String,
    responses: VecDeque<ScriptedResponse>,
}

/// Command runner that answers from a script instead of spawning processes.
///
/// Rules are matched in registration order by substring. A rule with several
/// responses hands them out in turn and repeats the last one. Commands matching
/// no rule succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    requests: Mutex<Vec<CommandRequest>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, pattern: &str, response: ScriptedResponse) -> Self {
        self.on_sequence(pattern, vec![response])
    }

    pub fn on_sequence(self, pattern: &str, responses: Vec<ScriptedResponse>) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule {
                pattern: pattern.to_string(),
                responses: responses.into(),
            });
        }
        self
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<CommandRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn commands(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.command).collect()
    }

    /// Number of commands run that contain `pattern`
    pub fn count(&self, pattern: &str) -> usize {
        self.commands()
            .iter()
            .filter(|command| command.contains(pattern))
            .count()
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.count(pattern) > 0
    }

    fn respond(&self, command: &str) -> ScriptedResponse {
        let Ok(mut rules) = self.rules.lock() else {
            return ScriptedResponse::ok(&[]);
        };
        let Some(rule) = rules.iter_mut().find(|rule| command.contains(&rule.pattern)) else {
            return ScriptedResponse::ok(&[]);
        };
        if rule.responses.len() > 1 {
            rule.responses.pop_front().unwrap_or_else(|| ScriptedResponse::ok(&[]))
        } else {
            rule.responses
                .front()
                .cloned()
                .unwrap_or_else(|| ScriptedResponse::ok(&[]))
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        request: CommandRequest,
    ) -> Result<CommandExecutionResult, SupervisorError> {
        let response = self.respond(&request.command);
        let command = request.command.clone();
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        response.into_result(&command)
    }
}

/// Operator answering from a queue of replies, then with each prompt's default
#[derive(Default)]
pub struct ScriptedOperator {
    answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<OperatorPrompt>>,
    acknowledgements: Mutex<Vec<String>>,
}

impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn prompts(&self) -> Vec<OperatorPrompt> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn acknowledgements(&self) -> Vec<String> {
        self.acknowledgements
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn confirm(&self, prompt: &OperatorPrompt) -> bool {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.clone());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .unwrap_or_else(|| prompt.default_answer())
    }

    async fn acknowledge(&self, message: &str) {
        if let Ok(mut acknowledgements) = self.acknowledgements.lock() {
            acknowledgements.push(message.to_string());
        }
    }
}

/// Write a minimal valid compose project into `dir`
pub fn write_compose_project(dir: &Path, with_env: bool) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(
        dir.join("docker-compose.yml"),
        "services:\n  web:\n    build: .\n    ports:\n      - \"8080:80\"\n",
    )?;
    if with_env {
        std::fs::write(dir.join(".env"), "APP_ENV=production\n")?;
    }
    Ok(())
}
