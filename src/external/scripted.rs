//! Scripted command executor
//!
//! Records every invocation and answers from a list of rules instead of
//! spawning processes. Used by the test suites to drive VCS, environment and
//! self-check flows without git or Python installed.

use super::command::{CommandError, CommandExecutor, CommandOutput, Invocation};
use async_trait::async_trait;
use std::sync::Mutex;

type Effect = Box<dyn Fn(&Invocation) + Send + Sync>;

struct Rule {
    program_suffix: String,
    args_prefix: Vec<String>,
    response: Result<CommandOutput, CommandError>,
    effect: Option<Effect>,
}

impl Rule {
    fn matches(&self, invocation: &Invocation) -> bool {
        invocation.program.ends_with(&self.program_suffix)
            && invocation.args.len() >= self.args_prefix.len()
            && invocation
                .args
                .iter()
                .zip(&self.args_prefix)
                .all(|(arg, expected)| arg == expected)
    }
}

/// Executor answering from rules; unmatched invocations succeed with empty output.
#[derive(Default)]
pub struct ScriptedExecutor {
    rules: Vec<Rule>,
    invocations: Mutex<Vec<Invocation>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(stdout: &str) -> CommandOutput {
        CommandOutput {
            status_code: 0,
            stdout: stdout.as_bytes().to_vec(),
            stderr: String::new(),
        }
    }

    pub fn exit(status_code: i32, stderr: &str) -> CommandOutput {
        CommandOutput {
            status_code,
            stdout: Vec::new(),
            stderr: stderr.to_string(),
        }
    }

    /// Answer invocations whose program ends with `program_suffix` and whose
    /// arguments start with `args_prefix`. The first matching rule wins.
    pub fn on(
        mut self,
        program_suffix: &str,
        args_prefix: &[&str],
        response: Result<CommandOutput, CommandError>,
    ) -> Self {
        self.rules.push(Rule {
            program_suffix: program_suffix.to_string(),
            args_prefix: args_prefix.iter().map(|s| s.to_string()).collect(),
            response,
            effect: None,
        });
        self
    }

    /// Like [`ScriptedExecutor::on`] with a successful empty response, running
    /// `effect` on every matching invocation.
    pub fn effect(
        mut self,
        program_suffix: &str,
        args_prefix: &[&str],
        effect: impl Fn(&Invocation) + Send + Sync + 'static,
    ) -> Self {
        self.rules.push(Rule {
            program_suffix: program_suffix.to_string(),
            args_prefix: args_prefix.iter().map(|s| s.to_string()).collect(),
            response: Ok(Self::ok("")),
            effect: Some(Box::new(effect)),
        });
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .map(|recorded| recorded.clone())
            .unwrap_or_default()
    }

    /// Whether any recorded invocation matches the program suffix and argument prefix.
    pub fn ran(&self, program_suffix: &str, args_prefix: &[&str]) -> bool {
        self.invocations().iter().any(|invocation| {
            invocation.program.ends_with(program_suffix)
                && invocation.args.len() >= args_prefix.len()
                && invocation
                    .args
                    .iter()
                    .zip(args_prefix)
                    .all(|(arg, expected)| arg == expected)
        })
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        if let Ok(mut recorded) = self.invocations.lock() {
            recorded.push(invocation.clone());
        }

        match self.rules.iter().find(|rule| rule.matches(invocation)) {
            Some(rule) => {
                if let Some(effect) = &rule.effect {
                    effect(invocation);
                }
                rule.response.clone()
            }
            None => Ok(Self::ok("")),
        }
    }
}
