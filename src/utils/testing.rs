/// Scripted process host for unit tests
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use super::command::{Attach, CommandOutput, ProcessHost};
use crate::error::ProcessError;

/// How the fake answers one backend call
#[derive(Debug, Clone)]
pub enum Reply {
    Ok(String),
    Fail { code: i32, output: String },
    Timeout,
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub args: Vec<String>,
    pub attach: Option<Attach>,
    pub timeout: Duration,
}

impl Call {
    /// The leading verb tokens, e.g. "aks show" or "login"
    pub fn verb(&self) -> String {
        self.args
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

type Responder = Box<dyn Fn(&[String]) -> Reply + Send + Sync>;

/// Records every call and answers through a responder closure
pub struct FakeHost {
    responder: Responder,
    calls: Mutex<Vec<Call>>,
}

impl FakeHost {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[String]) -> Reply + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A backend where every call succeeds with empty output
    pub fn ok() -> Self {
        Self::new(|_| Reply::Ok(String::new()))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn verbs(&self) -> Vec<String> {
        self.calls().iter().map(Call::verb).collect()
    }

    fn record(&self, args: &[String], attach: Option<Attach>, timeout: Duration) -> Reply {
        self.calls.lock().unwrap().push(Call {
            args: args.to_vec(),
            attach,
            timeout,
        });
        (self.responder)(args)
    }
}

#[async_trait]
impl ProcessHost for FakeHost {
    async fn capture(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, ProcessError> {
        match self.record(args, None, timeout) {
            Reply::Ok(stdout) => Ok(CommandOutput {
                stdout,
                stderr: String::new(),
                code: Some(0),
                success: true,
            }),
            Reply::Fail { code, output } => Ok(CommandOutput {
                stdout: String::new(),
                stderr: output,
                code: Some(code),
                success: false,
            }),
            Reply::Timeout => Err(ProcessError::Timeout {
                program: "az".to_string(),
                timeout,
            }),
        }
    }

    async fn attach(
        &self,
        args: &[String],
        attach: Attach,
        timeout: Duration,
    ) -> Result<(), ProcessError> {
        match self.record(args, Some(attach), timeout) {
            Reply::Ok(_) => Ok(()),
            Reply::Fail { code, .. } => Err(ProcessError::Failed {
                program: "az".to_string(),
                code: Some(code),
            }),
            Reply::Timeout => Err(ProcessError::Timeout {
                program: "az".to_string(),
                timeout,
            }),
        }
    }
}
