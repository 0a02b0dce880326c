//! Fakes for the session seams, shared by the unit tests.

use std::{
    cell::RefCell,
    collections::{HashSet, VecDeque},
    io,
    sync::{Arc, Mutex},
};

use inquire::InquireError;
use tracing_subscriber::fmt::MakeWriter;

use crate::{
    elevation::Elevation,
    error::AppError,
    prompt::Prompter,
    registry::ProfileStore,
    runner::{CommandOutput, CommandRunner},
};

/// Runner answering from a script keyed by command-line prefix
///
/// The longest matching prefix wins; unscripted commands succeed silently.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<(String, CommandOutput)>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, prefix: &str, stdout: &str) -> Self {
        self.with_output(
            prefix,
            CommandOutput {
                code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        )
    }

    pub fn fail(self, prefix: &str, stderr: &str) -> Self {
        self.with_output(
            prefix,
            CommandOutput {
                code: 1,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    pub fn with_output(mut self, prefix: &str, output: CommandOutput) -> Self {
        self.rules.push((prefix.to_string(), output));
        self
    }

    /// Every command line run so far
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Number of command lines starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.borrow().iter().filter(|line| matches_prefix(line, prefix)).count()
    }
}

fn matches_prefix(line: &str, prefix: &str) -> bool {
    line == prefix || line.starts_with(&format!("{prefix} "))
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str]) -> CommandOutput {
        let line = std::iter::once(program).chain(args.iter().copied()).collect::<Vec<_>>().join(" ");
        self.calls.borrow_mut().push(line.clone());
        self.rules
            .iter()
            .filter(|(prefix, _)| matches_prefix(&line, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, output)| output.clone())
            .unwrap_or_default()
    }
}

/// Profile list held in memory, in insertion order
#[derive(Default)]
pub struct MemoryProfileStore {
    entries: RefCell<Vec<(String, Option<String>)>>,
    denied: HashSet<String>,
    failing_reads: bool,
}

impl MemoryProfileStore {
    pub fn with_profile(self, sid: &str, path: Option<&str>) -> Self {
        self.entries
            .borrow_mut()
            .push((sid.to_string(), path.map(str::to_string)));
        self
    }

    pub fn deny_delete(mut self, sid: &str) -> Self {
        self.denied.insert(sid.to_string());
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.failing_reads = true;
        self
    }

    pub fn contains(&self, sid: &str) -> bool {
        self.entries.borrow().iter().any(|(key, _)| key == sid)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn profile_sids(&self) -> io::Result<Vec<String>> {
        if self.failing_reads {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "access is denied"));
        }
        Ok(self.entries.borrow().iter().map(|(sid, _)| sid.clone()).collect())
    }

    fn profile_image_path(&self, sid: &str) -> io::Result<Option<String>> {
        if self.failing_reads {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "access is denied"));
        }
        Ok(self
            .entries
            .borrow()
            .iter()
            .find(|(key, _)| key == sid)
            .and_then(|(_, path)| path.clone()))
    }

    fn delete_profile_key(&self, sid: &str) -> io::Result<()> {
        if self.denied.contains(sid) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "access is denied"));
        }
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(key, _)| key != sid);
        if entries.len() == before {
            return Err(io::Error::new(io::ErrorKind::NotFound, "key not found"));
        }
        Ok(())
    }

    fn key_display(&self, sid: &str) -> String {
        format!("HKLM\\ProfileList\\{sid}")
    }
}

/// Prompter replaying fixed answers
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    asked: usize,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: 0,
        }
    }

    /// Number of prompts shown
    pub fn asked(&self) -> usize {
        self.asked
    }

    fn next(&mut self) -> Result<String, AppError> {
        self.asked += 1;
        self.answers
            .pop_front()
            .ok_or(AppError::Inquire(InquireError::OperationInterrupted))
    }
}

impl Prompter for ScriptedPrompter {
    fn text(&mut self, _message: &str) -> Result<String, AppError> {
        self.next()
    }

    fn select(&mut self, _message: &str, _options: &[&str]) -> Result<String, AppError> {
        self.next()
    }
}

/// Elevation with preset answers
pub struct FixedElevation {
    pub privileged: bool,
    pub relaunch_accepted: bool,
    pub relaunched_with: RefCell<Option<Vec<String>>>,
}

impl FixedElevation {
    pub fn new(privileged: bool, relaunch_accepted: bool) -> Self {
        Self {
            privileged,
            relaunch_accepted,
            relaunched_with: RefCell::new(None),
        }
    }
}

impl Elevation for FixedElevation {
    fn is_privileged(&self) -> bool {
        self.privileged
    }

    fn relaunch_privileged(&self, args: &[String]) -> bool {
        *self.relaunched_with.borrow_mut() = Some(args.to_vec());
        self.relaunch_accepted
    }
}

/// In-memory log sink
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs `f` with a thread-local subscriber and returns what it logged
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).to_string();
    (result, logs)
}
