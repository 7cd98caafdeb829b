//! Read-evaluate-print loop over an [`Agent`].

use futures::FutureExt;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::collections::VecDeque;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::sync::mpsc as std_mpsc;
use std::thread;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};

use crate::agent::{Agent, TurnState};
use crate::error::panic_message;

/// Prompt shown before each line of input.
pub const PROMPT: &str = ">> ";

/// Errors that end the loop abnormally.
#[derive(Debug, Error)]
pub enum ReplError {
    #[error("line editor error: {0}")]
    Readline(#[from] ReadlineError),
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a single read produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    Interrupted,
    Eof,
}

/// A source of user input lines.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ReplError>;
}

impl LineSource for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ReplError> {
        match self.readline(prompt) {
            Ok(line) => {
                let _ = self.add_history_entry(line.as_str());
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(err.into()),
        }
    }
}

/// Pre-recorded input, ending in EOF once exhausted.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    outcomes: VecDeque<ReadOutcome>,
}

impl ScriptedInput {
    /// Replays `lines` in order.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            outcomes: lines.into_iter().map(|l| ReadOutcome::Line(l.into())).collect(),
        }
    }

    /// Appends an interrupt after the scripted lines.
    pub fn then_interrupt(mut self) -> Self {
        self.outcomes.push_back(ReadOutcome::Interrupted);
        self
    }

    /// Outcomes not yet read.
    pub fn remaining(&self) -> usize {
        self.outcomes.len()
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome, ReplError> {
        Ok(self.outcomes.pop_front().unwrap_or(ReadOutcome::Eof))
    }
}

/// Line input served from a dedicated thread.
///
/// Reading blocks, so the source lives on its own thread and the loop awaits
/// each line. The source is built on that thread and never crosses threads.
pub struct LineReader {
    requests: std_mpsc::Sender<()>,
    lines: mpsc::Receiver<Result<ReadOutcome, ReplError>>,
}

impl LineReader {
    /// Starts the reader thread; `make_source` runs on it.
    pub fn spawn<S, F>(make_source: F) -> Self
    where
        S: LineSource,
        F: FnOnce() -> Result<S, ReplError> + Send + 'static,
    {
        let (requests, pending) = std_mpsc::channel::<()>();
        let (line_tx, lines) = mpsc::channel(1);

        thread::spawn(move || {
            let mut source = match make_source() {
                Ok(source) => source,
                Err(err) => {
                    let _ = line_tx.blocking_send(Err(err));
                    return;
                }
            };
            while pending.recv().is_ok() {
                let outcome = source.read_line(PROMPT);
                let finished = !matches!(outcome, Ok(ReadOutcome::Line(_)));
                if line_tx.blocking_send(outcome).is_err() || finished {
                    break;
                }
            }
        });

        Self { requests, lines }
    }

    /// Reads the next line. Once the source is finished this keeps returning EOF.
    pub async fn next(&mut self) -> Result<ReadOutcome, ReplError> {
        if self.requests.send(()).is_err() {
            return Ok(ReadOutcome::Eof);
        }
        self.lines.recv().await.unwrap_or(Ok(ReadOutcome::Eof))
    }
}

/// Installs the process interrupt handler.
///
/// The returned receiver flips to `true` on the first SIGINT (Ctrl-C on
/// non-unix targets) and stays there.
pub fn interrupt_signal() -> Result<watch::Receiver<bool>, ReplError> {
    let (tx, rx) = watch::channel(false);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            if sigint.recv().await.is_some() {
                warn!("Received SIGINT");
                let _ = tx.send(true);
            }
        });
    }

    #[cfg(not(unix))]
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C");
            let _ = tx.send(true);
        }
    });

    Ok(rx)
}

/// Resolves once an interrupt has been signalled.
async fn interrupted(signal: &mut watch::Receiver<bool>) {
    let closed = signal.wait_for(|fired| *fired).await.is_err();
    if closed {
        // Nobody can signal any more.
        std::future::pending::<()>().await;
    }
}

/// Runs turns until the user interrupts or input ends.
///
/// Each turn completes before the next line is read. A panic inside a turn
/// is reported as a system error and the loop keeps going. An interrupt,
/// whether it arrives at the prompt or during a turn, ends the loop.
pub async fn run<W>(
    agent: &Agent,
    mut input: LineReader,
    mut interrupt: watch::Receiver<bool>,
    out: &mut W,
) -> Result<(), ReplError>
where
    W: Write,
{
    loop {
        debug!(state = ?TurnState::AwaitingInput, "Waiting for input");
        let line = tokio::select! {
            outcome = input.next() => match outcome? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Interrupted | ReadOutcome::Eof => break,
            },
            _ = interrupted(&mut interrupt) => break,
        };

        let input_text = line.trim();
        if input_text.is_empty() {
            continue;
        }

        let turn = AssertUnwindSafe(agent.handle_turn(input_text)).catch_unwind();
        tokio::select! {
            outcome = turn => match outcome {
                Ok(reply) => writeln!(out, "{}", reply)?,
                Err(panic) => {
                    let message = panic_message(&*panic);
                    error!(%message, "Turn panicked");
                    writeln!(out, "System error: {}", message)?;
                }
            },
            _ = interrupted(&mut interrupt) => break,
        }
        out.flush()?;
    }

    debug!(state = ?TurnState::Exiting, "Leaving interactive loop");
    writeln!(out, "\nExiting...")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_input_ends_with_eof() {
        let mut input = ScriptedInput::new(["one"]).then_interrupt();
        assert_eq!(input.read_line(PROMPT).unwrap(), ReadOutcome::Line("one".into()));
        assert_eq!(input.read_line(PROMPT).unwrap(), ReadOutcome::Interrupted);
        assert_eq!(input.read_line(PROMPT).unwrap(), ReadOutcome::Eof);
        assert_eq!(input.remaining(), 0);
    }

    #[tokio::test]
    async fn test_line_reader_serves_lines_then_eof() {
        let mut reader = LineReader::spawn(|| Ok(ScriptedInput::new(["first", "second"])));
        assert_eq!(reader.next().await.unwrap(), ReadOutcome::Line("first".into()));
        assert_eq!(reader.next().await.unwrap(), ReadOutcome::Line("second".into()));
        assert_eq!(reader.next().await.unwrap(), ReadOutcome::Eof);
        assert_eq!(reader.next().await.unwrap(), ReadOutcome::Eof);
    }

    #[tokio::test]
    async fn test_line_reader_reports_source_errors() {
        let mut reader = LineReader::spawn(|| {
            Err::<ScriptedInput, _>(ReplError::Io(std::io::Error::other("no terminal")))
        });
        assert!(matches!(reader.next().await, Err(ReplError::Io(_))));
        assert_eq!(reader.next().await.unwrap(), ReadOutcome::Eof);
    }

    #[tokio::test]
    async fn test_interrupted_waits_for_signal() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), interrupted(&mut rx))
            .await
            .unwrap();
    }
}
