//! Console commands and event rendering.

use std::io::BufRead;

use anyhow::{bail, Context, Result};
use crossbeam_channel::Sender;
use tracing::{debug, warn};

use streamkit_ipc::{PipelineCommand, PipelineEvent, PipelineState};

/// A line typed at the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Status,
    Quit,
}

impl From<ConsoleCommand> for PipelineCommand {
    fn from(command: ConsoleCommand) -> Self {
        match command {
            ConsoleCommand::Start => PipelineCommand::Start,
            ConsoleCommand::Stop => PipelineCommand::Stop,
            ConsoleCommand::Status => PipelineCommand::GetState,
            ConsoleCommand::Quit => PipelineCommand::Shutdown,
        }
    }
}

/// Parse one console line. Blank lines are `None`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>> {
    let command = match line.trim().to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "start" => ConsoleCommand::Start,
        "stop" => ConsoleCommand::Stop,
        "status" | "state" => ConsoleCommand::Status,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => bail!("Unknown command '{other}' (expected start, stop, status or quit)"),
    };
    Ok(Some(command))
}

/// Forward console lines to the service until `quit` or end of input.
pub fn run_console<R: BufRead>(input: R, command_tx: &Sender<PipelineCommand>) -> Result<()> {
    for line in input.lines() {
        let line = line.context("Failed to read console input")?;

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        debug!(?command, "Console command");
        command_tx
            .send(command.into())
            .context("Pipeline service is not running")?;

        if command == ConsoleCommand::Quit {
            return Ok(());
        }
    }

    if command_tx.send(PipelineCommand::Shutdown).is_err() {
        warn!("Pipeline service already stopped");
    }
    Ok(())
}

/// One-line rendering of a service event.
pub fn describe_event(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::StateChanged { previous, current } if previous == current => {
            format!("state: {}", describe_state(current))
        }
        PipelineEvent::StateChanged { previous, current } => {
            format!("state: {} -> {}", previous.name(), describe_state(current))
        }
        PipelineEvent::Error {
            recoverable,
            message,
        } => {
            if *recoverable {
                format!("error: {message}")
            } else {
                format!("fatal: {message}")
            }
        }
        PipelineEvent::Ready => "ready".to_string(),
        PipelineEvent::Shutdown => "shutdown".to_string(),
    }
}

fn describe_state(state: &PipelineState) -> String {
    match state {
        PipelineState::Building { phase } => format!("Building ({})", phase.name()),
        PipelineState::Idle { output_id } | PipelineState::Live { output_id } => {
            format!("{} ({output_id})", state.name())
        }
        PipelineState::Error { message, .. } => format!("Error ({message})"),
        PipelineState::Uninitialized => state.name().to_string(),
    }
}
