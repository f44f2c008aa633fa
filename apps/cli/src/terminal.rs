//! Terminal front end: stdin prompts, REPL line parsing and event rendering.

use std::io::{self, BufRead, Write};

use client_core::{Action, ClientEvent, PageState, Prompter};
use shared::domain::{CorrectionLabel, FeedbackLabel};
use tokio::task::JoinHandle;

pub const HELP: &str = "\
Type a comment to classify it.
  /ticker SYM     set the ticker symbol echoed with the next results
  /correct        mark the last prediction as correct
  /incorrect      mark the last prediction as incorrect
  /fix LABEL      record a corrected label (e.g. positive, negative)
  /flag           flag the last prediction
  /help           show this help
  /quit           exit";

/// Asks on stdout and reads one line from stdin. End of input counts as dismissed.
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&self, question: &str) -> Option<String> {
        print!("{question}\n> ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Relay tasks started from the REPL. They must finish before the runtime is dropped.
#[derive(Default)]
pub struct PendingRelays {
    handles: Vec<JoinHandle<()>>,
}

impl PendingRelays {
    pub fn track(&mut self, handle: Option<JoinHandle<()>>) {
        self.handles.retain(|handle| !handle.is_finished());
        self.handles.extend(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub async fn drain(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Submit(String),
    SetTicker(Option<String>),
    Act(Action),
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return ReplCommand::Submit(line.trim_end_matches(['\r', '\n']).to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "ticker" if arg.is_empty() => ReplCommand::SetTicker(None),
        "ticker" => ReplCommand::SetTicker(Some(arg.to_string())),
        "correct" => ReplCommand::Act(Action::Feedback(FeedbackLabel::correct())),
        "incorrect" => ReplCommand::Act(Action::Feedback(FeedbackLabel::incorrect())),
        "fix" if !arg.is_empty() => ReplCommand::Act(Action::Correction(CorrectionLabel::new(arg))),
        "flag" => ReplCommand::Act(Action::Flag),
        "help" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(trimmed.to_string()),
    }
}

pub fn describe_event(event: &ClientEvent) -> Option<String> {
    match event {
        ClientEvent::AppVersion(version) => Some(format!("app version: {version}")),
        ClientEvent::ModelVersion(version) => Some(format!("model version: {version}")),
        ClientEvent::ResultCleared | ClientEvent::FeedbackRevealed => None,
        ClientEvent::ResultPrompt(prompt) => Some(prompt.clone()),
        ClientEvent::ResultRendered { lines, style } => {
            Some(format!("[{}] {}", style.class_name(), lines.join(" | ")))
        }
        ClientEvent::ResultFailed(message) => Some(message.clone()),
        ClientEvent::ConfirmationShown(message) => Some(format!("* {message}")),
        ClientEvent::ConfirmationHidden => None,
    }
}

pub fn describe_page(state: &PageState) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(version) = &state.app_version {
        lines.push(format!("app version: {version}"));
    }
    if let Some(version) = &state.model_version {
        lines.push(format!("model version: {version}"));
    }
    if !state.result_lines.is_empty() {
        match state.result_style {
            Some(style) => lines.push(format!(
                "[{}] {}",
                style.class_name(),
                state.result_lines.join(" | ")
            )),
            None => lines.extend(state.result_lines.iter().cloned()),
        }
    }
    lines
}
