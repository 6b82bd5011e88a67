//! Chat line dispatch.

use super::parser::{COMMANDS, ChatCommand, help_text, parse_words};
use super::tokenizer::tokenize;
use crate::models::Reply;
use crate::services::{FortuneService, TilService};
use crate::{Error, Result};
use tracing::instrument;

/// Reply for an error the user can do nothing about.
pub const STORAGE_APOLOGY: &str =
    "Sorry, something went wrong while reading or saving the TILs. Please try again later.";

/// Reply when the blog could not be brought up to date before a change.
pub const SYNC_APOLOGY: &str =
    "Sorry, I couldn't bring the blog up to date, so nothing was changed. Please try again later.";

/// Reply when a helper program failed.
pub const EXTERNAL_APOLOGY: &str = "Sorry, that command is not available right now.";

/// Routes chat lines to the services and turns results into replies.
pub struct Dispatcher {
    til: TilService,
    fortune: FortuneService,
}

impl Dispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub const fn new(til: TilService, fortune: FortuneService) -> Self {
        Self { til, fortune }
    }

    /// Handles one chat line.
    ///
    /// User mistakes, storage failures, and failed helper programs become
    /// replies. A failed publish is appended to the reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] and [`Error::Internal`] unchanged.
    #[instrument(skip(self), fields(operation = "chat.handle"))]
    pub fn handle(&self, line: &str) -> Result<Reply> {
        let mut words = match tokenize(line) {
            Ok(words) => words,
            Err(err) => return recover(err, &help_topic(line)),
        };
        let Some(first) = words.first_mut() else {
            return Ok(Reply::text(help_text(None)));
        };
        let verb = first.trim_start_matches('/').to_lowercase();
        first.clone_from(&verb);

        if !COMMANDS.contains(&verb.as_str()) {
            tracing::debug!(verb, "Unrecognized command");
            metrics::counter!("chat_commands_total", "command" => "unknown").increment(1);
            return Ok(Reply::text(format!(
                "Unrecognized command `{verb}`. Try `/help`."
            )));
        }

        let command = match parse_words(&words) {
            Ok(command) => command,
            Err(err) => {
                tracing::debug!(error = %err, verb, "Invalid chat command");
                return Ok(Reply::text(invalid_input(&verb)));
            },
        };
        if command.verb() != verb {
            return Err(Error::Internal(format!(
                "`{verb}` was parsed as `{}`",
                command.verb()
            )));
        }
        metrics::counter!("chat_commands_total", "command" => command.verb()).increment(1);

        self.run(command).or_else(|err| recover(err, &verb))
    }

    fn run(&self, command: ChatCommand) -> Result<Reply> {
        match command {
            ChatCommand::Til { action } => {
                let query = action.into_query()?;
                Ok(self.til.process(query)?.into_reply())
            },
            ChatCommand::Fortune { args } => self.fortune.run(&args).map(Reply::text),
            ChatCommand::Help { topic } => Ok(Reply::text(help_text(topic.as_deref()))),
        }
    }
}

/// Help topic for a line that could not be tokenized.
fn help_topic(line: &str) -> String {
    line.split_whitespace()
        .next()
        .map(|word| word.trim_start_matches('/').to_lowercase())
        .filter(|word| COMMANDS.contains(&word.as_str()))
        .unwrap_or_else(|| "til".to_string())
}

fn invalid_input(verb: &str) -> String {
    let topic = if verb == "help" { String::new() } else { format!(" {verb}") };
    format!("Invalid Input. Use `/help{topic}` to learn how to use this bot.")
}

/// Turns recoverable errors into replies.
fn recover(err: Error, verb: &str) -> Result<Reply> {
    match err {
        Error::InvalidQuery(message) => Ok(Reply::text(format!(
            "{message}. {}",
            invalid_input(verb)
        ))),
        err @ Error::Storage { .. } => {
            tracing::error!(error = %err, "Storage failure");
            Ok(Reply::text(STORAGE_APOLOGY))
        },
        err @ Error::Publish { .. } => {
            tracing::warn!(error = %err, "Sync failed");
            Ok(Reply::text(SYNC_APOLOGY))
        },
        err @ Error::External { .. } => {
            tracing::warn!(error = %err, "Command failed");
            Ok(Reply::text(EXTERNAL_APOLOGY))
        },
        err @ (Error::Config(_) | Error::Internal(_)) => Err(err),
    }
}
