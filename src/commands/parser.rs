//! Chat command grammar.
//!
//! The same `til` arguments back both the chat front end and the
//! `sarathi til ...` command line.

use crate::models::{AddRequest, DEFAULT_FIND_LIMIT, DateFilter, FindRequest, TilQuery};
use crate::{Error, Result};
use clap::{Args, Parser, Subcommand};

/// Top-level chat commands.
pub const COMMANDS: [&str; 3] = ["til", "fortune", "help"];

/// One chat message, parsed.
#[derive(Debug, Parser)]
#[command(
    name = "sarathi",
    no_binary_name = true,
    disable_help_flag = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
pub struct ChatLine {
    /// The command.
    #[command(subcommand)]
    pub command: ChatCommand,
}

/// Chat commands.
#[derive(Debug, Subcommand)]
pub enum ChatCommand {
    /// Manage the today-i-learned database.
    Til {
        /// `add` or `find`.
        #[command(subcommand)]
        action: TilAction,
    },
    /// Print a random epigram.
    Fortune {
        /// Arguments passed to `fortune`.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Explain a command.
    Help {
        /// Command to explain.
        topic: Option<String>,
    },
}

impl ChatCommand {
    /// The word that selects this command.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Til { .. } => "til",
            Self::Fortune { .. } => "fortune",
            Self::Help { .. } => "help",
        }
    }
}

/// `til` subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum TilAction {
    /// Record a TIL.
    Add(AddArgs),
    /// Search recorded TILs.
    Find(FindArgs),
}

/// Arguments of `til add`.
#[derive(Debug, Clone, Default, Args)]
pub struct AddArgs {
    /// Annotation; the TIL itself when nothing else is given.
    #[arg(short = 'm', long)]
    pub message: Option<String>,

    /// Category or tag (repeatable).
    #[arg(short = 'c', long = "category")]
    pub categories: Vec<String>,

    /// Related link, recorded as its own entry (repeatable).
    #[arg(short = 'u', long = "url")]
    pub urls: Vec<String>,

    /// The fact or URL learned.
    pub value: Vec<String>,
}

/// Arguments of `til find`.
#[derive(Debug, Clone, Args)]
pub struct FindArgs {
    /// Category to search (repeatable).
    #[arg(short = 'c', long = "category")]
    pub categories: Vec<String>,

    /// Domain of URL entries (repeatable).
    #[arg(short = 'd', long = "domain")]
    pub domains: Vec<String>,

    /// `[since|before|after] N [days|weeks|months|years]`.
    #[arg(long)]
    pub date: Option<String>,

    /// Maximum number of results.
    #[arg(short = 'l', long, default_value_t = DEFAULT_FIND_LIMIT)]
    pub limit: usize,

    /// Words to look for.
    pub keywords: Vec<String>,
}

impl TilAction {
    /// Converts parsed arguments into a query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] if the date filter does not parse.
    pub fn into_query(self) -> Result<TilQuery> {
        match self {
            Self::Add(args) => {
                let value = Some(args.value.join(" ")).filter(|v| !v.trim().is_empty());
                Ok(TilQuery::Add(AddRequest {
                    value,
                    message: args.message,
                    urls: args.urls,
                    categories: args.categories,
                }))
            },
            Self::Find(args) => {
                let date = args.date.as_deref().map(str::parse::<DateFilter>).transpose()?;
                Ok(TilQuery::Find(FindRequest {
                    keywords: args.keywords,
                    categories: args.categories,
                    domains: args.domains,
                    date,
                    limit: args.limit,
                }))
            },
        }
    }
}

/// Parses tokenized chat words.
///
/// # Errors
///
/// Returns [`Error::InvalidQuery`] carrying clap's explanation.
pub fn parse_words(words: &[String]) -> Result<ChatCommand> {
    ChatLine::try_parse_from(words)
        .map(|line| line.command)
        .map_err(|e| Error::InvalidQuery(e.kind().to_string()))
}

/// Help text for `help [topic]`.
#[must_use]
pub fn help_text(topic: Option<&str>) -> String {
    match topic.map(|t| t.trim_start_matches('/').to_lowercase()).as_deref() {
        Some("til") => TIL_HELP.to_string(),
        Some("fortune") => FORTUNE_HELP.to_string(),
        Some(other) => format!("There is no help for `{other}`.\n\n{GENERAL_HELP}"),
        None => GENERAL_HELP.to_string(),
    }
}

const GENERAL_HELP: &str = "\
Sarathi, a small bot to help manage the knowledge base on the blog.

Commands:
  /til       Record and search things learned today. See `/help til`.
  /fortune   Print a random epigram. See `/help fortune`.
  /help      Show this message.";

const TIL_HELP: &str = "\
A command to help manage the today-i-learned database of the blog.

Usage:
  /til add [-m message] [-c category]... [-u url]... [value...]
  /til find [-c category]... [-d domain]... [--date filter] [-l limit] [keyword...]

Adding:
  /til add I learned that recursion is fun -c cs
  /til add https://example.com -c web
  /til add -m \"Good reads on lifetimes\" -u https://a.example -u https://b.example

Finding:
  /til find recursion
  /til find -c rust --date \"since 2 weeks\" -l 10
  /til find -d docs.rs

A TIL is matched to earlier ones ignoring case. Adding it again on a
later day records the repeat; adding it twice on one day changes nothing.";

const FORTUNE_HELP: &str = "\
Displays a pseudorandom message from a database of quotations.

Usage: /fortune [-acefilsw] [-n length] [-m pattern] [database...]

  -a  Choose from all lists of maxims.
  -c  Show the cookie file the fortune came from.
  -e  Consider all fortune files to be of equal size.
  -f  Print the list of files which would be searched.
  -i  Ignore case for -m patterns.
  -l  Long dictums only.
  -m  Print all fortunes matching the pattern.
  -n  Set the longest fortune length considered short.
  -s  Short apothegms only.
  -w  Wait before exiting, long enough to read the message.";

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_til_add() {
        let command = parse_words(&words(&[
            "til", "add", "-c", "web", "-m", "note", "-u", "https://a.example", "-c", "rust",
        ]))
        .unwrap();
        let ChatCommand::Til {
            action: TilAction::Add(args),
        } = command
        else {
            panic!("expected til add");
        };
        assert_eq!(args.categories, vec!["web", "rust"]);
        assert_eq!(args.urls, vec!["https://a.example"]);
        assert_eq!(args.message.as_deref(), Some("note"));
        assert!(args.value.is_empty());
    }

    #[test]
    fn test_add_value_words_are_joined() {
        let ChatCommand::Til { action } =
            parse_words(&words(&["til", "add", "recursion", "is", "fun"])).unwrap()
        else {
            panic!("expected til");
        };
        let TilQuery::Add(request) = action.into_query().unwrap() else {
            panic!("expected add");
        };
        assert_eq!(request.value.as_deref(), Some("recursion is fun"));
    }

    #[test]
    fn test_parse_til_find() {
        let ChatCommand::Til { action } = parse_words(&words(&[
            "til", "find", "rust", "-d", "docs.rs", "--date", "since 2 weeks", "-l", "3",
        ]))
        .unwrap() else {
            panic!("expected til");
        };
        let TilQuery::Find(request) = action.into_query().unwrap() else {
            panic!("expected find");
        };
        assert_eq!(request.keywords, vec!["rust"]);
        assert_eq!(request.domains, vec!["docs.rs"]);
        assert_eq!(request.limit, 3);
        assert_eq!(request.date.unwrap().to_string(), "since 2 weeks");
    }

    #[test]
    fn test_find_default_limit() {
        let ChatCommand::Til { action } =
            parse_words(&words(&["til", "find", "rust"])).unwrap()
        else {
            panic!("expected til");
        };
        let TilQuery::Find(request) = action.into_query().unwrap() else {
            panic!("expected find");
        };
        assert_eq!(request.limit, DEFAULT_FIND_LIMIT);
    }

    #[test]
    fn test_bad_date_filter() {
        let ChatCommand::Til { action } =
            parse_words(&words(&["til", "find", "rust", "--date", "yesterday"])).unwrap()
        else {
            panic!("expected til");
        };
        assert!(matches!(action.into_query(), Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn test_fortune_passes_flags_through() {
        let command = parse_words(&words(&["fortune", "-a", "-n", "80"])).unwrap();
        let ChatCommand::Fortune { args } = command else {
            panic!("expected fortune");
        };
        assert_eq!(args, vec!["-a", "-n", "80"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_words(&words(&["til"])).is_err());
        assert!(parse_words(&words(&["til", "remove", "x"])).is_err());
        assert!(parse_words(&words(&["til", "find", "-l", "many"])).is_err());
        assert!(parse_words(&words(&["til", "add", "--bogus"])).is_err());
    }

    #[test]
    fn test_verbs_match_commands() {
        for verb in COMMANDS {
            let mut line = vec![verb.to_string()];
            if verb == "til" {
                line.extend(words(&["find", "x"]));
            }
            assert_eq!(parse_words(&line).unwrap().verb(), verb);
        }
    }

    #[test]
    fn test_help_text() {
        assert!(help_text(None).contains("/til"));
        assert!(help_text(Some("til")).contains("/til add"));
        assert!(help_text(Some("/fortune")).contains("-n"));
        assert!(help_text(Some("nope")).starts_with("There is no help"));
    }
}
