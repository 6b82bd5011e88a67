//! Chat-style command front end.
//!
//! A chat line is tokenized with shell-like quoting, parsed with clap into
//! a [`ChatCommand`], and dispatched to the services. Errors the user can
//! act on come back as replies; configuration errors and defects do not.
//!
//! ```text
//! /til add https://example.com -c web
//! /til find -d example.com --date "since 2 weeks"
//! /fortune -s
//! /help til
//! ```

mod dispatcher;
mod parser;
mod tokenizer;

pub use dispatcher::{Dispatcher, EXTERNAL_APOLOGY, STORAGE_APOLOGY, SYNC_APOLOGY};
pub use parser::{
    AddArgs, COMMANDS, ChatCommand, ChatLine, FindArgs, TilAction, help_text, parse_words,
};
pub use tokenizer::tokenize;
