//! What the bot sends back.

use super::{EntryKind, TilEntry};
use std::fmt;

/// Description shown for a URL entry that has no title.
pub const NO_PAGE_TITLE: &str = "No Page Title";

/// A compact rich item, one per TIL in search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// Heading, e.g. `URL TIL @ 2023-01-01`.
    pub title: String,
    /// Body text.
    pub description: String,
    /// Link target for URL entries.
    pub url: Option<String>,
}

impl Card {
    /// Renders an entry as a card.
    #[must_use]
    pub fn from_entry(entry: &TilEntry) -> Self {
        match entry.kind {
            EntryKind::Url => Self {
                title: format!("URL TIL @ {}", entry.added_on),
                description: entry
                    .title
                    .clone()
                    .unwrap_or_else(|| NO_PAGE_TITLE.to_string()),
                url: Some(entry.value.clone()),
            },
            EntryKind::Factoid => Self {
                title: format!("Factoid TIL @ {}", entry.added_on),
                description: entry.value.clone(),
                url: None,
            },
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "**{}**\n{}", self.title, self.description)?;
        if let Some(url) = &self.url {
            write!(f, "\n<{url}>")?;
        }
        Ok(())
    }
}

/// One message of a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyItem {
    /// Plain text.
    Text(String),
    /// A rich card.
    Card(Card),
}

impl fmt::Display for ReplyItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Card(card) => write!(f, "{card}"),
        }
    }
}

/// An ordered list of messages, sent one after another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    items: Vec<ReplyItem>,
}

impl Reply {
    /// A reply made of a single text message.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            items: vec![ReplyItem::Text(text.into())],
        }
    }

    /// Appends a text message.
    pub fn push_text(&mut self, text: impl Into<String>) {
        self.items.push(ReplyItem::Text(text.into()));
    }

    /// Appends a card.
    pub fn push_card(&mut self, card: Card) {
        self.items.push(ReplyItem::Card(card));
    }

    /// Returns the messages in order.
    #[must_use]
    pub fn items(&self) -> &[ReplyItem] {
        &self.items
    }

    /// Returns the cards only.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.items.iter().filter_map(|item| match item {
            ReplyItem::Card(card) => Some(card),
            ReplyItem::Text(_) => None,
        })
    }

    /// Returns the text messages only.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            ReplyItem::Text(text) => Some(text.as_str()),
            ReplyItem::Card(_) => None,
        })
    }

    /// Returns true if any text message contains `needle`.
    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        self.texts().any(|text| text.contains(needle))
    }

    /// Returns true if the reply has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
                writeln!(f)?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_card_from_url_entry() {
        let day = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let entry = TilEntry::new("https://example.com", Vec::<String>::new(), day);
        let card = Card::from_entry(&entry);
        assert_eq!(card.title, "URL TIL @ 2023-01-01");
        assert_eq!(card.description, NO_PAGE_TITLE);
        assert_eq!(card.url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_card_from_factoid() {
        let day = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let entry = TilEntry::new("Crabs walk sideways", Vec::<String>::new(), day);
        let card = Card::from_entry(&entry);
        assert_eq!(card.title, "Factoid TIL @ 2023-01-01");
        assert_eq!(card.description, "Crabs walk sideways");
        assert!(card.url.is_none());
    }

    #[test]
    fn test_reply_display() {
        let mut reply = Reply::text("Found 2 matching TILs.");
        reply.push_card(Card {
            title: "Factoid TIL @ 2023-01-01".to_string(),
            description: "foo".to_string(),
            url: None,
        });
        assert_eq!(
            reply.to_string(),
            "Found 2 matching TILs.\n\n**Factoid TIL @ 2023-01-01**\nfoo"
        );
        assert_eq!(reply.cards().count(), 1);
        assert!(reply.mentions("matching"));
    }
}
