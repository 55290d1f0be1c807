//! The uniform envelope every `Library` operation returns.

use std::fmt;

use crate::error::{ErrorKind, LibraryError};
use crate::models::{Book, BookQueryResults, BorrowHistories, CardList};

#[derive(Debug, Clone, PartialEq)]
/// Typed data returned alongside a successful result.
pub enum Payload {
    /// The record just stored, with its generated id.
    Book(Book),
    Books(BookQueryResults),
    Cards(CardList),
    History(BorrowHistories),
}

#[derive(Debug, Clone, PartialEq)]
/// Outcome of one engine operation. Callers never see a `Result`; they check
/// `ok` and then read either `message` or `payload`.
pub struct ApiResult {
    pub ok: bool,
    /// Human-readable summary. Always present on failure.
    pub message: Option<String>,
    /// Query results, or the stored record for `store_book`.
    pub payload: Option<Payload>,
    /// Set exactly when `ok` is false.
    pub error: Option<ErrorKind>,
}

impl ApiResult {
    /// Successful mutation with a summary message and no data.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: Some(message.into()),
            payload: None,
            error: None,
        }
    }

    /// Successful query carrying its results.
    pub fn with_payload(payload: Payload) -> Self {
        Self {
            ok: true,
            message: None,
            payload: Some(payload),
            error: None,
        }
    }

    /// Attach a payload to a result that already carries a message.
    pub fn and_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Rolled back operation. The message is the error's `Display` form.
    pub fn failure(err: &LibraryError) -> Self {
        Self {
            ok: false,
            message: Some(err.to_string()),
            payload: None,
            error: Some(err.kind()),
        }
    }

    pub fn book(&self) -> Option<&Book> {
        match &self.payload {
            Some(Payload::Book(book)) => Some(book),
            _ => None,
        }
    }

    pub fn books(&self) -> Option<&BookQueryResults> {
        match &self.payload {
            Some(Payload::Books(books)) => Some(books),
            _ => None,
        }
    }

    pub fn cards(&self) -> Option<&CardList> {
        match &self.payload {
            Some(Payload::Cards(cards)) => Some(cards),
            _ => None,
        }
    }

    pub fn history(&self) -> Option<&BorrowHistories> {
        match &self.payload {
            Some(Payload::History(items)) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for ApiResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, &self.message) {
            (Some(kind), Some(message)) => writeln!(f, "FAILED ({kind}): {message}")?,
            (Some(kind), None) => writeln!(f, "FAILED ({kind})")?,
            (None, Some(message)) => writeln!(f, "OK: {message}")?,
            (None, None) => writeln!(f, "OK")?,
        }

        match &self.payload {
            Some(Payload::Book(book)) => writeln!(f, "  {book}")?,
            Some(Payload::Books(books)) => {
                for book in &books.results {
                    writeln!(f, "  {book}")?;
                }
                writeln!(f, "  ({} books)", books.count())?;
            }
            Some(Payload::Cards(cards)) => {
                for card in &cards.cards {
                    writeln!(f, "  {card}")?;
                }
                writeln!(f, "  ({} cards)", cards.count())?;
            }
            Some(Payload::History(history)) => {
                for item in &history.items {
                    writeln!(f, "  {item}")?;
                }
                writeln!(f, "  ({} records)", history.count())?;
            }
            None => {}
        }
        Ok(())
    }
}
