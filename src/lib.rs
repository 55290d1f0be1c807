//! Library management backend: book inventory, card holders and borrow/return
//! bookkeeping on top of an embedded SQLite store.
//!
//! `Library` is the entry point. Every operation runs as one transaction and
//! answers with an `ApiResult` envelope instead of a `Result`, so the shell and
//! other callers can print or inspect outcomes uniformly.
pub mod db;
pub mod error;
pub mod library;
pub mod models;
pub mod query;
pub mod result;

pub use db::{open_database, Config, SchemaProvider, SqliteSchema};
pub use error::{ErrorKind, LibraryError};
pub use library::Library;
pub use models::{
    Book, BookQueryResults, Borrow, BorrowHistories, BorrowHistoryItem, Card, CardList, CardType,
};
pub use query::{BookQueryConditions, SortColumn, SortOrder};
pub use result::{ApiResult, Payload};
