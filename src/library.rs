//! The rules engine. Each public method is one transaction: the closure passed
//! to `transact` runs every read, check and write against the same handle, and
//! any `Err` drops the transaction, which rolls it back.

use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::db::{self, Config, SchemaProvider, SqliteSchema};
use crate::error::{LibraryError, Result};
use crate::models::{Book, BookQueryResults, Borrow, BorrowHistories, Card, CardList};
use crate::query::BookQueryConditions;
use crate::result::{ApiResult, Payload};

/// Owns the connection and the schema used for resets. Methods take `&mut self`
/// because each one holds the connection's transaction while it runs.
pub struct Library {
    conn: Connection,
    schema: Box<dyn SchemaProvider + Send>,
}

impl Library {
    /// Wrap an already prepared connection using the default schema.
    pub fn new(conn: Connection) -> Self {
        Self::with_schema(conn, Box::new(SqliteSchema))
    }

    /// Wrap a connection with a custom schema provider, e.g. one targeting a
    /// differently named set of tables.
    pub fn with_schema(conn: Connection, schema: Box<dyn SchemaProvider + Send>) -> Self {
        Self { conn, schema }
    }

    /// Open (and if needed create) the database described by `config`.
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let conn = db::open_database(config, &SqliteSchema)?;
        info!(path = %config.db_path.display(), "library database opened");
        Ok(Self::new(conn))
    }

    /// Throwaway database with the schema in place.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(db::open_in_memory(&SqliteSchema)?))
    }

    /// Run `op` inside a write transaction. The write lock is taken up front so
    /// check-then-write sequences cannot interleave with another connection.
    fn transact<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection, &dyn SchemaProvider) -> Result<T>,
    {
        self.run(TransactionBehavior::Immediate, op)
    }

    /// Run `op` inside a read transaction.
    fn read<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection, &dyn SchemaProvider) -> Result<T>,
    {
        self.run(TransactionBehavior::Deferred, op)
    }

    fn run<T, F>(&mut self, behavior: TransactionBehavior, op: F) -> Result<T>
    where
        F: FnOnce(&Connection, &dyn SchemaProvider) -> Result<T>,
    {
        let tx = self.conn.transaction_with_behavior(behavior)?;
        let value = op(&*tx, self.schema.as_ref())?;
        tx.commit()?;
        Ok(value)
    }

    /// Store one book. On success the generated id is written into `book`
    /// and the stored record is returned as the payload.
    pub fn store_book(&mut self, book: &mut Book) -> ApiResult {
        debug!(title = %book.title, author = %book.author, "storing book");
        match self.transact(|conn, _| db::insert_book(conn, book)) {
            Ok(id) => {
                book.id = id;
                info!(book_id = id, "book stored");
                ApiResult::success(format!("book {id} stored"))
                    .and_payload(Payload::Book(book.clone()))
            }
            Err(err) => failed("store_book", &err),
        }
    }

    /// Store every book or none of them. Ids are written back only after the
    /// batch commits.
    pub fn store_books(&mut self, books: &mut [Book]) -> ApiResult {
        debug!(count = books.len(), "storing book batch");
        let outcome = self.transact(|conn, _| {
            books
                .iter()
                .map(|book| db::insert_book(conn, book))
                .collect::<Result<Vec<i64>>>()
        });

        match outcome {
            Ok(ids) => {
                for (book, id) in books.iter_mut().zip(&ids) {
                    book.id = *id;
                }
                info!(count = ids.len(), "book batch stored");
                ApiResult::success(format!("{} books stored", ids.len()))
            }
            Err(err) => failed("store_books", &err),
        }
    }

    /// Add `delta` (possibly negative) to a book's stock.
    pub fn inc_book_stock(&mut self, book_id: i64, delta: i32) -> ApiResult {
        debug!(book_id, delta, "adjusting stock");
        match self.transact(|conn, _| db::adjust_stock(conn, book_id, delta)) {
            Ok(stock) => {
                info!(book_id, delta, stock, "stock adjusted");
                ApiResult::success(format!("stock of book {book_id} is now {stock}"))
            }
            Err(err) => failed("inc_book_stock", &err),
        }
    }

    /// Delete a book unless someone still holds a copy.
    pub fn remove_book(&mut self, book_id: i64) -> ApiResult {
        debug!(book_id, "removing book");
        match self.transact(|conn, _| db::delete_book(conn, book_id)) {
            Ok(()) => {
                info!(book_id, "book removed");
                ApiResult::success(format!("book {book_id} removed"))
            }
            Err(err) => failed("remove_book", &err),
        }
    }

    /// Overwrite the descriptive fields of `book.id`. Stock is left as is.
    pub fn modify_book_info(&mut self, book: &Book) -> ApiResult {
        debug!(book_id = book.id, "modifying book");
        match self.transact(|conn, _| db::update_book_info(conn, book)) {
            Ok(()) => {
                info!(book_id = book.id, "book modified");
                ApiResult::success(format!("book {} modified", book.id))
            }
            Err(err) => failed("modify_book_info", &err),
        }
    }

    /// Search books. An empty match is still a success.
    pub fn query_book(&mut self, conditions: &BookQueryConditions) -> ApiResult {
        debug!(?conditions, "querying books");
        match self.read(|conn, _| db::search_books(conn, conditions)) {
            Ok(books) => ApiResult::with_payload(Payload::Books(BookQueryResults::new(books))),
            Err(err) => failed("query_book", &err),
        }
    }

    /// Lend `borrow.book_id` to `borrow.card_id` at `borrow.borrow_time`.
    pub fn borrow_book(&mut self, borrow: &Borrow) -> ApiResult {
        debug!(book_id = borrow.book_id, card_id = borrow.card_id, "borrowing book");
        match self.transact(|conn, _| db::lend_book(conn, borrow)) {
            Ok(()) => {
                info!(book_id = borrow.book_id, card_id = borrow.card_id, "book borrowed");
                ApiResult::success(format!(
                    "book {} borrowed by card {}",
                    borrow.book_id, borrow.card_id
                ))
            }
            Err(err) => failed("borrow_book", &err),
        }
    }

    /// Close the outstanding borrow for the pair at `borrow.return_time`.
    pub fn return_book(&mut self, borrow: &Borrow) -> ApiResult {
        debug!(book_id = borrow.book_id, card_id = borrow.card_id, "returning book");
        match self.transact(|conn, _| db::close_borrow(conn, borrow)) {
            Ok(()) => {
                info!(book_id = borrow.book_id, card_id = borrow.card_id, "book returned");
                ApiResult::success(format!(
                    "book {} returned by card {}",
                    borrow.book_id, borrow.card_id
                ))
            }
            Err(err) => failed("return_book", &err),
        }
    }

    /// Every borrow of a card, newest first.
    pub fn show_borrow_history(&mut self, card_id: i64) -> ApiResult {
        debug!(card_id, "loading borrow history");
        match self.read(|conn, _| db::fetch_history(conn, card_id)) {
            Ok(items) => ApiResult::with_payload(Payload::History(BorrowHistories::new(items))),
            Err(err) => failed("show_borrow_history", &err),
        }
    }

    /// Register a card and write the generated id into `card`.
    pub fn register_card(&mut self, card: &mut Card) -> ApiResult {
        debug!(name = %card.name, department = %card.department, "registering card");
        match self.transact(|conn, _| db::insert_card(conn, card)) {
            Ok(id) => {
                card.id = id;
                info!(card_id = id, "card registered");
                ApiResult::success(format!("card {id} registered"))
            }
            Err(err) => failed("register_card", &err),
        }
    }

    /// Delete a card unless it still holds a book.
    pub fn remove_card(&mut self, card_id: i64) -> ApiResult {
        debug!(card_id, "removing card");
        match self.transact(|conn, _| db::delete_card(conn, card_id)) {
            Ok(()) => {
                info!(card_id, "card removed");
                ApiResult::success(format!("card {card_id} removed"))
            }
            Err(err) => failed("remove_card", &err),
        }
    }

    /// All cards in ascending id order.
    pub fn show_cards(&mut self) -> ApiResult {
        match self.read(|conn, _| db::fetch_cards(conn)) {
            Ok(cards) => ApiResult::with_payload(Payload::Cards(CardList::new(cards))),
            Err(err) => failed("show_cards", &err),
        }
    }

    /// Drop and recreate every table in one transaction.
    pub fn reset_database(&mut self) -> ApiResult {
        match self.transact(db::reset) {
            Ok(()) => {
                info!("database reset");
                ApiResult::success("database reset")
            }
            Err(err) => failed("reset_database", &err),
        }
    }
}

/// Log the rollback and wrap the error in a failure envelope.
fn failed(operation: &'static str, err: &LibraryError) -> ApiResult {
    warn!(operation, kind = %err.kind(), error = %err, "operation rolled back");
    ApiResult::failure(err)
}
