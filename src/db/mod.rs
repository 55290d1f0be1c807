//! Persistence layer split across logical submodules. Every rule function here
//! takes a `&Connection`; `Library` hands them a live transaction.

mod books;
mod borrows;
mod cards;
mod connection;
mod schema;

pub(crate) use books::{adjust_stock, delete_book, insert_book, search_books, update_book_info};
pub(crate) use borrows::{close_borrow, fetch_history, lend_book};
pub(crate) use cards::{delete_card, fetch_cards, insert_card};
pub use connection::{open_database, open_in_memory, Config};
pub(crate) use schema::reset;
pub use schema::{SchemaProvider, SqliteSchema};
