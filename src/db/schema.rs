use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

/// Supplies the DDL the engine uses to build and rebuild its tables. Drops run
/// dependents first; creates run referenced tables first.
pub trait SchemaProvider {
    /// Drop the borrow table. Runs first because it references both others.
    fn drop_borrow(&self) -> &str;
    fn drop_book(&self) -> &str;
    fn drop_card(&self) -> &str;
    fn create_card(&self) -> &str;
    fn create_book(&self) -> &str;
    /// Create the borrow table. Runs last so its foreign keys have targets.
    fn create_borrow(&self) -> &str;

    /// Statements that create every table, in dependency order.
    fn creates(&self) -> [&str; 3] {
        [self.create_card(), self.create_book(), self.create_borrow()]
    }

    /// Statements that drop and recreate every table, in dependency order.
    fn reset_batch(&self) -> [&str; 6] {
        [
            self.drop_borrow(),
            self.drop_book(),
            self.drop_card(),
            self.create_card(),
            self.create_book(),
            self.create_borrow(),
        ]
    }
}

/// Default schema for the embedded SQLite store.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteSchema;

impl SchemaProvider for SqliteSchema {
    fn drop_borrow(&self) -> &str {
        "DROP TABLE IF EXISTS borrow"
    }

    fn drop_book(&self) -> &str {
        "DROP TABLE IF EXISTS book"
    }

    fn drop_card(&self) -> &str {
        "DROP TABLE IF EXISTS card"
    }

    fn create_card(&self) -> &str {
        "CREATE TABLE IF NOT EXISTS card (
            card_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            department TEXT NOT NULL,
            type TEXT NOT NULL,
            UNIQUE (department, type, name)
        )"
    }

    fn create_book(&self) -> &str {
        "CREATE TABLE IF NOT EXISTS book (
            book_id INTEGER PRIMARY KEY AUTOINCREMENT,
            category TEXT NOT NULL,
            title TEXT NOT NULL,
            press TEXT NOT NULL,
            publish_year INTEGER NOT NULL,
            author TEXT NOT NULL,
            price REAL NOT NULL DEFAULT 0 CHECK (price >= 0),
            stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
            UNIQUE (category, press, author, title, publish_year)
        )"
    }

    fn create_borrow(&self) -> &str {
        "CREATE TABLE IF NOT EXISTS borrow (
            card_id INTEGER NOT NULL,
            book_id INTEGER NOT NULL,
            borrow_time INTEGER NOT NULL,
            return_time INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (card_id, book_id, borrow_time),
            FOREIGN KEY (card_id) REFERENCES card(card_id) ON DELETE CASCADE ON UPDATE CASCADE,
            FOREIGN KEY (book_id) REFERENCES book(book_id) ON DELETE CASCADE ON UPDATE CASCADE
        )"
    }
}

/// Create any missing tables. Existing data is left alone.
pub(crate) fn ensure_tables(conn: &Connection, schema: &dyn SchemaProvider) -> Result<()> {
    for statement in schema.creates() {
        conn.execute(statement, [])?;
    }
    Ok(())
}

/// Run the full drop/create batch. Must be called inside a transaction so a
/// failing statement leaves the previous tables in place.
pub(crate) fn reset(conn: &Connection, schema: &dyn SchemaProvider) -> Result<()> {
    for statement in schema.reset_batch() {
        debug!(statement = first_line(statement), "running schema statement");
        conn.execute(statement, [])?;
    }
    Ok(())
}

fn first_line(statement: &str) -> &str {
    statement.lines().next().unwrap_or(statement)
}
