use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::error::{map_unique_constraint, LibraryError, Result};
use crate::models::Book;
use crate::query::BookQueryConditions;

/// Column list shared by every book query so `book_from_row` can rely on the
/// positional order.
const BOOK_COLUMNS: &str = "book_id, category, title, press, publish_year, author, price, stock";

/// Map a row selected with `BOOK_COLUMNS` into a `Book`.
pub(crate) fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        category: row.get(1)?,
        title: row.get(2)?,
        press: row.get(3)?,
        publish_year: row.get(4)?,
        author: row.get(5)?,
        price: row.get(6)?,
        stock: row.get(7)?,
    })
}

/// Load one book by id. `None` lets callers pick the error that fits their
/// operation instead of forcing a generic "not found".
pub(crate) fn fetch_book(conn: &Connection, book_id: i64) -> Result<Option<Book>> {
    let book = conn
        .query_row(
            &format!("SELECT {BOOK_COLUMNS} FROM book WHERE book_id = ?1"),
            [book_id],
            book_from_row,
        )
        .optional()?;
    Ok(book)
}

/// Existence check that avoids hydrating the whole row.
fn book_exists(conn: &Connection, book_id: i64) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM book WHERE book_id = ?1", [book_id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Message shared by the explicit duplicate check and the constraint fallback.
fn duplicate_message(book: &Book) -> String {
    format!(
        "the book \"{}\" by {} ({}, {}) already exists in the library",
        book.title, book.author, book.press, book.publish_year
    )
}

/// Reject negative and NaN prices before they reach the table's `CHECK`.
fn check_price(price: f64) -> Result<()> {
    if price.is_nan() || price < 0.0 {
        Err(LibraryError::InvalidArgument(format!(
            "price must be a non-negative number, got {price}"
        )))
    } else {
        Ok(())
    }
}

/// Insert a new book and return its id. Fails when another book already has
/// the same category, title, press, year and author.
pub(crate) fn insert_book(conn: &Connection, book: &Book) -> Result<i64> {
    check_price(book.price)?;
    if book.stock < 0 {
        return Err(LibraryError::InvalidArgument(format!(
            "initial stock must not be negative, got {}",
            book.stock
        )));
    }

    let existing = conn
        .query_row(
            "SELECT book_id FROM book
             WHERE category = ?1 AND title = ?2 AND press = ?3
               AND publish_year = ?4 AND author = ?5",
            params![book.category, book.title, book.press, book.publish_year, book.author],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    if existing.is_some() {
        return Err(LibraryError::DuplicateEntity(duplicate_message(book)));
    }

    conn.execute(
        "INSERT INTO book (category, title, press, publish_year, author, price, stock)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            book.category,
            book.title,
            book.press,
            book.publish_year,
            book.author,
            book.price,
            book.stock
        ],
    )
    .map_err(|err| map_unique_constraint(err, || duplicate_message(book)))?;

    Ok(conn.last_insert_rowid())
}

/// Apply `delta` to the stock as a single relative update so concurrent
/// adjustments cannot overwrite each other. SQLite evaluates the sum in 64-bit
/// integers, so the guard also keeps the result inside `i32` for the read-back.
pub(crate) fn adjust_stock(conn: &Connection, book_id: i64, delta: i32) -> Result<i32> {
    let updated = conn.execute(
        "UPDATE book SET stock = stock + ?1
         WHERE book_id = ?2 AND stock + ?1 >= 0 AND stock + ?1 <= ?3",
        params![delta, book_id, i32::MAX],
    )?;

    if updated == 0 {
        return match fetch_book(conn, book_id)? {
            None => Err(LibraryError::NotFound(format!("book {book_id} does not exist"))),
            Some(book) => Err(LibraryError::InvalidArgument(format!(
                "stock of book {book_id} cannot become {} (current {}, delta {delta})",
                i64::from(book.stock) + i64::from(delta),
                book.stock
            ))),
        };
    }

    let stock = conn.query_row("SELECT stock FROM book WHERE book_id = ?1", [book_id], |row| {
        row.get(0)
    })?;
    Ok(stock)
}

/// Delete a book that nobody currently holds. Returned borrow records go with
/// it through the schema's cascade.
pub(crate) fn delete_book(conn: &Connection, book_id: i64) -> Result<()> {
    let outstanding: i64 = conn.query_row(
        "SELECT COUNT(*) FROM borrow WHERE book_id = ?1 AND return_time = 0",
        [book_id],
        |row| row.get(0),
    )?;
    if outstanding > 0 {
        return Err(LibraryError::Conflict(format!(
            "book {book_id} still has {outstanding} outstanding borrow(s)"
        )));
    }

    let deleted = conn.execute("DELETE FROM book WHERE book_id = ?1", [book_id])?;
    if deleted == 0 {
        Err(LibraryError::NotFound(format!("book {book_id} does not exist")))
    } else {
        Ok(())
    }
}

/// Overwrite every descriptive field. Stock is never touched here.
pub(crate) fn update_book_info(conn: &Connection, book: &Book) -> Result<()> {
    check_price(book.price)?;
    if !book_exists(conn, book.id)? {
        return Err(LibraryError::NotFound(format!("book {} does not exist", book.id)));
    }

    conn.execute(
        "UPDATE book
         SET category = ?1, title = ?2, press = ?3, publish_year = ?4, author = ?5, price = ?6
         WHERE book_id = ?7",
        params![
            book.category,
            book.title,
            book.press,
            book.publish_year,
            book.author,
            book.price,
            book.id
        ],
    )
    .map_err(|err| map_unique_constraint(err, || duplicate_message(book)))?;

    Ok(())
}

/// Fetch books matching `conditions`, sorted by the requested column with
/// ascending id as the tie-break.
pub(crate) fn search_books(
    conn: &Connection,
    conditions: &BookQueryConditions,
) -> Result<Vec<Book>> {
    let filters = conditions.filters();
    let sql = format!(
        "SELECT {BOOK_COLUMNS} FROM book{}",
        BookQueryConditions::where_clause(&filters)
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut books = stmt
        .query_map(params_from_iter(filters.iter().map(|f| &f.value)), book_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    books.sort_by(|lhs, rhs| conditions.compare(lhs, rhs));
    Ok(books)
}
