use rusqlite::{params, Connection, OptionalExtension};

use super::books::fetch_book;
use super::cards::card_exists;
use crate::error::{map_constraint_violation, LibraryError, Result};
use crate::models::{Book, Borrow, BorrowHistoryItem};

/// Borrow time of the open record for (book, card), if one exists. There is at
/// most one because lending refuses a second outstanding borrow.
fn outstanding_borrow_time(conn: &Connection, book_id: i64, card_id: i64) -> Result<Option<i64>> {
    let time = conn
        .query_row(
            "SELECT borrow_time FROM borrow
             WHERE book_id = ?1 AND card_id = ?2 AND return_time = 0",
            params![book_id, card_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(time)
}

/// Lend a book to a card. Checks run in a fixed order: book, card, an
/// already outstanding borrow for the pair, then stock.
pub(crate) fn lend_book(conn: &Connection, borrow: &Borrow) -> Result<()> {
    let book = fetch_book(conn, borrow.book_id)?
        .ok_or_else(|| LibraryError::NotFound(format!("book {} does not exist", borrow.book_id)))?;

    if !card_exists(conn, borrow.card_id)? {
        return Err(LibraryError::NotFound(format!(
            "card {} does not exist",
            borrow.card_id
        )));
    }

    if outstanding_borrow_time(conn, borrow.book_id, borrow.card_id)?.is_some() {
        return Err(LibraryError::Conflict(format!(
            "card {} has already borrowed book {} and not returned it",
            borrow.card_id, borrow.book_id
        )));
    }

    if book.stock <= 0 {
        return Err(out_of_stock(&book));
    }

    // (card, book, borrow_time) is the primary key, so re-borrowing at the
    // timestamp of an earlier, already returned record collides here.
    conn.execute(
        "INSERT INTO borrow (card_id, book_id, borrow_time, return_time) VALUES (?1, ?2, ?3, 0)",
        params![borrow.card_id, borrow.book_id, borrow.borrow_time],
    )
    .map_err(|err| {
        map_constraint_violation(err, || {
            LibraryError::Conflict(format!(
                "card {} already has a borrow of book {} recorded at time {}",
                borrow.card_id, borrow.book_id, borrow.borrow_time
            ))
        })
    })?;

    let updated = conn.execute(
        "UPDATE book SET stock = stock - 1 WHERE book_id = ?1 AND stock > 0",
        [borrow.book_id],
    )?;
    if updated == 0 {
        return Err(out_of_stock(&book));
    }

    Ok(())
}

/// Error for a book whose shelf is empty.
fn out_of_stock(book: &Book) -> LibraryError {
    LibraryError::OutOfStock(format!("no copies of book {} are left", book.id))
}

/// Close the outstanding borrow for (book, card) and put the copy back.
pub(crate) fn close_borrow(conn: &Connection, borrow: &Borrow) -> Result<()> {
    let borrow_time = outstanding_borrow_time(conn, borrow.book_id, borrow.card_id)?.ok_or_else(|| {
        LibraryError::NotFound(format!(
            "card {} has no outstanding borrow of book {}",
            borrow.card_id, borrow.book_id
        ))
    })?;

    if borrow.return_time <= borrow_time {
        return Err(LibraryError::InvalidArgument(format!(
            "return time {} must be later than borrow time {borrow_time}",
            borrow.return_time
        )));
    }

    conn.execute(
        "UPDATE borrow SET return_time = ?1
         WHERE card_id = ?2 AND book_id = ?3 AND borrow_time = ?4",
        params![borrow.return_time, borrow.card_id, borrow.book_id, borrow_time],
    )?;

    conn.execute(
        "UPDATE book SET stock = stock + 1 WHERE book_id = ?1",
        [borrow.book_id],
    )?;

    Ok(())
}

/// All borrows of a card joined with their books, newest first and then by
/// book id. A borrow whose book cannot be resolved is an inconsistency.
pub(crate) fn fetch_history(conn: &Connection, card_id: i64) -> Result<Vec<BorrowHistoryItem>> {
    let mut stmt = conn.prepare(
        "SELECT br.card_id, br.book_id, br.borrow_time, br.return_time,
                bk.book_id, bk.category, bk.title, bk.press, bk.publish_year,
                bk.author, bk.price, bk.stock
         FROM borrow br
         LEFT JOIN book bk ON bk.book_id = br.book_id
         WHERE br.card_id = ?1
         ORDER BY br.borrow_time DESC, br.book_id ASC",
    )?;

    let rows = stmt
        .query_map([card_id], |row| {
            let borrow = Borrow {
                card_id: row.get(0)?,
                book_id: row.get(1)?,
                borrow_time: row.get(2)?,
                return_time: row.get(3)?,
            };
            let book = match row.get::<_, Option<i64>>(4)? {
                None => None,
                Some(id) => Some(Book {
                    id,
                    category: row.get(5)?,
                    title: row.get(6)?,
                    press: row.get(7)?,
                    publish_year: row.get(8)?,
                    author: row.get(9)?,
                    price: row.get(10)?,
                    stock: row.get(11)?,
                }),
            };
            Ok((borrow, book))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut items = Vec::with_capacity(rows.len());
    for (borrow, book) in rows {
        let book = book.ok_or_else(|| {
            LibraryError::Inconsistent(format!(
                "borrow record references missing book {}",
                borrow.book_id
            ))
        })?;
        items.push(BorrowHistoryItem::from_parts(borrow, book));
    }
    Ok(items)
}
