use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{map_unique_constraint, LibraryError, Result};
use crate::models::{Card, CardType};

/// Message shared by the explicit duplicate check and the constraint fallback.
fn duplicate_message(card: &Card) -> String {
    format!(
        "a {} card for {} in {} already exists",
        card.card_type, card.name, card.department
    )
}

/// Whether a card with this id is registered. Borrowing checks this before it
/// looks at stock.
pub(crate) fn card_exists(conn: &Connection, card_id: i64) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM card WHERE card_id = ?1", [card_id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Register a card and return its id. The same holder may own one card per
/// type, so the duplicate check covers name, department and type together.
pub(crate) fn insert_card(conn: &Connection, card: &Card) -> Result<i64> {
    let existing = conn
        .query_row(
            "SELECT card_id FROM card WHERE name = ?1 AND department = ?2 AND type = ?3",
            params![card.name, card.department, card.card_type.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    if existing.is_some() {
        return Err(LibraryError::DuplicateEntity(duplicate_message(card)));
    }

    conn.execute(
        "INSERT INTO card (name, department, type) VALUES (?1, ?2, ?3)",
        params![card.name, card.department, card.card_type.as_str()],
    )
    .map_err(|err| map_unique_constraint(err, || duplicate_message(card)))?;

    Ok(conn.last_insert_rowid())
}

/// Remove a card that holds no outstanding borrow. Its returned borrows are
/// removed by the schema's cascade.
pub(crate) fn delete_card(conn: &Connection, card_id: i64) -> Result<()> {
    let outstanding: i64 = conn.query_row(
        "SELECT COUNT(*) FROM borrow WHERE card_id = ?1 AND return_time = 0",
        [card_id],
        |row| row.get(0),
    )?;
    if outstanding > 0 {
        return Err(LibraryError::Conflict(format!(
            "card {card_id} still holds {outstanding} unreturned book(s)"
        )));
    }

    let deleted = conn.execute("DELETE FROM card WHERE card_id = ?1", [card_id])?;
    if deleted == 0 {
        Err(LibraryError::NotFound(format!("card {card_id} does not exist")))
    } else {
        Ok(())
    }
}

/// Every card in ascending id order. A `type` value other than the known
/// letters is reported as inconsistent storage.
pub(crate) fn fetch_cards(conn: &Connection) -> Result<Vec<Card>> {
    let mut stmt =
        conn.prepare("SELECT card_id, name, department, type FROM card ORDER BY card_id")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut cards = Vec::with_capacity(rows.len());
    for (id, name, department, raw_type) in rows {
        cards.push(Card {
            id,
            name,
            department,
            card_type: raw_type.parse::<CardType>()?,
        });
    }
    Ok(cards)
}
