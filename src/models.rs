//! Domain records that mirror the SQLite schema and get passed through the
//! engine. The intent is that these types stay light-weight data holders so
//! the rules in `library` and the row mapping in `db` can evolve without the
//! callers' view of a book or card changing shape.

use std::fmt;
use std::str::FromStr;

use crate::error::LibraryError;

#[derive(Debug, Clone, PartialEq)]
/// A catalogued title. `id` is zero until the store assigns one on insert.
pub struct Book {
    /// Primary key (`book_id`). Immutable once assigned; edit and delete
    /// requests carry it back to the persistence layer.
    pub id: i64,
    /// Shelf category. Search treats it as an exact match rather than a
    /// substring so "History" does not pull in "Art History".
    pub category: String,
    /// Title as printed. Part of the uniqueness key together with category,
    /// press, year and author.
    pub title: String,
    /// Publisher name.
    pub press: String,
    /// Year of publication, kept numeric so range filters compare correctly.
    pub publish_year: i32,
    /// Author as a single display string; multi-author works list them inline.
    pub author: String,
    /// Unit price. Must not be negative.
    pub price: f64,
    /// Copies currently on the shelf. Never negative; only stock adjustment,
    /// borrowing and returning move it.
    pub stock: i32,
}

impl Book {
    /// Build an unsaved book record. The id stays zero until `store_book`
    /// writes the generated key back.
    pub fn new(
        category: &str,
        title: &str,
        press: &str,
        publish_year: i32,
        author: &str,
        price: f64,
        stock: i32,
    ) -> Self {
        Self {
            id: 0,
            category: category.to_string(),
            title: title.to_string(),
            press: press.to_string(),
            publish_year,
            author: author.to_string(),
            price,
            stock,
        }
    }
}

impl fmt::Display for Book {
    /// One-line summary used by the command shell when printing results.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{}] {} ({}, {}) by {} | {:.2} | stock {}",
            self.id,
            self.category,
            self.title,
            self.press,
            self.publish_year,
            self.author,
            self.price,
            self.stock
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Kind of card holder. Persisted as a single letter so the column stays
/// compact and the closed set is easy to validate on read.
pub enum CardType {
    Student,
    Teacher,
}

impl CardType {
    /// Storage form written to the `type` column. `FromStr` is the inverse.
    pub fn as_str(self) -> &'static str {
        match self {
            CardType::Student => "S",
            CardType::Teacher => "T",
        }
    }
}

/// Parse the storage form. Anything but `S`/`T` means the row was written by
/// something other than this engine, so it is reported as inconsistent
/// storage instead of a caller mistake.
impl FromStr for CardType {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S" => Ok(CardType::Student),
            "T" => Ok(CardType::Teacher),
            other => Err(LibraryError::Inconsistent(format!(
                "unknown card type {other:?}"
            ))),
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardType::Student => write!(f, "Student"),
            CardType::Teacher => write!(f, "Teacher"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A library card. `id` is zero until registered.
pub struct Card {
    /// Primary key (`card_id`). Borrow records reference it.
    pub id: i64,
    /// Holder's name. Two holders may share a name as long as department or
    /// card type differ.
    pub name: String,
    /// Department the holder belongs to.
    pub department: String,
    /// Student or teacher card.
    pub card_type: CardType,
}

impl Card {
    /// Build an unregistered card; `register_card` fills in the id.
    pub fn new(name: &str, department: &str, card_type: CardType) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            department: department.to_string(),
            card_type,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} ({}, {})",
            self.id, self.name, self.department, self.card_type
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// One lending of a book to a card. Timestamps are milliseconds; a
/// `return_time` of zero marks the borrow as outstanding.
pub struct Borrow {
    /// Book being lent.
    pub book_id: i64,
    /// Card the book is lent to.
    pub card_id: i64,
    /// When the book left the shelf. Together with the two ids it identifies
    /// the record, so one pair can be lent many times over.
    pub borrow_time: i64,
    /// When the book came back, or zero while it is still out.
    pub return_time: i64,
}

impl Borrow {
    /// A fresh, outstanding borrow.
    pub fn new(book_id: i64, card_id: i64, borrow_time: i64) -> Self {
        Self {
            book_id,
            card_id,
            borrow_time,
            return_time: 0,
        }
    }

    /// A borrow carrying the time it is being returned at. The borrow time is
    /// left at zero because `return_book` looks the outstanding record up by
    /// book and card.
    pub fn returned_at(book_id: i64, card_id: i64, return_time: i64) -> Self {
        Self {
            book_id,
            card_id,
            borrow_time: 0,
            return_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A borrow joined with the current details of its book. The book fields are
/// copied in so history listings do not need a second lookup per row.
pub struct BorrowHistoryItem {
    pub card_id: i64,
    pub book_id: i64,
    pub category: String,
    pub title: String,
    pub press: String,
    pub publish_year: i32,
    pub author: String,
    pub price: f64,
    pub borrow_time: i64,
    pub return_time: i64,
}

impl BorrowHistoryItem {
    /// Merge a borrow row with the book it references.
    pub(crate) fn from_parts(borrow: Borrow, book: Book) -> Self {
        Self {
            card_id: borrow.card_id,
            book_id: borrow.book_id,
            category: book.category,
            title: book.title,
            press: book.press,
            publish_year: book.publish_year,
            author: book.author,
            price: book.price,
            borrow_time: borrow.borrow_time,
            return_time: borrow.return_time,
        }
    }

    /// True while the book has not come back yet.
    pub fn is_outstanding(&self) -> bool {
        self.return_time == 0
    }
}

impl fmt::Display for BorrowHistoryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let returned = if self.is_outstanding() {
            "outstanding".to_string()
        } else {
            format!("returned {}", self.return_time)
        };
        write!(
            f,
            "book #{} {} by {} | borrowed {} | {}",
            self.book_id, self.title, self.author, self.borrow_time, returned
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Books returned by a search, already in the requested order.
pub struct BookQueryResults {
    pub results: Vec<Book>,
}

impl BookQueryResults {
    pub fn new(results: Vec<Book>) -> Self {
        Self { results }
    }

    pub fn count(&self) -> usize {
        self.results.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Every registered card in ascending id order.
pub struct CardList {
    pub cards: Vec<Card>,
}

impl CardList {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn count(&self) -> usize {
        self.cards.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// One card's borrow history, newest first.
pub struct BorrowHistories {
    pub items: Vec<BorrowHistoryItem>,
}

impl BorrowHistories {
    pub fn new(items: Vec<BorrowHistoryItem>) -> Self {
        Self { items }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }
}
