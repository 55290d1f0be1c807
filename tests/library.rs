use std::sync::{Arc, Barrier};
use std::thread;

use library_manager::{
    Book, BookQueryConditions, Borrow, Card, CardType, Config, ErrorKind, Library, SortColumn,
    SortOrder,
};
use proptest::prelude::*;

fn library() -> Library {
    Library::open_in_memory().unwrap()
}

fn book(title: &str, stock: i32) -> Book {
    Book::new("Computer Science", title, "Tsinghua", 2019, "Knuth", 59.9, stock)
}

fn stored_book(library: &mut Library, title: &str, stock: i32) -> Book {
    let mut book = book(title, stock);
    assert!(library.store_book(&mut book).ok);
    book
}

fn registered_card(library: &mut Library, name: &str) -> Card {
    let mut card = Card::new(name, "Computer Science", CardType::Student);
    assert!(library.register_card(&mut card).ok);
    card
}

fn all_books(library: &mut Library) -> Vec<Book> {
    library
        .query_book(&BookQueryConditions::new())
        .books()
        .unwrap()
        .results
        .clone()
}

fn stock_of(library: &mut Library, book_id: i64) -> i32 {
    all_books(library)
        .into_iter()
        .find(|b| b.id == book_id)
        .unwrap()
        .stock
}

#[test]
fn storing_an_identical_book_twice_is_a_duplicate() {
    let mut library = library();
    stored_book(&mut library, "TAOCP", 1);

    let mut again = book("TAOCP", 5);
    let result = library.store_book(&mut again);

    assert!(!result.ok);
    assert_eq!(result.error, Some(ErrorKind::DuplicateEntity));
    assert_eq!(again.id, 0);
}

#[test]
fn batch_with_a_duplicate_is_rolled_back_entirely() {
    let mut library = library();
    stored_book(&mut library, "Existing", 1);

    let mut batch = vec![book("Fresh", 1), book("Existing", 2)];
    let result = library.store_books(&mut batch);

    assert_eq!(result.error, Some(ErrorKind::DuplicateEntity));
    assert!(batch.iter().all(|b| b.id == 0));
    let titles: Vec<String> = all_books(&mut library).into_iter().map(|b| b.title).collect();
    assert_eq!(titles, vec!["Existing"]);
}

#[test]
fn batch_with_an_internal_duplicate_is_rolled_back() {
    let mut library = library();
    let mut batch = vec![book("A", 1), book("B", 1), book("A", 1)];

    let result = library.store_books(&mut batch);

    assert_eq!(result.error, Some(ErrorKind::DuplicateEntity));
    assert!(all_books(&mut library).is_empty());
}

#[test]
fn clean_batch_assigns_every_id() {
    let mut library = library();
    let mut batch = vec![book("A", 1), book("B", 1)];

    assert!(library.store_books(&mut batch).ok);
    assert!(batch[0].id > 0);
    assert!(batch[1].id > batch[0].id);
}

#[test]
fn stock_adjustment_on_missing_book_is_not_found() {
    let mut library = library();
    let result = library.inc_book_stock(99, 1);
    assert_eq!(result.error, Some(ErrorKind::NotFound));
}

#[test]
fn last_copy_cannot_be_borrowed_twice_until_returned() {
    let mut library = library();
    let book = stored_book(&mut library, "Last Copy", 1);
    let first = registered_card(&mut library, "Ann");
    let second = registered_card(&mut library, "Bo");

    assert!(library.borrow_book(&Borrow::new(book.id, first.id, 100)).ok);
    assert_eq!(stock_of(&mut library, book.id), 0);

    let blocked = library.borrow_book(&Borrow::new(book.id, second.id, 110));
    assert_eq!(blocked.error, Some(ErrorKind::OutOfStock));

    assert!(library.return_book(&Borrow::returned_at(book.id, first.id, 200)).ok);
    assert_eq!(stock_of(&mut library, book.id), 1);
    assert!(library.borrow_book(&Borrow::new(book.id, second.id, 210)).ok);
}

#[test]
fn borrowing_with_an_unknown_card_is_not_found() {
    let mut library = library();
    let book = stored_book(&mut library, "Lonely", 1);

    let result = library.borrow_book(&Borrow::new(book.id, 77, 100));
    assert_eq!(result.error, Some(ErrorKind::NotFound));
}

#[test]
fn same_card_cannot_hold_two_copies_at_once() {
    let mut library = library();
    let book = stored_book(&mut library, "Popular", 3);
    let card = registered_card(&mut library, "Ann");

    assert!(library.borrow_book(&Borrow::new(book.id, card.id, 100)).ok);
    let again = library.borrow_book(&Borrow::new(book.id, card.id, 150));

    assert_eq!(again.error, Some(ErrorKind::Conflict));
    assert_eq!(stock_of(&mut library, book.id), 2);
}

#[test]
fn reborrowing_at_a_used_timestamp_is_a_conflict() {
    let mut library = library();
    let book = stored_book(&mut library, "Again", 1);
    let card = registered_card(&mut library, "Ann");

    assert!(library.borrow_book(&Borrow::new(book.id, card.id, 100)).ok);
    assert!(library.return_book(&Borrow::returned_at(book.id, card.id, 200)).ok);

    let result = library.borrow_book(&Borrow::new(book.id, card.id, 100));
    assert_eq!(result.error, Some(ErrorKind::Conflict));
    assert_eq!(stock_of(&mut library, book.id), 1);
    assert_eq!(library.show_borrow_history(card.id).history().unwrap().count(), 1);

    assert!(library.borrow_book(&Borrow::new(book.id, card.id, 300)).ok);
}

#[test]
fn stock_cannot_be_pushed_past_the_integer_range() {
    let mut library = library();
    let book = stored_book(&mut library, "Plenty", 1);

    assert!(library.inc_book_stock(book.id, i32::MAX - 1).ok);
    let result = library.inc_book_stock(book.id, 1);

    assert_eq!(result.error, Some(ErrorKind::InvalidArgument));
    assert_eq!(stock_of(&mut library, book.id), i32::MAX);
}

#[test]
fn non_increasing_return_time_is_rejected_and_changes_nothing() {
    let mut library = library();
    let book = stored_book(&mut library, "Timely", 1);
    let card = registered_card(&mut library, "Ann");
    library.borrow_book(&Borrow::new(book.id, card.id, 500));

    for return_time in [499, 500] {
        let result = library.return_book(&Borrow::returned_at(book.id, card.id, return_time));
        assert_eq!(result.error, Some(ErrorKind::InvalidArgument));
    }

    assert_eq!(stock_of(&mut library, book.id), 0);
    let history = library.show_borrow_history(card.id);
    assert_eq!(history.history().unwrap().items[0].return_time, 0);
}

#[test]
fn returning_without_an_outstanding_borrow_is_not_found() {
    let mut library = library();
    let book = stored_book(&mut library, "Never Lent", 1);
    let card = registered_card(&mut library, "Ann");

    let result = library.return_book(&Borrow::returned_at(book.id, card.id, 10));
    assert_eq!(result.error, Some(ErrorKind::NotFound));
    assert_eq!(stock_of(&mut library, book.id), 1);
}

#[test]
fn removal_is_blocked_while_a_borrow_is_outstanding() {
    let mut library = library();
    let book = stored_book(&mut library, "Held", 1);
    let card = registered_card(&mut library, "Ann");
    library.borrow_book(&Borrow::new(book.id, card.id, 100));

    assert_eq!(library.remove_book(book.id).error, Some(ErrorKind::Conflict));
    assert_eq!(library.remove_card(card.id).error, Some(ErrorKind::Conflict));

    library.return_book(&Borrow::returned_at(book.id, card.id, 200));

    assert!(library.remove_book(book.id).ok);
    assert!(library.remove_card(card.id).ok);
    assert_eq!(library.remove_book(book.id).error, Some(ErrorKind::NotFound));
    assert_eq!(library.remove_card(card.id).error, Some(ErrorKind::NotFound));
}

#[test]
fn history_is_newest_first_then_by_book_id() {
    let mut library = library();
    let a = stored_book(&mut library, "A", 2);
    let b = stored_book(&mut library, "B", 2);
    let c = stored_book(&mut library, "C", 2);
    let card = registered_card(&mut library, "Ann");

    library.borrow_book(&Borrow::new(a.id, card.id, 100));
    library.return_book(&Borrow::returned_at(a.id, card.id, 150));
    library.borrow_book(&Borrow::new(c.id, card.id, 300));
    library.borrow_book(&Borrow::new(b.id, card.id, 300));

    let result = library.show_borrow_history(card.id);
    let order: Vec<(i64, i64)> = result
        .history()
        .unwrap()
        .items
        .iter()
        .map(|item| (item.borrow_time, item.book_id))
        .collect();

    assert_eq!(order, vec![(300, b.id), (300, c.id), (100, a.id)]);
    assert_eq!(result.history().unwrap().items[2].title, "A");
}

#[test]
fn unfiltered_query_is_sorted_by_id_and_repeatable() {
    let mut library = library();
    for title in ["Z", "M", "A"] {
        stored_book(&mut library, title, 1);
    }

    let first = all_books(&mut library);
    let second = all_books(&mut library);

    let ids: Vec<i64> = first.iter().map(|b| b.id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
    assert_eq!(first, second);
}

#[test]
fn query_filters_combine_and_sort_with_tie_break() {
    let mut library = library();
    let mut books = vec![
        Book::new("Novel", "Red Sorghum", "Writers", 1987, "Mo Yan", 30.0, 1),
        Book::new("Novel", "Red Chamber", "People", 1791, "Cao Xueqin", 45.0, 1),
        Book::new("Novel", "Big Red", "Writers", 1995, "Mo Yan", 30.0, 1),
        Book::new("History", "Red Star", "Random", 1937, "Snow", 20.0, 1),
    ];
    assert!(library.store_books(&mut books).ok);

    let conditions = BookQueryConditions::new()
        .category("Novel")
        .title("Red")
        .price_between(Some(30.0), None)
        .sort(SortColumn::Price, SortOrder::Desc);
    let result = library.query_book(&conditions);
    let ids: Vec<i64> = result.books().unwrap().results.iter().map(|b| b.id).collect();

    assert_eq!(ids, vec![books[1].id, books[0].id, books[2].id]);

    let lower = library.query_book(&BookQueryConditions::new().title("red"));
    assert!(lower.ok);
    assert_eq!(lower.books().unwrap().count(), 0);
}

#[test]
fn reset_leaves_empty_collections_not_errors() {
    let mut library = library();
    let book = stored_book(&mut library, "Gone", 1);
    let card = registered_card(&mut library, "Ann");
    library.borrow_book(&Borrow::new(book.id, card.id, 1));

    assert!(library.reset_database().ok);

    let cards = library.show_cards();
    assert!(cards.ok);
    assert_eq!(cards.cards().unwrap().count(), 0);
    assert!(all_books(&mut library).is_empty());
}

#[test]
fn concurrent_borrows_of_the_last_copy_admit_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::new(dir.path().join("library.sqlite"));

    let mut setup = Library::open(&config).unwrap();
    let book = stored_book(&mut setup, "Contested", 1);
    let cards = [
        registered_card(&mut setup, "Ann"),
        registered_card(&mut setup, "Bo"),
    ];
    drop(setup);

    let barrier = Arc::new(Barrier::new(cards.len()));
    let handles: Vec<_> = cards
        .iter()
        .map(|card| {
            let config = config.clone();
            let barrier = Arc::clone(&barrier);
            let borrow = Borrow::new(book.id, card.id, 1_000);
            thread::spawn(move || {
                let mut library = Library::open(&config).unwrap();
                barrier.wait();
                library.borrow_book(&borrow)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.ok).count(), 1);
    assert!(results
        .iter()
        .any(|r| r.error == Some(ErrorKind::OutOfStock)));

    let mut check = Library::open(&config).unwrap();
    assert_eq!(stock_of(&mut check, book.id), 0);
}

proptest! {
    #[test]
    fn stock_tracks_partial_sums_and_rejects_negatives(
        initial in 0i32..10,
        deltas in prop::collection::vec(-6i32..6, 1..20),
    ) {
        let mut library = library();
        let book = stored_book(&mut library, "Counted", initial);
        let mut expected = initial;

        for delta in deltas {
            let result = library.inc_book_stock(book.id, delta);
            if expected + delta >= 0 {
                prop_assert!(result.ok);
                expected += delta;
            } else {
                prop_assert_eq!(result.error, Some(ErrorKind::InvalidArgument));
            }
            prop_assert_eq!(stock_of(&mut library, book.id), expected);
        }
    }
}
