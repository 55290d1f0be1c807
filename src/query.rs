//! Book search conditions. Each optional field becomes at most one SQL filter,
//! and the sort directive becomes a single total order over `Book`.

use std::cmp::Ordering;

use rusqlite::types::Value;

use crate::models::Book;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    BookId,
    Category,
    Title,
    Press,
    PublishYear,
    Author,
    Price,
    Stock,
}

impl SortColumn {
    fn compare(self, lhs: &Book, rhs: &Book) -> Ordering {
        match self {
            SortColumn::BookId => lhs.id.cmp(&rhs.id),
            SortColumn::Category => lhs.category.cmp(&rhs.category),
            SortColumn::Title => lhs.title.cmp(&rhs.title),
            SortColumn::Press => lhs.press.cmp(&rhs.press),
            SortColumn::PublishYear => lhs.publish_year.cmp(&rhs.publish_year),
            SortColumn::Author => lhs.author.cmp(&rhs.author),
            SortColumn::Price => lhs.price.total_cmp(&rhs.price),
            SortColumn::Stock => lhs.stock.cmp(&rhs.stock),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// One `WHERE` fragment and the value bound to its single placeholder.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Filter {
    pub clause: &'static str,
    pub value: Value,
}

impl Filter {
    fn new(clause: &'static str, value: Value) -> Self {
        Self { clause, value }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookQueryConditions {
    /// Exact match.
    pub category: Option<String>,
    /// Case-sensitive substring match.
    pub title: Option<String>,
    pub press: Option<String>,
    pub author: Option<String>,
    /// Inclusive bounds.
    pub min_publish_year: Option<i32>,
    pub max_publish_year: Option<i32>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort_by: SortColumn,
    pub sort_order: SortOrder,
}

impl BookQueryConditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn press(mut self, press: &str) -> Self {
        self.press = Some(press.to_string());
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn publish_year_between(mut self, min: Option<i32>, max: Option<i32>) -> Self {
        self.min_publish_year = min;
        self.max_publish_year = max;
        self
    }

    pub fn price_between(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn sort(mut self, sort_by: SortColumn, sort_order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }

    /// Filters for the conditions that are present, in a fixed order.
    pub(crate) fn filters(&self) -> Vec<Filter> {
        let text = |s: &String| Value::Text(s.clone());
        [
            self.category
                .as_ref()
                .map(|v| Filter::new("category = ?", text(v))),
            self.title
                .as_ref()
                .map(|v| Filter::new("instr(title, ?) > 0", text(v))),
            self.press
                .as_ref()
                .map(|v| Filter::new("instr(press, ?) > 0", text(v))),
            self.author
                .as_ref()
                .map(|v| Filter::new("instr(author, ?) > 0", text(v))),
            self.min_publish_year
                .map(|v| Filter::new("publish_year >= ?", Value::Integer(v.into()))),
            self.max_publish_year
                .map(|v| Filter::new("publish_year <= ?", Value::Integer(v.into()))),
            self.min_price
                .map(|v| Filter::new("price >= ?", Value::Real(v))),
            self.max_price
                .map(|v| Filter::new("price <= ?", Value::Real(v))),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// The `WHERE` clause for `filters`, empty when nothing is filtered.
    pub(crate) fn where_clause(filters: &[Filter]) -> String {
        if filters.is_empty() {
            String::new()
        } else {
            let clauses: Vec<&str> = filters.iter().map(|f| f.clause).collect();
            format!(" WHERE {}", clauses.join(" AND "))
        }
    }

    /// Requested column and direction, then ascending id on ties.
    pub fn compare(&self, lhs: &Book, rhs: &Book) -> Ordering {
        let primary = self.sort_by.compare(lhs, rhs);
        let primary = match self.sort_order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| lhs.id.cmp(&rhs.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: i64, title: &str, price: f64) -> Book {
        let mut book = Book::new("cs", title, "press", 2000, "author", price, 1);
        book.id = id;
        book
    }

    #[test]
    fn no_conditions_means_no_filters() {
        let filters = BookQueryConditions::new().filters();
        assert!(filters.is_empty());
        assert_eq!(BookQueryConditions::where_clause(&filters), "");
    }

    #[test]
    fn present_conditions_keep_clause_and_value_together() {
        let conditions = BookQueryConditions::new()
            .title("Rust")
            .price_between(None, Some(30.0));
        let filters = conditions.filters();

        assert_eq!(
            filters,
            vec![
                Filter::new("instr(title, ?) > 0", Value::Text("Rust".into())),
                Filter::new("price <= ?", Value::Real(30.0)),
            ]
        );
        assert_eq!(
            BookQueryConditions::where_clause(&filters),
            " WHERE instr(title, ?) > 0 AND price <= ?"
        );
    }

    #[test]
    fn descending_sort_still_breaks_ties_by_ascending_id() {
        let conditions = BookQueryConditions::new().sort(SortColumn::Price, SortOrder::Desc);
        let mut books = vec![book(3, "a", 10.0), book(1, "b", 10.0), book(2, "c", 20.0)];
        books.sort_by(|a, b| conditions.compare(a, b));

        let ids: Vec<i64> = books.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}
