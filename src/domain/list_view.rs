//! Search, status filter and ordering over a user's todo list.
//!
//! All functions here are pure: they take the caller's full list (as
//! returned by the repository, newest first) and produce the view the
//! client asked for.

use std::cmp::Ordering;
use std::str::FromStr;

use super::todo::{Todo, TodoStatus};

// =============================================================================
// Status Filter
// =============================================================================

/// Which todos to keep by status.
///
/// Valid values are "all", "pending", "done" (case-insensitive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    /// Keep every todo.
    #[default]
    All,
    /// Keep only pending todos.
    Pending,
    /// Keep only finished todos.
    Done,
}

impl StatusFilter {
    /// Returns `true` if a todo with `status` passes the filter.
    #[must_use]
    pub const fn accepts(self, status: TodoStatus) -> bool {
        matches!(
            (self, status),
            (Self::All, _) | (Self::Pending, TodoStatus::Pending) | (Self::Done, TodoStatus::Done)
        )
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "done" => Ok(Self::Done),
            other => Err(format!(
                "Invalid status filter '{other}'. Valid values are: all, pending, done"
            )),
        }
    }
}

impl<'de> serde::Deserialize<'de> for StatusFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::from_str(&value).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Sort Order
// =============================================================================

/// Ordering of the returned list.
///
/// Valid values are "newest", "deadline" (case-insensitive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Most recently created first.
    #[default]
    Newest,
    /// Earliest deadline first; todos without a deadline last.
    Deadline,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "deadline" => Ok(Self::Deadline),
            other => Err(format!(
                "Invalid sort order '{other}'. Valid values are: newest, deadline"
            )),
        }
    }
}

impl<'de> serde::Deserialize<'de> for SortOrder {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::from_str(&value).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// View
// =============================================================================

/// A complete list-view request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoQuery {
    /// Case-insensitive substring to look for in the text. Empty matches all.
    pub search: String,
    /// Status filter.
    pub status: StatusFilter,
    /// Ordering.
    pub sort: SortOrder,
}

impl TodoQuery {
    /// Returns `true` if `todo` matches the search text and status filter.
    #[must_use]
    pub fn matches(&self, todo: &Todo) -> bool {
        self.status.accepts(todo.status()) && matches_search(&todo.text, &self.search)
    }

    /// Filters and orders `todos`.
    #[must_use]
    pub fn apply(&self, todos: Vec<Todo>) -> Vec<Todo> {
        let mut selected: Vec<Todo> = todos.into_iter().filter(|todo| self.matches(todo)).collect();
        sort_todos(&mut selected, self.sort);
        selected
    }
}

/// Case-insensitive substring match; an empty needle matches.
///
/// Whitespace in the needle is significant.
#[must_use]
pub fn matches_search(text: &str, search: &str) -> bool {
    search.is_empty() || text.to_lowercase().contains(&search.to_lowercase())
}

/// Sorts `todos` in place. Both orders are stable.
pub fn sort_todos(todos: &mut [Todo], order: SortOrder) {
    match order {
        SortOrder::Newest => todos.sort_by(|left, right| right.created_at.cmp(&left.created_at)),
        SortOrder::Deadline => {
            todos.sort_by(|left, right| right.created_at.cmp(&left.created_at));
            todos.sort_by(compare_deadlines);
        }
    }
}

fn compare_deadlines(left: &Todo, right: &Todo) -> Ordering {
    match (&left.deadline, &right.deadline) {
        (Some(left), Some(right)) => left.cmp(right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Timestamp, TodoId, UserId};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use rstest::rstest;

    fn at(day: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 7, day, 12, 0, 0).unwrap())
    }

    fn todo(text: &str, created: u32, deadline: Option<u32>) -> Todo {
        Todo::new(
            TodoId::generate(),
            UserId::generate(),
            text,
            deadline.map(at),
            at(created),
        )
    }

    fn texts(todos: &[Todo]) -> Vec<&str> {
        todos.iter().map(|todo| todo.text.as_str()).collect()
    }

    #[rstest]
    #[case("Buy Milk", "milk", true)]
    #[case("Buy Milk", "MILK", true)]
    #[case("Buy Milk", "", true)]
    #[case("Buy Milk", "   ", false)]
    #[case("Buy Milk", "buy ", true)]
    #[case("Buymilk", "buy ", false)]
    #[case("Buy Milk", " milk", true)]
    #[case("Buy Milk", "bread", false)]
    fn test_matches_search(#[case] text: &str, #[case] search: &str, #[case] expected: bool) {
        assert_eq!(matches_search(text, search), expected);
    }

    #[rstest]
    #[case(StatusFilter::All, TodoStatus::Pending, true)]
    #[case(StatusFilter::All, TodoStatus::Done, true)]
    #[case(StatusFilter::Pending, TodoStatus::Pending, true)]
    #[case(StatusFilter::Pending, TodoStatus::Done, false)]
    #[case(StatusFilter::Done, TodoStatus::Done, true)]
    #[case(StatusFilter::Done, TodoStatus::Pending, false)]
    fn test_status_filter_accepts(
        #[case] filter: StatusFilter,
        #[case] status: TodoStatus,
        #[case] expected: bool,
    ) {
        assert_eq!(filter.accepts(status), expected);
    }

    #[rstest]
    #[case("all", StatusFilter::All)]
    #[case("PENDING", StatusFilter::Pending)]
    #[case("Done", StatusFilter::Done)]
    fn test_status_filter_from_str(#[case] input: &str, #[case] expected: StatusFilter) {
        assert_eq!(input.parse::<StatusFilter>(), Ok(expected));
    }

    #[rstest]
    fn test_unknown_values_are_rejected() {
        assert!("finished".parse::<StatusFilter>().is_err());
        assert!("oldest".parse::<SortOrder>().is_err());
    }

    #[rstest]
    fn test_newest_first() {
        let mut todos = vec![todo("a", 1, None), todo("c", 3, None), todo("b", 2, None)];
        sort_todos(&mut todos, SortOrder::Newest);
        assert_eq!(texts(&todos), vec!["c", "b", "a"]);
    }

    #[rstest]
    fn test_deadline_order_puts_missing_deadlines_last() {
        let mut todos = vec![
            todo("no-deadline-old", 1, None),
            todo("late", 2, Some(20)),
            todo("no-deadline-new", 3, None),
            todo("soon", 4, Some(10)),
        ];
        sort_todos(&mut todos, SortOrder::Deadline);
        assert_eq!(
            texts(&todos),
            vec!["soon", "late", "no-deadline-new", "no-deadline-old"]
        );
    }

    #[rstest]
    fn test_deadline_ties_keep_newest_first() {
        let mut todos = vec![todo("older", 1, Some(9)), todo("newer", 2, Some(9))];
        sort_todos(&mut todos, SortOrder::Deadline);
        assert_eq!(texts(&todos), vec!["newer", "older"]);
    }

    #[rstest]
    fn test_apply_combines_search_filter_and_sort() {
        let finished = todo("Report draft", 2, Some(5)).toggled(TodoStatus::Pending, at(3));
        let todos = vec![
            todo("Report final", 1, Some(8)),
            finished,
            todo("Groceries", 3, Some(4)),
        ];
        let query = TodoQuery {
            search: "report".to_string(),
            status: StatusFilter::Pending,
            sort: SortOrder::Deadline,
        };
        assert_eq!(texts(&query.apply(todos)), vec!["Report final"]);
    }

    proptest! {
        #[test]
        fn prop_apply_never_adds_and_always_matches(
            entries in proptest::collection::vec((1u32..28, proptest::option::of(1u32..28), any::<bool>()), 0..30),
            search in "[a-c]{0,2}",
        ) {
            let todos: Vec<Todo> = entries
                .iter()
                .enumerate()
                .map(|(index, (created, deadline, done))| {
                    let item = todo(&format!("item-{}", ["a", "b", "c"][index % 3]), *created, *deadline);
                    if *done { item.toggled(TodoStatus::Pending, at(28)) } else { item }
                })
                .collect();
            let query = TodoQuery { search, status: StatusFilter::Done, sort: SortOrder::Deadline };
            let view = query.apply(todos.clone());

            prop_assert!(view.len() <= todos.len());
            prop_assert!(view.iter().all(|item| query.matches(item)));
            prop_assert!(view.windows(2).all(|pair| compare_deadlines(&pair[0], &pair[1]) != Ordering::Greater));
        }
    }
}
