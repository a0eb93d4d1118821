use serde::Serialize;
use thiserror::Error;

use super::model::Category;

/// Why a derived view has nothing to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EmptyReason {
    #[error("no rows match the selected filters")]
    NoRows,
    #[error("no values recorded for {field}")]
    NoValues { field: Category },
    #[error("not enough data for a weekday/hour grid ({weekdays} weekdays, {columns} hour columns)")]
    InsufficientPivot { weekdays: usize, columns: usize },
    #[error("no rows have every clustering feature present")]
    NoClusterRows,
    #[error("no regions matched the polygon dataset")]
    NoMatchingRegions,
    #[error("polygon dataset contains no shapes")]
    NoShapes,
}

/// Result of every aggregation or derivation step: data, or an explicit
/// empty state the presentation layer renders as "no data".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome<T> {
    Ready(T),
    Empty(EmptyReason),
}

impl<T> Outcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Outcome::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Outcome::Ready(v) => Some(v),
            Outcome::Empty(_) => None,
        }
    }

    pub fn as_ref(&self) -> Outcome<&T> {
        match self {
            Outcome::Ready(v) => Outcome::Ready(v),
            Outcome::Empty(r) => Outcome::Empty(r.clone()),
        }
    }

    pub fn empty_reason(&self) -> Option<&EmptyReason> {
        match self {
            Outcome::Ready(_) => None,
            Outcome::Empty(r) => Some(r),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ready(v) => Outcome::Ready(f(v)),
            Outcome::Empty(r) => Outcome::Empty(r),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Outcome<U>) -> Outcome<U> {
        match self {
            Outcome::Ready(v) => f(v),
            Outcome::Empty(r) => Outcome::Empty(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_short_circuits_and_then() {
        let out: Outcome<u32> = Outcome::Empty(EmptyReason::NoRows);
        let chained = out.and_then(|v| Outcome::Ready(v + 1));
        assert_eq!(chained.empty_reason(), Some(&EmptyReason::NoRows));
    }

    #[test]
    fn reason_messages_are_readable() {
        let r = EmptyReason::InsufficientPivot { weekdays: 3, columns: 1 };
        assert_eq!(
            r.to_string(),
            "not enough data for a weekday/hour grid (3 weekdays, 1 hour columns)"
        );
        let r = EmptyReason::NoValues { field: Category::Parks };
        assert!(r.to_string().contains("parks_percent_change_from_baseline"));
    }
}
