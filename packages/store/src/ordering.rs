//! Append-at-end rank assignment for manually ordered records.
//!
//! Ranks are a total order by value, not a dense index: gaps left by deletions are
//! fine and nothing is ever renumbered. The read of existing ranks and the insert
//! that uses the result are two separate round trips, so two concurrent inserts for
//! the same user can pick the same rank. Ties fall back to the secondary sort key of
//! the list query.

/// Next rank after `existing`: `max + 1`, or `0` when there is nothing yet.
pub fn next_priority<I>(existing: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    existing
        .into_iter()
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_starts_at_zero() {
        assert_eq!(next_priority(Vec::<i64>::new()), 0);
    }

    #[test]
    fn test_sparse_input() {
        assert_eq!(next_priority([3, 1, 7]), 8);
        assert_eq!(next_priority([5]), 6);
        assert_eq!(next_priority([0, 100]), 101);
    }

    #[test]
    fn test_negative_and_duplicate_ranks() {
        assert_eq!(next_priority([-4, -2]), -1);
        assert_eq!(next_priority([2, 2, 2]), 3);
    }
}
