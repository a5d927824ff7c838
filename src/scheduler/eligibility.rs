//! Due-date eligibility.
//!
//! Comparisons are at day granularity. An item without a due date is never
//! due. The queue re-evaluates these at consumption time because a queued
//! item's due date may have been moved since it was enqueued.

use chrono::NaiveDate;

use crate::domain::SchedulableItem;

/// Due on or before the reference day.
pub fn is_due_today(item: &SchedulableItem, reference: NaiveDate) -> bool {
    item.due.is_some_and(|due| due <= reference)
}

/// Due exactly on the given day.
pub fn is_due_on(item: &SchedulableItem, day: NaiveDate) -> bool {
    item.due == Some(day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    #[test]
    fn test_due_today_and_overdue() {
        assert!(is_due_today(&SchedulableItem::new("a").with_due(day(10)), day(10)));
        assert!(is_due_today(&SchedulableItem::new("a").with_due(day(1)), day(10)));
    }

    #[test]
    fn test_future_not_due() {
        assert!(!is_due_today(&SchedulableItem::new("a").with_due(day(11)), day(10)));
    }

    #[test]
    fn test_no_due_date_not_due() {
        assert!(!is_due_today(&SchedulableItem::new("a"), day(10)));
        assert!(!is_due_on(&SchedulableItem::new("a"), day(10)));
    }

    #[test]
    fn test_due_on_exact() {
        let item = SchedulableItem::new("a").with_due(day(9));
        assert!(is_due_on(&item, day(9)));
        assert!(!is_due_on(&item, day(10)));
    }
}
