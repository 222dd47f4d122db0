use chrono::{Datelike, Days, NaiveDate, Weekday};

/// `date` plus `days` working days (Monday to Friday). Holidays are not modeled.
///
/// Starting on a weekend counts from the next Monday.
pub fn add_business_days(date: NaiveDate, days: u32) -> NaiveDate {
    let mut current = date;
    let mut remaining = days;
    while remaining > 0 {
        let Some(next) = current.checked_add_days(Days::new(1)) else {
            return current;
        };
        current = next;
        if !is_weekend(current) {
            remaining -= 1;
        }
    }
    current
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn ten_business_days_span_two_weekends() {
        // Monday 2025-06-02 + 10 working days = Monday 2025-06-16.
        assert_eq!(add_business_days(date(2025, 6, 2), 10), date(2025, 6, 16));
    }

    #[test]
    fn friday_plus_one_is_monday() {
        assert_eq!(add_business_days(date(2025, 6, 6), 1), date(2025, 6, 9));
    }

    #[test]
    fn zero_days_is_identity() {
        assert_eq!(add_business_days(date(2025, 6, 7), 0), date(2025, 6, 7));
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn result_is_a_weekday_after_start(offset in 0u64..3_000, days in 1u32..60) {
            let start = date(2020, 1, 1).checked_add_days(Days::new(offset)).unwrap();
            let end = add_business_days(start, days);
            prop_assert!(end > start);
            prop_assert!(!is_weekend(end));
            // Calendar span is at least the business days and at most ~7/5 of them plus a weekend.
            let span = (end - start).num_days();
            prop_assert!(span >= days as i64);
            prop_assert!(span <= (days as i64) * 7 / 5 + 3);
        }
    }
}
