use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::CarpoolError;
use crate::schedules::ScheduleItem;

/// A weekday a carpool group can drive on. Weekends are not offered.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
    EnumString,
)]
pub enum Workday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Workday {
    pub fn from_weekday(weekday: Weekday) -> Option<Self> {
        match weekday {
            Weekday::Mon => Some(Workday::Monday),
            Weekday::Tue => Some(Workday::Tuesday),
            Weekday::Wed => Some(Workday::Wednesday),
            Weekday::Thu => Some(Workday::Thursday),
            Weekday::Fri => Some(Workday::Friday),
            Weekday::Sat | Weekday::Sun => None,
        }
    }
}

/// Length of the window a schedule covers, in calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
#[repr(i64)]
pub enum CycleLength {
    Ten = 10,
    Twenty = 20,
    Thirty = 30,
}

impl CycleLength {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            10 => Some(Self::Ten),
            20 => Some(Self::Twenty),
            30 => Some(Self::Thirty),
            _ => None,
        }
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn days(self) -> usize {
        self as usize
    }
}

impl TryFrom<i64> for CycleLength {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_i64(value).ok_or_else(|| "cycle_days must be one of 10, 20, 30".to_string())
    }
}

impl From<CycleLength> for i64 {
    fn from(cycle: CycleLength) -> Self {
        cycle.as_i64()
    }
}

/// Every date in `[start, start + cycle - 1]` that falls on one of `days`,
/// in ascending order.
pub fn occurrence_dates(days: &[Workday], cycle: CycleLength, start: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take(cycle.days())
        .filter(|date| {
            Workday::from_weekday(date.weekday())
                .map(|day| days.contains(&day))
                .unwrap_or(false)
        })
        .collect()
}

/// Assign drivers round-robin, in member order, to each occurrence date of
/// the window starting at `start`.
///
/// The first occurrence always goes to `members[0]`; with `k` occurrences each
/// member drives `k / n` or `k / n + 1` times. An empty result is valid when no
/// selected weekday falls inside the window.
pub fn assign_drivers(
    members: &[String],
    days: &[Workday],
    cycle: CycleLength,
    start: NaiveDate,
) -> Result<Vec<ScheduleItem>, CarpoolError> {
    if members.is_empty() {
        return Err(CarpoolError::Invalid("Group has no members".to_string()));
    }
    if days.is_empty() {
        return Err(CarpoolError::Invalid(
            "Group has no valid weekdays configured".to_string(),
        ));
    }

    let items = occurrence_dates(days, cycle, start)
        .into_iter()
        .enumerate()
        .map(|(i, date)| ScheduleItem {
            date,
            driver: members[i % members.len()].clone(),
        })
        .collect();

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_workday_round_trips_through_name() {
        for day in Workday::iter() {
            let name: &str = day.as_ref();
            assert_eq!(Workday::from_str(name).unwrap(), day);
            assert_eq!(day.to_string(), name);
        }
        assert!(Workday::from_str("Saturday").is_err());
        assert_eq!(Workday::from_weekday(Weekday::Wed), Some(Workday::Wednesday));
        assert_eq!(Workday::from_weekday(Weekday::Sun), None);
    }

    #[test]
    fn test_cycle_length_conversion() {
        assert_eq!(CycleLength::from_i64(10), Some(CycleLength::Ten));
        assert_eq!(CycleLength::from_i64(30), Some(CycleLength::Thirty));
        assert_eq!(CycleLength::from_i64(15), None);
        assert_eq!(CycleLength::Twenty.as_i64(), 20);
        assert!(serde_json::from_str::<CycleLength>("7").is_err());
        assert_eq!(serde_json::to_string(&CycleLength::Ten).unwrap(), "10");
    }

    #[test]
    fn test_three_members_monday_wednesday() {
        let items = assign_drivers(
            &names(&["Alice", "Bob", "Carol"]),
            &[Workday::Monday, Workday::Wednesday],
            CycleLength::Ten,
            date("2024-01-01"),
        )
        .unwrap();

        let expected = vec![
            ScheduleItem { date: date("2024-01-01"), driver: "Alice".into() },
            ScheduleItem { date: date("2024-01-03"), driver: "Bob".into() },
            ScheduleItem { date: date("2024-01-08"), driver: "Carol".into() },
            ScheduleItem { date: date("2024-01-10"), driver: "Alice".into() },
        ];
        assert_eq!(items, expected);
    }

    #[test]
    fn test_single_friday_in_window() {
        // 2024-01-12 is a Friday but falls on day 12 of a 10-day window
        let items = assign_drivers(
            &names(&["A"]),
            &[Workday::Friday],
            CycleLength::Ten,
            date("2024-01-01"),
        )
        .unwrap();

        assert_eq!(
            items,
            vec![ScheduleItem { date: date("2024-01-05"), driver: "A".into() }]
        );
    }

    #[test]
    fn test_weekend_start_reaches_next_week() {
        let dates = occurrence_dates(&[Workday::Friday], CycleLength::Ten, date("2024-01-06"));
        assert_eq!(dates, vec![date("2024-01-12")]);
    }

    #[test]
    fn test_no_occurrence_in_window_yields_empty() {
        // No calendar days remain after the last representable date
        let items = assign_drivers(
            &names(&["A", "B"]),
            &[Workday::Monday],
            CycleLength::Ten,
            NaiveDate::MAX,
        )
        .unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_rejects_empty_inputs() {
        let err = assign_drivers(&[], &[Workday::Monday], CycleLength::Ten, date("2024-01-01"));
        assert!(matches!(err, Err(CarpoolError::Invalid(_))));

        let err = assign_drivers(&names(&["A"]), &[], CycleLength::Ten, date("2024-01-01"));
        assert!(matches!(err, Err(CarpoolError::Invalid(_))));
    }

    #[test]
    fn test_thirty_day_cycle_all_weekdays() {
        let all: Vec<Workday> = Workday::iter().collect();
        let items = assign_drivers(&names(&["A", "B"]), &all, CycleLength::Thirty, date("2024-01-01"))
            .unwrap();

        // January 1-30, 2024 holds 22 weekdays
        assert_eq!(items.len(), 22);
        assert_eq!(items.last().unwrap().date, date("2024-01-30"));
        assert_eq!(items.iter().filter(|i| i.driver == "A").count(), 11);
    }

    fn workday_set() -> impl Strategy<Value = Vec<Workday>> {
        proptest::sample::subsequence(Workday::iter().collect::<Vec<_>>(), 1..=5)
    }

    fn cycle() -> impl Strategy<Value = CycleLength> {
        prop_oneof![
            Just(CycleLength::Ten),
            Just(CycleLength::Twenty),
            Just(CycleLength::Thirty),
        ]
    }

    fn start_date() -> impl Strategy<Value = NaiveDate> {
        (0i64..3650).prop_map(|offset| date("2020-01-01") + chrono::Duration::days(offset))
    }

    proptest! {
        #[test]
        fn prop_items_inside_window_sorted_on_selected_days(
            member_count in 1usize..8,
            days in workday_set(),
            cycle in cycle(),
            start in start_date(),
        ) {
            let members: Vec<String> = (0..member_count).map(|i| format!("m{}", i)).collect();
            let items = assign_drivers(&members, &days, cycle, start).unwrap();
            let window_end = start + chrono::Duration::days(cycle.as_i64() - 1);

            for item in &items {
                prop_assert!(item.date >= start && item.date <= window_end);
                let day = Workday::from_weekday(item.date.weekday());
                prop_assert!(day.map(|d| days.contains(&d)).unwrap_or(false));
                prop_assert!(members.contains(&item.driver));
            }
            for pair in items.windows(2) {
                prop_assert!(pair[0].date < pair[1].date);
            }
        }

        #[test]
        fn prop_round_robin_is_fair(
            member_count in 1usize..8,
            days in workday_set(),
            cycle in cycle(),
            start in start_date(),
        ) {
            let members: Vec<String> = (0..member_count).map(|i| format!("m{}", i)).collect();
            let items = assign_drivers(&members, &days, cycle, start).unwrap();
            let k = items.len();

            if let Some(first) = items.first() {
                prop_assert_eq!(&first.driver, &members[0]);
            }
            for member in &members {
                let turns = items.iter().filter(|i| &i.driver == member).count();
                prop_assert!(turns == k / member_count || turns == k.div_ceil(member_count));
            }
        }
    }
}
