use chrono::NaiveDate;
use log::{info, warn};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::CarpoolError;
use crate::groups::Group;
use crate::rotation;

/// One driving assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub date: NaiveDate,
    pub driver: String,
}

/// A generated driver rotation for one group.
///
/// `end_date` is the date of the last item, or `start_date` when the window
/// held no selected weekday. The schedule is active through `end_date`
/// inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub items: Vec<ScheduleItem>,
}

/// Returned instead of a new schedule when the group's existing schedule is
/// still active. Carries the existing schedule so the caller can show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConflict {
    pub message: String,
    pub schedule: Schedule,
}

impl Schedule {
    pub fn from_items(start_date: NaiveDate, items: Vec<ScheduleItem>) -> Self {
        let end_date = items.last().map(|item| item.date).unwrap_or(start_date);
        Schedule {
            start_date,
            end_date,
            items,
        }
    }

    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        today <= self.end_date
    }

    // ========================================
    // Schedule store
    // ========================================

    pub fn get_for_group(conn: &Connection, group_id: i64) -> Result<Option<Self>, CarpoolError> {
        let window = conn
            .query_row(
                "SELECT start_date, end_date FROM schedules WHERE group_id = ?",
                [group_id],
                |row| Ok((row.get::<_, NaiveDate>(0)?, row.get::<_, NaiveDate>(1)?)),
            )
            .optional()?;

        let (start_date, end_date) = match window {
            Some(w) => w,
            None => return Ok(None),
        };

        let mut stmt = conn.prepare(
            "SELECT item_date, driver
             FROM schedule_items
             WHERE group_id = ?
             ORDER BY item_date ASC",
        )?;
        let items = stmt
            .query_map([group_id], |row| {
                Ok(ScheduleItem {
                    date: row.get(0)?,
                    driver: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Schedule {
            start_date,
            end_date,
            items,
        }))
    }

    /// Replace whatever schedule `group_id` has with this one.
    ///
    /// IMPORTANT: Caller must hold an immediate transaction
    pub fn put_immediate(&self, conn: &Connection, group_id: i64) -> Result<(), CarpoolError> {
        let now = chrono::Utc::now().timestamp();

        conn.execute("DELETE FROM schedule_items WHERE group_id = ?", [group_id])?;
        conn.execute(
            "INSERT OR REPLACE INTO schedules (group_id, start_date, end_date, generated_at)
             VALUES (?, ?, ?, ?)",
            rusqlite::params![group_id, self.start_date, self.end_date, now],
        )?;

        let mut stmt = conn.prepare(
            "INSERT INTO schedule_items (group_id, item_date, driver) VALUES (?, ?, ?)",
        )?;
        for item in &self.items {
            stmt.execute(rusqlite::params![group_id, item.date, item.driver])?;
        }

        Ok(())
    }

    /// The stored schedule of the named group.
    pub fn get_by_group_name(conn: &Connection, group_name: &str) -> Result<Self, CarpoolError> {
        let group = Group::require_by_name(conn, group_name)?;
        Self::get_for_group(conn, group.group_id)?
            .ok_or_else(|| CarpoolError::ScheduleNotFound(group_name.to_string()))
    }

    // ========================================
    // Generation
    // ========================================

    /// Generate a schedule for `group_name` starting at `start_date`, judging
    /// whether the existing schedule is active against the local calendar date.
    pub fn generate(
        conn: &Connection,
        group_name: &str,
        start_date: NaiveDate,
    ) -> Result<Vec<ScheduleItem>, CarpoolError> {
        let today = chrono::Local::now().date_naive();
        Database::immediate_transaction(conn, |c| {
            Self::generate_immediate(c, group_name, start_date, today)
        })
    }

    /// Check-and-replace step of generation.
    ///
    /// If the group's stored schedule is still active on `today`, nothing is
    /// written and `ScheduleActive` is returned with that schedule. Otherwise a
    /// new rotation is computed from the group's current members, days and
    /// cycle and fully replaces the stored one.
    ///
    /// IMPORTANT: Caller must hold an immediate transaction. The lock is what
    /// keeps two generators for the same group from both passing the check.
    pub fn generate_immediate(
        conn: &Connection,
        group_name: &str,
        start_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Vec<ScheduleItem>, CarpoolError> {
        let group = Group::require_by_name(conn, group_name)?;

        if let Some(existing) = Self::get_for_group(conn, group.group_id)? {
            if existing.is_active_on(today) {
                warn!(
                    "Refusing to regenerate schedule for '{}': active until {}",
                    group_name, existing.end_date
                );
                return Err(CarpoolError::ScheduleActive(Box::new(ScheduleConflict {
                    message: format!(
                        "Schedule already generated and active until {}",
                        existing.end_date
                    ),
                    schedule: existing,
                })));
            }
        }

        let items = rotation::assign_drivers(
            &group.member_names(),
            &group.days,
            group.cycle_days,
            start_date,
        )?;

        let schedule = Schedule::from_items(start_date, items);
        schedule.put_immediate(conn, group.group_id)?;

        info!(
            "Generated schedule for '{}': {} items from {} to {}",
            group_name,
            schedule.items.len(),
            schedule.start_date,
            schedule.end_date
        );

        Ok(schedule.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::tests::{open_temp, params};
    use crate::groups::{CreateGroupParams, Member};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Barrier};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn create_group(db: &Database, p: CreateGroupParams) -> Group {
        let conn = db.get_connection().unwrap();
        Database::immediate_transaction(&conn, |c| Group::create_immediate(c, p)).unwrap()
    }

    fn generate_on(
        db: &Database,
        name: &str,
        start: &str,
        today: &str,
    ) -> Result<Vec<ScheduleItem>, CarpoolError> {
        let conn = db.get_connection().unwrap();
        Database::immediate_transaction(&conn, |c| {
            Schedule::generate_immediate(c, name, date(start), date(today))
        })
    }

    fn carpool_group(db: &Database) -> Group {
        create_group(
            db,
            params("Carpool", &["Alice", "Bob", "Carol"], &["Monday", "Wednesday"], 10),
        )
    }

    #[test]
    fn test_from_items_end_date() {
        let items = vec![
            ScheduleItem { date: date("2024-01-01"), driver: "A".into() },
            ScheduleItem { date: date("2024-01-05"), driver: "B".into() },
        ];
        let schedule = Schedule::from_items(date("2024-01-01"), items);
        assert_eq!(schedule.end_date, date("2024-01-05"));

        let empty = Schedule::from_items(date("2024-01-01"), Vec::new());
        assert_eq!(empty.end_date, date("2024-01-01"));
    }

    #[test]
    fn test_active_through_end_date_inclusive() {
        let schedule = Schedule::from_items(
            date("2024-01-01"),
            vec![ScheduleItem { date: date("2024-01-10"), driver: "A".into() }],
        );
        assert!(schedule.is_active_on(date("2024-01-05")));
        assert!(schedule.is_active_on(date("2024-01-10")));
        assert!(!schedule.is_active_on(date("2024-01-11")));
    }

    #[test]
    fn test_generate_persists_schedule() {
        let (_dir, db) = open_temp();
        carpool_group(&db);

        let items = generate_on(&db, "Carpool", "2024-01-01", "2024-01-01").unwrap();
        let drivers: Vec<&str> = items.iter().map(|i| i.driver.as_str()).collect();
        assert_eq!(drivers, vec!["Alice", "Bob", "Carol", "Alice"]);

        let conn = db.get_connection().unwrap();
        let stored = Schedule::get_by_group_name(&conn, "Carpool").unwrap();
        assert_eq!(stored.start_date, date("2024-01-01"));
        assert_eq!(stored.end_date, date("2024-01-10"));
        assert_eq!(stored.items, items);
    }

    #[test]
    fn test_active_schedule_blocks_regeneration() {
        let (_dir, db) = open_temp();
        carpool_group(&db);
        generate_on(&db, "Carpool", "2024-01-01", "2024-01-01").unwrap();

        let conn = db.get_connection().unwrap();
        let before = Schedule::get_by_group_name(&conn, "Carpool").unwrap();

        let first = generate_on(&db, "Carpool", "2024-01-05", "2024-01-05");
        let second = generate_on(&db, "Carpool", "2024-01-05", "2024-01-05");

        let first = match first {
            Err(CarpoolError::ScheduleActive(conflict)) => conflict,
            other => panic!("expected conflict, got {:?}", other),
        };
        let second = match second {
            Err(CarpoolError::ScheduleActive(conflict)) => conflict,
            other => panic!("expected conflict, got {:?}", other),
        };

        assert_eq!(
            first.message,
            "Schedule already generated and active until 2024-01-10"
        );
        assert_eq!(first.schedule, before);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(Schedule::get_by_group_name(&conn, "Carpool").unwrap(), before);
    }

    #[test]
    fn test_expired_schedule_is_replaced() {
        let (_dir, db) = open_temp();
        carpool_group(&db);
        generate_on(&db, "Carpool", "2024-01-01", "2024-01-01").unwrap();

        let items = generate_on(&db, "Carpool", "2024-01-15", "2024-01-11").unwrap();
        assert_eq!(items.first().unwrap().date, date("2024-01-15"));

        let conn = db.get_connection().unwrap();
        let stored = Schedule::get_by_group_name(&conn, "Carpool").unwrap();
        assert_eq!(stored.start_date, date("2024-01-15"));
        assert_eq!(stored.end_date, date("2024-01-24"));
        assert!(stored.items.iter().all(|i| i.date >= date("2024-01-15")));
        assert_eq!(stored.items, items);
    }

    #[test]
    fn test_missing_group_is_not_found() {
        let (_dir, db) = open_temp();

        let result = generate_on(&db, "Nobody", "2024-01-01", "2024-01-01");
        assert!(matches!(result, Err(CarpoolError::GroupNotFound(_))));

        let conn = db.get_connection().unwrap();
        let result = Schedule::get_by_group_name(&conn, "Nobody");
        assert!(matches!(result, Err(CarpoolError::GroupNotFound(_))));
    }

    #[test]
    fn test_group_without_schedule() {
        let (_dir, db) = open_temp();
        carpool_group(&db);

        let conn = db.get_connection().unwrap();
        let result = Schedule::get_by_group_name(&conn, "Carpool");
        assert!(matches!(result, Err(CarpoolError::ScheduleNotFound(_))));
    }

    #[test]
    fn test_delete_group_removes_schedule() {
        let (_dir, db) = open_temp();
        let group = carpool_group(&db);
        generate_on(&db, "Carpool", "2024-01-01", "2024-01-01").unwrap();

        let conn = db.get_connection().unwrap();
        Database::immediate_transaction(&conn, |c| Group::delete_immediate(c, "Carpool")).unwrap();

        assert!(Schedule::get_for_group(&conn, group.group_id).unwrap().is_none());
        let orphans: i64 = conn
            .query_row("SELECT COUNT(*) FROM schedule_items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_single_member_friday() {
        let (_dir, db) = open_temp();
        create_group(
            &db,
            CreateGroupParams {
                name: "Solo".to_string(),
                members: vec![Member {
                    name: "A".to_string(),
                    email: Some("a@example.com".to_string()),
                }],
                days: vec!["Friday".to_string()],
                cycle_days: 10,
            },
        );

        let items = generate_on(&db, "Solo", "2024-01-01", "2024-01-01").unwrap();
        assert_eq!(
            items,
            vec![ScheduleItem { date: date("2024-01-05"), driver: "A".into() }]
        );

        let conn = db.get_connection().unwrap();
        let stored = Schedule::get_by_group_name(&conn, "Solo").unwrap();
        assert_eq!(stored.end_date, date("2024-01-05"));
    }

    #[test]
    fn test_concurrent_generation_has_one_winner() {
        let (_dir, db) = open_temp();
        carpool_group(&db);

        let barrier = Arc::new(Barrier::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = db.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    generate_on(&db, "Carpool", "2024-01-01", "2024-01-01")
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(CarpoolError::ScheduleActive(_))))
            .count();

        assert_eq!(winners, 1);
        assert_eq!(conflicts, 3);
    }

    #[test]
    fn test_active_schedule_is_frozen_snapshot() {
        let (_dir, db) = open_temp();
        carpool_group(&db);
        let items = generate_on(&db, "Carpool", "2024-01-01", "2024-01-01").unwrap();

        let conn = db.get_connection().unwrap();
        conn.execute(
            "UPDATE group_members SET member_name = 'Zed' WHERE position = 0",
            [],
        )
        .unwrap();

        let stored = Schedule::get_by_group_name(&conn, "Carpool").unwrap();
        assert_eq!(stored.items, items);
    }
}
