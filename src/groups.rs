use std::str::FromStr;

use log::info;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::CarpoolError;
use crate::rotation::{CycleLength, Workday};

/// A carpool member. Member order within a group is the rotation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Parameters for creating a new group, as received from a caller.
/// Nothing here has been validated yet.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGroupParams {
    pub name: String,
    pub members: Vec<Member>,
    pub days: Vec<String>,
    pub cycle_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(rename = "id")]
    pub group_id: i64,
    pub name: String,
    pub members: Vec<Member>,
    pub days: Vec<Workday>,
    pub cycle_days: CycleLength,
}

impl CreateGroupParams {
    /// Trim and validate the request, producing the values that get stored.
    ///
    /// Member names must be non-empty after trimming and blank emails become
    /// `None`. Days are trimmed and de-duplicated in first-seen order.
    fn normalize(self) -> Result<(String, Vec<Member>, Vec<Workday>, CycleLength), CarpoolError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(CarpoolError::Invalid("name cannot be empty".to_string()));
        }

        if self.members.is_empty() {
            return Err(CarpoolError::Invalid(
                "members must have at least one value".to_string(),
            ));
        }
        let members = self
            .members
            .into_iter()
            .map(|m| {
                let member_name = m.name.trim().to_string();
                if member_name.is_empty() {
                    return Err(CarpoolError::Invalid(
                        "member name cannot be empty".to_string(),
                    ));
                }
                let email = m
                    .email
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty());
                Ok(Member {
                    name: member_name,
                    email,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut days: Vec<Workday> = Vec::new();
        let mut invalid: Vec<String> = Vec::new();
        for raw in &self.days {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match Workday::from_str(raw) {
                Ok(day) if !days.contains(&day) => days.push(day),
                Ok(_) => {}
                Err(_) => invalid.push(raw.to_string()),
            }
        }
        if !invalid.is_empty() {
            return Err(CarpoolError::Invalid(format!(
                "invalid days: {:?}; allowed: Monday, Tuesday, Wednesday, Thursday, Friday",
                invalid
            )));
        }
        if days.is_empty() {
            return Err(CarpoolError::Invalid(
                "days must include at least one weekday".to_string(),
            ));
        }

        let cycle_days = CycleLength::from_i64(self.cycle_days).ok_or_else(|| {
            CarpoolError::Invalid("cycle_days must be one of 10, 20, 30".to_string())
        })?;

        Ok((name, members, days, cycle_days))
    }
}

impl Group {
    pub fn member_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    /// Create a group after validating `params`.
    ///
    /// IMPORTANT: Caller must hold an immediate transaction
    pub fn create_immediate(conn: &Connection, params: CreateGroupParams) -> Result<Self, CarpoolError> {
        let (name, members, days, cycle_days) = params.normalize()?;

        if Self::get_id_by_name(conn, &name)?.is_some() {
            return Err(CarpoolError::GroupExists(name));
        }

        let now = chrono::Utc::now().timestamp();
        let days_json = serde_json::to_string(&days)
            .map_err(|e| CarpoolError::Error(format!("Failed to encode days: {}", e)))?;

        let group_id: i64 = conn.query_row(
            "INSERT INTO carpool_groups (group_name, days_of_week, cycle_days, created_at)
             VALUES (?, ?, ?, ?)
             RETURNING group_id",
            rusqlite::params![name, days_json, cycle_days.as_i64(), now],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "INSERT INTO group_members (group_id, position, member_name, member_email)
             VALUES (?, ?, ?, ?)",
        )?;
        for (position, member) in members.iter().enumerate() {
            stmt.execute(rusqlite::params![
                group_id,
                position as i64,
                member.name,
                member.email
            ])?;
        }

        info!(
            "Created group '{}' (id: {}) with {} members",
            name,
            group_id,
            members.len()
        );

        Ok(Group {
            group_id,
            name,
            members,
            days,
            cycle_days,
        })
    }

    fn get_id_by_name(conn: &Connection, name: &str) -> Result<Option<i64>, CarpoolError> {
        conn.query_row(
            "SELECT group_id FROM carpool_groups WHERE group_name = ?",
            [name],
            |row| row.get(0),
        )
        .optional()
        .map_err(CarpoolError::DatabaseError)
    }

    pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Self>, CarpoolError> {
        let row = conn
            .query_row(
                "SELECT group_id, group_name, days_of_week, cycle_days
                 FROM carpool_groups
                 WHERE group_name = ?",
                [name],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((group_id, group_name, days_json, cycle_days)) => Ok(Some(Self::from_parts(
                conn, group_id, group_name, &days_json, cycle_days,
            )?)),
            None => Ok(None),
        }
    }

    /// Like `get_by_name`, but a missing group is an error.
    pub fn require_by_name(conn: &Connection, name: &str) -> Result<Self, CarpoolError> {
        Self::get_by_name(conn, name)?.ok_or_else(|| CarpoolError::GroupNotFound(name.to_string()))
    }

    /// All groups, in creation order
    pub fn list(conn: &Connection) -> Result<Vec<Self>, CarpoolError> {
        let mut stmt = conn.prepare(
            "SELECT group_id, group_name, days_of_week, cycle_days
             FROM carpool_groups
             ORDER BY group_id ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(group_id, group_name, days_json, cycle_days)| {
                Self::from_parts(conn, group_id, group_name, &days_json, cycle_days)
            })
            .collect()
    }

    /// Delete a group along with its members and any stored schedule.
    ///
    /// IMPORTANT: Caller must hold an immediate transaction
    pub fn delete_immediate(conn: &Connection, name: &str) -> Result<(), CarpoolError> {
        let group_id = Self::get_id_by_name(conn, name)?
            .ok_or_else(|| CarpoolError::GroupNotFound(name.to_string()))?;

        // Children first so the deletes hold even without foreign_keys enabled
        conn.execute("DELETE FROM schedule_items WHERE group_id = ?", [group_id])?;
        conn.execute("DELETE FROM schedules WHERE group_id = ?", [group_id])?;
        conn.execute("DELETE FROM group_members WHERE group_id = ?", [group_id])?;
        conn.execute("DELETE FROM carpool_groups WHERE group_id = ?", [group_id])?;

        info!("Deleted group '{}' (id: {})", name, group_id);
        Ok(())
    }

    /// Distinct member names across all groups, sorted. These are the
    /// drivers a rider may ask for on an on-demand request.
    pub fn available_drivers(conn: &Connection) -> Result<Vec<String>, CarpoolError> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT member_name FROM group_members ORDER BY member_name ASC",
        )?;

        let drivers = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(drivers)
    }

    fn from_parts(
        conn: &Connection,
        group_id: i64,
        name: String,
        days_json: &str,
        cycle_days: i64,
    ) -> Result<Self, CarpoolError> {
        let days: Vec<Workday> = serde_json::from_str(days_json).map_err(|e| {
            CarpoolError::Error(format!(
                "Corrupt days_of_week for group {}: {}",
                group_id, e
            ))
        })?;

        let cycle_days = CycleLength::from_i64(cycle_days).ok_or_else(|| {
            CarpoolError::Error(format!(
                "Corrupt cycle_days {} for group {}",
                cycle_days, group_id
            ))
        })?;

        let mut stmt = conn.prepare(
            "SELECT member_name, member_email
             FROM group_members
             WHERE group_id = ?
             ORDER BY position ASC",
        )?;
        let members = stmt
            .query_map([group_id], |row| {
                Ok(Member {
                    name: row.get(0)?,
                    email: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Group {
            group_id,
            name,
            members,
            days,
            cycle_days,
        })
    }
}
