pub const SCHEMA_VERSION: &str = "1";

pub const CREATE_SCHEMA_SQL: &str = r#"
BEGIN TRANSACTION;

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', '1');

-- Carpool groups. Member order lives in group_members.position
CREATE TABLE IF NOT EXISTS carpool_groups (
    group_id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_name TEXT NOT NULL UNIQUE,
    days_of_week TEXT NOT NULL,        -- JSON array of day names, e.g. '["Monday","Wednesday"]'
    cycle_days INTEGER NOT NULL CHECK (cycle_days IN (10, 20, 30)),
    created_at INTEGER NOT NULL        -- Unix timestamp (UTC)
);

CREATE TABLE IF NOT EXISTS group_members (
    group_id INTEGER NOT NULL,
    position INTEGER NOT NULL,         -- Rotation order, 0-based
    member_name TEXT NOT NULL,
    member_email TEXT DEFAULT NULL,
    PRIMARY KEY (group_id, position),
    FOREIGN KEY (group_id) REFERENCES carpool_groups(group_id) ON DELETE CASCADE
);

-- At most one schedule per group; replaced wholesale on regeneration
CREATE TABLE IF NOT EXISTS schedules (
    group_id INTEGER PRIMARY KEY,
    start_date TEXT NOT NULL,          -- YYYY-MM-DD
    end_date TEXT NOT NULL,            -- YYYY-MM-DD, inclusive
    generated_at INTEGER NOT NULL,     -- Unix timestamp (UTC)
    FOREIGN KEY (group_id) REFERENCES carpool_groups(group_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS schedule_items (
    group_id INTEGER NOT NULL,
    item_date TEXT NOT NULL,           -- YYYY-MM-DD
    driver TEXT NOT NULL,
    PRIMARY KEY (group_id, item_date),
    FOREIGN KEY (group_id) REFERENCES schedules(group_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS on_demand_requests (
    request_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_email TEXT NOT NULL,
    origin TEXT NOT NULL,
    origin_lat REAL DEFAULT NULL,
    origin_lng REAL DEFAULT NULL,
    destination TEXT NOT NULL,
    dest_lat REAL DEFAULT NULL,
    dest_lng REAL DEFAULT NULL,
    dest_place_id TEXT DEFAULT NULL,
    dest_address TEXT DEFAULT NULL,
    request_date TEXT NOT NULL,        -- YYYY-MM-DD
    preferred_driver TEXT DEFAULT NULL,
    created_at INTEGER NOT NULL        -- Unix timestamp (UTC)
);

CREATE INDEX IF NOT EXISTS idx_on_demand_user ON on_demand_requests (user_email);

COMMIT;
"#;
