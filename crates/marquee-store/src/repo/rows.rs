//! Raw row shapes and their conversion into domain values
//!
//! Rows are read with plain column getters first and decoded afterwards, so
//! a malformed stored value surfaces as `Serialization` instead of a driver
//! error.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use marquee_core::errors::MarqueeError;
use marquee_core::model::{
    ContentTarget, DeviceCode, Display, DisplaySelector, DisplayState, Location, RedirectRule,
    Schedule,
};
use rusqlite::Row;

use crate::errors::{corrupt_row, Result};

pub const DISPLAY_COLUMNS: &str = "id, name, site_id, zone, position, state, last_seen, version, \
     properties, created_at, updated_at";

pub const DEVICE_CODE_COLUMNS: &str = "id, device_code, user_code, created_at, expires_at, \
     poll_interval_secs, activated, activated_at, display_id";

pub const RULE_COLUMNS: &str = "name, priority, selector_site_id, selector_zone, \
     selector_position, content_type, content_version, content_hash, schedule, created_at, \
     updated_at";

pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub fn from_millis(table: &str, millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| corrupt_row(table, format!("timestamp {} out of range", millis)))
}

pub fn version_to_sql(version: u64) -> Result<i64> {
    i64::try_from(version).map_err(|_| MarqueeError::Internal {
        message: format!("display version {} exceeds storage range", version),
    })
}

pub struct DisplayRow {
    id: String,
    name: String,
    site_id: String,
    zone: String,
    position: String,
    state: String,
    last_seen: Option<i64>,
    version: i64,
    properties: String,
    created_at: i64,
    updated_at: i64,
}

impl DisplayRow {
    pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            site_id: row.get(2)?,
            zone: row.get(3)?,
            position: row.get(4)?,
            state: row.get(5)?,
            last_seen: row.get(6)?,
            version: row.get(7)?,
            properties: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    pub fn into_display(self) -> Result<Display> {
        const TABLE: &str = "displays";
        let state: DisplayState = self
            .state
            .parse()
            .map_err(|_| corrupt_row(TABLE, format!("unknown state '{}'", self.state)))?;
        let properties: BTreeMap<String, String> = serde_json::from_str(&self.properties)
            .map_err(|e| corrupt_row(TABLE, e))?;
        let version = u64::try_from(self.version)
            .map_err(|_| corrupt_row(TABLE, format!("negative version {}", self.version)))?;
        Ok(Display {
            id: self.id,
            name: self.name,
            location: Location::new(self.site_id, self.zone, self.position),
            state,
            last_seen: self
                .last_seen
                .map(|ms| from_millis(TABLE, ms))
                .transpose()?,
            version,
            properties,
            created_at: from_millis(TABLE, self.created_at)?,
            updated_at: from_millis(TABLE, self.updated_at)?,
        })
    }
}

pub struct DeviceCodeRow {
    id: String,
    device_code: String,
    user_code: String,
    created_at: i64,
    expires_at: i64,
    poll_interval_secs: u32,
    activated: bool,
    activated_at: Option<i64>,
    display_id: Option<String>,
}

impl DeviceCodeRow {
    pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            device_code: row.get(1)?,
            user_code: row.get(2)?,
            created_at: row.get(3)?,
            expires_at: row.get(4)?,
            poll_interval_secs: row.get(5)?,
            activated: row.get(6)?,
            activated_at: row.get(7)?,
            display_id: row.get(8)?,
        })
    }

    pub fn into_device_code(self) -> Result<DeviceCode> {
        const TABLE: &str = "device_codes";
        Ok(DeviceCode {
            id: self.id,
            device_code: self.device_code,
            user_code: self.user_code,
            created_at: from_millis(TABLE, self.created_at)?,
            expires_at: from_millis(TABLE, self.expires_at)?,
            poll_interval_secs: self.poll_interval_secs,
            activated: self.activated,
            activated_at: self
                .activated_at
                .map(|ms| from_millis(TABLE, ms))
                .transpose()?,
            display_id: self.display_id,
        })
    }
}

pub struct RuleRow {
    name: String,
    priority: i64,
    selector_site_id: String,
    selector_zone: String,
    selector_position: String,
    content_type: String,
    content_version: String,
    content_hash: String,
    schedule: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl RuleRow {
    pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            priority: row.get(1)?,
            selector_site_id: row.get(2)?,
            selector_zone: row.get(3)?,
            selector_position: row.get(4)?,
            content_type: row.get(5)?,
            content_version: row.get(6)?,
            content_hash: row.get(7)?,
            schedule: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    pub fn into_rule(self) -> Result<RedirectRule> {
        const TABLE: &str = "redirect_rules";
        let schedule: Option<Schedule> = self
            .schedule
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| corrupt_row(TABLE, e))?;
        Ok(RedirectRule {
            name: self.name,
            priority: self.priority,
            selector: DisplaySelector::new(
                self.selector_site_id,
                self.selector_zone,
                self.selector_position,
            ),
            target: ContentTarget::new(self.content_type, self.content_version, self.content_hash),
            schedule,
            created_at: from_millis(TABLE, self.created_at)?,
            updated_at: from_millis(TABLE, self.updated_at)?,
        })
    }
}

/// JSON text for the nullable `schedule` column
pub fn schedule_to_sql(schedule: &Option<Schedule>) -> Result<Option<String>> {
    schedule
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(MarqueeError::from)
}
