//! `SqliteStore`: all three repositories over one SQLite connection
//!
//! The connection sits behind a mutex, so every trait call runs alone
//! against this handle. Multi-row writes use `BEGIN IMMEDIATE` so a second
//! process sharing the file cannot interleave.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use marquee_core::errors::MarqueeError;
use marquee_core::model::{DeviceCode, Display, RedirectRule};
use marquee_core::ops::ordering::{snapshot_drift, ReorderPlan};
use marquee_core::repository::{DeviceCodeRepository, DisplayRepository, RuleRepository};
use rusqlite::{params, Connection, OptionalExtension, Params, TransactionBehavior};

use super::rows::{
    schedule_to_sql, to_millis, version_to_sql, DeviceCodeRow, DisplayRow, RuleRow,
    DEVICE_CODE_COLUMNS, DISPLAY_COLUMNS, RULE_COLUMNS,
};
use crate::db;
use crate::errors::{sqlite, Result};
use crate::migrations::apply_migrations;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) a database file and migrate it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(db::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(db::open_in_memory()?)
    }

    pub fn from_connection(mut conn: Connection) -> Result<Self> {
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| MarqueeError::Internal {
            message: "sqlite connection lock poisoned".to_string(),
        })
    }
}

fn select_displays<P: Params>(
    conn: &Connection,
    clause: &str,
    params: P,
) -> Result<Vec<Display>> {
    let sql = format!("SELECT {} FROM displays {}", DISPLAY_COLUMNS, clause);
    let mut stmt = conn.prepare(&sql).map_err(sqlite("select_displays"))?;
    let rows = stmt
        .query_map(params, DisplayRow::read)
        .map_err(sqlite("select_displays"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sqlite("select_displays"))?;
    rows.into_iter().map(DisplayRow::into_display).collect()
}

fn select_device_code<P: Params>(
    conn: &Connection,
    clause: &str,
    params: P,
) -> Result<Option<DeviceCode>> {
    let sql = format!("SELECT {} FROM device_codes {}", DEVICE_CODE_COLUMNS, clause);
    conn.query_row(&sql, params, DeviceCodeRow::read)
        .optional()
        .map_err(sqlite("select_device_code"))?
        .map(DeviceCodeRow::into_device_code)
        .transpose()
}

fn select_rules<P: Params>(conn: &Connection, clause: &str, params: P) -> Result<Vec<RedirectRule>> {
    let sql = format!("SELECT {} FROM redirect_rules {}", RULE_COLUMNS, clause);
    let mut stmt = conn.prepare(&sql).map_err(sqlite("select_rules"))?;
    let rows = stmt
        .query_map(params, RuleRow::read)
        .map_err(sqlite("select_rules"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sqlite("select_rules"))?;
    rows.into_iter().map(RuleRow::into_rule).collect()
}

fn exists(conn: &Connection, sql: &str, key: &str) -> Result<bool> {
    conn.query_row(sql, [key], |_| Ok(()))
        .optional()
        .map(|row| row.is_some())
        .map_err(sqlite("exists"))
}

fn priority_owner(conn: &Connection, priority: i64, except: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT name FROM redirect_rules WHERE priority = ?1 AND name != ?2 LIMIT 1",
        params![priority, except],
        |row| row.get(0),
    )
    .optional()
    .map_err(sqlite("priority_owner"))
}

impl DisplayRepository for SqliteStore {
    fn save_display(&self, display: &Display, expected_version: Option<u64>) -> Result<u64> {
        let conn = self.conn()?;

        let name_owner: Option<String> = conn
            .query_row(
                "SELECT id FROM displays WHERE name = ?1 AND id != ?2",
                params![display.name, display.id],
                |row| row.get(0),
            )
            .optional()
            .map_err(sqlite("save_display"))?;
        if name_owner.is_some() {
            return Err(MarqueeError::DisplayNameTaken {
                name: display.name.clone(),
            });
        }

        let properties = serde_json::to_string(&display.properties)?;
        let last_seen = display.last_seen.map(to_millis);

        match expected_version {
            None => {
                if exists(&conn, "SELECT 1 FROM displays WHERE id = ?1", &display.id)? {
                    return Err(MarqueeError::AlreadyExists {
                        entity_id: display.id.clone(),
                    });
                }
                conn.execute(
                    &format!(
                        "INSERT INTO displays ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                        DISPLAY_COLUMNS
                    ),
                    params![
                        display.id,
                        display.name,
                        display.location.site_id,
                        display.location.zone,
                        display.location.position,
                        display.state.as_str(),
                        last_seen,
                        version_to_sql(display.version)?,
                        properties,
                        to_millis(display.created_at),
                        to_millis(display.updated_at),
                    ],
                )
                .map_err(sqlite("save_display"))?;
                Ok(display.version)
            }
            Some(expected) => {
                let updated = conn
                    .execute(
                        "UPDATE displays SET
                            name = ?2, site_id = ?3, zone = ?4, position = ?5, state = ?6,
                            last_seen = ?7, properties = ?8, updated_at = ?9,
                            version = version + 1
                         WHERE id = ?1 AND version = ?10",
                        params![
                            display.id,
                            display.name,
                            display.location.site_id,
                            display.location.zone,
                            display.location.position,
                            display.state.as_str(),
                            last_seen,
                            properties,
                            to_millis(display.updated_at),
                            version_to_sql(expected)?,
                        ],
                    )
                    .map_err(sqlite("save_display"))?;

                if updated == 0 {
                    return if exists(&conn, "SELECT 1 FROM displays WHERE id = ?1", &display.id)? {
                        Err(MarqueeError::VersionConflict {
                            display_id: display.id.clone(),
                            expected_version: expected,
                        })
                    } else {
                        Err(MarqueeError::DisplayNotFound {
                            display_id: display.id.clone(),
                        })
                    };
                }
                Ok(expected + 1)
            }
        }
    }

    fn find_display_by_id(&self, id: &str) -> Result<Option<Display>> {
        let conn = self.conn()?;
        Ok(select_displays(&conn, "WHERE id = ?1", [id])?.into_iter().next())
    }

    fn find_display_by_name(&self, name: &str) -> Result<Option<Display>> {
        let conn = self.conn()?;
        Ok(select_displays(&conn, "WHERE name = ?1", [name])?
            .into_iter()
            .next())
    }

    fn list_displays(&self) -> Result<Vec<Display>> {
        let conn = self.conn()?;
        select_displays(&conn, "ORDER BY name ASC", [])
    }

    fn delete_display(&self, id: &str) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM displays WHERE id = ?1", [id])
            .map_err(sqlite("delete_display"))?;
        if deleted == 0 {
            return Err(MarqueeError::DisplayNotFound {
                display_id: id.to_string(),
            });
        }
        Ok(())
    }
}

impl DeviceCodeRepository for SqliteStore {
    fn save_device_code(&self, code: &DeviceCode) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO device_codes ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                DEVICE_CODE_COLUMNS
            ),
            params![
                code.id,
                code.device_code,
                code.user_code,
                to_millis(code.created_at),
                to_millis(code.expires_at),
                code.poll_interval_secs,
                code.activated,
                code.activated_at.map(to_millis),
                code.display_id,
            ],
        )
        .map_err(sqlite("save_device_code"))?;
        Ok(())
    }

    fn find_by_device_code(&self, device_code: &str) -> Result<Option<DeviceCode>> {
        let conn = self.conn()?;
        select_device_code(&conn, "WHERE device_code = ?1", [device_code])
    }

    fn find_by_user_code(&self, user_code: &str) -> Result<Option<DeviceCode>> {
        let conn = self.conn()?;
        select_device_code(&conn, "WHERE user_code = ?1", [user_code])
    }

    fn mark_device_code_activated(
        &self,
        id: &str,
        display_id: &str,
        activated_at: DateTime<Utc>,
    ) -> Result<DeviceCode> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE device_codes SET activated = 1, activated_at = ?2, display_id = ?3
                 WHERE id = ?1 AND activated = 0",
                params![id, to_millis(activated_at), display_id],
            )
            .map_err(sqlite("mark_device_code_activated"))?;

        let current = select_device_code(&conn, "WHERE id = ?1", [id])?
            .ok_or(MarqueeError::DeviceCodeNotFound)?;
        if updated == 0 {
            return Err(MarqueeError::CodeAlreadyActive {
                code_id: current.id,
                display_id: current.display_id,
            });
        }
        Ok(current)
    }

    fn delete_device_code(&self, id: &str) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM device_codes WHERE id = ?1", [id])
            .map_err(sqlite("delete_device_code"))?;
        if deleted == 0 {
            return Err(MarqueeError::DeviceCodeNotFound);
        }
        Ok(())
    }

    fn delete_expired_device_codes(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM device_codes WHERE expires_at <= ?1",
            [to_millis(now)],
        )
        .map_err(sqlite("delete_expired_device_codes"))
    }
}

impl RuleRepository for SqliteStore {
    fn insert_rule(&self, rule: &RedirectRule) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sqlite("insert_rule"))?;

        if exists(&tx, "SELECT 1 FROM redirect_rules WHERE name = ?1", &rule.name)? {
            return Err(MarqueeError::RuleAlreadyExists {
                rule_name: rule.name.clone(),
            });
        }
        if let Some(owner) = priority_owner(&tx, rule.priority, &rule.name)? {
            return Err(MarqueeError::PriorityCollision {
                priority: rule.priority,
                existing_rule: owner,
            });
        }

        tx.execute(
            &format!(
                "INSERT INTO redirect_rules ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                RULE_COLUMNS
            ),
            params![
                rule.name,
                rule.priority,
                rule.selector.site_id,
                rule.selector.zone,
                rule.selector.position,
                rule.target.content_type,
                rule.target.version,
                rule.target.hash,
                schedule_to_sql(&rule.schedule)?,
                to_millis(rule.created_at),
                to_millis(rule.updated_at),
            ],
        )
        .map_err(sqlite("insert_rule"))?;
        tx.commit().map_err(sqlite("insert_rule"))
    }

    fn save_rule(&self, rule: &RedirectRule, expected_priority: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sqlite("save_rule"))?;

        let stored: Option<i64> = tx
            .query_row(
                "SELECT priority FROM redirect_rules WHERE name = ?1",
                [&rule.name],
                |row| row.get(0),
            )
            .optional()
            .map_err(sqlite("save_rule"))?;
        match stored {
            None => {
                return Err(MarqueeError::RuleNotFound {
                    rule_name: rule.name.clone(),
                })
            }
            Some(priority) if priority != expected_priority => {
                return Err(MarqueeError::StaleRuleSnapshot {
                    rule_name: rule.name.clone(),
                })
            }
            Some(_) => {}
        }
        if let Some(owner) = priority_owner(&tx, rule.priority, &rule.name)? {
            return Err(MarqueeError::PriorityCollision {
                priority: rule.priority,
                existing_rule: owner,
            });
        }
        tx.execute(
            "UPDATE redirect_rules SET
                priority = ?2, selector_site_id = ?3, selector_zone = ?4,
                selector_position = ?5, content_type = ?6, content_version = ?7,
                content_hash = ?8, schedule = ?9, updated_at = ?10
             WHERE name = ?1",
            params![
                rule.name,
                rule.priority,
                rule.selector.site_id,
                rule.selector.zone,
                rule.selector.position,
                rule.target.content_type,
                rule.target.version,
                rule.target.hash,
                schedule_to_sql(&rule.schedule)?,
                to_millis(rule.updated_at),
            ],
        )
        .map_err(sqlite("save_rule"))?;
        tx.commit().map_err(sqlite("save_rule"))
    }

    fn get_rule(&self, name: &str) -> Result<Option<RedirectRule>> {
        let conn = self.conn()?;
        Ok(select_rules(&conn, "WHERE name = ?1", [name])?
            .into_iter()
            .next())
    }

    fn list_rules(&self) -> Result<Vec<RedirectRule>> {
        let conn = self.conn()?;
        select_rules(&conn, "ORDER BY priority DESC, name ASC", [])
    }

    fn delete_rule(&self, name: &str) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM redirect_rules WHERE name = ?1", [name])
            .map_err(sqlite("delete_rule"))?;
        if deleted == 0 {
            return Err(MarqueeError::RuleNotFound {
                rule_name: name.to_string(),
            });
        }
        Ok(())
    }

    fn apply_priorities(&self, plan: &ReorderPlan, at: DateTime<Utc>) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sqlite("apply_priorities"))?;

        let mut stmt = tx
            .prepare("SELECT name, priority FROM redirect_rules")
            .map_err(sqlite("apply_priorities"))?;
        let current: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(sqlite("apply_priorities"))?
            .collect::<rusqlite::Result<_>>()
            .map_err(sqlite("apply_priorities"))?;
        drop(stmt);
        if let Some(rule_name) = snapshot_drift(&plan.basis, &current) {
            return Err(MarqueeError::StaleRuleSnapshot { rule_name });
        }

        for change in &plan.changes {
            let updated = tx
                .execute(
                    "UPDATE redirect_rules SET priority = ?1, updated_at = ?2
                     WHERE name = ?3 AND priority = ?4",
                    params![change.to, to_millis(at), change.name, change.from],
                )
                .map_err(sqlite("apply_priorities"))?;
            if updated == 0 {
                return Err(MarqueeError::StaleRuleSnapshot {
                    rule_name: change.name.clone(),
                });
            }
        }

        let duplicate: Option<(i64, String)> = tx
            .query_row(
                "SELECT priority, MIN(name) FROM redirect_rules
                 GROUP BY priority HAVING COUNT(*) > 1
                 ORDER BY priority LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(sqlite("apply_priorities"))?;
        if let Some((priority, existing_rule)) = duplicate {
            return Err(MarqueeError::PriorityCollision {
                priority,
                existing_rule,
            });
        }

        tx.commit().map_err(sqlite("apply_priorities"))?;
        tracing::debug!(
            component = module_path!(),
            changed = plan.changes.len(),
            "applied rule priorities"
        );
        Ok(())
    }
}
