use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::ordering::{snapshot_drift, ReorderPlan};
use crate::errors::{MarqueeError, Result};
use crate::model::{DeviceCode, Display, RedirectRule};
use crate::repository::{DeviceCodeRepository, DisplayRepository, RuleRepository};
use crate::rules::invariants::ensure_unique_priorities;

#[derive(Debug, Default)]
struct Tables {
    displays: HashMap<String, Display>,
    device_codes: HashMap<String, DeviceCode>,
    rules: HashMap<String, RedirectRule>,
}

/// In-memory implementation of every repository
///
/// One mutex guards all tables, so each call is atomic with respect to
/// every other call. Semantics match the SQLite store, which makes this the
/// default backend for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| MarqueeError::Internal {
            message: "memory store lock poisoned".to_string(),
        })
    }
}

fn name_taken_by_other(tables: &Tables, display: &Display) -> bool {
    tables
        .displays
        .values()
        .any(|d| d.name == display.name && d.id != display.id)
}

impl DisplayRepository for MemoryStore {
    fn save_display(&self, display: &Display, expected_version: Option<u64>) -> Result<u64> {
        let mut tables = self.lock()?;
        if name_taken_by_other(&tables, display) {
            return Err(MarqueeError::DisplayNameTaken {
                name: display.name.clone(),
            });
        }

        match expected_version {
            None => {
                if tables.displays.contains_key(&display.id) {
                    return Err(MarqueeError::AlreadyExists {
                        entity_id: display.id.clone(),
                    });
                }
                tables.displays.insert(display.id.clone(), display.clone());
                Ok(display.version)
            }
            Some(expected) => {
                let stored = tables.displays.get_mut(&display.id).ok_or_else(|| {
                    MarqueeError::DisplayNotFound {
                        display_id: display.id.clone(),
                    }
                })?;
                if stored.version != expected {
                    return Err(MarqueeError::VersionConflict {
                        display_id: display.id.clone(),
                        expected_version: expected,
                    });
                }
                let mut next = display.clone();
                next.version = expected + 1;
                *stored = next;
                Ok(expected + 1)
            }
        }
    }

    fn find_display_by_id(&self, id: &str) -> Result<Option<Display>> {
        Ok(self.lock()?.displays.get(id).cloned())
    }

    fn find_display_by_name(&self, name: &str) -> Result<Option<Display>> {
        Ok(self
            .lock()?
            .displays
            .values()
            .find(|d| d.name == name)
            .cloned())
    }

    fn list_displays(&self) -> Result<Vec<Display>> {
        let mut displays: Vec<Display> = self.lock()?.displays.values().cloned().collect();
        displays.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(displays)
    }

    fn delete_display(&self, id: &str) -> Result<()> {
        self.lock()?
            .displays
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MarqueeError::DisplayNotFound {
                display_id: id.to_string(),
            })
    }
}

impl DeviceCodeRepository for MemoryStore {
    fn save_device_code(&self, code: &DeviceCode) -> Result<()> {
        let mut tables = self.lock()?;
        let clash = tables.device_codes.values().find_map(|existing| {
            if existing.id == code.id {
                Some(code.id.clone())
            } else if existing.device_code == code.device_code {
                Some("device_code".to_string())
            } else if existing.user_code == code.user_code {
                Some(code.user_code.clone())
            } else {
                None
            }
        });
        if let Some(entity_id) = clash {
            return Err(MarqueeError::AlreadyExists { entity_id });
        }
        tables.device_codes.insert(code.id.clone(), code.clone());
        Ok(())
    }

    fn find_by_device_code(&self, device_code: &str) -> Result<Option<DeviceCode>> {
        Ok(self
            .lock()?
            .device_codes
            .values()
            .find(|c| c.device_code == device_code)
            .cloned())
    }

    fn find_by_user_code(&self, user_code: &str) -> Result<Option<DeviceCode>> {
        Ok(self
            .lock()?
            .device_codes
            .values()
            .find(|c| c.user_code == user_code)
            .cloned())
    }

    fn mark_device_code_activated(
        &self,
        id: &str,
        display_id: &str,
        activated_at: DateTime<Utc>,
    ) -> Result<DeviceCode> {
        let mut tables = self.lock()?;
        let code = tables
            .device_codes
            .get_mut(id)
            .ok_or(MarqueeError::DeviceCodeNotFound)?;
        if code.activated {
            return Err(MarqueeError::CodeAlreadyActive {
                code_id: code.id.clone(),
                display_id: code.display_id.clone(),
            });
        }
        code.activated = true;
        code.activated_at = Some(activated_at);
        code.display_id = Some(display_id.to_string());
        Ok(code.clone())
    }

    fn delete_device_code(&self, id: &str) -> Result<()> {
        self.lock()?
            .device_codes
            .remove(id)
            .map(|_| ())
            .ok_or(MarqueeError::DeviceCodeNotFound)
    }

    fn delete_expired_device_codes(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut tables = self.lock()?;
        let before = tables.device_codes.len();
        tables.device_codes.retain(|_, code| !code.is_expired(now));
        Ok(before - tables.device_codes.len())
    }
}

fn priority_owner<'a>(tables: &'a Tables, priority: i64, except: &str) -> Option<&'a str> {
    tables
        .rules
        .values()
        .find(|r| r.priority == priority && r.name != except)
        .map(|r| r.name.as_str())
}

impl RuleRepository for MemoryStore {
    fn insert_rule(&self, rule: &RedirectRule) -> Result<()> {
        let mut tables = self.lock()?;
        if tables.rules.contains_key(&rule.name) {
            return Err(MarqueeError::RuleAlreadyExists {
                rule_name: rule.name.clone(),
            });
        }
        if let Some(owner) = priority_owner(&tables, rule.priority, &rule.name) {
            return Err(MarqueeError::PriorityCollision {
                priority: rule.priority,
                existing_rule: owner.to_string(),
            });
        }
        tables.rules.insert(rule.name.clone(), rule.clone());
        Ok(())
    }

    fn save_rule(&self, rule: &RedirectRule, expected_priority: i64) -> Result<()> {
        let mut tables = self.lock()?;
        let stored = tables
            .rules
            .get(&rule.name)
            .ok_or_else(|| MarqueeError::RuleNotFound {
                rule_name: rule.name.clone(),
            })?;
        if stored.priority != expected_priority {
            return Err(MarqueeError::StaleRuleSnapshot {
                rule_name: rule.name.clone(),
            });
        }
        if let Some(owner) = priority_owner(&tables, rule.priority, &rule.name) {
            return Err(MarqueeError::PriorityCollision {
                priority: rule.priority,
                existing_rule: owner.to_string(),
            });
        }
        tables.rules.insert(rule.name.clone(), rule.clone());
        Ok(())
    }

    fn get_rule(&self, name: &str) -> Result<Option<RedirectRule>> {
        Ok(self.lock()?.rules.get(name).cloned())
    }

    fn list_rules(&self) -> Result<Vec<RedirectRule>> {
        let mut rules: Vec<RedirectRule> = self.lock()?.rules.values().cloned().collect();
        rules.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(rules)
    }

    fn delete_rule(&self, name: &str) -> Result<()> {
        self.lock()?
            .rules
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| MarqueeError::RuleNotFound {
                rule_name: name.to_string(),
            })
    }

    fn apply_priorities(&self, plan: &ReorderPlan, at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.lock()?;

        let current: Vec<(String, i64)> = tables
            .rules
            .values()
            .map(|r| (r.name.clone(), r.priority))
            .collect();
        if let Some(rule_name) = snapshot_drift(&plan.basis, &current) {
            return Err(MarqueeError::StaleRuleSnapshot { rule_name });
        }

        let mut staged = tables.rules.clone();
        for change in &plan.changes {
            let rule = staged
                .get_mut(&change.name)
                .filter(|r| r.priority == change.from)
                .ok_or_else(|| MarqueeError::StaleRuleSnapshot {
                    rule_name: change.name.clone(),
                })?;
            rule.priority = change.to;
            rule.updated_at = at;
        }

        let all: Vec<RedirectRule> = staged.values().cloned().collect();
        ensure_unique_priorities(&all)?;

        tables.rules = staged;
        Ok(())
    }
}
