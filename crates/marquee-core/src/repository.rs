//! Persistence seams
//!
//! The engine never caches entities: every operation reads through these
//! traits immediately before acting. Implementations translate their own
//! failures into `MarqueeError` (absence on reads is `Ok(None)`, absence on
//! writes is the matching `*NotFound` variant).

use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::model::{DeviceCode, Display, RedirectRule};
use crate::ops::ordering::ReorderPlan;

pub trait DisplayRepository: Send + Sync {
    /// Insert (`expected_version = None`) or update a display
    ///
    /// An update only lands if the stored version still equals
    /// `expected_version`; it then stores `expected_version + 1`. Returns the
    /// version now stored.
    ///
    /// # Errors
    /// `DisplayNameTaken` / `AlreadyExists` on insert collisions,
    /// `VersionConflict` when the stored version moved, `DisplayNotFound` when
    /// the row vanished.
    fn save_display(&self, display: &Display, expected_version: Option<u64>) -> Result<u64>;

    fn find_display_by_id(&self, id: &str) -> Result<Option<Display>>;

    fn find_display_by_name(&self, name: &str) -> Result<Option<Display>>;

    /// All displays ordered by name
    fn list_displays(&self) -> Result<Vec<Display>>;

    /// # Errors
    /// `DisplayNotFound` when no such row exists.
    fn delete_display(&self, id: &str) -> Result<()>;
}

pub trait DeviceCodeRepository: Send + Sync {
    /// # Errors
    /// `AlreadyExists` if the id, device code or user code is already stored.
    fn save_device_code(&self, code: &DeviceCode) -> Result<()>;

    fn find_by_device_code(&self, device_code: &str) -> Result<Option<DeviceCode>>;

    fn find_by_user_code(&self, user_code: &str) -> Result<Option<DeviceCode>>;

    /// Flip a code to activated exactly once
    ///
    /// # Errors
    /// `CodeAlreadyActive` if another redemption got there first,
    /// `DeviceCodeNotFound` if the row is gone.
    fn mark_device_code_activated(
        &self,
        id: &str,
        display_id: &str,
        activated_at: DateTime<Utc>,
    ) -> Result<DeviceCode>;

    /// # Errors
    /// `DeviceCodeNotFound` when no such row exists.
    fn delete_device_code(&self, id: &str) -> Result<()>;

    /// Remove every code with `expires_at <= now`; returns how many went
    fn delete_expired_device_codes(&self, now: DateTime<Utc>) -> Result<usize>;
}

pub trait RuleRepository: Send + Sync {
    /// Insert a new rule, checking name and priority atomically
    ///
    /// # Errors
    /// `RuleAlreadyExists`, `PriorityCollision`.
    fn insert_rule(&self, rule: &RedirectRule) -> Result<()>;

    /// Overwrite an existing rule read with priority `expected_priority`
    ///
    /// # Errors
    /// * `RuleNotFound`
    /// * `StaleRuleSnapshot` - the stored priority is no longer
    ///   `expected_priority`, e.g. a reorder landed since the read
    /// * `PriorityCollision` - the new priority belongs to another rule
    fn save_rule(&self, rule: &RedirectRule, expected_priority: i64) -> Result<()>;

    fn get_rule(&self, name: &str) -> Result<Option<RedirectRule>>;

    /// All rules, highest priority first
    fn list_rules(&self) -> Result<Vec<RedirectRule>>;

    /// # Errors
    /// `RuleNotFound` when no such rule exists.
    fn delete_rule(&self, name: &str) -> Result<()>;

    /// Apply a reorder plan as one atomic unit
    ///
    /// The plan only applies if the rule table still holds exactly the
    /// `(name, priority)` pairs in `plan.basis`.
    ///
    /// # Errors
    /// `StaleRuleSnapshot` if any rule was added, removed or moved since
    /// planning, `PriorityCollision` if the result would contain duplicates.
    /// Nothing is written on error.
    fn apply_priorities(&self, plan: &ReorderPlan, at: DateTime<Utc>) -> Result<()>;
}

/// Everything the engine needs from storage
pub trait Repository: DisplayRepository + DeviceCodeRepository + RuleRepository {}

impl<T> Repository for T where T: DisplayRepository + DeviceCodeRepository + RuleRepository {}
