//! Display lifecycle service
//!
//! Every mutation follows the same shape: read the current row, apply a
//! pure transition from `marquee_core::ops::display_ops`, write it back
//! guarded by the observed version. A `VersionConflict` re-runs the whole
//! read-apply-write cycle under the configured retry policy.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use marquee_core::events::{EventPublisher, LifecycleEvent, LifecycleEventKind};
use marquee_core::ops::display_ops;
use marquee_core::rules::validation::{validate_display_name, validate_location};
use marquee_core::{
    log_op_start, Display, DisplayState, Location, MarqueeError, OpContext, Repository, Result,
};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::MarqueeConfig;
use crate::retry::{with_retry, RetryPolicy};

#[derive(Clone)]
pub struct DisplayService {
    repo: Arc<dyn Repository>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    offline_after: Duration,
}

impl DisplayService {
    pub fn new(
        repo: Arc<dyn Repository>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        config: &MarqueeConfig,
    ) -> Self {
        Self {
            repo,
            events,
            clock,
            retry: RetryPolicy::from(&config.retry),
            offline_after: config.offline_after(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Register a new display under a fresh UUIDv7
    ///
    /// # Errors
    /// * `InvalidInput` / `InvalidLocation` - blank name or location field
    /// * `DisplayNameTaken` - another display already uses `name`
    pub fn register(&self, ctx: &OpContext, name: &str, location: Location) -> Result<Display> {
        log_op_start!("display.register", ctx = ctx, display_name = name);
        traced!(
            "display.register",
            ctx,
            self.register_impl(ctx, Uuid::now_v7().to_string(), name, location)
        )
    }

    /// Register a display under a caller-chosen id
    ///
    /// Used by pairing, where the id was minted when the code was redeemed.
    ///
    /// # Errors
    /// As for [`DisplayService::register`], plus `AlreadyExists` when the id
    /// is taken.
    pub fn register_with_id(
        &self,
        ctx: &OpContext,
        id: &str,
        name: &str,
        location: Location,
    ) -> Result<Display> {
        log_op_start!("display.register", ctx = ctx, display_id = id, display_name = name);
        traced!(
            "display.register",
            ctx,
            self.register_impl(ctx, id.to_string(), name, location)
        )
    }

    fn register_impl(
        &self,
        ctx: &OpContext,
        id: String,
        name: &str,
        location: Location,
    ) -> Result<Display> {
        if id.trim().is_empty() {
            return Err(MarqueeError::invalid_input("display id cannot be empty"));
        }
        validate_display_name(name)?;
        validate_location(&location)?;

        let now = self.clock.now();
        let display = Display::new(id, name.to_string(), location, now);
        ctx.check("display.register")?;
        self.repo.save_display(&display, None)?;
        self.publish(LifecycleEventKind::Registered, &display, now);
        Ok(display)
    }

    /// # Errors
    /// * `DisplayNotFound`
    /// * `InvalidTransition` - the display is disabled
    /// * `VersionConflict` - retries exhausted
    pub fn activate(&self, ctx: &OpContext, id: &str) -> Result<Display> {
        log_op_start!("display.activate", ctx = ctx, display_id = id);
        traced!(
            "display.activate",
            ctx,
            self.mutate(ctx, "display.activate", id, |display, now| {
                display_ops::activate(display, now).map(Some)
            })
        )
    }

    /// Activate from any state, including `Disabled`
    ///
    /// # Errors
    /// `DisplayNotFound`, `VersionConflict`.
    pub fn force_reactivate(&self, ctx: &OpContext, id: &str) -> Result<Display> {
        log_op_start!("display.force_reactivate", ctx = ctx, display_id = id);
        traced!(
            "display.force_reactivate",
            ctx,
            self.mutate(ctx, "display.force_reactivate", id, |display, now| {
                Ok(Some(display_ops::force_reactivate(display, now)))
            })
        )
    }

    /// # Errors
    /// `DisplayNotFound`, `VersionConflict`.
    pub fn disable(&self, ctx: &OpContext, id: &str) -> Result<Display> {
        log_op_start!("display.disable", ctx = ctx, display_id = id);
        traced!(
            "display.disable",
            ctx,
            self.mutate(ctx, "display.disable", id, |display, now| {
                Ok(Some(display_ops::disable(display, now)))
            })
        )
    }

    /// # Errors
    /// `DisplayNotFound`, `InvalidLocation`, `VersionConflict`.
    pub fn update_location(
        &self,
        ctx: &OpContext,
        id: &str,
        location: Location,
    ) -> Result<Display> {
        log_op_start!("display.update_location", ctx = ctx, display_id = id, location = %location);
        traced!(
            "display.update_location",
            ctx,
            self.mutate(ctx, "display.update_location", id, |display, now| {
                display_ops::update_location(display, location.clone(), now).map(Some)
            })
        )
    }

    /// Record contact from the display
    ///
    /// An `Offline` display comes back to `Active`.
    ///
    /// # Errors
    /// `DisplayNotFound`, `VersionConflict`.
    pub fn update_last_seen(&self, ctx: &OpContext, id: &str) -> Result<Display> {
        log_op_start!("display.update_last_seen", ctx = ctx, display_id = id);
        traced!(
            "display.update_last_seen",
            ctx,
            self.mutate(ctx, "display.update_last_seen", id, |display, now| {
                Ok(display_ops::touch(display, now))
            })
        )
    }

    /// # Errors
    /// * `DisplayNotFound`
    /// * `InvalidTransition` - the display is not stored as `Active`
    /// * `VersionConflict`
    pub fn mark_offline(&self, ctx: &OpContext, id: &str) -> Result<Display> {
        log_op_start!("display.mark_offline", ctx = ctx, display_id = id);
        traced!(
            "display.mark_offline",
            ctx,
            self.mutate(ctx, "display.mark_offline", id, |display, now| {
                display_ops::mark_offline(display, now).map(Some)
            })
        )
    }

    /// # Errors
    /// `DisplayNotFound`, `InvalidInput` for an empty key, `VersionConflict`.
    pub fn set_property(
        &self,
        ctx: &OpContext,
        id: &str,
        key: &str,
        value: &str,
    ) -> Result<Display> {
        log_op_start!("display.set_property", ctx = ctx, display_id = id, key = key);
        traced!(
            "display.set_property",
            ctx,
            self.mutate(ctx, "display.set_property", id, |display, now| {
                display_ops::set_property(display, key, value, now).map(|()| None)
            })
        )
    }

    /// # Errors
    /// `DisplayNotFound`, `InvalidInput` when the key is absent,
    /// `VersionConflict`.
    pub fn remove_property(&self, ctx: &OpContext, id: &str, key: &str) -> Result<Display> {
        log_op_start!("display.remove_property", ctx = ctx, display_id = id, key = key);
        traced!(
            "display.remove_property",
            ctx,
            self.mutate(ctx, "display.remove_property", id, |display, now| {
                display_ops::remove_property(display, key, now).map(|_| None)
            })
        )
    }

    /// Hard delete; the id is never reused
    ///
    /// # Errors
    /// `DisplayNotFound`.
    pub fn delete(&self, ctx: &OpContext, id: &str) -> Result<()> {
        log_op_start!("display.delete", ctx = ctx, display_id = id);
        traced!("display.delete", ctx, self.delete_impl(ctx, id))
    }

    fn delete_impl(&self, ctx: &OpContext, id: &str) -> Result<()> {
        let display = self.load(id)?;
        ctx.check("display.delete")?;
        self.repo.delete_display(id)?;
        self.publish(LifecycleEventKind::Deleted, &display, self.clock.now());
        Ok(())
    }

    /// # Errors
    /// `DisplayNotFound`.
    pub fn get(&self, ctx: &OpContext, id: &str) -> Result<Display> {
        ctx.check("display.get")?;
        self.load(id)
    }

    /// # Errors
    /// `DisplayNotFound` (carrying the name).
    pub fn get_by_name(&self, ctx: &OpContext, name: &str) -> Result<Display> {
        ctx.check("display.get_by_name")?;
        self.repo
            .find_display_by_name(name)?
            .ok_or_else(|| MarqueeError::DisplayNotFound {
                display_id: name.to_string(),
            })
    }

    /// # Errors
    /// Store failures.
    pub fn list(&self, ctx: &OpContext) -> Result<Vec<Display>> {
        ctx.check("display.list")?;
        self.repo.list_displays()
    }

    /// State as observed now, with stale `Active` displays reading `Offline`
    ///
    /// # Errors
    /// `DisplayNotFound`.
    pub fn effective_state(&self, ctx: &OpContext, id: &str) -> Result<DisplayState> {
        let display = self.get(ctx, id)?;
        Ok(display.effective_state(self.clock.now(), self.offline_after))
    }

    fn load(&self, id: &str) -> Result<Display> {
        self.repo
            .find_display_by_id(id)?
            .ok_or_else(|| MarqueeError::DisplayNotFound {
                display_id: id.to_string(),
            })
    }

    /// Read, apply, write-if-unchanged; publish once the write landed
    fn mutate<F>(&self, ctx: &OpContext, op: &str, id: &str, mut apply: F) -> Result<Display>
    where
        F: FnMut(&mut Display, DateTime<Utc>) -> Result<Option<LifecycleEventKind>>,
    {
        let (updated, kind, at) = with_retry(ctx, &self.retry, op, || {
            let mut current = self.load(id)?;
            let observed = current.version;
            let now = self.clock.now();
            let kind = apply(&mut current, now)?;
            ctx.check(op)?;
            current.version = self.repo.save_display(&current, Some(observed))?;
            Ok((current, kind, now))
        })?;

        tracing::debug!(
            component = module_path!(),
            display_id = %updated.id,
            display_version = updated.version,
            state = updated.state.as_str(),
        );

        if let Some(kind) = kind {
            self.publish(kind, &updated, at);
        }
        Ok(updated)
    }

    fn publish(&self, kind: LifecycleEventKind, subject: &Display, at: DateTime<Utc>) {
        let event = LifecycleEvent::for_display(kind, subject, at);
        if let Err(err) = self.events.publish(&event) {
            tracing::warn!(
                component = module_path!(),
                event = "publish_failed",
                kind = kind.as_str(),
                display_id = %subject.id,
                error = %err,
            );
        }
    }
}

impl std::fmt::Debug for DisplayService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayService")
            .field("retry", &self.retry)
            .field("offline_after", &self.offline_after)
            .finish_non_exhaustive()
    }
}
