//! Device-flow pairing service
//!
//! A display asks for a code pair, shows the user code and polls with the
//! device code. An operator redeems the user code; exactly one redemption
//! wins, enforced by the store's conditional update.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use marquee_core::ops::activation_ops::{self, CodeEntropy};
use marquee_core::rules::validation::{validate_display_name, validate_location};
use marquee_core::{
    log_op_start, DeviceCode, Display, Location, MarqueeError, OpContext, Repository, Result,
};
use marquee_core_types::Sensitive;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::MarqueeConfig;
use crate::displays::DisplayService;

/// Fresh randomness is drawn this many times before a collision is fatal
pub const MAX_CODE_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct ActivationService {
    repo: Arc<dyn Repository>,
    displays: DisplayService,
    entropy: Arc<dyn CodeEntropy>,
    clock: Arc<dyn Clock>,
    code_ttl: Duration,
    poll_interval_secs: u32,
}

impl ActivationService {
    pub fn new(
        repo: Arc<dyn Repository>,
        displays: DisplayService,
        entropy: Arc<dyn CodeEntropy>,
        clock: Arc<dyn Clock>,
        config: &MarqueeConfig,
    ) -> Self {
        Self {
            repo,
            displays,
            entropy,
            clock,
            code_ttl: config.code_ttl(),
            poll_interval_secs: config.activation.poll_interval_secs,
        }
    }

    /// Mint and persist a new code pair
    ///
    /// # Errors
    /// `AlreadyExists` if every attempt collided, entropy or store failures.
    pub fn generate_code(&self, ctx: &OpContext) -> Result<DeviceCode> {
        log_op_start!("activation.generate_code", ctx = ctx);
        traced!("activation.generate_code", ctx, self.generate_code_impl(ctx))
    }

    fn generate_code_impl(&self, ctx: &OpContext) -> Result<DeviceCode> {
        let mut attempt = 1;
        loop {
            let code = activation_ops::new_device_code(
                self.entropy.as_ref(),
                self.clock.now(),
                self.code_ttl,
                self.poll_interval_secs,
            )?;
            ctx.check("activation.generate_code")?;
            match self.repo.save_device_code(&code) {
                Ok(()) => {
                    tracing::debug!(
                        component = module_path!(),
                        code_id = %code.id,
                        user_code = %code.user_code,
                        expires_at = %code.expires_at,
                    );
                    return Ok(code);
                }
                Err(MarqueeError::AlreadyExists { entity_id }) if attempt < MAX_CODE_ATTEMPTS => {
                    tracing::debug!(
                        component = module_path!(),
                        attempt,
                        collided = %entity_id,
                        "code collision, drawing again"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Look up a code for a polling display
    ///
    /// Once redeemed, the returned record carries the minted `display_id`.
    ///
    /// # Errors
    /// * `DeviceCodeNotFound`
    /// * `CodeExpired` - `now >= expires_at`
    pub fn validate_code(&self, ctx: &OpContext, device_code: &str) -> Result<DeviceCode> {
        let secret = Sensitive::new(device_code);
        log_op_start!("activation.validate_code", ctx = ctx, device_code = %secret.fingerprint());
        traced!(
            "activation.validate_code",
            ctx,
            self.validate_code_impl(ctx, secret.expose())
        )
    }

    fn validate_code_impl(&self, ctx: &OpContext, device_code: &str) -> Result<DeviceCode> {
        ctx.check("activation.validate_code")?;
        let code = self
            .repo
            .find_by_device_code(device_code)?
            .ok_or(MarqueeError::DeviceCodeNotFound)?;
        activation_ops::check_pollable(&code, self.clock.now())?;
        Ok(code)
    }

    /// Redeem a user code and mint the id of the display it pairs
    ///
    /// Input is normalized first, so `abcdefgh` and ` ABCD-EFGH ` both
    /// redeem `ABCD-EFGH`.
    ///
    /// # Errors
    /// * `InvalidInput` - not shaped like a user code
    /// * `UserCodeNotFound`
    /// * `CodeExpired`
    /// * `CodeAlreadyActive` - redeemed before, or lost a concurrent race
    pub fn activate_code(&self, ctx: &OpContext, user_code: &str) -> Result<String> {
        log_op_start!("activation.activate_code", ctx = ctx, user_code = user_code.trim());
        traced!(
            "activation.activate_code",
            ctx,
            self.activate_code_impl(ctx, user_code)
        )
    }

    fn activate_code_impl(&self, ctx: &OpContext, user_code: &str) -> Result<String> {
        let code = self.find_redeemable(user_code)?;
        let display_id = Uuid::now_v7().to_string();
        ctx.check("activation.activate_code")?;
        self.repo
            .mark_device_code_activated(&code.id, &display_id, self.clock.now())?;
        Ok(display_id)
    }

    fn find_redeemable(&self, user_code: &str) -> Result<DeviceCode> {
        let normalized = activation_ops::normalize_user_code(user_code)?;
        let code = self.repo.find_by_user_code(&normalized)?.ok_or_else(|| {
            MarqueeError::UserCodeNotFound {
                user_code: normalized.clone(),
            }
        })?;
        activation_ops::check_redeemable(&code, self.clock.now())?;
        Ok(code)
    }

    /// Redeem a code, register the display under the minted id, activate it
    ///
    /// The display is registered before the code is spent, so a name taken
    /// by a concurrent registration leaves the code redeemable. If the code
    /// is then lost to another redemption, the fresh display is deleted
    /// again.
    ///
    /// # Errors
    /// Anything from [`ActivationService::activate_code`],
    /// [`DisplayService::register_with_id`] or [`DisplayService::activate`].
    pub fn complete_pairing(
        &self,
        ctx: &OpContext,
        user_code: &str,
        name: &str,
        location: Location,
    ) -> Result<Display> {
        log_op_start!("activation.complete_pairing", ctx = ctx, display_name = name);
        traced!(
            "activation.complete_pairing",
            ctx,
            self.complete_pairing_impl(ctx, user_code, name, location)
        )
    }

    fn complete_pairing_impl(
        &self,
        ctx: &OpContext,
        user_code: &str,
        name: &str,
        location: Location,
    ) -> Result<Display> {
        validate_display_name(name)?;
        validate_location(&location)?;
        let code = self.find_redeemable(user_code)?;

        let display_id = Uuid::now_v7().to_string();
        self.displays
            .register_with_id(ctx, &display_id, name, location)?;
        let redeemed = ctx.check("activation.complete_pairing").and_then(|()| {
            self.repo
                .mark_device_code_activated(&code.id, &display_id, self.clock.now())
        });
        if let Err(err) = redeemed {
            self.discard_display(ctx, &display_id);
            return Err(err);
        }
        self.displays.activate(ctx, &display_id)
    }

    /// Drop a display registered for a pairing that did not go through
    ///
    /// Runs under a fresh context carrying the same correlation ids, so an
    /// expired deadline on `ctx` does not strand the display.
    fn discard_display(&self, ctx: &OpContext, display_id: &str) {
        let mut cleanup = OpContext::new().with_request_id(ctx.request_id().clone());
        if let Some(trace_id) = ctx.trace_id() {
            cleanup = cleanup.with_trace_id(trace_id.clone());
        }
        if let Err(err) = self.displays.delete(&cleanup, display_id) {
            tracing::warn!(
                component = module_path!(),
                event = "pairing_rollback_failed",
                display_id = display_id,
                error = %err,
            );
        }
    }

    /// Delete every code with `expires_at <= now`, redeemed or not
    ///
    /// # Errors
    /// Store failures.
    pub fn purge_expired(&self, ctx: &OpContext, now: DateTime<Utc>) -> Result<usize> {
        log_op_start!("activation.purge_expired", ctx = ctx, now = %now);
        traced!("activation.purge_expired", ctx, {
            ctx.check("activation.purge_expired")
                .and_then(|()| self.repo.delete_expired_device_codes(now))
        })
    }
}

impl std::fmt::Debug for ActivationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationService")
            .field("code_ttl", &self.code_ttl)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .finish_non_exhaustive()
    }
}
