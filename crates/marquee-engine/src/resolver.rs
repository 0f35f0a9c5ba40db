//! Content resolution for stored displays
//!
//! Loads the display and a rule snapshot, picks the site timezone, then
//! delegates to the pure `marquee_core::resolve`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use marquee_core::{
    log_op_start, resolve, Location, MarqueeError, OpContext, Repository, Resolution, Result,
};

use crate::config::MarqueeConfig;

#[derive(Clone)]
pub struct Resolver {
    repo: Arc<dyn Repository>,
    default_tz: Tz,
    site_tz: BTreeMap<String, Tz>,
}

impl Resolver {
    /// # Errors
    /// `InvalidConfig` if a configured timezone is unknown.
    pub fn new(repo: Arc<dyn Repository>, config: &MarqueeConfig) -> Result<Self> {
        let site_tz = config
            .resolution
            .site_timezones
            .keys()
            .map(|site| Ok((site.clone(), config.site_timezone(site)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            repo,
            default_tz: config.default_timezone()?,
            site_tz,
        })
    }

    /// Timezone for schedules that do not name their own
    pub fn site_timezone(&self, site_id: &str) -> Tz {
        self.site_tz.get(site_id).copied().unwrap_or(self.default_tz)
    }

    /// Resolve content for a stored display at `now`
    ///
    /// Offline displays are still served; only unregistered and disabled
    /// ones are refused.
    ///
    /// # Errors
    /// * `DisplayNotFound`
    /// * `DisplayNotServable` - the display is unregistered or disabled
    pub fn resolve_display(
        &self,
        ctx: &OpContext,
        display_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Resolution> {
        log_op_start!("resolve.display", ctx = ctx, display_id = display_id);
        traced!(
            "resolve.display",
            ctx,
            self.resolve_display_impl(ctx, display_id, now)
        )
    }

    fn resolve_display_impl(
        &self,
        ctx: &OpContext,
        display_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Resolution> {
        ctx.check("resolve.display")?;
        let display = self.repo.find_display_by_id(display_id)?.ok_or_else(|| {
            MarqueeError::DisplayNotFound {
                display_id: display_id.to_string(),
            }
        })?;
        if !display.state.is_servable() {
            return Err(MarqueeError::DisplayNotServable {
                display_id: display.id,
                state: display.state,
            });
        }
        self.resolve_snapshot(&display.location, now)
    }

    /// Resolve content for a bare location, no display required
    ///
    /// # Errors
    /// Store failures.
    pub fn resolve_location(
        &self,
        ctx: &OpContext,
        location: &Location,
        now: DateTime<Utc>,
    ) -> Result<Resolution> {
        log_op_start!("resolve.location", ctx = ctx, location = %location);
        traced!("resolve.location", ctx, {
            ctx.check("resolve.location")
                .and_then(|()| self.resolve_snapshot(location, now))
        })
    }

    fn resolve_snapshot(&self, location: &Location, now: DateTime<Utc>) -> Result<Resolution> {
        let rules = self.repo.list_rules()?;
        let resolution = resolve(&rules, location, now, self.site_timezone(&location.site_id));
        tracing::debug!(
            component = module_path!(),
            rule_count = rules.len(),
            matched = resolution.rule_name().unwrap_or("-"),
        );
        Ok(resolution)
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("default_tz", &self.default_tz)
            .field("site_tz", &self.site_tz)
            .finish_non_exhaustive()
    }
}
