//! Redirect rule administration
//!
//! Priority uniqueness is enforced by the store inside the same transaction
//! as the write, so two concurrent adds with one priority cannot both land.

use std::sync::Arc;

use marquee_core::ops::ordering::{plan_reorder, ReorderPlan};
use marquee_core::rules::validation::validate_rule;
use marquee_core::{
    log_op_start, MarqueeError, OpContext, RedirectRule, ReorderPosition, Repository, Result,
    RuleChanges,
};

use crate::clock::Clock;
use crate::config::MarqueeConfig;
use crate::retry::{with_retry, RetryPolicy};

#[derive(Clone)]
pub struct RuleService {
    repo: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    priority_step: i64,
}

impl RuleService {
    pub fn new(repo: Arc<dyn Repository>, clock: Arc<dyn Clock>, config: &MarqueeConfig) -> Self {
        Self {
            repo,
            clock,
            retry: RetryPolicy::from(&config.retry),
            priority_step: config.rules.priority_step,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Store a new rule; timestamps are set here
    ///
    /// # Errors
    /// * `InvalidInput` / `InvalidSchedule`
    /// * `RuleAlreadyExists`
    /// * `PriorityCollision` - another rule holds the priority
    pub fn add(&self, ctx: &OpContext, rule: RedirectRule) -> Result<RedirectRule> {
        log_op_start!(
            "rule.add",
            ctx = ctx,
            rule_name = %rule.name,
            priority = rule.priority
        );
        traced!("rule.add", ctx, self.add_impl(ctx, rule))
    }

    fn add_impl(&self, ctx: &OpContext, mut rule: RedirectRule) -> Result<RedirectRule> {
        validate_rule(&rule)?;
        let now = self.clock.now();
        rule.created_at = now;
        rule.updated_at = now;
        ctx.check("rule.add")?;
        self.repo.insert_rule(&rule)?;
        Ok(rule)
    }

    /// Apply a partial update
    ///
    /// The write only lands if the rule still holds the priority it was
    /// read with; a reorder in between makes the update re-read and retry.
    ///
    /// # Errors
    /// `RuleNotFound`, `InvalidSchedule`, `PriorityCollision`,
    /// `StaleRuleSnapshot` once retries are exhausted.
    pub fn update(&self, ctx: &OpContext, name: &str, changes: RuleChanges) -> Result<RedirectRule> {
        log_op_start!("rule.update", ctx = ctx, rule_name = name);
        traced!("rule.update", ctx, self.update_impl(ctx, name, &changes))
    }

    fn update_impl(
        &self,
        ctx: &OpContext,
        name: &str,
        changes: &RuleChanges,
    ) -> Result<RedirectRule> {
        with_retry(ctx, &self.retry, "rule.update", || {
            let mut rule = self.load(name)?;
            if changes.is_empty() {
                return Ok(rule);
            }
            let observed = rule.priority;
            changes.apply_to(&mut rule, self.clock.now());
            validate_rule(&rule)?;
            ctx.check("rule.update")?;
            self.repo.save_rule(&rule, observed)?;
            Ok(rule)
        })
    }

    /// # Errors
    /// `RuleNotFound`.
    pub fn remove(&self, ctx: &OpContext, name: &str) -> Result<()> {
        log_op_start!("rule.remove", ctx = ctx, rule_name = name);
        traced!("rule.remove", ctx, {
            ctx.check("rule.remove")
                .and_then(|()| self.repo.delete_rule(name))
        })
    }

    /// Move a rule in evaluation order
    ///
    /// The plan is computed from a fresh snapshot and applied atomically. If
    /// another writer added, removed or moved a rule in between, the store
    /// reports `StaleRuleSnapshot` and the whole plan-apply cycle is retried.
    ///
    /// # Errors
    /// * `RuleNotFound` - `name` or the reference rule is unknown
    /// * `InvalidInput` - positioned relative to itself
    /// * `StaleRuleSnapshot` - retries exhausted
    pub fn reorder(
        &self,
        ctx: &OpContext,
        name: &str,
        position: &ReorderPosition,
    ) -> Result<ReorderPlan> {
        log_op_start!("rule.reorder", ctx = ctx, rule_name = name, position = ?position);
        traced!("rule.reorder", ctx, self.reorder_impl(ctx, name, position))
    }

    fn reorder_impl(
        &self,
        ctx: &OpContext,
        name: &str,
        position: &ReorderPosition,
    ) -> Result<ReorderPlan> {
        with_retry(ctx, &self.retry, "rule.reorder", || {
            let rules = self.repo.list_rules()?;
            let plan = plan_reorder(&rules, name, position, self.priority_step)?;
            if plan.is_noop() {
                return Ok(plan);
            }
            ctx.check("rule.reorder")?;
            self.repo.apply_priorities(&plan, self.clock.now())?;
            tracing::debug!(
                component = module_path!(),
                rule_name = name,
                changed = plan.changes.len(),
                renumbered = plan.renumbered,
            );
            Ok(plan)
        })
    }

    /// # Errors
    /// `RuleNotFound`.
    pub fn get(&self, ctx: &OpContext, name: &str) -> Result<RedirectRule> {
        ctx.check("rule.get")?;
        self.load(name)
    }

    /// All rules, highest priority first
    ///
    /// # Errors
    /// Store failures.
    pub fn list(&self, ctx: &OpContext) -> Result<Vec<RedirectRule>> {
        ctx.check("rule.list")?;
        self.repo.list_rules()
    }

    fn load(&self, name: &str) -> Result<RedirectRule> {
        self.repo
            .get_rule(name)?
            .ok_or_else(|| MarqueeError::RuleNotFound {
                rule_name: name.to_string(),
            })
    }
}

impl std::fmt::Debug for RuleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleService")
            .field("retry", &self.retry)
            .field("priority_step", &self.priority_step)
            .finish_non_exhaustive()
    }
}
