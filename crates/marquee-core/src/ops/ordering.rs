//! Priority planning for redirect-rule reorders
//!
//! Rules are evaluated by descending priority. Moving one rule either picks
//! a single free priority for it between its new neighbours, or, when no
//! integer gap is left, renumbers the whole set to evenly spaced values.
//! The result is a plan; stores apply it atomically.

use std::collections::BTreeMap;

use crate::errors::{MarqueeError, Result};
use crate::model::{RedirectRule, ReorderPosition};

/// Spacing used when renumbering, leaving room for later single moves
pub const DEFAULT_PRIORITY_STEP: i64 = 1000;

/// One rule's priority move; `from` guards against concurrent edits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityChange {
    pub name: String,
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReorderPlan {
    pub changes: Vec<PriorityChange>,
    /// Whether the plan rewrites every rule rather than just the moved one
    pub renumbered: bool,
    /// Every `(name, priority)` the plan was computed from, in evaluation order
    ///
    /// Stores refuse the plan unless the rule table still matches it exactly.
    pub basis: Vec<(String, i64)>,
}

impl ReorderPlan {
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

/// First rule on which `current` departs from the planned `basis`
///
/// A rule added, removed or re-prioritized since planning all count.
/// Returns `None` when the two describe the same rule set.
pub fn snapshot_drift(basis: &[(String, i64)], current: &[(String, i64)]) -> Option<String> {
    let planned: BTreeMap<&str, i64> = basis.iter().map(|(n, p)| (n.as_str(), *p)).collect();
    let actual: BTreeMap<&str, i64> = current.iter().map(|(n, p)| (n.as_str(), *p)).collect();
    planned
        .iter()
        .find(|(name, priority)| actual.get(*name) != Some(*priority))
        .or_else(|| actual.iter().find(|(name, _)| !planned.contains_key(*name)))
        .map(|(name, _)| name.to_string())
}

/// Order used for evaluation: priority desc, then name asc
pub fn evaluation_order(rules: &mut [(String, i64)]) {
    rules.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
}

/// Plan the priority changes that move `name` to `position`
///
/// # Arguments
/// * `rules` - The full current rule set
/// * `name` - Rule to move
/// * `position` - Target slot in evaluation order
/// * `step` - Spacing for new priorities (must be positive)
///
/// # Errors
/// * `RuleNotFound` - `name` or the reference rule is not in `rules`
/// * `InvalidInput` - the rule is positioned relative to itself, `step` is
///   not positive, or renumbering would overflow `i64`
pub fn plan_reorder(
    rules: &[RedirectRule],
    name: &str,
    position: &ReorderPosition,
    step: i64,
) -> Result<ReorderPlan> {
    if step <= 0 {
        return Err(MarqueeError::invalid_input("priority step must be positive"));
    }

    let mut current: Vec<(String, i64)> =
        rules.iter().map(|r| (r.name.clone(), r.priority)).collect();
    evaluation_order(&mut current);

    let moved_index = index_of(&current, name)?;
    let moved = current[moved_index].clone();

    let mut remaining = current.clone();
    remaining.remove(moved_index);

    let slot = match position {
        ReorderPosition::Start => 0,
        ReorderPosition::End => remaining.len(),
        ReorderPosition::Before(reference) | ReorderPosition::After(reference) => {
            if reference == name {
                return Err(MarqueeError::invalid_input(format!(
                    "rule '{}' cannot be positioned relative to itself",
                    name
                )));
            }
            let at = index_of(&remaining, reference)?;
            if matches!(position, ReorderPosition::After(_)) {
                at + 1
            } else {
                at
            }
        }
    };

    let has_duplicates = current.windows(2).any(|pair| pair[0].1 == pair[1].1);

    let mut desired = remaining.clone();
    desired.insert(slot, moved.clone());

    if !has_duplicates && desired == current {
        return Ok(ReorderPlan {
            basis: current,
            ..ReorderPlan::default()
        });
    }

    if !has_duplicates {
        let upper = slot.checked_sub(1).map(|i| remaining[i].1);
        let lower = remaining.get(slot).map(|r| r.1);
        if let Some(to) = single_slot_priority(upper, lower, step) {
            return Ok(ReorderPlan {
                changes: vec![PriorityChange {
                    name: moved.0,
                    from: moved.1,
                    to,
                }],
                renumbered: false,
                basis: current,
            });
        }
    }

    let changes = renumber(&desired, step)?;
    Ok(ReorderPlan {
        changes,
        renumbered: true,
        basis: current,
    })
}

fn index_of(rules: &[(String, i64)], name: &str) -> Result<usize> {
    rules
        .iter()
        .position(|(n, _)| n == name)
        .ok_or_else(|| MarqueeError::RuleNotFound {
            rule_name: name.to_string(),
        })
}

/// A free priority strictly between the neighbours, if one exists
fn single_slot_priority(upper: Option<i64>, lower: Option<i64>, step: i64) -> Option<i64> {
    match (upper, lower) {
        (None, Some(lower)) => lower.checked_add(step),
        (Some(upper), None) => upper.checked_sub(step),
        (Some(upper), Some(lower)) => {
            let gap = upper.checked_sub(lower)?;
            if gap >= 2 {
                Some(lower + gap / 2)
            } else {
                None
            }
        }
        (None, None) => None,
    }
}

/// Assign `(n - i) * step` in desired order; only rules that move are listed
fn renumber(desired: &[(String, i64)], step: i64) -> Result<Vec<PriorityChange>> {
    let n = desired.len() as i64;
    let mut changes = Vec::new();
    for (i, (name, from)) in desired.iter().enumerate() {
        let to = (n - i as i64).checked_mul(step).ok_or_else(|| {
            MarqueeError::invalid_input("renumbering rules would overflow priority range")
        })?;
        if *from != to {
            changes.push(PriorityChange {
                name: name.clone(),
                from: *from,
                to,
            });
        }
    }
    Ok(changes)
}
