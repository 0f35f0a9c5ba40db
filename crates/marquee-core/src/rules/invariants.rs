//! Rule-set invariants checked by stores before committing

use std::collections::BTreeMap;

use crate::errors::{MarqueeError, Result};
use crate::model::RedirectRule;

/// Priorities used by more than one rule, with the rule names sharing each
pub fn find_priority_collisions<'a, I>(rules: I) -> Vec<(i64, Vec<String>)>
where
    I: IntoIterator<Item = (&'a str, i64)>,
{
    let mut by_priority: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for (name, priority) in rules {
        by_priority.entry(priority).or_default().push(name.to_string());
    }
    by_priority
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(priority, mut names)| {
            names.sort();
            (priority, names)
        })
        .collect()
}

/// # Errors
/// `PriorityCollision` for the lowest duplicated priority.
pub fn ensure_unique_priorities(rules: &[RedirectRule]) -> Result<()> {
    let collisions = find_priority_collisions(rules.iter().map(|r| (r.name.as_str(), r.priority)));
    match collisions.into_iter().next() {
        None => Ok(()),
        Some((priority, names)) => Err(MarqueeError::PriorityCollision {
            priority,
            existing_rule: names[0].clone(),
        }),
    }
}
