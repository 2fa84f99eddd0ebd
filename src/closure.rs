//! Transitive schema dependency closure.
//!
//! The schemas under `components.schemas` form a directed graph: `A -> B`
//! when `B` is referenced anywhere in the body of `A`. The closure of a seed
//! set is every identifier reachable from it. The graph may contain cycles,
//! and references may name schemas that are not defined.

use serde_json::Value;

use crate::refs::scan_refs;
use crate::types::{schema_definitions, ReferenceSet};

/// Result of a bounded closure expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    /// Seed plus every identifier discovered, defined or not.
    pub refs: ReferenceSet,
    /// Identifiers discovered but never expanded because the depth bound was hit.
    pub pending: ReferenceSet,
}

impl Closure {
    /// Returns true if expansion stopped at the depth bound with work left.
    pub fn is_truncated(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Compute the identifiers reachable from `seed`, expanding at most
/// `max_depth` levels.
pub fn dependency_closure(doc: &Value, seed: &ReferenceSet, max_depth: usize) -> ReferenceSet {
    expand_closure(doc, seed, max_depth).refs
}

/// Breadth-first closure expansion that also reports unexpanded work.
///
/// Each level is fully expanded before the next. A schema body is scanned at
/// most once, so cycles terminate. Identifiers with no definition stay in the
/// result; they simply have no outgoing edges.
pub fn expand_closure(doc: &Value, seed: &ReferenceSet, max_depth: usize) -> Closure {
    let schemas = schema_definitions(doc);

    let mut refs = seed.clone();
    let mut visited = ReferenceSet::new();
    let mut frontier: Vec<String> = seed.iter().cloned().collect();
    let mut depth = 0;

    while !frontier.is_empty() && depth < max_depth {
        let level = std::mem::take(&mut frontier);

        for name in level {
            if !visited.insert(name.clone()) {
                continue;
            }

            let Some(body) = schemas.and_then(|s| s.get(&name)) else {
                continue;
            };

            for nested in scan_refs(body) {
                if !visited.contains(&nested) && !refs.contains(&nested) {
                    refs.insert(nested.clone());
                    frontier.push(nested);
                }
            }
        }

        depth += 1;
    }

    Closure {
        refs,
        pending: frontier.into_iter().collect(),
    }
}
