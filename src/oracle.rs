//! The predicate oracle: "does workload W fit on node N given co-scheduled workloads S?"
//!
//! This is the scheduler's predicate logic, reused here to avoid divergence between what the
//! scheduler thinks fits and what the autoscaler thinks fits. Implementers should treat a real
//! predicate library as a black box and never re-derive its logic; `ResourceFitOracle` below is
//! a minimal stand-in, not a scheduler.

use std::collections::HashMap;
use std::sync::Mutex;

use lazy_static::lazy_static;

use crate::core::node::Node;
use crate::core::pod::Workload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleError {
    /// The oracle could not evaluate fit for implementation-specific reasons (e.g. an external
    /// predicate service timed out). Callers must treat this as "does not fit", never halt.
    Unknown,
}

/// Pure, deterministic, side-effect-free fit test. Must not perform I/O.
pub trait PredicateOracle {
    fn fits(
        &self,
        workload: &Workload,
        node: &Node,
        co_scheduled: &[&Workload],
    ) -> Result<bool, OracleError>;
}

/// Resource-only fit test: ignores `SchedulingConstraints` entirely and checks only that the
/// workload's request fits within the node's allocatable minus whatever is already
/// `co_scheduled` on it this simulation frame.
///
/// This is the bundled default, grounded in this codebase's existing `Fit` filter plugin
/// (`node.status.allocatable` vs `pod.spec.resources.requests`), generalized to account for
/// extended resources and co-scheduled workloads. It is explicitly not a substitute for a real
/// scheduler predicate library.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceFitOracle;

impl PredicateOracle for ResourceFitOracle {
    fn fits(
        &self,
        workload: &Workload,
        node: &Node,
        co_scheduled: &[&Workload],
    ) -> Result<bool, OracleError> {
        let mut remaining = node.status.allocatable.clone();
        for other in co_scheduled {
            remaining = remaining.saturating_sub(&other.spec.resources.requests);
        }
        Ok(workload.spec.resources.requests.fits_within(&remaining))
    }
}

lazy_static! {
    /// Built-in oracle implementations addressable by name, analogous to this codebase's plugin
    /// registry for filter plugins. Lets configuration select an oracle by a string key instead
    /// of wiring a concrete type at compile time.
    static ref BUILTIN_ORACLES: Mutex<HashMap<&'static str, ResourceFitOracle>> = {
        let mut registry = HashMap::new();
        registry.insert("resource-fit", ResourceFitOracle);
        Mutex::new(registry)
    };
}

/// Looks up a built-in oracle by name. Returns `None` for unknown names; callers fall back to
/// `ResourceFitOracle::default()` or surface a configuration error, as appropriate.
pub fn builtin_oracle(name: &str) -> Option<ResourceFitOracle> {
    BUILTIN_ORACLES.lock().unwrap().get(name).copied()
}
