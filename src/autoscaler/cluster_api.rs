//! The boundary between the reconciler and the cluster's actual object store. In production this
//! would be backed by a real API client; the core never implements this trait itself.

use crate::core::events::AutoscalerEvent;
use crate::core::node::Node;
use crate::core::pod::Workload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    NotFound,
    Conflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventError {
    Unavailable,
}

pub trait ClusterApi {
    fn list_nodes(&self) -> Result<Vec<Node>, ListError>;
    fn list_scheduled_workloads(&self) -> Result<Vec<Workload>, ListError>;
    fn list_unschedulable_workloads(&self) -> Result<Vec<Workload>, ListError>;
    fn clear_unschedulable_condition(&mut self, workload_name: &str) -> Result<(), UpdateError>;
    fn record_event(&mut self, event: AutoscalerEvent) -> Result<(), EventError>;
}

/// In-memory test double. Workloads are distinguished as scheduled or unschedulable purely by
/// `Workload::is_unschedulable`.
#[derive(Debug, Default)]
pub struct InMemoryClusterApi {
    pub nodes: Vec<Node>,
    pub workloads: Vec<Workload>,
    pub events: Vec<AutoscalerEvent>,
}

impl InMemoryClusterApi {
    pub fn new(nodes: Vec<Node>, workloads: Vec<Workload>) -> Self {
        Self {
            nodes,
            workloads,
            events: Vec::new(),
        }
    }
}

impl ClusterApi for InMemoryClusterApi {
    fn list_nodes(&self) -> Result<Vec<Node>, ListError> {
        Ok(self.nodes.clone())
    }

    fn list_scheduled_workloads(&self) -> Result<Vec<Workload>, ListError> {
        Ok(self
            .workloads
            .iter()
            .filter(|w| !w.is_unschedulable())
            .cloned()
            .collect())
    }

    fn list_unschedulable_workloads(&self) -> Result<Vec<Workload>, ListError> {
        Ok(self
            .workloads
            .iter()
            .filter(|w| w.is_unschedulable())
            .cloned()
            .collect())
    }

    fn clear_unschedulable_condition(&mut self, workload_name: &str) -> Result<(), UpdateError> {
        let workload = self
            .workloads
            .iter_mut()
            .find(|w| w.name() == workload_name)
            .ok_or(UpdateError::NotFound)?;
        workload.clear_unschedulable();
        Ok(())
    }

    fn record_event(&mut self, event: AutoscalerEvent) -> Result<(), EventError> {
        self.events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::common::Resources;

    #[test]
    fn lists_split_by_unschedulable_condition() {
        let scheduled = Workload::new("w1", Resources::new(100, 256));
        let unschedulable = Workload::new("w2", Resources::new(100, 256)).mark_unschedulable(5.0);
        let api = InMemoryClusterApi::new(vec![], vec![scheduled, unschedulable]);
        assert_eq!(api.list_scheduled_workloads().unwrap().len(), 1);
        assert_eq!(api.list_unschedulable_workloads().unwrap().len(), 1);
    }

    #[test]
    fn clear_unschedulable_condition_updates_stored_workload() {
        let unschedulable = Workload::new("w2", Resources::new(100, 256)).mark_unschedulable(5.0);
        let mut api = InMemoryClusterApi::new(vec![], vec![unschedulable]);
        api.clear_unschedulable_condition("w2").unwrap();
        assert!(api.list_scheduled_workloads().unwrap().iter().any(|w| w.name() == "w2"));
    }
}
