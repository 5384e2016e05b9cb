//! Node-group abstraction: the boundary between the reconciler and whatever infrastructure API
//! actually creates and destroys nodes. Concrete providers are loaded once at startup and never
//! hot-swapped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::node::Node;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeGroup {
    pub name: String,
    pub min_size: u64,
    pub max_size: u64,
    pub current_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderError {
    /// The requested group name is not known to this provider.
    UnknownGroup,
    /// The requested size falls outside `[min_size, max_size]`.
    SizeOutOfBounds,
    /// The named node does not belong to the named group.
    NodeNotInGroup,
    /// The underlying infrastructure API rejected the request.
    Rejected,
}

/// Contract: `resize` and `delete_node` are asynchronous with respect to the cluster's
/// observation of membership — the reconciler never assumes the very next tick already reflects
/// a mutation it just requested. Idempotent: resizing a group to its current size is a no-op
/// success.
pub trait NodeGroupProvider {
    fn groups(&self) -> Vec<NodeGroup>;
    fn node_group_for_node(&self, node_name: &str) -> Option<NodeGroup>;
    fn template_node(&self, group: &NodeGroup) -> Node;
    fn resize(&mut self, group: &str, new_size: u64) -> Result<(), ProviderError>;
    fn delete_node(&mut self, group: &str, node_name: &str) -> Result<(), ProviderError>;
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NodeGroupConfig {
    pub name: String,
    pub min_size: u64,
    pub max_size: u64,
    pub node_template: Node,
}

struct GroupState {
    config: NodeGroupConfig,
    current_size: u64,
    next_node_index: u64,
    members: Vec<Node>,
}

/// In-memory reference implementation for tests and the demonstration binary. Tracks group sizes
/// in a map and fabricates deterministic node names (`"{group}-{counter}"`) on resize.
pub struct StaticNodeGroupProvider {
    groups: BTreeMap<String, GroupState>,
}

impl StaticNodeGroupProvider {
    pub fn new(configs: Vec<NodeGroupConfig>) -> Self {
        let groups = configs
            .into_iter()
            .map(|config| {
                (
                    config.name.clone(),
                    GroupState {
                        config,
                        current_size: 0,
                        next_node_index: 0,
                        members: Vec::new(),
                    },
                )
            })
            .collect();
        Self { groups }
    }

    /// Names of the nodes currently believed to exist in `group`, in creation order.
    pub fn members_of(&self, group: &str) -> Vec<String> {
        self.nodes_of(group)
            .into_iter()
            .map(|node| node.metadata.name)
            .collect()
    }

    /// The actual `Node` objects currently believed to exist in `group`, in creation order,
    /// cloned from `node_template` with the `origin` and `node-group` labels stamped on.
    pub fn nodes_of(&self, group: &str) -> Vec<Node> {
        self.groups
            .get(group)
            .map(|state| state.members.clone())
            .unwrap_or_default()
    }
}

impl NodeGroupProvider for StaticNodeGroupProvider {
    fn groups(&self) -> Vec<NodeGroup> {
        self.groups
            .values()
            .map(|state| NodeGroup {
                name: state.config.name.clone(),
                min_size: state.config.min_size,
                max_size: state.config.max_size,
                current_size: state.current_size,
            })
            .collect()
    }

    fn node_group_for_node(&self, node_name: &str) -> Option<NodeGroup> {
        self.groups.values().find_map(|state| {
            state
                .members
                .iter()
                .any(|member| member.name() == node_name)
                .then(|| NodeGroup {
                    name: state.config.name.clone(),
                    min_size: state.config.min_size,
                    max_size: state.config.max_size,
                    current_size: state.current_size,
                })
        })
    }

    fn template_node(&self, group: &NodeGroup) -> Node {
        self.groups
            .get(&group.name)
            .map(|state| state.config.node_template.clone())
            .unwrap_or_else(|| Node::new("template", Default::default()))
    }

    fn resize(&mut self, group: &str, new_size: u64) -> Result<(), ProviderError> {
        let state = self.groups.get_mut(group).ok_or(ProviderError::UnknownGroup)?;
        if new_size < state.config.min_size || new_size > state.config.max_size {
            return Err(ProviderError::SizeOutOfBounds);
        }
        if new_size == state.current_size {
            return Ok(());
        }
        while state.current_size < new_size {
            let name = format!("{}-{}", state.config.name, state.next_node_index);
            state.next_node_index += 1;
            let mut node = state
                .config
                .node_template
                .clone()
                .with_origin_label()
                .with_node_group(state.config.name.clone());
            node.metadata.name = name;
            state.members.push(node);
            state.current_size += 1;
        }
        while state.current_size > new_size {
            state.members.pop();
            state.current_size -= 1;
        }
        Ok(())
    }

    fn delete_node(&mut self, group: &str, node_name: &str) -> Result<(), ProviderError> {
        let state = self.groups.get_mut(group).ok_or(ProviderError::UnknownGroup)?;
        if state.current_size.saturating_sub(1) < state.config.min_size {
            return Err(ProviderError::SizeOutOfBounds);
        }
        let position = state
            .members
            .iter()
            .position(|member| member.name() == node_name)
            .ok_or(ProviderError::NodeNotInGroup)?;
        state.members.remove(position);
        state.current_size -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::common::Resources;

    fn provider() -> StaticNodeGroupProvider {
        StaticNodeGroupProvider::new(vec![NodeGroupConfig {
            name: "pool-a".to_string(),
            min_size: 1,
            max_size: 3,
            node_template: Node::new("template", Resources::new(1000, 4096)),
        }])
    }

    #[test]
    fn resize_up_creates_deterministically_named_nodes() {
        let mut provider = provider();
        provider.resize("pool-a", 2).unwrap();
        assert_eq!(provider.members_of("pool-a"), vec!["pool-a-0", "pool-a-1"]);
    }

    #[test]
    fn resize_up_stamps_origin_and_node_group_labels() {
        let mut provider = provider();
        provider.resize("pool-a", 1).unwrap();
        let node = provider.nodes_of("pool-a").into_iter().next().unwrap();
        assert_eq!(
            node.metadata.labels.get(crate::core::node::ORIGIN_LABEL).map(String::as_str),
            Some(crate::core::node::CLUSTER_AUTOSCALER_ORIGIN)
        );
        assert_eq!(node.status.node_group.as_deref(), Some("pool-a"));
    }

    #[test]
    fn resize_respects_max_size() {
        let mut provider = provider();
        assert_eq!(provider.resize("pool-a", 10), Err(ProviderError::SizeOutOfBounds));
    }

    #[test]
    fn resize_to_current_size_is_a_no_op_success() {
        let mut provider = provider();
        provider.resize("pool-a", 2).unwrap();
        assert_eq!(provider.resize("pool-a", 2), Ok(()));
        assert_eq!(provider.members_of("pool-a").len(), 2);
    }

    #[test]
    fn delete_node_respects_min_size() {
        let mut provider = provider();
        provider.resize("pool-a", 1).unwrap();
        assert_eq!(
            provider.delete_node("pool-a", "pool-a-0"),
            Err(ProviderError::SizeOutOfBounds)
        );
    }

    #[test]
    fn delete_unknown_node_errors() {
        let mut provider = provider();
        provider.resize("pool-a", 2).unwrap();
        assert_eq!(
            provider.delete_node("pool-a", "ghost"),
            Err(ProviderError::NodeNotInGroup)
        );
    }
}
