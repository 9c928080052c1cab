//! Arena-backed search tree.

use std::collections::VecDeque;

use fire_evac_core::{Direction, Position};

/// Index of a node inside a [`SearchTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Clone, Debug)]
struct Node {
    state: Position,
    parent: Option<NodeId>,
    children: [Option<NodeId>; Direction::COUNT],
    visits: u32,
    value: f64,
}

impl Node {
    fn new(state: Position, parent: Option<NodeId>) -> Self {
        Self {
            state,
            parent,
            children: [None; Direction::COUNT],
            visits: 0,
            value: 0.0,
        }
    }
}

/// Search tree whose nodes live in a single vector.
///
/// Children are addressed by the direction that leads to them. Parent links
/// are plain indices used only while backpropagating, so the arena owns every
/// node and no reference cycles exist.
#[derive(Clone, Debug)]
pub struct SearchTree {
    nodes: Vec<Node>,
}

impl SearchTree {
    /// Creates a tree containing only a root for `state`.
    #[must_use]
    pub fn new(state: Position) -> Self {
        Self {
            nodes: vec![Node::new(state, None)],
        }
    }

    /// Identifier of the root node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Reports whether the tree has no nodes. Always false for a built tree.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Cell represented by `node`.
    #[must_use]
    pub fn state(&self, node: NodeId) -> Position {
        self.nodes[node.0].state
    }

    /// Number of rollouts that passed through `node`.
    #[must_use]
    pub fn visits(&self, node: NodeId) -> u32 {
        self.nodes[node.0].visits
    }

    /// Sum of the rollout rewards that passed through `node`.
    #[must_use]
    pub fn value(&self, node: NodeId) -> f64 {
        self.nodes[node.0].value
    }

    /// Parent of `node`, or `None` for the root.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    /// Child reached from `node` by moving in `direction`, if expanded.
    #[must_use]
    pub fn child(&self, node: NodeId, direction: Direction) -> Option<NodeId> {
        self.nodes[node.0].children[direction.index()]
    }

    /// Expanded children of `node` in [`Direction::ALL`] order.
    pub fn children(&self, node: NodeId) -> impl Iterator<Item = (Direction, NodeId)> + '_ {
        let children = &self.nodes[node.0].children;
        Direction::ALL
            .into_iter()
            .filter_map(move |direction| children[direction.index()].map(|id| (direction, id)))
    }

    pub(crate) fn add_child(
        &mut self,
        parent: NodeId,
        direction: Direction,
        state: Position,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(state, Some(parent)));
        self.nodes[parent.0].children[direction.index()] = Some(id);
        id
    }

    pub(crate) fn backpropagate(&mut self, from: NodeId, reward: f64) {
        let mut current = Some(from);
        while let Some(id) = current {
            let node = &mut self.nodes[id.0];
            node.visits = node.visits.saturating_add(1);
            node.value += reward;
            current = node.parent;
        }
    }

    /// Copies the subtree rooted at `node` into a fresh arena.
    #[must_use]
    pub fn subtree(&self, node: NodeId) -> SearchTree {
        let mut nodes: Vec<Node> = Vec::new();
        let mut queue: VecDeque<(NodeId, Option<(NodeId, usize)>)> = VecDeque::new();
        queue.push_back((node, None));

        while let Some((source_id, link)) = queue.pop_front() {
            let source = &self.nodes[source_id.0];
            let id = NodeId(nodes.len());
            nodes.push(Node {
                state: source.state,
                parent: link.map(|(parent, _)| parent),
                children: [None; Direction::COUNT],
                visits: source.visits,
                value: source.value,
            });

            if let Some((parent, slot)) = link {
                nodes[parent.0].children[slot] = Some(id);
            }

            for (slot, child) in source.children.iter().enumerate() {
                if let Some(child) = child {
                    queue.push_back((*child, Some((id, slot))));
                }
            }
        }

        SearchTree { nodes }
    }
}
