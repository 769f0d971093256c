// Arena-backed variable graph.
//
// Values that hold structure (objects, lists) live in an arena and are
// referenced by index, so one node can be reachable from several keys or
// from itself. Persisting the graph renumbers every reachable node in visit
// order; loading it back only has to check that each reference lands inside
// the arena, because indices are already the wiring.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use thiserror::Error;

/// Index of a node inside a [`VarGraph`] arena.
pub type NodeId = usize;

/// A single variable value. Structured values are always behind a `Ref`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Ref(NodeId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Object(BTreeMap<String, VarValue>),
    List(Vec<VarValue>),
}

impl Node {
    fn children(&self) -> Box<dyn Iterator<Item = &VarValue> + '_> {
        match self {
            Node::Object(fields) => Box::new(fields.values()),
            Node::List(items) => Box::new(items.iter()),
        }
    }

    fn remap(&self, ids: &HashMap<NodeId, NodeId>) -> Node {
        match self {
            Node::Object(fields) => Node::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), remap_value(v, ids)))
                    .collect(),
            ),
            Node::List(items) => Node::List(items.iter().map(|v| remap_value(v, ids)).collect()),
        }
    }
}

fn visit(
    value: &VarValue,
    ids: &mut HashMap<NodeId, NodeId>,
    order: &mut Vec<NodeId>,
    queue: &mut VecDeque<NodeId>,
) {
    if let VarValue::Ref(id) = value {
        if !ids.contains_key(id) {
            ids.insert(*id, order.len());
            order.push(*id);
            queue.push_back(*id);
        }
    }
}

fn remap_value(value: &VarValue, ids: &HashMap<NodeId, NodeId>) -> VarValue {
    match value {
        VarValue::Ref(id) => VarValue::Ref(ids[id]),
        other => other.clone(),
    }
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Reference to node {0} points outside the graph")]
    DanglingRef(NodeId),

    #[error("Node {0} is not an object")]
    NotAnObject(NodeId),

    #[error("Node {0} is not a list")]
    NotAList(NodeId),
}

/// On-disk form of a graph: the root keys plus every reachable node,
/// numbered in first-visit order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedGraph {
    pub roots: BTreeMap<String, VarValue>,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// One variable scope: named roots over a shared node arena.
#[derive(Debug, Clone, Default)]
pub struct VarGraph {
    nodes: Vec<Node>,
    roots: BTreeMap<String, VarValue>,
}

impl VarGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&VarValue> {
        self.roots.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: VarValue) -> Result<(), GraphError> {
        self.check(&value)?;
        self.roots.insert(key.into(), value);
        Ok(())
    }

    #[allow(dead_code)]
    pub fn remove(&mut self, key: &str) -> Option<VarValue> {
        self.roots.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Arena size, reachable or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Drop every node no root can reach and renumber the rest. Node ids
    /// taken before the call are invalid afterwards. Returns how many nodes
    /// were dropped.
    pub fn compact(&mut self) -> usize {
        let before = self.nodes.len();
        let PersistedGraph { roots, nodes } = self.encode();
        if nodes.len() == before {
            return 0;
        }
        self.roots = roots;
        self.nodes = nodes;
        before - self.nodes.len()
    }

    /// Allocate a fresh node and return a reference to it.
    pub fn alloc(&mut self, node: Node) -> Result<VarValue, GraphError> {
        for child in node.children() {
            self.check(child)?;
        }
        self.nodes.push(node);
        Ok(VarValue::Ref(self.nodes.len() - 1))
    }

    pub fn set_field(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: VarValue,
    ) -> Result<(), GraphError> {
        self.check(&value)?;
        match self.nodes.get_mut(id) {
            Some(Node::Object(fields)) => {
                fields.insert(key.into(), value);
                Ok(())
            }
            Some(Node::List(_)) => Err(GraphError::NotAnObject(id)),
            None => Err(GraphError::DanglingRef(id)),
        }
    }

    pub fn push_item(&mut self, id: NodeId, value: VarValue) -> Result<(), GraphError> {
        self.check(&value)?;
        match self.nodes.get_mut(id) {
            Some(Node::List(items)) => {
                items.push(value);
                Ok(())
            }
            Some(Node::Object(_)) => Err(GraphError::NotAList(id)),
            None => Err(GraphError::DanglingRef(id)),
        }
    }

    fn check(&self, value: &VarValue) -> Result<(), GraphError> {
        match value {
            VarValue::Ref(id) if *id >= self.nodes.len() => Err(GraphError::DanglingRef(*id)),
            _ => Ok(()),
        }
    }

    /// Copy a plain JSON tree into the arena.
    pub fn import_json(&mut self, json: &serde_json::Value) -> VarValue {
        use serde_json::Value;
        match json {
            Value::Null => VarValue::Null,
            Value::Bool(b) => VarValue::Bool(*b),
            Value::Number(n) => VarValue::Number(n.as_f64().unwrap_or_default()),
            Value::String(s) => VarValue::Text(s.clone()),
            Value::Array(items) => {
                let items = items.iter().map(|item| self.import_json(item)).collect();
                self.nodes.push(Node::List(items));
                VarValue::Ref(self.nodes.len() - 1)
            }
            Value::Object(fields) => {
                let fields = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), self.import_json(v)))
                    .collect();
                self.nodes.push(Node::Object(fields));
                VarValue::Ref(self.nodes.len() - 1)
            }
        }
    }

    /// Render a value as plain JSON. A node met again on its own path is
    /// written as `"[Circular]"`.
    pub fn to_json(&self, value: &VarValue) -> serde_json::Value {
        self.to_json_guarded(value, &mut HashSet::new())
    }

    fn to_json_guarded(&self, value: &VarValue, path: &mut HashSet<NodeId>) -> serde_json::Value {
        use serde_json::Value;
        match value {
            VarValue::Null => Value::Null,
            VarValue::Bool(b) => Value::Bool(*b),
            VarValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            VarValue::Text(s) => Value::String(s.clone()),
            VarValue::Ref(id) => {
                if !path.insert(*id) {
                    return Value::String("[Circular]".to_string());
                }
                let rendered = match self.nodes.get(*id) {
                    Some(Node::Object(fields)) => Value::Object(
                        fields
                            .iter()
                            .map(|(k, v)| (k.clone(), self.to_json_guarded(v, path)))
                            .collect(),
                    ),
                    Some(Node::List(items)) => Value::Array(
                        items
                            .iter()
                            .map(|v| self.to_json_guarded(v, path))
                            .collect(),
                    ),
                    None => Value::Null,
                };
                path.remove(id);
                rendered
            }
        }
    }

    /// Text form used when a variable is interpolated into a message.
    pub fn display(&self, value: &VarValue) -> String {
        match value {
            VarValue::Null => String::new(),
            VarValue::Bool(b) => b.to_string(),
            VarValue::Number(n) => n.to_string(),
            VarValue::Text(s) => s.clone(),
            VarValue::Ref(_) => self.to_json(value).to_string(),
        }
    }

    /// Number every node reachable from the roots in breadth-first order
    /// and emit them once each. Unreachable nodes are dropped.
    pub fn encode(&self) -> PersistedGraph {
        let mut ids: HashMap<NodeId, NodeId> = HashMap::new();
        let mut order: Vec<NodeId> = Vec::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();

        for value in self.roots.values() {
            visit(value, &mut ids, &mut order, &mut queue);
        }
        while let Some(id) = queue.pop_front() {
            for child in self.nodes[id].children() {
                visit(child, &mut ids, &mut order, &mut queue);
            }
        }

        PersistedGraph {
            roots: self
                .roots
                .iter()
                .map(|(k, v)| (k.clone(), remap_value(v, &ids)))
                .collect(),
            nodes: order.iter().map(|id| self.nodes[*id].remap(&ids)).collect(),
        }
    }

    /// Rebuild a graph from its persisted form. All nodes are allocated up
    /// front; every reference is then checked against the arena.
    pub fn decode(persisted: PersistedGraph) -> Result<Self, GraphError> {
        let graph = Self {
            nodes: persisted.nodes,
            roots: persisted.roots,
        };
        for value in graph.roots.values() {
            graph.check(value)?;
        }
        for node in &graph.nodes {
            for child in node.children() {
                graph.check(child)?;
            }
        }
        Ok(graph)
    }
}
