//! Turning a graph and a choice of inputs and outputs into a [`Plan`].
use crate::error::{Error, Result};
use crate::eval::{Plan, PlanInput, Step};
use crate::graph::{Graph, Node, NodeId};

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// What to do with an input no output depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OnUnusedInput {
    #[default]
    Error,
    Ignore,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompileOptions {
    pub on_unused_input: OnUnusedInput,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_unused_input(mut self, policy: OnUnusedInput) -> Self {
        self.on_unused_input = policy;
        self
    }
}

/// Nodes reachable from `outputs` through origin records, not looking past `inputs`.
fn reachable(graph: &Graph, inputs: &HashSet<NodeId>, outputs: &[NodeId]) -> Result<HashSet<NodeId>> {
    let mut seen = HashSet::new();
    let mut stack: Vec<NodeId> = outputs.to_vec();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) || inputs.contains(&id) {
            continue;
        }
        if let Some(origin) = graph.node(id)?.origin() {
            stack.extend(origin.operands.iter().copied());
        }
    }
    Ok(seen)
}

/// Order the interior nodes of `reachable` so operands come before consumers, breaking ties by
/// creation order.
fn schedule(graph: &Graph, reachable: &HashSet<NodeId>, inputs: &HashSet<NodeId>) -> Result<Vec<NodeId>> {
    let mut interior: Vec<&Node> = vec![];
    for &id in reachable.difference(inputs) {
        let node = graph.node(id)?;
        if !node.is_placeholder() {
            interior.push(node);
        }
    }

    let mut indegree: HashMap<NodeId, usize> = HashMap::new();
    let mut consumers: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for node in &interior {
        let mut degree = 0;
        for &operand in node.origin().map_or(&[][..], |o| o.operands.as_slice()) {
            if reachable.contains(&operand) && !inputs.contains(&operand) {
                degree += 1;
                consumers.entry(operand).or_default().push(node.id());
            }
        }
        indegree.insert(node.id(), degree);
    }

    let mut frontier: BinaryHeap<Reverse<NodeId>> = indegree
        .iter()
        .filter(|&(_, &d)| d == 0)
        .map(|(&id, _)| Reverse(id))
        .collect();
    let mut order = Vec::with_capacity(interior.len());
    while let Some(Reverse(id)) = frontier.pop() {
        order.push(id);
        for &consumer in consumers.get(&id).map_or(&[][..], Vec::as_slice) {
            if let Some(d) = indegree.get_mut(&consumer) {
                *d -= 1;
                if *d == 0 {
                    frontier.push(Reverse(consumer));
                }
            }
        }
    }

    // Anything left unvisited sits on a cycle.
    if order.len() != interior.len() {
        let mut stuck: Vec<NodeId> = indegree
            .into_iter()
            .filter(|&(_, d)| d > 0)
            .map(|(id, _)| id)
            .collect();
        stuck.sort_unstable();
        return Err(Error::Internal(format!("cycle through nodes {stuck:?}")));
    }
    Ok(order)
}

/// Compile the sub-graph of `graph` computing `outputs` from `inputs`.
///
/// Traversal stops at inputs, so any node (not only a placeholder) may be an input. Every
/// placeholder the outputs depend on must be an input; inputs nothing depends on are rejected
/// unless `options` says to ignore them.
pub fn compile(
    graph: &Graph,
    inputs: &[NodeId],
    outputs: &[NodeId],
    options: &CompileOptions,
) -> Result<Plan> {
    if outputs.is_empty() {
        return Err(Error::Config("a plan needs at least one output".into()));
    }
    for &id in inputs.iter().chain(outputs) {
        graph.node(id)?;
    }
    let mut input_set = HashSet::with_capacity(inputs.len());
    for &id in inputs {
        if !input_set.insert(id) {
            return Err(Error::Config(format!(
                "{} ({id}) is listed as an input more than once",
                graph.node(id)?.label()
            )));
        }
    }

    let reachable = reachable(graph, &input_set, outputs)?;

    let mut missing: Vec<NodeId> = reachable
        .iter()
        .copied()
        .filter(|id| !input_set.contains(id))
        .filter(|&id| graph.node(id).is_ok_and(Node::is_placeholder))
        .collect();
    missing.sort_unstable();
    if let Some(&node) = missing.first() {
        return Err(Error::MissingInput {
            node,
            name: graph.node(node)?.label(),
        });
    }

    for &id in inputs {
        if !reachable.contains(&id) {
            let name = graph.node(id)?.label();
            match options.on_unused_input {
                OnUnusedInput::Error => return Err(Error::UnusedInput { node: id, name }),
                OnUnusedInput::Ignore => tracing::debug!(node = %id, %name, "ignoring unused input"),
            }
        }
    }

    let order = schedule(graph, &reachable, &input_set)?;

    let inputs = inputs
        .iter()
        .map(|&id| {
            let node = graph.node(id)?;
            Ok(PlanInput {
                id,
                name: node.label(),
                ty: node.ty().clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let steps = order
        .iter()
        .map(|&id| Step::from_node(graph, graph.node(id)?))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        inputs = inputs.len(),
        outputs = outputs.len(),
        steps = steps.len(),
        "compiled plan"
    );
    Ok(Plan::new(inputs, outputs.to_vec(), steps))
}
