use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Stable node identity for one parsed script, assigned by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in the task graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

/// Task graph node variants. The grammar builds trees, so the graph is
/// acyclic by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    /// A named command with ordered string arguments.
    Command { name: String, args: Vec<String> },
    /// Sequential data flow: consumer starts only after producer's result exists.
    Pipe { producer: Box<Node>, consumer: Box<Node> },
    /// Concurrent fan-out over branch sub-graphs, in declaration order.
    Parallel { branches: Vec<Node> },
    /// Synchronization barrier closing exactly one parallel group.
    Merge { group: Box<Node> },
}

impl Node {
    /// Compact structural rendering, ignoring node ids. Two scripts that
    /// produce the same shape are execution-equivalent.
    pub fn shape(&self) -> String {
        match &self.kind {
            NodeKind::Command { name, args } => {
                if args.is_empty() {
                    name.clone()
                } else {
                    format!("{}({})", name, args.join(","))
                }
            }
            NodeKind::Pipe { producer, consumer } => {
                format!("pipe({},{})", producer.shape(), consumer.shape())
            }
            NodeKind::Parallel { branches } => {
                let inner: Vec<String> = branches.iter().map(|b| b.shape()).collect();
                format!("par[{}]", inner.join(" "))
            }
            NodeKind::Merge { group } => format!("merge({})", group.shape()),
        }
    }

    fn collect_commands<'a>(&'a self, out: &mut Vec<&'a str>) {
        match &self.kind {
            NodeKind::Command { name, .. } => out.push(name),
            NodeKind::Pipe { producer, consumer } => {
                producer.collect_commands(out);
                consumer.collect_commands(out);
            }
            NodeKind::Parallel { branches } => {
                for b in branches {
                    b.collect_commands(out);
                }
            }
            NodeKind::Merge { group } => group.collect_commands(out),
        }
    }

    fn check(&self) -> std::result::Result<(), GraphError> {
        match &self.kind {
            NodeKind::Command { .. } => Ok(()),
            NodeKind::Pipe { producer, consumer } => {
                producer.check()?;
                consumer.check()
            }
            NodeKind::Parallel { branches } => {
                for b in branches {
                    b.check()?;
                }
                Ok(())
            }
            NodeKind::Merge { group } => {
                if !matches!(group.kind, NodeKind::Parallel { .. }) {
                    return Err(GraphError::MergeWithoutParallel { node: self.id });
                }
                group.check()
            }
        }
    }
}

/// A parsed script: the raw text plus its task graph. Immutable after
/// parsing — the executor only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub source: String,
    /// Top-level pipelines, run in order.
    pub pipelines: Vec<Node>,
    pub node_count: usize,
}

impl Script {
    /// Command names in left-to-right declaration order.
    pub fn command_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for p in &self.pipelines {
            p.collect_commands(&mut out);
        }
        out
    }

    /// Structural rendering of the whole graph, one line per pipeline.
    pub fn shape(&self) -> String {
        self.pipelines
            .iter()
            .map(|p| p.shape())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Verify structural invariants the grammar is supposed to guarantee.
    pub fn validate(&self) -> std::result::Result<(), GraphError> {
        for p in &self.pipelines {
            p.check()?;
        }
        Ok(())
    }
}
