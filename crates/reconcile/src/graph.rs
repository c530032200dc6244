//! Dependency graph builder
//!
//! Resolves each resource's subscribe/notify anchor names into directed
//! edges (notifier -> anchor -> subscriber) and rejects anything the engine
//! must never see: duplicate ids, references to undeclared anchors, and
//! cycles. The graph keeps bidirectional adjacency so the engine gets O(1)
//! access to both dependencies and dependents.

use crate::anchor::AnchorBus;
use crate::error::{Error, Result};
use crate::resource::Resource;
use std::collections::{BTreeSet, HashMap};

/// One resource plus its resolved dependency wiring.
#[derive(Debug, Clone)]
pub struct Node {
    pub resource: Resource,
    /// Indices of resources that must reach a terminal state first
    pub predecessors: BTreeSet<usize>,
    /// Indices of resources waiting on this one
    pub successors: BTreeSet<usize>,
}

/// A validated, acyclic resource graph in declaration order.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    by_id: HashMap<String, usize>,
}

impl Graph {
    /// Build a graph from declared resources, registering subscriptions
    /// and notifications on the bus as edges are resolved.
    ///
    /// The bus must be freshly declared for this run: its registrations
    /// must come from exactly these resources.
    ///
    /// Fails on invalid resources, duplicate ids, undeclared anchors, and
    /// cycles; the engine never runs a rejected graph.
    pub fn build(resources: Vec<Resource>, bus: &mut AnchorBus) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(resources.len());
        for (index, resource) in resources.iter().enumerate() {
            resource.validate()?;
            if by_id.insert(resource.id.clone(), index).is_some() {
                return Err(Error::DuplicateResource {
                    id: resource.id.clone(),
                });
            }
        }

        for resource in &resources {
            for anchor in &resource.subscribe {
                if !bus.contains(anchor) {
                    return Err(Error::UnknownAnchor {
                        anchor: anchor.clone(),
                        resource: Some(resource.id.clone()),
                    });
                }
                bus.register_subscriber(anchor, &resource.id)?;
            }
            if let Some(anchor) = &resource.notify {
                if !bus.contains(anchor) {
                    return Err(Error::UnknownAnchor {
                        anchor: anchor.clone(),
                        resource: Some(resource.id.clone()),
                    });
                }
                bus.register_notifier(anchor, &resource.id)?;
            }
        }

        let mut nodes: Vec<Node> = resources
            .into_iter()
            .map(|resource| Node {
                resource,
                predecessors: BTreeSet::new(),
                successors: BTreeSet::new(),
            })
            .collect();

        // Every notifier of a subscribed anchor is a predecessor.
        for anchor in bus.names().map(String::from).collect::<Vec<_>>() {
            let notifiers: Vec<usize> = bus
                .notifiers_of(&anchor)?
                .iter()
                .map(|id| by_id[id.as_str()])
                .collect();
            let subscribers: Vec<usize> = bus
                .subscribers_of(&anchor)?
                .iter()
                .map(|id| by_id[id.as_str()])
                .collect();
            for &from in &notifiers {
                for &to in &subscribers {
                    nodes[from].successors.insert(to);
                    nodes[to].predecessors.insert(from);
                }
            }
        }

        let graph = Self { nodes, by_id };
        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node index by resource id.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Topological order, ties broken by declaration order.
    ///
    /// Deterministic: the same declared graph always yields the same order.
    pub fn topo_order(&self) -> Vec<usize> {
        let mut in_degree: Vec<usize> =
            self.nodes.iter().map(|n| n.predecessors.len()).collect();
        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(&index) = ready.iter().next() {
            ready.remove(&index);
            order.push(index);
            for &succ in &self.nodes[index].successors {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.insert(succ);
                }
            }
        }
        order
    }

    /// Depth-first cycle check; a back-edge yields `CycleDetected` naming
    /// the participating resource ids in walk order.
    fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Grey,
            Black,
        }

        let mut marks = vec![Mark::White; self.nodes.len()];
        let mut path: Vec<usize> = Vec::new();

        for start in 0..self.nodes.len() {
            if marks[start] != Mark::White {
                continue;
            }
            // Iterative DFS; (node, remaining successors) pairs
            let mut stack: Vec<(usize, Vec<usize>)> = Vec::new();
            marks[start] = Mark::Grey;
            path.push(start);
            stack.push((start, self.nodes[start].successors.iter().copied().collect()));

            loop {
                let next = match stack.last_mut() {
                    Some((_, succs)) => succs.pop(),
                    None => break,
                };
                match next {
                    Some(next) => match marks[next] {
                        Mark::Grey => {
                            let cycle_start =
                                path.iter().position(|&n| n == next).unwrap_or(0);
                            let mut ids: Vec<String> = path[cycle_start..]
                                .iter()
                                .map(|&n| self.nodes[n].resource.id.clone())
                                .collect();
                            ids.push(self.nodes[next].resource.id.clone());
                            return Err(Error::CycleDetected { ids });
                        }
                        Mark::White => {
                            marks[next] = Mark::Grey;
                            path.push(next);
                            stack.push((
                                next,
                                self.nodes[next].successors.iter().copied().collect(),
                            ));
                        }
                        Mark::Black => {}
                    },
                    None => {
                        if let Some((node, _)) = stack.pop() {
                            marks[node] = Mark::Black;
                            path.pop();
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus(names: &[&str]) -> AnchorBus {
        AnchorBus::new(names.iter().copied())
    }

    #[test]
    fn test_build_resolves_anchor_edges() {
        let mut bus = bus(&["install::end", "config::end"]);
        let graph = Graph::build(
            vec![
                Resource::new("install", "pkg-install ").notify("install::end"),
                Resource::new("config", "write-config ").notify("config::end"),
                Resource::new("db-sync", "db-upgrade ")
                    .subscribe("install::end")
                    .subscribe("config::end"),
            ],
            &mut bus,
        )
        .unwrap();

        let db_sync = graph.index_of("db-sync").unwrap();
        let install = graph.index_of("install").unwrap();
        let config = graph.index_of("config").unwrap();
        assert_eq!(
            graph.nodes()[db_sync].predecessors,
            BTreeSet::from([install, config])
        );
        assert!(graph.nodes()[install].successors.contains(&db_sync));
    }

    #[test]
    fn test_build_rejects_unknown_anchor() {
        let mut bus = bus(&["install::end"]);
        let err = Graph::build(
            vec![Resource::new("db-sync", "db-upgrade ").subscribe("config::end")],
            &mut bus,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownAnchor { .. }));
    }

    #[test]
    fn test_build_rejects_duplicate_ids() {
        let mut bus = bus(&[]);
        let err = Graph::build(
            vec![
                Resource::new("db-sync", "db-upgrade "),
                Resource::new("db-sync", "db-upgrade "),
            ],
            &mut bus,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateResource { .. }));
    }

    #[test]
    fn test_build_rejects_cycle() {
        let mut bus = bus(&["a::end", "b::end"]);
        let err = Graph::build(
            vec![
                Resource::new("a", "run-a ")
                    .subscribe("b::end")
                    .notify("a::end"),
                Resource::new("b", "run-b ")
                    .subscribe("a::end")
                    .notify("b::end"),
            ],
            &mut bus,
        )
        .unwrap_err();
        match err {
            Error::CycleDetected { ids } => {
                assert!(ids.contains(&"a".to_string()));
                assert!(ids.contains(&"b".to_string()));
            }
            other => panic!("expected CycleDetected, got {other}"),
        }
    }

    #[test]
    fn test_self_notify_subscribe_is_a_cycle() {
        let mut bus = bus(&["loop::end"]);
        let err = Graph::build(
            vec![
                Resource::new("loop", "run-loop ")
                    .subscribe("loop::end")
                    .notify("loop::end"),
            ],
            &mut bus,
        )
        .unwrap_err();
        assert!(matches!(err, Error::CycleDetected { .. }));
    }

    #[test]
    fn test_topo_order_ties_break_by_declaration() {
        let mut bus = bus(&["root::end"]);
        let graph = Graph::build(
            vec![
                Resource::new("root", "run-root ").notify("root::end"),
                Resource::new("left", "run-left ").subscribe("root::end"),
                Resource::new("right", "run-right ").subscribe("root::end"),
            ],
            &mut bus,
        )
        .unwrap();

        let order = graph.topo_order();
        assert_eq!(order, vec![0, 1, 2]);
    }
}
