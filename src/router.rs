//! Shortest-path route computation.
//!
//! Dijkstra over the graph with edge weights `length * cost_factor`. All
//! search state (distances, frontier, parent links) lives on the call's own
//! stack, so one computer can serve any number of concurrent callers.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Instant;

use tracing::debug;

use crate::cost::CostFunction;
use crate::graph::Graph;
use crate::route::{Route, RouteEdge, SingleRoute};

/// Frontier entry ordered by tentative distance, ties broken on node id so
/// the processing order is deterministic.
struct Frontier {
    distance: f64,
    node: u32,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.node.cmp(&other.node))
    }
}

/// Computes best routes over a graph under a cost function.
pub struct RouteComputer<'a> {
    graph: &'a Graph,
    cost: &'a dyn CostFunction,
}

impl<'a> RouteComputer<'a> {
    pub fn new(graph: &'a Graph, cost: &'a dyn CostFunction) -> Self {
        Self { graph, cost }
    }

    /// The minimum-cost route from `start` to `end`, or `None` when no path
    /// connects them. Panics when `start == end`.
    ///
    /// An edge is relaxed only when it strictly improves the tentative
    /// distance of its target, and a settled node is never expanded again;
    /// edges whose cost factor is infinite never relax and so are effectively
    /// absent.
    pub fn best_route_between(&self, start: u32, end: u32) -> Option<Route> {
        assert!(start != end, "route endpoints must differ");

        let n = self.graph.node_count();
        let started = Instant::now();

        let mut distance = vec![f64::INFINITY; n];
        // (previous node, edge taken from it); u32::MAX marks unreached
        let mut parent = vec![(u32::MAX, u32::MAX); n];
        let mut frontier = BinaryHeap::with_capacity(1024);

        distance[start as usize] = 0.0;
        frontier.push(Reverse(Frontier {
            distance: 0.0,
            node: start,
        }));

        let mut settled = 0u64;
        while let Some(Reverse(entry)) = frontier.pop() {
            let u = entry.node;
            // Skip stale entries; a settled node's distance is pinned below
            // every real one
            if entry.distance > distance[u as usize] {
                continue;
            }
            if u == end {
                let route = self.rebuild_chain(&parent, start, end);
                debug!(
                    settled,
                    cost = entry.distance,
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "route found"
                );
                return Some(route);
            }
            settled += 1;
            distance[u as usize] = f64::NEG_INFINITY;

            for i in 0..self.graph.node_out_degree(u) {
                let edge_id = self.graph.node_out_edge_id(u, i);
                let factor = self.cost.cost_factor(u, edge_id);
                let weight = self.graph.edge_length(edge_id) * factor;
                let v = self.graph.edge_target_node_id(edge_id);
                let tentative = entry.distance + weight;
                if tentative < distance[v as usize] {
                    distance[v as usize] = tentative;
                    parent[v as usize] = (u, edge_id);
                    frontier.push(Reverse(Frontier {
                        distance: tentative,
                        node: v,
                    }));
                }
            }
        }

        debug!(
            settled,
            elapsed_us = started.elapsed().as_micros() as u64,
            "no route between {start} and {end}"
        );
        None
    }

    fn rebuild_chain(&self, parent: &[(u32, u32)], start: u32, end: u32) -> Route {
        let mut chain = Vec::new();
        let mut node = end;
        while node != start {
            let (prev, edge_id) = parent[node as usize];
            chain.push(RouteEdge::of(self.graph, edge_id, prev, node));
            node = prev;
        }
        chain.reverse();
        Route::Single(SingleRoute::new(chain))
    }
}
