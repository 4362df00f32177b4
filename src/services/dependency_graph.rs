//! Dependency graph checks: cycle detection and failure cascades.
//!
//! Operates on snapshots of the flat task store; edges are id lists, never
//! object references.

use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

use crate::domain::models::{Task, TaskStatus};

/// Marking state for the depth-first search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

/// Stateless service for dependency analysis over task snapshots.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph;

impl DependencyGraph {
    pub fn new() -> Self {
        Self
    }

    /// Find every dependency cycle among unfinished tasks.
    ///
    /// Runs a three-color DFS over the induced subgraph of tasks that are
    /// not yet terminal; edges to finished tasks cannot participate in a
    /// cycle and are skipped.
    pub fn find_cycles(&self, tasks: &[Task]) -> Vec<Vec<Uuid>> {
        let unfinished: HashSet<Uuid> = tasks
            .iter()
            .filter(|t| !t.status.is_terminal())
            .map(|t| t.id)
            .collect();

        let mut adjacency: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for task in tasks.iter().filter(|t| unfinished.contains(&t.id)) {
            adjacency.insert(
                task.id,
                task.dependencies
                    .iter()
                    .filter(|d| unfinished.contains(d))
                    .copied()
                    .collect(),
            );
        }

        let mut colors: HashMap<Uuid, Color> =
            adjacency.keys().map(|&id| (id, Color::White)).collect();
        let mut stack = Vec::new();
        let mut cycles = Vec::new();

        let mut roots: Vec<Uuid> = adjacency.keys().copied().collect();
        roots.sort();
        for root in roots {
            if colors[&root] == Color::White {
                visit(root, &adjacency, &mut colors, &mut stack, &mut cycles);
            }
        }
        cycles
    }

    /// Transitive pending dependents of the given failed tasks.
    ///
    /// Returned in breadth-first order so failures propagate outward from
    /// the original failure set.
    pub fn cascade_targets(&self, failed: &HashSet<Uuid>, tasks: &[Task]) -> Vec<Uuid> {
        let mut dependents: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for task in tasks.iter().filter(|t| t.status == TaskStatus::Pending) {
            for dep in &task.dependencies {
                dependents.entry(*dep).or_default().push(task.id);
            }
        }

        let mut queue: VecDeque<Uuid> = failed.iter().copied().collect();
        let mut seen: HashSet<Uuid> = failed.clone();
        let mut targets = Vec::new();

        while let Some(id) = queue.pop_front() {
            if let Some(next) = dependents.get(&id) {
                for &dependent in next {
                    if seen.insert(dependent) {
                        targets.push(dependent);
                        queue.push_back(dependent);
                    }
                }
            }
        }
        targets
    }

    /// Validate that every dependency of `task` exists in the store.
    pub fn dependencies_exist(&self, task: &Task, all: &[Task]) -> bool {
        let known: HashSet<Uuid> = all.iter().map(|t| t.id).collect();
        task.dependencies.iter().all(|d| known.contains(d))
    }
}

fn visit(
    node: Uuid,
    adjacency: &HashMap<Uuid, Vec<Uuid>>,
    colors: &mut HashMap<Uuid, Color>,
    stack: &mut Vec<Uuid>,
    cycles: &mut Vec<Vec<Uuid>>,
) {
    colors.insert(node, Color::Grey);
    stack.push(node);

    if let Some(neighbors) = adjacency.get(&node) {
        for &next in neighbors {
            match colors.get(&next).copied().unwrap_or(Color::Black) {
                Color::White => visit(next, adjacency, colors, stack, cycles),
                Color::Grey => {
                    // Back edge: everything from `next` up the stack is on
                    // the cycle.
                    if let Some(pos) = stack.iter().position(|&id| id == next) {
                        cycles.push(stack[pos..].to_vec());
                    }
                }
                Color::Black => {}
            }
        }
    }

    stack.pop();
    colors.insert(node, Color::Black);
}
