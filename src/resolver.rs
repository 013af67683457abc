//! Task dependency resolver
//!
//! Pure graph logic over an in-memory snapshot of the task collection.
//! The store loads a snapshot, builds a `TaskGraph`, and answers gating
//! questions without touching the database again.
//!
//! Edges point from a task to its prerequisites. A reverse index is
//! built up front so dependent lookups do not scan every node.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use crate::db::schemas::TaskDoc;
use crate::types::{Result, WaypointError};

/// One task as the resolver sees it
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub id: String,
    pub title: String,
    pub prerequisites: Vec<String>,
}

/// Gate decision for one (user, task) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartCheck {
    pub can_start: bool,
    /// Prerequisite ids that are not yet done, in task order
    pub blocked_by: Vec<String>,
}

/// A task ranked by how many other tasks wait on it
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Bottleneck {
    pub task_id: String,
    pub title: String,
    pub dependent_count: usize,
}

/// Immutable dependency graph over a task snapshot
#[derive(Debug, Default)]
pub struct TaskGraph {
    nodes: HashMap<String, TaskNode>,
    /// task id -> ids of tasks that list it as a prerequisite
    dependents: HashMap<String, Vec<String>>,
}

impl TaskGraph {
    /// Build the graph and its reverse index from a snapshot. Dangling
    /// prerequisite ids are kept (they block their task) but logged.
    pub fn from_tasks(tasks: &[TaskDoc]) -> Self {
        let mut nodes = HashMap::with_capacity(tasks.len());
        for task in tasks {
            let id = task.id_hex();
            if id.is_empty() {
                continue;
            }
            nodes.insert(
                id.clone(),
                TaskNode {
                    id,
                    title: task.title.clone(),
                    prerequisites: task.prerequisites.clone(),
                },
            );
        }

        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for node in nodes.values() {
            for prereq in &node.prerequisites {
                if !nodes.contains_key(prereq) {
                    warn!(task = %node.id, prerequisite = %prereq, "prerequisite refers to an unknown task");
                }
                dependents
                    .entry(prereq.clone())
                    .or_default()
                    .push(node.id.clone());
            }
        }
        for list in dependents.values_mut() {
            list.sort();
        }

        Self { nodes, dependents }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, task_id: &str) -> Option<&TaskNode> {
        self.nodes.get(task_id)
    }

    /// Whether a user with the given completed set may start a task.
    /// Unknown tasks have no prerequisites and may always start.
    /// Unknown prerequisites count as incomplete, so they block.
    pub fn can_start(&self, task_id: &str, completed: &HashSet<String>) -> StartCheck {
        let Some(node) = self.nodes.get(task_id) else {
            return StartCheck {
                can_start: true,
                blocked_by: Vec::new(),
            };
        };
        let blocked_by: Vec<String> = node
            .prerequisites
            .iter()
            .filter(|p| !completed.contains(p.as_str()))
            .cloned()
            .collect();
        StartCheck {
            can_start: blocked_by.is_empty(),
            blocked_by,
        }
    }

    /// Tasks that directly list the given task as a prerequisite
    pub fn dependents_of(&self, task_id: &str) -> &[String] {
        self.dependents
            .get(task_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Incomplete tasks that more than one other task waits on, ranked
    /// by direct dependent count. Ties break on title, then id.
    pub fn bottlenecks(&self, completed: &HashSet<String>) -> Vec<Bottleneck> {
        let mut ranked: Vec<Bottleneck> = self
            .nodes
            .values()
            .filter(|node| !completed.contains(node.id.as_str()))
            .map(|node| Bottleneck {
                task_id: node.id.clone(),
                title: node.title.clone(),
                dependent_count: self.dependents_of(&node.id).len(),
            })
            .filter(|b| b.dependent_count > 1)
            .collect();
        ranked.sort_by(|a, b| {
            b.dependent_count
                .cmp(&a.dependent_count)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        ranked
    }

    /// Reject a prerequisite edit that would close a cycle. The check
    /// runs before the write, walking prerequisite chains from each
    /// proposed prerequisite to see if they reach back to the task.
    pub fn check_acyclic(&self, task_id: &str, new_prereqs: &[String]) -> Result<()> {
        for prereq in new_prereqs {
            if prereq == task_id {
                return Err(WaypointError::CycleDetected(format!(
                    "task {task_id} cannot depend on itself"
                )));
            }
            if self.reaches(prereq, task_id) {
                return Err(WaypointError::CycleDetected(format!(
                    "adding prerequisite {prereq} to task {task_id} would create a cycle"
                )));
            }
        }
        Ok(())
    }

    /// Depth-first walk along prerequisite edges from `from`, looking
    /// for `target`
    fn reaches(&self, from: &str, target: &str) -> bool {
        let mut stack = vec![from.to_string()];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                for prereq in &node.prerequisites {
                    stack.push(prereq.clone());
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    fn task(id: &ObjectId, title: &str, prereqs: &[&ObjectId]) -> TaskDoc {
        let mut t = TaskDoc::default();
        t._id = Some(*id);
        t.title = title.to_string();
        t.prerequisites = prereqs.iter().map(|p| p.to_hex()).collect();
        t
    }

    fn ids(n: usize) -> Vec<ObjectId> {
        (0..n).map(|_| ObjectId::new()).collect()
    }

    #[test]
    fn can_start_gated_on_all_prerequisites() {
        let id = ids(3);
        let tasks = vec![
            task(&id[0], "Setup", &[]),
            task(&id[1], "Read docs", &[]),
            task(&id[2], "First PR", &[&id[0], &id[1]]),
        ];
        let graph = TaskGraph::from_tasks(&tasks);

        let mut done = HashSet::new();
        done.insert(id[0].to_hex());
        let check = graph.can_start(&id[2].to_hex(), &done);
        assert!(!check.can_start);
        assert_eq!(check.blocked_by, vec![id[1].to_hex()]);

        done.insert(id[1].to_hex());
        assert!(graph.can_start(&id[2].to_hex(), &done).can_start);
    }

    #[test]
    fn no_prerequisites_always_startable() {
        let id = ids(1);
        let graph = TaskGraph::from_tasks(&[task(&id[0], "Setup", &[])]);
        let check = graph.can_start(&id[0].to_hex(), &HashSet::new());
        assert!(check.can_start);
        assert!(check.blocked_by.is_empty());
    }

    #[test]
    fn dangling_prerequisite_blocks() {
        let id = ids(1);
        let ghost = ObjectId::new();
        let graph = TaskGraph::from_tasks(&[task(&id[0], "Orphaned", &[&ghost])]);
        let check = graph.can_start(&id[0].to_hex(), &HashSet::new());
        assert!(!check.can_start);
        assert_eq!(check.blocked_by, vec![ghost.to_hex()]);
    }

    #[test]
    fn dependents_come_from_reverse_index() {
        let id = ids(3);
        let tasks = vec![
            task(&id[0], "Base", &[]),
            task(&id[1], "Mid", &[&id[0]]),
            task(&id[2], "Top", &[&id[0], &id[1]]),
        ];
        let graph = TaskGraph::from_tasks(&tasks);
        let mut expected = vec![id[1].to_hex(), id[2].to_hex()];
        expected.sort();
        assert_eq!(graph.dependents_of(&id[0].to_hex()), expected.as_slice());
        assert!(graph.dependents_of(&id[2].to_hex()).is_empty());
    }

    #[test]
    fn bottlenecks_need_multiple_dependents() {
        let id = ids(5);
        let tasks = vec![
            task(&id[0], "Zeta base", &[]),
            task(&id[1], "Alpha base", &[]),
            task(&id[2], "Uses both", &[&id[0], &id[1]]),
            task(&id[3], "Uses both too", &[&id[0], &id[1]]),
            task(&id[4], "Uses alpha", &[&id[1]]),
        ];
        let graph = TaskGraph::from_tasks(&tasks);
        let ranked = graph.bottlenecks(&HashSet::new());
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].title, "Alpha base");
        assert_eq!(ranked[0].dependent_count, 3);
        assert_eq!(ranked[1].title, "Zeta base");
        assert_eq!(ranked[1].dependent_count, 2);
    }

    #[test]
    fn completed_tasks_are_not_bottlenecks() {
        let id = ids(3);
        let tasks = vec![
            task(&id[0], "Base", &[]),
            task(&id[1], "Mid", &[&id[0]]),
            task(&id[2], "Top", &[&id[0]]),
        ];
        let graph = TaskGraph::from_tasks(&tasks);
        let mut done = HashSet::new();
        done.insert(id[0].to_hex());
        assert!(graph.bottlenecks(&done).is_empty());
    }

    #[test]
    fn self_dependency_is_rejected() {
        let id = ids(1);
        let graph = TaskGraph::from_tasks(&[task(&id[0], "Solo", &[])]);
        let hex = id[0].to_hex();
        let err = graph.check_acyclic(&hex, &[hex.clone()]).unwrap_err();
        assert!(matches!(err, WaypointError::CycleDetected(_)));
    }

    #[test]
    fn indirect_cycle_is_rejected() {
        let id = ids(3);
        let tasks = vec![
            task(&id[0], "A", &[]),
            task(&id[1], "B", &[&id[0]]),
            task(&id[2], "C", &[&id[1]]),
        ];
        let graph = TaskGraph::from_tasks(&tasks);
        // A <- B <- C already holds, so A depending on C closes the loop
        let err = graph
            .check_acyclic(&id[0].to_hex(), &[id[2].to_hex()])
            .unwrap_err();
        assert!(matches!(err, WaypointError::CycleDetected(_)));
    }

    #[test]
    fn acyclic_edit_is_accepted() {
        let id = ids(3);
        let tasks = vec![
            task(&id[0], "A", &[]),
            task(&id[1], "B", &[&id[0]]),
            task(&id[2], "C", &[]),
        ];
        let graph = TaskGraph::from_tasks(&tasks);
        assert!(graph
            .check_acyclic(&id[2].to_hex(), &[id[1].to_hex()])
            .is_ok());
    }
}
