//! Dependency-graph utilities for a plan's sub-tasks.
//!
//! Builds an adjacency view over [`SubTask::depends_on`], detects cycles,
//! and produces topological orderings / execution waves. Kept consistent
//! with the owning plan's tasks on every mutation (see
//! [`crate::domain::models::plan::ExecutionPlan::rebuild_dependency_graph`]).

use std::collections::{HashMap, HashSet, VecDeque};

use uuid::Uuid;

use super::task::{SubTask, TaskStatus};

/// A node in the dependency graph.
#[derive(Debug, Clone)]
pub struct DagNode {
    pub task_id: Uuid,
    pub status: TaskStatus,
    pub dependencies: Vec<Uuid>,
    pub dependents: Vec<Uuid>,
}

impl DagNode {
    fn from_task(task: &SubTask) -> Self {
        Self {
            task_id: task.id,
            status: task.status,
            dependencies: task.depends_on.clone(),
            dependents: Vec::new(),
        }
    }

    pub fn is_ready(&self, completed: &HashSet<Uuid>) -> bool {
        self.dependencies.iter().all(|dep| completed.contains(dep))
    }
}

/// The dependency DAG for one plan's sub-tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskDag {
    pub nodes: HashMap<Uuid, DagNode>,
}

/// Errors raised while validating or traversing a [`TaskDag`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DagError {
    #[error("cycle detected in task dependencies")]
    CycleDetected,
    #[error("dependency {0} is not a sibling task in this plan")]
    UnknownDependency(Uuid),
}

impl TaskDag {
    /// Build a DAG from a plan's tasks, validating that every
    /// `depends_on` id refers to a sibling task.
    pub fn from_tasks(tasks: &[SubTask]) -> Result<Self, DagError> {
        let known: HashSet<Uuid> = tasks.iter().map(|t| t.id).collect();
        let mut nodes: HashMap<Uuid, DagNode> = HashMap::new();

        for task in tasks {
            for dep in &task.depends_on {
                if !known.contains(dep) {
                    return Err(DagError::UnknownDependency(*dep));
                }
            }
            nodes.insert(task.id, DagNode::from_task(task));
        }

        let dep_pairs: Vec<(Uuid, Uuid)> = tasks
            .iter()
            .flat_map(|t| t.depends_on.iter().map(move |d| (*d, t.id)))
            .collect();
        for (dep_id, task_id) in dep_pairs {
            if let Some(dep_node) = nodes.get_mut(&dep_id) {
                dep_node.dependents.push(task_id);
            }
        }

        let dag = Self { nodes };
        if dag.has_cycle() {
            return Err(DagError::CycleDetected);
        }
        Ok(dag)
    }

    pub fn has_cycle(&self) -> bool {
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();
        for &id in self.nodes.keys() {
            if self.dfs_cycle(id, &mut visited, &mut stack) {
                return true;
            }
        }
        false
    }

    fn dfs_cycle(&self, id: Uuid, visited: &mut HashSet<Uuid>, stack: &mut HashSet<Uuid>) -> bool {
        if stack.contains(&id) {
            return true;
        }
        if visited.contains(&id) {
            return false;
        }
        visited.insert(id);
        stack.insert(id);
        if let Some(node) = self.nodes.get(&id) {
            for &dep in &node.dependents {
                if self.dfs_cycle(dep, visited, stack) {
                    return true;
                }
            }
        }
        stack.remove(&id);
        false
    }

    /// Topologically order all tasks, tie-breaking equal in-degree
    /// entries by the caller-supplied priority lookup (higher first).
    pub fn topological_order(
        &self,
        priority_of: impl Fn(Uuid) -> u8,
    ) -> Result<Vec<Uuid>, DagError> {
        if self.has_cycle() {
            return Err(DagError::CycleDetected);
        }

        let mut in_degree: HashMap<Uuid, usize> = HashMap::new();
        for (id, node) in &self.nodes {
            in_degree.insert(*id, node.dependencies.len());
        }

        let mut ready: Vec<Uuid> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&id, _)| id)
            .collect();
        ready.sort_by(|a, b| priority_of(*b).cmp(&priority_of(*a)).then(a.cmp(b)));

        let mut queue: VecDeque<Uuid> = ready.into();
        let mut result = Vec::with_capacity(self.nodes.len());

        while let Some(id) = queue.pop_front() {
            result.push(id);
            if let Some(node) = self.nodes.get(&id) {
                let mut freed = Vec::new();
                for &dependent in &node.dependents {
                    if let Some(d) = in_degree.get_mut(&dependent) {
                        *d -= 1;
                        if *d == 0 {
                            freed.push(dependent);
                        }
                    }
                }
                freed.sort_by(|a, b| priority_of(*b).cmp(&priority_of(*a)).then(a.cmp(b)));
                for id in freed {
                    queue.push_back(id);
                }
            }
        }

        if result.len() != self.nodes.len() {
            return Err(DagError::CycleDetected);
        }
        Ok(result)
    }

    /// Group tasks into waves that could run concurrently.
    pub fn execution_waves(&self) -> Result<Vec<Vec<Uuid>>, DagError> {
        if self.has_cycle() {
            return Err(DagError::CycleDetected);
        }
        let mut waves = Vec::new();
        let mut remaining: HashSet<Uuid> = self.nodes.keys().copied().collect();
        let mut completed: HashSet<Uuid> = HashSet::new();

        while !remaining.is_empty() {
            let wave: Vec<Uuid> = remaining
                .iter()
                .filter(|id| {
                    self.nodes
                        .get(id)
                        .map(|n| n.is_ready(&completed))
                        .unwrap_or(false)
                })
                .copied()
                .collect();
            if wave.is_empty() {
                return Err(DagError::CycleDetected);
            }
            for id in &wave {
                remaining.remove(id);
                completed.insert(*id);
            }
            waves.push(wave);
        }
        Ok(waves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_with_deps(title: &str, deps: Vec<Uuid>) -> SubTask {
        let mut t = SubTask::new(title, "d");
        t.depends_on = deps;
        t
    }

    #[test]
    fn acyclic_dag_builds() {
        let a = SubTask::new("A", "d");
        let b = task_with_deps("B", vec![a.id]);
        let dag = TaskDag::from_tasks(&[a, b]).unwrap();
        assert_eq!(dag.nodes.len(), 2);
        assert!(!dag.has_cycle());
    }

    #[test]
    fn cycle_is_detected() {
        let a = SubTask::new("A", "d");
        let a_id = a.id;
        let mut b = SubTask::new("B", "d");
        b.depends_on.push(a_id);
        let b_id = b.id;
        let mut a2 = a;
        a2.depends_on.push(b_id);
        let err = TaskDag::from_tasks(&[a2, b]).unwrap_err();
        assert_eq!(err, DagError::CycleDetected);
    }

    #[test]
    fn unknown_dependency_rejected() {
        let stray = Uuid::new_v4();
        let a = task_with_deps("A", vec![stray]);
        let err = TaskDag::from_tasks(&[a]).unwrap_err();
        assert_eq!(err, DagError::UnknownDependency(stray));
    }

    #[test]
    fn topological_order_respects_priority_ties() {
        let a = SubTask::new("A", "d");
        let mut b = task_with_deps("B", vec![a.id]);
        b.priority = 5;
        let mut c = task_with_deps("C", vec![a.id]);
        c.priority = 4;
        let (b_id, c_id) = (b.id, c.id);
        let prios: HashMap<Uuid, u8> = [(a.id, a.priority), (b_id, b.priority), (c_id, c.priority)]
            .into_iter()
            .collect();
        let dag = TaskDag::from_tasks(&[a, b, c]).unwrap();
        let order = dag
            .topological_order(|id| *prios.get(&id).unwrap_or(&0))
            .unwrap();
        let pos_b = order.iter().position(|&x| x == b_id).unwrap();
        let pos_c = order.iter().position(|&x| x == c_id).unwrap();
        assert!(pos_b < pos_c, "higher priority task B should precede C");
    }

    #[test]
    fn execution_waves_group_parallel_tasks() {
        let a = SubTask::new("A", "d");
        let b = SubTask::new("B", "d");
        let c = task_with_deps("C", vec![a.id, b.id]);
        let dag = TaskDag::from_tasks(&[a, b, c]).unwrap();
        let waves = dag.execution_waves().unwrap();
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0].len(), 2);
    }
}
