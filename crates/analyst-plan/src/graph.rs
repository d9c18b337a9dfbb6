//! Validated step graphs
//!
//! A [`Plan`] is only ever produced by the validator, so holding one is
//! proof that the graph is acyclic, every reference resolves, and a
//! deterministic execution order exists. Ties between independent steps are
//! broken by original declaration order so output is reproducible.

use crate::error::PlanError;
use crate::step::{InputRef, Step, StepId};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// A validated, executable plan
#[derive(Debug, Clone)]
pub struct Plan {
    steps: Vec<Step>,
    by_id: HashMap<StepId, usize>,
    /// dependents[i] = declaration indices of steps consuming step i's output
    dependents: Vec<Vec<usize>>,
    /// Precomputed deterministic execution order (declaration indices)
    order: Vec<usize>,
}

impl Plan {
    /// Assemble a plan from resolved steps, checking acyclicity
    ///
    /// Reference resolution has already happened; this still owns the final
    /// structural checks (cycles, execution order) so no constructor can
    /// bypass them.
    pub(crate) fn build(steps: Vec<Step>) -> Result<Self, PlanError> {
        let by_id: HashMap<StepId, usize> =
            steps.iter().map(|s| (s.id.clone(), s.index)).collect();

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];
        let mut depends_on: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];
        for step in &steps {
            for input in &step.inputs {
                if let InputRef::Step(id) = input {
                    // ids were resolved by the validator
                    let from = by_id[id];
                    dependents[from].push(step.index);
                    depends_on[step.index].push(from);
                }
            }
        }

        detect_cycle(&steps, &depends_on)?;
        let order = kahn_order(&steps, &depends_on, &dependents);
        Ok(Self {
            steps,
            by_id,
            dependents,
            order,
        })
    }

    /// Steps in declaration order
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step by id
    #[must_use]
    pub fn get(&self, id: &StepId) -> Option<&Step> {
        self.by_id.get(id).map(|&i| &self.steps[i])
    }

    /// Deterministic execution order
    pub fn execution_order(&self) -> impl Iterator<Item = &Step> {
        self.order.iter().map(|&i| &self.steps[i])
    }

    /// All steps transitively depending on `id`
    ///
    /// This is the reachability closure the executor uses to cascade a
    /// failure to every downstream dependent in one pass.
    #[must_use]
    pub fn downstream_of(&self, id: &StepId) -> HashSet<StepId> {
        let mut out = HashSet::new();
        let Some(&start) = self.by_id.get(id) else {
            return out;
        };
        let mut queue: VecDeque<usize> = self.dependents[start].iter().copied().collect();
        while let Some(i) = queue.pop_front() {
            if out.insert(self.steps[i].id.clone()) {
                queue.extend(self.dependents[i].iter().copied());
            }
        }
        out
    }
}

/// DFS three-coloring cycle detection, reporting the offending path
fn detect_cycle(steps: &[Step], depends_on: &[Vec<usize>]) -> Result<(), PlanError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    fn visit(
        node: usize,
        depends_on: &[Vec<usize>],
        colors: &mut [Color],
        stack: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        colors[node] = Color::Gray;
        stack.push(node);
        for &next in &depends_on[node] {
            match colors[next] {
                Color::Gray => {
                    // close the loop for the report
                    let from = stack.iter().position(|&n| n == next).unwrap_or(0);
                    let mut path = stack[from..].to_vec();
                    path.push(next);
                    return Some(path);
                }
                Color::White => {
                    if let Some(path) = visit(next, depends_on, colors, stack) {
                        return Some(path);
                    }
                }
                Color::Black => {}
            }
        }
        stack.pop();
        colors[node] = Color::Black;
        None
    }

    let mut colors = vec![Color::White; steps.len()];
    for start in 0..steps.len() {
        if colors[start] == Color::White {
            let mut stack = Vec::new();
            if let Some(path) = visit(start, depends_on, &mut colors, &mut stack) {
                return Err(PlanError::CyclicDependency {
                    path: path.into_iter().map(|i| steps[i].id.clone()).collect(),
                });
            }
        }
    }
    Ok(())
}

/// Kahn's algorithm with a declaration-order ready set
fn kahn_order(
    steps: &[Step],
    depends_on: &[Vec<usize>],
    dependents: &[Vec<usize>],
) -> Vec<usize> {
    let mut indegree: Vec<usize> = depends_on.iter().map(Vec::len).collect();
    let mut ready: BTreeSet<usize> = indegree
        .iter()
        .enumerate()
        .filter_map(|(i, &d)| (d == 0).then_some(i))
        .collect();

    let mut order = Vec::with_capacity(steps.len());
    while let Some(&next) = ready.iter().next() {
        ready.remove(&next);
        order.push(next);
        for &dep in &dependents[next] {
            indegree[dep] -= 1;
            if indegree[dep] == 0 {
                ready.insert(dep);
            }
        }
    }
    debug_assert_eq!(order.len(), steps.len(), "cycle slipped past detection");
    order
}
