//! Variable graph
//!
//! Holds every simulation variable with its kernel, dependency list, and
//! double-buffered state, and derives the execution order. Variables are
//! registered first and wired afterwards, so dependency lists may point
//! both ways; a variable may also depend on itself — that is previous-tick
//! feedback, the defining feature of the model, and only cross-variable
//! cycles are an error.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::error::{Error, Result};
use crate::kernels::Kernel;
use crate::storage::{StateBuffer, StatePair};
use crate::types::{ParamSet, VariableId};

/// One named compute step and the state it owns
#[derive(Debug)]
pub struct SimulationVariable {
    pub id: VariableId,
    /// Immutable after registration
    pub kernel: Kernel,
    /// Set once via [`VariableGraph::set_dependencies`]; may include the
    /// variable itself
    pub dependencies: Vec<VariableId>,
    /// Mutable at runtime (UI tuning)
    pub params: ParamSet,
    pub state: StatePair,
}

/// The set of all simulation variables plus their dependency edges
#[derive(Debug, Default)]
pub struct VariableGraph {
    variables: IndexMap<VariableId, SimulationVariable>,
}

impl VariableGraph {
    /// Register a variable with its initial state. Dependencies are wired
    /// separately once every participant exists.
    pub fn add(&mut self, id: VariableId, kernel: Kernel, initial: StateBuffer) -> Result<()> {
        if self.variables.contains_key(&id) {
            return Err(Error::DuplicateVariable(id));
        }
        debug!(variable = %id, "variable registered");
        self.variables.insert(
            id.clone(),
            SimulationVariable {
                id,
                kernel,
                dependencies: Vec::new(),
                params: ParamSet::new(),
                state: StatePair::init(initial),
            },
        );
        Ok(())
    }

    /// Declare which variables' previous generations a kernel reads.
    /// Every name must be registered; a flow-field kernel must list its
    /// base texture here.
    pub fn set_dependencies(&mut self, id: &VariableId, dependencies: Vec<VariableId>) -> Result<()> {
        if !self.variables.contains_key(id) {
            return Err(Error::VariableNotFound(id.clone()));
        }
        for dep in &dependencies {
            if !self.variables.contains_key(dep) {
                return Err(Error::UnknownDependency {
                    variable: id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        debug!(variable = %id, deps = dependencies.len(), "dependencies wired");
        self.variables.get_mut(id).unwrap().dependencies = dependencies;
        Ok(())
    }

    pub fn get(&self, id: &VariableId) -> Option<&SimulationVariable> {
        self.variables.get(id)
    }

    pub fn get_mut(&mut self, id: &VariableId) -> Option<&mut SimulationVariable> {
        self.variables.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variables in registration order
    pub fn iter(&self) -> impl Iterator<Item = &SimulationVariable> {
        self.variables.values()
    }

    /// Topological execution order, ties broken by registration order
    ///
    /// Kahn's algorithm over the cross-variable edges. Self-loops read the
    /// previous generation and impose no ordering. Anything left
    /// unscheduled closes a cycle. Also the finalization point for static
    /// kernel checks (a flow field must declare its base as a dependency).
    pub fn execution_order(&self) -> Result<Vec<VariableId>> {
        for (id, var) in &self.variables {
            if let Kernel::FlowField { base } = &var.kernel {
                if !var.dependencies.contains(base) {
                    return Err(Error::UnknownDependency {
                        variable: id.clone(),
                        dependency: base.clone(),
                    });
                }
                // Flow-field state is [x, y, z, life]
                let channels = var.state.previous().channels();
                if channels != 4 {
                    return Err(Error::InvalidChannelCount {
                        variable: id.clone(),
                        channels,
                    });
                }
            }
        }

        let mut in_degree: IndexMap<&VariableId, usize> = IndexMap::new();
        let mut dependents: IndexMap<&VariableId, Vec<&VariableId>> = IndexMap::new();

        for id in self.variables.keys() {
            in_degree.insert(id, 0);
        }
        for (id, var) in &self.variables {
            // Deduplicate so a dependency listed twice counts once
            let mut seen: IndexSet<&VariableId> = IndexSet::new();
            for dep in &var.dependencies {
                if dep != id && seen.insert(dep) {
                    *in_degree.get_mut(id).unwrap() += 1;
                    dependents.entry(dep).or_default().push(id);
                }
            }
        }

        let mut order = Vec::with_capacity(self.variables.len());
        // Registration order doubles as the deterministic tie-break: ready
        // variables are appended in the order they were added.
        let mut ready: Vec<&VariableId> = self
            .variables
            .keys()
            .filter(|id| in_degree[*id] == 0)
            .collect();

        let mut cursor = 0;
        while cursor < ready.len() {
            let id = ready[cursor];
            cursor += 1;
            order.push(id.clone());

            if let Some(deps) = dependents.get(id) {
                for dependent in deps {
                    let degree = in_degree.get_mut(*dependent).unwrap();
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(dependent);
                    }
                }
            }
        }

        if order.len() != self.variables.len() {
            let cycle: Vec<VariableId> = self
                .variables
                .keys()
                .filter(|id| in_degree[*id] > 0)
                .cloned()
                .collect();
            return Err(Error::CycleDetected { variables: cycle });
        }

        Ok(order)
    }
}
