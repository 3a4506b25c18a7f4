//! Tick executor
//!
//! Advances every simulation variable by one generation per tick. Kernels
//! run over the full grid in dependency order, reading only previous
//! generations and writing their own scratch buffer; the swap that
//! publishes the new generations happens in a second pass once every
//! kernel has succeeded, so a failed tick leaves all state untouched and
//! two variables in one tick can never observe each other's fresh values.

use rayon::prelude::*;
use tracing::{debug, instrument, trace};

use crate::error::{Error, Result};
use crate::graph::VariableGraph;
use crate::grid::{self, GridCoord};
use crate::kernels::Kernel;
use crate::storage::StateBuffer;
use crate::types::{Dt, Param, ParamSet, SimConfig, TickContext, VariableId};

/// Per-cell view handed to a kernel
///
/// One instance per grid cell per pass; the kernel may read any cell of
/// any dependency buffer (previous generation only) but writes exactly the
/// tuple it was handed.
pub struct CellContext<'a> {
    /// Linear particle index of this cell
    pub index: usize,
    /// Grid position of this cell
    pub coord: GridCoord,
    /// Live population size; cells at index >= live_count are dead space
    pub live_count: usize,
    /// This variable's previous value for this cell
    pub prev: &'a [f32],
    /// Previous generations of the declared dependencies
    pub deps: &'a DepBuffers<'a>,
    /// Elapsed time since simulation start, seconds
    pub elapsed: f64,
    /// Time step for this tick
    pub dt: Dt,
    /// This variable's parameters
    pub params: &'a ParamSet,
}

/// Read-only previous-generation buffers of a variable's dependencies
pub struct DepBuffers<'a> {
    entries: Vec<(&'a VariableId, &'a StateBuffer)>,
}

impl<'a> DepBuffers<'a> {
    fn collect(graph: &'a VariableGraph, dependencies: &'a [VariableId]) -> Self {
        let entries = dependencies
            .iter()
            .filter_map(|dep| graph.get(dep).map(|var| (&var.id, var.state.previous())))
            .collect();
        Self { entries }
    }

    pub fn get(&self, id: &VariableId) -> Option<&StateBuffer> {
        self.entries
            .iter()
            .find(|(dep, _)| *dep == id)
            .map(|(_, buffer)| *buffer)
    }

    /// Dependencies in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&VariableId, &StateBuffer)> {
        self.entries.iter().map(|(id, buffer)| (*id, *buffer))
    }
}

/// The simulation core: variable graph, scheduler, and tick state
///
/// Single-threaded cooperative from the host's point of view — the host
/// frame driver calls [`Simulation::tick`] once per frame and reads the
/// resulting buffers. The per-cell sweep inside one variable's pass is
/// data-parallel, but a pass is atomic to the control logic: it completes
/// and publishes, or fails and publishes nothing.
pub struct Simulation {
    side: usize,
    live_count: usize,
    config: SimConfig,
    graph: VariableGraph,
    /// Cached execution order; cleared whenever the graph changes
    order: Option<Vec<VariableId>>,
    tick: u64,
}

impl Simulation {
    /// Create a simulation sized for `particle_count` elements
    pub fn new(particle_count: usize, config: SimConfig) -> Result<Self> {
        if particle_count == 0 {
            return Err(Error::EmptyPopulation);
        }
        let side = grid::grid_side(particle_count);
        debug!(particle_count, side, "simulation created");
        Ok(Self {
            side,
            live_count: particle_count,
            config,
            graph: VariableGraph::default(),
            order: None,
            tick: 0,
        })
    }

    /// Grid side length (`ceil(sqrt(particle_count))`)
    pub fn side(&self) -> usize {
        self.side
    }

    /// Live population size
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Ticks completed so far
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Register a variable. `initial` must hold `side * side * channels`
    /// floats — the external loader pads short attribute arrays (dead cells
    /// are computed but never displayed).
    pub fn add_variable(
        &mut self,
        name: &str,
        kernel: Kernel,
        channels: usize,
        initial: Vec<f32>,
    ) -> Result<()> {
        let id: VariableId = name.into();
        if channels == 0 || channels > 4 {
            return Err(Error::InvalidChannelCount {
                variable: id,
                channels,
            });
        }
        let buffer = StateBuffer::from_data(&id, self.side, channels, initial)?;
        self.graph.add(id, kernel, buffer)?;
        self.order = None;
        Ok(())
    }

    /// Wire a variable's dependency list (may include itself for feedback)
    pub fn set_dependencies(&mut self, name: &str, dependencies: &[&str]) -> Result<()> {
        let deps = dependencies.iter().map(|d| (*d).into()).collect();
        self.graph.set_dependencies(&name.into(), deps)?;
        self.order = None;
        Ok(())
    }

    /// Update one tunable parameter; takes effect on the next tick
    pub fn set_param(&mut self, name: &str, key: &str, value: Param) -> Result<()> {
        let id: VariableId = name.into();
        let var = self
            .graph
            .get_mut(&id)
            .ok_or(Error::VariableNotFound(id))?;
        var.params.set(key, value);
        Ok(())
    }

    /// Finalize the graph: validates kernels and computes the execution
    /// order. Idempotent; `tick` calls it automatically when needed.
    pub fn finalize(&mut self) -> Result<()> {
        if self.order.is_none() {
            let order = self.graph.execution_order()?;
            debug!(?order, "execution order finalized");
            self.order = Some(order);
        }
        Ok(())
    }

    /// Last completed generation of a variable, as a flat attribute array
    pub fn state(&self, name: &str) -> Option<&StateBuffer> {
        self.graph.get(&name.into()).map(|var| var.state.previous())
    }

    /// Advance every variable by one generation
    ///
    /// All-or-nothing: on a compute error the tick aborts before any swap
    /// and every variable still exposes its pre-tick generation.
    #[instrument(skip(self), fields(tick = self.tick))]
    pub fn tick(&mut self, elapsed: f64, dt: Dt) -> Result<TickContext> {
        self.finalize()?;
        trace!("tick start");

        // Pass 1: compute every variable from previous generations only.
        let order = self.order.clone().unwrap();
        for id in &order {
            self.compute_variable(id, elapsed, dt)?;
        }

        // Pass 2: publish. Swapping only after every kernel has run keeps
        // the tick atomic and keeps same-tick reads on pre-tick data.
        for id in &order {
            self.graph.get_mut(id).unwrap().state.swap();
        }

        let ctx = TickContext {
            tick: self.tick,
            elapsed,
            dt,
        };
        self.tick += 1;
        trace!("tick complete");
        Ok(ctx)
    }

    fn compute_variable(&mut self, id: &VariableId, elapsed: f64, dt: Dt) -> Result<()> {
        // Detach the write buffer so the graph stays immutably borrowable
        // while kernels read dependency state.
        let mut scratch = self.graph.get_mut(id).unwrap().state.take_current();

        let result = self.sweep(id, elapsed, dt, &mut scratch);

        self.graph.get_mut(id).unwrap().state.put_current(scratch);
        result
    }

    /// Run one variable's kernel over every grid cell
    fn sweep(
        &self,
        id: &VariableId,
        elapsed: f64,
        dt: Dt,
        scratch: &mut StateBuffer,
    ) -> Result<()> {
        let var = self.graph.get(id).unwrap();
        let deps = DepBuffers::collect(&self.graph, &var.dependencies);
        let prev = var.state.previous();
        let side = self.side;
        let live_count = self.live_count;
        let check_values = self.config.check_values;
        let channels = scratch.channels();

        trace!(variable = %id, cells = side * side, "sweep");

        scratch
            .data_mut()
            .par_chunks_mut(channels)
            .enumerate()
            .try_for_each(|(index, out)| {
                let coord = grid::to_grid(index, side);
                let ctx = CellContext {
                    index,
                    coord,
                    live_count,
                    prev: prev.at(index),
                    deps: &deps,
                    elapsed,
                    dt,
                    params: &var.params,
                };
                var.kernel.eval(&ctx, out);

                if check_values && out.iter().any(|v| !v.is_finite()) {
                    return Err(Error::Compute {
                        variable: id.clone(),
                        coord: Some(coord),
                        message: "non-finite value".to_string(),
                    });
                }
                Ok(())
            })
    }
}
