//! Driftfield Runtime
//!
//! GPU-style feedback simulation core for large particle populations.
//! State lives in square grids of float tuples (the CPU analogue of data
//! textures); each simulation variable advances once per tick by running
//! its kernel over every cell, with the previous generation of frame N
//! becoming the input of frame N+1 through an O(1) buffer swap. Variables
//! form a dependency graph executed in topological order; a morph state
//! machine interpolates between attribute sets on the same clock.
//!
//! Windowing, cameras, asset loading, materials, and draw calls are
//! external collaborators: they feed padded attribute arrays in and read
//! state buffers out.

pub mod clock;
pub mod error;
pub mod executor;
pub mod graph;
pub mod grid;
pub mod kernels;
pub mod morph;
pub mod storage;
pub mod types;

pub use clock::{Clock, TickTimes};
pub use error::{Error, Result};
pub use executor::{CellContext, DepBuffers, Simulation};
pub use graph::{SimulationVariable, VariableGraph};
pub use kernels::{Kernel, KernelFn};
pub use morph::{Easing, MorphMachine};
pub use storage::{StateBuffer, StatePair};
pub use types::*;
