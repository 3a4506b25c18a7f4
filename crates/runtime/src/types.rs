//! Core simulation types
//!
//! Identifiers, time values, and runtime-tunable parameters shared by the
//! graph, executor, and morph modules.

use std::fmt;

use indexmap::IndexMap;

/// Unique identifier for a simulation variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub String);

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VariableId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a named attribute set (morph source/target)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeSetId(pub String);

impl fmt::Display for AttributeSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AttributeSetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Time step for the current tick, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dt(pub f64);

impl Dt {
    pub fn seconds(&self) -> f64 {
        self.0
    }
}

/// Context describing one completed tick
#[derive(Debug, Clone)]
pub struct TickContext {
    /// Tick number, starting at 0
    pub tick: u64,
    /// Elapsed time since simulation start
    pub elapsed: f64,
    /// Time step for this tick
    pub dt: Dt,
}

/// Runtime-tunable parameter values
///
/// Kernels read these by name every tick, so UI-driven changes take effect
/// on the next pass without rebuilding anything.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param {
    Scalar(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl Param {
    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            Param::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<[f32; 3]> {
        match self {
            Param::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec4(&self) -> Option<[f32; 4]> {
        match self {
            Param::Vec4(v) => Some(*v),
            _ => None,
        }
    }
}

/// Named parameters for one simulation variable
///
/// Iteration follows insertion order, so parameter dumps are deterministic.
#[derive(Debug, Clone, Default)]
pub struct ParamSet {
    values: IndexMap<String, Param>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Param) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<Param> {
        self.values.get(key).copied()
    }

    /// Scalar lookup with a kernel-supplied default
    pub fn scalar_or(&self, key: &str, default: f32) -> f32 {
        self.get(key).and_then(|p| p.as_scalar()).unwrap_or(default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Policy for retriggering a morph while one is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetriggerPolicy {
    /// Capture the live interpolated attributes as the new source, so an
    /// interrupted morph continues from where it visibly is.
    #[default]
    CaptureCurrent,
    /// Restart from the previous target's full data, discarding
    /// interpolation continuity.
    RestartFromTarget,
}

/// Host-supplied configuration, passed in at construction
///
/// The core holds no process-wide mutable state; everything tunable lives
/// here or in per-variable [`ParamSet`]s.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Reject non-finite kernel outputs with a compute error.
    pub check_values: bool,
    /// Morph retrigger behavior.
    pub retrigger: RetriggerPolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            check_values: true,
            retrigger: RetriggerPolicy::default(),
        }
    }
}
