//! Morph state machine
//!
//! CPU-side interpolation between two attribute sets (typically base-mesh
//! position arrays), driven by a progress scalar and an easing curve. The
//! machine owns its source/target snapshots; the renderer reads
//! [`MorphMachine::sample`] each frame and binds the result.

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::types::{AttributeSetId, Dt, RetriggerPolicy};

/// Easing curves for the morph blend weight
///
/// Pure functions [0, 1] -> [0, 1]. Linear is the default: authored timing
/// curves are expected in the per-element update step, not the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    SmoothStep,
    CubicInOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::SmoothStep => t * t * (3.0 - 2.0 * t),
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
        }
    }
}

/// Interpolation machine over a registry of equally sized attribute sets
///
/// All sets share one element count and stride; arrays shorter than the
/// configured count must be padded by the external loader before
/// registration — the machine never resizes.
pub struct MorphMachine {
    element_count: usize,
    stride: usize,
    policy: RetriggerPolicy,
    sets: IndexMap<AttributeSetId, Vec<f32>>,
    /// Snapshot the blend starts from; owned, not a registry reference
    source: Vec<f32>,
    target: AttributeSetId,
    progress: f32,
    duration: f64,
    easing: Easing,
    active: bool,
}

impl MorphMachine {
    /// Create the machine resting on an initial attribute set
    pub fn new(
        element_count: usize,
        stride: usize,
        initial: (&str, Vec<f32>),
        policy: RetriggerPolicy,
    ) -> Result<Self> {
        let (name, data) = initial;
        let id: AttributeSetId = name.into();
        Self::check_len(&id, element_count, stride, &data)?;

        let source = data.clone();
        let mut sets = IndexMap::new();
        sets.insert(id.clone(), data);

        Ok(Self {
            element_count,
            stride,
            policy,
            sets,
            source,
            target: id,
            progress: 1.0,
            duration: 1.0,
            easing: Easing::default(),
            active: false,
        })
    }

    fn check_len(
        id: &AttributeSetId,
        element_count: usize,
        stride: usize,
        data: &[f32],
    ) -> Result<()> {
        let expected = element_count * stride;
        if data.len() != expected {
            return Err(Error::AttributeLengthMismatch {
                set: id.clone(),
                expected,
                actual: data.len(),
            });
        }
        Ok(())
    }

    /// Register a morph target. Re-registering a name replaces its data.
    pub fn add_set(&mut self, name: &str, data: Vec<f32>) -> Result<()> {
        let id: AttributeSetId = name.into();
        Self::check_len(&id, self.element_count, self.stride, &data)?;
        debug!(set = %id, "attribute set registered");
        self.sets.insert(id, data);
        Ok(())
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Name of the set the machine is blending toward (or resting on)
    pub fn target(&self) -> &AttributeSetId {
        &self.target
    }

    /// Start a morph toward a registered set
    ///
    /// Under [`RetriggerPolicy::CaptureCurrent`] the live interpolated
    /// attributes become the new source, so retriggering mid-flight does
    /// not jump. Under [`RetriggerPolicy::RestartFromTarget`] the previous
    /// target's full data becomes the source.
    pub fn request(&mut self, target: &str, duration: f64, easing: Easing) -> Result<()> {
        let id: AttributeSetId = target.into();
        if !self.sets.contains_key(&id) {
            return Err(Error::UnknownAttributeSet(id));
        }
        if duration <= 0.0 {
            return Err(Error::InvalidDuration(duration));
        }

        self.source = match self.policy {
            RetriggerPolicy::CaptureCurrent => self.sample(),
            RetriggerPolicy::RestartFromTarget => self.sets[&self.target].clone(),
        };
        debug!(target = %id, duration, "morph requested");
        self.target = id;
        self.duration = duration;
        self.easing = easing;
        self.progress = 0.0;
        self.active = true;
        Ok(())
    }

    /// Advance an active morph; a no-op once progress has saturated
    pub fn advance(&mut self, dt: Dt) {
        if !self.active {
            return;
        }
        self.progress = (self.progress + (dt.seconds() / self.duration) as f32).clamp(0.0, 1.0);
        trace!(progress = self.progress, "morph advanced");
        if self.progress >= 1.0 {
            self.progress = 1.0;
            self.active = false;
        }
    }

    /// Interpolated attributes at the current progress
    ///
    /// Pure read: calling repeatedly without `advance` returns the same
    /// value.
    pub fn sample(&self) -> Vec<f32> {
        let mut out = vec![0.0; self.element_count * self.stride];
        self.sample_into(&mut out);
        out
    }

    /// Like [`MorphMachine::sample`] but into a caller-owned array, so the
    /// renderer can reuse its bind buffer
    pub fn sample_into(&self, out: &mut [f32]) {
        let target = &self.sets[&self.target];
        let weight = self.easing.apply(self.progress);
        for ((o, s), t) in out.iter_mut().zip(&self.source).zip(target) {
            *o = s + (t - s) * weight;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(policy: RetriggerPolicy) -> MorphMachine {
        let mut m = MorphMachine::new(1, 3, ("rest", vec![0.0, 0.0, 0.0]), policy).unwrap();
        m.add_set("peak", vec![1.0, 2.0, 3.0]).unwrap();
        m
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = MorphMachine::new(
            4,
            3,
            ("rest", vec![0.0; 11]),
            RetriggerPolicy::CaptureCurrent,
        );
        assert!(matches!(
            result,
            Err(Error::AttributeLengthMismatch {
                expected: 12,
                actual: 11,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_target_rejected() {
        let mut m = machine(RetriggerPolicy::CaptureCurrent);
        assert!(matches!(
            m.request("missing", 1.0, Easing::Linear),
            Err(Error::UnknownAttributeSet(_))
        ));
    }

    #[test]
    fn test_non_positive_duration_rejected() {
        let mut m = machine(RetriggerPolicy::CaptureCurrent);
        assert!(matches!(
            m.request("peak", 0.0, Easing::Linear),
            Err(Error::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_sample_endpoints_and_midpoint() {
        let mut m = machine(RetriggerPolicy::CaptureCurrent);
        m.request("peak", 2.0, Easing::Linear).unwrap();

        assert_eq!(m.sample(), vec![0.0, 0.0, 0.0]);

        m.advance(Dt(1.0));
        assert_eq!(m.sample(), vec![0.5, 1.0, 1.5]);

        m.advance(Dt(1.0));
        assert_eq!(m.sample(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_sample_is_idempotent() {
        let mut m = machine(RetriggerPolicy::CaptureCurrent);
        m.request("peak", 2.0, Easing::Linear).unwrap();
        m.advance(Dt(0.5));
        assert_eq!(m.sample(), m.sample());
    }

    #[test]
    fn test_advance_saturates_and_deactivates() {
        let mut m = machine(RetriggerPolicy::CaptureCurrent);
        m.request("peak", 1.0, Easing::Linear).unwrap();
        assert!(m.is_active());

        for _ in 0..10 {
            m.advance(Dt(0.3));
            assert!(m.progress() <= 1.0);
        }
        assert_eq!(m.progress(), 1.0);
        assert!(!m.is_active());

        // Saturated: further advances are no-ops
        m.advance(Dt(5.0));
        assert_eq!(m.progress(), 1.0);
        assert_eq!(m.sample(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_retrigger_captures_live_value() {
        let mut m = machine(RetriggerPolicy::CaptureCurrent);
        m.add_set("other", vec![10.0, 10.0, 10.0]).unwrap();

        m.request("peak", 1.0, Easing::Linear).unwrap();
        m.advance(Dt(0.5));
        let mid = m.sample();
        assert_eq!(mid, vec![0.5, 1.0, 1.5]);

        // Retrigger mid-flight: the new blend starts exactly where the
        // old one visibly was.
        m.request("other", 1.0, Easing::Linear).unwrap();
        assert_eq!(m.sample(), mid);
        m.advance(Dt(1.0));
        assert_eq!(m.sample(), vec![10.0, 10.0, 10.0]);
    }

    #[test]
    fn test_retrigger_restart_from_target_jumps() {
        let mut m = machine(RetriggerPolicy::RestartFromTarget);
        m.add_set("other", vec![10.0, 10.0, 10.0]).unwrap();

        m.request("peak", 1.0, Easing::Linear).unwrap();
        m.advance(Dt(0.5));

        // Retrigger discards continuity: source snaps to the previous
        // target's full data.
        m.request("other", 1.0, Easing::Linear).unwrap();
        assert_eq!(m.sample(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_easing_endpoints_fixed() {
        for easing in [Easing::Linear, Easing::SmoothStep, Easing::CubicInOut] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
        }
        assert_eq!(Easing::SmoothStep.apply(0.5), 0.5);
        assert_eq!(Easing::CubicInOut.apply(0.5), 0.5);
    }
}
