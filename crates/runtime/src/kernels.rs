//! Update kernels
//!
//! A kernel is the per-cell update function of one simulation variable: a
//! pure function of the cell's previous value, its dependencies' previous
//! generations, time, and parameters. The built-in kinds form a closed set
//! so a graph can be checked statically; `Custom` carries a host-supplied
//! closure for everything else.
//!
//! All kernels:
//! - are deterministic (same inputs, same outputs)
//! - read only previous-generation buffers
//! - write only the cell handed to them

use std::fmt;

use crate::executor::CellContext;

/// Host-supplied per-cell update function
pub type KernelFn = Box<dyn Fn(&CellContext, &mut [f32]) + Send + Sync>;

/// The update step of one simulation variable
pub enum Kernel {
    /// Flow-field particle drift with lifetime respawn.
    ///
    /// State layout is `[x, y, z, life]`. Life advances by
    /// `dt * life_decay`; an expired particle respawns at its base position
    /// (read from the named dependency at the same texel) keeping the
    /// fractional life. A live particle drifts along a smooth noise field,
    /// gated by the `influence` threshold and scaled by `strength`, with
    /// the field sampled at `frequency` spatial scale.
    FlowField { base: crate::types::VariableId },
    /// Fill every cell from the `value` parameter.
    Constant,
    /// Copy the cell's own previous value. Used to pin a base texture that
    /// other variables sample from.
    PassThrough,
    /// Host-supplied update function.
    Custom(KernelFn),
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kernel::FlowField { base } => f.debug_struct("FlowField").field("base", base).finish(),
            Kernel::Constant => write!(f, "Constant"),
            Kernel::PassThrough => write!(f, "PassThrough"),
            Kernel::Custom(_) => write!(f, "Custom"),
        }
    }
}

impl Kernel {
    /// Run the kernel for one cell, writing the new tuple into `out`
    pub fn eval(&self, ctx: &CellContext, out: &mut [f32]) {
        match self {
            Kernel::FlowField { base } => flow_field(ctx, base, out),
            Kernel::Constant => {
                constant(ctx, out);
            }
            Kernel::PassThrough => out.copy_from_slice(ctx.prev),
            Kernel::Custom(update) => update(ctx, out),
        }
    }
}

fn constant(ctx: &CellContext, out: &mut [f32]) {
    match ctx.params.get("value") {
        Some(crate::types::Param::Scalar(v)) => out.fill(v),
        Some(crate::types::Param::Vec2(v)) => copy_prefix(&v, out),
        Some(crate::types::Param::Vec3(v)) => copy_prefix(&v, out),
        Some(crate::types::Param::Vec4(v)) => copy_prefix(&v, out),
        None => out.fill(0.0),
    }
}

fn copy_prefix(value: &[f32], out: &mut [f32]) {
    let n = value.len().min(out.len());
    out[..n].copy_from_slice(&value[..n]);
    out[n..].fill(0.0);
}

fn flow_field(ctx: &CellContext, base: &crate::types::VariableId, out: &mut [f32]) {
    let params = ctx.params;
    let life_decay = params.scalar_or("life_decay", 0.3);
    let influence = params.scalar_or("influence", 0.5);
    let strength = params.scalar_or("strength", 2.0);
    let frequency = params.scalar_or("frequency", 0.5);

    let dt = ctx.dt.seconds() as f32;
    let time = ctx.elapsed as f32;

    let pos = [ctx.prev[0], ctx.prev[1], ctx.prev[2]];
    let life = ctx.prev[3] + dt * life_decay;

    if life >= 1.0 {
        // Respawn at the base position, carrying the fractional life so
        // respawns stay staggered across the population.
        let base_cell = ctx
            .deps
            .get(base)
            .map(|buffer| buffer.at(ctx.index))
            .unwrap_or(ctx.prev);
        out[0] = base_cell[0];
        out[1] = base_cell[1];
        out[2] = base_cell[2];
        out[3] = life.fract();
        return;
    }

    // Field influence gate: remap the tweakable so 0 disables the field
    // entirely and 1 applies it everywhere.
    let gate = noise4([pos[0] * 0.2, pos[1] * 0.2, pos[2] * 0.2], time + 1.0);
    let threshold = (influence - 0.5) * -2.0;
    let gain = smoothstep(threshold, 1.0, gate);

    let flow = normalize([
        noise4(
            [pos[0] * frequency, pos[1] * frequency, pos[2] * frequency],
            time,
        ),
        noise4(
            [
                pos[0] * frequency + 1.0,
                pos[1] * frequency + 1.0,
                pos[2] * frequency + 1.0,
            ],
            time,
        ),
        noise4(
            [
                pos[0] * frequency + 2.0,
                pos[1] * frequency + 2.0,
                pos[2] * frequency + 2.0,
            ],
            time,
        ),
    ]);

    let step = dt * gain * strength;
    out[0] = pos[0] + flow[0] * step;
    out[1] = pos[1] + flow[1] * step;
    out[2] = pos[2] + flow[2] * step;
    out[3] = life;
}

/// Hermite threshold ramp, clamped to [0, 1]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len < 1e-8 {
        return [0.0, 0.0, 0.0];
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

/// Smooth value noise over a 3-D lattice plus a time axis, in [-1, 1]
///
/// Hash-based and fully deterministic — the simulation needs a repeatable
/// field, not statistical quality, so this stands in for the simplex noise
/// a GPU implementation would use.
pub fn noise4(p: [f32; 3], w: f32) -> f32 {
    // Fold time into the lattice on incommensurate axes so the field
    // animates rather than translates.
    let q = [p[0] + w * 0.31, p[1] + w * 0.47, p[2] + w * 0.59];

    let cell = [q[0].floor(), q[1].floor(), q[2].floor()];
    let frac = [q[0] - cell[0], q[1] - cell[1], q[2] - cell[2]];
    let fade = [smooth(frac[0]), smooth(frac[1]), smooth(frac[2])];

    let (ix, iy, iz) = (cell[0] as i64, cell[1] as i64, cell[2] as i64);

    let mut corners = [0.0f32; 8];
    for (n, corner) in corners.iter_mut().enumerate() {
        let dx = (n & 1) as i64;
        let dy = ((n >> 1) & 1) as i64;
        let dz = ((n >> 2) & 1) as i64;
        *corner = lattice(ix + dx, iy + dy, iz + dz);
    }

    let x00 = lerp(corners[0], corners[1], fade[0]);
    let x10 = lerp(corners[2], corners[3], fade[0]);
    let x01 = lerp(corners[4], corners[5], fade[0]);
    let x11 = lerp(corners[6], corners[7], fade[0]);
    let y0 = lerp(x00, x10, fade[1]);
    let y1 = lerp(x01, x11, fade[1]);
    lerp(y0, y1, fade[2])
}

fn smooth(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Pseudo-random value in [-1, 1] for one lattice point
fn lattice(x: i64, y: i64, z: i64) -> f32 {
    let mut h = (x as u64)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add((y as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9))
        .wrapping_add((z as u64).wrapping_mul(0x94D0_49BB_1331_11EB));
    h ^= h >> 31;
    h = h.wrapping_mul(0xD6E8_FEB8_6659_FD93);
    h ^= h >> 27;
    // Map the top 24 bits onto [-1, 1]
    ((h >> 40) as f32 / 8_388_607.5) - 1.0
}
