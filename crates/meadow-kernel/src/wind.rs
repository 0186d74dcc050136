//! Toroidal wind field that follows the camera.
//!
//! The field is a square grid of `(2r + 1)²` cells centered on the camera,
//! one cell per tile. Each cell holds a velocity and a static acceleration.
//! The acceleration is a radial bell: it points away from the center and
//! fades with distance, so a moving camera pushes the grass aside.
//!
//! When the camera crosses into a new cell the grid is not copied; the
//! kernel reads each cell from its shifted, wrapped source index instead, so
//! the grid stays aligned with world space.
//!
//! Velocities live on the device. [`WindField::update`] only computes the
//! per-frame [`WindParams`]; the kernel itself runs on a
//! [`RenderBackend`](crate::backend::RenderBackend). [`advance_velocity`] is
//! the host version of the same kernel.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use tracing::debug;

use crate::config::WindConfig;

/// Threads per workgroup of the wind kernel.
pub const WIND_WORKGROUP_SIZE: u32 = 16;

/// Fixed simulation time step per frame.
pub const WIND_TIME_STEP: f32 = 0.1;

/// Exponential velocity decay per unit of simulated time.
pub const WIND_DECAY_RATE: f32 = 0.5;

/// Scale of the push a moving camera applies to the air.
pub const WIND_PUSH_SCALE: f32 = 0.05;

/// Per-dispatch kernel parameters, laid out as a 48-byte uniform block.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct WindParams {
    /// Normalized XZ camera travel direction, zero when still
    pub view_dir: [f32; 2],
    /// Camera speed, distance per unit of simulated time
    pub speed: f32,
    /// Number of cells
    pub size: i32,
    /// Cells per side
    pub dim: i32,
    /// Grid shift along X since the last dispatch, wrapped to `[0, dim)`
    pub dx: i32,
    /// Grid shift along Z since the last dispatch, wrapped to `[0, dim)`
    pub dz: i32,
    /// Time step
    pub dt: f32,
    /// Simulated time, one unit per frame
    pub time: f32,
    /// Padding to 48 bytes
    pub padding: [f32; 3],
}

/// Camera-centered wind grid.
#[derive(Debug, Clone)]
pub struct WindField {
    radius: i32,
    dim: i32,
    cell_size: f32,
    velocity: Vec<[f32; 4]>,
    acceleration: Vec<[f32; 4]>,
    prev_center: (i32, i32),
    time: f32,
}

impl WindField {
    /// Creates a field of `(2 * radius + 1)²` cells of `cell_size`.
    ///
    /// `config` must have been validated.
    #[must_use]
    pub fn new(config: &WindConfig, cell_size: f32) -> Self {
        let radius = config.radius;
        let dim = 2 * radius + 1;
        let size = (dim * dim) as usize;
        let acceleration = radial_acceleration(radius, config.influence);

        debug!("Created wind field {}x{} (cell size {})", dim, dim, cell_size);

        Self {
            radius,
            dim,
            cell_size,
            velocity: vec![[0.0; 4]; size],
            acceleration,
            prev_center: (0, 0),
            time: 0.0,
        }
    }

    /// Cells from center to edge.
    #[must_use]
    pub const fn radius(&self) -> i32 {
        self.radius
    }

    /// Cells per side.
    #[must_use]
    pub const fn dim(&self) -> i32 {
        self.dim
    }

    /// Total number of cells.
    #[must_use]
    pub fn field_size(&self) -> usize {
        self.velocity.len()
    }

    /// World size of one cell.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Simulated time, advanced by one per update.
    #[must_use]
    pub const fn time(&self) -> f32 {
        self.time
    }

    /// Initial velocities, all zero.
    #[must_use]
    pub fn velocity(&self) -> &[[f32; 4]] {
        &self.velocity
    }

    /// Static acceleration bell.
    #[must_use]
    pub fn acceleration(&self) -> &[[f32; 4]] {
        &self.acceleration
    }

    /// Workgroups needed to cover the grid.
    #[must_use]
    pub fn workgroup_count(&self) -> u32 {
        (self.field_size() as u32).div_ceil(WIND_WORKGROUP_SIZE)
    }

    /// Cell containing the world position `pos`.
    #[must_use]
    pub fn cell_of(&self, pos: Vec3) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.z / self.cell_size).floor() as i32,
        )
    }

    /// Advances the field bookkeeping for a camera at `camera_pos` that moved
    /// by `camera_delta` this frame, returning the kernel parameters.
    pub fn update(&mut self, camera_pos: Vec3, camera_delta: Vec3) -> WindParams {
        let center = self.cell_of(camera_pos);
        let shift_x = center.0 - self.prev_center.0;
        let shift_z = center.1 - self.prev_center.1;

        // Climbing counts toward speed; only the horizontal part steers
        let dir = camera_delta.normalize_or_zero();
        let params = WindParams {
            view_dir: [dir.x, dir.z],
            speed: camera_delta.length() / WIND_TIME_STEP,
            size: self.field_size() as i32,
            dim: self.dim,
            dx: shift_x.rem_euclid(self.dim),
            dz: shift_z.rem_euclid(self.dim),
            dt: WIND_TIME_STEP,
            time: self.time,
            padding: [0.0; 3],
        };

        self.prev_center = center;
        self.time += 1.0;
        params
    }
}

/// Radial acceleration bell, normalized so the largest component is 1.
fn radial_acceleration(radius: i32, influence: f32) -> Vec<[f32; 4]> {
    let dim = 2 * radius + 1;
    let mut field = Vec::with_capacity((dim * dim) as usize);
    for z in 0..dim {
        for x in 0..dim {
            let dx = 4.0 * (x - radius) as f32 / radius as f32 * influence;
            let dz = 4.0 * (z - radius) as f32 / radius as f32 * influence;
            let weight = (-dx * dx - dz * dz).exp();
            field.push([dx * weight, dz * weight, 0.0, 0.0]);
        }
    }

    let max = field
        .iter()
        .flat_map(|v| [v[0].abs(), v[1].abs()])
        .fold(0.0f32, f32::max);
    if max > 0.0 {
        for v in &mut field {
            v[0] /= max;
            v[1] /= max;
        }
    }
    field
}

/// Host version of the wind kernel.
///
/// Every output cell reads its previous velocity from the source cell the
/// grid shift moved into its place, decays it and adds the camera push.
pub fn advance_velocity(
    velocity_in: &[[f32; 4]],
    acceleration: &[[f32; 4]],
    params: &WindParams,
    velocity_out: &mut [[f32; 4]],
) {
    let dim = params.dim;
    let size = (params.size.max(0) as usize)
        .min(velocity_in.len())
        .min(acceleration.len())
        .min(velocity_out.len());
    let decay = (-WIND_DECAY_RATE * params.dt).exp();
    let push = params.speed * params.dt * WIND_PUSH_SCALE;
    let dir = Vec2::from_array(params.view_dir);

    for (idx, out) in velocity_out.iter_mut().enumerate().take(size) {
        let x = idx as i32 % dim;
        let z = idx as i32 / dim;
        let src = ((z + params.dz).rem_euclid(dim) * dim + (x + params.dx).rem_euclid(dim)) as usize;

        let v = velocity_in.get(src).map_or(Vec2::ZERO, |v| Vec2::new(v[0], v[1]));
        let a = Vec2::new(acceleration[idx][0], acceleration[idx][1]);
        let next = v * decay + (a + dir * a.length()) * push;
        *out = [next.x, next.y, 0.0, 0.0];
    }
}

/// Device version of [`advance_velocity`].
pub const WIND_SHADER: &str = r"
struct WindParams {
    view_dir: vec2<f32>,
    speed: f32,
    size: i32,
    dim: i32,
    dx: i32,
    dz: i32,
    dt: f32,
    time: f32,
    pad0: f32,
    pad1: f32,
    pad2: f32,
}

@group(0) @binding(0) var<storage, read> velocity_in: array<vec4<f32>>;
@group(0) @binding(1) var<storage, read_write> velocity_out: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read> acceleration: array<vec4<f32>>;
@group(0) @binding(3) var<uniform> params: WindParams;

const DECAY_RATE: f32 = 0.5;
const PUSH_SCALE: f32 = 0.05;

fn wrap(v: i32, m: i32) -> i32 {
    return ((v % m) + m) % m;
}

@compute @workgroup_size(16)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let idx = i32(id.x);
    if idx >= params.size {
        return;
    }

    let x = idx % params.dim;
    let z = idx / params.dim;
    let src = wrap(z + params.dz, params.dim) * params.dim + wrap(x + params.dx, params.dim);

    let v = velocity_in[src].xy;
    let a = acceleration[idx].xy;
    let push = (a + params.view_dir * length(a)) * (params.speed * params.dt * PUSH_SCALE);
    let next = v * exp(-DECAY_RATE * params.dt) + push;

    velocity_out[idx] = vec4<f32>(next, 0.0, 0.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    fn field(radius: i32) -> WindField {
        WindField::new(
            &WindConfig {
                radius,
                influence: 1.0,
            },
            2.0,
        )
    }

    #[test]
    fn test_params_layout() {
        assert_eq!(std::mem::size_of::<WindParams>(), 48);
    }

    #[test]
    fn test_acceleration_bell() {
        let wind = field(4);
        assert_eq!(wind.dim(), 9);
        assert_eq!(wind.field_size(), 81);
        let acc = wind.acceleration();

        // center cell is still
        assert_eq!(acc[4 * 9 + 4], [0.0; 4]);

        // largest component is exactly 1
        let max = acc.iter().flat_map(|v| [v[0].abs(), v[1].abs()]).fold(0.0f32, f32::max);
        assert!((max - 1.0).abs() < 1e-6);

        // point symmetric around the center, pointing outward
        for z in 0..9 {
            for x in 0..9 {
                let a = acc[z * 9 + x];
                let b = acc[(8 - z) * 9 + (8 - x)];
                assert!((a[0] + b[0]).abs() < 1e-6);
                assert!((a[1] + b[1]).abs() < 1e-6);
                if x > 4 {
                    assert!(a[0] > 0.0);
                }
            }
        }
        assert!(wind.velocity().iter().all(|v| *v == [0.0; 4]));
    }

    #[test]
    fn test_workgroup_count() {
        assert_eq!(field(1).workgroup_count(), 1);
        assert_eq!(field(2).workgroup_count(), 2);
        assert_eq!(field(32).workgroup_count(), (65 * 65u32).div_ceil(16));
    }

    #[test]
    fn test_update_tracks_cell_shift() {
        let mut wind = field(2);
        let first = wind.update(Vec3::new(1.0, 0.0, 1.0), Vec3::ZERO);
        assert_eq!((first.dx, first.dz), (0, 0));
        assert_eq!(first.speed, 0.0);
        assert_eq!(first.view_dir, [0.0, 0.0]);
        assert_eq!(first.time, 0.0);

        // one cell along +X, one cell along -Z
        let second = wind.update(Vec3::new(3.0, 5.0, -1.0), Vec3::new(2.0, 5.0, -2.0));
        assert_eq!((second.dx, second.dz), (1, 4));
        assert_eq!(second.time, 1.0);
        assert!((second.speed - 33f32.sqrt() / WIND_TIME_STEP).abs() < 1e-4);
        let dir = Vec2::from_array(second.view_dir);
        assert!((dir.length() - (8.0f32 / 33.0).sqrt()).abs() < 1e-5);
        assert!(dir.x > 0.0 && dir.y < 0.0);
        assert_eq!(wind.time(), 2.0);
    }

    #[test]
    fn test_update_speed_includes_vertical_travel() {
        let mut wind = field(2);
        let sloped = wind.update(Vec3::ZERO, Vec3::new(0.0, 3.0, 4.0));
        assert!((sloped.speed - 5.0 / WIND_TIME_STEP).abs() < 1e-3);
        assert!(sloped.view_dir[0].abs() < 1e-6);
        assert!((sloped.view_dir[1] - 0.8).abs() < 1e-6);

        let climb = wind.update(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0));
        assert!((climb.speed - 2.0 / WIND_TIME_STEP).abs() < 1e-3);
        assert_eq!(climb.view_dir, [0.0, 0.0]);
    }

    #[test]
    fn test_kernel_shifts_toroidally() {
        let wind = field(1);
        let velocity: Vec<[f32; 4]> = (0..9).map(|i| [i as f32, -(i as f32), 0.0, 0.0]).collect();
        let params = WindParams {
            size: 9,
            dim: 3,
            dx: 1,
            dz: 2,
            dt: WIND_TIME_STEP,
            ..WindParams::default()
        };
        let mut out = vec![[0.0; 4]; 9];
        advance_velocity(&velocity, wind.acceleration(), &params, &mut out);

        let decay = (-WIND_DECAY_RATE * WIND_TIME_STEP).exp();
        for z in 0..3 {
            for x in 0..3 {
                let src = ((z + 2) % 3) * 3 + (x + 1) % 3;
                let got = out[z * 3 + x];
                assert!((got[0] - src as f32 * decay).abs() < 1e-6);
                assert!((got[1] + src as f32 * decay).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_kernel_pushes_along_travel() {
        let mut wind = field(3);
        let params = wind.update(Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0));
        let mut out = vec![[0.0; 4]; wind.field_size()];
        advance_velocity(wind.velocity(), wind.acceleration(), &params, &mut out);

        // still air picks up exactly the scaled push
        let push = params.speed * params.dt * WIND_PUSH_SCALE;
        for (a, v) in wind.acceleration().iter().zip(&out) {
            let acc = Vec2::new(a[0], a[1]);
            let expected = (acc + Vec2::X * acc.length()) * push;
            assert!((v[0] - expected.x).abs() < 1e-6);
            assert!((v[1] - expected.y).abs() < 1e-6);
        }
        assert_eq!(out[3 * 7 + 3], [0.0; 4]);
    }

    #[test]
    fn test_shader_constants_match_host() {
        assert!(WIND_SHADER.contains(&format!("DECAY_RATE: f32 = {WIND_DECAY_RATE:?};")));
        assert!(WIND_SHADER.contains(&format!("PUSH_SCALE: f32 = {WIND_PUSH_SCALE:?};")));
        assert!(WIND_SHADER.contains(&format!("@workgroup_size({WIND_WORKGROUP_SIZE})")));
    }
}
