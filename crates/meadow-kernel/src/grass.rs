//! Grass blade roots.
//!
//! Every tile draws the same set of blades. Their roots are scattered once
//! over the unit square from a fixed seed and scaled by the tile size in
//! the vertex stage, so the pattern is stable between runs.

use crate::config::GrassConfig;

/// Shared blade root layout for all tiles.
#[derive(Debug, Clone)]
pub struct GrassField {
    roots: Vec<[f32; 2]>,
    blade_height: f32,
}

impl GrassField {
    /// Scatters `config.blade_count` roots in `[0, 1)²`.
    #[must_use]
    pub fn new(config: &GrassConfig) -> Self {
        let mut rng = fastrand::Rng::with_seed(config.seed);
        let roots = (0..config.blade_count).map(|_| [rng.f32(), rng.f32()]).collect();
        Self {
            roots,
            blade_height: config.blade_height,
        }
    }

    /// Root positions in tile-local unit coordinates.
    #[must_use]
    pub fn roots(&self) -> &[[f32; 2]] {
        &self.roots
    }

    /// Roots as one flat float array (2 floats per blade).
    #[must_use]
    pub fn flat_roots(&self) -> &[f32] {
        bytemuck::cast_slice(&self.roots)
    }

    /// Blades per tile.
    #[must_use]
    pub fn blade_count(&self) -> usize {
        self.roots.len()
    }

    /// Maximum blade height.
    #[must_use]
    pub const fn blade_height(&self) -> f32 {
        self.blade_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roots_in_unit_square() {
        let grass = GrassField::new(&GrassConfig {
            blade_count: 200,
            ..GrassConfig::default()
        });
        assert_eq!(grass.blade_count(), 200);
        assert_eq!(grass.flat_roots().len(), 400);
        for root in grass.roots() {
            assert!((0.0..1.0).contains(&root[0]));
            assert!((0.0..1.0).contains(&root[1]));
        }
    }

    #[test]
    fn test_seed_is_deterministic() {
        let config = GrassConfig::default();
        assert_eq!(GrassField::new(&config).roots(), GrassField::new(&config).roots());

        let other = GrassConfig {
            seed: config.seed + 1,
            ..config.clone()
        };
        assert_ne!(GrassField::new(&config).roots(), GrassField::new(&other).roots());
    }
}
