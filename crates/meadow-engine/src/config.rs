//! Scene configuration.
//!
//! Terrain, wind and grass parameters plus camera and run settings, loaded
//! from a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use meadow_kernel::{GrassConfig, TerrainConfig, WindConfig};

/// Configuration file name.
pub const CONFIG_FILE: &str = "meadow.toml";

/// Camera projection and movement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Viewport width in pixels
    pub width: u32,
    /// Viewport height in pixels
    pub height: u32,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Near plane distance
    pub near: f32,
    /// Far plane distance
    pub far: f32,
    /// Distance moved per step
    pub speed: f32,
    /// Height of the eye above the ground
    pub eye_height: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fov: 45.0,
            near: 0.1,
            far: 1000.0,
            speed: 1.0,
            eye_height: 2.0,
        }
    }
}

/// Scene configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    // Plain values first, TOML tables must follow them.
    /// Heightmap image; a synthetic map is used when missing
    pub heightmap: PathBuf,
    /// Frames to run
    pub frames: u32,
    /// Prefer the wgpu backend when an adapter is available
    pub use_gpu: bool,
    /// Yaw change per frame in degrees
    pub turn_rate: f32,

    /// Terrain layout and streaming
    pub terrain: TerrainConfig,
    /// Wind grid
    pub wind: WindConfig,
    /// Grass blades
    pub grass: GrassConfig,
    /// Camera
    pub camera: CameraSettings,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            heightmap: PathBuf::from("assets/heightmap.png"),
            frames: 600,
            use_gpu: true,
            turn_rate: 0.25,
            terrain: TerrainConfig::default(),
            wind: WindConfig::default(),
            grass: GrassConfig::default(),
            camera: CameraSettings::default(),
        }
    }
}

impl SceneConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp run and camera settings to sensible ranges.
    ///
    /// Terrain, wind and grass parameters are checked by their own `validate`.
    pub fn clamp(&mut self) {
        self.frames = self.frames.clamp(1, 1_000_000);
        self.turn_rate = self.turn_rate.clamp(-45.0, 45.0);

        let camera = &mut self.camera;
        camera.width = camera.width.clamp(1, 7680);
        camera.height = camera.height.clamp(1, 4320);
        camera.fov = camera.fov.clamp(10.0, 170.0);
        camera.near = camera.near.clamp(0.001, 10.0);
        camera.far = camera.far.clamp(camera.near * 2.0, 100_000.0);
        camera.speed = camera.speed.clamp(0.0, 1000.0);
        camera.eye_height = camera.eye_height.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SceneConfig::default();
        assert_eq!(config.frames, 600);
        assert!(config.use_gpu);
        assert_eq!(config.terrain, TerrainConfig::default());
        assert_eq!(config.camera.fov, 45.0);
    }

    #[test]
    fn test_config_clamp() {
        let mut config = SceneConfig::default();
        config.frames = 0;
        config.camera.fov = 300.0;
        config.camera.near = 0.0;
        config.camera.far = 0.0;
        config.camera.eye_height = -1.0;

        config.clamp();

        assert_eq!(config.frames, 1);
        assert_eq!(config.camera.fov, 170.0);
        assert!((config.camera.near - 0.001).abs() < 1e-6);
        assert!(config.camera.far > config.camera.near);
        assert_eq!(config.camera.eye_height, 0.0);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("scene").join(CONFIG_FILE);

        let mut config = SceneConfig::default();
        config.frames = 42;
        config.use_gpu = false;
        config.terrain.view_distance = 512.0;
        config.wind.radius = 8;
        config.grass.seed = 7;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = SceneConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "frames = 10\n\n[terrain]\nview_distance = 128.0\n").expect("write");

        let loaded = SceneConfig::load_from(&config_path);
        assert_eq!(loaded.frames, 10);
        assert_eq!(loaded.terrain.view_distance, 128.0);
        assert_eq!(loaded.terrain.block_size, TerrainConfig::default().block_size);
        assert_eq!(loaded.wind, WindConfig::default());
    }

    #[test]
    fn test_config_load_missing_or_invalid() {
        let config = SceneConfig::load_from("/nonexistent/path/meadow.toml");
        assert_eq!(config, SceneConfig::default());

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "frames = \"lots\"").expect("write");
        assert_eq!(SceneConfig::load_from(&config_path), SceneConfig::default());
    }
}
