//! Error types for Meadow.

use thiserror::Error;

/// Top-level error type for Meadow operations.
#[derive(Debug, Error)]
pub enum MeadowError {
    /// Heightmap loading errors
    #[error("Heightmap error: {0}")]
    Heightmap(#[from] HeightmapError),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Rendering backend errors
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building a heightmap. Fatal at startup.
#[derive(Debug, Error)]
pub enum HeightmapError {
    /// The image file could not be read
    #[error("Failed to read heightmap {path}: {source}")]
    Io {
        /// Path that was read
        path: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// The image could not be decoded
    #[error("Failed to decode heightmap: {0}")]
    Decode(String),

    /// The image has a zero dimension
    #[error("Heightmap is empty ({width}x{height})")]
    Empty {
        /// Image width
        width: u32,
        /// Image height
        height: u32,
    },

    /// Raw sample buffer does not match the declared dimensions
    #[error("Expected {expected} height samples, got {actual}")]
    SampleCount {
        /// Samples expected (width * height)
        expected: usize,
        /// Samples provided
        actual: usize,
    },
}

/// Invalid terrain, wind or grass parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A size parameter must be strictly positive
    #[error("{name} must be positive, got {value}")]
    NonPositive {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f32,
    },

    /// An integer resolution is below its minimum
    #[error("{name} must be at least {min}, got {value}")]
    TooSmall {
        /// Parameter name
        name: &'static str,
        /// Minimum accepted value
        min: i64,
        /// Offending value
        value: i64,
    },
}

/// Rendering backend errors.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No GPU adapter could be found
    #[error("No suitable GPU adapter available")]
    AdapterUnavailable,

    /// Device creation failed
    #[error("GPU device request failed: {0}")]
    DeviceRequest(String),

    /// Upload larger than the device buffer
    #[error("Buffer {target} holds {capacity} floats, upload has {len}")]
    BufferTooSmall {
        /// Buffer name
        target: &'static str,
        /// Buffer capacity in floats
        capacity: usize,
        /// Upload length in floats
        len: usize,
    },

    /// A kernel or draw referenced a buffer that was never allocated
    #[error("Buffer {0} has not been allocated")]
    UnknownBuffer(&'static str),

    /// Reading a buffer back to the host failed
    #[error("Buffer readback failed: {0}")]
    Readback(String),
}

/// Result type alias for Meadow operations.
pub type MeadowResult<T> = Result<T, MeadowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::TooSmall {
            name: "tiles_per_block",
            min: 2,
            value: 1,
        };
        assert_eq!(err.to_string(), "tiles_per_block must be at least 2, got 1");

        let err: MeadowError = HeightmapError::Empty { width: 0, height: 4 }.into();
        assert_eq!(err.to_string(), "Heightmap error: Heightmap is empty (0x4)");
    }
}
