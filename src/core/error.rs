//! Error types for the voct volume library

use thiserror::Error;

/// Main error type for the library
#[derive(Debug, Error)]
pub enum Error {
    #[error("Voxel ({x}, {y}, {z}) outside volume of extent {extent}")]
    OutOfBounds { x: u32, y: u32, z: u32, extent: u32 },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Inconsistent volume: {0}")]
    Inconsistent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_message() {
        let err = Error::OutOfBounds { x: 9, y: 0, z: 1, extent: 8 };
        assert_eq!(err.to_string(), "Voxel (9, 0, 1) outside volume of extent 8");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
