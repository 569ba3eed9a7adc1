use thiserror::Error;

/// Field of the selection that an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SelectionField {
    Lens,
    Quality,
    Resolution,
    AspectRatio,
}

impl std::fmt::Display for SelectionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionField::Lens => write!(f, "lens"),
            SelectionField::Quality => write!(f, "quality"),
            SelectionField::Resolution => write!(f, "resolution"),
            SelectionField::AspectRatio => write!(f, "aspect_ratio"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The device reported no usable lens. The session cannot continue.
    #[error("No camera available")]
    NoCameraAvailable,
    #[error("Binding failed: {0}")]
    BindingFailed(String),
    #[error("Index out of range for {field}: {index} (len {len})")]
    IndexOutOfRange {
        field: SelectionField,
        index: usize,
        len: usize,
    },
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("A recording is already in progress")]
    AlreadyRecording,
    #[error("Invalid transition: cannot {action} while {from}")]
    InvalidTransition { from: String, action: String },
    #[error("Control unsupported: {0}")]
    ControlUnsupported(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Platform error: {0}")]
    Platform(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CaptureError {
    pub fn invalid_transition(from: impl std::fmt::Display, action: &str) -> Self {
        CaptureError::InvalidTransition {
            from: from.to_string(),
            action: action.to_string(),
        }
    }

    /// Fatal errors end the session; everything else leaves the last good state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CaptureError::NoCameraAvailable)
    }
}

/// Raw failure reported by the host camera subsystem, before it is
/// classified into a [`CaptureError`] at a component boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("camera in use: {0}")]
    CameraInUse(String),
    #[error("lens not found: {0}")]
    LensNotFound(String),
    #[error("unsupported configuration: {0}")]
    Unsupported(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("{0}")]
    Other(String),
}

impl From<PlatformError> for CaptureError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::PermissionDenied(msg) => CaptureError::PermissionDenied(msg),
            other => CaptureError::Platform(other.to_string()),
        }
    }
}
