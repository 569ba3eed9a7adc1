//! Permission status model.
//!
//! Requesting permissions is the host application's job; this module only
//! classifies what the platform reports so the session can refuse to open
//! without camera access and can drop audio when the microphone is denied.

use crate::errors::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PermissionKind {
    Camera,
    Audio,
}

impl std::fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionKind::Camera => write!(f, "camera"),
            PermissionKind::Audio => write!(f, "audio"),
        }
    }
}

/// Permission status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PermissionStatus {
    /// Permission granted
    Granted,
    /// Permission denied
    Denied,
    /// Permission not determined (user hasn't been asked yet)
    NotDetermined,
    /// Permission restricted (parental controls, etc)
    Restricted,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
            PermissionStatus::Restricted => write!(f, "restricted"),
        }
    }
}

/// Map a reported status to `Ok` or a `PermissionDenied` for the upstream
/// permission-request flow.
pub fn ensure_granted(kind: PermissionKind, status: PermissionStatus) -> Result<(), CaptureError> {
    if status.is_granted() {
        Ok(())
    } else {
        log::warn!("{} permission is {}", kind, status);
        Err(CaptureError::PermissionDenied(format!(
            "{} permission is {}",
            kind, status
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_status_display() {
        assert_eq!(PermissionStatus::Granted.to_string(), "granted");
        assert_eq!(PermissionStatus::NotDetermined.to_string(), "not_determined");
    }

    #[test]
    fn test_ensure_granted() {
        assert!(ensure_granted(PermissionKind::Camera, PermissionStatus::Granted).is_ok());
        let err = ensure_granted(PermissionKind::Camera, PermissionStatus::Restricted).unwrap_err();
        assert_eq!(
            err,
            CaptureError::PermissionDenied("camera permission is restricted".to_string())
        );
    }
}
