use thiserror::Error;

/// Capture could not start. The in-flight transition is aborted and nothing
/// is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaAcquisitionError {
    #[error("permission to capture {0} was denied")]
    PermissionDenied(&'static str),
    #[error("no {0} device available")]
    DeviceUnavailable(&'static str),
}
