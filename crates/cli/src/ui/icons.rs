//! Status indicators
//!
//! Plain-text markers so output stays readable in logs and mail.

use hostward_engine::diagnosis::Status;

/// Text markers for statuses
pub struct Icons;

impl Icons {
    pub const STATUS_SUCCESS: &'static str = "[OK]";
    pub const STATUS_WARNING: &'static str = "[!]";
    pub const STATUS_ERROR: &'static str = "[X]";
    pub const STATUS_INFO: &'static str = "[i]";
    pub const STATUS_HOOK: &'static str = "[*]";
    pub const STATUS_RUNNING: &'static str = "[>]";
}

/// Status icon types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIcon {
    Success,
    Warning,
    Error,
    Info,
    Hook,
    Running,
}

impl StatusIcon {
    /// Marker text
    pub fn get(self) -> &'static str {
        match self {
            Self::Success => Icons::STATUS_SUCCESS,
            Self::Warning => Icons::STATUS_WARNING,
            Self::Error => Icons::STATUS_ERROR,
            Self::Info => Icons::STATUS_INFO,
            Self::Hook => Icons::STATUS_HOOK,
            Self::Running => Icons::STATUS_RUNNING,
        }
    }
}

impl From<Status> for StatusIcon {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => Self::Success,
            Status::Info => Self::Info,
            Status::Warning => Self::Warning,
            Status::Error => Self::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(StatusIcon::from(Status::Success).get(), "[OK]");
        assert_eq!(StatusIcon::from(Status::Warning).get(), "[!]");
        assert_eq!(StatusIcon::from(Status::Error).get(), "[X]");
        assert_eq!(StatusIcon::from(Status::Info).get(), "[i]");
    }
}
