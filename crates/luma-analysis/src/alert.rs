//! Alert classification

use luma_core::AlertFlags;

/// Alert severity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
        }
    }
}

/// One reportable condition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    /// The flag bit this alert came from
    pub flag: u8,
    pub severity: Severity,
    pub message: &'static str,
}

/// Bit table, in reporting order
const TABLE: [(u8, Severity, &str); 5] = [
    (AlertFlags::MULTIPLE_FACES, Severity::Warning, "Multiple faces detected"),
    (AlertFlags::BRIGHTNESS_CHANGE, Severity::Warning, "Sudden brightness change"),
    (AlertFlags::EXCESSIVE_MOTION, Severity::Warning, "Excessive motion detected"),
    (AlertFlags::NO_FACE, Severity::Info, "No face detected"),
    (AlertFlags::LOOKING_AWAY, Severity::Warning, "Looking away from camera"),
];

/// Map flags to alerts, lowest bit first. Each frame is classified on its own.
pub fn classify(flags: AlertFlags) -> Vec<Alert> {
    TABLE
        .iter()
        .filter(|(bit, _, _)| flags.contains(*bit))
        .map(|&(flag, severity, message)| Alert {
            flag,
            severity,
            message,
        })
        .collect()
}
