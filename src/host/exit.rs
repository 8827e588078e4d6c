// Author: Eshan Roy
// SPDX-License-Identifier: MIT

use crate::lifecycle::ShutdownReport;

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Normal shutdown.
    Success,
    /// Configuration, I/O or other general failure.
    Failure,
    /// The export surface could not be established; no plugin ran.
    ExportSurface,
    /// A plugin failed to load or initialize under the fatal policy.
    PluginStartup,
    /// Shutdown completed but at least one plugin did not drain in time.
    DrainTimeout,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::ExportSurface => 2,
            ExitStatus::PluginStartup => 3,
            ExitStatus::DrainTimeout => 4,
        }
    }

    /// Exit status after a shutdown that itself did not error.
    pub fn from_shutdown(report: &ShutdownReport) -> Self {
        if report.timed_out().is_empty() {
            ExitStatus::Success
        } else {
            ExitStatus::DrainTimeout
        }
    }
}
