//! Child process exit reduction.

use std::fmt;
use std::process::ExitStatus;

/// Exit status of a child process, reduced to what the orchestrator inspects.
///
/// `None` means the child was terminated by a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChildExit(Option<i32>);

impl ChildExit {
    pub const SUCCESS: ChildExit = ChildExit(Some(0));

    pub fn from_code(code: i32) -> Self {
        Self(Some(code))
    }

    pub fn signalled() -> Self {
        Self(None)
    }

    pub fn code(self) -> Option<i32> {
        self.0
    }

    pub fn success(self) -> bool {
        self.0 == Some(0)
    }
}

impl From<ExitStatus> for ChildExit {
    fn from(status: ExitStatus) -> Self {
        Self(status.code())
    }
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}
