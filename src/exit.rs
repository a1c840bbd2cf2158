use std::{fmt::Display, os::unix::process::ExitStatusExt, process::ExitStatus};

use nix::sys::signal::Signal;

/// How a child process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Code(i32),
    Signaled(i32),
}

impl Exit {
    pub fn success(&self) -> bool {
        matches!(self, Self::Code(0))
    }
}

impl From<ExitStatus> for Exit {
    fn from(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => Self::Code(code),
            (None, Some(signal)) => Self::Signaled(signal),
            // Neither a code nor a signal only happens for stopped children,
            // which we never wait on with WUNTRACED.
            (None, None) => Self::Code(-1),
        }
    }
}

impl Display for Exit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit code {}", code),
            Self::Signaled(signal) => match Signal::try_from(*signal) {
                Ok(sig) => write!(f, "terminated by signal {}", sig),
                Err(_) => write!(f, "terminated by signal {}", signal),
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classifies_wait_status() {
        assert_eq!(Exit::from(ExitStatus::from_raw(0)), Exit::Code(0));
        assert_eq!(Exit::from(ExitStatus::from_raw(1 << 8)), Exit::Code(1));
        assert_eq!(Exit::from(ExitStatus::from_raw(9)), Exit::Signaled(9));
        assert!(Exit::Code(0).success());
        assert!(!Exit::Code(2).success());
        assert!(!Exit::Signaled(11).success());
    }

    #[test]
    fn names_known_signals() {
        assert_eq!(Exit::Signaled(11).to_string(), "terminated by signal SIGSEGV");
        assert_eq!(Exit::Code(3).to_string(), "exit code 3");
    }
}
