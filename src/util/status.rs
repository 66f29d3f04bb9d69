// Copyright 2019 Fullstop000 <fullstop1005@gmail.com>.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;

/// Coarse classification of a `TermError`.
///
/// `Aborted` is not a fault: it is the status a `Sink` callback returns
/// to request an early stop of `iterate`, the same way a non-zero
/// return code aborts a callback-driven scan in the host engine.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Status {
    Ok,
    OutOfMemory,
    Aborted,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Ok => "ok",
            Status::OutOfMemory => "out of memory",
            Status::Aborted => "aborted",
        };
        write!(f, "{}", s)
    }
}

/// An error raised by the accumulator, paired with an optional message.
#[derive(Debug, Clone)]
pub struct TermError {
    status: Status,
    msg: Option<String>,
}

impl TermError {
    pub fn new(status: Status, msg: Option<&str>) -> Self {
        TermError {
            status,
            msg: msg.map(str::to_owned),
        }
    }

    pub fn out_of_memory(msg: &str) -> Self {
        TermError::new(Status::OutOfMemory, Some(msg))
    }

    pub fn status(&self) -> Status {
        self.status
    }
}

impl fmt::Display for TermError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.msg {
            Some(m) => write!(f, "{}: {}", self.status, m),
            None => write!(f, "{}", self.status),
        }
    }
}

impl std::error::Error for TermError {}

pub type Result<T> = std::result::Result<T, TermError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = TermError::out_of_memory("entry buffer growth failed");
        assert_eq!(
            format!("{}", e),
            "out of memory: entry buffer growth failed"
        );
    }

    #[test]
    fn test_status_eq() {
        assert_eq!(Status::OutOfMemory, Status::OutOfMemory);
        assert_ne!(Status::OutOfMemory, Status::Aborted);
    }
}
