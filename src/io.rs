//! Access traces for the command-line driver.
//!
//! One access per line, `#` starts a comment:
//!
//! ```text
//! W 0x100 4 0xdeadbeef
//! R 0x100 2
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Exception, TraceError};
use crate::translation::AccessSize;
use crate::vm_manager::VmManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read { addr: u32, size: AccessSize },
    Write { addr: u32, size: AccessSize, value: u32 },
}

/// What an access produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Read(u32),
    Written,
    Fault(Exception),
}

impl Outcome {
    pub fn is_fault(&self) -> bool {
        matches!(self, Outcome::Fault(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Read(value) => write!(f, "{value}"),
            Outcome::Written => f.write_str("ok"),
            Outcome::Fault(exception) => f.write_str(exception.name()),
        }
    }
}

fn parse_number(token: &str, line: usize) -> Result<u32, TraceError> {
    let parsed = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => token.parse(),
    };
    parsed.map_err(|_| TraceError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

fn parse_size(token: &str, line: usize) -> Result<AccessSize, TraceError> {
    let size = parse_number(token, line)?;
    AccessSize::try_from(size).map_err(|size| TraceError::InvalidSize { line, size })
}

/// Parse a whole trace. Line numbers in errors are 1-based.
pub fn parse_trace(content: &str) -> Result<Vec<Access>, TraceError> {
    let mut accesses = Vec::new();
    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let text = raw.split('#').next().unwrap_or_default();
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let Some(&kind) = tokens.first() else {
            continue;
        };

        let access = match (kind.to_ascii_uppercase().as_str(), tokens.len()) {
            ("R", 3) => Access::Read {
                addr: parse_number(tokens[1], line)?,
                size: parse_size(tokens[2], line)?,
            },
            ("W", 4) => Access::Write {
                addr: parse_number(tokens[1], line)?,
                size: parse_size(tokens[2], line)?,
                value: parse_number(tokens[3], line)?,
            },
            ("R", _) | ("W", _) => return Err(TraceError::Malformed { line }),
            _ => {
                return Err(TraceError::UnknownKind {
                    line,
                    kind: kind.to_string(),
                });
            }
        };
        accesses.push(access);
    }
    Ok(accesses)
}

/// Run every access against the current address space, in order.
pub fn run_trace(vm: &mut VmManager, accesses: &[Access]) -> Vec<Outcome> {
    accesses
        .iter()
        .map(|access| match *access {
            Access::Read { addr, size } => match vm.read_mem(addr, size) {
                Ok(value) => Outcome::Read(value),
                Err(exception) => Outcome::Fault(exception),
            },
            Access::Write { addr, size, value } => match vm.write_mem(addr, size, value) {
                Ok(()) => Outcome::Written,
                Err(exception) => Outcome::Fault(exception),
            },
        })
        .collect()
}

pub fn write_results<P: AsRef<Path>>(path: P, results: &[Outcome]) -> std::io::Result<()> {
    let mut content: String = results.iter().map(|r| format!("{r}\n")).collect();
    if content.is_empty() {
        content.push('\n');
    }
    fs::write(path.as_ref(), content)
}
