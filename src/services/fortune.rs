//! The `fortune` command.

use crate::{Error, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::instrument;

/// Single-letter switches `fortune` accepts, alone or combined (`-as`).
const SWITCHES: &str = "acefilsw";

/// Runs the system `fortune` program with a vetted set of arguments.
pub struct FortuneService {
    binary: PathBuf,
}

impl FortuneService {
    /// Creates a service running `binary`.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Runs `fortune` and returns its output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] for arguments outside the accepted
    /// set, and [`Error::External`] if the program cannot be started or
    /// exits unsuccessfully.
    #[instrument(skip(self), fields(operation = "fortune.run"))]
    pub fn run(&self, args: &[String]) -> Result<String> {
        validate_args(args)?;

        let program = self.binary.display().to_string();
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|e| Error::External {
                operation: program.clone(),
                cause: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::External {
                operation: program,
                cause: format!("exited with {}: {stderr}", output.status),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }
}

/// Checks arguments against `[-acefilsw] [-n length] [-m pattern] [database...]`.
///
/// # Errors
///
/// Returns [`Error::InvalidQuery`] naming the first rejected argument.
pub fn validate_args(args: &[String]) -> Result<()> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-n" => {
                let length = iter.next().ok_or_else(|| missing_value("-n"))?;
                if length.parse::<u32>().is_err() {
                    return Err(Error::InvalidQuery(format!(
                        "`-n` needs a length in characters, not `{length}`"
                    )));
                }
            },
            "-m" => {
                let pattern = iter.next().ok_or_else(|| missing_value("-m"))?;
                if pattern.is_empty() || pattern.starts_with('-') {
                    return Err(missing_value("-m"));
                }
            },
            flag if flag.len() > 1 && flag.starts_with('-') => {
                let switches = &flag[1..];
                if !switches.chars().all(|c| SWITCHES.contains(c)) {
                    return Err(Error::InvalidQuery(format!(
                        "`{flag}` is not a supported fortune option"
                    )));
                }
            },
            database if is_database_name(database) => {},
            other => {
                return Err(Error::InvalidQuery(format!(
                    "`{other}` is not a supported fortune argument"
                )));
            },
        }
    }
    Ok(())
}

fn is_database_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn missing_value(flag: &str) -> Error {
    Error::InvalidQuery(format!("`{flag}` needs a value"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test_case(&[] ; "no arguments")]
    #[test_case(&["-a"] ; "single switch")]
    #[test_case(&["-as", "-c"] ; "combined switches")]
    #[test_case(&["-n", "80", "-s"] ; "length")]
    #[test_case(&["-m", "rust", "-i"] ; "pattern")]
    #[test_case(&["computers", "science-fiction"] ; "databases")]
    fn test_accepts(list: &[&str]) {
        assert!(validate_args(&args(list)).is_ok());
    }

    #[test_case(&["-x"] ; "unknown switch")]
    #[test_case(&["-a;"] ; "punctuation in switch")]
    #[test_case(&["-n"] ; "length missing")]
    #[test_case(&["-n", "long"] ; "length not a number")]
    #[test_case(&["-m"] ; "pattern missing")]
    #[test_case(&["/etc/passwd"] ; "path")]
    #[test_case(&["50%"] ; "percentage")]
    #[test_case(&["-"] ; "bare dash")]
    fn test_rejects(list: &[&str]) {
        let err = validate_args(&args(list)).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn test_missing_binary_is_external_error() {
        let service = FortuneService::new("/nonexistent/fortune-binary");
        let err = service.run(&[]).unwrap_err();
        assert!(matches!(err, Error::External { .. }));
    }

    #[test]
    fn test_runs_binary() {
        let service = FortuneService::new("echo");
        assert_eq!(service.run(&args(&["-s"])).unwrap(), "-s");
    }

    #[test]
    fn test_failing_binary_is_external_error() {
        let service = FortuneService::new("false");
        assert!(matches!(service.run(&[]), Err(Error::External { .. })));
    }
}
