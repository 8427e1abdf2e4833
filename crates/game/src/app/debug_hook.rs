use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use questy_engine::signals::names;
use questy_engine::{HookError, SignalPayload, SystemContext, SystemHook};
use thiserror::Error;
use tracing::info;

const ALL_SIGNALS: &str = "*";

#[derive(Debug, Error)]
pub(crate) enum DebugSpecError {
    #[error("failed to read debug file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unknown signal '{0}' in debug spec")]
    UnknownSignal(String),
}

/// Logs every emission of the selected signals together with the
/// user-supplied debug arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TraceHook {
    signals: Vec<&'static str>,
    args: Vec<String>,
}

impl TraceHook {
    /// Builds the hook from `-D` and `-d`; the string comes first. Returns
    /// `None` when neither is given.
    pub(crate) fn from_sources(
        string: Option<&str>,
        file: Option<&Path>,
        args: Vec<String>,
    ) -> Result<Option<Self>, DebugSpecError> {
        if string.is_none() && file.is_none() {
            return Ok(None);
        }
        let mut spec = String::new();
        if let Some(string) = string {
            spec.push_str(string);
            spec.push('\n');
        }
        if let Some(path) = file {
            let contents = fs::read_to_string(path).map_err(|source| DebugSpecError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            spec.push_str(&contents);
        }
        Self::parse(&spec, args).map(Some)
    }

    /// Signal names separated by whitespace or commas; `#` starts a comment.
    pub(crate) fn parse(spec: &str, args: Vec<String>) -> Result<Self, DebugSpecError> {
        let mut signals: Vec<&'static str> = Vec::new();
        let tokens = spec
            .lines()
            .map(|line| line.split('#').next().unwrap_or_default())
            .flat_map(|line| line.split(|c: char| c.is_whitespace() || c == ','))
            .filter(|token| !token.is_empty());

        for token in tokens {
            if token == ALL_SIGNALS {
                for name in names::ALL.iter().copied() {
                    if !signals.contains(&name) {
                        signals.push(name);
                    }
                }
                continue;
            }
            let name = names::ALL
                .iter()
                .copied()
                .find(|candidate| *candidate == token)
                .ok_or_else(|| DebugSpecError::UnknownSignal(token.to_string()))?;
            if !signals.contains(&name) {
                signals.push(name);
            }
        }
        Ok(Self { signals, args })
    }

    pub(crate) fn signals(&self) -> &[&'static str] {
        &self.signals
    }
}

impl SystemHook for TraceHook {
    fn name(&self) -> &str {
        "signal_trace"
    }

    fn install(&self, context: &SystemContext) -> Result<(), HookError> {
        for signal in &self.signals {
            let signal = *signal;
            context.signals.add(
                signal,
                move |payload: &SignalPayload, args: &[String]| {
                    info!(signal, payload = ?payload, args = ?args, "signal_traced");
                    Ok(())
                },
                self.args.clone(),
            );
        }
        info!(signals = self.signals.len(), "signal_trace_installed");
        Ok(())
    }
}
