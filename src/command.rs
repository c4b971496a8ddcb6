//! Command registry.
//!
//! Holds the set of known command names, their kind (built-in vs. external
//! binary) and the parameter hints for each. Populated once at server
//! init (scanning a colon-separated path plus registering built-ins),
//! immutable thereafter.

use getset::Getters;
use log::warn;
use std::{collections::HashMap, fs, os::unix::fs::PermissionsExt, path::Path};

/// Whether a dispatched command receives no extra context, the session
/// that issued it, or a pid (only `quit` needs one, to signal the process
/// that launched the interactive bootstrap). Replaces a variadic
/// `(cmd, args, ...)` callback signature with an explicit tag per command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerContext {
    /// Built-ins that only need the issuing session (who, tell, yell, ...).
    Session,
    /// `quit`: needs the pid of the process that should receive SIGINT.
    Pid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Builtin(HandlerContext),
    External,
}

#[derive(Debug, Clone, Getters)]
pub struct Command {
    #[get = "pub"]
    name: String,
    /// Absolute path for externals, equal to `name` for built-ins.
    #[get = "pub"]
    fullname: String,
    #[get = "pub"]
    kind: CommandKind,
    #[get = "pub"]
    param_hints: Vec<String>,
}

impl Command {
    pub fn is_external(&self) -> bool {
        matches!(self.kind, CommandKind::External)
    }

    #[cfg(test)]
    pub(crate) fn for_test(name: &str, fullname: &str, kind: CommandKind) -> Self {
        Command {
            name: name.to_string(),
            fullname: fullname.to_string(),
            kind,
            param_hints: Vec::new(),
        }
    }
}

/// Mapping from command name to `Command`; names are unique, last
/// registration wins.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerate regular executable files in each colon-separated
    /// directory; for each add `{name = basename, fullname = dir/basename,
    /// kind = External}`. Missing directories log and continue.
    pub fn register_external(&mut self, path_list: &str) {
        for dir in path_list.split(':').filter(|d| !d.is_empty()) {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("skipping external command directory {}: {}", dir, e);
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !is_executable(&path) {
                    continue;
                }
                let name = match path.file_name().and_then(|n| n.to_str()) {
                    Some(n) => n.to_string(),
                    None => continue,
                };
                let fullname = path.to_string_lossy().to_string();
                self.commands.insert(
                    name.clone(),
                    Command {
                        name,
                        fullname,
                        kind: CommandKind::External,
                        param_hints: Vec::new(),
                    },
                );
            }
        }
    }

    /// Split `param_hint_string` on `:` or space and register a built-in
    /// under `name`.
    pub fn register_builtin(&mut self, name: &str, param_hints: &str, context: HandlerContext) {
        let hints: Vec<String> = param_hints
            .split(|c: char| c == ':' || c == ' ')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        self.commands.insert(
            name.to_string(),
            Command {
                name: name.to_string(),
                fullname: name.to_string(),
                kind: CommandKind::Builtin(context),
                param_hints: hints,
            },
        );
    }

    pub fn lookup(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// True for regular files with at least one executable permission bit set.
fn is_executable(path: &Path) -> bool {
    let meta = match fs::metadata(path) {
        Ok(m) => m,
        Err(_) => return false,
    };
    meta.is_file() && meta.permissions().mode() & 0o111 != 0
}
