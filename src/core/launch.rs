//! Launch descriptors for stdio MCP servers.

use std::io;
use std::path::{Path, PathBuf};

pub const PACKAGE_RUNNER: &str = "uv";
/// File stem of the document server binary built alongside `mcp-chat`.
pub const BUNDLED_DOC_SERVER: &str = "doc-server";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// `uv run <script>`
    PackageRunner,
    /// `<interpreter> <script>`
    Interpreter,
}

impl LaunchMode {
    pub fn from_use_uv(use_uv: bool) -> Self {
        if use_uv {
            LaunchMode::PackageRunner
        } else {
            LaunchMode::Interpreter
        }
    }
}

/// Command line used to start one server subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchDescriptor {
    pub command: String,
    pub args: Vec<String>,
}

impl LaunchDescriptor {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn display(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Resolves `script` against the current directory so the child process's
/// own working directory cannot change which file it runs.
pub fn absolute_script_path(script: &Path) -> io::Result<PathBuf> {
    std::path::absolute(script)
}

pub fn resolve_launch(
    mode: LaunchMode,
    interpreter: &str,
    script: &Path,
) -> io::Result<LaunchDescriptor> {
    let script = absolute_script_path(script)?.to_string_lossy().into_owned();
    Ok(match mode {
        LaunchMode::PackageRunner => {
            LaunchDescriptor::new(PACKAGE_RUNNER, vec!["run".to_string(), script])
        }
        LaunchMode::Interpreter => LaunchDescriptor::new(interpreter, vec![script]),
    })
}

/// Splits a command line on whitespace into a descriptor that runs the
/// program directly, with no interpreter in front.
pub fn direct_launch(command_line: &str) -> Option<LaunchDescriptor> {
    let mut words = command_line.split_whitespace().map(str::to_string);
    let command = words.next()?;
    Some(LaunchDescriptor::new(command, words.collect()))
}

/// Finds the bundled document server in the directory of `exe` or the one
/// above it. Test binaries run from `target/<profile>/deps`.
pub fn bundled_doc_server(exe: &Path) -> Option<PathBuf> {
    let file_name = format!("{BUNDLED_DOC_SERVER}{}", std::env::consts::EXE_SUFFIX);
    exe.parent()?
        .ancestors()
        .take(2)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_runner_form_uses_run_subcommand() {
        let descriptor = resolve_launch(
            LaunchMode::PackageRunner,
            "python3",
            Path::new("/srv/mcp_server.py"),
        )
        .expect("absolute path resolves");

        assert_eq!(descriptor.command, "uv");
        assert_eq!(descriptor.args, vec!["run", "/srv/mcp_server.py"]);
    }

    #[test]
    fn interpreter_form_passes_only_the_script() {
        let descriptor = resolve_launch(
            LaunchMode::Interpreter,
            "/usr/bin/python3",
            Path::new("/srv/mcp_server.py"),
        )
        .expect("absolute path resolves");

        assert_eq!(descriptor.command, "/usr/bin/python3");
        assert_eq!(descriptor.args, vec!["/srv/mcp_server.py"]);
        assert_eq!(descriptor.display(), "/usr/bin/python3 /srv/mcp_server.py");
    }

    #[test]
    fn relative_scripts_become_absolute() {
        let cwd = std::env::current_dir().expect("cwd");
        for mode in [LaunchMode::PackageRunner, LaunchMode::Interpreter] {
            let descriptor = resolve_launch(mode, "python3", Path::new("tools/server.py"))
                .expect("relative path resolves");
            let script = descriptor.args.last().expect("script arg");
            assert!(Path::new(script).is_absolute(), "{script} is not absolute");
            assert_eq!(Path::new(script), cwd.join("tools/server.py"));
        }
    }

    #[test]
    fn direct_launch_keeps_arguments_without_an_interpreter() {
        let descriptor = direct_launch("/opt/bin/doc-server --quiet").expect("command present");

        assert_eq!(descriptor.command, "/opt/bin/doc-server");
        assert_eq!(descriptor.args, vec!["--quiet"]);
        assert_eq!(direct_launch("   "), None);
    }

    #[test]
    fn bundled_server_is_found_next_to_or_above_the_executable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let deps = dir.path().join("deps");
        std::fs::create_dir(&deps).expect("deps dir");
        let file_name = format!("{BUNDLED_DOC_SERVER}{}", std::env::consts::EXE_SUFFIX);

        assert_eq!(bundled_doc_server(&deps.join("mcp_chat-test")), None);

        let above = dir.path().join(&file_name);
        std::fs::write(&above, b"").expect("write binary");
        assert_eq!(bundled_doc_server(&deps.join("mcp_chat-test")), Some(above));

        let beside = deps.join(&file_name);
        std::fs::write(&beside, b"").expect("write binary");
        assert_eq!(bundled_doc_server(&deps.join("mcp_chat-test")), Some(beside));
    }

    #[test]
    fn use_uv_flag_selects_mode() {
        assert_eq!(LaunchMode::from_use_uv(true), LaunchMode::PackageRunner);
        assert_eq!(LaunchMode::from_use_uv(false), LaunchMode::Interpreter);
    }
}
