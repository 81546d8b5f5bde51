use crate::config::Config;
use crate::model::Entry;
use anyhow::{Context, Result, bail};
use log::info;
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Writes a throwaway shell script that deletes itself and then execs `exec`.
///
/// The script lives in the system temp directory and is left behind for the
/// caller to run; it is the script's job to remove itself.
pub fn run_script(exec: &str) -> Result<PathBuf> {
    let mut script = tempfile::Builder::new()
        .prefix("run-")
        .tempfile()
        .context("failed to create run script")?;
    let path = script.path().to_path_buf();

    write!(script, "#!/bin/sh\nrm {}\nexec {}\n", path.display(), exec)
        .with_context(|| format!("failed to write {}", path.display()))?;

    let path = script
        .into_temp_path()
        .keep()
        .context("failed to keep run script")?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o744))
        .with_context(|| format!("failed to make {} executable", path.display()))?;
    Ok(path)
}

/// The command line used to start a run script, wrapped in the configured
/// terminal when the entry asks for one.
pub fn command_line(entry: &Entry, script: &str, config: &Config) -> Vec<String> {
    let mut cmd_parts: Vec<String> = Vec::new();

    if entry.terminal {
        if let Some(term_cmd) = &config.general.terminal {
            cmd_parts.extend(term_cmd.split_whitespace().map(str::to_string));
        }
    }
    cmd_parts.push(script.to_string());
    cmd_parts
}

/// Launches `entry` with `args` filled into its field codes.
pub fn execute(entry: &Entry, args: &str, config: &Config) -> Result<()> {
    let exec = entry.expand_exec(args);
    if exec.trim().is_empty() {
        bail!("'{}' has no command to run", entry.name);
    }

    let script = run_script(&exec)?;
    let cmd_parts = command_line(entry, &script.to_string_lossy(), config);

    let mut command = Command::new(&cmd_parts[0]);
    command
        .args(&cmd_parts[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if !entry.path.is_empty() {
        command.current_dir(&entry.path);
    }

    info!("Launching '{}': {}", entry.name, exec);
    command
        .spawn()
        .with_context(|| format!("failed to launch '{}'", entry.name))?;
    Ok(())
}
