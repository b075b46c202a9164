use anyhow::{Result, anyhow};

#[cfg(not(target_os = "linux"))]
use copypasta::{ClipboardContext, ClipboardProvider};

/// Linux: wl-copy on Wayland, xclip on X11.
#[cfg(target_os = "linux")]
pub fn copy_to_clipboard(value: &str) -> Result<()> {
    let mut tools: Vec<(&str, &[&str])> = Vec::new();
    if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        tools.push(("wl-copy", &[][..]));
    }
    if std::env::var_os("DISPLAY").is_some() {
        tools.push(("xclip", &["-selection", "clipboard"][..]));
    }
    if tools.is_empty() {
        return Err(anyhow!(
            "No GUI clipboard detected (no DISPLAY or WAYLAND_DISPLAY). Use:\n  \
             otpdeck code <identifier> | xclip -selection clipboard"
        ));
    }

    for (cmd, args) in tools {
        match pipe_to(cmd, args, value) {
            Ok(()) => return Ok(()),
            Err(e) => tracing::debug!("{cmd} failed: {e:#}"),
        }
    }
    Err(anyhow!(
        "Failed to copy to clipboard: wl-copy/xclip not available or failed. \
         Install `wl-clipboard` or `xclip`."
    ))
}

#[cfg(target_os = "linux")]
fn pipe_to(cmd: &str, args: &[&str], value: &str) -> Result<()> {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| anyhow!("failed to spawn {cmd}: {e}"))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(value.as_bytes())?;
    }

    let status = child.wait()?;
    if !status.success() {
        return Err(anyhow!("{cmd} exited with status {status}"));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn copy_to_clipboard(value: &str) -> Result<()> {
    let mut ctx =
        ClipboardContext::new().map_err(|e| anyhow!("Failed to initialize clipboard: {e}"))?;
    ctx.set_contents(value.to_string())
        .map_err(|e| anyhow!("Failed to copy to clipboard: {e}"))
}
