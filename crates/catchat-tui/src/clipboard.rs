use std::io::{self, Write};
use std::process::{Child, Command, ExitStatus, Stdio};

/// Clipboard tools tried in order: macOS, Wayland, X11, Windows
const CLIPBOARD_COMMANDS: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("clip", &[]),
];

/// Pipe `text` into the first clipboard tool that is installed.
///
/// Returns the name of the tool that accepted the text.
pub fn copy_to_clipboard(text: &str) -> io::Result<&'static str> {
    for &(program, args) in CLIPBOARD_COMMANDS {
        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err),
        };

        let status = feed_and_wait(&mut child, text)?;
        if status.success() {
            tracing::debug!(program, chars = text.chars().count(), "copied to clipboard");
            return Ok(program);
        }
        tracing::debug!(program, %status, "clipboard command failed");
    }

    Err(io::Error::new(
        io::ErrorKind::NotFound,
        "no clipboard command available",
    ))
}

/// Write `text` to the child's stdin, then always reap the child, even when
/// the write failed
fn feed_and_wait(child: &mut Child, text: &str) -> io::Result<ExitStatus> {
    let written = match child.stdin.take() {
        // stdin is dropped at the end of this arm so the tool sees EOF
        Some(mut stdin) => stdin.write_all(text.as_bytes()),
        None => Ok(()),
    };

    let status = child.wait()?;
    written.map(|()| status)
}
