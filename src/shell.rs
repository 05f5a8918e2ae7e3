//! Line-oriented front end for a [`Session`]: one command per line, processed
//! in order on the calling thread.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tracing::error;

use crate::renderer::VolumeRenderer;
use crate::session::{SelectOutcome, Session, SessionState, screenshot_message};
use crate::volume_loader::VolumeDecoder;

const HELP: &str = "\
commands:
  open [IMAGE]   load IMAGE and its label volume (no argument cancels)
  toggle         show or hide the label overlay
  screenshot     save the current frame
  stats          print the volume statistics
  html           print the volume statistics as an HTML fragment
  status         print the session state
  help           show this message
  quit           leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Open(Option<PathBuf>),
    Toggle,
    Screenshot,
    Stats,
    Html,
    Status,
    Help,
    Quit,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let command = match word {
            "open" if rest.is_empty() => ShellCommand::Open(None),
            "open" => ShellCommand::Open(Some(PathBuf::from(rest))),
            "toggle" => ShellCommand::Toggle,
            "screenshot" => ShellCommand::Screenshot,
            "stats" => ShellCommand::Stats,
            "html" => ShellCommand::Html,
            "status" => ShellCommand::Status,
            "help" => ShellCommand::Help,
            "quit" | "exit" => ShellCommand::Quit,
            other => return Err(format!("unknown command `{other}` (try `help`)")),
        };
        Ok(Some(command))
    }
}

/// Run commands from `input` until it ends or `quit` is read.
pub fn run_shell<D, R, I, W>(session: &mut Session<D, R>, input: I, mut out: W) -> io::Result<()>
where
    D: VolumeDecoder,
    R: VolumeRenderer,
    I: BufRead,
    W: Write,
{
    for line in input.lines() {
        let command = match ShellCommand::parse(&line?) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                writeln!(out, "{message}")?;
                continue;
            }
        };
        if command == ShellCommand::Quit {
            break;
        }
        execute(session, command, &mut out)?;
    }
    out.flush()
}

fn execute<D, R, W>(session: &mut Session<D, R>, command: ShellCommand, out: &mut W) -> io::Result<()>
where
    D: VolumeDecoder,
    R: VolumeRenderer,
    W: Write,
{
    match command {
        ShellCommand::Open(path) => match session.select_files(path.as_deref()) {
            Ok(SelectOutcome::Loaded(summary)) => writeln!(out, "{}", summary.stats),
            Ok(SelectOutcome::Cancelled) => Ok(()),
            Ok(outcome @ SelectOutcome::LabelNotFound { .. }) => {
                writeln!(out, "{}", outcome.status_message().unwrap_or_default())
            }
            Err(err) => {
                error!("load failed: {err}");
                writeln!(out, "error: {err}")
            }
        },
        ShellCommand::Toggle => match session.toggle_overlay() {
            Ok(visible) => writeln!(
                out,
                "overlay {} [{}]",
                if visible { "shown" } else { "hidden" },
                session.overlay_button_text()
            ),
            Err(err) => writeln!(out, "error: {err}"),
        },
        ShellCommand::Screenshot => match session.export_screenshot() {
            Ok(path) => writeln!(out, "{}", screenshot_message(&path)),
            Err(err) => {
                error!("screenshot failed: {err}");
                writeln!(out, "error: {err}")
            }
        },
        ShellCommand::Stats => match session.stats() {
            Some(stats) => writeln!(out, "{stats}"),
            None => writeln!(out, "no volume pair is loaded"),
        },
        ShellCommand::Html => writeln!(out, "{}", session.report_html()),
        ShellCommand::Status => match session.state() {
            SessionState::Empty => writeln!(out, "empty"),
            SessionState::Loaded(scene) => writeln!(
                out,
                "loaded {} + {} ({:?} voxels), overlay {}",
                scene.summary.image_path.display(),
                scene.summary.label_path.display(),
                scene.summary.dim,
                if scene.label_visible { "shown" } else { "hidden" }
            ),
        },
        ShellCommand::Help => writeln!(out, "{HELP}"),
        ShellCommand::Quit => Ok(()),
    }
}
