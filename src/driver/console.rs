use std::io::{BufRead, Write};

use tracing::debug;

use super::{DriverError, Inspector};
use crate::variables::Format;

const HELP: &str = "\
commands:
  step | s                 go to the next stop
  continue | c             run through the remaining stops
  watch <expr>             add a watch
  unwatch <path>           remove the watch at <path>
  expand <path>            expand a row
  collapse <path>          collapse a row
  more <path>              fetch the remaining children of a row
  format <path> <fmt>      natural, binary, octal, decimal or hexadecimal
  print | p                show the tree
  help | h                 this text
  quit | q                 leave
paths are row numbers from the top, like 1/0";

/// One console line, tokenized like a shell would.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Step,
    Continue,
    Watch(String),
    Unwatch(Vec<usize>),
    Expand(Vec<usize>),
    Collapse(Vec<usize>),
    More(Vec<usize>),
    Format(Vec<usize>, Format),
    Print,
    Help,
    Quit,
}

impl Command {
    /// `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Command>, DriverError> {
        let words = shlex::split(line)
            .ok_or_else(|| DriverError::Command(format!("unbalanced quotes in {:?}", line)))?;
        let Some((name, args)) = words.split_first() else {
            return Ok(None);
        };

        let command = match (name.as_str(), args) {
            ("step" | "s" | "next", []) => Command::Step,
            ("continue" | "c", []) => Command::Continue,
            ("watch" | "w", [_, ..]) => Command::Watch(args.join(" ")),
            ("unwatch", [path]) => Command::Unwatch(parse_path(path)?),
            ("expand" | "e", [path]) => Command::Expand(parse_path(path)?),
            ("collapse", [path]) => Command::Collapse(parse_path(path)?),
            ("more" | "m", [path]) => Command::More(parse_path(path)?),
            ("format" | "f", [path, format]) => {
                Command::Format(parse_path(path)?, parse_format(format)?)
            }
            ("print" | "p", []) => Command::Print,
            ("help" | "h" | "?", []) => Command::Help,
            ("quit" | "q" | "exit", []) => Command::Quit,
            _ => {
                return Err(DriverError::Command(format!(
                    "cannot understand {:?}, try help",
                    line.trim()
                )))
            }
        };
        Ok(Some(command))
    }
}

fn parse_path(text: &str) -> Result<Vec<usize>, DriverError> {
    text.split('/')
        .map(|part| {
            part.parse::<usize>()
                .map_err(|_| DriverError::Command(format!("bad row path {:?}", text)))
        })
        .collect()
}

fn parse_format(text: &str) -> Result<Format, DriverError> {
    Format::ALL
        .into_iter()
        .find(|format| format.as_str().eq_ignore_ascii_case(text))
        .ok_or_else(|| DriverError::Command(format!("unknown format {:?}", text)))
}

/// Reads commands from `input` until `quit` or end of input, printing the
/// tree after every command that may have changed it. Command mistakes are
/// reported and the session goes on; only I/O failures end it.
pub fn run_console<R: BufRead, W: Write>(
    inspector: &mut Inspector,
    input: R,
    mut output: W,
) -> Result<(), DriverError> {
    if !inspector.is_running() {
        inspector.start()?;
    }
    writeln!(output, "type help for commands")?;
    write!(output, "> ")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        debug!(line = %line, "console input");
        match Command::parse(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => match execute(inspector, command, &mut output) {
                Ok(()) => {}
                Err(DriverError::Io(err)) => return Err(err.into()),
                Err(err) => writeln!(output, "error: {}", err)?,
            },
            Ok(None) => {}
            Err(err) => writeln!(output, "error: {}", err)?,
        }
        write!(output, "> ")?;
        output.flush()?;
    }
    writeln!(output)?;
    Ok(())
}

fn execute<W: Write>(
    inspector: &mut Inspector,
    command: Command,
    output: &mut W,
) -> Result<(), DriverError> {
    match command {
        Command::Step => match inspector.step()? {
            Some(report) => writeln!(
                output,
                "stop {}: {} added, {} removed, {} updated",
                report.stop + 1,
                report.inserted,
                report.removed,
                report.changed
            )?,
            None => {
                writeln!(output, "session ended")?;
                return Ok(());
            }
        },
        Command::Continue => {
            let reports = inspector.run_to_end()?;
            writeln!(output, "ran {} stops, session ended", reports.len())?;
        }
        Command::Watch(expression) => {
            inspector.add_watch(&expression)?;
        }
        Command::Unwatch(path) => inspector.remove_watch(&path)?,
        Command::Expand(path) => inspector.set_expanded(&path, true)?,
        Command::Collapse(path) => inspector.set_expanded(&path, false)?,
        Command::More(path) => inspector.fetch_more(&path)?,
        Command::Format(path, format) => inspector.set_format(&path, format)?,
        Command::Print => {}
        Command::Help => {
            writeln!(output, "{}", HELP)?;
            return Ok(());
        }
        Command::Quit => return Ok(()),
    }
    write!(output, "{}", inspector.render(true))?;
    Ok(())
}
