//! Line-oriented capture loop.

use anyhow::{Context, Result};
use camcal_pipeline::{
    write_camera_info, CalibrationError, CalibrationSession, ChessboardDetector, ImageSource,
    WriterOptions,
};
use log::{info, warn};
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `catch` or an empty line.
    Catch,
    Delete,
    Restart,
    Stop,
    Finish,
    Help(Option<String>),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] | ["catch"] => Command::Catch,
            ["delete"] => Command::Delete,
            ["restart"] => Command::Restart,
            ["stop"] => Command::Stop,
            ["finish"] => Command::Finish,
            ["help"] => Command::Help(None),
            ["help", topic] => Command::Help(Some((*topic).to_string())),
            _ => Command::Unknown(line.trim().to_string()),
        }
    }
}

pub const COMMAND_LIST: &str = "help, catch (key: Enter), delete, restart, stop, finish";

pub fn help_text(topic: Option<&str>, min_views: usize) -> String {
    match topic {
        None => format!(
            "Take pictures of a chessboard from different points of view with 'catch'.\n\
             At least {min_views} pictures are needed to finish; more give better accuracy.\n\
             Finish the calibration with 'finish'; the result is written as camera_info_<w>x<h>.yaml."
        ),
        Some("catch") => "Takes a picture from the camera.\n\
                          If a chessboard is visible the view is stored."
            .to_string(),
        Some("delete") => "Deletes the previously stored view.".to_string(),
        Some("restart") => "Drops every stored view and starts over.".to_string(),
        Some("stop") => "Stops the calibration; stored views are discarded.".to_string(),
        Some("finish") => format!(
            "Ends the calibration.\n\
             With {min_views} views or more the camera info is written to the output directory."
        ),
        Some(_) => "Unknown command".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplOptions {
    pub output_dir: PathBuf,
    pub writer: WriterOptions,
    /// Save each accepted grayscale frame as `photo{i}.jpg` in `output_dir`.
    pub saving_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplExit {
    /// Calibration written to the given file.
    Finished(PathBuf),
    /// `stop` or end of input.
    Stopped,
}

/// Drive `session` from text commands until `finish` succeeds or `stop`.
///
/// Capture failures and premature `finish` requests are reported on `out`
/// and the loop continues.
pub fn run_repl<S, D, R, W>(
    session: &mut CalibrationSession,
    source: &mut S,
    detector: &D,
    input: R,
    mut out: W,
    options: &ReplOptions,
) -> Result<ReplExit>
where
    S: ImageSource + ?Sized,
    D: ChessboardDetector + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut saved = 0usize;
    writeln!(out, "Commands:\n{COMMAND_LIST}")?;

    for line in input.lines() {
        let line = line.context("reading command")?;
        match Command::parse(&line) {
            Command::Catch => {
                writeln!(out, "---")?;
                let outcome = match session.capture_and_detect(source, detector) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("capture failed: {e}");
                        writeln!(out, "Capture failed: {e}")?;
                        continue;
                    }
                };
                if !outcome.found {
                    writeln!(
                        out,
                        "Chessboard not found, now {}",
                        session.observation_count()
                    )?;
                    continue;
                }
                match session.accept_last_capture() {
                    Ok(count) => {
                        if options.saving_mode {
                            save_last_capture(session, options, saved)?;
                            saved += 1;
                        }
                        writeln!(out, "Image added, now {count}")?;
                    }
                    Err(e) => writeln!(out, "Image rejected: {e}")?,
                }
            }
            Command::Delete => {
                if session.delete_last() {
                    writeln!(out, "Deleted previous")?;
                } else {
                    writeln!(out, "Nothing to delete")?;
                }
            }
            Command::Restart => {
                session.restart();
                saved = 0;
                writeln!(out, "Calibration restarted")?;
                writeln!(out, "Commands:\n{COMMAND_LIST}")?;
            }
            Command::Stop => {
                writeln!(out, "Stopped")?;
                return Ok(ReplExit::Stopped);
            }
            Command::Finish => match session.finish() {
                Ok(result) => {
                    let path = write_camera_info(&result, &options.output_dir, &options.writer)
                        .context("writing camera info")?;
                    writeln!(
                        out,
                        "Calibration successful (reprojection error {:.5}), saved to {}",
                        result.reprojection_error,
                        path.display()
                    )?;
                    return Ok(ReplExit::Finished(path));
                }
                Err(CalibrationError::InsufficientData { have, need }) => {
                    writeln!(out, "Not enough images, now {have} ({need} required)")?;
                }
                Err(e) => writeln!(out, "Calibration failed: {e}")?,
            },
            Command::Help(topic) => {
                writeln!(out, "{}", help_text(topic.as_deref(), session.min_views()))?;
            }
            Command::Unknown(_) => writeln!(out, "Unknown command")?,
        }
    }

    info!("input closed, stopping");
    Ok(ReplExit::Stopped)
}

fn save_last_capture(
    session: &CalibrationSession,
    options: &ReplOptions,
    index: usize,
) -> Result<()> {
    let Some(capture) = session.last_capture() else {
        return Ok(());
    };
    std::fs::create_dir_all(&options.output_dir)
        .with_context(|| format!("creating {}", options.output_dir.display()))?;
    let path = options.output_dir.join(format!("photo{index}.jpg"));
    capture
        .gray
        .save(&path)
        .with_context(|| format!("saving {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse(""), Command::Catch);
        assert_eq!(Command::parse("   "), Command::Catch);
        assert_eq!(Command::parse("catch"), Command::Catch);
        assert_eq!(Command::parse("delete"), Command::Delete);
        assert_eq!(Command::parse("finish\n"), Command::Finish);
        assert_eq!(Command::parse("help"), Command::Help(None));
        assert_eq!(
            Command::parse("help stop"),
            Command::Help(Some("stop".into()))
        );
        assert_eq!(
            Command::parse("catch twice"),
            Command::Unknown("catch twice".into())
        );
        assert_eq!(
            Command::parse("help a b"),
            Command::Unknown("help a b".into())
        );
    }

    #[test]
    fn help_mentions_minimum() {
        assert!(help_text(None, 25).contains("25"));
        assert!(help_text(Some("finish"), 12).contains("12"));
        assert_eq!(help_text(Some("nope"), 25), "Unknown command");
    }
}
