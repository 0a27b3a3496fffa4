//! Append-only JSONL log of logical actuation commands.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use headput_common::error::{HeadputError, HeadputResult};
use serde::{Deserialize, Serialize};

use crate::command::ActuationCommand;

/// First line of a command log, written as `# {json}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandLogHeader {
    pub schema_version: String,
    pub epoch_wall: String,
    /// Where the samples came from (file path or listener address).
    pub source: String,
}

impl CommandLogHeader {
    pub fn new(epoch_wall: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            schema_version: "1.0".to_string(),
            epoch_wall: epoch_wall.into(),
            source: source.into(),
        }
    }
}

/// One logged command with its session timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub t_ns: u64,
    #[serde(flatten)]
    pub command: ActuationCommand,
}

/// Writes commands to a JSONL file in append-only mode.
pub struct CommandWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    commands_written: u64,
}

impl CommandWriter {
    /// Create a new command writer, writing the header as the first line.
    pub fn new(path: PathBuf, header: &CommandLogHeader) -> HeadputResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        let mut writer = BufWriter::new(file);
        let header_json = serde_json::to_string(header)?;
        writeln!(writer, "# {header_json}")
            .map_err(|e| HeadputError::actuation(format!("Failed to write header: {e}")))?;

        Ok(Self {
            writer,
            path,
            commands_written: 0,
        })
    }

    pub fn write_command(&mut self, t_ns: u64, command: &ActuationCommand) -> HeadputResult<()> {
        let record = CommandRecord {
            t_ns,
            command: command.clone(),
        };
        let json = serde_json::to_string(&record)?;
        writeln!(self.writer, "{json}")
            .map_err(|e| HeadputError::actuation(format!("Failed to write command: {e}")))?;
        self.commands_written += 1;

        if self.commands_written % 1000 == 0 {
            self.flush()?;
        }

        Ok(())
    }

    pub fn flush(&mut self) -> HeadputResult<()> {
        self.writer
            .flush()
            .map_err(|e| HeadputError::actuation(format!("Failed to flush commands: {e}")))
    }

    pub fn commands_written(&self) -> u64 {
        self.commands_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CommandWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Read a command log written by [`CommandWriter`].
pub fn read_command_log(path: &Path) -> HeadputResult<(CommandLogHeader, Vec<CommandRecord>)> {
    let reader = BufReader::new(File::open(path)?);
    let mut header = None;
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(json) = line.strip_prefix("# ") {
            header = Some(serde_json::from_str(json)?);
            continue;
        }
        records.push(serde_json::from_str(line)?);
    }

    let header = header.ok_or_else(|| {
        HeadputError::actuation(format!("Command log {} has no header", path.display()))
    })?;
    Ok((header, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MouseButton;

    #[test]
    fn test_command_log_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("commands.jsonl");
        let header = CommandLogHeader::new("2026-01-01T00:00:00Z", "samples.txt");

        {
            let mut writer = CommandWriter::new(path.clone(), &header).unwrap();
            writer
                .write_command(0, &ActuationCommand::key_down("A", "MouthOpen"))
                .unwrap();
            writer
                .write_command(
                    50_000_000,
                    &ActuationCommand::MouseButtonDown {
                        button: MouseButton::Left,
                    },
                )
                .unwrap();
            writer
                .write_command(100_000_000, &ActuationCommand::ReleaseAll)
                .unwrap();
            assert_eq!(writer.commands_written(), 3);
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.lines().next().unwrap().starts_with("# "));
        assert!(content.contains(r#"{"t_ns":0,"type":"key_down","key":"A","owner":"MouthOpen"}"#));

        let (read_header, records) = read_command_log(&path).unwrap();
        assert_eq!(read_header, header);
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].t_ns, 50_000_000);
        assert_eq!(records[2].command, ActuationCommand::ReleaseAll);
    }

    #[test]
    fn test_log_without_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.jsonl");
        std::fs::write(&path, "{\"t_ns\":0,\"type\":\"release_all\"}\n").unwrap();
        assert!(read_command_log(&path).is_err());
    }
}
