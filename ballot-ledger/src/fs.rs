//! Line-oriented file helpers shared by the file backends.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use tokio::{fs, io::AsyncWriteExt};

/// Contents of a line-delimited file.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Lines<'a> {
    /// Newline-terminated lines, `\r` and surrounding whitespace removed.
    pub complete: Vec<&'a str>,
    /// Trailing text with no newline, trimmed. Either a write cut short by a
    /// crash or a complete entry from a writer that omits the final newline;
    /// each backend decides which.
    pub unterminated: Option<&'a str>,
}

pub(crate) fn split_lines(text: &str) -> Lines<'_> {
    let mut lines = Lines::default();
    let mut rest = text;

    while let Some((line, tail)) = rest.split_once('\n') {
        lines.complete.push(line.trim());
        rest = tail;
    }

    let rest = rest.trim();
    if !rest.is_empty() {
        lines.unterminated = Some(rest);
    }

    lines
}

/// Read a file, treating a missing file as `None`.
pub(crate) async fn read_existing(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Append `line` and a newline, then flush it to stable storage.
pub(crate) async fn append_line(path: &Path, line: &str) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    let mut record = String::with_capacity(line.len() + 1);
    record.push_str(line);
    record.push('\n');

    file.write_all(record.as_bytes()).await?;
    file.sync_data().await
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "state".into(), |n| n.to_string_lossy());
    path.with_file_name(format!(".tmp_{name}"))
}

/// Replace the file with `lines` in one step.
///
/// Writes to `.tmp_{name}` beside the target, syncs it and renames it over
/// the original, so a crash leaves either the old or the new contents.
pub(crate) async fn replace_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> io::Result<()> {
    let temp = temp_path(path);

    let mut contents = String::new();
    for line in lines {
        contents.push_str(line.as_ref());
        contents.push('\n');
    }

    let mut file = fs::File::create(&temp).await?;
    file.write_all(contents.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&temp, path).await
}
