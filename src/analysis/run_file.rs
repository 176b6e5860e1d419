//! Opening simulator output files.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Errors that can occur opening or reading a run file.
///
/// A file that opens and yields no usable lines is not an error; its parse
/// result is simply empty.
#[derive(Debug, thiserror::Error)]
pub enum RunFileError {
    #[error("Run file not found: {path}")]
    NotFound { path: String },

    #[error("Failed to read run file {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl RunFileError {
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.display().to_string();
        if source.kind() == io::ErrorKind::NotFound {
            RunFileError::NotFound { path }
        } else {
            RunFileError::Unreadable { path, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RunFileError::NotFound { .. })
    }
}

/// Open a run file for line-by-line reading
pub fn open_run_file(path: &Path) -> Result<BufReader<File>, RunFileError> {
    let file = File::open(path).map_err(|e| RunFileError::from_io(path, e))?;
    Ok(BufReader::with_capacity(64 * 1024, file))
}

/// Feed every line of `reader` to `visit` in file order.
///
/// Lines that are not valid UTF-8 are skipped and counted; the count is
/// returned. Any other read error ends the pass.
pub fn read_lines<R: BufRead>(mut reader: R, mut visit: impl FnMut(&str)) -> io::Result<usize> {
    let mut buf = String::new();
    let mut undecodable = 0;
    loop {
        buf.clear();
        match reader.read_line(&mut buf) {
            Ok(0) => break,
            Ok(_) => visit(buf.trim_end_matches(['\n', '\r'])),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => undecodable += 1,
            Err(e) => return Err(e),
        }
    }
    Ok(undecodable)
}
