//! Node coordinates from simulator position files.
//!
//! Each line is `<node> <time> <x> <y> ...`; only the rows for time 0 are
//! kept, giving the initial placement of every node in metres.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::run_file::{open_run_file, read_lines, RunFileError};
use super::types::NodeSlot;

/// Initial (x, y) position of a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Parse positions from any buffered reader
pub fn parse_positions<R: BufRead>(reader: R) -> std::io::Result<BTreeMap<NodeSlot, Position>> {
    let mut positions = BTreeMap::new();
    read_lines(reader, |line| {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 || parts[1] != "0" {
            return;
        }
        let parsed = (
            parts[0].parse::<NodeSlot>(),
            parts[2].parse::<f64>(),
            parts[3].parse::<f64>(),
        );
        if let (Ok(node), Ok(x), Ok(y)) = parsed {
            positions.insert(node, Position { x, y });
        }
    })?;
    Ok(positions)
}

/// Parse a single position file
pub fn parse_position_file(path: &Path) -> Result<BTreeMap<NodeSlot, Position>, RunFileError> {
    let reader = open_run_file(path)?;
    parse_positions(reader).map_err(|e| RunFileError::from_io(path, e))
}
