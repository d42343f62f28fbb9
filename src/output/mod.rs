use anyhow::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::network::NetworkTier;

/// One scored station, serialized as a single JSON object per line.
#[derive(Debug, Clone, Serialize)]
pub struct StationRow {
    pub element: &'static str,
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_relation: Option<i64>,
    pub score: u16,
    pub trains: Vec<String>,
    pub subways: Vec<String>,
    pub light_rails: Vec<String>,
    pub trams: Vec<String>,
    pub railways: Vec<String>,
}

/// One classified path way.
#[derive(Debug, Clone, Serialize)]
pub struct PathRow {
    pub element: &'static str,
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hiking: Option<NetworkTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycling: Option<NetworkTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus_route: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResultRow {
    Station(StationRow),
    Path(PathRow),
}

/// Line-delimited JSON sink over a file or stdout.
pub struct JsonlWriter {
    writer: BufWriter<Box<dyn Write + Send>>,
}

impl JsonlWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(Box::new(file)),
        })
    }

    pub fn stdout() -> Self {
        Self {
            writer: BufWriter::new(Box::new(std::io::stdout())),
        }
    }

    pub fn write_row<T: Serialize>(&mut self, row: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, row)?;
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
