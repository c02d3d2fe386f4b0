//! Compressed snapshots of a running surface.
//!
//! A snapshot is the bincode encoding of the field, the parameters and the
//! step counter, compressed as an lz4 block with the uncompressed size
//! prepended. Normals are not stored; they are rebuilt by the next step.

use std::path::Path;

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::config::SimulationParameters;
use crate::error::SurfaceResult;
use crate::field::HeightField;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSnapshot {
    pub field: HeightField,
    pub params: SimulationParameters,
    /// Steps taken by the session when the snapshot was captured.
    pub steps: u64,
}

impl SurfaceSnapshot {
    pub fn to_payload(&self) -> SurfaceResult<Vec<u8>> {
        let payload = bincode::options().serialize(self)?;
        let output = lz4::block::compress(&payload, None, true)?;
        log::debug!(
            "Snapshot payload: {} raw, {} compressed",
            format_bytes(payload.len() as u64),
            format_bytes(output.len() as u64)
        );
        Ok(output)
    }

    pub fn from_payload(payload: &[u8]) -> SurfaceResult<Self> {
        let decompressed = lz4::block::decompress(payload, None)?;
        let snapshot: Self = bincode::options().deserialize(&decompressed)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> SurfaceResult<()> {
        std::fs::write(path, self.to_payload()?)?;
        log::info!("Surface snapshot saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> SurfaceResult<Self> {
        let payload = std::fs::read(path)?;
        Self::from_payload(&payload)
    }

    /// Decoded buffers bypass the field constructors, so check them here.
    fn validate(&self) -> SurfaceResult<()> {
        let dims = self.field.dims();
        dims.validate()?;
        dims.check_len("height", self.field.heights().len())?;
        dims.check_len("velocity", self.field.velocities().len())?;
        if let Some(mask) = self.field.mask() {
            dims.check_len("mask", mask.len())?;
        }
        Ok(())
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
