use crate::particles::{ParticleData, ParticleRecord, Particles};
use anyhow::Result;
use hadron_box_common::Snapshot;
use log::{error, info};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A particle leaving the box through one wall and re-entering through the
/// opposite one. Zero duration, one particle in, the same particle out.
#[derive(Debug, Clone)]
pub struct WallCrossingAction {
    incoming: ParticleData,
    outgoing: ParticleData,
}

impl WallCrossingAction {
    pub fn new(incoming: ParticleData, outgoing: ParticleData) -> Self {
        Self { incoming, outgoing }
    }

    pub fn incoming(&self) -> &ParticleData {
        &self.incoming
    }

    pub fn outgoing(&self) -> &ParticleData {
        &self.outgoing
    }

    /// Time at which the crossing happened [fm].
    pub fn time(&self) -> f64 {
        self.outgoing.position().x0
    }
}

/// Receiver of simulation events.
pub trait OutputInterface: Send {
    /// Called for every event. `density` is the rest-frame density at the
    /// event, zero where none is computed.
    fn at_interaction(&mut self, action: &WallCrossingAction, density: f64) -> Result<()>;

    /// Called once when the run ends.
    fn at_eventend(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_dilepton_output(&self) -> bool {
        false
    }

    fn is_photon_output(&self) -> bool {
        false
    }
}

#[derive(Debug, Serialize)]
struct WallCrossingRecord {
    time: f64,
    id: i32,
    pdg: i32,
    x_before: f64,
    y_before: f64,
    z_before: f64,
    x_after: f64,
    y_after: f64,
    z_after: f64,
    px: f64,
    py: f64,
    pz: f64,
    density: f64,
}

/// Writes one CSV row per wall crossing.
pub struct WallCrossingCsvOutput<W: Write> {
    writer: csv::Writer<W>,
    rows: u64,
}

impl WallCrossingCsvOutput<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let writer = csv::Writer::from_path(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to create wall crossing file '{}': {}", path_ref.display(), e))?;
        Ok(Self { writer, rows: 0 })
    }
}

impl<W: Write> WallCrossingCsvOutput<W> {
    pub fn from_writer(w: W) -> Self {
        Self { writer: csv::Writer::from_writer(w), rows: 0 }
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flushes and hands back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| anyhow::anyhow!("Failed to flush wall crossings: {}", e.error()))
    }
}

impl<W: Write + Send> OutputInterface for WallCrossingCsvOutput<W> {
    fn at_interaction(&mut self, action: &WallCrossingAction, density: f64) -> Result<()> {
        let before = action.incoming().position();
        let after = action.outgoing().position();
        let p = action.outgoing().momentum();
        self.writer.serialize(WallCrossingRecord {
            time: action.time(),
            id: action.outgoing().id(),
            pdg: action.outgoing().pdgcode().code(),
            x_before: before.x1,
            y_before: before.x2,
            z_before: before.x3,
            x_after: after.x1,
            y_after: after.x2,
            z_after: after.x3,
            px: p.x1,
            py: p.x2,
            pz: p.x3,
            density,
        })?;
        self.rows += 1;
        Ok(())
    }

    fn at_eventend(&mut self) -> Result<()> {
        self.writer.flush()?;
        info!("Wrote {} wall crossings.", self.rows);
        Ok(())
    }
}

/// Snapshot file encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Bincode,
    MessagePack,
}

impl SnapshotFormat {
    /// Unknown names fall back to JSON.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.unwrap_or("json") {
            "json" => SnapshotFormat::Json,
            "bincode" => SnapshotFormat::Bincode,
            "messagepack" => SnapshotFormat::MessagePack,
            other => {
                error!("Unknown output format: {}. Using JSON instead.", other);
                SnapshotFormat::Json
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Json => "json",
            SnapshotFormat::Bincode => "bin",
            SnapshotFormat::MessagePack => "msgpack",
        }
    }
}

/// Writes all snapshots to `<base>_snapshots.<ext>` and returns the file name.
pub fn save_snapshots(base_filename: &str, format: SnapshotFormat, snapshots: &[Snapshot]) -> Result<String> {
    let filename = format!("{}_snapshots.{}", base_filename, format.extension());
    let file = File::create(&filename)
        .map_err(|e| anyhow::anyhow!("Error creating snapshot file '{}': {}", filename, e))?;
    write_snapshots(BufWriter::new(file), format, snapshots)?;
    Ok(filename)
}

pub fn write_snapshots<W: Write>(mut w: W, format: SnapshotFormat, snapshots: &[Snapshot]) -> Result<()> {
    match format {
        SnapshotFormat::Json => serde_json::to_writer(&mut w, snapshots)?,
        SnapshotFormat::Bincode => bincode::serialize_into(&mut w, snapshots)?,
        SnapshotFormat::MessagePack => rmp_serde::encode::write(&mut w, snapshots)?,
    }
    w.flush()?;
    Ok(())
}

/// Writes the particle list as CSV, one row per particle.
pub fn write_particles_csv<W: Write>(w: W, particles: &Particles) -> Result<()> {
    let mut writer = csv::Writer::from_writer(w);
    for p in particles {
        writer.serialize(ParticleRecord::from(p))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_particles_csv(base_filename: &str, particles: &Particles) -> Result<String> {
    let filename = format!("{}_particles.csv", base_filename);
    let file = File::create(&filename)
        .map_err(|e| anyhow::anyhow!("Error creating particle file '{}': {}", filename, e))?;
    write_particles_csv(file, particles)?;
    Ok(filename)
}
