use crate::models::Observation;
use crate::normalize::split_by_sector;
use anyhow::Result;
use csv::WriterBuilder;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Save observations as CSV with header.
pub fn save_csv<P: AsRef<Path>>(points: &[Observation], path: P) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.serialize((
        "period",
        "stateid",
        "state_name",
        "sectorid",
        "sector_name",
        "customers",
        "price",
        "revenue",
        "sales",
    ))?;
    for p in points {
        wtr.serialize((
            &p.period,
            &p.state_id,
            &p.state_name,
            &p.sector_id,
            &p.sector_name,
            p.customers,
            p.price,
            p.revenue,
            p.sales,
        ))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save observations as pretty JSON array.
pub fn save_json<P: AsRef<Path>>(points: &[Observation], path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(points)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

/// Write one CSV per sector next to each other, named `<stem>_<sector>.csv`
/// (lowercased sector id). Returns the paths written.
pub fn save_sector_csvs<P: AsRef<Path>>(points: &[Observation], dir: P, stem: &str) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut written = Vec::new();
    for (sector, rows) in split_by_sector(points) {
        let name = format!("{}_{}.csv", stem, sector.to_lowercase());
        let path = dir.join(name);
        save_csv(&rows, &path)?;
        written.push(path);
    }
    Ok(written)
}
