use std::collections::BTreeMap;
use std::fs;
use std::io::Write;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::domain::{Associations, GeoDataset, GeoUid, Pmid};
use crate::error::GeoMapError;

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct VersionProbe {
    schema_version: Option<u32>,
}

#[derive(Debug, Serialize)]
struct SnapshotOut<'a> {
    schema_version: u32,
    created_at: String,
    pub_to_dataset_ids: &'a BTreeMap<Pmid, Vec<GeoUid>>,
    datasets: &'a BTreeMap<GeoUid, Option<GeoDataset>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotIn {
    #[allow(dead_code)]
    schema_version: u32,
    #[allow(dead_code)]
    created_at: String,
    pub_to_dataset_ids: BTreeMap<Pmid, Vec<GeoUid>>,
    datasets: BTreeMap<GeoUid, Option<GeoDataset>>,
}

pub fn snapshot_exists(path: &Utf8Path) -> bool {
    path.as_std_path().is_file()
}

/// Loads both maps of a snapshot written by [`save_snapshot`].
pub fn load_snapshot(path: &Utf8Path) -> Result<Associations, GeoMapError> {
    let content = fs::read(path.as_std_path()).map_err(|err| GeoMapError::Snapshot {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let format_error = |err: serde_json::Error| GeoMapError::SnapshotFormat {
        path: path.to_path_buf(),
        message: err.to_string(),
    };

    let probe: VersionProbe = serde_json::from_slice(&content).map_err(format_error)?;
    match probe.schema_version {
        Some(SNAPSHOT_SCHEMA_VERSION) => {}
        Some(found) => {
            return Err(GeoMapError::SnapshotVersion {
                path: path.to_path_buf(),
                found,
                expected: SNAPSHOT_SCHEMA_VERSION,
            });
        }
        None => {
            return Err(GeoMapError::SnapshotFormat {
                path: path.to_path_buf(),
                message: "missing schema_version".to_string(),
            });
        }
    }

    let snapshot: SnapshotIn = serde_json::from_slice(&content).map_err(format_error)?;
    Ok(Associations {
        pub_to_dataset_ids: snapshot.pub_to_dataset_ids,
        datasets: snapshot.datasets,
    })
}

/// Writes the whole batch through a temp file in the target directory.
pub fn save_snapshot(path: &Utf8Path, associations: &Associations) -> Result<(), GeoMapError> {
    let io_error = |err: std::io::Error| GeoMapError::Snapshot {
        path: path.to_path_buf(),
        message: err.to_string(),
    };
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path()).map_err(io_error)?;

    let payload = SnapshotOut {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        created_at: chrono::Utc::now().to_rfc3339(),
        pub_to_dataset_ids: &associations.pub_to_dataset_ids,
        datasets: &associations.datasets,
    };
    let content = serde_json::to_vec_pretty(&payload).map_err(|err| GeoMapError::Snapshot {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;

    let mut temp = tempfile::Builder::new()
        .prefix(".geo-pubmap-snapshot")
        .tempfile_in(parent.as_std_path())
        .map_err(io_error)?;
    temp.write_all(&content).map_err(io_error)?;
    temp.persist(path.as_std_path())
        .map_err(|err| io_error(err.error))?;
    Ok(())
}
