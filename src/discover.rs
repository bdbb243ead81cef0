//! Finding trace files in a directory and grouping them for comparison.
//!
//! A file belongs to an algorithm prefix only when the first `-` separated
//! token of its name equals the prefix exactly, so `TcpVegasTweaked-*` files
//! are never picked up for `TcpVegas`.

use crate::trace::TraceId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("failed to list data directory {}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A trace file and the identity parsed from its name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TraceFile {
    pub path: PathBuf,
    pub id: TraceId,
}

impl TraceFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without the `.data` extension
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Every trace file directly inside `dir`, sorted by path
pub fn list_traces<P: AsRef<Path>>(dir: P) -> Result<Vec<TraceFile>, DiscoverError> {
    let dir = dir.as_ref();
    let read_err = |source| DiscoverError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut traces = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        // follows symlinks
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(id) = name.to_str().and_then(TraceId::from_file_name) else {
            continue;
        };
        traces.push(TraceFile {
            path: entry.path(),
            id,
        });
    }

    traces.sort();
    Ok(traces)
}

/// Traces written by one algorithm
pub fn by_prefix(traces: &[TraceFile], prefix: &str) -> Vec<TraceFile> {
    traces
        .iter()
        .filter(|t| t.id.algorithm == prefix)
        .cloned()
        .collect()
}

/// Key of one comparison chart
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub metric: String,
    pub flow: u32,
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' (flow{})", self.metric, self.flow)
    }
}

/// (path, label) entries of one bucket; equal entries collapse
pub type Bucket = BTreeSet<(PathBuf, String)>;

/// Group traces of the given algorithms by (metric, flow).
///
/// A bucket exists for every requested metric and flow, even when nothing
/// matched, so callers can report the empty ones.
pub fn comparison_buckets<S: AsRef<str>>(
    traces: &[TraceFile],
    prefixes: &[S],
    metrics: &[S],
    flows: &[u32],
) -> BTreeMap<BucketKey, Bucket> {
    let mut buckets = BTreeMap::new();

    for metric in metrics {
        let metric = metric.as_ref();
        for &flow in flows {
            let key = BucketKey {
                metric: metric.to_string(),
                flow,
            };
            let bucket: &mut Bucket = buckets.entry(key).or_default();

            for prefix in prefixes {
                let prefix = prefix.as_ref();
                bucket.extend(
                    traces
                        .iter()
                        .filter(|t| {
                            t.id.algorithm == prefix && t.id.metric == metric && t.id.flow == Some(flow)
                        })
                        .map(|t| (t.path.clone(), prefix.to_string())),
                );
            }
        }
    }

    buckets
}
