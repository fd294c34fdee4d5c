//! Probe and host loader - reads run inputs from disk
//!
//! Any problem here is an input error and aborts the run before dispatch.

use serde::de::DeserializeOwned;
use sigprobe_core::{Error, Host, Probe, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Load probes from a file or, recursively, from a directory.
///
/// Files ending in `.yaml`/`.yml` are parsed as YAML, everything else as
/// JSON. Directory entries are visited in sorted path order so the probe
/// order is stable between runs.
pub fn load_probes(path: impl AsRef<Path>) -> Result<Vec<Probe>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }

    info!("Loading probes from: {}", path.display());

    let mut probes = Vec::new();
    if path.is_dir() {
        load_recursive(&mut probes, path)?;
    } else {
        probes.extend(load_probe_file(path)?);
    }

    if probes.is_empty() {
        return Err(Error::NoProbes {
            path: path.display().to_string(),
        });
    }

    info!("Loaded {} probes", probes.len());
    Ok(probes)
}

fn load_recursive(probes: &mut Vec<Probe>, dir: &Path) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            load_recursive(probes, &path)?;
        } else if is_probe_file(&path) {
            let loaded = load_probe_file(&path)?;
            debug!("Loaded {} probes from {}", loaded.len(), path.display());
            probes.extend(loaded);
        }
    }

    Ok(())
}

fn is_probe_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("yaml") | Some("yml")
    )
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn load_probe_file(path: &Path) -> Result<Vec<Probe>> {
    let content = std::fs::read_to_string(path)?;
    let invalid = |message: String| Error::InvalidProbeDefinition {
        path: path.display().to_string(),
        message,
    };

    // A file holds a list of probes or a single probe object
    let probes = if is_yaml(path) {
        let value: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        if value.is_sequence() {
            from_yaml::<Vec<Probe>>(value)
        } else {
            from_yaml::<Probe>(value).map(|probe| vec![probe])
        }
    } else {
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        if value.is_array() {
            from_json::<Vec<Probe>>(value)
        } else {
            from_json::<Probe>(value).map(|probe| vec![probe])
        }
    }
    .map_err(invalid)?;

    for probe in &probes {
        probe.validate()?;
    }
    Ok(probes)
}

fn from_json<T: DeserializeOwned>(value: serde_json::Value) -> std::result::Result<T, String> {
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn from_yaml<T: DeserializeOwned>(value: serde_yaml::Value) -> std::result::Result<T, String> {
    serde_yaml::from_value(value).map_err(|e| e.to_string())
}

/// Load a host list, one host per line, keeping file order.
///
/// Blank lines are skipped. Duplicates are kept.
pub fn load_hosts(path: impl AsRef<Path>) -> Result<Vec<Host>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }

    info!("Loading hosts from: {}", path.display());
    let content = std::fs::read_to_string(path)?;

    let mut hosts = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if let Some(host) = Host::parse_line(line, idx + 1)? {
            hosts.push(host);
        }
    }

    if hosts.is_empty() {
        warn!("Host list {} is empty", path.display());
    } else {
        info!("Loaded {} hosts", hosts.len());
    }
    Ok(hosts)
}
