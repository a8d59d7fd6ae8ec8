use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::SampleSource;
use crate::error::{ListenerError, Result};
use crate::sample::{DeviceSample, Tick};

/// Fields requested from nvidia-smi, in the order they are parsed
pub const QUERY_FIELDS: &str = "index,uuid,utilization.gpu,memory.total,memory.used,memory.free,\
driver_version,name,gpu_serial,display_active,display_mode,temperature.gpu";

const FIELD_COUNT: usize = 12;

/// Sample source backed by the `nvidia-smi` command line tool
#[derive(Debug, Clone)]
pub struct NvidiaSmi {
    binary: PathBuf,
}

impl NvidiaSmi {
    /// Use the nvidia-smi found on this system
    pub fn new() -> Self {
        Self {
            binary: locate_binary(),
        }
    }

    /// Use an explicit nvidia-smi binary
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl Default for NvidiaSmi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SampleSource for NvidiaSmi {
    async fn query(&self) -> Result<Tick> {
        debug!("Running {}", self.binary.display());

        let output = Command::new(&self.binary)
            .arg(format!("--query-gpu={}", QUERY_FIELDS))
            .arg("--format=csv,noheader,nounits")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ListenerError::SampleSource(format!(
                    "failed to run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("nvidia-smi failed with {}: {}", output.status, stderr);
            return Err(ListenerError::CommandFailed {
                status: output.status,
                stderr,
            });
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| ListenerError::SampleSource(format!("output is not UTF-8: {}", e)))?;

        parse_output(&stdout)
    }
}

/// Parse the full csv output of one query into a tick
pub fn parse_output(output: &str) -> Result<Tick> {
    let devices = output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(parse_line)
        .collect::<Result<Vec<_>>>()?;

    if devices.is_empty() {
        return Err(ListenerError::NoDevicesFound);
    }

    Ok(Tick::new(devices))
}

/// Parse one device line. Unparsable numeric fields become NaN.
pub fn parse_line(line: &str) -> Result<DeviceSample> {
    let fields: Vec<&str> = line.split(", ").map(str::trim).collect();
    if fields.len() < FIELD_COUNT {
        return Err(ListenerError::SampleSource(format!(
            "expected {} fields, got {}: {:?}",
            FIELD_COUNT,
            fields.len(),
            line
        )));
    }

    let device_id = fields[0].parse::<u32>().map_err(|e| {
        ListenerError::SampleSource(format!("invalid device index {:?}: {}", fields[0], e))
    })?;

    Ok(DeviceSample {
        device_id,
        uuid: fields[1].to_string(),
        utilization_fraction: parse_number(fields[2]) / 100.0,
        memory_total_mb: parse_number(fields[3]),
        memory_used_mb: parse_number(fields[4]),
        memory_free_mb: parse_number(fields[5]),
        driver_version: fields[6].to_string(),
        name: fields[7].to_string(),
        serial: fields[8].to_string(),
        display_active: fields[9].to_string(),
        display_mode: fields[10].to_string(),
        temperature_c: parse_number(fields[11]),
    })
}

fn parse_number(field: &str) -> f64 {
    field.parse::<f64>().unwrap_or_else(|_| {
        debug!("Unparsable numeric field {:?}, using NaN", field);
        f64::NAN
    })
}

#[cfg(not(windows))]
fn locate_binary() -> PathBuf {
    PathBuf::from("nvidia-smi")
}

#[cfg(windows)]
fn locate_binary() -> PathBuf {
    let on_path = std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join("nvidia-smi.exe"))
            .find(|candidate| candidate.is_file())
    });

    on_path.unwrap_or_else(|| {
        let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
        PathBuf::from(format!(
            "{}\\Program Files\\NVIDIA Corporation\\NVSMI\\nvidia-smi.exe",
            drive
        ))
    })
}
