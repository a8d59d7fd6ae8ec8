//! Per-device summary statistics over a finalized run.
//!
//! Values are exact. Rounding for display happens in the reporter.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ListenerError, Result};
use crate::sample::Run;
use crate::scheduler::SamplingConfig;

/// Summary of one device over a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub device_id: u32,
    pub uuid: String,
    pub avg_utilization: f64,
    pub avg_memory_used: f64,
    /// Taken from the last tick, not averaged
    pub memory_total: f64,
    pub avg_temperature: f64,
    pub median_utilization: f64,
    pub max_utilization: f64,
    pub min_utilization: f64,
    pub mode_utilization: f64,
}

/// Everything the reporter needs about one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub device_count: usize,
    pub device_name: String,
    pub driver_version: String,
    pub duration: std::time::Duration,
    pub delay: std::time::Duration,
    pub tick_count: usize,
    pub started_at: DateTime<Utc>,
    pub devices: Vec<DeviceSummary>,
}

impl RunSummary {
    pub fn build(run: &Run, config: &SamplingConfig, started_at: DateTime<Utc>) -> Result<Self> {
        let devices = summarize(run)?;

        Ok(Self {
            device_count: run.device_count(),
            device_name: run.device_name().unwrap_or_default().to_string(),
            driver_version: run.driver_version().unwrap_or_default().to_string(),
            duration: config.duration,
            delay: config.delay,
            tick_count: run.len(),
            started_at,
            devices,
        })
    }
}

struct DeviceSeries {
    device_id: u32,
    uuid: String,
    utilization: Vec<f64>,
    memory_used: Vec<f64>,
    temperature: Vec<f64>,
    memory_total: f64,
}

/// Summarize every device of a run, in the order of the first tick.
///
/// Devices are matched across ticks by uuid. Every tick must report the same
/// set of devices as the first one.
pub fn summarize(run: &Run) -> Result<Vec<DeviceSummary>> {
    let first = run.ticks().first().ok_or(ListenerError::EmptyRun)?;
    let expected = first.uuids();
    let positions: HashMap<&str, usize> = expected
        .iter()
        .enumerate()
        .map(|(i, uuid)| (uuid.as_str(), i))
        .collect();

    let mut series: Vec<DeviceSeries> = first
        .devices
        .iter()
        .map(|d| DeviceSeries {
            device_id: d.device_id,
            uuid: d.uuid.clone(),
            utilization: Vec::with_capacity(run.len()),
            memory_used: Vec::with_capacity(run.len()),
            temperature: Vec::with_capacity(run.len()),
            memory_total: d.memory_total_mb,
        })
        .collect();

    for (k, tick) in run.ticks().iter().enumerate() {
        let changed = || ListenerError::DeviceSetChanged {
            tick: k,
            expected: expected.clone(),
            found: tick.uuids(),
        };

        // A duplicated uuid in the first tick shrinks `positions`
        if tick.width() != positions.len() || positions.len() != expected.len() {
            return Err(changed());
        }

        let mut seen = vec![false; expected.len()];
        for device in &tick.devices {
            let pos = *positions.get(device.uuid.as_str()).ok_or_else(changed)?;
            if std::mem::replace(&mut seen[pos], true) {
                return Err(changed());
            }

            let s = &mut series[pos];
            s.device_id = device.device_id;
            s.utilization.push(device.utilization_fraction);
            s.memory_used.push(device.memory_used_mb);
            s.temperature.push(device.temperature_c);
            s.memory_total = device.memory_total_mb;
        }
    }

    debug!(
        "Summarizing {} device(s) over {} tick(s)",
        series.len(),
        run.len()
    );

    series.into_iter().map(summarize_device).collect()
}

fn summarize_device(s: DeviceSeries) -> Result<DeviceSummary> {
    let empty = || ListenerError::EmptyRun;

    Ok(DeviceSummary {
        device_id: s.device_id,
        avg_utilization: mean(&s.utilization).ok_or_else(empty)?,
        avg_memory_used: mean(&s.memory_used).ok_or_else(empty)?,
        memory_total: s.memory_total,
        avg_temperature: mean(&s.temperature).ok_or_else(empty)?,
        median_utilization: median(&s.utilization).ok_or_else(empty)?,
        max_utilization: max(&s.utilization).ok_or_else(empty)?,
        min_utilization: min(&s.utilization).ok_or_else(empty)?,
        mode_utilization: mode(&s.utilization).ok_or_else(empty)?,
        uuid: s.uuid,
    })
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Middle value, or the mean of the two middle values for an even count.
/// NaN if any value is NaN.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    if values.iter().any(|v| v.is_nan()) {
        return Some(f64::NAN);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn max(values: &[f64]) -> Option<f64> {
    extreme(values, f64::max)
}

pub fn min(values: &[f64]) -> Option<f64> {
    extreme(values, f64::min)
}

// f64::max/min skip NaN, a NaN sample must poison the result instead
fn extreme(values: &[f64], pick: fn(f64, f64) -> f64) -> Option<f64> {
    let (&first, rest) = values.split_first()?;
    Some(rest.iter().fold(first, |acc, &v| {
        if acc.is_nan() || v.is_nan() {
            f64::NAN
        } else {
            pick(acc, v)
        }
    }))
}

/// Most frequent exact value. Ties go to the value seen first.
/// NaN if any value is NaN.
pub fn mode(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    if values.iter().any(|v| v.is_nan()) {
        return Some(f64::NAN);
    }

    let mut slots: HashMap<u64, usize> = HashMap::new();
    let mut counts: Vec<(f64, usize)> = Vec::new();

    for &v in values {
        // 0.0 == -0.0
        let key = if v == 0.0 { 0f64.to_bits() } else { v.to_bits() };
        match slots.get(&key) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                slots.insert(key, counts.len());
                counts.push((v, 1));
            }
        }
    }

    let mut best = counts[0];
    for &entry in &counts[1..] {
        if entry.1 > best.1 {
            best = entry;
        }
    }
    Some(best.0)
}
