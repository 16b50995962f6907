//! Pattern & anomaly memory
//!
//! Bounded rolling metric history per (machine, metric), cross-machine
//! correlation records with statistical significance testing, and z-score
//! anomaly records. All accessors return value copies; callers can never
//! mutate engine-internal memory through a returned reference.

use std::collections::{HashMap, VecDeque};

use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::{debug, info};

use crate::config::defaults::{ANOMALY_CAPACITY, CROSS_PATTERN_CAPACITY, METRIC_HISTORY_CAPACITY};
use crate::config::MemoryConfig;
use crate::types::{
    AnomalyRecord, CrossMachinePattern, MachineReading, MetricKind, TelemetrySnapshot,
    TrendDirection,
};

/// Bounded rolling metric history plus derived correlation/anomaly records.
#[derive(Debug, Default)]
pub struct PatternMemory {
    /// (machine id, metric) → normalized samples, oldest first, ≤ 60
    series: HashMap<(String, MetricKind), VecDeque<f64>>,
    /// Machine id → process group, refreshed from each snapshot
    groups: HashMap<String, String>,
    patterns: VecDeque<CrossMachinePattern>,
    anomalies: VecDeque<AnomalyRecord>,
}

impl PatternMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a raw metric value into [0, 1].
    ///
    /// Non-finite inputs collapse to 0.0; everything else divides by the
    /// configured maximum and clamps. This runs before any sample enters
    /// memory, so malformed telemetry cannot poison the buffers.
    pub fn normalize(config: &MemoryConfig, kind: MetricKind, raw: f64) -> f64 {
        if !raw.is_finite() {
            return 0.0;
        }
        let max = match kind {
            MetricKind::Rpm => config.rpm_max,
            MetricKind::Temperature => config.temperature_max_c,
            MetricKind::Vibration => config.vibration_max_mm_s,
            MetricKind::Load => config.load_max,
            MetricKind::FillLevel => 1.0,
        };
        (raw / max).clamp(0.0, 1.0)
    }

    /// Append one normalized sample per tracked metric per machine, then
    /// run anomaly checks against each series' own rolling statistics.
    pub fn ingest(&mut self, config: &MemoryConfig, snapshot: &TelemetrySnapshot) {
        for machine in &snapshot.machines {
            self.groups
                .insert(machine.id.clone(), machine.group.clone());
            for kind in MetricKind::ALL {
                let value = Self::normalize(config, kind, machine.metric(kind));
                self.check_anomaly(
                    config,
                    machine,
                    kind,
                    value,
                    snapshot.environment.sim_time_secs,
                );
                let series = self
                    .series
                    .entry((machine.id.clone(), kind))
                    .or_insert_with(|| VecDeque::with_capacity(METRIC_HISTORY_CAPACITY));
                if series.len() == METRIC_HISTORY_CAPACITY {
                    series.pop_front();
                }
                series.push_back(value);
            }
        }
    }

    /// Flag the incoming sample if it deviates sharply from the series'
    /// rolling mean. Runs before the sample is appended so the sample does
    /// not dilute its own reference statistics.
    fn check_anomaly(
        &mut self,
        config: &MemoryConfig,
        machine: &MachineReading,
        kind: MetricKind,
        value: f64,
        now_sim_secs: u64,
    ) {
        let series = match self.series.get(&(machine.id.clone(), kind)) {
            Some(s) if s.len() >= config.anomaly_min_samples => s,
            _ => return,
        };
        let n = series.len() as f64;
        let mean: f64 = series.iter().sum::<f64>() / n;
        let variance: f64 = series.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        if std_dev < 1e-9 {
            return;
        }
        let z = (value - mean) / std_dev;
        if z.abs() < config.anomaly_sigma {
            return;
        }

        debug!(
            machine = %machine.id,
            metric = %kind,
            z_score = z,
            value = value,
            "Metric anomaly detected"
        );
        if self.anomalies.len() == ANOMALY_CAPACITY {
            self.anomalies.pop_front();
        }
        self.anomalies.push_back(AnomalyRecord {
            id: uuid::Uuid::new_v4().to_string(),
            machine_id: machine.id.clone(),
            metric: kind,
            value,
            z_score: z,
            detected_at_sim_secs: now_sim_secs,
        });
    }

    /// Compare trend shapes across machines sharing a process group and
    /// record significant correlations. Runs on its own cadence, not every
    /// cycle.
    pub fn scan_correlations(&mut self, config: &MemoryConfig, now_sim_secs: u64) {
        let machine_ids: Vec<String> = {
            let mut ids: Vec<&String> = self.groups.keys().collect();
            ids.sort();
            ids.into_iter().cloned().collect()
        };

        for (i, a) in machine_ids.iter().enumerate() {
            for b in machine_ids.iter().skip(i + 1) {
                if self.groups.get(a) != self.groups.get(b) {
                    continue;
                }
                for kind in MetricKind::ALL {
                    if let Some(pattern) = self.correlate(config, a, b, kind, now_sim_secs) {
                        info!(
                            machine_a = %pattern.machine_a,
                            machine_b = %pattern.machine_b,
                            metric = %pattern.metric,
                            r = pattern.r_value,
                            p = pattern.p_value,
                            "Cross-machine pattern recorded"
                        );
                        // Re-detection refreshes the existing record
                        self.patterns.retain(|p| {
                            !(p.machine_a == pattern.machine_a
                                && p.machine_b == pattern.machine_b
                                && p.metric == pattern.metric)
                        });
                        if self.patterns.len() == CROSS_PATTERN_CAPACITY {
                            self.patterns.pop_front();
                        }
                        self.patterns.push_back(pattern);
                    }
                }
            }
        }
    }

    /// Pearson correlation over the overlapping window with a two-tailed
    /// t-test. Returns a pattern only when |r| and significance both pass.
    fn correlate(
        &self,
        config: &MemoryConfig,
        machine_a: &str,
        machine_b: &str,
        kind: MetricKind,
        now_sim_secs: u64,
    ) -> Option<CrossMachinePattern> {
        let sa = self.series.get(&(machine_a.to_string(), kind))?;
        let sb = self.series.get(&(machine_b.to_string(), kind))?;
        let n = sa.len().min(sb.len());
        if n < config.correlation_min_samples {
            return None;
        }
        // Align on the most recent n samples of each series
        let xs: Vec<f64> = sa.iter().skip(sa.len() - n).copied().collect();
        let ys: Vec<f64> = sb.iter().skip(sb.len() - n).copied().collect();

        let r = pearson(&xs, &ys);
        if r.abs() < config.correlation_min_r {
            return None;
        }
        let p = p_value_for_r(r, n);
        if p >= config.correlation_max_p {
            return None;
        }

        Some(CrossMachinePattern {
            machine_a: machine_a.to_string(),
            machine_b: machine_b.to_string(),
            metric: kind,
            r_value: r,
            p_value: p,
            sample_count: n,
            detected_at_sim_secs: now_sim_secs,
        })
    }

    /// Rolling history for a machine+metric, oldest first. Value copy;
    /// unknown machines yield an empty sequence, never an error.
    pub fn sparkline(&self, machine_id: &str, kind: MetricKind) -> Vec<f64> {
        self.series
            .get(&(machine_id.to_string(), kind))
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Recent trend direction for a machine+metric from a least-squares
    /// slope over the series. Flat for unknown/short series.
    pub fn trend(&self, machine_id: &str, kind: MetricKind) -> TrendDirection {
        let series = match self.series.get(&(machine_id.to_string(), kind)) {
            Some(s) if s.len() >= 4 => s,
            _ => return TrendDirection::Flat,
        };
        let slope = slope_per_sample(series);
        // Normalized units per sample; ±0.002 ≈ ±12% drift over a full buffer
        if slope > 0.002 {
            TrendDirection::Rising
        } else if slope < -0.002 {
            TrendDirection::Falling
        } else {
            TrendDirection::Flat
        }
    }

    /// Least-squares slope (normalized units per sample) for forecasting.
    pub fn slope(&self, machine_id: &str, kind: MetricKind) -> Option<f64> {
        let series = self.series.get(&(machine_id.to_string(), kind))?;
        if series.len() < 4 {
            return None;
        }
        Some(slope_per_sample(series))
    }

    /// All recorded cross-machine patterns, oldest first. Value copy.
    pub fn patterns(&self) -> Vec<CrossMachinePattern> {
        self.patterns.iter().cloned().collect()
    }

    /// All recorded anomalies, oldest first. Value copy.
    pub fn anomalies(&self) -> Vec<AnomalyRecord> {
        self.anomalies.iter().cloned().collect()
    }

    /// Anomalies recorded at or after a simulated time. Value copy.
    pub fn anomalies_since(&self, sim_secs: u64) -> Vec<AnomalyRecord> {
        self.anomalies
            .iter()
            .filter(|a| a.detected_at_sim_secs >= sim_secs)
            .cloned()
            .collect()
    }

    pub fn tracked_machines(&self) -> usize {
        self.groups.len()
    }

    pub fn tracked_series(&self) -> usize {
        self.series.len()
    }

    pub fn total_samples(&self) -> usize {
        self.series.values().map(|s| s.len()).sum()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies.len()
    }
}

/// Pearson correlation coefficient.
fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|a| a * a).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x.powi(2)) * (n * sum_y2 - sum_y.powi(2))).sqrt();

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Two-tailed p-value for a Pearson r via Student's t with n-2 degrees of
/// freedom.
fn p_value_for_r(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    if r.abs() >= 0.9999 {
        return 0.0;
    }
    let df = (n - 2) as f64;
    let t_stat = r * df.sqrt() / (1.0 - r * r).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * (1.0 - dist.cdf(t_stat.abs())),
        Err(_) => 1.0,
    }
}

/// Least-squares slope over a series, in value units per sample index.
fn slope_per_sample(series: &VecDeque<f64>) -> f64 {
    let n = series.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y: f64 = series.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in series.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Environment, MachineStatus, Shift, Weather};

    fn machine(id: &str, group: &str, temperature: f64, vibration: f64) -> MachineReading {
        MachineReading {
            id: id.to_string(),
            group: group.to_string(),
            status: MachineStatus::Running,
            rpm: 1200.0,
            temperature,
            vibration,
            load: 60.0,
            fill_level: Some(0.4),
        }
    }

    fn snapshot(machines: Vec<MachineReading>, sim_time_secs: u64) -> TelemetrySnapshot {
        TelemetrySnapshot {
            machines,
            workers: vec![],
            alerts: vec![],
            environment: Environment {
                weather: Weather::Clear,
                shift: Shift::Day,
                sim_time_secs,
            },
            emergency_active: false,
            drill_active: false,
            drill_phase: Default::default(),
        }
    }

    #[test]
    fn sparkline_values_stay_normalized() {
        let config = MemoryConfig::default();
        let mut memory = PatternMemory::new();
        // Extreme and malformed raw values
        for (i, temp) in [500.0, -40.0, f64::NAN, f64::INFINITY, 60.0]
            .iter()
            .enumerate()
        {
            memory.ingest(
                &config,
                &snapshot(vec![machine("m1", "line-a", *temp, 2.0)], i as u64),
            );
        }
        let spark = memory.sparkline("m1", MetricKind::Temperature);
        assert_eq!(spark.len(), 5);
        assert!(spark.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn unknown_machine_yields_empty_sparkline() {
        let memory = PatternMemory::new();
        assert!(memory.sparkline("ghost", MetricKind::Rpm).is_empty());
    }

    #[test]
    fn history_bounded_to_capacity() {
        let config = MemoryConfig::default();
        let mut memory = PatternMemory::new();
        for i in 0..(METRIC_HISTORY_CAPACITY + 20) {
            memory.ingest(
                &config,
                &snapshot(vec![machine("m1", "line-a", 55.0, 2.0)], i as u64),
            );
        }
        assert_eq!(
            memory.sparkline("m1", MetricKind::Temperature).len(),
            METRIC_HISTORY_CAPACITY
        );
    }

    #[test]
    fn sharp_deviation_records_anomaly() {
        let config = MemoryConfig::default();
        let mut memory = PatternMemory::new();
        // Stable with slight jitter so std_dev is non-zero, then a spike
        for i in 0..30 {
            let jitter = if i % 2 == 0 { 0.2 } else { -0.2 };
            memory.ingest(
                &config,
                &snapshot(vec![machine("m1", "line-a", 55.0 + jitter, 2.0)], i),
            );
        }
        assert_eq!(memory.anomaly_count(), 0);
        memory.ingest(&config, &snapshot(vec![machine("m1", "line-a", 110.0, 2.0)], 31));
        assert!(memory.anomaly_count() >= 1, "spike should be flagged");
        let anomaly = &memory.anomalies()[0];
        assert_eq!(anomaly.machine_id, "m1");
        assert!(anomaly.z_score.abs() >= config.anomaly_sigma);
    }

    #[test]
    fn anomaly_list_bounded_fifo() {
        let config = MemoryConfig {
            anomaly_min_samples: 4,
            ..Default::default()
        };
        let mut memory = PatternMemory::new();
        // Alternate baseline and spikes to generate many anomalies
        for i in 0..600u64 {
            let temp = if i % 4 == 3 { 115.0 } else { 40.0 + (i % 2) as f64 };
            memory.ingest(&config, &snapshot(vec![machine("m1", "line-a", temp, 2.0)], i));
        }
        assert!(memory.anomaly_count() <= ANOMALY_CAPACITY);
    }

    #[test]
    fn correlated_machines_in_same_group_are_recorded() {
        let config = MemoryConfig::default();
        let mut memory = PatternMemory::new();
        for i in 0..40u64 {
            let temp = 40.0 + i as f64;
            memory.ingest(
                &config,
                &snapshot(
                    vec![
                        machine("m1", "line-a", temp, 2.0),
                        machine("m2", "line-a", temp + 3.0, 2.0),
                        machine("m3", "line-b", 55.0, 2.0),
                    ],
                    i,
                ),
            );
        }
        memory.scan_correlations(&config, 40);
        let patterns = memory.patterns();
        assert!(
            patterns
                .iter()
                .any(|p| p.machine_a == "m1" && p.machine_b == "m2"),
            "ramping machines should correlate"
        );
        assert!(
            patterns
                .iter()
                .all(|p| !(p.machine_a == "m1" && p.machine_b == "m3")),
            "different process groups must not be compared"
        );
        assert!(memory.pattern_count() <= CROSS_PATTERN_CAPACITY);
    }

    #[test]
    fn accessors_return_distinct_copies() {
        let config = MemoryConfig::default();
        let mut memory = PatternMemory::new();
        for i in 0..10u64 {
            memory.ingest(&config, &snapshot(vec![machine("m1", "line-a", 55.0, 2.0)], i));
        }
        let mut first = memory.sparkline("m1", MetricKind::Temperature);
        let second = memory.sparkline("m1", MetricKind::Temperature);
        assert_eq!(first, second);
        first.push(99.0); // mutating the copy must not affect engine state
        assert_eq!(
            memory.sparkline("m1", MetricKind::Temperature).len(),
            second.len()
        );
    }

    #[test]
    fn trend_detects_rising_series() {
        let config = MemoryConfig::default();
        let mut memory = PatternMemory::new();
        for i in 0..30u64 {
            memory.ingest(
                &config,
                &snapshot(vec![machine("m1", "line-a", 40.0 + i as f64, 2.0)], i),
            );
        }
        assert_eq!(memory.trend("m1", MetricKind::Temperature), TrendDirection::Rising);
        assert_eq!(memory.trend("ghost", MetricKind::Temperature), TrendDirection::Flat);
    }
}
