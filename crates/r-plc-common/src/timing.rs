//! ---
//! plc_section: "01-core-functionality"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Control-loop timing statistics."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::time::duration_to_micros;

/// Running mean/variance (Welford) with min and max. Constant memory, so a
/// loop that runs for months does not accumulate samples.
#[derive(Debug, Default, Clone, Copy)]
struct Running {
    count: u64,
    mean: f64,
    m2: f64,
    min: u64,
    max: u64,
}

impl Running {
    fn push(&mut self, value_us: u64) {
        if self.count == 0 {
            self.min = value_us;
            self.max = value_us;
        } else {
            self.min = self.min.min(value_us);
            self.max = self.max.max(value_us);
        }
        self.count += 1;
        let value = value_us as f64;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }
}

/// Snapshot of tick timing, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSummary {
    pub samples: u64,
    pub mean_us: f64,
    pub std_dev_us: f64,
    pub min_us: u64,
    pub max_us: u64,
}

/// Thread-safe accumulator of durations.
#[derive(Debug, Default)]
pub struct TimingStats {
    running: Mutex<Running>,
}

impl TimingStats {
    pub fn record(&self, sample: Duration) {
        self.running.lock().push(duration_to_micros(sample));
    }

    /// `None` until the first sample. Standard deviation is the sample
    /// deviation and is zero for a single sample.
    pub fn summary(&self) -> Option<TimingSummary> {
        let running = *self.running.lock();
        if running.count == 0 {
            return None;
        }
        let variance = if running.count > 1 {
            running.m2 / (running.count - 1) as f64
        } else {
            0.0
        };
        Some(TimingSummary {
            samples: running.count,
            mean_us: running.mean,
            std_dev_us: variance.sqrt(),
            min_us: running.min,
            max_us: running.max,
        })
    }
}

/// Measures how far each tick-to-tick interval strays from the loop period.
#[derive(Debug)]
pub struct LoopTimingReporter {
    period: Duration,
    last_tick: Mutex<Option<Instant>>,
    jitter: TimingStats,
}

impl LoopTimingReporter {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_tick: Mutex::new(None),
            jitter: TimingStats::default(),
        }
    }

    pub fn record_tick(&self) {
        self.record_tick_at(Instant::now());
    }

    pub fn record_tick_at(&self, now: Instant) {
        let mut last_tick = self.last_tick.lock();
        if let Some(previous) = last_tick.replace(now) {
            let actual = now.saturating_duration_since(previous);
            let deviation = if actual > self.period {
                actual - self.period
            } else {
                self.period - actual
            };
            self.jitter.record(deviation);
        }
    }

    /// Jitter summary; the first tick only sets the baseline.
    pub fn summary(&self) -> Option<TimingSummary> {
        self.jitter.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_have_no_summary() {
        assert!(TimingStats::default().summary().is_none());
    }

    #[test]
    fn running_statistics_match_batch_formulas() {
        let stats = TimingStats::default();
        for us in [100u64, 200, 300, 400] {
            stats.record(Duration::from_micros(us));
        }
        let summary = stats.summary().unwrap();
        assert_eq!(summary.samples, 4);
        assert!((summary.mean_us - 250.0).abs() < 1e-9);
        // sample variance of 100..400 step 100 is 16666.67
        assert!((summary.std_dev_us - 16_666.666_666_7_f64.sqrt()).abs() < 1e-6);
        assert_eq!(summary.min_us, 100);
        assert_eq!(summary.max_us, 400);
    }

    #[test]
    fn reporter_measures_deviation_from_period() {
        let reporter = LoopTimingReporter::new(Duration::from_millis(100));
        let start = Instant::now();
        reporter.record_tick_at(start);
        assert!(reporter.summary().is_none());
        reporter.record_tick_at(start + Duration::from_millis(110));
        reporter.record_tick_at(start + Duration::from_millis(200));

        let summary = reporter.summary().unwrap();
        assert_eq!(summary.samples, 2);
        assert_eq!(summary.min_us, 10_000);
        assert_eq!(summary.max_us, 10_000);
        assert_eq!(summary.std_dev_us, 0.0);
    }
}
