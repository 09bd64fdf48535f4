use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

const STATS_INTERVAL_SECS: u64 = 30;

/// Stores statistics about completed assistant cycles
#[derive(Default, Clone)]
pub struct CycleStats {
    pub cycles_completed: usize,
    pub transcription_failures: usize,
    pub total_audio_duration: f32,
    pub total_request_time: f32,
    pub min_request_time: f32,
    pub max_request_time: f32,
}

impl CycleStats {
    pub fn new() -> Self {
        Self {
            cycles_completed: 0,
            transcription_failures: 0,
            total_audio_duration: 0.0,
            total_request_time: 0.0,
            min_request_time: f32::MAX,
            max_request_time: 0.0,
        }
    }

    pub fn record_success(&mut self, request_time: f32, audio_duration: f32) {
        self.cycles_completed += 1;
        self.total_audio_duration += audio_duration;
        self.total_request_time += request_time;
        self.min_request_time = self.min_request_time.min(request_time);
        self.max_request_time = self.max_request_time.max(request_time);
    }

    pub fn record_failure(&mut self) {
        self.transcription_failures += 1;
    }

    pub fn report(&self) -> String {
        let avg_request_time = if self.cycles_completed > 0 {
            self.total_request_time / self.cycles_completed as f32
        } else {
            0.0
        };
        format!(
            "Cycle statistics:\n\
             - Cycles completed: {}\n\
             - Transcription failures: {}\n\
             - Total audio duration: {:.2}s\n\
             - Total request time: {:.2}s\n\
             - Avg request time: {:.2}s\n\
             - Min request time: {:.2}s\n\
             - Max request time: {:.2}s",
            self.cycles_completed,
            self.transcription_failures,
            self.total_audio_duration,
            self.total_request_time,
            avg_request_time,
            if self.min_request_time == f32::MAX {
                0.0
            } else {
                self.min_request_time
            },
            self.max_request_time
        )
    }
}

/// Periodically reports cycle statistics through the log
pub struct StatsReporter {
    stats: Arc<Mutex<CycleStats>>,
    running: Arc<AtomicBool>,
    enabled: bool,
}

impl StatsReporter {
    pub fn new(stats: Arc<Mutex<CycleStats>>, running: Arc<AtomicBool>, enabled: bool) -> Self {
        Self {
            stats,
            running,
            enabled,
        }
    }

    /// Spawns the periodic reporting task
    pub fn start_periodic_reporting(&self) {
        if !self.enabled {
            log::debug!("Stats reporting disabled");
            return;
        }

        let stats = self.stats.clone();
        let running = self.running.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(STATS_INTERVAL_SECS));
            while running.load(Ordering::Relaxed) {
                interval.tick().await;
                if let Some(stats) = stats.try_lock() {
                    if stats.cycles_completed > 0 || stats.transcription_failures > 0 {
                        log::info!("{}", stats.report());
                    }
                }
            }
            log::debug!("Stats reporting stopped");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successes_and_failures_accumulate() {
        let mut stats = CycleStats::new();
        stats.record_success(0.5, 2.0);
        stats.record_success(1.5, 3.0);
        stats.record_failure();

        assert_eq!(stats.cycles_completed, 2);
        assert_eq!(stats.transcription_failures, 1);
        assert_eq!(stats.total_audio_duration, 5.0);
        assert_eq!(stats.min_request_time, 0.5);
        assert_eq!(stats.max_request_time, 1.5);
    }

    #[test]
    fn empty_report_shows_zero_min() {
        let stats = CycleStats::new();
        let report = stats.report();
        assert!(report.contains("Cycles completed: 0"));
        assert!(report.contains("Min request time: 0.00s"));
    }
}
