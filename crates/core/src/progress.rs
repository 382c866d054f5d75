//! Rate-limited progress reporting and ETA extrapolation (`spec.md` §4.6
//! step 7).

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::plugins::ProgressUpdate;

/// One progress update as reported up to the CLI/caller, carrying both the
/// engine's own estimate and the scheduler's own running extrapolation.
#[derive(Clone, Debug, Serialize)]
pub struct JobProgressUpdate {
    pub job_name: String,
    pub job_index: usize,
    pub jobs_total: usize,
    pub percent: Option<f64>,
    pub message: String,
    pub stage: Option<String>,
    /// First-order extrapolated remaining seconds for the current job.
    pub job_eta_seconds: Option<f64>,
    /// First-order extrapolated remaining seconds across the whole run,
    /// assuming jobs not yet started take as long as the current job.
    pub global_eta_seconds: Option<f64>,
}

/// Rate-limits an engine's progress callbacks to at most one per
/// `min_interval`, except the terminal update (`percent == Some(1.0)`),
/// which is never dropped. Also tracks first-seen time to extrapolate ETA.
pub struct ProgressRateLimiter {
    min_interval: Duration,
    last_emit: Option<Instant>,
    started_at: Option<Instant>,
}

impl ProgressRateLimiter {
    pub fn new(min_interval_seconds: f64) -> Self {
        ProgressRateLimiter {
            min_interval: Duration::from_secs_f64(min_interval_seconds.max(0.0)),
            last_emit: None,
            started_at: None,
        }
    }

    /// Decide whether `update` should be emitted now, given the current
    /// instant. Returns the extrapolated job ETA alongside the decision so
    /// the caller doesn't need a second clock read.
    pub fn should_emit(&mut self, update: &ProgressUpdate, now: Instant) -> Option<Option<f64>> {
        let is_terminal = update.percent == Some(1.0);
        self.started_at.get_or_insert(now);

        if !is_terminal {
            if let Some(last) = self.last_emit {
                if now.duration_since(last) < self.min_interval {
                    return None;
                }
            }
        }
        self.last_emit = Some(now);

        let eta = update.percent.and_then(|p| {
            job_eta(
                self.started_at,
                now,
                p,
                update.total_duration_estimate_seconds,
            )
        });
        Some(eta)
    }
}

/// Remaining seconds for the current job, per `spec.md` §4.6 step 7:
/// `job_eta = total_duration_estimate · (1 − percent)` when the engine
/// supplies its own estimate. Engines that leave
/// `total_duration_estimate_seconds` unset fall back to first-order linear
/// extrapolation from elapsed wall-clock time, which is `None` until
/// progress has actually started.
fn job_eta(
    started_at: Option<Instant>,
    now: Instant,
    percent: f64,
    total_duration_estimate_seconds: Option<f64>,
) -> Option<f64> {
    if let Some(total) = total_duration_estimate_seconds {
        return Some((total * (1.0 - percent)).max(0.0));
    }
    let started_at = started_at?;
    if percent <= 0.0 || percent >= 1.0 {
        return if percent >= 1.0 { Some(0.0) } else { None };
    }
    let elapsed = now.duration_since(started_at).as_secs_f64();
    let total_estimate = elapsed / percent;
    Some((total_estimate - elapsed).max(0.0))
}

/// Extrapolate remaining time across the whole run: the current job's own
/// ETA, plus an estimate for every job not yet started based on the average
/// per-job duration observed so far.
pub fn global_eta(
    job_eta_seconds: Option<f64>,
    completed_job_durations: &[f64],
    jobs_remaining_after_current: usize,
) -> Option<f64> {
    let current = job_eta_seconds?;
    if jobs_remaining_after_current == 0 {
        return Some(current);
    }
    let avg = if completed_job_durations.is_empty() {
        return Some(current);
    } else {
        completed_job_durations.iter().sum::<f64>() / completed_job_durations.len() as f64
    };
    Some(current + avg * jobs_remaining_after_current as f64)
}
