use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::core::Clock;

/// Persisted form of an [`AnnotationTimer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRecord {
    pub accumulated_ms: u64,
    pub completed: bool,
}

// ---------------------------------------------------------------------------
// AnnotationTimer: time spent on one conversation, across reloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct AnnotationTimer {
    accumulated_ms: u64,
    running_since: Option<Instant>,
    completed: bool,
}

impl AnnotationTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_record(record: TimerRecord) -> Self {
        Self {
            accumulated_ms: record.accumulated_ms,
            running_since: None,
            completed: record.completed,
        }
    }

    pub fn record(&self, clock: &dyn Clock) -> TimerRecord {
        TimerRecord {
            accumulated_ms: self.elapsed_ms(clock),
            completed: self.completed,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Returns `false` when already running or finished.
    pub fn start(&mut self, clock: &dyn Clock) -> bool {
        if self.completed || self.running_since.is_some() {
            return false;
        }
        self.running_since = Some(clock.now());
        true
    }

    pub fn pause(&mut self, clock: &dyn Clock) {
        if let Some(since) = self.running_since.take() {
            self.accumulated_ms = self.accumulated_ms.saturating_add(clock.elapsed_ms(since));
        }
    }

    pub fn finish(&mut self, clock: &dyn Clock) -> u64 {
        self.pause(clock);
        self.completed = true;
        self.accumulated_ms
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn elapsed_ms(&self, clock: &dyn Clock) -> u64 {
        let running = self
            .running_since
            .map(|since| clock.elapsed_ms(since))
            .unwrap_or(0);
        self.accumulated_ms.saturating_add(running)
    }
}

// ---------------------------------------------------------------------------
// TimerContext: session-scoped timers with a single owner
// ---------------------------------------------------------------------------

pub struct TimerContext {
    session_started: Instant,
    pub annotation: AnnotationTimer,
}

impl TimerContext {
    pub fn new(clock: &dyn Clock, annotation: AnnotationTimer) -> Self {
        Self {
            session_started: clock.now(),
            annotation,
        }
    }

    pub fn session_elapsed_ms(&self, clock: &dyn Clock) -> u64 {
        clock.elapsed_ms(self.session_started)
    }
}

/// Formats milliseconds as `HH:MM:SS`.
pub fn format_hms(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use super::*;

    struct ManualClock {
        base: Instant,
        offset_ms: AtomicU64,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset_ms: AtomicU64::new(0),
            }
        }

        fn advance(&self, ms: u64) {
            self.offset_ms.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
        }
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(61_000), "00:01:01");
        assert_eq!(format_hms(3_723_999), "01:02:03");
        assert_eq!(format_hms(100 * 3_600_000), "100:00:00");
    }

    #[test]
    fn test_accumulates_across_pauses() {
        let clock = ManualClock::new();
        let mut timer = AnnotationTimer::new();

        assert!(timer.start(&clock));
        assert!(!timer.start(&clock));
        clock.advance(1_500);
        assert_eq!(timer.elapsed_ms(&clock), 1_500);

        timer.pause(&clock);
        clock.advance(10_000);
        assert_eq!(timer.elapsed_ms(&clock), 1_500);

        timer.start(&clock);
        clock.advance(500);
        assert_eq!(timer.elapsed_ms(&clock), 2_000);
    }

    #[test]
    fn test_finished_timer_never_restarts() {
        let clock = ManualClock::new();
        let mut timer = AnnotationTimer::new();
        timer.start(&clock);
        clock.advance(4_000);

        assert_eq!(timer.finish(&clock), 4_000);
        assert!(!timer.start(&clock));
        clock.advance(4_000);
        assert_eq!(timer.elapsed_ms(&clock), 4_000);
    }

    #[test]
    fn test_record_round_trip_resumes() {
        let clock = ManualClock::new();
        let mut timer = AnnotationTimer::new();
        timer.start(&clock);
        clock.advance(7_000);

        let record = timer.record(&clock);
        assert_eq!(
            record,
            TimerRecord {
                accumulated_ms: 7_000,
                completed: false
            }
        );

        let mut resumed = AnnotationTimer::from_record(record);
        assert!(!resumed.is_running());
        resumed.start(&clock);
        clock.advance(1_000);
        assert_eq!(resumed.elapsed_ms(&clock), 8_000);
    }

    #[test]
    fn test_reset() {
        let clock = ManualClock::new();
        let mut timer = AnnotationTimer::new();
        timer.start(&clock);
        clock.advance(1_000);
        timer.finish(&clock);

        timer.reset();
        assert!(!timer.is_completed());
        assert_eq!(timer.elapsed_ms(&clock), 0);
        assert!(timer.start(&clock));
    }

    #[test]
    fn test_session_elapsed() {
        let clock = ManualClock::new();
        let ctx = TimerContext::new(&clock, AnnotationTimer::new());
        clock.advance(90_000);
        assert_eq!(format_hms(ctx.session_elapsed_ms(&clock)), "00:01:30");
    }
}
