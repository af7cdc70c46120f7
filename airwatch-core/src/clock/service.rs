//! Clock service implementation

use core::time::Duration;

use super::calendar::CalendarTime;
use super::instant::MonotonicInstant;
use crate::traits::{ClockSyncError, MonotonicClock, TimeSource};

/// Calendar synchronization state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockState {
    /// A network sync has succeeded at least once
    pub synced: bool,
    /// Calendar time minus device time at the last sync (ms)
    pub offset_ms: i64,
    /// Device time of the last successful sync
    pub last_sync: Option<MonotonicInstant>,
}

/// Monotonic clock plus a network-synced calendar view of it
///
/// Syncing only moves the calendar offset. Monotonic readings, and
/// therefore every schedule built on them, are never touched.
pub struct ClockService<M> {
    clock: M,
    tz_offset_hours: i8,
    resync_interval: Option<Duration>,
    state: ClockState,
    last_attempt: Option<MonotonicInstant>,
    /// The source answered `Pending` and has not answered since
    awaiting_answer: bool,
}

impl<M: MonotonicClock> ClockService<M> {
    /// Create an unsynced clock service
    ///
    /// # Arguments
    /// - `clock`: Device monotonic clock
    /// - `tz_offset_hours`: Local offset from UTC in whole hours
    pub fn new(clock: M, tz_offset_hours: i8) -> Self {
        Self {
            clock,
            tz_offset_hours,
            resync_interval: None,
            state: ClockState::default(),
            last_attempt: None,
            awaiting_answer: false,
        }
    }

    /// Enable periodic re-sync
    pub fn with_resync_interval(mut self, interval: Duration) -> Self {
        self.resync_interval = if interval.is_zero() {
            None
        } else {
            Some(interval)
        };
        self
    }

    /// Current monotonic time
    pub fn now_monotonic(&self) -> MonotonicInstant {
        self.clock.now()
    }

    /// Current calendar time in the configured timezone
    ///
    /// Before the first sync this is device uptime counted from the epoch.
    pub fn now_local(&self) -> CalendarTime {
        CalendarTime::from_unix(self.unix_time(), self.tz_offset_hours)
    }

    /// Current calendar time as Unix seconds (UTC)
    pub fn unix_time(&self) -> i64 {
        let device_ms = self.clock.now().as_millis() as i64;
        device_ms
            .saturating_add(self.state.offset_ms)
            .div_euclid(1000)
    }

    /// Query the time source once and apply the result
    ///
    /// On failure the previous calendar offset stays in effect.
    /// [`ClockSyncError::Pending`] does not count as an attempt, and
    /// [`ClockService::resync_due`] keeps polling until the source answers.
    pub fn sync_now<S: TimeSource>(&mut self, source: &mut S) -> Result<(), ClockSyncError> {
        let attempt_at = self.clock.now();

        let answer = source.fetch_unix_time();
        self.awaiting_answer = answer == Err(ClockSyncError::Pending);

        let unix_secs = match answer {
            Ok(secs) => secs,
            Err(ClockSyncError::Pending) => return Err(ClockSyncError::Pending),
            Err(e) => {
                self.last_attempt = Some(attempt_at);
                return Err(e);
            }
        };

        let now = self.clock.now();
        let calendar_ms = (unix_secs as i64).saturating_mul(1000);
        self.state = ClockState {
            synced: true,
            offset_ms: calendar_ms.saturating_sub(now.as_millis() as i64),
            last_sync: Some(now),
        };
        self.last_attempt = Some(now);

        Ok(())
    }

    /// Try to sync up to `attempts` times, returning the last error
    pub fn sync_with_retry<S: TimeSource>(
        &mut self,
        source: &mut S,
        attempts: u8,
    ) -> Result<(), ClockSyncError> {
        let mut last_err = ClockSyncError::Unreachable;
        for _ in 0..attempts.max(1) {
            match self.sync_now(source) {
                Ok(()) => return Ok(()),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    /// Whether a sync should be attempted at `now`
    ///
    /// True while an earlier query is still pending, so a late answer is
    /// picked up even with periodic re-sync disabled.
    pub fn resync_due(&self, now: MonotonicInstant) -> bool {
        if self.awaiting_answer {
            return true;
        }
        match self.resync_interval {
            Some(interval) => self
                .last_attempt
                .map_or(true, |at| now.saturating_duration_since(at) >= interval),
            None => false,
        }
    }

    /// Current sync state
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Check if calendar time has been synced
    pub fn is_synced(&self) -> bool {
        self.state.synced
    }

    /// Configured timezone offset
    pub fn tz_offset_hours(&self) -> i8 {
        self.tz_offset_hours
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FakeClock, ScriptedSource};
    use super::*;

    #[test]
    fn test_unsynced_calendar_counts_from_epoch() {
        let clock = FakeClock::at(90_000);
        let service = ClockService::new(&clock, 0);

        assert!(!service.is_synced());
        let t = service.now_local();
        assert_eq!((t.year, t.hour, t.minute, t.second), (1970, 0, 1, 30));
    }

    #[test]
    fn test_sync_sets_offset() {
        let clock = FakeClock::at(5_000);
        let mut service = ClockService::new(&clock, -7);
        let mut source = ScriptedSource::new(&[Ok(1_700_000_000)]);

        service.sync_now(&mut source).unwrap();
        assert!(service.is_synced());
        assert_eq!(service.unix_time(), 1_700_000_000);

        clock.advance_ms(61_000);
        assert_eq!(service.unix_time(), 1_700_000_061);
        assert_eq!(service.now_local().hour, 15);
    }

    #[test]
    fn test_sync_does_not_touch_monotonic_time() {
        let clock = FakeClock::at(12_345);
        let mut service = ClockService::new(&clock, 0);
        let mut source = ScriptedSource::new(&[Ok(1_000_000_000), Ok(2_000_000_000)]);

        service.sync_now(&mut source).unwrap();
        assert_eq!(service.now_monotonic().as_millis(), 12_345);

        service.sync_now(&mut source).unwrap();
        assert_eq!(service.now_monotonic().as_millis(), 12_345);
        assert_eq!(service.unix_time(), 2_000_000_000);
    }

    #[test]
    fn test_failed_sync_keeps_previous_offset() {
        let clock = FakeClock::at(0);
        let mut service = ClockService::new(&clock, 0);
        let mut source =
            ScriptedSource::new(&[Ok(1_000_000_000), Err(ClockSyncError::MalformedResponse)]);

        service.sync_now(&mut source).unwrap();
        let before = service.state();

        assert_eq!(
            service.sync_now(&mut source),
            Err(ClockSyncError::MalformedResponse)
        );
        assert_eq!(service.state(), before);
    }

    #[test]
    fn test_sync_with_retry() {
        let clock = FakeClock::at(0);
        let mut service = ClockService::new(&clock, 0);
        let mut source = ScriptedSource::new(&[
            Err(ClockSyncError::Timeout),
            Err(ClockSyncError::Timeout),
            Ok(1_000_000_000),
        ]);

        service.sync_with_retry(&mut source, 3).unwrap();
        assert_eq!(source.calls, 3);

        let mut failing = ScriptedSource::new(&[Err(ClockSyncError::Timeout)]);
        assert_eq!(
            service.sync_with_retry(&mut failing, 2),
            Err(ClockSyncError::Unreachable)
        );
        assert_eq!(failing.calls, 2);
    }

    #[test]
    fn test_resync_due() {
        let clock = FakeClock::at(0);
        let mut service =
            ClockService::new(&clock, 0).with_resync_interval(Duration::from_secs(60));
        let mut source = ScriptedSource::new(&[Ok(1_000_000_000)]);

        assert!(service.resync_due(service.now_monotonic()));
        service.sync_now(&mut source).unwrap();
        assert!(!service.resync_due(service.now_monotonic()));

        clock.advance_ms(59_999);
        assert!(!service.resync_due(service.now_monotonic()));
        clock.advance_ms(1);
        assert!(service.resync_due(service.now_monotonic()));
    }

    #[test]
    fn test_pending_is_not_an_attempt() {
        let clock = FakeClock::at(0);
        let mut service =
            ClockService::new(&clock, 0).with_resync_interval(Duration::from_secs(60));
        let mut source = ScriptedSource::new(&[Err(ClockSyncError::Pending)]);

        assert_eq!(service.sync_now(&mut source), Err(ClockSyncError::Pending));
        assert!(service.resync_due(service.now_monotonic()));
    }

    #[test]
    fn test_pending_answer_is_polled_without_interval() {
        let clock = FakeClock::at(0);
        let mut service = ClockService::new(&clock, 0);
        let mut source = ScriptedSource::new(&[
            Err(ClockSyncError::Pending),
            Err(ClockSyncError::Pending),
            Ok(1_000_000_000),
        ]);

        assert!(!service.resync_due(service.now_monotonic()));
        assert_eq!(service.sync_now(&mut source), Err(ClockSyncError::Pending));

        clock.advance_ms(30_000);
        assert!(service.resync_due(service.now_monotonic()));
        assert_eq!(service.sync_now(&mut source), Err(ClockSyncError::Pending));
        assert!(service.resync_due(service.now_monotonic()));

        service.sync_now(&mut source).unwrap();
        assert!(service.is_synced());
        assert!(!service.resync_due(service.now_monotonic()));
    }

    #[test]
    fn test_failed_answer_stops_polling_without_interval() {
        let clock = FakeClock::at(0);
        let mut service = ClockService::new(&clock, 0);
        let mut source =
            ScriptedSource::new(&[Err(ClockSyncError::Pending), Err(ClockSyncError::Timeout)]);

        assert_eq!(service.sync_now(&mut source), Err(ClockSyncError::Pending));
        assert_eq!(service.sync_now(&mut source), Err(ClockSyncError::Timeout));
        assert!(!service.resync_due(service.now_monotonic()));
    }

    #[test]
    fn test_resync_disabled_by_default() {
        let clock = FakeClock::at(0);
        let service = ClockService::new(&clock, 0);
        assert!(!service.resync_due(MonotonicInstant::from_secs(1_000_000)));
    }
}
