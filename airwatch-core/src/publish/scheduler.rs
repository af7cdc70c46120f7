//! Publish scheduler
//!
//! Compares monotonic time against the next due instant and, when due,
//! sends one reading through a fresh broker session. Calendar time never
//! enters the decision.
//!
//! Failure policy: a failed publish is retried after `retry_delay` up to
//! `max_retries` times, then dropped and the full interval re-armed.
//! `max_retries = 0` always re-arms the full interval.

use core::time::Duration;

use super::payload::{compose_payload, topic, Topic};
use crate::clock::{CalendarTime, MonotonicInstant};
use crate::config::ScheduleConfig;
use crate::sensor::Reading;
use crate::traits::{Delivery, PublishError, TelemetryTransport};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// When the next publish is due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PublishSchedule {
    interval: Duration,
    next_due: MonotonicInstant,
    retries_used: u8,
}

impl PublishSchedule {
    /// First publish is due one interval after `start`
    pub fn new(interval: Duration, start: MonotonicInstant) -> Self {
        Self {
            interval,
            next_due: start + interval,
            retries_used: 0,
        }
    }

    pub fn is_due(&self, now: MonotonicInstant) -> bool {
        now >= self.next_due
    }

    pub fn next_due(&self) -> MonotonicInstant {
        self.next_due
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Retries spent on the current reading
    pub fn retries_used(&self) -> u8 {
        self.retries_used
    }

    fn rearm(&mut self, now: MonotonicInstant) {
        self.next_due = now + self.interval;
    }
}

/// Bounded retry after a failed publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    pub max_retries: u8,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    /// Never retry; a failure waits for the next interval
    pub const NONE: Self = Self {
        max_retries: 0,
        retry_delay: Duration::ZERO,
    };

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        }
    }
}

/// Result of a publish check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishOutcome {
    /// `now` is before the due instant; nothing was sent
    NotDue,
    /// The reading went out and the schedule was re-armed
    Published {
        next_due: MonotonicInstant,
        delivery: Delivery,
    },
}

/// Sends readings through a transport when the schedule says so
pub struct PublishScheduler<T> {
    transport: T,
    topic: Topic,
    policy: RetryPolicy,
    include_timestamp: bool,
}

impl<T: TelemetryTransport> PublishScheduler<T> {
    /// Create a scheduler publishing to `channels/{channel_id}/publish`
    pub fn new(transport: T, channel_id: &str, policy: RetryPolicy) -> Result<Self, PublishError> {
        Ok(Self {
            transport,
            topic: topic(channel_id)?,
            policy,
            include_timestamp: false,
        })
    }

    /// Append calendar time to the status field when the clock is synced
    pub fn with_timestamp(mut self, include: bool) -> Self {
        self.include_timestamp = include;
        self
    }

    pub fn topic(&self) -> &str {
        self.topic.as_str()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Publish `reading` if `now` has reached the due instant
    pub fn maybe_publish(
        &mut self,
        schedule: &mut PublishSchedule,
        reading: &Reading,
        now: MonotonicInstant,
    ) -> Result<PublishOutcome, PublishError> {
        self.maybe_publish_at(schedule, reading, now, false)
    }

    /// As [`Self::maybe_publish`], stamping the payload when enabled and
    /// `clock_synced`
    pub fn maybe_publish_at(
        &mut self,
        schedule: &mut PublishSchedule,
        reading: &Reading,
        now: MonotonicInstant,
        clock_synced: bool,
    ) -> Result<PublishOutcome, PublishError> {
        if !schedule.is_due(now) {
            return Ok(PublishOutcome::NotDue);
        }

        let stamp: Option<&CalendarTime> =
            (self.include_timestamp && clock_synced).then_some(&reading.captured_at);

        match self.send(reading, stamp) {
            Ok(delivery) => {
                schedule.rearm(now);
                if delivery == Delivery::Delivered {
                    schedule.retries_used = 0;
                }
                Ok(PublishOutcome::Published {
                    next_due: schedule.next_due,
                    delivery,
                })
            }
            Err(e) => {
                self.record_delivery_failure(schedule, now);
                Err(e)
            }
        }
    }

    /// Apply the failure policy for a publish that failed at `now`
    ///
    /// Also used when a queued publish later reports failure.
    pub fn record_delivery_failure(&self, schedule: &mut PublishSchedule, now: MonotonicInstant) {
        if schedule.retries_used < self.policy.max_retries {
            schedule.retries_used += 1;
            schedule.next_due = now + self.policy.retry_delay;
        } else {
            schedule.retries_used = 0;
            schedule.rearm(now);
        }
    }

    /// A queued publish reached the broker
    pub fn record_delivery_success(&self, schedule: &mut PublishSchedule) {
        schedule.retries_used = 0;
    }

    fn send(
        &mut self,
        reading: &Reading,
        stamp: Option<&CalendarTime>,
    ) -> Result<Delivery, PublishError> {
        let payload = compose_payload(reading, stamp)?;

        self.transport.connect(true)?;
        let result = self
            .transport
            .publish(self.topic.as_str(), payload.as_str(), false);
        self.transport.disconnect();
        result
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Op, RecordingTransport};
    use super::*;
    use proptest::prelude::*;

    const INTERVAL: Duration = Duration::from_secs(1800);

    fn reading() -> Reading {
        Reading {
            temperature_c: 20.0,
            humidity_pct: 45.0,
            raw_gas: 12345,
            voc_index: 120,
            captured_at: CalendarTime::from_unix(1_700_000_000, -7),
        }
    }

    fn scheduler(
        transport: RecordingTransport,
        policy: RetryPolicy,
    ) -> PublishScheduler<RecordingTransport> {
        PublishScheduler::new(transport, "1234567", policy).unwrap()
    }

    fn secs(s: u64) -> MonotonicInstant {
        MonotonicInstant::from_secs(s)
    }

    #[test]
    fn test_not_due_does_no_io() {
        let mut scheduler = scheduler(RecordingTransport::default(), RetryPolicy::NONE);
        let mut schedule = PublishSchedule::new(INTERVAL, secs(0));

        let outcome = scheduler.maybe_publish(&mut schedule, &reading(), secs(1799));
        assert_eq!(outcome, Ok(PublishOutcome::NotDue));
        assert!(scheduler.transport().ops.is_empty());
    }

    #[test]
    fn test_publish_sequence() {
        let mut scheduler = scheduler(RecordingTransport::default(), RetryPolicy::NONE);
        let mut schedule = PublishSchedule::new(INTERVAL, secs(0));

        let outcome = scheduler.maybe_publish(&mut schedule, &reading(), secs(1800));
        assert_eq!(
            outcome,
            Ok(PublishOutcome::Published {
                next_due: secs(3600),
                delivery: Delivery::Delivered
            })
        );

        let ops = &scheduler.transport().ops;
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0], Op::Connect { clean_session: true });
        match &ops[1] {
            Op::Publish { topic, payload, retain } => {
                assert_eq!(topic.as_str(), "channels/1234567/publish");
                assert_eq!(
                    payload.as_str(),
                    "field1=68.0&field2=45.0&field3=12345&field4=120&status=Good (120)"
                );
                assert!(!retain);
            }
            other => panic!("unexpected op {:?}", other),
        }
        assert_eq!(ops[2], Op::Disconnect);
    }

    #[test]
    fn test_late_call_rearms_from_now() {
        let mut scheduler = scheduler(RecordingTransport::default(), RetryPolicy::NONE);
        let mut schedule = PublishSchedule::new(INTERVAL, secs(0));

        scheduler
            .maybe_publish(&mut schedule, &reading(), secs(2000))
            .unwrap();
        assert_eq!(schedule.next_due(), secs(3800));
    }

    #[test]
    fn test_timestamp_only_when_synced() {
        let mut scheduler =
            scheduler(RecordingTransport::default(), RetryPolicy::NONE).with_timestamp(true);
        let mut schedule = PublishSchedule::new(INTERVAL, secs(0));

        scheduler
            .maybe_publish_at(&mut schedule, &reading(), secs(1800), false)
            .unwrap();
        assert!(scheduler.transport().last_payload().unwrap().ends_with("(120)"));

        scheduler
            .maybe_publish_at(&mut schedule, &reading(), secs(3600), true)
            .unwrap();
        assert!(scheduler
            .transport()
            .last_payload()
            .unwrap()
            .ends_with("(120) @ Tue, Nov 14, 2023 at 15:13"));
    }

    #[test]
    fn test_connect_failure_skips_publish() {
        let transport = RecordingTransport {
            connect_result: Err(PublishError::Connect),
            ..Default::default()
        };
        let mut scheduler = scheduler(transport, RetryPolicy::NONE);
        let mut schedule = PublishSchedule::new(INTERVAL, secs(0));

        assert_eq!(
            scheduler.maybe_publish(&mut schedule, &reading(), secs(1800)),
            Err(PublishError::Connect)
        );
        assert_eq!(scheduler.transport().published(), 0);
        // No retries configured: lossy re-arm
        assert_eq!(schedule.next_due(), secs(3600));
    }

    #[test]
    fn test_bounded_retry() {
        let transport = RecordingTransport {
            publish_result: Err(PublishError::Publish),
            ..Default::default()
        };
        let policy = RetryPolicy {
            max_retries: 2,
            retry_delay: Duration::from_secs(5),
        };
        let mut scheduler = scheduler(transport, policy);
        let mut schedule = PublishSchedule::new(INTERVAL, secs(0));

        let r = reading();
        assert!(scheduler.maybe_publish(&mut schedule, &r, secs(1800)).is_err());
        assert_eq!((schedule.next_due(), schedule.retries_used()), (secs(1805), 1));

        assert!(scheduler.maybe_publish(&mut schedule, &r, secs(1805)).is_err());
        assert_eq!((schedule.next_due(), schedule.retries_used()), (secs(1810), 2));

        assert!(scheduler.maybe_publish(&mut schedule, &r, secs(1810)).is_err());
        assert_eq!((schedule.next_due(), schedule.retries_used()), (secs(3610), 0));

        // Publish failed, but disconnect still ran each time
        let disconnects = scheduler
            .transport()
            .ops
            .iter()
            .filter(|op| **op == Op::Disconnect)
            .count();
        assert_eq!(disconnects, 3);
    }

    #[test]
    fn test_retry_then_success_resets_counter() {
        let transport = RecordingTransport {
            publish_result: Err(PublishError::Publish),
            ..Default::default()
        };
        let policy = RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
        };
        let mut scheduler = scheduler(transport, policy);
        let mut schedule = PublishSchedule::new(INTERVAL, secs(0));

        let _ = scheduler.maybe_publish(&mut schedule, &reading(), secs(1800));
        scheduler.transport_mut().publish_result = Ok(Delivery::Delivered);
        scheduler
            .maybe_publish(&mut schedule, &reading(), secs(1805))
            .unwrap();

        assert_eq!(schedule.retries_used(), 0);
        assert_eq!(schedule.next_due(), secs(3605));
    }

    #[test]
    fn test_queued_delivery_failure_is_bounded() {
        let transport = RecordingTransport {
            publish_result: Ok(Delivery::Queued),
            ..Default::default()
        };
        let policy = RetryPolicy {
            max_retries: 1,
            retry_delay: Duration::from_secs(5),
        };
        let mut scheduler = scheduler(transport, policy);
        let mut schedule = PublishSchedule::new(INTERVAL, secs(0));

        scheduler
            .maybe_publish(&mut schedule, &reading(), secs(1800))
            .unwrap();
        scheduler.record_delivery_failure(&mut schedule, secs(1801));
        assert_eq!((schedule.next_due(), schedule.retries_used()), (secs(1806), 1));

        scheduler
            .maybe_publish(&mut schedule, &reading(), secs(1806))
            .unwrap();
        assert_eq!(schedule.retries_used(), 1);
        scheduler.record_delivery_failure(&mut schedule, secs(1807));
        assert_eq!((schedule.next_due(), schedule.retries_used()), (secs(3607), 0));
    }

    #[test]
    fn test_queued_delivery_success() {
        let transport = RecordingTransport {
            publish_result: Ok(Delivery::Queued),
            ..Default::default()
        };
        let policy = RetryPolicy {
            max_retries: 1,
            retry_delay: Duration::from_secs(5),
        };
        let mut scheduler = scheduler(transport, policy);
        let mut schedule = PublishSchedule::new(INTERVAL, secs(0));

        scheduler
            .maybe_publish(&mut schedule, &reading(), secs(1800))
            .unwrap();
        scheduler.record_delivery_failure(&mut schedule, secs(1801));
        scheduler
            .maybe_publish(&mut schedule, &reading(), secs(1806))
            .unwrap();
        scheduler.record_delivery_success(&mut schedule);
        assert_eq!(schedule.retries_used(), 0);
        assert_eq!(schedule.next_due(), secs(3606));
    }

    proptest! {
        #[test]
        fn prop_fires_at_most_once_per_interval(
            interval_s in 1u64..120,
            steps in proptest::collection::vec(1u64..5_000, 1..200),
        ) {
            let interval = Duration::from_secs(interval_s);
            let mut scheduler = scheduler(RecordingTransport::default(), RetryPolicy::NONE);
            let mut schedule = PublishSchedule::new(interval, MonotonicInstant::ZERO);

            let mut now = MonotonicInstant::ZERO;
            let mut last_fire: Option<MonotonicInstant> = None;
            for step in steps {
                now = now + Duration::from_millis(step);
                let due_before = schedule.next_due();
                let outcome = scheduler.maybe_publish(&mut schedule, &reading(), now).unwrap();

                match outcome {
                    PublishOutcome::Published { next_due, .. } => {
                        prop_assert!(now >= due_before);
                        prop_assert_eq!(next_due, now + interval);
                        if let Some(prev) = last_fire {
                            prop_assert!(now - prev >= interval);
                        }
                        last_fire = Some(now);
                    }
                    PublishOutcome::NotDue => prop_assert!(now < due_before),
                }
            }
        }
    }
}
