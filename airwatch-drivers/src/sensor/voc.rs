//! VOC index estimator
//!
//! Turns the SGP40 raw signal into a 1-500 index where 100 is the
//! learned average of the environment. More VOCs lower the raw signal,
//! so readings below the learned mean score above 100.
//!
//! The mean and mean absolute deviation are learned with an adaptive
//! moving average: an exact running average at first, then an
//! exponential average with a twelve hour time constant. The first
//! [`BLACKOUT_SAMPLES`] samples report 0 while the sensor settles.

/// Samples reported as 0 after start-up
pub const BLACKOUT_SAMPLES: u32 = 45;

const BASELINE_INDEX: f32 = 100.0;
const MIN_INDEX: f32 = 1.0;
const MAX_INDEX: f32 = 500.0;

const LEARNING_TIME_S: f32 = 12.0 * 3600.0;

/// Deviation floor in raw ticks, keeps a quiet room from amplifying noise
const MIN_DEVIATION: f32 = 50.0;

/// Deviations at which the index is halfway to its bound
const RESPONSE_SHAPE: f32 = 3.0;

/// Learned VOC baseline
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VocIndex {
    samples: u32,
    mean: f32,
    deviation: f32,
    tau_samples: f32,
}

impl VocIndex {
    /// Estimator for a given sampling interval in seconds
    pub fn new(sampling_interval_s: f32) -> Self {
        let interval = if sampling_interval_s > 0.0 {
            sampling_interval_s
        } else {
            1.0
        };
        Self {
            samples: 0,
            mean: 0.0,
            deviation: MIN_DEVIATION,
            tau_samples: LEARNING_TIME_S / interval,
        }
    }

    /// Feed one raw sample and get the index for it
    ///
    /// Returns 0 during the start-up blackout, 1..=500 afterwards.
    pub fn process(&mut self, raw: u16) -> u16 {
        let raw = f32::from(raw);
        self.samples = self.samples.saturating_add(1);
        if self.samples == 1 {
            self.mean = raw;
        }

        // Score against what was learned before this sample
        let delta = raw - self.mean;
        let z = -delta / self.deviation;

        let alpha = (1.0 / self.samples as f32).max(1.0 / self.tau_samples);
        self.mean += alpha * delta;
        self.deviation += alpha * (abs(delta) - self.deviation);
        if self.deviation < MIN_DEVIATION {
            self.deviation = MIN_DEVIATION;
        }

        if self.samples <= BLACKOUT_SAMPLES {
            return 0;
        }
        scale(z)
    }

    /// Samples seen since start-up
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Learned mean raw signal
    pub fn mean(&self) -> f32 {
        self.mean
    }

    pub fn in_blackout(&self) -> bool {
        self.samples <= BLACKOUT_SAMPLES
    }
}

fn abs(x: f32) -> f32 {
    if x < 0.0 {
        -x
    } else {
        x
    }
}

/// Map a normalized deviation onto 1..=500, 0 mapping to 100
fn scale(z: f32) -> u16 {
    let index = if z >= 0.0 {
        BASELINE_INDEX + (MAX_INDEX - BASELINE_INDEX) * z / (z + RESPONSE_SHAPE)
    } else {
        let a = -z;
        BASELINE_INDEX - (BASELINE_INDEX - MIN_INDEX) * a / (a + RESPONSE_SHAPE)
    };
    let index = index.clamp(MIN_INDEX, MAX_INDEX);
    (index + 0.5) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn settled(raw: u16) -> VocIndex {
        let mut voc = VocIndex::new(1.0);
        for _ in 0..200 {
            voc.process(raw);
        }
        voc
    }

    #[test]
    fn test_blackout() {
        let mut voc = VocIndex::new(1.0);
        for _ in 0..BLACKOUT_SAMPLES {
            assert_eq!(voc.process(30_000), 0);
        }
        assert!(voc.in_blackout());
        assert_eq!(voc.process(30_000), 100);
    }

    #[test]
    fn test_steady_air_is_baseline() {
        let mut voc = settled(30_000);
        assert_eq!(voc.mean(), 30_000.0);
        assert_eq!(voc.process(30_000), 100);
    }

    #[test]
    fn test_voc_event_raises_index() {
        let mut voc = settled(30_000);
        let index = voc.process(29_000);
        assert!(index > 400, "index {}", index);
    }

    #[test]
    fn test_cleaner_air_lowers_index() {
        let mut voc = settled(30_000);
        let index = voc.process(31_000);
        assert!(index < 20 && index >= 1, "index {}", index);
    }

    #[test]
    fn test_scale_bounds() {
        assert_eq!(scale(0.0), 100);
        assert_eq!(scale(3.0), 300);
        assert_eq!(scale(-3.0), 51);
        assert!(scale(1.0e6) <= 500);
        assert!(scale(-1.0e6) >= 1);
    }

    proptest! {
        #[test]
        fn prop_index_in_range(raws in proptest::collection::vec(any::<u16>(), 1..300)) {
            let mut voc = VocIndex::new(1.0);
            for (i, raw) in raws.into_iter().enumerate() {
                let index = voc.process(raw);
                if (i as u32) < BLACKOUT_SAMPLES {
                    prop_assert_eq!(index, 0);
                } else {
                    prop_assert!((1..=500).contains(&index));
                }
            }
        }
    }
}
