//! Microsecond timestamps around measured operations.
//!
//! Timestamps are `u64` microseconds from an arbitrary origin. Hardware cycle
//! counters are usually 32 bits wide; [`ExtendedCounter`] widens them to 64
//! bits, which stays correct as long as the counter is read at least once per
//! wrap period (about 21 s for a 200 MHz core clock). A harness run reads it
//! several times per millisecond.

/// Non-decreasing microsecond clock.
pub trait MonotonicClock {
    fn now_us(&mut self) -> u64;
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for &mut C {
    fn now_us(&mut self) -> u64 {
        (**self).now_us()
    }
}

/// One term's measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSample {
    pub term_name: &'static str,
    pub start_us: u64,
    pub end_us: u64,
    pub elapsed_us: u64,
}

/// Span from the first window opening to the last one closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineTiming {
    pub start_us: u64,
    pub end_us: u64,
    pub elapsed_us: u64,
}

impl PipelineTiming {
    pub fn spanning(first: &TimingSample, last: &TimingSample) -> Self {
        Self {
            start_us: first.start_us,
            end_us: last.end_us,
            elapsed_us: last.end_us.saturating_sub(first.start_us),
        }
    }
}

pub struct TimingRecorder<C> {
    clock: C,
}

impl<C: MonotonicClock> TimingRecorder<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn start(&mut self) -> u64 {
        self.clock.now_us()
    }

    /// Returns `(end, elapsed)`. Elapsed never goes negative.
    pub fn stop(&mut self, start: u64) -> (u64, u64) {
        let end = self.clock.now_us();
        (end, end.saturating_sub(start))
    }

    pub fn sample(&mut self, term_name: &'static str, start: u64) -> TimingSample {
        let (end_us, elapsed_us) = self.stop(start);
        TimingSample {
            term_name,
            start_us: start,
            end_us,
            elapsed_us,
        }
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}

/// Widens a free-running 32-bit counter to 64 bits.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtendedCounter {
    last: u32,
    high: u64,
}

impl ExtendedCounter {
    pub const fn new() -> Self {
        Self { last: 0, high: 0 }
    }

    /// Feed the latest raw reading; a value below the previous one means the
    /// counter wrapped once.
    pub fn extend(&mut self, raw: u32) -> u64 {
        if raw < self.last {
            self.high += 1 << 32;
        }
        self.last = raw;
        self.high | raw as u64
    }
}

/// Deterministic clock that advances a fixed step per reading.
///
/// Makes host reports byte-for-byte reproducible.
#[derive(Debug, Clone, Copy)]
pub struct StepClock {
    now: u64,
    step: u64,
}

impl StepClock {
    pub fn new(step_us: u64) -> Self {
        Self { now: 0, step: step_us }
    }
}

impl MonotonicClock for StepClock {
    fn now_us(&mut self) -> u64 {
        let now = self.now;
        self.now += self.step;
        now
    }
}

#[cfg(feature = "std")]
pub use self::host::StdClock;

#[cfg(feature = "std")]
mod host {
    use std::time::Instant;

    /// Host clock backed by [`Instant`].
    #[derive(Debug, Clone, Copy)]
    pub struct StdClock {
        origin: Instant,
    }

    impl StdClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
            }
        }
    }

    impl Default for StdClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl super::MonotonicClock for StdClock {
        fn now_us(&mut self) -> u64 {
            self.origin.elapsed().as_micros() as u64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_counter_handles_wrap() {
        let mut counter = ExtendedCounter::new();
        assert_eq!(counter.extend(10), 10);
        assert_eq!(counter.extend(u32::MAX - 5), (u32::MAX - 5) as u64);
        assert_eq!(counter.extend(4), (1u64 << 32) + 4);
        assert_eq!(counter.extend(4), (1u64 << 32) + 4);
        assert_eq!(counter.extend(3), (2u64 << 32) + 3);
    }

    #[test]
    fn test_recorder_elapsed() {
        let mut recorder = TimingRecorder::new(StepClock::new(7));
        let start = recorder.start();
        let sample = recorder.sample("s", start);
        assert_eq!(sample.start_us, 0);
        assert_eq!(sample.end_us, 7);
        assert_eq!(sample.elapsed_us, 7);
    }

    #[test]
    fn test_stop_saturates() {
        let mut recorder = TimingRecorder::new(StepClock::new(1));
        assert_eq!(recorder.stop(100), (0, 0));
    }

    #[test]
    fn test_pipeline_timing_spans_first_to_last() {
        let first = TimingSample {
            term_name: "s",
            start_us: 10,
            end_us: 20,
            elapsed_us: 10,
        };
        let last = TimingSample {
            term_name: "e2",
            start_us: 50,
            end_us: 65,
            elapsed_us: 15,
        };
        let total = PipelineTiming::spanning(&first, &last);
        assert_eq!(total.elapsed_us, 55);
    }
}
