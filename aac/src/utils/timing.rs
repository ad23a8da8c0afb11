//! Presentation timing for parsed frames.
//!
//! Each frame advances the clock by its own duration, rounded to the nearest
//! nanosecond. The rounding of every frame is carried into the next
//! timestamp, so a long stream may drift from the exact sample position by up
//! to half a nanosecond per frame.

use log::trace;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameClock {
    pts_ns: u64,
    sampling_frequency: u32,
}

impl FrameClock {
    /// Presentation timestamp of the next frame, in nanoseconds.
    pub fn pts_ns(&self) -> u64 {
        self.pts_ns
    }

    /// Duration of one frame of `frame_length` samples, rounded to the
    /// nearest nanosecond.
    pub fn frame_duration_ns(frame_length: u32, sampling_frequency: u32) -> u64 {
        if sampling_frequency == 0 {
            return 0;
        }

        let rate = sampling_frequency as u128;
        ((frame_length as u128 * NANOS_PER_SECOND + rate / 2) / rate) as u64
    }

    /// Advances the clock by `frames` frames of `frame_length` samples.
    ///
    /// An unknown (zero) frequency leaves the clock unchanged.
    pub fn advance(&mut self, frame_length: u32, frames: u32, sampling_frequency: u32) {
        if sampling_frequency == 0 {
            return;
        }

        if sampling_frequency != self.sampling_frequency {
            if self.sampling_frequency != 0 {
                trace!(
                    "Sampling frequency changed at {} ns: {} Hz -> {} Hz",
                    self.pts_ns, self.sampling_frequency, sampling_frequency
                );
            }
            self.sampling_frequency = sampling_frequency;
        }

        self.pts_ns += Self::frame_duration_ns(frame_length, sampling_frequency) * frames as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_nearest_nanosecond() {
        // 1024 / 44100 s = 23219954.648... ns
        assert_eq!(FrameClock::frame_duration_ns(1024, 44_100), 23_219_955);
        assert_eq!(FrameClock::frame_duration_ns(1024, 48_000), 21_333_333);
        assert_eq!(FrameClock::frame_duration_ns(960, 48_000), 20_000_000);
    }

    #[test]
    fn accumulates_rounded_frame_durations() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.pts_ns(), 0);

        let mut previous = 0;
        for _ in 0..44_100 {
            clock.advance(1024, 1, 44_100);
            assert!(clock.pts_ns() > previous);
            previous = clock.pts_ns();
        }

        // 44100 rounded durations of 23219955 ns, not the exact 1024 s
        assert_eq!(clock.pts_ns(), 1_024_000_015_500);
    }

    #[test]
    fn third_frame_carries_rounding_of_the_first_two() {
        let mut clock = FrameClock::default();
        let pts: Vec<u64> = (0..3)
            .map(|_| {
                let pts = clock.pts_ns();
                clock.advance(1024, 1, 44_100);
                pts
            })
            .collect();
        assert_eq!(pts, [0, 23_219_955, 46_439_910]);

        let mut clock = FrameClock::default();
        clock.advance(1024, 2, 44_100);
        assert_eq!(clock.pts_ns(), 46_439_910);
    }

    #[test]
    fn follows_rate_change() {
        let mut clock = FrameClock::default();
        clock.advance(960, 1, 48_000);
        assert_eq!(clock.pts_ns(), 20_000_000);

        clock.advance(1024, 2, 32_000);
        assert_eq!(clock.pts_ns(), 20_000_000 + 64_000_000);

        clock.advance(1024, 1, 0);
        assert_eq!(clock.pts_ns(), 84_000_000);
    }
}
