//! Transition times and transaction identifiers.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use crate::core::AccessError;

/// Resolution of the transition step count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResolution {
    /// 100 milliseconds.
    HundredsOfMilliseconds,
    /// 1 second.
    Seconds,
    /// 10 seconds.
    TensOfSeconds,
    /// 10 minutes.
    TensOfMinutes,
}

impl StepResolution {
    fn step(self) -> Duration {
        match self {
            StepResolution::HundredsOfMilliseconds => Duration::from_millis(100),
            StepResolution::Seconds => Duration::from_secs(1),
            StepResolution::TensOfSeconds => Duration::from_secs(10),
            StepResolution::TensOfMinutes => Duration::from_secs(600),
        }
    }
}

/// A transition time: 6-bit step count and 2-bit resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTime {
    steps: u8,
    resolution: StepResolution,
}

impl TransitionTime {
    /// Step count meaning "unknown".
    pub const UNKNOWN_STEPS: u8 = 0x3F;

    /// Immediate transition.
    pub const IMMEDIATE: Self = Self {
        steps: 0,
        resolution: StepResolution::HundredsOfMilliseconds,
    };

    /// A transition of `steps` (at most 62) in `resolution` units.
    pub fn new(steps: u8, resolution: StepResolution) -> Option<Self> {
        (steps < Self::UNKNOWN_STEPS).then_some(Self { steps, resolution })
    }

    /// Closest representable transition not shorter than `duration`,
    /// saturating at the longest one.
    pub fn from_duration(duration: Duration) -> Self {
        let max = u128::from(Self::UNKNOWN_STEPS - 1);
        for resolution in [
            StepResolution::HundredsOfMilliseconds,
            StepResolution::Seconds,
            StepResolution::TensOfSeconds,
            StepResolution::TensOfMinutes,
        ] {
            let step = resolution.step().as_millis();
            let steps = duration.as_millis().div_ceil(step);
            if steps <= max {
                return Self {
                    steps: steps as u8,
                    resolution,
                };
            }
        }
        Self {
            steps: Self::UNKNOWN_STEPS - 1,
            resolution: StepResolution::TensOfMinutes,
        }
    }

    /// Number of steps.
    pub fn steps(&self) -> u8 {
        self.steps
    }

    /// Step resolution.
    pub fn resolution(&self) -> StepResolution {
        self.resolution
    }

    /// Total duration, `None` when unknown.
    pub fn duration(&self) -> Option<Duration> {
        if self.steps == Self::UNKNOWN_STEPS {
            return None;
        }
        Some(self.resolution.step() * u32::from(self.steps))
    }

    /// Wire byte.
    pub fn to_byte(self) -> u8 {
        let resolution = match self.resolution {
            StepResolution::HundredsOfMilliseconds => 0b00,
            StepResolution::Seconds => 0b01,
            StepResolution::TensOfSeconds => 0b10,
            StepResolution::TensOfMinutes => 0b11,
        };
        (resolution << 6) | (self.steps & 0x3F)
    }

    /// Parse the wire byte; the unknown step count is kept.
    pub fn from_byte(byte: u8) -> Self {
        let resolution = match byte >> 6 {
            0b00 => StepResolution::HundredsOfMilliseconds,
            0b01 => StepResolution::Seconds,
            0b10 => StepResolution::TensOfSeconds,
            _ => StepResolution::TensOfMinutes,
        };
        Self {
            steps: byte & 0x3F,
            resolution,
        }
    }
}

/// Optional transition time with a delay (in 5 ms steps) before it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Transition duration.
    pub time: TransitionTime,
    /// Delay before starting, in 5 ms steps.
    pub delay: u8,
}

impl Transition {
    /// Delay as a duration.
    pub fn delay_duration(&self) -> Duration {
        Duration::from_millis(5 * u64::from(self.delay))
    }

    pub(crate) fn encode(transition: Option<Transition>, out: &mut Vec<u8>) {
        if let Some(t) = transition {
            out.push(t.time.to_byte());
            out.push(t.delay);
        }
    }

    /// Decode a trailing transition pair. `rest` is either empty or two bytes.
    pub(crate) fn decode(opcode: u32, rest: &[u8]) -> Result<Option<Transition>, AccessError> {
        match *rest {
            [] => Ok(None),
            [time, delay] => {
                let time = TransitionTime::from_byte(time);
                if time.steps == TransitionTime::UNKNOWN_STEPS {
                    return Err(AccessError::InvalidValue {
                        opcode,
                        field: "transitionTime",
                    });
                }
                Ok(Some(Transition { time, delay }))
            }
            _ => Err(AccessError::InvalidLength {
                opcode,
                length: rest.len(),
            }),
        }
    }
}

/// Hands out transaction identifiers for transactional messages.
///
/// Use one counter per source; call [`TidCounter::next`] once per logical
/// action and reuse that value when retrying the same action.
#[derive(Debug, Default)]
pub struct TidCounter(AtomicU8);

impl TidCounter {
    /// Counter starting at `initial`.
    pub fn new(initial: u8) -> Self {
        Self(AtomicU8::new(initial))
    }

    /// Next tid, wrapping after 255.
    pub fn next(&self) -> u8 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}
