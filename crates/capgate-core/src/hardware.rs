//! Hardware capability traits
//!
//! The registry never touches pins or buses directly. Each descriptor carries
//! the capability it needs, so handlers can be exercised with fake hardware.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Hardware pin identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinId(pub u32);

impl std::fmt::Display for PinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Digital output level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn as_u8(self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }
}

/// A controllable output line (relay, LED, PWM channel, ...)
///
/// Implementations own any timing-sensitive or blocking hardware access.
pub trait Actuator: Send + Sync {
    /// Put the underlying line into output mode
    fn configure_output(&self);

    /// Drive the line to a digital level
    fn set_digital(&self, level: Level);

    /// Write an analog/PWM value to the line
    fn set_analog(&self, value: i32);
}

/// A readable sensor
///
/// `read` is called synchronously on every request; a slow implementation
/// stalls the whole request loop.
pub trait Sensor: Send + Sync {
    fn read(&self) -> f32;
}

impl<F> Sensor for F
where
    F: Fn() -> f32 + Send + Sync,
{
    fn read(&self) -> f32 {
        self()
    }
}

/// A single write observed on a [`RecordingActuator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinWrite {
    Digital(Level),
    Analog(i32),
}

#[derive(Debug, Default)]
struct Recorded {
    configured: bool,
    writes: Vec<PinWrite>,
}

/// Actuator that remembers every write, for simulation and tests
#[derive(Debug, Default)]
pub struct RecordingActuator {
    inner: Mutex<Recorded>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `configure_output` has been called
    pub fn is_configured(&self) -> bool {
        self.lock().configured
    }

    /// All writes in the order they happened
    pub fn writes(&self) -> Vec<PinWrite> {
        self.lock().writes.clone()
    }

    /// Most recent digital level, if any digital write happened
    pub fn level(&self) -> Option<Level> {
        self.lock().writes.iter().rev().find_map(|w| match w {
            PinWrite::Digital(level) => Some(*level),
            PinWrite::Analog(_) => None,
        })
    }

    /// Most recent analog value, if any analog write happened
    pub fn analog(&self) -> Option<i32> {
        self.lock().writes.iter().rev().find_map(|w| match w {
            PinWrite::Analog(value) => Some(*value),
            PinWrite::Digital(_) => None,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        // A poisoned log is still a valid log
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Actuator for RecordingActuator {
    fn configure_output(&self) {
        self.lock().configured = true;
    }

    fn set_digital(&self, level: Level) {
        self.lock().writes.push(PinWrite::Digital(level));
    }

    fn set_analog(&self, value: i32) {
        self.lock().writes.push(PinWrite::Analog(value));
    }
}
