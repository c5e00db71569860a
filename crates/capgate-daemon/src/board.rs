//! Simulated board hardware
//!
//! Stands in for GPIO/PWM lines and sensor buses when the daemon runs on a
//! host without them. Pins keep their state and log every write; sensors are
//! built from the `[[sensor]]` source tables.

use capgate_core::{
    Actuator, CapabilityRegistry, Gateway, Level, ManifestError, OutputDescriptor, PinId, Sensor,
    SensorDescriptor,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};

use crate::config::{Config, SensorSource};

/// A simulated output line
#[derive(Debug)]
pub struct SimulatedPin {
    pin: PinId,
    configured: AtomicBool,
    level: AtomicBool,
    analog: AtomicI32,
}

impl SimulatedPin {
    pub fn new(pin: PinId) -> Self {
        Self {
            pin,
            configured: AtomicBool::new(false),
            level: AtomicBool::new(false),
            analog: AtomicI32::new(0),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }

    pub fn level(&self) -> Level {
        if self.level.load(Ordering::SeqCst) {
            Level::High
        } else {
            Level::Low
        }
    }

    pub fn analog(&self) -> i32 {
        self.analog.load(Ordering::SeqCst)
    }
}

impl Actuator for SimulatedPin {
    fn configure_output(&self) {
        self.configured.store(true, Ordering::SeqCst);
        info!(pin = %self.pin, "Pin configured as output");
    }

    fn set_digital(&self, level: Level) {
        if !self.is_configured() {
            warn!(pin = %self.pin, "Digital write to unconfigured pin");
        }
        let previous = self.level();
        self.level.store(level == Level::High, Ordering::SeqCst);
        info!(pin = %self.pin, from = previous.as_u8(), to = level.as_u8(), "digitalWrite");
    }

    fn set_analog(&self, value: i32) {
        let previous = self.analog();
        self.analog.store(value, Ordering::SeqCst);
        info!(pin = %self.pin, from = previous, to = value, "analogWrite");
    }
}

/// Fixed reading
pub struct ConstantSensor(pub f32);

impl Sensor for ConstantSensor {
    fn read(&self) -> f32 {
        self.0
    }
}

/// Advances by `step` on every read
pub struct CounterSensor {
    next: Mutex<f32>,
    step: f32,
}

impl CounterSensor {
    pub fn new(start: f32, step: f32) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }
}

impl Sensor for CounterSensor {
    fn read(&self) -> f32 {
        let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
        let value = *next;
        *next += self.step;
        value
    }
}

/// Sine wave over time since construction
pub struct SineSensor {
    started: Instant,
    amplitude: f32,
    offset: f32,
    period_secs: f32,
}

impl SineSensor {
    pub fn new(amplitude: f32, offset: f32, period_secs: f32) -> Self {
        Self {
            started: Instant::now(),
            amplitude,
            offset,
            period_secs,
        }
    }

    fn at(&self, elapsed_secs: f32) -> f32 {
        let phase = std::f32::consts::TAU * elapsed_secs / self.period_secs;
        self.offset + self.amplitude * phase.sin()
    }
}

impl Sensor for SineSensor {
    fn read(&self) -> f32 {
        self.at(self.started.elapsed().as_secs_f32())
    }
}

/// Reads a numeric text file on every call
///
/// The read is blocking and happens on the request path. I/O or parse
/// failures are reported as NaN.
pub struct FileSensor {
    path: PathBuf,
    scale: f32,
}

impl FileSensor {
    pub fn new(path: PathBuf, scale: f32) -> Self {
        Self { path, scale }
    }
}

impl Sensor for FileSensor {
    fn read(&self) -> f32 {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Sensor file read failed");
                return f32::NAN;
            }
        };
        match content.trim().parse::<f32>() {
            Ok(raw) => raw * self.scale,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Sensor file is not numeric");
                f32::NAN
            }
        }
    }
}

/// Build the sensor capability for a configured source
pub fn sensor_for(source: &SensorSource) -> Arc<dyn Sensor> {
    match source {
        SensorSource::Constant { value } => Arc::new(ConstantSensor(*value)),
        SensorSource::Counter { start, step } => Arc::new(CounterSensor::new(*start, *step)),
        SensorSource::Sine {
            amplitude,
            offset,
            period_secs,
        } => Arc::new(SineSensor::new(*amplitude, *offset, *period_secs)),
        SensorSource::File { path, scale } => Arc::new(FileSensor::new(path.clone(), *scale)),
    }
}

/// Turn the `[[output]]` and `[[sensor]]` tables into a populated registry
pub fn registry_from_config(config: &Config) -> CapabilityRegistry {
    let outputs = config.outputs.iter().map(|o| {
        let pin = Arc::new(SimulatedPin::new(o.pin));
        OutputDescriptor {
            pin: o.pin,
            min: o.min,
            max: o.max,
            is_binary: o.binary,
            name: o.name.clone(),
            description: o.description.clone(),
            actuator: pin,
        }
    });

    let sensors = config
        .sensors
        .iter()
        .map(|s| SensorDescriptor::new(s.name.clone(), s.description.clone(), sensor_for(&s.source)));

    let mut registry = CapabilityRegistry::new();
    registry.add_outputs(outputs);
    registry.add_sensors(sensors);
    registry
}

/// Registry built with the configured manifest format
pub fn gateway_from_config(config: &Config) -> Result<Gateway, ManifestError> {
    registry_from_config(config).build(config.manifest.format)
}
