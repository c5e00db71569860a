//! Device descriptors consumed by the capability registry

use std::fmt;
use std::sync::Arc;

use crate::hardware::{Actuator, PinId, Sensor};

/// Describes one controllable actuator
///
/// `min`/`max` are advertised in the manifest only; `set-value` writes are
/// not clamped to them.
#[derive(Clone)]
pub struct OutputDescriptor {
    pub pin: PinId,
    pub min: i32,
    pub max: i32,
    pub is_binary: bool,
    pub name: String,
    pub description: String,
    pub actuator: Arc<dyn Actuator>,
}

impl OutputDescriptor {
    /// On/off output (no `set-value` route)
    pub fn binary(
        pin: PinId,
        name: impl Into<String>,
        description: impl Into<String>,
        actuator: Arc<dyn Actuator>,
    ) -> Self {
        Self {
            pin,
            min: 0,
            max: 1,
            is_binary: true,
            name: name.into(),
            description: description.into(),
            actuator,
        }
    }

    /// Output with a settable analog range
    pub fn analog(
        pin: PinId,
        min: i32,
        max: i32,
        name: impl Into<String>,
        description: impl Into<String>,
        actuator: Arc<dyn Actuator>,
    ) -> Self {
        Self {
            pin,
            min,
            max,
            is_binary: false,
            name: name.into(),
            description: description.into(),
            actuator,
        }
    }
}

impl fmt::Debug for OutputDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputDescriptor")
            .field("pin", &self.pin)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("is_binary", &self.is_binary)
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Describes one readable sensor
#[derive(Clone)]
pub struct SensorDescriptor {
    pub name: String,
    pub description: String,
    pub sensor: Arc<dyn Sensor>,
}

impl SensorDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        sensor: Arc<dyn Sensor>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            sensor,
        }
    }
}

impl fmt::Debug for SensorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
