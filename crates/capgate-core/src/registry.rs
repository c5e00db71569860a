//! Capability registry
//!
//! Registration is a one-shot setup phase: descriptors are added in order,
//! each one gets a dense zero-based id, and `build` freezes everything into a
//! [`Gateway`]. Handler records live in arenas indexed by id; a route only
//! carries the id of the record it dispatches to.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::descriptor::{OutputDescriptor, SensorDescriptor};
use crate::handler::{parse_int_lenient, Reply, RequestInfo};
use crate::hardware::{Actuator, Level, PinId, Sensor};
use crate::manifest::{
    InputEntry, Manifest, ManifestBuilder, ManifestError, ManifestFormat, OutputEntry,
};

/// Path of the discovery route
pub const MANIFEST_PATH: &str = "/register";

/// Id of a registered output, its position in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputId(pub usize);

impl std::fmt::Display for OutputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id of a registered sensor; numbered independently from outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorId(pub usize);

impl std::fmt::Display for SensorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// HTTP method a route answers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMethod {
    Get,
    Post,
}

/// What a route does when invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    TurnOn(OutputId),
    TurnOff(OutputId),
    SetValue(OutputId),
    ReadSensor(SensorId),
    Manifest,
}

/// A path bound to a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub methods: &'static [RouteMethod],
    pub target: RouteTarget,
}

/// Immutable handler record for one output
struct OutputBinding {
    pin: PinId,
    actuator: Arc<dyn Actuator>,
}

/// Immutable handler record for one sensor
struct SensorBinding {
    name: String,
    sensor: Arc<dyn Sensor>,
}

/// Registration phase: collects descriptors, routes and manifest entries
#[derive(Default)]
pub struct CapabilityRegistry {
    outputs: Vec<OutputBinding>,
    sensors: Vec<SensorBinding>,
    routes: Vec<Route>,
    manifest: ManifestBuilder,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register outputs in order, configuring each pin as an output.
    ///
    /// Every output gets `turn-on` and `turn-off`; non-binary outputs also get
    /// `set-value`. Ids continue from any earlier call.
    pub fn add_outputs(&mut self, descriptors: impl IntoIterator<Item = OutputDescriptor>) {
        for desc in descriptors {
            let id = OutputId(self.outputs.len());

            if desc.min > desc.max {
                warn!(output = %id, min = desc.min, max = desc.max, "Output range is inverted");
            }

            desc.actuator.configure_output();

            let base = format!("/output/{}", id);
            self.routes.push(Route {
                path: format!("{}/turn-on", base),
                methods: &[RouteMethod::Get],
                target: RouteTarget::TurnOn(id),
            });
            self.routes.push(Route {
                path: format!("{}/turn-off", base),
                methods: &[RouteMethod::Get],
                target: RouteTarget::TurnOff(id),
            });
            if !desc.is_binary {
                self.routes.push(Route {
                    path: format!("{}/set-value", base),
                    methods: &[RouteMethod::Post],
                    target: RouteTarget::SetValue(id),
                });
            }

            self.manifest.push_output(OutputEntry {
                name: desc.name.clone(),
                description: desc.description.clone(),
                is_binary: desc.is_binary,
                output_id: id.0,
                min: desc.min,
                max: desc.max,
            });

            info!(
                output = %id,
                pin = %desc.pin,
                name = %desc.name,
                binary = desc.is_binary,
                "Registered output"
            );

            self.outputs.push(OutputBinding {
                pin: desc.pin,
                actuator: desc.actuator,
            });
        }
    }

    /// Register sensors in order, one read route each
    pub fn add_sensors(&mut self, descriptors: impl IntoIterator<Item = SensorDescriptor>) {
        for desc in descriptors {
            let id = SensorId(self.sensors.len());

            self.routes.push(Route {
                path: format!("/sensor/{}", id),
                methods: &[RouteMethod::Get],
                target: RouteTarget::ReadSensor(id),
            });

            self.manifest.push_input(InputEntry {
                name: desc.name.clone(),
                description: desc.description.clone(),
                input_id: id.0,
            });

            info!(sensor = %id, name = %desc.name, "Registered sensor");

            self.sensors.push(SensorBinding {
                name: desc.name,
                sensor: desc.sensor,
            });
        }
    }

    /// Finalize the manifest document and add the discovery route
    pub fn build(mut self, format: ManifestFormat) -> Result<Gateway, ManifestError> {
        self.routes.push(Route {
            path: MANIFEST_PATH.to_string(),
            methods: &[RouteMethod::Get, RouteMethod::Post],
            target: RouteTarget::Manifest,
        });

        let manifest = self.manifest.finish();
        let document = manifest.render(format)?;
        info!(
            outputs = manifest.outputs.len(),
            inputs = manifest.inputs.len(),
            routes = self.routes.len(),
            ?format,
            "Capability registry built"
        );

        Ok(Gateway {
            outputs: self.outputs,
            sensors: self.sensors,
            routes: self.routes,
            manifest,
            document,
            content_type: Manifest::content_type(format),
        })
    }
}

/// Built registry, read-only for the rest of the process lifetime
pub struct Gateway {
    outputs: Vec<OutputBinding>,
    sensors: Vec<SensorBinding>,
    routes: Vec<Route>,
    manifest: Manifest,
    document: String,
    content_type: &'static str,
}

impl Gateway {
    /// All bound routes in registration order, discovery route last
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The discovery document as served at `/register`
    pub fn manifest_document(&self) -> &str {
        &self.document
    }

    /// Run a route target synchronously.
    ///
    /// `body` is the raw request payload, `None` or empty when absent.
    pub fn handle(&self, target: RouteTarget, body: Option<&str>) -> Reply {
        match target {
            RouteTarget::TurnOn(id) => self.write_level(id, Level::High, "turned on\n"),
            RouteTarget::TurnOff(id) => self.write_level(id, Level::Low, "turned off\n"),
            RouteTarget::SetValue(id) => self.set_value(id, body),
            RouteTarget::ReadSensor(id) => self.read_sensor(id),
            RouteTarget::Manifest => {
                Reply::ok(self.document.clone()).with_content_type(self.content_type)
            }
        }
    }

    /// Diagnostic reply for requests that matched no route
    pub fn not_found(&self, request: &RequestInfo) -> Reply {
        debug!(method = %request.method, uri = %request.uri, "No route matched");
        request.not_found()
    }

    fn write_level(&self, id: OutputId, level: Level, message: &str) -> Reply {
        match self.outputs.get(id.0) {
            Some(binding) => {
                debug!(output = %id, pin = %binding.pin, level = level.as_u8(), "Digital write");
                binding.actuator.set_digital(level);
                Reply::ok(message)
            }
            None => self.unbound(id),
        }
    }

    fn set_value(&self, id: OutputId, body: Option<&str>) -> Reply {
        let Some(binding) = self.outputs.get(id.0) else {
            return self.unbound(id);
        };

        let Some(raw) = body.filter(|b| !b.is_empty()) else {
            return Reply::ok("value not received");
        };

        let value = parse_int_lenient(raw);
        info!(output = %id, pin = %binding.pin, value, "Analog write");
        binding.actuator.set_analog(value);
        Reply::ok(format!("value received:\n{}\n", raw))
    }

    fn read_sensor(&self, id: SensorId) -> Reply {
        match self.sensors.get(id.0) {
            Some(binding) => {
                let value = binding.sensor.read();
                debug!(sensor = %id, name = %binding.name, value, "Sensor read");
                Reply::ok(value.to_string())
            }
            None => Reply {
                status: 404,
                content_type: crate::handler::TEXT_PLAIN,
                body: format!("sensor {} is not registered\n", id),
            },
        }
    }

    fn unbound(&self, id: OutputId) -> Reply {
        Reply {
            status: 404,
            content_type: crate::handler::TEXT_PLAIN,
            body: format!("output {} is not registered\n", id),
        }
    }
}
