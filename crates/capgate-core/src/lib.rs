//! Capgate Core - Capability registry for physical actuators and sensors
//!
//! This crate turns a list of device descriptors into a route table and a
//! discovery manifest:
//! - Hardware capabilities (`Actuator`, `Sensor`) injected into descriptors
//! - Descriptors for controllable outputs and readable sensors
//! - Manifest builder producing the `/register` discovery document
//! - Capability registry assigning stable ids and binding routes

pub mod descriptor;
pub mod handler;
pub mod hardware;
pub mod manifest;
pub mod registry;

pub use descriptor::{OutputDescriptor, SensorDescriptor};
pub use handler::{parse_int_lenient, Reply, RequestInfo};
pub use hardware::{Actuator, Level, PinId, PinWrite, RecordingActuator, Sensor};
pub use manifest::{InputEntry, Manifest, ManifestBuilder, ManifestError, ManifestFormat, OutputEntry};
pub use registry::{CapabilityRegistry, Gateway, OutputId, Route, RouteMethod, RouteTarget, SensorId};
