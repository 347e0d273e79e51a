//! Description and instance builders shared by the integration tests

use super::bodies::register_fixture_bodies;
use accessor_core::config::RuntimeConfig;
use accessor_core::description::{
    AccessorDescription, Configuration, Direction, ParameterDeclaration, PortAttribute,
    PortDeclaration, PortType,
};
use accessor_core::error::InstantiationError;
use accessor_core::registry::BodyCatalog;
use accessor_core::runtime::{AccessorInstance, Instantiator};
use serde_json::json;
use std::sync::Arc;

pub fn fixture_catalog() -> Arc<BodyCatalog> {
    let catalog = Arc::new(BodyCatalog::new());
    register_fixture_bodies(&catalog);
    catalog
}

pub fn instantiator() -> Instantiator {
    Instantiator::new(fixture_catalog(), RuntimeConfig::default())
}

pub fn instantiator_with(config: RuntimeConfig) -> Instantiator {
    Instantiator::new(fixture_catalog(), config)
}

pub async fn instantiate(description: AccessorDescription) -> Arc<AccessorInstance> {
    instantiate_with(description, Configuration::new()).await
}

pub async fn instantiate_with(
    description: AccessorDescription,
    configuration: Configuration,
) -> Arc<AccessorInstance> {
    try_instantiate(description, configuration)
        .await
        .expect("instantiation should succeed")
}

pub async fn try_instantiate(
    description: AccessorDescription,
    configuration: Configuration,
) -> Result<Arc<AccessorInstance>, InstantiationError> {
    instantiator().instantiate(description, configuration).await
}

/// One output port `Temperature` (readable, periodic events)
pub fn thermometer_description(code: &str) -> AccessorDescription {
    AccessorDescription::new("Thermometer", code).with_port(
        PortDeclaration::output("Temperature")
            .with_type(PortType::Numeric)
            .with_attribute(PortAttribute::Event)
            .with_attribute(PortAttribute::EventPeriodic),
    )
}

/// One input port `Power` (writable)
pub fn power_description(code: &str) -> AccessorDescription {
    AccessorDescription::new("Power Switch", code)
        .with_port(PortDeclaration::input("Power").with_type(PortType::Bool))
}

/// Two inputs `A`, `B` and an output `Sum`
pub fn adder_description(code: &str) -> AccessorDescription {
    AccessorDescription::new("Adder", code)
        .with_port(PortDeclaration::input("A").with_type(PortType::Numeric))
        .with_port(PortDeclaration::input("B").with_type(PortType::Numeric))
        .with_port(PortDeclaration::output("Sum").with_type(PortType::Numeric))
}

/// Projector with a required device URL and an optional input source
pub fn projector_description(code: &str) -> AccessorDescription {
    AccessorDescription::new("Projector", code)
        .with_port(PortDeclaration::input("Power").with_type(PortType::Bool))
        .with_port(
            PortDeclaration::new("Input", &[Direction::Input, Direction::Output])
                .with_attribute(PortAttribute::Read)
                .with_attribute(PortAttribute::Write)
                .with_type(PortType::Select)
                .with_options(["HDMI", "VGA"]),
        )
        .with_parameter(ParameterDeclaration::required("device_url"))
        .with_parameter(ParameterDeclaration::optional("default_input", json!("HDMI")))
}
