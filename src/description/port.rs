//! Port declarations and their invariants.

use super::DescriptionError;
use crate::constants::attributes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Direction of a port: the caller supplies a value (input) or the accessor does (output)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortAttribute {
    #[serde(rename = "read")]
    Read,
    #[serde(rename = "write")]
    Write,
    /// Generic "produces events" marker
    #[serde(rename = "event")]
    Event,
    #[serde(rename = "eventPeriodic")]
    EventPeriodic,
    #[serde(rename = "eventChange")]
    EventChange,
}

impl PortAttribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortAttribute::Read => attributes::READ,
            PortAttribute::Write => attributes::WRITE,
            PortAttribute::Event => attributes::EVENT,
            PortAttribute::EventPeriodic => attributes::EVENT_PERIODIC,
            PortAttribute::EventChange => attributes::EVENT_CHANGE,
        }
    }

    /// Specific event kinds that require the generic `event` attribute alongside
    pub fn is_event_kind(&self) -> bool {
        matches!(self, PortAttribute::EventPeriodic | PortAttribute::EventChange)
    }
}

/// Value type carried by a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    Bool,
    #[default]
    String,
    Numeric,
    Integer,
    Select,
    Color,
    Object,
}

impl PortType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, PortType::Numeric | PortType::Integer)
    }
}

/// A single declared port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDeclaration {
    pub name: String,

    pub directions: Vec<Direction>,

    #[serde(default)]
    pub attributes: Vec<PortAttribute>,

    #[serde(rename = "type", default)]
    pub port_type: PortType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PortDeclaration {
    pub fn new(name: impl Into<String>, directions: &[Direction]) -> Self {
        Self {
            name: name.into(),
            directions: directions.to_vec(),
            attributes: Vec::new(),
            port_type: PortType::default(),
            options: None,
            min: None,
            max: None,
            default: None,
            description: None,
        }
    }

    /// Writable input-only port
    pub fn input(name: impl Into<String>) -> Self {
        Self::new(name, &[Direction::Input]).with_attribute(PortAttribute::Write)
    }

    /// Readable output-only port
    pub fn output(name: impl Into<String>) -> Self {
        Self::new(name, &[Direction::Output]).with_attribute(PortAttribute::Read)
    }

    pub fn with_attribute(mut self, attribute: PortAttribute) -> Self {
        if !self.attributes.contains(&attribute) {
            self.attributes.push(attribute);
        }
        self
    }

    pub fn with_type(mut self, port_type: PortType) -> Self {
        self.port_type = port_type;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn has_direction(&self, direction: Direction) -> bool {
        self.directions.contains(&direction)
    }

    pub fn has_attribute(&self, attribute: PortAttribute) -> bool {
        self.attributes.contains(&attribute)
    }

    pub fn validate(&self) -> Result<(), DescriptionError> {
        if !is_identifier(&self.name) {
            return Err(DescriptionError::InvalidPortName {
                name: self.name.clone(),
            });
        }

        if self.directions.is_empty() {
            return Err(DescriptionError::NoDirections {
                port: self.name.clone(),
            });
        }

        if let Some(event_kind) = self.attributes.iter().find(|a| a.is_event_kind()) {
            if !self.has_attribute(PortAttribute::Event) {
                return Err(DescriptionError::EventAttributeWithoutEvent {
                    port: self.name.clone(),
                    attribute: event_kind.as_str().to_string(),
                });
            }
        }

        if self.port_type == PortType::Select
            && self.options.as_ref().map_or(true, |options| options.is_empty())
        {
            return Err(DescriptionError::EmptySelectOptions {
                port: self.name.clone(),
            });
        }

        if self.min.is_some() || self.max.is_some() {
            if !self.port_type.is_numeric() {
                return Err(DescriptionError::invalid_bounds(
                    &self.name,
                    "bounds are only allowed on numeric and integer ports",
                ));
            }
            if let (Some(min), Some(max)) = (self.min, self.max) {
                // NaN bounds fail this comparison as well
                if !(min < max) {
                    return Err(DescriptionError::invalid_bounds(
                        &self.name,
                        format!("min ({min}) must be less than max ({max})"),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// `^[A-Za-z]\w*$`
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identifier_shape() {
        assert!(is_identifier("Power"));
        assert!(is_identifier("input_2"));
        assert!(!is_identifier("2input"));
        assert!(!is_identifier("_hidden"));
        assert!(!is_identifier("lighting.Power"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_event_kind_requires_event() {
        let port = PortDeclaration::output("Temperature")
            .with_type(PortType::Numeric)
            .with_attribute(PortAttribute::EventPeriodic);

        assert_eq!(
            port.validate(),
            Err(DescriptionError::EventAttributeWithoutEvent {
                port: "Temperature".to_string(),
                attribute: "eventPeriodic".to_string(),
            })
        );

        let port = port.with_attribute(PortAttribute::Event);
        assert!(port.validate().is_ok());
    }

    #[test]
    fn test_select_requires_options() {
        let port = PortDeclaration::input("Input").with_type(PortType::Select);
        assert!(matches!(
            port.validate(),
            Err(DescriptionError::EmptySelectOptions { .. })
        ));

        let port = port.with_options(Vec::<String>::new());
        assert!(port.validate().is_err());

        let port = port.with_options(["VGA", "HDMI 1", "HDMI 2"]);
        assert!(port.validate().is_ok());
    }

    #[test]
    fn test_bounds_rules() {
        let ok = PortDeclaration::input("Brightness")
            .with_type(PortType::Integer)
            .with_bounds(0.0, 255.0);
        assert!(ok.validate().is_ok());

        let inverted = ok.clone().with_bounds(10.0, 10.0);
        assert!(matches!(
            inverted.validate(),
            Err(DescriptionError::InvalidBounds { .. })
        ));

        let wrong_type = PortDeclaration::input("Label").with_bounds(0.0, 1.0);
        assert!(matches!(
            wrong_type.validate(),
            Err(DescriptionError::InvalidBounds { .. })
        ));

        let nan = ok.with_bounds(f64::NAN, 1.0);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_attribute_spelling_round_trip() {
        let port: PortDeclaration = serde_json::from_value(json!({
            "name": "Motion",
            "directions": ["output"],
            "attributes": ["read", "event", "eventChange"],
            "type": "bool"
        }))
        .unwrap();

        assert!(port.has_attribute(PortAttribute::EventChange));
        assert!(port.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&port).unwrap()["attributes"],
            json!(["read", "event", "eventChange"])
        );
    }

    #[test]
    fn test_port_without_directions() {
        let port = PortDeclaration::new("Orphan", &[]);
        assert_eq!(
            port.validate(),
            Err(DescriptionError::NoDirections {
                port: "Orphan".to_string()
            })
        );
    }
}
