//! Parameter declarations and the configuration map bound into an instance.

use crate::error::InstantiationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A parameter the accessor expects from whoever instantiates it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    pub name: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParameterDeclaration {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            default: None,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            required: false,
            default: Some(default),
            description: None,
        }
    }
}

/// String-keyed configuration values, fixed once an instance is built
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    values: HashMap<String, Value>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// String view of a parameter, for the common case of URLs and names
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Presence check against the declared parameters, filling defaults for absent
    /// optional parameters. No type or range checking happens here.
    pub fn resolve(
        mut self,
        accessor: &str,
        declarations: &[ParameterDeclaration],
    ) -> Result<Self, InstantiationError> {
        for declaration in declarations {
            if self.values.contains_key(&declaration.name) {
                continue;
            }
            match (&declaration.default, declaration.required) {
                (_, true) => {
                    return Err(InstantiationError::MissingParameter {
                        accessor: accessor.to_string(),
                        name: declaration.name.clone(),
                    })
                }
                (Some(default), false) => {
                    self.values
                        .insert(declaration.name.clone(), default.clone());
                }
                (None, false) => {}
            }
        }
        Ok(self)
    }
}

impl From<HashMap<String, Value>> for Configuration {
    fn from(values: HashMap<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_fills_defaults() {
        let declarations = vec![
            ParameterDeclaration::required("bridge_url"),
            ParameterDeclaration::optional("username", json!("newdeveloper")),
        ];

        let configuration = Configuration::new()
            .with("bridge_url", "http://10.0.0.2")
            .resolve("Hue Single", &declarations)
            .unwrap();

        assert_eq!(configuration.get_str("bridge_url"), Some("http://10.0.0.2"));
        assert_eq!(configuration.get_str("username"), Some("newdeveloper"));
    }

    #[test]
    fn test_resolve_keeps_supplied_values() {
        let declarations = vec![ParameterDeclaration::optional("username", json!("x"))];
        let configuration = Configuration::new()
            .with("username", "lab")
            .resolve("Hue Single", &declarations)
            .unwrap();
        assert_eq!(configuration.get_str("username"), Some("lab"));
    }

    #[test]
    fn test_resolve_reports_missing_required() {
        let declarations = vec![ParameterDeclaration::required("device_url")];
        let err = Configuration::new()
            .resolve("Projector", &declarations)
            .unwrap_err();

        match err {
            InstantiationError::MissingParameter { accessor, name } => {
                assert_eq!(accessor, "Projector");
                assert_eq!(name, "device_url");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_undeclared_values_pass_through() {
        let configuration: Configuration = [("anything", json!(3))].into_iter().collect();
        let configuration = configuration.resolve("Free", &[]).unwrap();
        assert_eq!(configuration.get("anything"), Some(&json!(3)));
        assert_eq!(configuration.len(), 1);
    }
}
