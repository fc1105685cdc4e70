//! Values handed to controllers: action arguments and resolved dependencies.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::container::Instance;
use crate::controller::error::ActionError;

/// Arguments of one action call, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionArgs {
    names: Vec<String>,
    values: Vec<Option<String>>,
}

impl ActionArgs {
    /// Bind each parameter from the path, falling back to the body.
    pub fn bind(parameters: &[String], path: &HashMap<String, String>, body: &Map<String, Value>) -> Self {
        let values = parameters
            .iter()
            .map(|name| {
                path.get(name)
                    .cloned()
                    .or_else(|| body.get(name).and_then(value_to_arg))
            })
            .collect();
        Self {
            names: parameters.to_vec(),
            values,
        }
    }

    /// Value of a parameter, if supplied.
    pub fn get(&self, name: &str) -> Option<&str> {
        let index = self.names.iter().position(|n| n == name)?;
        self.values[index].as_deref()
    }

    /// Value of a parameter, or `MissingParameter`.
    pub fn require(&self, name: &str) -> Result<&str, ActionError> {
        self.get(name)
            .ok_or_else(|| ActionError::MissingParameter(name.to_string()))
    }

    /// Parse a required parameter.
    pub fn parse<T>(&self, name: &str) -> Result<T, ActionError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.require(name)?
            .parse()
            .map_err(|e: T::Err| ActionError::InvalidParameter {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Value at a position.
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn value_to_arg(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Constructor dependencies, in the order the constructor declares them.
#[derive(Clone, Default)]
pub struct ResolvedDependencies {
    names: Vec<String>,
    instances: Vec<Instance>,
}

impl ResolvedDependencies {
    pub fn new(names: Vec<String>, instances: Vec<Instance>) -> Self {
        debug_assert_eq!(names.len(), instances.len());
        Self { names, instances }
    }

    /// Dependency at `index`, downcast to `T`.
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>, ActionError> {
        let name = self.names.get(index).cloned().unwrap_or_else(|| format!("#{index}"));
        let instance = self.instances.get(index).ok_or_else(|| ActionError::Dependency {
            name: name.clone(),
            reason: "not declared by the constructor".to_string(),
        })?;
        instance.clone().downcast::<T>().map_err(|_| ActionError::Dependency {
            name,
            reason: format!("not a `{}`", std::any::type_name::<T>()),
        })
    }

    /// Dependency named `name`, downcast to `T`.
    pub fn by_name<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, ActionError> {
        let index = self.names.iter().position(|n| n == name).ok_or_else(|| ActionError::Dependency {
            name: name.to_string(),
            reason: "not declared by the constructor".to_string(),
        })?;
        self.get(index)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl std::fmt::Debug for ResolvedDependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedDependencies")
            .field("names", &self.names)
            .finish()
    }
}
