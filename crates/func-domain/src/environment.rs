//! Environment: el ámbito (tenant) al que pertenecen tasks, funciones y
//! workflows, junto con sus variables declaradas.
//!
//! Las variables marcadas `protect` se entregan al runner como cualquier
//! otra, pero sus valores se enmascaran en la salida persistida.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DomainError;

/// Variable declarada sobre un environment, con su flag de protección.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    value: String,
    protect: bool,
}

impl Variable {
    pub fn new(name: &str, value: &str, protect: bool) -> Result<Self, DomainError> {
        if !valid_variable_name(name) {
            return Err(DomainError::InvalidVariableName(name.to_string()));
        }
        Ok(Variable {
            name: name.to_string(),
            value: value.to_string(),
            protect,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn value(&self) -> &str {
        &self.value
    }
    pub fn protect(&self) -> bool {
        self.protect
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, el mismo conjunto que acepta un shell.
fn valid_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    id: Uuid,
    name: String,
    variables: Vec<Variable>,
}

impl Environment {
    pub fn new(name: &str) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::Validation("environment name vacío".to_string()));
        }
        Ok(Environment {
            id: Uuid::new_v4(),
            name: name.to_string(),
            variables: Vec::new(),
        })
    }

    /// Inserta una variable; el nombre debe ser único dentro del environment.
    pub fn add_variable(&mut self, variable: Variable) -> Result<(), DomainError> {
        if self.variables.iter().any(|v| v.name() == variable.name()) {
            return Err(DomainError::DuplicateVariable(variable.name().to_string()));
        }
        self.variables.push(variable);
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name() == name)
    }

    /// Variables cuyo valor debe enmascararse en la salida persistida.
    pub fn protected_variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|v| v.protect())
    }
}
