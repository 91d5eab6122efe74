//! Package y Function: el catálogo de código invocable.
//!
//! Un `Package` agrupa funciones construidas dentro de una misma imagen de
//! contenedor; una `Function` es la unidad invocable, con sus parámetros
//! declarados y el tipo de retorno que anuncia al orquestador.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::DomainError;

/// Tipos de parámetro que una función puede declarar. `File` recibe un
/// tratamiento especial en el despacho (URL prefirmada en lugar del valor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Integer,
    Float,
    Boolean,
    String,
    Text,
    Json,
    Date,
    DateTime,
    File,
}

/// Forma en que el runner devuelve el resultado de la función.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    String,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionParameter {
    name: String,
    parameter_type: ParameterType,
    required: bool,
}

impl FunctionParameter {
    pub fn new(name: &str, parameter_type: ParameterType, required: bool) -> Self {
        FunctionParameter {
            name: name.to_string(),
            parameter_type,
            required,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn parameter_type(&self) -> ParameterType {
        self.parameter_type
    }
    pub fn required(&self) -> bool {
        self.required
    }
}

/// Imagen de contenedor publicada que empaqueta una o más funciones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    id: Uuid,
    environment_id: Uuid,
    name: String,
    full_image_name: String,
}

impl Package {
    pub fn new(environment_id: Uuid, name: &str, full_image_name: &str) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::Validation("package name vacío".to_string()));
        }
        if full_image_name.trim().is_empty() {
            return Err(DomainError::Validation("package sin imagen publicada".to_string()));
        }
        Ok(Package {
            id: Uuid::new_v4(),
            environment_id,
            name: name.to_string(),
            full_image_name: full_image_name.to_string(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn environment_id(&self) -> Uuid {
        self.environment_id
    }
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Referencia completa de imagen (registry/nombre:tag) que viaja en el
    /// mensaje de despacho.
    pub fn full_image_name(&self) -> &str {
        &self.full_image_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    id: Uuid,
    package_id: Uuid,
    name: String,
    description: String,
    parameters: Vec<FunctionParameter>,
    return_type: ReturnType,
}

impl Function {
    pub fn new(
        package_id: Uuid,
        name: &str,
        description: &str,
        parameters: Vec<FunctionParameter>,
        return_type: ReturnType,
    ) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::Validation("function name vacío".to_string()));
        }
        let mut seen: Vec<&str> = Vec::new();
        for p in &parameters {
            if seen.contains(&p.name()) {
                return Err(DomainError::Validation(format!(
                    "parámetro duplicado en {}: {}",
                    name,
                    p.name()
                )));
            }
            seen.push(p.name());
        }
        Ok(Function {
            id: Uuid::new_v4(),
            package_id,
            name: name.to_string(),
            description: description.to_string(),
            parameters,
            return_type,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn package_id(&self) -> Uuid {
        self.package_id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn description(&self) -> &str {
        &self.description
    }
    pub fn parameters(&self) -> &[FunctionParameter] {
        &self.parameters
    }
    pub fn return_type(&self) -> ReturnType {
        self.return_type
    }

    pub fn parameter(&self, name: &str) -> Option<&FunctionParameter> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    /// Valida un documento de parámetros contra la declaración: debe ser un
    /// objeto, los requeridos deben estar presentes y toda clave presente
    /// debe estar declarada. El chequeo de tipos fino es asunto del runner.
    pub fn validate_parameters(&self, document: &Value) -> Result<(), DomainError> {
        let map = document.as_object().ok_or_else(|| {
            DomainError::Validation(format!("parámetros de {} no son un objeto JSON", self.name))
        })?;
        for p in &self.parameters {
            if p.required() && !map.contains_key(p.name()) {
                return Err(DomainError::Validation(format!(
                    "falta el parámetro requerido {} de {}",
                    p.name(),
                    self.name
                )));
            }
        }
        for key in map.keys() {
            if self.parameter(key).is_none() {
                return Err(DomainError::Validation(format!(
                    "parámetro no declarado {} en {}",
                    key, self.name
                )));
            }
        }
        Ok(())
    }
}
