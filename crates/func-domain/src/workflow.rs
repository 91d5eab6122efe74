//! Workflow: definición ordenada de steps, cada uno invocando una función
//! con un template de parámetros.
//!
//! El orden es total (secuencias únicas), no un DAG: un run ejecuta los
//! steps de a uno, en secuencia ascendente.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    id: Uuid,
    name: String,
    sequence: u32,
    function_id: Uuid,
    parameter_template: Option<String>,
}

impl WorkflowStep {
    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
    pub fn function_id(&self) -> Uuid {
        self.function_id
    }

    /// Template JSON con placeholders `{{ident.path}}`; `None` equivale a `{}`.
    pub fn parameter_template(&self) -> Option<&str> {
        self.parameter_template.as_deref()
    }
}

/// Solo alfanuméricos y guion bajo: el nombre del step se usa como
/// identificador dentro de los templates de steps posteriores.
fn valid_step_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    id: Uuid,
    environment_id: Uuid,
    name: String,
    description: String,
    steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn new(environment_id: Uuid, name: &str, description: &str) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::Validation("workflow name vacío".to_string()));
        }
        Ok(Workflow {
            id: Uuid::new_v4(),
            environment_id,
            name: name.to_string(),
            description: description.to_string(),
            steps: Vec::new(),
        })
    }

    /// Agrega un step validando las restricciones de definición: nombre con
    /// charset cerrado, nombre único y secuencia única dentro del workflow.
    /// Los steps quedan siempre ordenados por secuencia ascendente.
    pub fn add_step(
        &mut self,
        name: &str,
        sequence: u32,
        function_id: Uuid,
        parameter_template: Option<&str>,
    ) -> Result<Uuid, DomainError> {
        if !valid_step_name(name) {
            return Err(DomainError::InvalidStepName(name.to_string()));
        }
        if sequence == 0 {
            return Err(DomainError::Validation(
                "la secuencia de un step debe ser mayor que cero".to_string(),
            ));
        }
        if self.steps.iter().any(|s| s.name() == name) {
            return Err(DomainError::DuplicateStepName(name.to_string()));
        }
        if self.steps.iter().any(|s| s.sequence() == sequence) {
            return Err(DomainError::DuplicateSequence(sequence));
        }
        let step = WorkflowStep {
            id: Uuid::new_v4(),
            name: name.to_string(),
            sequence,
            function_id,
            parameter_template: parameter_template.map(|t| t.to_string()),
        };
        let id = step.id();
        let at = self.steps.iter().position(|s| s.sequence() > sequence).unwrap_or(self.steps.len());
        self.steps.insert(at, step);
        Ok(id)
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
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Steps en orden de ejecución.
    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn step(&self, id: Uuid) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id() == id)
    }

    pub fn step_by_name(&self, name: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.name() == name)
    }

    pub fn first_step(&self) -> Option<&WorkflowStep> {
        self.steps.first()
    }

    /// El step con la menor secuencia estrictamente mayor a `sequence`.
    pub fn next_step_after(&self, sequence: u32) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.sequence() > sequence)
    }
}
