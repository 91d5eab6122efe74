//! Resolución de parámetros templados entre steps.
//!
//! Un template es texto JSON con placeholders `{{identificador.camino}}`
//! que referencian resultados de steps anteriores (`{{step.result}}`) o los
//! parámetros iniciales del run (`{{parameters.clave}}`). La resolución es
//! en dos fases: primero se renderiza el texto reemplazando cada
//! placeholder por la forma textual del valor referenciado, después se
//! parsea el texto completo como JSON. Así un valor que es a su vez un
//! documento JSON se incrusta sin doble escape.
//!
//! La gramática es cerrada: no hay filtros, ni condicionales, ni lookup
//! dinámico.

use indexmap::IndexMap;
use serde_json::Value;

use crate::errors::EngineError;

/// Contexto de resolución: camino (`parameters.x`, `step.result`) a la
/// forma textual que se empalma en el template.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    values: IndexMap<String, String>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expone cada parámetro del run como `parameters.<clave>`, en su forma
    /// JSON. Los strings quedan con comillas, así el texto renderizado
    /// sigue siendo JSON válido.
    pub fn insert_parameters(&mut self, parameters: &Value) {
        if let Some(map) = parameters.as_object() {
            for (key, value) in map {
                self.values.insert(format!("parameters.{}", key), value.to_string());
            }
        }
    }

    /// Expone el resultado crudo de un step completado como
    /// `<nombre>.result`. El texto se empalma tal cual fue persistido.
    pub fn insert_step_result(&mut self, step_name: &str, raw_result: &str) {
        self.values.insert(format!("{}.result", step_name), raw_result.to_string());
    }

    pub fn lookup(&self, path: &str) -> Option<&str> {
        self.values.get(path).map(|s| s.as_str())
    }
}

fn valid_reference(path: &str) -> bool {
    !path.is_empty()
        && path.split('.').all(|segment| {
            !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Renderiza el template contra el contexto. Escáner de una sola pasada:
/// fuera de `{{ }}` el texto se copia tal cual; adentro se exige un camino
/// válido y conocido. Una referencia desconocida corta la resolución en vez
/// de renderizar vacío.
pub fn render(template: &str, context: &ResolutionContext) -> Result<String, EngineError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let close = after_open.find("}}").ok_or_else(|| {
            EngineError::ParameterResolution("unclosed placeholder in template".to_string())
        })?;
        let reference = after_open[..close].trim();
        if !valid_reference(reference) {
            return Err(EngineError::ParameterResolution(format!(
                "invalid placeholder reference: {:?}",
                reference
            )));
        }
        let value = context.lookup(reference).ok_or_else(|| {
            EngineError::ParameterResolution(format!("unknown reference: {}", reference))
        })?;
        out.push_str(value);
        rest = &after_open[close + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Resuelve el template de parámetros de un step: renderiza y reparsea.
/// Un step sin template resuelve a `{}`.
pub fn resolve_parameters(
    template: Option<&str>,
    context: &ResolutionContext,
) -> Result<Value, EngineError> {
    let text = template.unwrap_or("{}");
    let rendered = render(text, context)?;
    serde_json::from_str(&rendered).map_err(|e| {
        EngineError::ParameterResolution(format!("rendered parameters are not valid JSON: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::{render, resolve_parameters, ResolutionContext};
    use crate::errors::EngineError;
    use serde_json::json;

    fn context_with_parameters(parameters: serde_json::Value) -> ResolutionContext {
        let mut ctx = ResolutionContext::new();
        ctx.insert_parameters(&parameters);
        ctx
    }

    #[test]
    fn integer_parameter_keeps_its_type() {
        let ctx = context_with_parameters(json!({"wf_int_param": 10}));
        let resolved =
            resolve_parameters(Some(r#"{"func_int_param": {{parameters.wf_int_param}}}"#), &ctx)
                .unwrap();
        assert_eq!(resolved, json!({"func_int_param": 10}));
    }

    #[test]
    fn string_parameter_round_trips_quoted() {
        let ctx = context_with_parameters(json!({"wf_str_param": "hola"}));
        let resolved =
            resolve_parameters(Some(r#"{"func_str_param": {{parameters.wf_str_param}}}"#), &ctx)
                .unwrap();
        assert_eq!(resolved, json!({"func_str_param": "hola"}));
    }

    #[test]
    fn json_parameter_embeds_without_double_escape() {
        let ctx = context_with_parameters(json!({"wf_json_param": {"this": "is a test"}}));
        let resolved = resolve_parameters(
            Some(r#"{"func_json_param": {"nested": {{parameters.wf_json_param}}}}"#),
            &ctx,
        )
        .unwrap();
        assert_eq!(resolved, json!({"func_json_param": {"nested": {"this": "is a test"}}}));
    }

    #[test]
    fn step_result_is_spliced_verbatim() {
        let mut ctx = ResolutionContext::new();
        ctx.insert_step_result("step1", r#"{"a": 1}"#);
        let resolved = resolve_parameters(Some(r#"{"x": {{ step1.result }}}"#), &ctx).unwrap();
        assert_eq!(resolved, json!({"x": {"a": 1}}));
    }

    #[test]
    fn missing_template_resolves_to_empty_object() {
        let ctx = ResolutionContext::new();
        assert_eq!(resolve_parameters(None, &ctx).unwrap(), json!({}));
    }

    #[test]
    fn unknown_reference_fails_resolution() {
        let ctx = ResolutionContext::new();
        let err = render("{{parameters.missing}}", &ctx).unwrap_err();
        assert!(matches!(err, EngineError::ParameterResolution(_)));
        assert!(err.to_string().contains("parameters.missing"));
    }

    #[test]
    fn unclosed_placeholder_fails_resolution() {
        let ctx = context_with_parameters(json!({"a": 1}));
        assert!(render("{\"x\": {{parameters.a", &ctx).is_err());
    }

    #[test]
    fn invalid_reference_syntax_fails_resolution() {
        let ctx = context_with_parameters(json!({"a": 1}));
        assert!(render("{{parameters..a}}", &ctx).is_err());
        assert!(render("{{pa rams}}", &ctx).is_err());
        assert!(render("{{}}", &ctx).is_err());
    }

    #[test]
    fn rendered_text_must_be_json() {
        let mut ctx = ResolutionContext::new();
        ctx.insert_step_result("step1", "plain text, not json");
        let err = resolve_parameters(Some("{\"x\": {{step1.result}}}"), &ctx).unwrap_err();
        assert!(matches!(err, EngineError::ParameterResolution(_)));
    }
}
