//! Placeholder expansion in template text
//!
//! Placeholders are delimited by `{{` and `}}`. Each one is evaluated against
//! a context; scalar results are spliced into the text, structured results
//! (images, lists, list entities) replace the whole template.

use crate::error::{ProjectionError, ProjectionResult};
use crate::resolver::resolve;
use crate::types::Value;
use std::cell::RefCell;
use tracing::debug;
use xlformula_engine::{calculate, parse_formula, types, NoCustomFunction};

pub const START_STR: &str = "{{";
pub const END_STR: &str = "}}";

/// Evaluates the expression inside a placeholder
pub trait ExpressionEvaluator {
    fn evaluate(&self, expression: &str, context: &Value) -> ProjectionResult<Value>;
}

impl<F> ExpressionEvaluator for F
where
    F: Fn(&str, &Value) -> ProjectionResult<Value>,
{
    fn evaluate(&self, expression: &str, context: &Value) -> ProjectionResult<Value> {
        self(expression, context)
    }
}

/// Expand every placeholder in `template`
///
/// Returns `Value::Text` with all placeholders substituted (null results
/// become empty), or the first structured result on its own. Substituted text
/// is never scanned again. Evaluator errors abort the render.
pub fn render(
    template: &str,
    context: &Value,
    evaluator: &dyn ExpressionEvaluator,
) -> ProjectionResult<Value> {
    let mut text = template.to_string();
    let mut cursor = 0;

    while let Some(start) = text[cursor..].find(START_STR).map(|i| i + cursor) {
        let inner = start + START_STR.len();
        let Some(end) = text[inner..].find(END_STR).map(|i| i + inner) else {
            break;
        };

        let value = evaluator.evaluate(text[inner..end].trim(), context)?;
        if value.is_structured() {
            debug!(kind = value.kind_name(), "placeholder resolved to structured value");
            return Ok(value);
        }

        let replacement = value.to_string();
        text.replace_range(start..end + END_STR.len(), &replacement);
        cursor = start + replacement.len();
    }

    Ok(Value::Text(text))
}

/// Whether the text holds at least one complete placeholder
pub fn has_placeholder(text: &str) -> bool {
    text.find(START_STR)
        .is_some_and(|start| text[start + START_STR.len()..].contains(END_STR))
}

/// Default evaluator: property paths, or spreadsheet formulas prefixed with `=`
///
/// `{{order.customer.name}}` resolves a path; `{{=price * qty}}` evaluates the
/// formula with identifiers resolved as paths against the context.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormulaEvaluator;

impl FormulaEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn evaluate_formula(&self, formula: &str, context: &Value) -> ProjectionResult<Value> {
        // Numbers the formula engine cannot hold exactly, by reference name
        let inexact = RefCell::new(Vec::new());
        let resolver = |name: String| -> types::Value {
            let (number, exact) = match resolve(&name, context) {
                Ok(Value::Int(i)) => (i as f32, (i as f32) as i64 == i),
                Ok(Value::Float(x)) => (x as f32, f32_preserves(x)),
                Ok(Value::Null) => return types::Value::Blank,
                Ok(Value::Bool(true)) => return types::Value::Boolean(types::Boolean::True),
                Ok(Value::Bool(false)) => return types::Value::Boolean(types::Boolean::False),
                Ok(Value::Text(s)) if s.is_empty() => return types::Value::Blank,
                Ok(v) if !v.is_structured() => return types::Value::Text(v.to_string()),
                _ => return types::Value::Error(types::Error::Value),
            };
            if !exact {
                inexact.borrow_mut().push(name);
                return types::Value::Error(types::Error::Value);
            }
            types::Value::Number(number)
        };

        let parsed = parse_formula::parse_string_to_formula(formula, None::<NoCustomFunction>);
        let result = calculate::calculate_formula(parsed, Some(&resolver));

        let inexact = inexact.into_inner();
        if !inexact.is_empty() {
            return Err(ProjectionError::Eval(format!(
                "Formula '{}' would lose precision reading {}",
                formula,
                inexact.join(", ")
            )));
        }

        match result {
            types::Value::Number(n) => {
                // Shortest f32 rendering avoids artifacts such as 0.100000001
                let widened = n.to_string().parse::<f64>().unwrap_or(f64::from(n));
                Ok(Value::Float(widened))
            }
            types::Value::Text(s) => Ok(Value::Text(s)),
            types::Value::Boolean(b) => Ok(Value::Bool(matches!(b, types::Boolean::True))),
            types::Value::Blank => Ok(Value::Null),
            types::Value::Error(e) => Err(ProjectionError::Eval(format!(
                "Formula '{}' returned error: {:?}",
                formula, e
            ))),
            other => Err(ProjectionError::Eval(format!(
                "Formula '{}' returned unexpected type: {:?}",
                formula, other
            ))),
        }
    }
}

/// Whether `x` survives the formula engine's single-precision numbers
///
/// Values whose shortest decimal form reads back unchanged (0.1, 19.99) pass.
fn f32_preserves(x: f64) -> bool {
    let narrowed = x as f32;
    narrowed.is_finite() && narrowed.to_string().parse::<f64>() == Ok(x)
}

impl ExpressionEvaluator for FormulaEvaluator {
    fn evaluate(&self, expression: &str, context: &Value) -> ProjectionResult<Value> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Ok(Value::Null);
        }
        if expression.starts_with('=') {
            return self.evaluate_formula(expression, context);
        }
        resolve(expression, context)
    }
}

/// Render with the default [`FormulaEvaluator`]
pub fn render_with_context(template: &str, context: &Value) -> ProjectionResult<Value> {
    render(template, context, &FormulaEvaluator)
}
