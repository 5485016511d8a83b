//! context-free expression resolution
//!
//! Attributes are evaluated with an empty [hcl::eval::Context]. Nothing is ever substituted: a variable, a reference
//! to another resource or a function call can not be evaluated and falls through to [reference_path].
//!
//! | expression                      | result                                  |
//! |---------------------------------|-----------------------------------------|
//! | `"AES256"`, `[1, 2]`, `1 + 2`   | the literal value                       |
//! | `aws_kms_key.main.arn`          | `"aws_kms_key.main.arn"`                |
//! | `var.subnets[0]`                | `"var.subnets[0]"`                      |
//! | `local.tags["env"]`             | `"local.tags[\"env\"]"`                 |
//! | `"${aws_kms_key.main.arn}"`     | `"aws_kms_key.main.arn"`                |
//! | `var.a ? 1 : 0`, `"x-${var.a}"` | nothing, the attribute is omitted       |
use crate::value::Value;
use hcl::eval::{Context, Evaluate};
use hcl::template::Element;
use hcl::{Expression, Template, Traversal, TraversalOperator};

/// Reason an expression did not evaluate to a literal
#[derive(Debug, Clone, PartialEq)]
pub enum Unevaluated {
    /// A pure traversal, carrying its reconstructed path
    Traversal(String),
    /// Anything else that needs an evaluation context
    Other,
}

/// Evaluate `expr` without any variables or functions
pub fn evaluate_literal(expr: &Expression) -> Result<hcl::Value, Unevaluated> {
    let context = Context::new();
    expr.evaluate(&context).map_err(|errors| {
        tracing::trace!(?errors, "expression needs context");
        match reference_path(expr) {
            Some(path) => Unevaluated::Traversal(path),
            None => Unevaluated::Other,
        }
    })
}

/// Resolve an attribute expression into a [Value]
///
/// Returns `None` when the expression is neither a literal nor a pure traversal.
pub fn resolve(expr: &Expression) -> Option<Value> {
    match evaluate_literal(expr) {
        Ok(value) => Some(value.into()),
        Err(Unevaluated::Traversal(path)) => Some(Value::String(path)),
        Err(Unevaluated::Other) => None,
    }
}

/// Reconstruct the dotted path of a pure traversal
///
/// `foo.bar[2]` and `foo.bar["k"]` render exactly like that. Splats, computed indices and anything that is not rooted
/// in a plain identifier yield `None`.
pub fn reference_path(expr: &Expression) -> Option<String> {
    expr.reference_path()
}

trait ReferenceExt {
    fn reference_path(&self) -> Option<String>;
}

impl ReferenceExt for Expression {
    fn reference_path(&self) -> Option<String> {
        match self {
            Expression::Variable(variable) => Some(variable.as_str().to_string()),
            Expression::Traversal(traversal) => traversal.reference_path(),
            Expression::Parenthesis(inner) => inner.reference_path(),
            // "${a.b}" is the same reference as a.b
            Expression::TemplateExpr(template_expr) => {
                let template = Template::from_expr(template_expr).ok()?;
                match template.elements() {
                    [Element::Interpolation(interpolation)] => {
                        interpolation.expr.reference_path()
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl ReferenceExt for Traversal {
    fn reference_path(&self) -> Option<String> {
        let mut path = self.expr.reference_path()?;

        for operator in &self.operators {
            match operator {
                TraversalOperator::GetAttr(ident) => {
                    path.push('.');
                    path.push_str(ident.as_str());
                }
                TraversalOperator::LegacyIndex(index) => {
                    path.push_str(&format!("[{index}]"));
                }
                TraversalOperator::Index(key) => path.push_str(&index_segment(key)?),
                TraversalOperator::AttrSplat | TraversalOperator::FullSplat => return None,
            }
        }

        Some(path)
    }
}

/// Render an index key, which has to be a literal number or string
fn index_segment(key: &Expression) -> Option<String> {
    match key.evaluate(&Context::new()).ok()? {
        hcl::Value::Number(number) => {
            let index = match number.as_i64() {
                Some(index) => index,
                None => number.as_f64()?.trunc() as i64,
            };
            Some(format!("[{index}]"))
        }
        hcl::Value::String(key) => Some(format!("[{}]", quoted(&key))),
        _ => None,
    }
}

/// Double quoted with `\x` escapes for ASCII control characters
fn quoted(key: &str) -> String {
    let mut quoted = String::with_capacity(key.len() + 2);
    quoted.push('"');

    for c in key.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\u{7}' => quoted.push_str("\\a"),
            '\u{8}' => quoted.push_str("\\b"),
            '\u{c}' => quoted.push_str("\\f"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            '\u{b}' => quoted.push_str("\\v"),
            c if c.is_ascii_control() => quoted.push_str(&format!("\\x{:02x}", c as u32)),
            c if c.is_control() => quoted.push_str(&format!("\\u{:04x}", c as u32)),
            c => quoted.push(c),
        }
    }

    quoted.push('"');
    quoted
}
