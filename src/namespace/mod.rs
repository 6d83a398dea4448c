//! Typed parameter scope and expression evaluation over dummy data.
//!
//! A [`Namespace`] is built once from a [`FunctionDefinition`] and is then
//! used, read-only except for the transient `for`-loop scope, by every
//! directive that needs to validate or evaluate an expression.

pub mod expr;
pub mod value;

use expr::{Bindings, ExprError};
use std::fmt;
use value::{dummy_value, Value};

/// The primitive scalar types a parameter (or environment constant) can
/// declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Str,
    Int,
    Float,
    Bool,
    Any,
}

/// The closed type grammar for parameter and environment declarations.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    Primitive(PrimitiveType),
    List(Box<ParamType>),
    Map(Vec<(String, ParamType)>),
}

impl ParamType {
    fn field(&self, name: &str) -> Option<&ParamType> {
        match self {
            ParamType::Map(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// A function's declared parameter surface: name plus an ordered map of
/// parameter name to [`ParamType`]. Order is preserved (not a `HashMap`) so
/// dummy-data generation and error messages are reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub parameters: Vec<(String, ParamType)>,
}

impl FunctionDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), parameters: Vec::new() }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.parameters.push((name.into(), ty));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NamespaceError {
    Expression(ExprError),
    ElementNotAList,
}

impl fmt::Display for NamespaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamespaceError::Expression(e) => write!(f, "{e}"),
            NamespaceError::ElementNotAList => write!(f, "loop source expression did not evaluate to a list"),
        }
    }
}

impl std::error::Error for NamespaceError {}

impl From<ExprError> for NamespaceError {
    fn from(e: ExprError) -> Self {
        NamespaceError::Expression(e)
    }
}

/// A hierarchical typed scope over a function's parameters and a separate
/// scope over environment constants, plus the transient loop-variable
/// binding stack used while validating `/*# for ... */` blocks.
pub struct Namespace {
    parameters: Vec<(String, ParamType)>,
    environment: Vec<(String, ParamType)>,
    loop_stack: Vec<(String, Value)>,
}

impl Namespace {
    pub fn new(function: &FunctionDefinition) -> Self {
        Self {
            parameters: function.parameters.clone(),
            environment: Vec::new(),
            loop_stack: Vec::new(),
        }
    }

    pub fn with_environment(mut self, environment: Vec<(String, ParamType)>) -> Self {
        self.environment = environment;
        self
    }

    fn resolve_in(table: &[(String, ParamType)], loop_stack: &[(String, Value)], path: &[String]) -> Option<Value> {
        if path.is_empty() {
            return None;
        }
        for (name, value) in loop_stack.iter().rev() {
            if name == &path[0] {
                return walk_value(value, &path[1..]);
            }
        }
        let (_, ty) = table.iter().find(|(name, _)| name == &path[0])?;
        let mut current_ty = ty;
        for segment in &path[1..] {
            current_ty = current_ty.field(segment)?;
        }
        Some(dummy_value(current_ty))
    }

    fn param_bindings(&self) -> ParamBindings<'_> {
        ParamBindings { namespace: self }
    }

    fn env_bindings(&self) -> EnvBindings<'_> {
        EnvBindings { namespace: self }
    }

    /// Compiles `expr` and checks it resolves against the parameter scope,
    /// without evaluating it.
    pub fn validate_parameter_expression(&self, source: &str) -> Result<(), NamespaceError> {
        let compiled = expr::parse(source)?;
        expr::eval(&compiled, &self.param_bindings())?;
        Ok(())
    }

    /// Compiles and evaluates `expr` against dummy parameter data.
    pub fn evaluate_parameter_expression(&self, source: &str) -> Result<Value, NamespaceError> {
        let compiled = expr::parse(source)?;
        Ok(expr::eval(&compiled, &self.param_bindings())?)
    }

    /// Compiles `expr` and checks it resolves against the environment
    /// constant scope.
    pub fn validate_environment_expression(&self, source: &str) -> Result<(), NamespaceError> {
        let compiled = expr::parse(source)?;
        expr::eval(&compiled, &self.env_bindings())?;
        Ok(())
    }

    /// Evaluates `list_expr`, infers the loop element, binds `name` to it
    /// for the duration of `f`, and restores the namespace on every exit
    /// path (including an error returned by `f`) since the binding lives on
    /// a stack popped by [`LoopVarGuard`]'s `Drop`.
    pub fn with_loop_variable<T>(
        &mut self,
        name: &str,
        list_expr: &str,
        f: impl FnOnce(&mut Namespace) -> Result<T, NamespaceError>,
    ) -> Result<T, NamespaceError> {
        let list_value = self.evaluate_parameter_expression(list_expr)?;
        let Value::List(items) = list_value else {
            return Err(NamespaceError::ElementNotAList);
        };
        let element = items.into_iter().next().unwrap_or(Value::Null);
        self.loop_stack.push((name.to_string(), element));
        let _guard = LoopVarGuard { namespace: self };
        f(_guard.namespace)
    }
}

struct LoopVarGuard<'a> {
    namespace: &'a mut Namespace,
}

impl Drop for LoopVarGuard<'_> {
    fn drop(&mut self) {
        self.namespace.loop_stack.pop();
    }
}

struct ParamBindings<'a> {
    namespace: &'a Namespace,
}

impl Bindings for ParamBindings<'_> {
    fn resolve(&self, path: &[String]) -> Option<Value> {
        Namespace::resolve_in(&self.namespace.parameters, &self.namespace.loop_stack, path)
    }
}

struct EnvBindings<'a> {
    namespace: &'a Namespace,
}

impl Bindings for EnvBindings<'_> {
    fn resolve(&self, path: &[String]) -> Option<Value> {
        Namespace::resolve_in(&self.namespace.environment, &[], path)
    }
}

fn walk_value(value: &Value, path: &[String]) -> Option<Value> {
    let mut current = value.clone();
    for segment in path {
        current = current.get_field(segment)?.clone();
    }
    Some(current)
}
