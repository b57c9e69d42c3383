use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::callable::{Class, Function, NativeFunction};
use crate::instance::Instance;

/// A runtime Lox value.
///
/// Primitives are stored inline; functions, classes and instances are shared
/// handles, so copying a `Value` never copies an object.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    NativeFunction(Rc<NativeFunction>),
    Function(Rc<Function>),
    Class(Rc<Class>),
    Instance(Rc<RefCell<Instance>>),
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Name of the value's type as used in error messages.  Instances report
    /// their class name.
    pub fn type_name(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Bool(_) => "Boolean".to_string(),
            Value::Number(_) => "Number".to_string(),
            Value::String(_) => "String".to_string(),
            Value::NativeFunction(_) | Value::Function(_) => "Function".to_string(),
            Value::Class(_) => "Class".to_string(),
            Value::Instance(instance) => instance.borrow().class.name.clone(),
        }
    }
}

/// Value equality for primitives, identity for objects.  Values of different
/// types are never equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => fmt_number(*n, f),

            Value::String(s) => write!(f, "{}", s),

            Value::NativeFunction(native) => write!(f, "<native function '{}'>", native.name),

            Value::Function(function) => write!(f, "<function '{}'>", function.name()),

            Value::Class(class) => write!(f, "<class '{}'>", class.name),

            Value::Instance(instance) => {
                write!(f, "<object of '{}'>", instance.borrow().class.name)
            }
        }
    }
}

/// Integers above this are no longer exact, so they print in exponent form.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Integral numbers print without a fraction, `-0` as `0`.
fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n == 0.0 {
        write!(f, "0")
    } else if n.fract() != 0.0 || !n.is_finite() {
        write!(f, "{}", n)
    } else if n.abs() < MAX_EXACT_INTEGER {
        write!(f, "{:.0}", n)
    } else {
        write!(f, "{:e}", n)
    }
}
