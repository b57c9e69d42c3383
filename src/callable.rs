//! Callable runtime objects: user functions, native functions and classes.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::FunctionDecl;
use crate::environment::{EnvRef, Environment};
use crate::error::Result;
use crate::instance::Instance;
use crate::interpreter::{ExecSignal, Interpreter};
use crate::value::Value;

/// Host implementation behind a native global.  A returned `Err` becomes an
/// `InterpreterError` at the call site.
pub type NativeFn = fn(&mut Interpreter, &[Value]) -> std::result::Result<Value, String>;

/// Bridges a Rust function into the Lox global namespace.
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native function '{}'>", self.name)
    }
}

/// A user function: its declaration plus the frame that was current when the
/// declaration was executed.
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: EnvRef,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef) -> Self {
        Self {
            declaration,
            closure,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// A copy of this method whose closure is a fresh frame defining `this`.
    pub fn bind(&self, instance: Value) -> Function {
        let mut frame = Environment::with_enclosing(Rc::clone(&self.closure));
        frame.define("this", instance);

        Function::new(Rc::clone(&self.declaration), frame.into_ref())
    }

    /// Run the body in a new frame parented at the closure.  Falling off the
    /// end yields `nil`.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        debug!("Calling user-defined function '{}'", self.name());

        let mut frame = Environment::with_enclosing(Rc::clone(&self.closure));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            frame.define(&param.lexeme, argument);
        }

        match interpreter.execute_block(&self.declaration.body, frame.into_ref())? {
            ExecSignal::Return(value) => Ok(value),
            ExecSignal::Normal => Ok(Value::Nil),
        }
    }
}

// The closure chain can lead back to this function; print the name only.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function '{}'>", self.name())
    }
}

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub methods: HashMap<String, Rc<Function>>,
}

impl Class {
    /// Look `name` up in this class, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// Every method name reachable from this class, overrides included once.
    pub fn method_names(&self, names: &mut BTreeSet<String>) {
        names.extend(self.methods.keys().cloned());

        if let Some(superclass) = &self.superclass {
            superclass.method_names(names);
        }
    }

    /// Arity of the class's own `init`, or 0 without one.  An `init` on a
    /// superclass is not run by the constructor.
    pub fn arity(&self) -> usize {
        self.methods.get("init").map_or(0, |init| init.arity())
    }

    /// Construct an instance, running `init` on it if there is one.
    pub fn call(
        class: &Rc<Class>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Constructing instance of '{}'", class.name);

        let instance = Value::Instance(Instance::new(Rc::clone(class)));

        if let Some(init) = class.methods.get("init") {
            init.bind(instance.clone()).call(interpreter, arguments)?;
        }

        Ok(instance)
    }
}

// ───────────────────────────── native globals ─────────────────────────────

/// Install the native globals into `globals`.
pub fn define_natives(globals: &mut Environment) {
    info!("Defining native functions");

    let natives: [(&str, usize, NativeFn); 3] =
        [("clock", 0, clock), ("dir", 1, dir), ("input", 1, input)];

    for (name, arity, func) in natives {
        globals.define(
            name,
            Value::NativeFunction(Rc::new(NativeFunction {
                name: name.to_string(),
                arity,
                func,
            })),
        );
    }
}

/// Seconds since the Unix epoch.
fn clock(_: &mut Interpreter, _: &[Value]) -> std::result::Result<Value, String> {
    let micros = chrono::Utc::now().timestamp_micros();

    Ok(Value::Number(micros as f64 / 1_000_000.0))
}

/// Sorted attribute names of an instance (fields and methods) or a class
/// (methods), rendered as `['a', 'b']`.
fn dir(_: &mut Interpreter, arguments: &[Value]) -> std::result::Result<Value, String> {
    let mut names: BTreeSet<String> = BTreeSet::new();

    match arguments.first() {
        Some(Value::Instance(instance)) => {
            let instance = instance.borrow();
            names.extend(instance.field_names().map(str::to_string));
            instance.class.method_names(&mut names);
        }
        Some(Value::Class(class)) => class.method_names(&mut names),
        Some(other) => {
            return Err(format!(
                "dir() expects an instance or a class, got '{}'",
                other.type_name()
            ))
        }
        None => return Err("dir() expects an instance or a class".to_string()),
    }

    let quoted: Vec<String> = names.iter().map(|name| format!("'{}'", name)).collect();

    Ok(Value::String(format!("[{}]", quoted.join(", "))))
}

/// Print the prompt, read one line.  `nil` at end of input.
fn input(
    interpreter: &mut Interpreter,
    arguments: &[Value],
) -> std::result::Result<Value, String> {
    if let Some(prompt) = arguments.first() {
        let out = interpreter.output();
        write!(out, "{}", prompt).map_err(|e| e.to_string())?;
        out.flush().map_err(|e| e.to_string())?;
    }

    let mut line = String::new();
    let read = interpreter
        .input()
        .read_line(&mut line)
        .map_err(|e| e.to_string())?;

    if read == 0 {
        return Ok(Value::Nil);
    }

    let trimmed = line.strip_suffix('\n').unwrap_or(&line);
    let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);

    Ok(Value::String(trimmed.to_string()))
}
