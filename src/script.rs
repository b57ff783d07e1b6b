//! The surface script code sees: dynamically typed [`Value`]s, callable [`Function`]s
//! and a table of built-in commands dispatched through an [`Interp`].
//!
//! Commands only marshal arguments. The work happens in the typed core: `chan` makes a
//! [`Channel<Value>`], `select` builds a [`Select`](crate::select::Select),
//! `call_async` hands a function to the interpreter's [`Runtime`], and `async_seq`
//! wraps a list in an [`AsyncSequence`].
//!
//! ```
//! use handoff::script::{Function, Interp, Value};
//!
//! let interp = Interp::new();
//! let double = Function::new("double", |_, args| match args {
//!     [Value::Int(n)] => Ok(Value::Int(n * 2)),
//!     _ => Ok(Value::Nil),
//! });
//!
//! let result = interp.call("call_async", &[double.into(), Value::Int(21)]).unwrap();
//! assert_eq!(interp.call("receive", &[result]).unwrap(), Value::Int(42));
//! ```

mod commands;

use std::{collections::HashMap, fmt, sync::Arc};

use parking_lot::Mutex;

use crate::{
    channel::Channel,
    config::Config,
    error::{Error, Result},
    runtimes::{thread::Threads, Runtime},
    sequence::{AsyncSequence, Replay},
};

pub type Command = fn(&Interp, &[Value]) -> Result<Value>;

pub type SequenceHandle = Arc<Mutex<AsyncSequence<Replay<Vec<Value>>>>>;

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Channel(Channel<Value>),
    Function(Function),
    Sequence(SequenceHandle),
    Error(Arc<Error>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Channel(_) => "channel",
            Value::Function(_) => "function",
            Value::Sequence(_) => "sequence",
            Value::Error(_) => "error",
        }
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Channel(a), Value::Channel(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(&a.body, &b.body),
            (Value::Sequence(a), Value::Sequence(b)) => Arc::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Channel(chan) => write!(f, "<{}>", chan.id()),
            Value::Function(func) => write!(f, "<fn {}>", func.name()),
            Value::Sequence(_) => f.write_str("<sequence>"),
            Value::Error(err) => write!(f, "<error: {err}>"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Channel<Value>> for Value {
    fn from(chan: Channel<Value>) -> Self {
        Value::Channel(chan)
    }
}

impl From<Function> for Value {
    fn from(func: Function) -> Self {
        Value::Function(func)
    }
}

impl From<Error> for Value {
    fn from(err: Error) -> Self {
        Value::Error(Arc::new(err))
    }
}

/// A callable script value. Invoked with the interpreter it runs under and its
/// positional arguments.
#[derive(Clone)]
pub struct Function {
    name: Arc<str>,
    body: Arc<dyn Fn(&Interp, &[Value]) -> Result<Value> + Send + Sync>,
}

impl Function {
    pub fn new(
        name: &str,
        body: impl Fn(&Interp, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, interp: &Interp, args: &[Value]) -> Result<Value> {
        (self.body)(interp, args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("name", &self.name).finish()
    }
}

/// Execution context shared by commands and functions. Cloning is cheap.
#[derive(Clone)]
pub struct Interp {
    config: Config,
    runtime: Arc<dyn Runtime>,
    commands: Arc<HashMap<&'static str, Command>>,
}

impl Default for Interp {
    fn default() -> Self {
        Self::new()
    }
}

impl Interp {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn from_env() -> Self {
        Self::with_config(Config::from_env())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            runtime: Arc::new(Threads::new(config.clone())),
            config,
            commands: Arc::new(commands::table()),
        }
    }

    /// Replaces the runtime async work is handed to.
    pub fn with_runtime(mut self, runtime: Arc<dyn Runtime>) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    /// Adds or replaces a command. Clones made earlier keep their old table.
    pub fn register(&mut self, name: &'static str, command: Command) {
        Arc::make_mut(&mut self.commands).insert(name, command);
    }

    pub fn command_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| Error::UnknownCommand(name.to_string()))?;
        command(self, args)
    }
}

impl fmt::Debug for Interp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interp")
            .field("config", &self.config)
            .field("commands", &self.commands.len())
            .finish()
    }
}
