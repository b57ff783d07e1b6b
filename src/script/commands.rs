use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use super::{Command, Function, Interp, SequenceHandle, Value};
use crate::{
    call::deliver_async,
    channel::Channel,
    error::{Error, Result},
    select::Select,
    sequence::{AsyncSequence, Replay},
};

pub(super) fn table() -> HashMap<&'static str, Command> {
    let mut table: HashMap<&'static str, Command> = HashMap::new();
    table.insert("chan", chan);
    table.insert("send", send);
    table.insert("receive", receive);
    table.insert("try_receive", try_receive);
    table.insert("select", select);
    table.insert("call_async", call_async);
    table.insert("async_seq", async_seq);
    table.insert("advance", advance);
    table.insert("current", current);
    table.insert("reset", reset);
    table.insert("dispose", dispose);
    table
}

fn arity(command: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "{command} takes {expected} argument(s), got {}",
            args.len()
        )))
    }
}

fn mismatch(command: &str, expected: &str, got: &Value) -> Error {
    Error::InvalidArgument(format!(
        "{command} expects a {expected}, got {}",
        got.type_name()
    ))
}

fn channel<'v>(command: &str, value: &'v Value) -> Result<&'v Channel<Value>> {
    match value {
        Value::Channel(chan) => Ok(chan),
        other => Err(mismatch(command, "channel", other)),
    }
}

fn sequence<'v>(command: &str, value: &'v Value) -> Result<&'v SequenceHandle> {
    match value {
        Value::Sequence(seq) => Ok(seq),
        other => Err(mismatch(command, "sequence", other)),
    }
}

/// A received error value is raised instead of returned.
fn raise(value: Value) -> Result<Value> {
    match value {
        Value::Error(err) => {
            Err(Arc::try_unwrap(err).unwrap_or_else(|shared| Error::Source(shared.to_string())))
        }
        other => Ok(other),
    }
}

fn chan(_: &Interp, args: &[Value]) -> Result<Value> {
    arity("chan", args, 0)?;
    Ok(Value::Channel(Channel::new()))
}

fn send(_: &Interp, args: &[Value]) -> Result<Value> {
    arity("send", args, 2)?;
    let chan = channel("send", &args[0])?;
    if let Value::Nil = args[1] {
        return Err(Error::NullPayload);
    }
    chan.send(args[1].clone());
    Ok(Value::Nil)
}

fn receive(_: &Interp, args: &[Value]) -> Result<Value> {
    arity("receive", args, 1)?;
    raise(channel("receive", &args[0])?.receive())
}

fn try_receive(_: &Interp, args: &[Value]) -> Result<Value> {
    arity("try_receive", args, 1)?;
    match channel("try_receive", &args[0])?.try_receive() {
        Some(value) => raise(value),
        None => Ok(Value::Nil),
    }
}

struct Case {
    target: Option<Channel<Value>>,
    handler: Function,
}

/// Accepts `[target, handler]` or `[guard, target, handler]`, where `target` is a
/// channel or nil for a default case. Returns `None` for a case whose guard is false.
fn parse_case(index: usize, value: &Value) -> Result<Option<Case>> {
    let invalid = |what: &str| Error::InvalidCase(format!("case {index}: {what}"));
    let Value::List(items) = value else {
        return Err(invalid("must be a list"));
    };
    let (enabled, target, handler) = match items.as_slice() {
        [target, handler] => (true, target, handler),
        [Value::Bool(guard), target, handler] => (*guard, target, handler),
        [_, _, _] => return Err(invalid("guard must be a bool")),
        _ => return Err(invalid("expected [channel, handler] or [guard, channel, handler]")),
    };
    let target = match target {
        Value::Channel(chan) => Some(chan.clone()),
        Value::Nil => None,
        other => return Err(invalid(&format!("{} is not a channel", other.type_name()))),
    };
    let Value::Function(handler) = handler else {
        return Err(invalid("handler must be a function"));
    };
    Ok(enabled.then(|| Case {
        target,
        handler: handler.clone(),
    }))
}

/// Returns the channel whose case fired, or nil for a default case. Handler errors
/// propagate to the caller.
fn select(interp: &Interp, args: &[Value]) -> Result<Value> {
    let mut cases = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        if let Some(case) = parse_case(index, arg)? {
            cases.push(case);
        }
    }

    let mut select = Select::new();
    for case in &cases {
        let handler = &case.handler;
        select = match &case.target {
            Some(chan) => select.recv(chan, move |value| handler.call(interp, &[value])),
            None => select.default(move || handler.call(interp, &[])),
        };
    }
    let selected = select.wait()?;
    selected.output?;

    Ok(selected
        .channel
        .and_then(|id| {
            cases
                .iter()
                .filter_map(|case| case.target.as_ref())
                .find(|chan| chan.id() == id)
        })
        .map_or(Value::Nil, |chan| Value::Channel(chan.clone())))
}

/// `call_async(function, args...)`: runs the function on the interpreter's runtime and
/// returns the channel its result (or error) will arrive on.
fn call_async(interp: &Interp, args: &[Value]) -> Result<Value> {
    let Some((callee, rest)) = args.split_first() else {
        return Err(Error::InvalidArgument("call_async needs a function".into()));
    };
    let Value::Function(function) = callee else {
        return Err(mismatch("call_async", "function", callee));
    };

    let function = function.clone();
    let rest = rest.to_vec();
    let worker = interp.clone();
    let completion = deliver_async(
        interp.runtime().as_ref(),
        move || function.call(&worker, &rest),
        |outcome| outcome.unwrap_or_else(Value::from),
    );
    Ok(Value::Channel(completion))
}

fn async_seq(interp: &Interp, args: &[Value]) -> Result<Value> {
    arity("async_seq", args, 1)?;
    let Value::List(items) = &args[0] else {
        return Err(mismatch("async_seq", "list", &args[0]));
    };
    let seq = AsyncSequence::with_runtime(Replay::new(items.clone()), Arc::clone(interp.runtime()));
    Ok(Value::Sequence(Arc::new(Mutex::new(seq))))
}

fn advance(_: &Interp, args: &[Value]) -> Result<Value> {
    arity("advance", args, 1)?;
    Ok(Value::Bool(sequence("advance", &args[0])?.lock().advance()?))
}

fn current(_: &Interp, args: &[Value]) -> Result<Value> {
    arity("current", args, 1)?;
    let seq = sequence("current", &args[0])?.lock();
    Ok(seq.current().cloned().unwrap_or(Value::Nil))
}

fn reset(_: &Interp, args: &[Value]) -> Result<Value> {
    arity("reset", args, 1)?;
    sequence("reset", &args[0])?.lock().reset()?;
    Ok(Value::Nil)
}

fn dispose(_: &Interp, args: &[Value]) -> Result<Value> {
    arity("dispose", args, 1)?;
    sequence("dispose", &args[0])?.lock().dispose();
    Ok(Value::Nil)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: i64) -> Value {
        Function::new("constant", move |_, _| Ok(Value::Int(value))).into()
    }

    #[test]
    fn table_has_every_command() {
        let mut names: Vec<_> = table().keys().copied().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            [
                "advance", "async_seq", "call_async", "chan", "current", "dispose", "receive",
                "reset", "select", "send", "try_receive"
            ]
        );
    }

    #[test]
    fn arity_is_checked() {
        let interp = Interp::new();
        assert!(matches!(interp.call("chan", &[Value::Nil]), Err(Error::InvalidArgument(_))));
        assert!(matches!(interp.call("receive", &[]), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn malformed_cases_are_rejected_before_blocking() {
        let interp = Interp::new();
        let chan = interp.call("chan", &[]).unwrap();

        let no_handler = Value::List(vec![chan.clone()]);
        assert!(matches!(interp.call("select", &[no_handler]), Err(Error::InvalidCase(_))));

        let not_a_function = Value::List(vec![chan.clone(), Value::Int(1)]);
        assert!(matches!(interp.call("select", &[not_a_function]), Err(Error::InvalidCase(_))));

        let bad_target = Value::List(vec![Value::Int(3), constant(0)]);
        assert!(matches!(interp.call("select", &[bad_target]), Err(Error::InvalidCase(_))));

        let bad_guard = Value::List(vec![Value::Int(1), chan, constant(0)]);
        assert!(matches!(interp.call("select", &[bad_guard]), Err(Error::InvalidCase(_))));
    }

    struct Discarding;

    impl crate::runtimes::Runtime for Discarding {
        fn spawn(&self, job: crate::runtimes::Job) -> Result<()> {
            drop(job);
            Ok(())
        }
    }

    #[test]
    fn call_async_answers_when_the_runtime_drops_the_job() {
        let interp = Interp::new().with_runtime(Arc::new(Discarding));
        let completion = interp.call("call_async", &[constant(1)]).unwrap();
        assert!(matches!(interp.call("receive", &[completion]), Err(Error::Abandoned)));
    }

    #[test]
    fn raise_unwraps_errors() {
        assert_eq!(raise(Value::Int(1)).unwrap(), Value::Int(1));
        assert!(matches!(raise(Error::EmptySelect.into()), Err(Error::EmptySelect)));
    }
}
