use handoff::{
    script::{Function, Interp, Value},
    Result,
};

fn main() -> Result<()> {
    let interp = Interp::from_env();

    let results = interp.call("chan", &[])?;
    let square = Function::new("square", |_, args| match args {
        [Value::Int(n)] => Ok(Value::Int(n * n)),
        _ => Ok(Value::Nil),
    });
    let printer = Function::new("print", |_, args| {
        println!("selected: {args:?}");
        Ok(Value::Nil)
    });

    let pending = interp.call("call_async", &[square.into(), Value::Int(12)])?;
    let selected = interp.call(
        "select",
        &[
            Value::List(vec![results.clone(), printer.clone().into()]),
            Value::List(vec![pending.clone(), printer.into()]),
        ],
    )?;
    println!("fired on {selected:?}, pending was {pending:?}");

    let seq = interp.call(
        "async_seq",
        &[Value::List(vec!["a".into(), "b".into()])],
    )?;
    while interp.call("advance", &[seq.clone()])? == Value::Bool(true) {
        println!("item {:?}", interp.call("current", &[seq.clone()])?);
    }
    interp.call("dispose", &[seq])?;
    Ok(())
}
