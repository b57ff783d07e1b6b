use handoff::{call_async, Channel, Result, Select};
use std::{thread, time::Duration};

fn worker(name: &'static str, delay_ms: u64) -> Channel<Result<String>> {
    call_async(move || {
        thread::sleep(Duration::from_millis(delay_ms));
        Ok(format!("{name} finished after {delay_ms}ms"))
    })
}

fn main() -> Result<()> {
    let workers = [worker("alpha", 60), worker("beta", 20), worker("gamma", 40)];

    for _ in 0..workers.len() {
        let selected = Select::new()
            .recv(&workers[0], |r| r)
            .recv(&workers[1], |r| r)
            .recv(&workers[2], |r| r)
            .wait()?;
        println!("{}", selected.output?);
    }

    let idle: Channel<()> = Channel::new();
    let polled = Select::new()
        .recv(&idle, |()| "got a value")
        .default(|| "nothing ready, moving on")
        .wait()?;
    println!("{}", polled.output);
    Ok(())
}
