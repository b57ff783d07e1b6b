use handoff::{
    call_async, call_async_on, run_async,
    runtimes::thread::Threads,
    Channel, Config, Error, Select,
};
use std::{thread, time::Duration};

#[test]
fn result_arrives_on_returned_channel() {
    let chan = call_async(|| {
        thread::sleep(Duration::from_millis(10));
        Ok(vec![1, 2, 3])
    });
    assert_eq!(chan.receive().unwrap(), vec![1, 2, 3]);
}

#[test]
fn second_receive_never_completes() {
    let chan = call_async(|| Ok(1));
    assert_eq!(chan.receive().unwrap(), 1);

    let finished = Channel::new();
    let blocked = {
        let chan = chan.clone();
        let finished = finished.clone();
        thread::spawn(move || {
            let _ = chan.receive();
            finished.send(());
        })
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!finished.is_ready());

    // Feed the stranded receiver so the test thread can finish.
    chan.send(Ok(0));
    finished.receive();
    blocked.join().unwrap();
}

#[test]
fn failures_do_not_strand_the_receiver() {
    let failed = call_async::<u8, _>(|| Err(Error::Source("no luck".into())));
    assert!(matches!(failed.receive(), Err(Error::Source(_))));

    let panicked = call_async::<u8, _>(|| panic!("worker down"));
    assert!(matches!(panicked.receive(), Err(Error::Panicked(m)) if m == "worker down"));
}

#[test]
fn completion_channels_compose_with_select() {
    let slow = call_async(|| {
        thread::sleep(Duration::from_millis(100));
        Ok("slow")
    });
    let fast = call_async(|| Ok("fast"));

    let selected = Select::new()
        .recv(&slow, |r| r.unwrap())
        .recv(&fast, |r| r.unwrap())
        .wait()
        .unwrap();
    assert_eq!(selected.output, "fast");
    assert_eq!(slow.receive().unwrap(), "slow");
}

#[test]
fn runs_on_configured_threads() {
    let runtime = Threads::new(Config::default().with_thread_name("calc"));
    let name = call_async_on(&runtime, || {
        Ok(thread::current().name().unwrap_or_default().to_string())
    });
    assert_eq!(name.receive().unwrap(), "calc");

    let done = run_async(|| {});
    assert!(done.receive().is_ok());
}

#[cfg(feature = "runtime-tokio")]
#[test]
fn shut_down_tokio_runtime_still_answers() {
    use handoff::runtimes::tokio::Blocking;

    let rt = tokio::runtime::Runtime::new().unwrap();
    let runtime = Blocking::new(rt.handle().clone());
    rt.shutdown_background();

    let result = call_async_on(&runtime, || Ok(42));
    assert!(matches!(result.receive(), Err(Error::Abandoned)));
}
