use futures::{stream, StreamExt};
use handoff::{
    sequence::{AsyncSequence, Blocking, Replay},
    Result,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut words = AsyncSequence::new(Replay::new(vec!["tick", "tock", "tick"]));
    while words.advance()? {
        println!("word: {}", words.current().copied().unwrap_or_default());
    }
    words.reset()?;
    let again: Vec<_> = words.by_ref().collect::<Result<_>>()?;
    println!("after reset: {again:?}");
    words.dispose();

    let squares = stream::iter(1..=5u64).map(|n| n * n);
    let total: u64 = AsyncSequence::new(Blocking::new(squares))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .sum();
    println!("sum of squares: {total}");
    Ok(())
}
