//! Async wait demo - await keys pushed by a producer thread.
//!
//! Run with: cargo run --example async_wait --features tokio
//!
//! A simulated source types a short response sequence with jittered delays;
//! the async consumer awaits each key and reports the inter-key interval.

use keyqueue::{CaptureConfig, KeyCapture, Modifiers, SimulatedSource, WaitOutcome};
use std::time::Duration;

#[tokio::main]
async fn main() -> keyqueue::Result<()> {
    let source = SimulatedSource::new();
    let keys = source.handle();

    let mut capture = KeyCapture::new(source, CaptureConfig::default().with_capacity(16))?;
    capture.register()?;

    let producer = std::thread::spawn(move || {
        for (i, c) in "fjfjF".chars().enumerate() {
            std::thread::sleep(Duration::from_millis(80 + 25 * i as u64));
            let mask = if c.is_uppercase() {
                Modifiers::SHIFT
            } else {
                Modifiers::empty()
            };
            keys.key_typed_with(c, mask);
        }
    });

    let mut previous = None;
    for _ in 0..5 {
        match capture.wait_for_key_async().await? {
            WaitOutcome::Key(event) => {
                let interval = previous
                    .map(|prev| event.timestamp.saturating_duration_since(prev))
                    .unwrap_or_default();
                println!(
                    "{:?} [{}] +{:.1} ms",
                    event.character,
                    event.modifiers,
                    interval.as_secs_f64() * 1000.0
                );
                previous = Some(event.timestamp);
            }
            other => {
                println!("stopped waiting: {other:?}");
                break;
            }
        }
    }

    producer
        .join()
        .map_err(|_| keyqueue::Error::ThreadError("producer panicked".into()))?;
    capture.unregister()
}
