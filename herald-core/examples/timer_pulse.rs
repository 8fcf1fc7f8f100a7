use herald_core::{Callback, Event, Mediator};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("herald_core=debug".parse()?))
        .init();

    let mediator = Mediator::new();
    let fast = Arc::new(AtomicUsize::new(0));
    let slow = Arc::new(AtomicUsize::new(0));

    {
        let fast = fast.clone();
        mediator.subscribe(
            "timer:100",
            Callback::new(move |_e: &mut Event| json!(fast.fetch_add(1, Ordering::SeqCst) + 1)),
        )?;
    }
    {
        let slow = slow.clone();
        mediator.subscribe(
            "timer:250",
            Callback::new(move |_e: &mut Event| json!(slow.fetch_add(1, Ordering::SeqCst) + 1)),
        )?;
    }
    mediator.subscribe(
        "timer",
        Callback::new(|e: &mut Event| e.previous_result().cloned().unwrap_or(Value::Null)),
    )?;

    // 由宿主循环驱动定时事件
    for pulse in 0..12 {
        std::thread::sleep(Duration::from_millis(50));
        let last = mediator.publish(Event::new("timer"));
        info!(pulse, ?last, "timer pulse");
    }

    println!(
        "timer:100 fired {} times, timer:250 fired {} times",
        fast.load(Ordering::SeqCst),
        slow.load(Ordering::SeqCst)
    );

    mediator.unsubscribe("timer:100", None)?;
    println!("remaining timer subscribers: {}", mediator.subscriber_count("timer"));
    Ok(())
}
