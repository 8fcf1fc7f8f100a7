use anyhow::Result as AnyResult;
use herald_core::{Callback, Event, ManualClock, Mediator, MediatorConfig};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn ticking(counter: &Arc<AtomicUsize>) -> Callback {
    let counter = counter.clone();
    Callback::new(move |_e: &mut Event| json!(counter.fetch_add(1, Ordering::SeqCst) + 1))
}

#[test]
fn timer_waits_one_interval_then_fires_once_and_reschedules() -> AnyResult<()> {
    let clock = Arc::new(ManualClock::new(10_000));
    let mediator = Mediator::with_clock(MediatorConfig::default(), clock.clone());
    let ticks = Arc::new(AtomicUsize::new(0));
    let cb = ticking(&ticks);
    mediator.subscribe("timer:200", cb.clone())?;

    // 注册时立即发布：不触发（桶存在，结果为 Null）
    assert_eq!(mediator.publish(Event::new("timer")), Some(Value::Null));
    assert_eq!(ticks.load(Ordering::SeqCst), 0);

    clock.advance(199);
    mediator.publish(Event::new("timer"));
    assert_eq!(ticks.load(Ordering::SeqCst), 0);

    clock.advance(1);
    assert_eq!(mediator.publish(Event::new("timer")), Some(json!(1)));
    // 同一时刻再次检查不会重复触发
    mediator.publish(Event::new("timer"));
    assert_eq!(ticks.load(Ordering::SeqCst), 1);

    clock.advance(200);
    mediator.publish(Event::new("timer"));
    assert_eq!(ticks.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn timer_fires_after_real_interval() -> AnyResult<()> {
    let mediator = Mediator::new();
    let ticks = Arc::new(AtomicUsize::new(0));
    mediator.subscribe("timer:200", ticking(&ticks))?;

    mediator.publish(Event::new("timer"));
    assert_eq!(ticks.load(Ordering::SeqCst), 0);

    std::thread::sleep(Duration::from_millis(210));
    mediator.publish(Event::new("timer"));
    mediator.publish(Event::new("timer"));
    assert_eq!(ticks.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn unsubscribing_a_timer_requires_the_matching_interval() -> AnyResult<()> {
    let clock = Arc::new(ManualClock::new(0));
    let mediator = Mediator::with_clock(MediatorConfig::default(), clock.clone());
    let ticks = Arc::new(AtomicUsize::new(0));
    let cb = ticking(&ticks);
    mediator.subscribe("timer:100", cb.clone())?;

    mediator.unsubscribe("timer:250", Some(&cb))?;
    assert!(mediator.has_subscribers("timer"));

    mediator.unsubscribe("timer:100", Some(&cb))?;
    assert!(!mediator.has_subscribers("timer"));
    Ok(())
}

#[test]
fn plain_timer_subscription_fires_on_every_pulse() -> AnyResult<()> {
    let clock = Arc::new(ManualClock::new(0));
    let mediator = Mediator::with_clock(MediatorConfig::default(), clock.clone());
    let every = Arc::new(AtomicUsize::new(0));
    let gated = Arc::new(AtomicUsize::new(0));
    mediator.subscribe("timer", ticking(&every))?;
    mediator.subscribe("timer:1000", ticking(&gated))?;

    for _ in 0..3 {
        clock.advance(400);
        mediator.publish(Event::new("timer"));
    }
    assert_eq!(every.load(Ordering::SeqCst), 3);
    assert_eq!(gated.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn cancelled_timer_pulse_skips_unforced_timers_without_consuming_them() -> AnyResult<()> {
    let clock = Arc::new(ManualClock::new(0));
    let mediator = Mediator::with_clock(MediatorConfig::default(), clock.clone());
    let ticks = Arc::new(AtomicUsize::new(0));
    mediator.subscribe("timer:100", ticking(&ticks))?;

    clock.set(100);
    let mut pulse = Event::new("timer");
    pulse.cancel();
    mediator.publish(pulse);
    assert_eq!(ticks.load(Ordering::SeqCst), 0);

    // 取消的那次没有推进下一次触发时间
    mediator.publish(Event::new("timer"));
    assert_eq!(ticks.load(Ordering::SeqCst), 1);
    Ok(())
}
