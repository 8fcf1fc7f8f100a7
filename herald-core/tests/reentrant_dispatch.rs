use anyhow::Result as AnyResult;
use herald_core::{Callback, Event, Mediator, Priority};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn counting(counter: &Arc<AtomicUsize>, ret: Value) -> Callback {
    let counter = counter.clone();
    Callback::new(move |_e: &mut Event| {
        counter.fetch_add(1, Ordering::SeqCst);
        ret.clone()
    })
}

#[test]
fn subscribe_inside_handler_takes_effect_on_next_publish() -> AnyResult<()> {
    let mediator = Mediator::new();
    let late = Arc::new(AtomicUsize::new(0));
    let late_cb = counting(&late, json!("late"));

    let adder = {
        let late_cb = late_cb.clone();
        Callback::new(move |e: &mut Event| {
            let m = e.mediator().cloned().expect("bound during publish");
            if m.is_subscribed("e", &late_cb).is_none() {
                m.subscribe_with("e", late_cb.clone(), Priority::Lowest, false)
                    .expect("valid subscription");
            }
            json!("adder")
        })
    };
    mediator.subscribe_with("e", adder, Priority::Urgent, false)?;

    assert_eq!(mediator.publish(Event::new("e")), Some(json!("adder")));
    assert_eq!(late.load(Ordering::SeqCst), 0);

    assert_eq!(mediator.publish(Event::new("e")), Some(json!("late")));
    assert_eq!(late.load(Ordering::SeqCst), 1);
    assert_eq!(mediator.subscriber_count("e"), 2);
    Ok(())
}

#[test]
fn unsubscribe_inside_handler_does_not_break_the_fold() -> AnyResult<()> {
    let mediator = Mediator::new();
    let victim_calls = Arc::new(AtomicUsize::new(0));
    let victim = counting(&victim_calls, json!("victim"));
    let tail_calls = Arc::new(AtomicUsize::new(0));
    let tail = counting(&tail_calls, json!("tail"));

    let remover = {
        let victim = victim.clone();
        Callback::new(move |e: &mut Event| {
            let m = e.mediator().cloned().expect("bound during publish");
            m.unsubscribe("e", Some(&victim)).expect("valid target");
            json!("remover")
        })
    };

    mediator.subscribe_with("e", remover.clone(), Priority::Urgent, false)?;
    mediator.subscribe_with("e", victim, Priority::Normal, false)?;
    mediator.subscribe_with("e", tail, Priority::Lowest, false)?;

    // 本轮折叠使用快照：被移除的订阅仍按原顺序执行一次，后续订阅不被跳过
    assert_eq!(mediator.publish(Event::new("e")), Some(json!("tail")));
    assert_eq!(victim_calls.load(Ordering::SeqCst), 1);
    assert_eq!(tail_calls.load(Ordering::SeqCst), 1);

    assert_eq!(mediator.publish(Event::new("e")), Some(json!("tail")));
    assert_eq!(victim_calls.load(Ordering::SeqCst), 1);
    assert_eq!(tail_calls.load(Ordering::SeqCst), 2);

    // 处理器退订自己
    let once = Arc::new(Mutex::new(None::<Callback>));
    let once_cb = {
        let once = once.clone();
        Callback::new(move |e: &mut Event| {
            if let Some(me) = once.lock().unwrap().take() {
                let m = e.mediator().cloned().expect("bound during publish");
                m.unsubscribe("once", Some(&me)).expect("valid target");
            }
            json!("once")
        })
    };
    *once.lock().unwrap() = Some(once_cb.clone());
    mediator.subscribe("once", once_cb)?;
    assert_eq!(mediator.publish(Event::new("once")), Some(json!("once")));
    assert!(!mediator.has_subscribers("once"));
    assert_eq!(mediator.publish(Event::new("once")), None);
    Ok(())
}

#[test]
fn nested_publish_has_its_own_result_chain() -> AnyResult<()> {
    let mediator = Mediator::new();
    let inner_saw = Arc::new(Mutex::new(Vec::new()));
    let outer_saw = Arc::new(Mutex::new(None));

    {
        let inner_saw = inner_saw.clone();
        mediator.subscribe(
            "inner",
            Callback::new(move |e: &mut Event| {
                inner_saw.lock().unwrap().push(e.previous_result().cloned());
                json!("inner-result")
            }),
        )?;
    }

    mediator.subscribe_with(
        "outer",
        Callback::new(|e: &mut Event| {
            let m = e.mediator().cloned().expect("bound during publish");
            let nested = m.publish(Event::new("inner"));
            assert_eq!(nested, Some(json!("inner-result")));
            json!("outer-first")
        }),
        Priority::High,
        false,
    )?;
    {
        let outer_saw = outer_saw.clone();
        mediator.subscribe(
            "outer",
            Callback::new(move |e: &mut Event| {
                *outer_saw.lock().unwrap() = e.previous_result().cloned();
                json!("outer-second")
            }),
        )?;
    }

    assert_eq!(mediator.publish(Event::new("outer")), Some(json!("outer-second")));
    assert_eq!(*inner_saw.lock().unwrap(), vec![None]);
    assert_eq!(*outer_saw.lock().unwrap(), Some(json!("outer-first")));
    Ok(())
}

#[test]
fn republishing_a_cloned_event_starts_a_fresh_fold() -> AnyResult<()> {
    let mediator = Mediator::new();
    let chains = Arc::new(Mutex::new(Vec::new()));
    {
        let chains = chains.clone();
        mediator.subscribe(
            "e",
            Callback::new(move |e: &mut Event| {
                chains.lock().unwrap().push(e.previous_results().len());
                json!("r")
            }),
        )?;
    }

    let mut event = Event::new("e");
    event.add_previous_result(json!("stale"));
    mediator.publish(event.clone());
    mediator.publish(event);
    assert_eq!(*chains.lock().unwrap(), vec![0, 0]);
    Ok(())
}

#[test]
fn mediator_is_usable_across_threads() -> AnyResult<()> {
    let mediator = Mediator::new();
    let hits = Arc::new(AtomicUsize::new(0));
    mediator.subscribe("tick", counting(&hits, Value::Null))?;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let m = mediator.clone();
            std::thread::spawn(move || {
                for _ in 0..25 {
                    m.publish(Event::new("tick"));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("publisher thread");
    }
    assert_eq!(hits.load(Ordering::SeqCst), 100);
    Ok(())
}
