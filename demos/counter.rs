//! Counter application: one store, a filtered display, a catch-all view and
//! a hook-style consumer.
//!
//! Run with `RUST_LOG=statebind=debug` to see commits and binding lifecycle.

use futures::executor::block_on;
use serde_json::{json, Map, Value};
use statebind::{subscribe, use_store, Binding, HeadlessHost, HeadlessRoot, Props, Store};
use tracing_subscriber::EnvFilter;

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("statebind=info")),
        )
        .init();

    println!("=== Counter Example ===\n");

    let counter = Store::named("counter", object(json!({ "count": 0, "step": 1 })));

    let display_host = HeadlessHost::new();
    let display = Binding::new()
        .component(|props: &Props| format!("[{}] count = {}", props["title"], props["count"]))
        .store(&counter)
        .map_to_props(|states| object(json!({ "count": states[0]["count"] })))
        .key_filter(["count"])
        .build()?
        .mount(object(json!({ "title": "display" })), display_host.clone());

    let everything_host = HeadlessHost::new();
    let everything = subscribe(|props: &Props| props["states"].to_string(), &counter)?
        .mount(Props::new(), everything_host.clone());

    let badge = HeadlessRoot::mount({
        let counter = counter.clone();
        move |scope| match use_store(scope, &counter) {
            Ok(state) => format!("badge: {}", state["count"]),
            Err(err) => format!("badge error: {err}"),
        }
    });

    println!("{}", display.render());

    for _ in 0..3 {
        block_on(counter.set_state_with(|state| {
            let count = state["count"].as_i64().unwrap_or(0);
            let step = state["step"].as_i64().unwrap_or(1);
            object(json!({ "count": count + step }))
        }))?;
        badge.flush();
        println!("{}", display.render());
    }

    println!("\nChanging the step only...");
    block_on(counter.set_state(object(json!({ "step": 5 }))))?;
    badge.flush();

    println!("{}", display.render());
    println!("{}", everything.render());
    println!("{}", badge.output().unwrap_or_default());
    println!(
        "\nRe-renders: display {}, catch-all {}, badge {}",
        display_host.renders(),
        everything_host.renders(),
        badge.renders() - 1
    );

    drop(display);
    drop(everything);
    badge.unmount();
    println!("Subscribers left: {}", counter.subscriber_count());

    Ok(())
}
