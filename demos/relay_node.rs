//! Desktop side of the four-channel relay demo.
//!
//! ch0: greeting strings both ways
//! ch1/ch2: a UInt32 counter ping-ponged with the remote node
//! ch3: an array of four Bools telling which channels had data this tick
//!
//! Usage: `relay_node [config.json]` (defaults to demos/relay_node.json)

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use wireless::logging::init_logging;
use wireless::{Channel, Value, Wireless};

const GREETING: &str = "Hello. I'm Rust";

/// Counter to send next: an incoming UInt32 plus one, 0 for anything else.
fn next_counter(received: Option<&Value>) -> u32 {
    match received {
        Some(Value::UInt32(v)) => v.wrapping_add(1),
        _ => 0,
    }
}

/// If `rx` has a counter, forward it incremented on `tx`; otherwise restart at 0.
fn relay_counter(wl: &Wireless, rx: Channel, tx: Channel) -> wireless::Result<bool> {
    let received = wl.read(rx)?;
    match &received {
        Some(Value::UInt32(v)) => log::info!("received (ch{}): {}", rx, v),
        Some(other) => log::warn!("ignoring non-UInt32 counter on ch{}: {}", rx, other),
        None => {}
    }
    let next = next_counter(received.as_ref());
    wl.write(&Value::UInt32(next), tx)?;
    log::info!("sent (ch{}): {}", tx, next);
    Ok(received.is_some())
}

fn tick(wl: &Wireless) -> wireless::Result<()> {
    let b0 = wl.available(0)? > 0;
    if let Some(msg) = wl.read(0)? {
        log::info!("received (ch0): {}", msg);
    }
    wl.write(&Value::from(GREETING), 0)?;
    log::info!("sent (ch0): \"{}\"", GREETING);

    let b1 = relay_counter(wl, 1, 2)?;
    let b2 = relay_counter(wl, 2, 1)?;

    let b3 = wl.available(3)? > 0;
    if let Some(flags) = wl.read(3)? {
        log::info!("received (ch3): {}", flags);
    }
    let flags = Value::Array([b0, b1, b2, b3].into_iter().map(Value::Bool).collect());
    wl.write(&flags, 3)?;
    log::info!("sent (ch3): {}", flags);
    Ok(())
}

fn main() -> wireless::Result<()> {
    init_logging();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "demos/relay_node.json".to_string());
    log::info!("=== Relay Node Demo (Rust) ===");
    log::info!("Loading config from {}", config_path);
    let wl = Wireless::load(&config_path)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Shutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .ok();

    while running.load(Ordering::Relaxed) {
        if let Err(e) = tick(&wl) {
            log::warn!("tick failed: {}", e);
        }
        thread::sleep(Duration::from_secs(1));
    }

    wl.deactivate()
}
