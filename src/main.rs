//! RelayNode firmware entry point.
//!
//! Hexagonal architecture with a single-threaded control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  RelayPin + BlockingDelay   UartPort      NvsAdapter           │
//! │  (gpio provider)            (dual / stm)  (Config + Storage)   │
//! │  RtcMemory                  SystemClock   LogStatusSink        │
//! │  (FastMemory)               (Clock)       (observer)           │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            RelayService (pure logic)                   │    │
//! │  │  table · sync · flood · pulse timers · persistence     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Terminal (console lines) · DualLink poll (co-processor)       │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::cell::RefCell;
use std::io::BufRead;
use std::rc::Rc;
use std::sync::mpsc;

use anyhow::{Context, Result};
use embassy_time::Duration;
use log::{error, info, warn};

use relaynode::adapters::hardware::RelayPin;
use relaynode::adapters::log_sink::LogStatusSink;
use relaynode::adapters::nvs::NvsAdapter;
use relaynode::adapters::rtcmem::RtcMemory;
use relaynode::adapters::time::{BlockingDelay, SystemClock};
use relaynode::adapters::uart::UartPort;
use relaynode::app::ports::ConfigPort;
use relaynode::app::service::RelayService;
use relaynode::app::terminal;
use relaynode::config::{ProviderKind, RelayConfig, SystemConfig};
use relaynode::drivers::dual::DualLink;
use relaynode::drivers::gpio::GpioProvider;
use relaynode::drivers::stm::StmProvider;
use relaynode::drivers::{hw_init, DummyProvider, RelayProvider};
use relaynode::persistence::Persistence;
use relaynode::pins;

/// Control loop period.
const LOOP_INTERVAL_MS: u64 = 10;

type SharedUart = Rc<RefCell<UartPort>>;

/// Build the provider for one configured relay.
fn build_provider(
    cfg: &SystemConfig,
    relay: &RelayConfig,
    relay_id: usize,
    uart: &SharedUart,
    dual: &mut Option<Rc<RefCell<DualLink<SharedUart>>>>,
    stm_index: &mut u8,
) -> Option<Box<dyn RelayProvider>> {
    match relay.provider {
        ProviderKind::None => None,
        ProviderKind::Dummy => Some(Box::new(DummyProvider)),
        ProviderKind::Gpio => {
            let pin = RelayPin::new(relay.pin?);
            let reset = relay.reset_pin.map(RelayPin::new);
            let provider = GpioProvider::new(relay.gpio_kind, pin, reset, BlockingDelay)
                .with_latch_pulse(cfg.latching_pulse_ms);
            Some(Box::new(provider))
        }
        ProviderKind::Dual => {
            let link = dual.get_or_insert_with(|| DualLink::new(Rc::clone(uart)));
            let provider = DualLink::attach(link, relay_id)?;
            Some(Box::new(provider))
        }
        ProviderKind::Stm => {
            let provider = StmProvider::new(Rc::clone(uart), *stm_index);
            *stm_index += 1;
            Some(Box::new(provider))
        }
    }
}

/// Console lines, read on their own thread so the control loop never blocks.
fn spawn_console() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("console".into())
        .stack_size(4096)
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("console thread")?;
    Ok(rx)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  RelayNode v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new().context("NVS init")?;
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 3. Initialise hardware peripherals ────────────────────
    let outputs: heapless::Vec<u8, 64> = config
        .relays
        .iter()
        .filter(|r| r.provider == ProviderKind::Gpio)
        .flat_map(|r| r.pin.into_iter().chain(r.reset_pin))
        .collect();
    hw_init::init_relay_outputs(&outputs).context("relay outputs")?;

    let needs_uart = config
        .relays
        .iter()
        .any(|r| matches!(r.provider, ProviderKind::Dual | ProviderKind::Stm));
    if needs_uart {
        hw_init::init_relay_uart().context("relay UART")?;
    }
    let uart: SharedUart = Rc::new(RefCell::new(UartPort::new(pins::RELAY_UART_PORT)));

    // ── 4. Construct the service ──────────────────────────────
    let persistence = Persistence::new(
        Box::new(RtcMemory::new()),
        Box::new(NvsAdapter::new().context("NVS storage")?),
        Duration::from_millis(u64::from(config.save_delay_ms)),
    );
    let mut service = RelayService::new(config.clone(), SystemClock::new(), persistence);

    let mut dual = None;
    let mut stm_index = 0u8;
    for relay in &config.relays {
        let relay_id = service.count();
        let Some(provider) =
            build_provider(&config, relay, relay_id, &uart, &mut dual, &mut stm_index)
        else {
            warn!("relay{}: no provider for {:?}", relay_id, relay.provider);
            continue;
        };
        if service.add_relay_with(provider, relay).is_none() {
            error!("relay{}: not added", relay_id);
        }
    }
    for _ in 0..config.dummy_count {
        let dummy = RelayConfig::default();
        if service.add_relay_with(Box::new(DummyProvider), &dummy).is_none() {
            warn!("dummy relay not added");
        }
    }

    service.on_status_change(LogStatusSink::new().into_observer());
    service.boot();

    let console = spawn_console()?;
    info!("System ready: {} relays. Entering control loop.", service.count());

    // ── 5. Control loop ───────────────────────────────────────
    let mut out = String::new();
    loop {
        service.tick();

        if let Some(link) = &dual {
            let requests = link.borrow_mut().poll();
            for (id, status) in requests {
                service.set_status(id, status);
            }
        }

        while let Ok(line) = console.try_recv() {
            out.clear();
            match terminal::execute(&mut service, &line, &mut out) {
                Ok(true) => print!("{}", out),
                Ok(false) => println!("-ERROR: Unknown command"),
                Err(e) => warn!("terminal: {}", e),
            }
        }

        std::thread::sleep(std::time::Duration::from_millis(LOOP_INTERVAL_MS));
    }
}
