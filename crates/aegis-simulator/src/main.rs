//! Console bench for the aegis access-control station.
//!
//! Runs the station control loop on the host with an in-memory radio link to
//! a key fob, a simulated button and a file-backed violation counter.
//! Everything the display and buzzer would show is logged instead.
//!
//! # Commands
//!
//! | Line      | Action                                   |
//! |-----------|------------------------------------------|
//! | `press`   | Press the station button                 |
//! | `fob`     | Press the key fob (sends the credential) |
//! | `restart` | Power-cycle the station                  |
//! | `status`  | Log the current security state           |
//! | `quit`    | Exit                                     |
//! | other     | Transmitted verbatim by the fob          |
//!
//! Run with `RUST_LOG=debug` to see radio traffic sizes and store writes.

mod console;
mod settings;
mod store;

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use aegis_core::app_state::SecurityChannel;
use aegis_core::config::StationConfig;
use aegis_core::fob::KeyFob;
use aegis_core::input::{DebouncedButton, factory_reset_requested};
use aegis_core::presentation::{AlertTone, PresentationSink, ScreenMode, present};
use aegis_core::radio::LoopbackRadio;
use aegis_core::security::Credential;
use aegis_core::{AuthStateMachine, BootMode, Station, StoreError};
use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use console::{Command, SimulatedPin};
use settings::{DEV_CREDENTIAL, SimSettings};
use store::FileCounterStore;

/// The siren sounds every tick; only log it this often.
const SIREN_LOG_INTERVAL: Duration = Duration::from_secs(2);

type SimStation<'a> =
    Station<'a, FileCounterStore, LoopbackRadio, DebouncedButton<SimulatedPin>>;

// ---------------------------------------------------------------------------
// Host stand-ins for the firmware's peripherals
// ---------------------------------------------------------------------------

struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns.into()));
    }
}

/// Presentation sink that logs screen changes and buzzer cues
#[derive(Default)]
struct LogSink {
    screen: Option<ScreenMode>,
    last_siren: Option<Instant>,
}

impl PresentationSink for LogSink {
    fn render(&mut self, screen: ScreenMode) {
        if self.screen != Some(screen) {
            info!("Screen: {:?}", screen);
            self.screen = Some(screen);
        }
    }

    fn alert(&mut self, tone: AlertTone) {
        match tone {
            AlertTone::Siren => {
                if self
                    .last_siren
                    .is_none_or(|at| at.elapsed() >= SIREN_LOG_INTERVAL)
                {
                    warn!("Buzzer: siren");
                    self.last_siren = Some(Instant::now());
                }
            }
            other => info!("Buzzer: {:?}", other),
        }
    }
}

/// Forward stdin lines to the control loop without blocking it.
fn spawn_console() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

// ---------------------------------------------------------------------------
// Boot
// ---------------------------------------------------------------------------

/// Power up the station: boot window, counter store, state machine.
fn boot_station<'a>(
    settings: &SimSettings,
    config: &StationConfig<'_>,
    credential: &Credential,
    radio: LoopbackRadio,
    pin: &SimulatedPin,
    channel: &'a SecurityChannel,
) -> Result<SimStation<'a>, StoreError> {
    let mode = if factory_reset_requested(
        &mut pin.clone(),
        config.factory_reset_samples,
        &mut StdDelay,
    ) {
        BootMode::FactoryReset
    } else {
        BootMode::Normal
    };

    let store = FileCounterStore::open(&settings.state_dir)?;
    info!("Counter store: {}", store.path().display());

    let machine = AuthStateMachine::boot(store, credential.clone(), mode);
    let button = DebouncedButton::new(pin.clone(), config.debounce_ticks);
    let station = Station::new(machine, radio, button);

    Ok(match channel.publisher() {
        Ok(publisher) => station.with_publisher(publisher),
        Err(e) => {
            warn!("No publisher slot ({:?}); notifications will not be logged", e);
            station
        }
    })
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting aegis simulator");

    let settings = match SimSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    if settings.credential == DEV_CREDENTIAL {
        warn!("AEGIS_CREDENTIAL not set, using the development credential");
    }

    let mut config = StationConfig::new(&settings.credential);
    config.radio = settings.radio;
    let credential = match config.validate().and_then(|()| Credential::new(config.credential)) {
        Ok(credential) => credential,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    info!(
        "Simulated link: {} Hz, sync word {:#04x}, SF{}",
        config.radio.frequency_hz, config.radio.sync_word, config.radio.spreading_factor
    );
    info!("Commands: press  fob  restart  status  quit  (anything else is sent by the fob)");

    let channel = SecurityChannel::new();
    let mut notifications = match channel.subscriber() {
        Ok(subscriber) => subscriber,
        Err(e) => {
            error!("Notification channel unavailable: {:?}", e);
            std::process::exit(1);
        }
    };

    let (station_radio, fob_radio) = LoopbackRadio::pair();
    let mut fob = KeyFob::new(fob_radio, credential.clone());
    let pin = SimulatedPin::default();
    let mut sink = LogSink::default();

    if settings.factory_reset {
        info!("Holding the station button through the boot window");
        pin.hold_for(config.factory_reset_samples.into());
    }

    let boot = |radio| boot_station(&settings, &config, &credential, radio, &pin, &channel);
    let mut station = match boot(station_radio) {
        Ok(station) => station,
        Err(e) => {
            error!("Counter store unavailable: {}", e);
            std::process::exit(1);
        }
    };

    let console = spawn_console();
    let tick = Duration::from_millis(config.tick_ms.into());

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------
    'running: loop {
        let tick_start = Instant::now();

        // --- Console ------------------------------------------------------
        match console.try_recv() {
            Ok(line) => match Command::parse(&line) {
                Some(Command::Press) => pin.hold_for(u32::from(config.debounce_ticks) + 2),
                Some(Command::Fob) => {
                    if let Err(e) = fob.press() {
                        warn!("Fob transmit failed: {}", e);
                    }
                }
                Some(Command::Transmit(token)) => {
                    if let Err(e) = fob.send_line(token) {
                        warn!("Fob transmit failed: {}", e);
                    }
                }
                Some(Command::Restart) => {
                    info!("Power-cycling the station");
                    // Drop everything but the radio; the new machine sees only what the store holds
                    let (_, radio, _) = station.into_parts();
                    station = match boot(radio) {
                        Ok(station) => station,
                        Err(e) => {
                            error!("Counter store unavailable: {}", e);
                            std::process::exit(1);
                        }
                    };
                }
                Some(Command::Status) => info!("State: {:?}", station.snapshot()),
                Some(Command::Quit) => break 'running,
                None => {}
            },
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => break 'running,
        }

        // --- Station tick -------------------------------------------------
        let report = station.tick();
        present(&mut sink, &report);

        while let Some(notification) = notifications.try_next_message_pure() {
            info!("Notification: {:?}", notification);
        }

        // --- Tick pacing --------------------------------------------------
        let elapsed = tick_start.elapsed();
        if elapsed < tick {
            thread::sleep(tick - elapsed);
        }
    }

    info!("Simulator exiting in state {:?}", station.snapshot());
}
