#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::cell::RefCell;

use aegis_core::app_state::SECURITY_CHANNEL;
use aegis_core::input::{DebouncedButton, factory_reset_requested};
use aegis_core::presentation::{BuzzerSink, present};
use aegis_core::radio::Sx127x;
use aegis_core::security::Credential;
use aegis_core::storage::SdCardCounterStore;
use aegis_core::{AuthStateMachine, BootMode, Station};
use aegis_firmware::clock::FixedTimeSource;
use aegis_firmware::secrets;
use embassy_executor::Spawner;
use embassy_time::{Duration, Ticker, Timer};
use embedded_hal::delay::DelayNs;
use embedded_hal_bus::spi::RefCellDevice;
use esp_hal::Blocking;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::spi::Mode;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info};
use static_cell::StaticCell;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// Park the station without ever unlocking; only a power cycle gets out.
async fn halt(reason: &dyn core::fmt::Display) -> ! {
    loop {
        error!("Station halted: {}", reason);
        Timer::after(Duration::from_secs(5)).await;
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let station_config = match secrets::station_config() {
        Ok(config) => config,
        Err(e) => halt(&e).await,
    };
    let credential = match Credential::new(station_config.credential) {
        Ok(credential) => credential,
        Err(e) => halt(&e).await,
    };

    // 1. Station button (active low) and the boot-time factory reset window
    let mut button_pin = Input::new(
        peripherals.GPIO0,
        InputConfig::default().with_pull(Pull::Up),
    );
    let mut delay = Delay::new();
    let mode = if factory_reset_requested(
        &mut button_pin,
        station_config.factory_reset_samples,
        &mut delay,
    ) {
        BootMode::FactoryReset
    } else {
        BootMode::Normal
    };

    // 2. SPI bus shared by the radio and the SD card.
    //    SD cards must be initialised at 400 kHz or less; the radio's packets
    //    are short enough that it runs at the same rate.
    let spi_bus = Spi::new(
        peripherals.SPI2,
        SpiConfig::default()
            .with_frequency(Rate::from_khz(400))
            .with_mode(Mode::_0),
    )
    .unwrap()
    .with_sck(peripherals.GPIO36)
    .with_mosi(peripherals.GPIO37)
    .with_miso(peripherals.GPIO35);

    static SPI_BUS: StaticCell<RefCell<Spi<'static, Blocking>>> = StaticCell::new();
    let spi_bus = SPI_BUS.init(RefCell::new(spi_bus));

    let radio_cs = Output::new(peripherals.GPIO5, Level::High, OutputConfig::default());
    let sd_cs = Output::new(peripherals.GPIO4, Level::High, OutputConfig::default());
    let radio_spi = RefCellDevice::new(spi_bus, radio_cs, Delay::new()).unwrap();
    let sd_spi = RefCellDevice::new(spi_bus, sd_cs, Delay::new()).unwrap();

    // 3. LoRa transceiver: hardware reset, then configure for receive
    let mut radio_reset = Output::new(peripherals.GPIO6, Level::High, OutputConfig::default());
    radio_reset.set_low();
    delay.delay_ms(1);
    radio_reset.set_high();
    delay.delay_ms(10);

    let mut radio = Sx127x::new(radio_spi, Delay::new(), station_config.radio);
    if let Err(e) = radio.init() {
        halt(&e).await;
    }
    info!(
        "Radio listening on {} Hz, sync word {:#04x}",
        station_config.radio.frequency_hz, station_config.radio.sync_word
    );

    // 4. Violation counter on the SD card, then the state machine
    let sd_card = embedded_sdmmc::SdCard::new(sd_spi, Delay::new());
    let store = SdCardCounterStore::new(sd_card, FixedTimeSource);
    let machine = AuthStateMachine::boot(store, credential, mode);

    // 5. Control loop collaborators
    let button = DebouncedButton::new(button_pin, station_config.debounce_ticks);
    let buzzer = Output::new(peripherals.GPIO7, Level::Low, OutputConfig::default());
    let mut sink = BuzzerSink::new(buzzer);

    let mut notifications = SECURITY_CHANNEL
        .subscriber()
        .expect("Security channel has a free subscriber slot");
    let mut station = Station::new(machine, radio, button).with_publisher(
        SECURITY_CHANNEL
            .publisher()
            .expect("Security channel has a free publisher slot"),
    );

    info!("Station running, state {:?}", station.snapshot());

    // No background tasks yet; everything runs in the tick loop
    let _ = spawner;

    let mut ticker = Ticker::every(Duration::from_millis(station_config.tick_ms.into()));
    loop {
        let report = station.tick();
        present(&mut sink, &report);

        while let Some(notification) = notifications.try_next_message_pure() {
            info!("Notification: {:?}", notification);
        }

        ticker.next().await;
    }
}
