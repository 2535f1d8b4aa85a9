//! Semtech SX1276/77/78 LoRa transceiver driver
//!
//! Blocking register access over any `embedded_hal` SPI device. The chip sits
//! in continuous receive; [`RadioLink::try_receive`] drains at most one packet
//! per call and [`RadioLink::send`] switches to transmit and back.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Operation, SpiDevice};
use log::{debug, info};

use crate::app_state::RadioError;
use crate::config::RadioConfig;

use super::{MAX_FRAME_LEN, RadioLink, RadioMessage};

// Register map (LoRa mode)
const REG_FIFO: u8 = 0x00;
const REG_OP_MODE: u8 = 0x01;
const REG_FRF_MSB: u8 = 0x06;
const REG_FRF_MID: u8 = 0x07;
const REG_FRF_LSB: u8 = 0x08;
const REG_PA_CONFIG: u8 = 0x09;
const REG_LNA: u8 = 0x0C;
const REG_FIFO_ADDR_PTR: u8 = 0x0D;
const REG_FIFO_TX_BASE_ADDR: u8 = 0x0E;
const REG_FIFO_RX_BASE_ADDR: u8 = 0x0F;
const REG_FIFO_RX_CURRENT_ADDR: u8 = 0x10;
const REG_IRQ_FLAGS: u8 = 0x12;
const REG_RX_NB_BYTES: u8 = 0x13;
const REG_PKT_RSSI_VALUE: u8 = 0x1A;
const REG_MODEM_CONFIG_1: u8 = 0x1D;
const REG_MODEM_CONFIG_2: u8 = 0x1E;
const REG_PAYLOAD_LENGTH: u8 = 0x22;
const REG_MODEM_CONFIG_3: u8 = 0x26;
const REG_SYNC_WORD: u8 = 0x39;
const REG_VERSION: u8 = 0x42;

// RegOpMode
const MODE_LONG_RANGE: u8 = 0x80;
const MODE_SLEEP: u8 = 0x00;
const MODE_STDBY: u8 = 0x01;
const MODE_TX: u8 = 0x03;
const MODE_RX_CONTINUOUS: u8 = 0x05;

// RegIrqFlags
const IRQ_TX_DONE: u8 = 0x08;
const IRQ_PAYLOAD_CRC_ERROR: u8 = 0x20;
const IRQ_RX_DONE: u8 = 0x40;

const SPI_WRITE: u8 = 0x80;

/// RegVersion of every SX1276/77/78/79 silicon revision shipped so far
const CHIP_VERSION: u8 = 0x12;

const CRYSTAL_HZ: u64 = 32_000_000;

/// Explicit header, 125 kHz bandwidth, coding rate 4/5
const MODEM_CONFIG_1_DEFAULT: u8 = 0x72;

/// LowDataRateOptimize off, AGC auto on
const MODEM_CONFIG_3_AGC_AUTO: u8 = 0x04;

const TX_POLL_INTERVAL_US: u32 = 100;

/// A short packet at SF12 is on air for well under two seconds
const TX_POLL_LIMIT: u32 = 20_000;

pub struct Sx127x<SPI, D> {
    spi: SPI,
    delay: D,
    config: RadioConfig,
    last_rssi_dbm: Option<i16>,
}

impl<SPI, D> Sx127x<SPI, D>
where
    SPI: SpiDevice<u8>,
    D: DelayNs,
{
    pub fn new(spi: SPI, delay: D, config: RadioConfig) -> Self {
        Self {
            spi,
            delay,
            config,
            last_rssi_dbm: None,
        }
    }

    /// Probe the chip, apply the channel configuration and start receiving.
    pub fn init(&mut self) -> Result<(), RadioError> {
        let version = self.read_register(REG_VERSION)?;
        if version != CHIP_VERSION {
            return Err(RadioError::UnknownChip { version });
        }

        // LoRa mode can only be selected while asleep
        self.set_mode(MODE_SLEEP)?;
        self.set_frequency(self.config.frequency_hz)?;

        self.write_register(REG_FIFO_TX_BASE_ADDR, 0)?;
        self.write_register(REG_FIFO_RX_BASE_ADDR, 0)?;

        // Max LNA gain boost on the HF port
        let lna = self.read_register(REG_LNA)?;
        self.write_register(REG_LNA, lna | 0x03)?;

        self.write_register(REG_MODEM_CONFIG_1, MODEM_CONFIG_1_DEFAULT)?;
        self.write_register(REG_MODEM_CONFIG_3, MODEM_CONFIG_3_AGC_AUTO)?;
        self.set_tx_power(self.config.tx_power_dbm)?;
        self.set_spreading_factor(self.config.spreading_factor)?;

        let modem_config_2 = self.read_register(REG_MODEM_CONFIG_2)?;
        self.write_register(REG_MODEM_CONFIG_2, modem_config_2 | 0x04)?;

        self.write_register(REG_SYNC_WORD, self.config.sync_word)?;

        self.set_mode(MODE_STDBY)?;
        self.set_mode(MODE_RX_CONTINUOUS)?;

        info!(
            "SX127x ready: {} Hz, SF{}, sync word {:#04x}",
            self.config.frequency_hz, self.config.spreading_factor, self.config.sync_word
        );
        Ok(())
    }

    /// RSSI of the last packet received, in dBm
    pub fn last_rssi_dbm(&self) -> Option<i16> {
        self.last_rssi_dbm
    }

    pub fn release(self) -> (SPI, D) {
        (self.spi, self.delay)
    }

    fn set_mode(&mut self, mode: u8) -> Result<(), RadioError> {
        self.write_register(REG_OP_MODE, MODE_LONG_RANGE | mode)
    }

    fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), RadioError> {
        let frf = ((frequency_hz as u64) << 19) / CRYSTAL_HZ;
        self.write_register(REG_FRF_MSB, (frf >> 16) as u8)?;
        self.write_register(REG_FRF_MID, (frf >> 8) as u8)?;
        self.write_register(REG_FRF_LSB, frf as u8)
    }

    fn set_tx_power(&mut self, dbm: u8) -> Result<(), RadioError> {
        let level = dbm.clamp(2, 17);
        self.write_register(REG_PA_CONFIG, 0x80 | (level - 2))
    }

    fn set_spreading_factor(&mut self, sf: u8) -> Result<(), RadioError> {
        // SF6 needs implicit headers, which this protocol does not use
        let sf = sf.clamp(7, 12);
        let modem_config_2 = self.read_register(REG_MODEM_CONFIG_2)?;
        self.write_register(REG_MODEM_CONFIG_2, (modem_config_2 & 0x0F) | (sf << 4))
    }

    fn poll_packet(&mut self) -> Result<Option<RadioMessage>, RadioError> {
        let flags = self.read_register(REG_IRQ_FLAGS)?;
        if flags & IRQ_RX_DONE == 0 {
            return Ok(None);
        }
        // Flags clear by writing them back
        self.write_register(REG_IRQ_FLAGS, flags)?;

        if flags & IRQ_PAYLOAD_CRC_ERROR != 0 {
            debug!("Dropping packet with CRC error");
            return Ok(None);
        }

        let len = self.read_register(REG_RX_NB_BYTES)? as usize;
        let start = self.read_register(REG_FIFO_RX_CURRENT_ADDR)?;
        self.write_register(REG_FIFO_ADDR_PTR, start)?;

        let mut frame = [0u8; MAX_FRAME_LEN];
        self.read_fifo(&mut frame[..len])?;

        let rssi = self.read_register(REG_PKT_RSSI_VALUE)?;
        self.last_rssi_dbm = Some(i16::from(rssi) - 157);
        debug!("Received {} byte packet at {} dBm", len, i16::from(rssi) - 157);

        Ok(RadioMessage::from_frame(&frame[..len]))
    }

    fn transmit(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        self.set_mode(MODE_STDBY)?;
        self.write_register(REG_FIFO_ADDR_PTR, 0)?;
        self.write_fifo(payload)?;
        self.write_register(REG_PAYLOAD_LENGTH, payload.len() as u8)?;
        self.set_mode(MODE_TX)?;

        let mut done = false;
        for _ in 0..TX_POLL_LIMIT {
            if self.read_register(REG_IRQ_FLAGS)? & IRQ_TX_DONE != 0 {
                done = true;
                break;
            }
            self.delay.delay_us(TX_POLL_INTERVAL_US);
        }

        self.write_register(REG_IRQ_FLAGS, IRQ_TX_DONE)?;
        self.set_mode(MODE_RX_CONTINUOUS)?;

        if done { Ok(()) } else { Err(RadioError::TxTimeout) }
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, RadioError> {
        let mut value = [0u8];
        self.spi
            .transaction(&mut [Operation::Write(&[reg & !SPI_WRITE]), Operation::Read(&mut value)])
            .map_err(bus_error)?;
        Ok(value[0])
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), RadioError> {
        self.spi
            .write(&[reg | SPI_WRITE, value])
            .map_err(bus_error)
    }

    fn read_fifo(&mut self, buf: &mut [u8]) -> Result<(), RadioError> {
        self.spi
            .transaction(&mut [Operation::Write(&[REG_FIFO]), Operation::Read(buf)])
            .map_err(bus_error)
    }

    fn write_fifo(&mut self, data: &[u8]) -> Result<(), RadioError> {
        self.spi
            .transaction(&mut [Operation::Write(&[REG_FIFO | SPI_WRITE]), Operation::Write(data)])
            .map_err(bus_error)
    }
}

impl<SPI, D> RadioLink for Sx127x<SPI, D>
where
    SPI: SpiDevice<u8>,
    D: DelayNs,
{
    fn try_receive(&mut self) -> Option<RadioMessage> {
        match self.poll_packet() {
            Ok(message) => message,
            Err(e) => {
                debug!("Radio poll failed: {}", e);
                None
            }
        }
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(RadioError::PayloadTooLarge { len: payload.len() });
        }
        self.transmit(payload)
    }
}

fn bus_error<E: embedded_hal::spi::Error>(e: E) -> RadioError {
    debug!("SPI error: {:?}", e.kind());
    RadioError::Bus
}

#[cfg(test)]
mod tests {
    use super::*;

    use embedded_hal::spi::{ErrorKind, ErrorType};

    #[derive(Debug)]
    struct BusFault;

    impl embedded_hal::spi::Error for BusFault {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    /// Register-level model of the chip, just enough for the driver's access pattern.
    struct FakeChip {
        regs: [u8; 0x80],
        fifo: [u8; 256],
        sent: Vec<Vec<u8>>,
        tx_stuck: bool,
        bus_down: bool,
    }

    impl FakeChip {
        fn new() -> Self {
            let mut regs = [0u8; 0x80];
            regs[REG_VERSION as usize] = CHIP_VERSION;
            Self {
                regs,
                fifo: [0; 256],
                sent: Vec::new(),
                tx_stuck: false,
                bus_down: false,
            }
        }

        fn reg(&self, reg: u8) -> u8 {
            self.regs[reg as usize]
        }

        /// Place a packet in the FIFO as the modem would on reception.
        fn deliver(&mut self, payload: &[u8], crc_error: bool) {
            let start = 0x40u8;
            // The FIFO is circular; long packets wrap past the top
            for (i, byte) in payload.iter().enumerate() {
                self.fifo[start.wrapping_add(i as u8) as usize] = *byte;
            }
            self.regs[REG_FIFO_RX_CURRENT_ADDR as usize] = start;
            self.regs[REG_RX_NB_BYTES as usize] = payload.len() as u8;
            self.regs[REG_PKT_RSSI_VALUE as usize] = 100;
            let mut flags = IRQ_RX_DONE;
            if crc_error {
                flags |= IRQ_PAYLOAD_CRC_ERROR;
            }
            self.regs[REG_IRQ_FLAGS as usize] |= flags;
        }

        fn read(&mut self, addr: u8) -> u8 {
            if addr == REG_FIFO {
                let ptr = self.regs[REG_FIFO_ADDR_PTR as usize];
                self.regs[REG_FIFO_ADDR_PTR as usize] = ptr.wrapping_add(1);
                return self.fifo[ptr as usize];
            }
            self.regs[addr as usize]
        }

        fn write(&mut self, addr: u8, value: u8) {
            match addr {
                REG_FIFO => {
                    let ptr = self.regs[REG_FIFO_ADDR_PTR as usize];
                    self.fifo[ptr as usize] = value;
                    self.regs[REG_FIFO_ADDR_PTR as usize] = ptr.wrapping_add(1);
                }
                REG_IRQ_FLAGS => self.regs[addr as usize] &= !value,
                REG_OP_MODE => {
                    self.regs[addr as usize] = value;
                    if value & 0x07 == MODE_TX && !self.tx_stuck {
                        let len = self.reg(REG_PAYLOAD_LENGTH) as usize;
                        self.sent.push(self.fifo[..len].to_vec());
                        self.regs[REG_IRQ_FLAGS as usize] |= IRQ_TX_DONE;
                    }
                }
                _ => self.regs[addr as usize] = value,
            }
        }
    }

    impl ErrorType for FakeChip {
        type Error = BusFault;
    }

    impl SpiDevice<u8> for FakeChip {
        fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), BusFault> {
            if self.bus_down {
                return Err(BusFault);
            }
            let mut target: Option<(u8, bool)> = None;
            for op in operations.iter_mut() {
                match op {
                    Operation::Write(bytes) => {
                        let mut bytes = bytes.iter().copied();
                        if target.is_none() {
                            let header = bytes.next().unwrap_or(0);
                            target = Some((header & 0x7F, header & SPI_WRITE != 0));
                        }
                        for byte in bytes {
                            let (addr, _) = target.unwrap();
                            self.write(addr, byte);
                            if addr != REG_FIFO {
                                target = Some((addr + 1, true));
                            }
                        }
                    }
                    Operation::Read(buf) => {
                        for slot in buf.iter_mut() {
                            let (addr, _) = target.unwrap();
                            *slot = self.read(addr);
                            if addr != REG_FIFO {
                                target = Some((addr + 1, false));
                            }
                        }
                    }
                    _ => unreachable!("driver only issues plain reads and writes"),
                }
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn ready_radio() -> Sx127x<FakeChip, NoDelay> {
        let mut radio = Sx127x::new(FakeChip::new(), NoDelay, RadioConfig::default());
        radio.init().unwrap();
        radio
    }

    fn chip(radio: &Sx127x<FakeChip, NoDelay>) -> &FakeChip {
        &radio.spi
    }

    #[test]
    fn init_rejects_unknown_chip() {
        let mut fake = FakeChip::new();
        fake.regs[REG_VERSION as usize] = 0x22;
        let mut radio = Sx127x::new(fake, NoDelay, RadioConfig::default());
        assert_eq!(radio.init(), Err(RadioError::UnknownChip { version: 0x22 }));
    }

    #[test]
    fn init_programs_channel_and_listens() {
        let radio = ready_radio();
        let chip = chip(&radio);

        // 915 MHz: 915e6 * 2^19 / 32e6 = 0xE4C000
        assert_eq!(chip.reg(REG_FRF_MSB), 0xE4);
        assert_eq!(chip.reg(REG_FRF_MID), 0xC0);
        assert_eq!(chip.reg(REG_FRF_LSB), 0x00);
        assert_eq!(chip.reg(REG_SYNC_WORD), 0xF3);
        assert_eq!(chip.reg(REG_MODEM_CONFIG_2) & 0xF0, 7 << 4);
        assert_eq!(chip.reg(REG_MODEM_CONFIG_2) & 0x04, 0x04);
        assert_eq!(chip.reg(REG_PA_CONFIG), 0x80 | 15);
        assert_eq!(chip.reg(REG_OP_MODE), MODE_LONG_RANGE | MODE_RX_CONTINUOUS);
    }

    #[test]
    fn receives_one_packet_per_poll() {
        let mut radio = ready_radio();
        radio.spi.deliver(b" admin\n", false);

        let message = radio.try_receive().unwrap();
        assert_eq!(message.token(), b"admin");
        assert_eq!(radio.last_rssi_dbm(), Some(100 - 157));
        assert_eq!(chip(&radio).reg(REG_IRQ_FLAGS), 0);

        assert!(radio.try_receive().is_none());
    }

    #[test]
    fn crc_failure_is_dropped_and_cleared() {
        let mut radio = ready_radio();
        radio.spi.deliver(b"admin", true);

        assert!(radio.try_receive().is_none());
        assert_eq!(chip(&radio).reg(REG_IRQ_FLAGS), 0);
    }

    #[test]
    fn full_size_packet_is_received_whole() {
        let mut radio = ready_radio();
        let mut payload = [b'x'; MAX_FRAME_LEN];
        payload[0] = 0xFF;
        payload[MAX_FRAME_LEN - 1] = b'!';
        radio.spi.deliver(&payload, false);

        let message = radio.try_receive().unwrap();
        assert_eq!(message.len(), MAX_FRAME_LEN);
        assert_eq!(message.token(), &payload[..]);
    }

    #[test]
    fn bus_failure_reads_as_no_packet() {
        let mut radio = ready_radio();
        radio.spi.deliver(b"admin", false);
        radio.spi.bus_down = true;
        assert!(radio.try_receive().is_none());
    }

    #[test]
    fn send_transmits_and_returns_to_receive() {
        let mut radio = ready_radio();
        radio.send(b"admin").unwrap();

        let chip = chip(&radio);
        assert_eq!(chip.sent, vec![b"admin".to_vec()]);
        assert_eq!(chip.reg(REG_OP_MODE), MODE_LONG_RANGE | MODE_RX_CONTINUOUS);
        assert_eq!(chip.reg(REG_IRQ_FLAGS) & IRQ_TX_DONE, 0);
    }

    #[test]
    fn send_reports_stuck_transmitter() {
        let mut radio = ready_radio();
        radio.spi.tx_stuck = true;
        assert_eq!(radio.send(b"admin"), Err(RadioError::TxTimeout));
        assert_eq!(chip(&radio).reg(REG_OP_MODE), MODE_LONG_RANGE | MODE_RX_CONTINUOUS);
    }

    #[test]
    fn send_rejects_oversized_payload() {
        let mut radio = ready_radio();
        assert_eq!(
            radio.send(&[0u8; MAX_FRAME_LEN + 1]),
            Err(RadioError::PayloadTooLarge { len: MAX_FRAME_LEN + 1 })
        );
    }
}
