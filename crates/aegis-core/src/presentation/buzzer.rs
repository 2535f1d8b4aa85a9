//! Tone patterns for an active buzzer on a GPIO line
//!
//! Patterns are counted in control-loop ticks, so [`PresentationSink::render`]
//! doubles as the playback clock: it advances one tick per call and drives
//! the pin. Cues queue behind each other; the siren is never queued twice and
//! keeps looping for as long as it is re-requested.

use embedded_hal::digital::{Error as _, OutputPin};
use log::{debug, info};

use super::{AlertTone, PresentationSink, ScreenMode};

const TONE_QUEUE_LEN: usize = 4;

#[derive(Debug, Clone, Copy)]
struct Segment {
    on: bool,
    ticks: u16,
}

const fn on(ticks: u16) -> Segment {
    Segment { on: true, ticks }
}

const fn off(ticks: u16) -> Segment {
    Segment { on: false, ticks }
}

const GRANTED: &[Segment] = &[on(5), off(3), on(10)];
const LOCKED: &[Segment] = &[on(15)];
const DENIED: &[Segment] = &[on(4), off(4), on(4)];
const SIREN: &[Segment] = &[on(25), off(25)];

fn pattern(tone: AlertTone) -> &'static [Segment] {
    match tone {
        AlertTone::Granted => GRANTED,
        AlertTone::Locked => LOCKED,
        AlertTone::Denied => DENIED,
        AlertTone::Siren => SIREN,
    }
}

#[derive(Debug, Clone, Copy)]
struct Playing {
    tone: AlertTone,
    segment: usize,
    elapsed: u16,
}

pub struct BuzzerSink<P> {
    pin: P,
    queue: heapless::Deque<AlertTone, TONE_QUEUE_LEN>,
    playing: Option<Playing>,
    screen: Option<ScreenMode>,
}

impl<P: OutputPin> BuzzerSink<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            queue: heapless::Deque::new(),
            playing: None,
            screen: None,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.playing.is_none() && self.queue.is_empty()
    }

    pub fn release(self) -> P {
        self.pin
    }

    /// Buzzer level for the current tick.
    fn step(&mut self) -> bool {
        if self.playing.is_none() {
            self.playing = self.queue.pop_front().map(|tone| Playing {
                tone,
                segment: 0,
                elapsed: 0,
            });
        }
        let Some(playing) = &mut self.playing else {
            return false;
        };

        let pattern = pattern(playing.tone);
        let segment = pattern[playing.segment];
        playing.elapsed += 1;
        if playing.elapsed >= segment.ticks {
            playing.elapsed = 0;
            playing.segment += 1;
            if playing.segment == pattern.len() {
                self.playing = None;
            }
        }
        segment.on
    }
}

impl<P: OutputPin> PresentationSink for BuzzerSink<P> {
    fn render(&mut self, screen: ScreenMode) {
        if self.screen != Some(screen) {
            info!("Screen: {:?}", screen);
            self.screen = Some(screen);
        }

        let result = if self.step() {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(e) = result {
            debug!("Buzzer pin write failed: {:?}", e.kind());
        }
    }

    fn alert(&mut self, tone: AlertTone) {
        if tone == AlertTone::Siren {
            let sounding = self.playing.is_some_and(|p| p.tone == AlertTone::Siren)
                || self.queue.iter().any(|t| *t == AlertTone::Siren);
            if sounding {
                return;
            }
        }
        if self.queue.push_back(tone).is_err() {
            debug!("Tone queue full, dropping {:?}", tone);
        }
    }
}
