//! Serial command line.
//!
//! One command per line, whitespace-trimmed, case-sensitive:
//!
//! | Command           | Effect                                   |
//! |-------------------|------------------------------------------|
//! | `status`          | Print the status report                  |
//! | `help`            | Print the command list                   |
//! | `test`            | Send a MIDI test note                    |
//! | `volume <0..1>`   | Set haptic volume                        |
//! | `effect <index>`  | Install an effect by library index       |
//! | `cc <ctrl> <val>` | Inject a MIDI control change             |
//!
//! Parsing is pure; the [`Controller`](crate::app::controller::Controller)
//! executes commands and produces the text to print.

use core::fmt::{self, Write as _};

use serde::Serialize;

use crate::config::ProductVariant;

pub const MAX_LINE: usize = 64;

pub const HELP: &str = "Available commands:
  status           - Show device status
  help             - Show this help
  test             - Send test MIDI message
  volume <0..1>    - Set haptic volume
  effect <index>   - Select haptic effect
  cc <ctrl> <val>  - Inject a MIDI control change";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CliCommand {
    Status,
    Help,
    Test,
    Volume(f32),
    Effect(usize),
    Cc { control: u8, value: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    Unknown(heapless::String<MAX_LINE>),
    MissingArgument(&'static str),
    BadArgument(&'static str),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(cmd) => {
                writeln!(f, "Unknown command: {cmd}")?;
                write!(f, "Type 'help' for available commands")
            }
            Self::MissingArgument(usage) => write!(f, "Missing argument. Usage: {usage}"),
            Self::BadArgument(usage) => write!(f, "Bad argument. Usage: {usage}"),
        }
    }
}

impl core::error::Error for CliError {}

fn arg<'a>(parts: &mut impl Iterator<Item = &'a str>, usage: &'static str) -> Result<&'a str, CliError> {
    parts.next().ok_or(CliError::MissingArgument(usage))
}

fn midi_data(s: &str, usage: &'static str) -> Result<u8, CliError> {
    s.parse::<u8>()
        .ok()
        .filter(|v| *v <= 127)
        .ok_or(CliError::BadArgument(usage))
}

/// Parse one line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<CliCommand>, CliError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let mut parts = line.split_whitespace();
    let cmd = match parts.next().unwrap_or_default() {
        "status" => CliCommand::Status,
        "help" => CliCommand::Help,
        "test" => CliCommand::Test,
        "volume" => {
            const USAGE: &str = "volume <0..1>";
            let v = arg(&mut parts, USAGE)?
                .parse::<f32>()
                .map_err(|_| CliError::BadArgument(USAGE))?;
            if !v.is_finite() {
                return Err(CliError::BadArgument(USAGE));
            }
            CliCommand::Volume(v)
        }
        "effect" => {
            const USAGE: &str = "effect <index>";
            let i = arg(&mut parts, USAGE)?
                .parse::<usize>()
                .map_err(|_| CliError::BadArgument(USAGE))?;
            CliCommand::Effect(i)
        }
        "cc" => {
            const USAGE: &str = "cc <ctrl> <val>";
            let control = midi_data(arg(&mut parts, USAGE)?, USAGE)?;
            let value = midi_data(arg(&mut parts, USAGE)?, USAGE)?;
            CliCommand::Cc { control, value }
        }
        _ => {
            let mut unknown = heapless::String::new();
            for c in line.chars() {
                if unknown.push(c).is_err() {
                    break;
                }
            }
            return Err(CliError::Unknown(unknown));
        }
    };
    Ok(Some(cmd))
}

// ---------------------------------------------------------------------------
// Line assembly
// ---------------------------------------------------------------------------

/// Accumulates serial bytes into lines.
#[derive(Default)]
pub struct LineBuffer {
    buf: heapless::String<MAX_LINE>,
    overflowed: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one character. Returns the completed line on `\n`; `\r` is
    /// dropped. An over-long line is discarded whole.
    pub fn push(&mut self, c: char) -> Option<heapless::String<MAX_LINE>> {
        match c {
            '\r' => None,
            '\n' => {
                let line = core::mem::take(&mut self.buf);
                if core::mem::take(&mut self.overflowed) {
                    log::warn!("cli: line longer than {} bytes discarded", MAX_LINE);
                    return None;
                }
                Some(line)
            }
            _ => {
                if self.buf.push(c).is_err() {
                    self.overflowed = true;
                }
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Snapshot printed by `status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub device: heapless::String<24>,
    pub variant: ProductVariant,
    pub uptime_s: u64,
    pub haptics_enabled: bool,
    pub effect_index: Option<usize>,
    pub effect: Option<heapless::String<24>>,
    pub volume: f32,
    pub last_emitted: u8,
    pub emit_faults: u32,
    pub level: u8,
    pub midi_connected: bool,
    pub dropped_events: u32,
}

impl StatusReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
    }

    /// Human-readable block followed by the JSON line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} Status:", self.device);
        let _ = writeln!(out, "  Uptime: {} seconds", self.uptime_s);
        let _ = writeln!(out, "  Variant: {:?}", self.variant);
        let _ = writeln!(
            out,
            "  Bluetooth MIDI: {}",
            if self.midi_connected { "Connected" } else { "Disconnected" }
        );
        match self.variant {
            ProductVariant::Haptic => {
                if self.haptics_enabled {
                    let name = self.effect.as_ref().map_or("none", |n| n.as_str());
                    let _ = writeln!(out, "  Effect: {name}");
                    let _ = writeln!(out, "  Volume: {:.2}", self.volume);
                    let _ = writeln!(out, "  Last emitted: {}", self.last_emitted);
                    let _ = writeln!(out, "  Emit faults: {}", self.emit_faults);
                } else {
                    let _ = writeln!(out, "  Haptics: DISABLED");
                }
            }
            ProductVariant::Air | ProductVariant::Heat => {
                let _ = writeln!(out, "  Level: {}", self.level);
            }
            ProductVariant::LedOnly => {
                if let Some(i) = self.effect_index {
                    let _ = writeln!(out, "  Band: {i}");
                }
            }
        }
        out.push_str(&self.to_json());
        out
    }
}

/// Periodic "Status: Running for N seconds" line.
pub struct StatusTicker {
    interval_ms: u64,
    last_ms: u64,
}

impl StatusTicker {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms: u64::from(interval_ms),
            last_ms: 0,
        }
    }

    /// Returns the line to print when more than one interval has passed.
    pub fn tick(&mut self, now_ms: u64) -> Option<String> {
        if now_ms.saturating_sub(self.last_ms) <= self.interval_ms {
            return None;
        }
        self.last_ms = now_ms;
        Some(format!("Status: Running for {} seconds", now_ms / 1000))
    }
}
