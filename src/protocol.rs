//! Line-based command protocol.
//!
//! Bytes from the transport accumulate into a fixed ring until a newline;
//! the completed line is ASCII-lowercased and parsed into a [`Command`].
//! The protocol is text both ways: responses are human-readable lines with
//! an `OK `/`ERR ` prefix convention, no binary framing.

use heapless::{Deque, String};

use crate::color::Rgb;
use crate::scheduler::SyncAction;
use crate::topology::Profile;

/// Line buffer size. Longer unterminated input silently wraps, overwriting
/// the oldest buffered bytes.
pub const LINE_CAPACITY: usize = 64;

/// A completed, lowercased input line.
pub type CommandLine = String<LINE_CAPACITY>;

/// Accumulates transport bytes into newline-terminated lines.
#[derive(Default)]
pub struct LineAssembler {
    buffer: Deque<u8, LINE_CAPACITY>,
}

impl LineAssembler {
    pub const fn new() -> Self {
        Self {
            buffer: Deque::new(),
        }
    }

    /// Feed one byte; returns the finished line when `byte` terminates one.
    ///
    /// A trailing carriage return is discarded and the line is lowercased,
    /// making the protocol case-insensitive.
    pub fn push(&mut self, byte: u8) -> Option<CommandLine> {
        if byte == b'\n' {
            let mut line = CommandLine::new();
            while let Some(b) = self.buffer.pop_front() {
                let _ = line.push(b.to_ascii_lowercase() as char);
            }
            if line.ends_with('\r') {
                line.pop();
            }
            return Some(line);
        }

        if self.buffer.is_full() {
            self.buffer.pop_front();
        }
        let _ = self.buffer.push_back(byte);
        None
    }
}

/// Profile selection argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileArg {
    Select(Profile),
    Toggle,
}

/// Every operation the protocol can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Identity/discovery handshake.
    Discover,
    /// Full topology, remap, and wave state dump.
    Status,
    /// Assign a logical map to a physical output line.
    Map { logical: usize, physical: u8 },
    /// Explicit lookup-table rebuild.
    Rebuild,
    /// Persist the remap table.
    Save,
    /// Restore the remap table from storage.
    Load,
    /// Drop the persisted remap record.
    ClearSave,
    /// Select or toggle the alternate-topology profile.
    Profile(ProfileArg),
    /// Diagnostic single-pixel query.
    Query { map: usize, row: usize, x: usize },
    /// Diagnostic single-pixel draw.
    Pixel {
        map: usize,
        row: usize,
        x: usize,
        color: Rgb,
    },
    /// Draw row 0 of a map as a solid test pattern.
    Row0 { map: usize },
    /// Start one map's wave.
    Wave {
        map: usize,
        period: Option<u16>,
        speed: Option<u16>,
    },
    /// Stop one map's wave.
    WaveStop { map: usize },
    /// Start every map's wave.
    WaveAll {
        period: Option<u16>,
        speed: Option<u16>,
    },
    /// Deactivate all waves and reset phase.
    WaveClear,
    /// Clear all rendering and blank the display.
    Stop,
    /// Arm a synchronized action.
    Sync { action: SyncAction, delay_ms: u64 },
}

/// Parse failure with the usage text to report back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    pub usage: &'static str,
}

const USAGE_GENERAL: &str =
    "commands: discover? status map rebuild save load clearsave profile q p row0 \
     wave wavestop waveall waveclear stop sync";
const USAGE_MAP: &str = "usage: map <logical> <line>";
const USAGE_PROFILE: &str = "usage: profile <standard|wide|toggle>";
const USAGE_QUERY: &str = "usage: q <map> <row> <x>";
const USAGE_PIXEL: &str = "usage: p <map> <row> <x> <r> <g> <b>";
const USAGE_ROW0: &str = "usage: row0 <map>";
const USAGE_WAVE: &str = "usage: wave <map> [period] [speedMs]";
const USAGE_WAVESTOP: &str = "usage: wavestop <map>";
const USAGE_WAVEALL: &str = "usage: waveall [period] [speedMs]";
const USAGE_SYNC: &str =
    "usage: sync wave <map> <delayMs> [period] [speedMs] | sync waveall <delayMs> \
     [period] [speedMs] | sync row0 <map> <delayMs> | sync stop <delayMs>";

fn arg<T: core::str::FromStr>(token: Option<&str>, usage: &'static str) -> Result<T, ParseError> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or(ParseError { usage })
}

fn optional_arg<T: core::str::FromStr>(
    token: Option<&str>,
    usage: &'static str,
) -> Result<Option<T>, ParseError> {
    match token {
        None => Ok(None),
        Some(t) => t.parse().map(Some).map_err(|_| ParseError { usage }),
    }
}

/// Parse one lowercased line into a [`Command`].
///
/// Malformed or unknown input yields the usage text for the nearest command
/// family; the caller reports it and performs no mutation.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let mut tokens = line.split_whitespace();
    let keyword = tokens.next().ok_or(ParseError {
        usage: USAGE_GENERAL,
    })?;

    match keyword {
        "discover?" | "id?" => Ok(Command::Discover),
        "status" => Ok(Command::Status),
        "map" => Ok(Command::Map {
            logical: arg(tokens.next(), USAGE_MAP)?,
            physical: arg(tokens.next(), USAGE_MAP)?,
        }),
        "rebuild" => Ok(Command::Rebuild),
        "save" => Ok(Command::Save),
        "load" => Ok(Command::Load),
        "clearsave" => Ok(Command::ClearSave),
        "profile" => match tokens.next() {
            Some("toggle") => Ok(Command::Profile(ProfileArg::Toggle)),
            Some(name) => Profile::parse_from_str(name)
                .map(|profile| Command::Profile(ProfileArg::Select(profile)))
                .ok_or(ParseError {
                    usage: USAGE_PROFILE,
                }),
            None => Err(ParseError {
                usage: USAGE_PROFILE,
            }),
        },
        "q" => Ok(Command::Query {
            map: arg(tokens.next(), USAGE_QUERY)?,
            row: arg(tokens.next(), USAGE_QUERY)?,
            x: arg(tokens.next(), USAGE_QUERY)?,
        }),
        "p" => Ok(Command::Pixel {
            map: arg(tokens.next(), USAGE_PIXEL)?,
            row: arg(tokens.next(), USAGE_PIXEL)?,
            x: arg(tokens.next(), USAGE_PIXEL)?,
            color: Rgb {
                r: arg(tokens.next(), USAGE_PIXEL)?,
                g: arg(tokens.next(), USAGE_PIXEL)?,
                b: arg(tokens.next(), USAGE_PIXEL)?,
            },
        }),
        "row0" => Ok(Command::Row0 {
            map: arg(tokens.next(), USAGE_ROW0)?,
        }),
        "wave" => Ok(Command::Wave {
            map: arg(tokens.next(), USAGE_WAVE)?,
            period: optional_arg(tokens.next(), USAGE_WAVE)?,
            speed: optional_arg(tokens.next(), USAGE_WAVE)?,
        }),
        "wavestop" => Ok(Command::WaveStop {
            map: arg(tokens.next(), USAGE_WAVESTOP)?,
        }),
        "waveall" => Ok(Command::WaveAll {
            period: optional_arg(tokens.next(), USAGE_WAVEALL)?,
            speed: optional_arg(tokens.next(), USAGE_WAVEALL)?,
        }),
        "waveclear" => Ok(Command::WaveClear),
        "stop" => Ok(Command::Stop),
        "sync" => parse_sync(&mut tokens),
        _ => Err(ParseError {
            usage: USAGE_GENERAL,
        }),
    }
}

fn parse_sync<'a, I>(tokens: &mut I) -> Result<Command, ParseError>
where
    I: Iterator<Item = &'a str>,
{
    let action = match tokens.next() {
        Some("wave") => {
            let map = arg(tokens.next(), USAGE_SYNC)?;
            let delay_ms = arg(tokens.next(), USAGE_SYNC)?;
            let period = optional_arg(tokens.next(), USAGE_SYNC)?;
            let speed = optional_arg(tokens.next(), USAGE_SYNC)?;
            return Ok(Command::Sync {
                action: SyncAction::Wave { map, period, speed },
                delay_ms,
            });
        }
        Some("waveall") => {
            let delay_ms = arg(tokens.next(), USAGE_SYNC)?;
            let period = optional_arg(tokens.next(), USAGE_SYNC)?;
            let speed = optional_arg(tokens.next(), USAGE_SYNC)?;
            return Ok(Command::Sync {
                action: SyncAction::WaveAll { period, speed },
                delay_ms,
            });
        }
        Some("row0") => {
            let map = arg(tokens.next(), USAGE_SYNC)?;
            let delay_ms = arg(tokens.next(), USAGE_SYNC)?;
            return Ok(Command::Sync {
                action: SyncAction::Row0 { map },
                delay_ms,
            });
        }
        Some("stop") => SyncAction::Stop,
        _ => {
            return Err(ParseError { usage: USAGE_SYNC });
        }
    };
    Ok(Command::Sync {
        action,
        delay_ms: arg(tokens.next(), USAGE_SYNC)?,
    })
}
