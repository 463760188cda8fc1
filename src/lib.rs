#![no_std]

pub mod color;
pub mod controller;
pub mod lookup;
pub mod persist;
pub mod protocol;
pub mod rx;
pub mod scheduler;
pub mod topology;
pub mod wave;

pub use color::Rgb;
pub use controller::{BEACON_INTERVAL, BoardIdentity, Controller};
pub use lookup::{ABSENT, LookupTable};
pub use protocol::{Command, LineAssembler, ParseError, ProfileArg};
pub use rx::{RxConsumer, RxProducer, RxQueue};
pub use scheduler::{SyncAction, SyncScheduler};
pub use topology::{
    LINE_COUNT, LINE_PIXELS, LineRemap, MapTopology, Profile, Segment, SegmentTag, TOTAL_PIXELS,
    TopologyStore,
};
pub use wave::WaveState;

pub use embassy_time::{Duration, Instant};

/// Abstract LED strip driver trait
///
/// Implement this trait to support different hardware platforms.
/// The controller is generic over this trait and calls it once per frame
/// with the full physical frame buffer; `write` blocks until the frame is
/// latched onto the strips.
pub trait OutputDriver {
    /// Write colors to the LED strips
    fn write(&mut self, colors: &[Rgb]);
}

/// Byte-addressable persistent storage trait
///
/// No wear-leveling is assumed; the persistence layer skips writes of
/// unchanged cells on its own.
pub trait StorageDriver {
    /// Read one byte at the given offset
    fn read(&mut self, offset: usize) -> u8;
    /// Write one byte at the given offset
    fn write(&mut self, offset: usize, value: u8);
}

/// Operator response channel trait
///
/// The transmit half of the serial link: each call sends one complete text
/// line (discovery replies, command responses, the periodic beacon).
pub trait ResponsePort {
    /// Send one line of text to the operator
    fn write_line(&mut self, line: &str);
}
