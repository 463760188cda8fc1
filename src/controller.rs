//! Board controller: owns all mutable state and runs the control loop.
//!
//! A single `Controller` owns the topology store, remap, lookup table, wave
//! state, scheduler, and frame buffer; nothing lives in process-wide
//! globals, so tests can run several independent boards side by side.
//!
//! The loop model is single-threaded and cooperative: each [`service`] pass
//! drains queued transport bytes, emits the discovery beacon when due,
//! fires an elapsed sync action, and renders at most one frame. The caller
//! sleeps for the returned duration; while animating that sleep is the
//! inter-frame delay, which is also the command-latency floor operators
//! trade against wave speed.
//!
//! [`service`]: Controller::service

use core::fmt::Write as _;

use embassy_time::{Duration, Instant};

#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::color::{BLACK, WHITE};
use crate::lookup::LookupTable;
use crate::persist;
use crate::protocol::{Command, LineAssembler, ParseError, ProfileArg, parse};
use crate::rx::RxConsumer;
use crate::scheduler::{SyncAction, SyncScheduler, deadline_reached};
use crate::topology::{LineRemap, TOTAL_PIXELS, TopologyStore};
use crate::wave::WaveState;
use crate::{OutputDriver, ResponsePort, Rgb, StorageDriver};

/// Interval of the unsolicited `HELLO` beacon.
pub const BEACON_INTERVAL: Duration = Duration::from_secs(5);

/// Poll cadence while no animation is running.
const IDLE_POLL: Duration = Duration::from_millis(5);

const RESPONSE_CAPACITY: usize = 160;

type Response = heapless::String<RESPONSE_CAPACITY>;

/// Identity reported by discovery and the beacon.
#[derive(Debug, Clone, Copy)]
pub struct BoardIdentity {
    /// Installation-unique board name, e.g. `B1_BACK_LEFT`.
    pub board_id: &'static str,
    pub fw_version: &'static str,
    /// Comma-separated capability list.
    pub caps: &'static str,
}

impl BoardIdentity {
    pub const fn new(board_id: &'static str, fw_version: &'static str) -> Self {
        Self {
            board_id,
            fw_version,
            caps: "map,save,wave,sync",
        }
    }
}

/// One board's whole controller state.
pub struct Controller<'a, D, S, P, const RX_SIZE: usize> {
    rx: RxConsumer<'a, RX_SIZE>,
    driver: D,
    storage: S,
    port: P,
    identity: BoardIdentity,

    topology: TopologyStore,
    remap: LineRemap,
    lookup: LookupTable,
    wave: WaveState,
    scheduler: SyncScheduler,
    line: LineAssembler,
    frame: [Rgb; TOTAL_PIXELS],
    next_beacon: Instant,
}

impl<'a, D, S, P, const RX_SIZE: usize> Controller<'a, D, S, P, RX_SIZE>
where
    D: OutputDriver,
    S: StorageDriver,
    P: ResponsePort,
{
    pub fn new(
        rx: RxConsumer<'a, RX_SIZE>,
        driver: D,
        storage: S,
        port: P,
        identity: BoardIdentity,
    ) -> Self {
        Self {
            rx,
            driver,
            storage,
            port,
            identity,
            topology: TopologyStore::new(),
            remap: LineRemap::identity(),
            lookup: LookupTable::new(),
            wave: WaveState::new(),
            scheduler: SyncScheduler::new(),
            line: LineAssembler::new(),
            frame: [BLACK; TOTAL_PIXELS],
            next_beacon: Instant::from_millis(0),
        }
    }

    /// Boot sequence: restore persisted state, build the table, blank the
    /// display.
    ///
    /// Both loads are silent best-effort; an invalid or missing record just
    /// leaves the defaults in place.
    pub fn boot(&mut self, now: Instant) {
        if let Some(remap) = persist::load_remap(&mut self.storage) {
            self.remap = remap;
        }
        if let Some(profile) = persist::load_profile(&mut self.storage) {
            self.topology.apply_profile(profile);
        }
        self.lookup.rebuild(&self.topology, &self.remap);
        #[cfg(feature = "esp32-log")]
        println!(
            "boot: {} profile={}",
            self.identity.board_id,
            self.topology.profile().as_str()
        );
        self.blank();
        self.latch();
        self.next_beacon = now + BEACON_INTERVAL;
    }

    /// One control-loop pass; returns how long the caller should sleep.
    pub fn service(&mut self, now: Instant) -> Duration {
        self.drain_input(now);
        self.tick_beacon(now);
        if let Some(action) = self.scheduler.poll(now) {
            self.run_sync_action(action, now);
        }
        if self.wave.any_active() {
            self.wave
                .render(&self.topology, &self.lookup, &mut self.frame);
            self.latch();
            self.wave.frame_delay()
        } else {
            IDLE_POLL
        }
    }

    /// Execute one parsed command. Scheduled actions come back through this
    /// same entry point, so deferred and immediate behavior are identical.
    pub fn execute(&mut self, command: Command, now: Instant) {
        match command {
            Command::Discover => self.cmd_discover(),
            Command::Status => self.cmd_status(),
            Command::Map { logical, physical } => self.cmd_map(logical, physical),
            Command::Rebuild => {
                self.lookup.rebuild(&self.topology, &self.remap);
                self.reply("OK rebuilt");
            }
            Command::Save => {
                persist::save_remap(&mut self.storage, &self.remap);
                persist::save_profile(&mut self.storage, self.topology.profile());
                self.reply("OK saved remap+profile");
            }
            Command::Load => self.cmd_load(),
            Command::ClearSave => {
                persist::clear_remap(&mut self.storage);
                persist::clear_profile(&mut self.storage);
                self.reply("OK cleared saved records");
            }
            Command::Profile(arg) => self.cmd_profile(arg),
            Command::Query { map, row, x } => self.cmd_query(map, row, x),
            Command::Pixel { map, row, x, color } => self.cmd_pixel(map, row, x, color),
            Command::Row0 { map } => self.cmd_row0(map),
            Command::Wave { map, period, speed } => self.cmd_wave(map, period, speed),
            Command::WaveStop { map } => {
                if self.wave.stop(map) {
                    self.replyf(format_args!("OK wavestop {map}"));
                } else {
                    self.reply("ERR usage: wavestop <map>");
                }
            }
            Command::WaveAll { period, speed } => {
                self.wave.start_all(period, speed);
                self.reply("OK waveall");
            }
            Command::WaveClear => {
                self.wave.clear();
                self.reply("OK waveclear");
            }
            Command::Stop => {
                self.wave.clear();
                self.blank();
                self.latch();
                self.reply("OK stopped");
            }
            Command::Sync { action, delay_ms } => {
                self.scheduler
                    .arm(action, Duration::from_millis(delay_ms), now);
                self.replyf(format_args!("OK sync armed delay={delay_ms}ms"));
            }
        }
    }

    fn drain_input(&mut self, now: Instant) {
        while let Some(byte) = self.rx.pop() {
            if let Some(line) = self.line.push(byte) {
                self.handle_line(line.as_str(), now);
            }
        }
    }

    fn handle_line(&mut self, line: &str, now: Instant) {
        if line.trim().is_empty() {
            return;
        }
        match parse(line) {
            Ok(command) => self.execute(command, now),
            Err(ParseError { usage }) => self.replyf(format_args!("ERR {usage}")),
        }
    }

    fn tick_beacon(&mut self, now: Instant) {
        if !deadline_reached(now, self.next_beacon) {
            return;
        }
        let (board_id, fw_version, caps) = (
            self.identity.board_id,
            self.identity.fw_version,
            self.identity.caps,
        );
        self.replyf(format_args!("HELLO {board_id} {fw_version} CAPS {caps}"));
        self.next_beacon = now + BEACON_INTERVAL;
    }

    fn run_sync_action(&mut self, action: SyncAction, now: Instant) {
        let command = match action {
            SyncAction::Stop => Command::Stop,
            SyncAction::Row0 { map } => Command::Row0 { map },
            SyncAction::Wave { map, period, speed } => Command::Wave { map, period, speed },
            SyncAction::WaveAll { period, speed } => Command::WaveAll { period, speed },
        };
        self.execute(command, now);
    }

    fn cmd_discover(&mut self) {
        let (board_id, fw_version, caps) = (
            self.identity.board_id,
            self.identity.fw_version,
            self.identity.caps,
        );
        self.replyf(format_args!("ID {board_id} FW {fw_version} CAPS {caps}"));
    }

    fn cmd_status(&mut self) {
        let (board_id, fw_version, profile) = (
            self.identity.board_id,
            self.identity.fw_version,
            self.topology.profile().as_str(),
        );
        self.replyf(format_args!(
            "STATUS {board_id} fw={fw_version} profile={profile}"
        ));

        for (map, map_topology) in self.topology.maps().iter().enumerate() {
            let mut line = Response::new();
            let _ = write!(
                line,
                "MAP {map} line={} flip={} segs=",
                self.remap.line_of(map).unwrap_or(0),
                u8::from(map_topology.flip_x)
            );
            for (row, segment) in map_topology.segments.iter().enumerate() {
                if row > 0 {
                    let _ = write!(line, ",");
                }
                let _ = write!(line, "{}{}", segment.len, segment.tag.as_str());
            }
            if self.wave.is_active(map) {
                let _ = write!(
                    line,
                    " wave=on period={} speed={}",
                    self.wave.period_of(map),
                    self.wave.speed_of(map)
                );
            } else {
                let _ = write!(line, " wave=off");
            }
            self.port.write_line(line.as_str());
        }

        let mut line = Response::new();
        let _ = write!(line, "REMAP");
        for assigned in self.remap.as_bytes() {
            let _ = write!(line, " {assigned}");
        }
        self.port.write_line(line.as_str());

        self.replyf(format_args!(
            "WAVE phase={} sync={}",
            self.wave.phase(),
            if self.scheduler.is_armed() {
                "armed"
            } else {
                "idle"
            }
        ));
    }

    fn cmd_map(&mut self, logical: usize, physical: u8) {
        if self.remap.set(logical, physical) {
            self.replyf(format_args!("OK map {logical} -> line {physical}"));
        } else {
            self.reply("ERR usage: map <logical 0-7> <line 0-7>");
        }
    }

    /// Explicit load of both records, reporting each outcome. A missing
    /// record leaves that piece of in-memory state alone; neither path
    /// rebuilds the lookup table.
    fn cmd_load(&mut self) {
        match persist::load_remap(&mut self.storage) {
            Some(remap) => {
                self.remap = remap;
                self.reply("OK loaded remap (rebuild to apply)");
            }
            None => self.reply("ERR remap record not found"),
        }
        match persist::load_profile(&mut self.storage) {
            Some(profile) => {
                self.topology.apply_profile(profile);
                self.replyf(format_args!(
                    "OK loaded profile {} (rebuild to apply)",
                    profile.as_str()
                ));
            }
            None => self.reply("ERR profile record not found"),
        }
    }

    fn cmd_profile(&mut self, arg: ProfileArg) {
        let profile = match arg {
            ProfileArg::Select(profile) => profile,
            ProfileArg::Toggle => self.topology.profile().toggled(),
        };
        self.topology.apply_profile(profile);
        // Profile changes are rare and must survive resets, so every change
        // writes through to storage immediately.
        persist::save_profile(&mut self.storage, profile);
        self.replyf(format_args!(
            "OK profile {} (rebuild to apply)",
            profile.as_str()
        ));
    }

    fn cmd_query(&mut self, map: usize, row: usize, x: usize) {
        match self.lookup.resolve(map, row, x) {
            Some(index) => self.replyf(format_args!("OK q {map} {row} {x} -> {index}")),
            None => self.replyf(format_args!("OK q {map} {row} {x} -> absent")),
        }
    }

    fn cmd_pixel(&mut self, map: usize, row: usize, x: usize, color: Rgb) {
        self.wave.clear();
        match self.lookup.resolve(map, row, x) {
            Some(index) => {
                if let Some(pixel) = self.frame.get_mut(index as usize) {
                    *pixel = color;
                }
                self.latch();
                self.replyf(format_args!("OK p {map} {row} {x} -> {index}"));
            }
            None => self.replyf(format_args!("OK p {map} {row} {x} -> absent")),
        }
    }

    fn cmd_row0(&mut self, map: usize) {
        let Some(len) = self.topology.map(map).and_then(|topo| topo.row_len(0)) else {
            self.reply("ERR usage: row0 <map>");
            return;
        };
        self.wave.clear();
        self.blank();
        for x in 0..len {
            if let Some(index) = self.lookup.resolve(map, 0, x) {
                if let Some(pixel) = self.frame.get_mut(index as usize) {
                    *pixel = WHITE;
                }
            }
        }
        self.latch();
        self.replyf(format_args!("OK row0 {map}"));
    }

    fn cmd_wave(&mut self, map: usize, period: Option<u16>, speed: Option<u16>) {
        if self.wave.start(map, period, speed) {
            self.replyf(format_args!(
                "OK wave {map} period={} speed={}",
                self.wave.period_of(map),
                self.wave.speed_of(map)
            ));
        } else {
            self.reply("ERR usage: wave <map> [period] [speedMs]");
        }
    }

    fn blank(&mut self) {
        self.frame.fill(BLACK);
    }

    /// Push the whole frame buffer to the strip driver (blocking latch).
    fn latch(&mut self) {
        self.driver.write(&self.frame);
    }

    fn reply(&mut self, line: &str) {
        self.port.write_line(line);
    }

    fn replyf(&mut self, args: core::fmt::Arguments<'_>) {
        let mut line = Response::new();
        let _ = line.write_fmt(args);
        self.port.write_line(line.as_str());
    }

    /// Resolve one cell, same as the `q` command.
    pub fn resolve(&self, map: usize, row: usize, x: usize) -> Option<u16> {
        self.lookup.resolve(map, row, x)
    }

    pub const fn identity(&self) -> &BoardIdentity {
        &self.identity
    }

    pub const fn topology(&self) -> &TopologyStore {
        &self.topology
    }

    pub const fn remap(&self) -> &LineRemap {
        &self.remap
    }

    pub const fn wave(&self) -> &WaveState {
        &self.wave
    }

    pub const fn scheduler(&self) -> &SyncScheduler {
        &self.scheduler
    }

    /// Current physical frame buffer contents.
    pub fn frame(&self) -> &[Rgb] {
        &self.frame
    }
}
