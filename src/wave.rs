//! Phase-shifted sine wave renderer.
//!
//! Paints a grayscale sinusoid across every active map. All rows of a map
//! share the brightness computed for their x position, so a serpentine
//! surface shows one coherent wavefront. A small per-map phase offset keeps
//! neighboring maps from pulsing in lockstep.

use embassy_time::Duration;
use libm::sinf;

use crate::color::{Rgb, gray};
use crate::lookup::LookupTable;
use crate::topology::{LINE_COUNT, TopologyStore};

/// Default wave period in pixels.
pub const DEFAULT_PERIOD: u16 = 30;

/// Default inter-frame delay in milliseconds.
pub const DEFAULT_SPEED_MS: u16 = 25;

pub const MIN_PERIOD: u16 = 4;
pub const MAX_PERIOD: u16 = 120;
pub const MIN_SPEED_MS: u16 = 1;
pub const MAX_SPEED_MS: u16 = 2000;

/// Phase offset between adjacent maps, in pixels.
const MAP_PHASE_STEP: u32 = 3;

/// Per-map activation flags and overrides plus the global phase counter.
pub struct WaveState {
    active: [bool; LINE_COUNT],
    period: [u16; LINE_COUNT],
    speed_ms: [u16; LINE_COUNT],
    phase: u32,
}

impl Default for WaveState {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveState {
    pub const fn new() -> Self {
        Self {
            active: [false; LINE_COUNT],
            period: [DEFAULT_PERIOD; LINE_COUNT],
            speed_ms: [DEFAULT_SPEED_MS; LINE_COUNT],
            phase: 0,
        }
    }

    /// Activate one map's wave, applying clamped overrides when given.
    ///
    /// Overrides live in memory only; they do not persist across resets.
    pub fn start(&mut self, map: usize, period: Option<u16>, speed: Option<u16>) -> bool {
        if map >= LINE_COUNT {
            return false;
        }
        if let Some(period) = period {
            self.period[map] = period.clamp(MIN_PERIOD, MAX_PERIOD);
        }
        if let Some(speed) = speed {
            self.speed_ms[map] = speed.clamp(MIN_SPEED_MS, MAX_SPEED_MS);
        }
        self.active[map] = true;
        true
    }

    /// Activate every map's wave with the same overrides.
    pub fn start_all(&mut self, period: Option<u16>, speed: Option<u16>) {
        for map in 0..LINE_COUNT {
            self.start(map, period, speed);
        }
    }

    /// Deactivate one map's wave. Its overrides are kept.
    pub fn stop(&mut self, map: usize) -> bool {
        if map >= LINE_COUNT {
            return false;
        }
        self.active[map] = false;
        true
    }

    /// Deactivate all waves and reset the phase counter.
    pub fn clear(&mut self) {
        self.active = [false; LINE_COUNT];
        self.phase = 0;
    }

    pub fn any_active(&self) -> bool {
        self.active.iter().any(|&active| active)
    }

    pub fn is_active(&self, map: usize) -> bool {
        self.active.get(map).copied().unwrap_or(false)
    }

    pub fn period_of(&self, map: usize) -> u16 {
        self.period.get(map).copied().unwrap_or(DEFAULT_PERIOD)
    }

    pub fn speed_of(&self, map: usize) -> u16 {
        self.speed_ms.get(map).copied().unwrap_or(DEFAULT_SPEED_MS)
    }

    pub const fn phase(&self) -> u32 {
        self.phase
    }

    /// Inter-frame delay while animating: the fastest active map paces the
    /// whole loop, since all maps are redrawn together each frame.
    pub fn frame_delay(&self) -> Duration {
        let fastest = (0..LINE_COUNT)
            .filter(|&map| self.active[map])
            .map(|map| self.speed_ms[map])
            .min()
            .unwrap_or(DEFAULT_SPEED_MS);
        Duration::from_millis(u64::from(fastest))
    }

    /// Render one frame of every active map into `frame`, then advance the
    /// global phase by one step.
    ///
    /// Cells without a physical pixel are skipped.
    pub fn render(&mut self, topology: &TopologyStore, lookup: &LookupTable, frame: &mut [Rgb]) {
        for (map, map_topology) in topology.maps().iter().enumerate() {
            if !self.active[map] {
                continue;
            }
            let period = self.period[map];
            #[allow(clippy::cast_possible_truncation)]
            let map_phase = self
                .phase
                .wrapping_add(map as u32 * MAP_PHASE_STEP);

            let longest = map_topology
                .segments
                .iter()
                .map(|segment| segment.len as usize)
                .max()
                .unwrap_or(0);

            for x in 0..longest {
                #[allow(clippy::cast_possible_truncation)]
                let level = brightness(x as u32, map_phase, period);
                let color = gray(level);
                for row in 0..map_topology.row_count() {
                    let Some(index) = lookup.resolve(map, row, x) else {
                        continue;
                    };
                    if let Some(pixel) = frame.get_mut(index as usize) {
                        *pixel = color;
                    }
                }
            }
        }
        self.phase = self.phase.wrapping_add(1);
    }
}

/// Sinusoidal brightness of one x position: `(x + phase) mod period` mapped
/// through a full sine cycle onto 0..=255.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn brightness(x: u32, phase: u32, period: u16) -> u8 {
    let period = u32::from(period.max(1));
    let position = x.wrapping_add(phase) % period;
    #[allow(clippy::cast_precision_loss)]
    let t = position as f32 / period as f32;
    let s = sinf(t * core::f32::consts::TAU);
    ((s + 1.0) * 0.5 * 255.0) as u8
}
