//! Segment topology and logical-to-physical line remapping.
//!
//! A board drives [`LINE_COUNT`] physical output lines. Operators address
//! *logical maps* instead: each map carries an ordered list of serpentine
//! row segments and resolves to a physical line through [`LineRemap`].

use heapless::Vec;

/// Number of logical maps and physical output lines on a board.
pub const LINE_COUNT: usize = 8;

/// Pixel budget of a single physical output line.
pub const LINE_PIXELS: usize = 120;

/// Total pixels across all physical lines.
pub const TOTAL_PIXELS: usize = LINE_COUNT * LINE_PIXELS;

/// Maximum serpentine rows per map.
pub const MAX_ROWS: usize = 8;

/// The one map with an alternate wiring profile.
pub const ALT_PROFILE_MAP: usize = 2;

/// Display-only hint describing how a row segment is mounted.
///
/// The tag never influences addressing; it exists so `status` output can
/// describe the physical installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentTag {
    Vertical,
    Horizontal,
    HorizontalInverted,
}

impl SegmentTag {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vertical => "vert",
            Self::Horizontal => "horiz",
            Self::HorizontalInverted => "horiz-inv",
        }
    }
}

/// One serpentine row: a pixel count plus its mounting tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub len: u16,
    pub tag: SegmentTag,
}

impl Segment {
    pub const fn vertical(len: u16) -> Self {
        Self {
            len,
            tag: SegmentTag::Vertical,
        }
    }

    pub const fn horizontal(len: u16) -> Self {
        Self {
            len,
            tag: SegmentTag::Horizontal,
        }
    }
}

/// Segment list and serpentine orientation of one logical map.
#[derive(Debug, Clone, Default)]
pub struct MapTopology {
    /// Rows in wiring order; lengths sum to at most [`LINE_PIXELS`].
    pub segments: Vec<Segment, MAX_ROWS>,
    /// Inverts which rows run forward vs. reverse in the serpentine layout.
    pub flip_x: bool,
}

impl MapTopology {
    /// Number of rows in this map.
    pub fn row_count(&self) -> usize {
        self.segments.len()
    }

    /// Pixel count of one row, or `None` past the last row.
    pub fn row_len(&self, row: usize) -> Option<usize> {
        self.segments.get(row).map(|segment| segment.len as usize)
    }
}

/// Named wiring profiles for the alternate-topology map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Profile {
    /// Four serpentine rows, the wiring every other map uses.
    Standard = 0,
    /// Two long horizontal runs.
    Wide = 1,
}

impl Profile {
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Standard),
            1 => Some(Self::Wide),
            _ => None,
        }
    }

    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Wide => "wide",
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(Self::Standard),
            "wide" => Some(Self::Wide),
            _ => None,
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Standard => Self::Wide,
            Self::Wide => Self::Standard,
        }
    }
}

/// Default row lengths shared by all maps.
const STANDARD_ROWS: [u16; 4] = [31, 30, 29, 30];

/// Alternate wiring for [`ALT_PROFILE_MAP`]: two long horizontal runs.
const WIDE_ROWS: [u16; 2] = [60, 60];

/// In-memory segment definitions for every logical map.
///
/// Mutated only by whole-profile swaps, never incrementally.
#[derive(Debug, Clone)]
pub struct TopologyStore {
    maps: [MapTopology; LINE_COUNT],
    profile: Profile,
}

impl Default for TopologyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyStore {
    pub fn new() -> Self {
        Self {
            maps: core::array::from_fn(|_| Self::standard_map()),
            profile: Profile::Standard,
        }
    }

    fn standard_map() -> MapTopology {
        let mut topology = MapTopology::default();
        for len in STANDARD_ROWS {
            let _ = topology.segments.push(Segment::vertical(len));
        }
        topology
    }

    fn wide_map() -> MapTopology {
        let mut topology = MapTopology::default();
        for len in WIDE_ROWS {
            let _ = topology.segments.push(Segment::horizontal(len));
        }
        topology
    }

    /// Topology of one logical map.
    pub fn map(&self, id: usize) -> Option<&MapTopology> {
        self.maps.get(id)
    }

    /// All map topologies in id order.
    pub fn maps(&self) -> &[MapTopology] {
        &self.maps
    }

    /// Currently selected profile for the alternate-topology map.
    pub const fn profile(&self) -> Profile {
        self.profile
    }

    /// Swap the alternate-topology map to the given profile.
    ///
    /// Replaces that map's whole segment list; all other maps are untouched.
    /// The caller decides when to rebuild the lookup table.
    pub fn apply_profile(&mut self, profile: Profile) {
        self.profile = profile;
        self.maps[ALT_PROFILE_MAP] = match profile {
            Profile::Standard => Self::standard_map(),
            Profile::Wide => Self::wide_map(),
        };
    }

    /// Replace one map's whole segment list.
    ///
    /// Installation-time configuration for boards whose wiring differs from
    /// the defaults; runtime changes go through [`Self::apply_profile`].
    /// Returns `false` without mutating when the map id is out of range or
    /// the list exceeds [`MAX_ROWS`].
    pub fn apply_segments(&mut self, map: usize, segments: &[Segment]) -> bool {
        if map >= LINE_COUNT || segments.len() > MAX_ROWS {
            return false;
        }
        self.maps[map].segments.clear();
        for segment in segments {
            let _ = self.maps[map].segments.push(*segment);
        }
        true
    }

    /// Set one map's serpentine flip flag, for wiring that starts at the
    /// opposite edge.
    pub fn set_flip(&mut self, map: usize, flip: bool) -> bool {
        let Some(map_topology) = self.maps.get_mut(map) else {
            return false;
        };
        map_topology.flip_x = flip;
        true
    }
}

/// Logical map to physical output line assignment.
///
/// Independent of per-row layout; two maps may alias one line, which is the
/// operator's responsibility to avoid (or use deliberately).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRemap {
    lines: [u8; LINE_COUNT],
}

impl Default for LineRemap {
    fn default() -> Self {
        Self::identity()
    }
}

impl LineRemap {
    /// Every map drives the line of the same index.
    pub const fn identity() -> Self {
        let mut lines = [0u8; LINE_COUNT];
        let mut i = 0;
        while i < LINE_COUNT {
            lines[i] = i as u8;
            i += 1;
        }
        Self { lines }
    }

    /// Assign a logical map to a physical line.
    ///
    /// Returns `false` without mutating when either id is out of range.
    pub fn set(&mut self, map: usize, line: u8) -> bool {
        if map >= LINE_COUNT || line as usize >= LINE_COUNT {
            return false;
        }
        self.lines[map] = line;
        true
    }

    /// Physical line a logical map currently resolves to.
    pub fn line_of(&self, map: usize) -> Option<u8> {
        self.lines.get(map).copied()
    }

    /// Raw assignment bytes, for persistence and status output.
    pub const fn as_bytes(&self) -> &[u8; LINE_COUNT] {
        &self.lines
    }

    /// Restore assignments from persisted bytes.
    ///
    /// Returns `false` without mutating when any value is not a legal line.
    pub fn apply_bytes(&mut self, bytes: &[u8; LINE_COUNT]) -> bool {
        if bytes.iter().any(|&line| line as usize >= LINE_COUNT) {
            return false;
        }
        self.lines = *bytes;
        true
    }
}
