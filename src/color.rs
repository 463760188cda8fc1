//! Pixel color type shared with the output driver.

use smart_leds::RGB8;

pub type Rgb = RGB8;

pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
pub const WHITE: Rgb = Rgb {
    r: 255,
    g: 255,
    b: 255,
};

/// Grayscale color at the given level.
pub const fn gray(level: u8) -> Rgb {
    Rgb {
        r: level,
        g: level,
        b: level,
    }
}
