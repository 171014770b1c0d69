//! Drawing seam for the presentation layer
//!
//! The core never renders; it hands world-space geometry to whatever canvas
//! the embedding UI provides.

use glam::Vec2;

use crate::sim::path::Rect;

/// Crayon palette indexed by a stroke's color/tool index
pub mod palette {
    pub const VALUES: [u32; 8] = [
        0x00_2e_2e_2e, // charcoal (ground)
        0x00_b8_0d_0d, // red
        0x00_14_6e_b8, // blue
        0x00_1d_8a_3a, // green
        0x00_e8_9c_00, // amber
        0x00_7a_3c_9e, // violet
        0x00_c6_52_10, // rust
        0x00_5a_32_1e, // brown
    ];

    /// Clamp an index into the palette, warning on out-of-range values
    pub fn color(index: usize) -> u32 {
        if index >= VALUES.len() {
            log::warn!("color index {} out of range, using last", index);
            return VALUES[VALUES.len() - 1];
        }
        VALUES[index]
    }
}

/// Outline color for persistent force fields
pub const FIELD_OUTLINE: u32 = 0x00_60_60_60;
/// Outline color for interactively drawn jetstreams
pub const JETSTREAM_OUTLINE: u32 = 0x00_88_a8_c8;
/// Color of the joint-candidate indicator
pub const JOINT_INDICATOR: u32 = 0x00_60_60_60;

/// Minimal drawing surface implemented by the presentation layer
pub trait Canvas {
    /// Stroke a world-space polyline
    fn draw_polyline(&mut self, points: &[Vec2], color: u32);
    /// Outline a rectangle
    fn draw_rect(&mut self, rect: Rect, color: u32);
    /// Mark a single point (particles, joint indicators)
    fn draw_dot(&mut self, pos: Vec2, color: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_clamps() {
        assert_eq!(palette::color(1), palette::VALUES[1]);
        assert_eq!(palette::color(999), palette::VALUES[7]);
    }
}
