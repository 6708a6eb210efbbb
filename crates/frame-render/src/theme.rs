//! Render surface size and palette.

use image::Rgba;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Width and height of every frame in pixels
    pub size: u32,
    /// Show the board from Black's side when the solver is Black
    pub flip_for_black: bool,
    pub light_square: Rgba<u8>,
    pub dark_square: Rgba<u8>,
    pub light_highlight: Rgba<u8>,
    pub dark_highlight: Rgba<u8>,
    pub break_background: Rgba<u8>,
    pub white_piece: Rgba<u8>,
    pub black_piece: Rgba<u8>,
    pub text: Rgba<u8>,
    pub accent: Rgba<u8>,
    pub message: Rgba<u8>,
    pub shadow: Rgba<u8>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            size: 800,
            flip_for_black: true,
            light_square: Rgba([255, 206, 158, 255]),
            dark_square: Rgba([209, 139, 71, 255]),
            light_highlight: Rgba([205, 209, 106, 255]),
            dark_highlight: Rgba([170, 162, 59, 255]),
            break_background: Rgba([40, 40, 40, 255]),
            white_piece: Rgba([250, 250, 250, 255]),
            black_piece: Rgba([30, 30, 30, 255]),
            text: Rgba([255, 255, 255, 255]),
            accent: Rgba([255, 255, 0, 255]),
            message: Rgba([173, 216, 230, 255]),
            shadow: Rgba([0, 0, 0, 255]),
        }
    }
}

impl RenderConfig {
    pub fn with_size(size: u32) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    /// Font pixel height as a fraction of the frame size.
    pub(crate) fn font_px(&self, fraction: f32) -> f32 {
        (self.size as f32 * fraction).max(6.0)
    }

    pub(crate) fn margin(&self) -> i32 {
        (self.size as f32 * 0.025).round() as i32
    }
}
