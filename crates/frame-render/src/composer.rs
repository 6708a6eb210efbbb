//! Overlay composer: board snapshot + overlay metadata -> RGBA frame.
//!
//! Layout (fractions of the frame size):
//!
//! - left column from the top-left corner: puzzle number, rating,
//!   side to move, title, message
//! - countdown number centred on the board
//! - break frames (no board): title and `k/total` centred on a flat background
//!
//! Rendering is a pure function of the scene frame, the config and the font,
//! so every frame of a scene renders to identical bytes.

use std::io::Cursor;
use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use puzzle_core::board::{BoardSnapshot, Side};
use puzzle_core::scene::{OverlayMetadata, SceneFrame};
use shakmaty::{Color, Square};

use crate::error::RenderError;
use crate::pieces::draw_piece;
use crate::theme::RenderConfig;

const SMALL: f32 = 0.035;
const MEDIUM: f32 = 0.045;
const BREAK_TITLE: f32 = 0.0875;
const BREAK_INDEX: f32 = 0.05;
const COUNTDOWN: f32 = 0.15;

/// One rasterized frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFrame {
    pub image: RgbaImage,
}

impl RenderedFrame {
    pub fn to_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut buf = Cursor::new(Vec::new());
        PngEncoder::new(&mut buf).write_image(
            self.image.as_raw(),
            self.image.width(),
            self.image.height(),
            ExtendedColorType::Rgba8,
        )?;
        Ok(buf.into_inner())
    }
}

#[derive(Clone)]
pub struct FrameComposer {
    config: RenderConfig,
    font: Option<FontArc>,
}

impl FrameComposer {
    /// A composer without a font can only draw frames that carry no text.
    pub fn new(config: RenderConfig, font: Option<FontArc>) -> Result<Self, RenderError> {
        if config.size < 8 {
            return Err(RenderError::InvalidSize(config.size));
        }
        Ok(Self { config, font })
    }

    pub fn with_font_file(config: RenderConfig, path: &Path) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path).map_err(|e| RenderError::InvalidFont {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| RenderError::InvalidFont {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::new(config, Some(font))
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn render(&self, frame: &SceneFrame) -> Result<RenderedFrame, RenderError> {
        let size = self.config.size;
        let image = match &frame.board {
            Some(board) => {
                let mut img = RgbaImage::from_pixel(size, size, self.config.dark_square);
                let flipped =
                    self.config.flip_for_black && frame.overlay.side_to_move == Some(Side::Black);
                self.draw_board(&mut img, board, flipped);
                self.draw_overlays(&mut img, &frame.overlay)?;
                img
            }
            None => {
                let mut img = RgbaImage::from_pixel(size, size, self.config.break_background);
                self.draw_break(&mut img, &frame.overlay)?;
                img
            }
        };
        Ok(RenderedFrame { image })
    }

    fn square_px(&self) -> (u32, i32) {
        let square = self.config.size / 8;
        let offset = ((self.config.size - square * 8) / 2) as i32;
        (square, offset)
    }

    /// Top-left pixel of a square for the given orientation.
    fn square_origin(&self, sq: Square, flipped: bool) -> (i32, i32) {
        let (square, offset) = self.square_px();
        let file = sq.file() as i32;
        let rank = sq.rank() as i32;
        let (col, row) = if flipped {
            (7 - file, rank)
        } else {
            (file, 7 - rank)
        };
        (offset + col * square as i32, offset + row * square as i32)
    }

    fn draw_board(&self, img: &mut RgbaImage, snapshot: &BoardSnapshot, flipped: bool) {
        let (square, _) = self.square_px();
        let highlighted = |sq: Square| {
            snapshot
                .last_move
                .map(|m| m.from == sq || m.to == sq)
                .unwrap_or(false)
        };

        for sq in Square::ALL {
            let (x, y) = self.square_origin(sq, flipped);
            let light = sq.is_light();
            let color = match (light, highlighted(sq)) {
                (true, false) => self.config.light_square,
                (false, false) => self.config.dark_square,
                (true, true) => self.config.light_highlight,
                (false, true) => self.config.dark_highlight,
            };
            draw_filled_rect_mut(img, Rect::at(x, y).of_size(square, square), color);

            if let Some(piece) = snapshot.board.piece_at(sq) {
                let (fill, outline) = match piece.color {
                    Color::White => (self.config.white_piece, self.config.black_piece),
                    Color::Black => (self.config.black_piece, self.config.white_piece),
                };
                draw_piece(img, piece.role, x, y, square, fill, outline);
            }
        }
    }

    fn font(&self) -> Result<&FontArc, RenderError> {
        self.font.as_ref().ok_or(RenderError::FontUnavailable)
    }

    fn draw_overlays(
        &self,
        img: &mut RgbaImage,
        overlay: &OverlayMetadata,
    ) -> Result<(), RenderError> {
        let margin = self.config.margin();
        let gap = (self.config.size as f32 * 0.01).round() as i32;

        let mut lines: Vec<(String, f32, Rgba<u8>)> = Vec::new();
        if let Some((number, total)) = overlay.puzzle_index {
            lines.push((format!("Puzzle {number}/{total}"), SMALL, self.config.accent));
        }
        if let Some(rating) = overlay.rating {
            lines.push((format!("Rating: {rating}"), MEDIUM, self.config.text));
        }
        if let Some(side) = overlay.side_to_move {
            lines.push((format!("{side} to move"), MEDIUM, self.config.text));
        }
        if let Some(title) = &overlay.title {
            lines.push((title.clone(), MEDIUM, self.config.accent));
        }
        if let Some(message) = &overlay.message {
            lines.push((message.clone(), SMALL, self.config.message));
        }

        let mut y = margin;
        for (text, fraction, color) in &lines {
            let scale = PxScale::from(self.config.font_px(*fraction));
            let (_, h) = self.draw_shadowed(img, text, margin, y, scale, *color)?;
            y += h as i32 + gap;
        }

        if let Some(value) = overlay.countdown {
            let scale = PxScale::from(self.config.font_px(COUNTDOWN));
            self.draw_centered(img, &value.to_string(), None, scale, self.config.text)?;
        }

        Ok(())
    }

    fn draw_break(&self, img: &mut RgbaImage, overlay: &OverlayMetadata) -> Result<(), RenderError> {
        let size = self.config.size as f32;
        if let Some(title) = &overlay.title {
            let scale = PxScale::from(self.config.font_px(BREAK_TITLE));
            let y = (size * 0.375) as i32;
            self.draw_centered(img, title, Some(y), scale, self.config.text)?;
        }
        if let Some((number, total)) = overlay.puzzle_index {
            let scale = PxScale::from(self.config.font_px(BREAK_INDEX));
            let y = (size * 0.5) as i32;
            self.draw_centered(
                img,
                &format!("{number}/{total}"),
                Some(y),
                scale,
                self.config.accent,
            )?;
        }
        if let Some(message) = &overlay.message {
            let scale = PxScale::from(self.config.font_px(SMALL));
            let y = (size * 0.6) as i32;
            self.draw_centered(img, message, Some(y), scale, self.config.message)?;
        }
        Ok(())
    }

    /// Centre text horizontally; centre vertically too when `y` is `None`.
    fn draw_centered(
        &self,
        img: &mut RgbaImage,
        text: &str,
        y: Option<i32>,
        scale: PxScale,
        color: Rgba<u8>,
    ) -> Result<(), RenderError> {
        let font = self.font()?;
        let (w, h) = text_size(scale, font, text);
        let size = self.config.size as i32;
        let x = (size - w as i32) / 2;
        let y = y.unwrap_or((size - h as i32) / 2);
        self.draw_shadowed(img, text, x, y, scale, color)?;
        Ok(())
    }

    /// Draw text with a 2px drop shadow. Returns the text extent.
    fn draw_shadowed(
        &self,
        img: &mut RgbaImage,
        text: &str,
        x: i32,
        y: i32,
        scale: PxScale,
        color: Rgba<u8>,
    ) -> Result<(u32, u32), RenderError> {
        let font = self.font()?;
        let offset = ((self.config.size as f32) / 400.0).round().max(1.0) as i32;
        draw_text_mut(img, self.config.shadow, x + offset, y + offset, scale, font, text);
        draw_text_mut(img, color, x, y, scale, font, text);
        Ok(text_size(scale, font, text))
    }
}
