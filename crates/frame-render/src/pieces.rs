//! Vector piece silhouettes.
//!
//! Shapes are defined in unit square coordinates (x right, y down) and scaled
//! to the square size at draw time. Each piece is a filled body plus a
//! contrasting outline.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_circle_mut, draw_hollow_polygon_mut, draw_polygon_mut,
};
use imageproc::point::Point;
use shakmaty::Role;

enum Part {
    Polygon(&'static [(f32, f32)]),
    /// centre x, centre y, radius
    Circle(f32, f32, f32),
}

const BASE: &[(f32, f32)] = &[(0.22, 0.78), (0.78, 0.78), (0.78, 0.88), (0.22, 0.88)];

const PAWN: &[Part] = &[
    Part::Polygon(&[(0.35, 0.78), (0.43, 0.45), (0.57, 0.45), (0.65, 0.78)]),
    Part::Circle(0.5, 0.34, 0.13),
    Part::Polygon(BASE),
];

const ROOK: &[Part] = &[
    Part::Polygon(&[(0.3, 0.78), (0.33, 0.35), (0.67, 0.35), (0.7, 0.78)]),
    Part::Polygon(&[
        (0.27, 0.36),
        (0.27, 0.16),
        (0.36, 0.16),
        (0.36, 0.24),
        (0.45, 0.24),
        (0.45, 0.16),
        (0.55, 0.16),
        (0.55, 0.24),
        (0.64, 0.24),
        (0.64, 0.16),
        (0.73, 0.16),
        (0.73, 0.36),
    ]),
    Part::Polygon(BASE),
];

const KNIGHT: &[Part] = &[
    Part::Polygon(&[
        (0.3, 0.78),
        (0.36, 0.56),
        (0.27, 0.5),
        (0.25, 0.4),
        (0.4, 0.26),
        (0.44, 0.13),
        (0.52, 0.21),
        (0.64, 0.27),
        (0.73, 0.48),
        (0.71, 0.78),
    ]),
    Part::Polygon(BASE),
];

const BISHOP: &[Part] = &[
    Part::Polygon(&[(0.35, 0.78), (0.43, 0.5), (0.57, 0.5), (0.65, 0.78)]),
    Part::Polygon(&[(0.5, 0.17), (0.63, 0.33), (0.59, 0.5), (0.41, 0.5), (0.37, 0.33)]),
    Part::Circle(0.5, 0.13, 0.045),
    Part::Polygon(BASE),
];

const QUEEN: &[Part] = &[
    Part::Polygon(&[
        (0.28, 0.78),
        (0.2, 0.3),
        (0.36, 0.55),
        (0.4, 0.22),
        (0.5, 0.5),
        (0.6, 0.22),
        (0.64, 0.55),
        (0.8, 0.3),
        (0.72, 0.78),
    ]),
    Part::Circle(0.2, 0.27, 0.045),
    Part::Circle(0.4, 0.19, 0.045),
    Part::Circle(0.6, 0.19, 0.045),
    Part::Circle(0.8, 0.27, 0.045),
    Part::Polygon(BASE),
];

const KING: &[Part] = &[
    Part::Polygon(&[(0.3, 0.78), (0.27, 0.46), (0.73, 0.46), (0.7, 0.78)]),
    Part::Polygon(&[(0.27, 0.46), (0.38, 0.32), (0.62, 0.32), (0.73, 0.46)]),
    Part::Polygon(&[(0.46, 0.08), (0.54, 0.08), (0.54, 0.32), (0.46, 0.32)]),
    Part::Polygon(&[(0.38, 0.14), (0.62, 0.14), (0.62, 0.22), (0.38, 0.22)]),
    Part::Polygon(BASE),
];

fn parts(role: Role) -> &'static [Part] {
    match role {
        Role::Pawn => PAWN,
        Role::Knight => KNIGHT,
        Role::Bishop => BISHOP,
        Role::Rook => ROOK,
        Role::Queen => QUEEN,
        Role::King => KING,
    }
}

/// Draw a piece into the square whose top-left corner is (`x`, `y`).
pub fn draw_piece(
    img: &mut RgbaImage,
    role: Role,
    x: i32,
    y: i32,
    square: u32,
    fill: Rgba<u8>,
    outline: Rgba<u8>,
) {
    let s = square as f32;
    let to_px = |(u, v): (f32, f32)| (x as f32 + u * s, y as f32 + v * s);

    for part in parts(role) {
        match part {
            Part::Polygon(points) => {
                let filled = dedup_polygon(points.iter().map(|&p| {
                    let (px, py) = to_px(p);
                    Point::new(px.round() as i32, py.round() as i32)
                }));
                if filled.len() < 3 {
                    continue;
                }
                draw_polygon_mut(img, &filled, fill);

                let hollow: Vec<Point<f32>> = filled
                    .iter()
                    .map(|p| Point::new(p.x as f32, p.y as f32))
                    .collect();
                draw_hollow_polygon_mut(img, &hollow, outline);
            }
            Part::Circle(cx, cy, r) => {
                let (px, py) = to_px((*cx, *cy));
                let center = (px.round() as i32, py.round() as i32);
                let radius = ((r * s).round() as i32).max(1);
                draw_filled_circle_mut(img, center, radius, fill);
                draw_hollow_circle_mut(img, center, radius, outline);
            }
        }
    }
}

/// Drop repeated vertices; imageproc rejects polygons whose first and last
/// points coincide, which rounding can produce on tiny squares.
fn dedup_polygon(points: impl Iterator<Item = Point<i32>>) -> Vec<Point<i32>> {
    let mut out: Vec<Point<i32>> = Vec::new();
    for p in points {
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    while out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}
