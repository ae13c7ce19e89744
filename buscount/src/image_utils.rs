//! Frame annotation: boxes, track paths, the crossing line and counts

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect as PixelBox;
use linetrack::{Counts, Detection, Line, Point, Rect, Track, WorldConfig};

const CROSSING_COLOR: Rgb<u8> = Rgb([220, 30, 30]);
const BOUND_COLOR: Rgb<u8> = Rgb([40, 80, 220]);
const DETECTION_COLOR: Rgb<u8> = Rgb([235, 235, 235]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

const GLYPH_WIDTH: i32 = 5;
const GLYPH_HEIGHT: i32 = 7;

/// 5x7 bitmap rows for the characters the overlay uses
fn glyph(ch: char) -> [u8; 7] {
    match ch {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'N' => [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '#' => [0x0A, 0x0A, 0x1F, 0x0A, 0x1F, 0x0A, 0x0A],
        ' ' => [0x00; 7],
        _ => [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F],
    }
}

fn put_pixel_clipped(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Draw text with the built-in bitmap font, optionally on a background
pub fn draw_text(
    img: &mut RgbImage,
    text: &str,
    x: i32,
    y: i32,
    color: Rgb<u8>,
    bg_color: Option<Rgb<u8>>,
) {
    let chars: Vec<char> = text.to_uppercase().chars().collect();

    if let Some(bg) = bg_color {
        let text_width = chars.len() as i32 * (GLYPH_WIDTH + 1) + 2;
        for dy in 0..GLYPH_HEIGHT + 2 {
            for dx in 0..text_width {
                put_pixel_clipped(img, x + dx, y + dy, bg);
            }
        }
    }

    for (i, ch) in chars.into_iter().enumerate() {
        let char_x = x + 1 + i as i32 * (GLYPH_WIDTH + 1);
        for (row, bits) in glyph(ch).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                    put_pixel_clipped(img, char_x + col, y + 1 + row as i32, color);
                }
            }
        }
    }
}

/// Deterministic, reasonably dark colour for a track id
pub fn track_color(id: u64) -> Rgb<u8> {
    let mut hash = (id as u32).wrapping_mul(2654435761);
    let r = (hash & 0xFF) as u16;
    hash = hash.wrapping_mul(2654435761);
    let g = (hash & 0xFF) as u16;
    hash = hash.wrapping_mul(2654435761);
    let b = (hash & 0xFF) as u16;

    // Cap brightness, and lift the dominant channel so the colour is saturated
    let lift = |c: u16, o1: u16, o2: u16| {
        c.min(180).max(if c > o1 && c > o2 { 100 } else { 40 }) as u8
    };
    Rgb([lift(r, g, b), lift(g, r, b), lift(b, r, g)])
}

/// Draw a rectangle outline `thickness` pixels wide, growing outwards
pub fn draw_rect(
    img: &mut RgbImage,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    color: Rgb<u8>,
    thickness: i32,
) {
    if width == 0 || height == 0 {
        return;
    }
    for offset in 0..thickness.max(1) {
        let outline = PixelBox::at(x - offset, y - offset)
            .of_size(width + 2 * offset as u32, height + 2 * offset as u32);
        draw_hollow_rect_mut(img, outline, color);
    }
}

fn to_pixel(p: Point, img: &RgbImage) -> (f32, f32) {
    (p.x * img.width() as f32, p.y * img.height() as f32)
}

fn draw_world_line(img: &mut RgbImage, line: &Line, color: Rgb<u8>) {
    let a = to_pixel(line.a, img);
    let b = to_pixel(line.b, img);
    draw_line_segment_mut(img, a, b, color);
    // Second pass one pixel down for visibility
    draw_line_segment_mut(img, (a.0, a.1 + 1.0), (b.0, b.1 + 1.0), color);
}

fn draw_box(img: &mut RgbImage, bbox: &Rect, color: Rgb<u8>, thickness: i32) {
    if let Some(px) = bbox.to_pixels(img.width(), img.height()) {
        draw_rect(img, px.x as i32, px.y as i32, px.width, px.height, color, thickness);
    }
}

/// Draw the crossing line and bounds, raw detections, every track with its
/// id and path, and the running counts.
pub fn annotate(
    img: &mut RgbImage,
    world: &WorldConfig,
    tracks: &[Track],
    detections: &[Detection],
    counts: &Counts,
) {
    for bound in &world.bounds {
        draw_world_line(img, bound, BOUND_COLOR);
    }
    draw_world_line(img, &world.crossing, CROSSING_COLOR);

    for detection in detections {
        draw_box(img, &detection.bbox, DETECTION_COLOR, 1);
    }

    for track in tracks {
        let color = track_color(track.id());
        let thickness = if track.was_detected() { 2 } else { 1 };
        draw_box(img, &track.bbox(), color, thickness);

        let points: Vec<(f32, f32)> = track.path().map(|p| to_pixel(*p, img)).collect();
        for pair in points.windows(2) {
            draw_line_segment_mut(img, pair[0], pair[1], color);
        }
        if let Some(&(x, y)) = points.last() {
            draw_filled_circle_mut(img, (x as i32, y as i32), 2, color);
        }

        if let Some(px) = track.bbox().to_pixels(img.width(), img.height()) {
            let label = format!("#{}", track.id());
            let y = px.y as i32 - GLYPH_HEIGHT - 3;
            draw_text(img, &label, px.x as i32, y, TEXT_COLOR, Some(color));
        }
    }

    let summary = format!("IN: {}  OUT: {}", counts.inside, counts.outside);
    draw_text(img, &summary, 4, 4, TEXT_COLOR, Some(TEXT_BACKGROUND));
}
