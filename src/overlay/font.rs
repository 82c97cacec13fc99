//! Embedded 5x7 bitmap font for burned-in text
//!
//! Covers digits, A-Z and the punctuation used by the telemetry readouts.
//! Lowercase input is drawn with the uppercase glyphs.

use crate::video::Frame;

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
/// Horizontal advance per character, including one column of spacing
pub const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Rows top to bottom; bit 4 is the leftmost column
type Glyph = [u8; GLYPH_HEIGHT as usize];

const UNKNOWN: Glyph = [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04];

#[rustfmt::skip]
fn glyph(c: char) -> Glyph {
    match c.to_ascii_uppercase() {
        ' ' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
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
        'A' => [0x0E, 0x11, 0x11, 0x11, 0x1F, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '+' => [0x00, 0x04, 0x04, 0x1F, 0x04, 0x04, 0x00],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        '%' => [0x18, 0x19, 0x02, 0x04, 0x08, 0x13, 0x03],
        _ => UNKNOWN,
    }
}

/// Rendered width in pixels of `text` at `scale`
pub fn text_width(text: &str, scale: u32) -> u32 {
    let n = text.chars().count() as u32;
    if n == 0 {
        return 0;
    }
    (n * GLYPH_ADVANCE - 1) * scale
}

/// Draw `text` with its left edge at `x` and its baseline at `baseline`.
///
/// Glyph cells are `scale` pixels square. Anything outside the frame is
/// clipped.
pub fn draw_text(frame: &mut Frame, x: i64, baseline: i64, text: &str, rgb: [u8; 3], scale: u32) {
    let scale = i64::from(scale.max(1));
    let top = baseline - i64::from(GLYPH_HEIGHT) * scale;
    let advance = i64::from(GLYPH_ADVANCE) * scale;

    for (i, c) in text.chars().enumerate() {
        let origin_x = x + i as i64 * advance;
        if origin_x >= i64::from(frame.width) {
            break;
        }
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                let px = origin_x + i64::from(col) * scale;
                let py = top + row as i64 * scale;
                fill_cell(frame, px, py, scale, rgb);
            }
        }
    }
}

fn fill_cell(frame: &mut Frame, x: i64, y: i64, size: i64, rgb: [u8; 3]) {
    let x0 = x.clamp(0, i64::from(frame.width));
    let x1 = (x + size).clamp(0, i64::from(frame.width));
    let y0 = y.clamp(0, i64::from(frame.height));
    let y1 = (y + size).clamp(0, i64::from(frame.height));

    for py in y0..y1 {
        for px in x0..x1 {
            frame.put_pixel(px as u32, py as u32, rgb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 3] = [255, 255, 255];

    fn lit(frame: &Frame) -> usize {
        frame.data.chunks(3).filter(|p| *p == WHITE).count()
    }

    #[test]
    fn width_accounts_for_spacing_and_scale() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("8", 1), 5);
        assert_eq!(text_width("88", 2), 22);
    }

    #[test]
    fn draws_above_baseline() {
        let mut frame = Frame::new(20, 20);
        draw_text(&mut frame, 0, 10, "8", WHITE, 1);
        // Nothing at or below the baseline row
        for x in 0..20 {
            assert_eq!(frame.pixel(x, 10), Some([0, 0, 0]));
        }
        // Top stroke of the 8 sits on row baseline - 7
        assert_eq!(frame.pixel(1, 3), Some(WHITE));
        assert_eq!(frame.pixel(0, 3), Some([0, 0, 0]));
    }

    #[test]
    fn lowercase_matches_uppercase() {
        let mut upper = Frame::new(40, 12);
        let mut lower = Frame::new(40, 12);
        draw_text(&mut upper, 1, 9, "MPH", WHITE, 1);
        draw_text(&mut lower, 1, 9, "mph", WHITE, 1);
        assert_eq!(upper, lower);
    }

    #[test]
    fn scale_multiplies_coverage() {
        let mut small = Frame::new(40, 40);
        let mut big = Frame::new(40, 40);
        draw_text(&mut small, 0, 20, "1", WHITE, 1);
        draw_text(&mut big, 0, 20, "1", WHITE, 2);
        assert_eq!(lit(&big), lit(&small) * 4);
    }

    #[test]
    fn clips_at_frame_edges() {
        let mut frame = Frame::new(8, 8);
        draw_text(&mut frame, -3, 4, "WWW", WHITE, 2);
        draw_text(&mut frame, 6, 100, "0", WHITE, 2);
        assert!(lit(&frame) > 0);
    }
}
