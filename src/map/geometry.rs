use crate::braille::BrailleCanvas;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Line doubled one pixel right and down, for wide outlines
pub fn draw_thick_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    draw_line(canvas, x0, y0, x1, y1);
    draw_line(canvas, x0 + 1, y0, x1 + 1, y1);
    draw_line(canvas, x0, y0 + 1, x1, y1 + 1);
}

/// Clip a pixel-space segment to the canvas, one pixel of margin on each
/// side (Liang-Barsky). `None` when nothing of it is on the canvas.
pub fn clip_segment(
    canvas: &BrailleCanvas,
    (x0, y0): (f64, f64),
    (x1, y1): (f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (width, height) = canvas.pixel_size();
    let (min_x, min_y) = (-1.0, -1.0);
    let (max_x, max_y) = (width as f64, height as f64);
    let (dx, dy) = (x1 - x0, y1 - y0);

    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [(-dx, x0 - min_x), (dx, max_x - x0), (-dy, y0 - min_y), (dy, max_y - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some(((x0 + t0 * dx, y0 + t0 * dy), (x0 + t1 * dx, y0 + t1 * dy)))
}

/// Draw the on-canvas part of a segment. Bresenham only walks clipped
/// pixels, so far-off vertices cost nothing.
pub fn draw_segment(canvas: &mut BrailleCanvas, from: (f64, f64), to: (f64, f64), thick: bool) {
    let Some(((x0, y0), (x1, y1))) = clip_segment(canvas, from, to) else {
        return;
    };
    let (x0, y0) = (x0.round() as i32, y0.round() as i32);
    let (x1, y1) = (x1.round() as i32, y1.round() as i32);
    if thick {
        draw_thick_line(canvas, x0, y0, x1, y1);
    } else {
        draw_line(canvas, x0, y0, x1, y1);
    }
}

/// Draw a filled circle (photo marker disc)
pub fn draw_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

/// 4x4 ordered-dither thresholds
const BAYER: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// Whether pixel `(x, y)` is lit for a fill of the given opacity
#[inline(always)]
pub fn dither_lit(x: i32, y: i32, opacity: f64) -> bool {
    let t = BAYER[y.rem_euclid(4) as usize][x.rem_euclid(4) as usize];
    (t as f64 + 0.5) / 16.0 < opacity
}

/// Scanline-fill a polygon (pixel-space rings, even-odd rule) with an
/// ordered-dither pattern whose density follows `opacity`
pub fn fill_polygon(canvas: &mut BrailleCanvas, rings: &[Vec<(f64, f64)>], opacity: f64) {
    if opacity <= 0.0 {
        return;
    }
    let (width, height) = canvas.pixel_size();

    let (min_y, max_y) = rings
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    if !min_y.is_finite() {
        return;
    }
    let y_start = min_y.floor().max(0.0) as i32;
    let y_end = max_y.ceil().min(height as f64 - 1.0) as i32;

    let mut crossings: Vec<f64> = Vec::new();
    for y in y_start..=y_end {
        let sy = y as f64 + 0.5;
        crossings.clear();
        for ring in rings {
            let n = ring.len();
            for i in 0..n {
                let (x1, y1) = ring[i];
                let (x2, y2) = ring[(i + 1) % n];
                if (y1 > sy) != (y2 > sy) {
                    crossings.push(x1 + (sy - y1) * (x2 - x1) / (y2 - y1));
                }
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            let x_start = span[0].round().max(0.0) as i32;
            let x_end = (span[1].round() - 1.0).min(width as f64 - 1.0) as i32;
            for x in x_start..=x_end {
                if dither_lit(x, y, opacity) {
                    canvas.set_pixel_signed(x, y);
                }
            }
        }
    }
}
