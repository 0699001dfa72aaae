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

/// Draw a filled circle (tree markers)
pub fn draw_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

/// Draw a pin marker whose tip sits on (x, y): a hollow head above a stem.
pub fn draw_pin(canvas: &mut BrailleCanvas, x: i32, y: i32, size: i32) {
    let head_y = y - size * 2;
    for dy in -size..=size {
        for dx in -size..=size {
            let d = dx * dx + dy * dy;
            if d <= size * size && d >= (size - 1) * (size - 1) {
                canvas.set_pixel_signed(x + dx, head_y + dy);
            }
        }
    }
    draw_line(canvas, x, head_y + size, x, y);
}

/// Connect projected points in order, leaving the ends open
pub fn draw_polyline(canvas: &mut BrailleCanvas, points: &[(i32, i32)]) {
    for pair in points.windows(2) {
        draw_line(canvas, pair[0].0, pair[0].1, pair[1].0, pair[1].1);
    }
}

/// Outline a closed ring of projected points
pub fn draw_ring(canvas: &mut BrailleCanvas, ring: &[(i32, i32)]) {
    if ring.len() < 2 {
        return;
    }
    draw_polyline(canvas, ring);
    let (first, last) = (ring[0], ring[ring.len() - 1]);
    if first != last {
        draw_line(canvas, last.0, last.1, first.0, first.1);
    }
}

/// Scanline fill of a polygon (exterior ring followed by holes) with a
/// checkerboard stipple, which reads as a semi-transparent shade in Braille.
pub fn fill_polygon_stippled(canvas: &mut BrailleCanvas, rings: &[Vec<(i32, i32)>]) {
    let Some(exterior) = rings.first() else {
        return;
    };
    if exterior.len() < 3 {
        return;
    }

    let min_y = exterior.iter().map(|p| p.1).min().unwrap_or(0).max(0);
    let max_y = exterior
        .iter()
        .map(|p| p.1)
        .max()
        .unwrap_or(0)
        .min(canvas.pixel_height() as i32 - 1);
    let max_x = canvas.pixel_width() as i32 - 1;

    let mut crossings = Vec::new();
    for y in min_y..=max_y {
        crossings.clear();
        let scan = y as f64 + 0.5;
        for ring in rings {
            collect_crossings(ring, scan, &mut crossings);
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            let start = (span[0].ceil() as i32).max(0);
            let end = (span[1].floor() as i32).min(max_x);
            for x in start..=end {
                if (x + y) % 2 == 0 {
                    canvas.set_pixel_signed(x, y);
                }
            }
        }
    }
}

/// X positions where the horizontal line at `scan` crosses the ring edges
fn collect_crossings(ring: &[(i32, i32)], scan: f64, out: &mut Vec<f64>) {
    let n = ring.len();
    if n < 3 {
        return;
    }
    for i in 0..n {
        let (x0, y0) = (ring[i].0 as f64, ring[i].1 as f64);
        let (x1, y1) = (ring[(i + 1) % n].0 as f64, ring[(i + 1) % n].1 as f64);
        if (y0 <= scan && y1 > scan) || (y1 <= scan && y0 > scan) {
            out.push(x0 + (scan - y0) / (y1 - y0) * (x1 - x0));
        }
    }
}

/// Even-odd point-in-polygon test in screen space (holes included)
pub fn polygon_contains(rings: &[Vec<(i32, i32)>], px: i32, py: i32) -> bool {
    let mut crossings = Vec::new();
    let scan = py as f64 + 0.5;
    for ring in rings {
        collect_crossings(ring, scan, &mut crossings);
    }
    let x = px as f64 + 0.5;
    crossings.iter().filter(|&&cx| cx < x).count() % 2 == 1
}

/// Whether (px, py) lies within `tolerance` pixels of any polyline segment
pub fn polyline_near(points: &[(i32, i32)], px: i32, py: i32, tolerance: f64) -> bool {
    let (x, y) = (px as f64, py as f64);
    let near = |(x0, y0): (f64, f64), (x1, y1): (f64, f64)| {
        let (dx, dy) = (x1 - x0, y1 - y0);
        let len2 = dx * dx + dy * dy;
        let t = if len2 == 0.0 {
            0.0
        } else {
            (((x - x0) * dx + (y - y0) * dy) / len2).clamp(0.0, 1.0)
        };
        let (cx, cy) = (x0 + t * dx, y0 + t * dy);
        (x - cx).hypot(y - cy) <= tolerance
    };
    match points {
        [] => false,
        [only] => near((only.0 as f64, only.1 as f64), (only.0 as f64, only.1 as f64)),
        _ => points.windows(2).any(|pair| {
            near(
                (pair[0].0 as f64, pair[0].1 as f64),
                (pair[1].0 as f64, pair[1].1 as f64),
            )
        }),
    }
}
