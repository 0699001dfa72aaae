use crate::braille::BrailleCanvas;
use crate::map::geometry::{draw_circle, draw_pin, draw_polyline, draw_ring, fill_polygon_stippled};
use crate::map::layers::{Category, LayerRegistry, MarkerStyle, Shape};
use crate::map::projection::Viewport;

/// Graticule spacings in degrees, coarse to fine
const GRID_STEPS: [f64; 13] = [
    10.0, 5.0, 2.0, 1.0, 0.5, 0.2, 0.1, 0.05, 0.02, 0.01, 0.005, 0.002, 0.001,
];

/// Minimum pixel distance between graticule lines
const GRID_MIN_SPACING_PX: f64 = 48.0;

/// Rasterised map, one canvas per layer so each can be colored separately
pub struct MapLayers {
    /// Base map (graticule)
    pub base: BrailleCanvas,
    /// Visible overlay canvases in back-to-front order
    pub overlays: Vec<(Category, BrailleCanvas)>,
    /// Candidate pin of an in-progress proposal
    pub candidate: Option<BrailleCanvas>,
}

/// Display settings that are not overlay groups
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub show_graticule: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_graticule: true,
        }
    }
}

/// Draws the base map and overlay groups onto Braille canvases
#[derive(Default)]
pub struct MapRenderer {
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render into canvases of `width x height` characters.
    /// `candidate` is the (lon, lat) of the pin being placed, if any.
    pub fn render(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        registry: &LayerRegistry,
        candidate: Option<(f64, f64)>,
    ) -> MapLayers {
        let mut base = BrailleCanvas::new(width, height);
        if self.settings.show_graticule {
            draw_graticule(&mut base, viewport);
        }

        let overlays = registry
            .groups()
            .filter(|g| g.is_visible())
            .map(|group| {
                let mut canvas = BrailleCanvas::new(width, height);
                for child in group.children() {
                    draw_shape(&mut canvas, &child.shape, viewport);
                }
                (group.category, canvas)
            })
            .collect();

        let candidate = candidate.map(|(lon, lat)| {
            let mut canvas = BrailleCanvas::new(width, height);
            let (px, py) = viewport.project(lon, lat);
            draw_pin(&mut canvas, px, py, 3);
            canvas
        });

        MapLayers {
            base,
            overlays,
            candidate,
        }
    }
}

fn marker_radius(zoom: f64) -> i32 {
    if zoom >= 17.0 {
        2
    } else {
        1
    }
}

fn draw_shape(canvas: &mut BrailleCanvas, shape: &Shape, viewport: &Viewport) {
    match shape {
        Shape::Markers { style, points } => {
            for &(lon, lat) in points {
                let (px, py) = viewport.project(lon, lat);
                if !viewport.is_visible(px, py) {
                    continue;
                }
                match style {
                    MarkerStyle::Circle => draw_circle(canvas, px, py, marker_radius(viewport.zoom)),
                    MarkerStyle::Pin => draw_pin(canvas, px, py, 2),
                }
            }
        }
        Shape::Region { polygons } => {
            for rings in polygons {
                let projected: Vec<Vec<(i32, i32)>> = rings
                    .iter()
                    .map(|ring| ring.iter().map(|&(lon, lat)| viewport.project(lon, lat)).collect())
                    .collect();

                let Some(exterior) = projected.first() else {
                    continue;
                };
                if !bbox_might_be_visible(viewport, exterior) {
                    continue;
                }

                fill_polygon_stippled(canvas, &projected);
                for ring in &projected {
                    draw_ring(canvas, ring);
                }
            }
        }
        Shape::Lines { lines } => {
            for line in lines {
                let projected: Vec<(i32, i32)> =
                    line.iter().map(|&(lon, lat)| viewport.project(lon, lat)).collect();
                if bbox_might_be_visible(viewport, &projected) {
                    draw_polyline(canvas, &projected);
                }
            }
        }
        Shape::Collection(members) => {
            for member in members {
                draw_shape(canvas, member, viewport);
            }
        }
    }
}

fn bbox_might_be_visible(viewport: &Viewport, points: &[(i32, i32)]) -> bool {
    if points.is_empty() {
        return false;
    }
    let min = points.iter().fold((i32::MAX, i32::MAX), |m, p| (m.0.min(p.0), m.1.min(p.1)));
    let max = points.iter().fold((i32::MIN, i32::MIN), |m, p| (m.0.max(p.0), m.1.max(p.1)));
    viewport.line_might_be_visible(min, max)
}

/// Dotted lines at round lon/lat values
fn draw_graticule(canvas: &mut BrailleCanvas, viewport: &Viewport) {
    let ppd = viewport.pixels_per_degree();
    let step = GRID_STEPS
        .iter()
        .rev()
        .copied()
        .find(|s| s * ppd >= GRID_MIN_SPACING_PX)
        .unwrap_or(GRID_STEPS[0]);

    let (w, h) = (viewport.width as i32, viewport.height as i32);
    let (west, north) = viewport.unproject(0, 0);
    let (east, south) = viewport.unproject(w - 1, h - 1);

    let mut lon = (west / step).ceil() * step;
    while lon <= east {
        let (px, _) = viewport.project(lon, viewport.center_lat);
        for py in (0..h).step_by(3) {
            canvas.set_pixel_signed(px, py);
        }
        lon += step;
    }

    let mut lat = (south / step).ceil() * step;
    while lat <= north {
        let (_, py) = viewport.project(viewport.center_lon, lat);
        for px in (0..w).step_by(3) {
            canvas.set_pixel_signed(px, py);
        }
        lat += step;
    }
}
