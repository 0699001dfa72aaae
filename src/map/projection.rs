use std::f64::consts::PI;

/// Braille pixels spanned by one slippy-map tile
pub const TILE_PIXELS: f64 = 128.0;
pub const MIN_ZOOM: f64 = 2.0;
pub const MAX_ZOOM: f64 = 19.0;

/// Latitude limit of the Web Mercator square
const MAX_LAT: f64 = 85.051_128_78;

/// Viewport over a Web Mercator map using slippy-map zoom levels
/// (the whole world is `TILE_PIXELS * 2^zoom` pixels wide).
#[derive(Clone, Debug)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude
    pub center_lat: f64,
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

/// Normalized Web Mercator coordinates in [0, 1)
#[inline(always)]
fn mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = (lon + 180.0) / 360.0;
    let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    (x, y)
}

#[inline(always)]
fn inverse_mercator(x: f64, y: f64) -> (f64, f64) {
    let lon = x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
    (lon, lat)
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat: center_lat.clamp(-MAX_LAT, MAX_LAT),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        }
    }

    /// World size in pixels at the current zoom
    fn world_size(&self) -> f64 {
        TILE_PIXELS * 2f64.powf(self.zoom)
    }

    /// Horizontal pixels per degree of longitude
    pub fn pixels_per_degree(&self) -> f64 {
        self.world_size() / 360.0
    }

    /// Center in world pixel coordinates
    fn center_world(&self) -> (f64, f64) {
        let (x, y) = mercator(self.center_lon, self.center_lat);
        let size = self.world_size();
        (x * size, y * size)
    }

    /// Project a geographic coordinate (lon, lat) to canvas pixels
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let (x, y) = mercator(lon, lat);
        let size = self.world_size();
        let (cx, cy) = self.center_world();

        let px = (x * size - cx + self.width as f64 / 2.0).floor() as i32;
        let py = (y * size - cy + self.height as f64 / 2.0).floor() as i32;
        (px, py)
    }

    /// Canvas pixel back to geographic coordinates (lon, lat).
    /// Uses the pixel center so a round-trip lands in the same pixel.
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let size = self.world_size();
        let (cx, cy) = self.center_world();

        let x = (px as f64 + 0.5 - self.width as f64 / 2.0 + cx) / size;
        let y = (py as f64 + 0.5 - self.height as f64 / 2.0 + cy) / size;
        inverse_mercator(x.rem_euclid(1.0), y.clamp(0.0, 1.0))
    }

    /// Pan the viewport by a pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let size = self.world_size();
        let (cx, cy) = self.center_world();
        let x = ((cx + dx as f64) / size).rem_euclid(1.0);
        let y = ((cy + dy as f64) / size).clamp(0.0, 1.0);
        let (lon, lat) = inverse_mercator(x, y);
        self.center_lon = lon;
        self.center_lat = lat.clamp(-MAX_LAT, MAX_LAT);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + 1.0).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom - 1.0).max(MIN_ZOOM);
    }

    /// Zoom in keeping the location under (px, py) fixed
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0);
    }

    /// Zoom out keeping the location under (px, py) fixed
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, -1.0);
    }

    fn zoom_at(&mut self, px: i32, py: i32, step: f64) {
        let (lon, lat) = self.unproject(px, py);
        self.zoom = (self.zoom + step).clamp(MIN_ZOOM, MAX_ZOOM);

        // Pan so the anchor lands back under the pointer
        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Check if a projected point is near enough to the canvas to draw
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Rough bounding-box check for a line segment
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}
