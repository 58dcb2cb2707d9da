use super::projection::Viewport;

/// Initial center and zoom of the map
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HomeView {
    pub lon: f64,
    pub lat: f64,
    pub zoom: f64,
}

impl Default for HomeView {
    fn default() -> Self {
        Self {
            lon: 0.0,
            lat: 20.0,
            zoom: 1.0,
        }
    }
}

/// The interactive map: viewport plus the interaction lock.
///
/// While locked, pan and zoom requests are ignored and the zoom control is
/// hidden.
pub struct MapView {
    pub viewport: Viewport,
    home: HomeView,
    interactive: bool,
}

impl MapView {
    /// `width`/`height` are in terminal cells; braille gives 2x4 pixels each
    pub fn new(home: HomeView, width: usize, height: usize) -> Self {
        Self {
            viewport: Viewport::new(home.lon, home.lat, home.zoom, width * 2, height * 4),
            home,
            interactive: true,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.viewport.width = width * 2;
        self.viewport.height = height * 4;
    }

    /// Return to the home center and zoom
    pub fn reset(&mut self) {
        self.viewport = Viewport::new(
            self.home.lon,
            self.home.lat,
            self.home.zoom,
            self.viewport.width,
            self.viewport.height,
        );
    }

    pub fn disable_interaction(&mut self) {
        self.interactive = false;
    }

    pub fn enable_interaction(&mut self) {
        self.interactive = true;
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Whether the zoom control is shown
    pub fn shows_zoom_control(&self) -> bool {
        self.interactive
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        if self.interactive {
            self.viewport.pan(dx, dy);
        }
    }

    pub fn zoom_in(&mut self) {
        if self.interactive {
            self.viewport.zoom_in();
        }
    }

    pub fn zoom_out(&mut self) {
        if self.interactive {
            self.viewport.zoom_out();
        }
    }

    /// Zoom towards a braille pixel position
    pub fn zoom_at(&mut self, px: i32, py: i32, zoom_in: bool) {
        if self.interactive {
            self.viewport.zoom_at(px, py, zoom_in);
        }
    }

    /// Zoom level as shown by the zoom control
    pub fn zoom_label(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    /// Current center coordinates as a string
    pub fn center_label(&self) -> String {
        let vp = &self.viewport;
        format!(
            "{:.1}°{}, {:.1}°{}",
            vp.center_lat.abs(),
            if vp.center_lat >= 0.0 { "N" } else { "S" },
            vp.center_lon.abs(),
            if vp.center_lon >= 0.0 { "E" } else { "W" }
        )
    }
}
