use crate::api::{BackendClient, FetchError, ImportedDateRange, Resource};
use crate::catalog::{Autocomplete, CatalogIndex};
use crate::color::Rgb;
use crate::config::AppConfig;
use crate::data::decode_features;
use crate::map::{ChoroplethLayer, LegendScale, MapRenderer, MapView, Popup};
use crate::query::query_for;
use crate::state::{compute_input_availability, InputAvailability, Mode, ResourceType, SelectionState};
use chrono::NaiveDate;
use geojson::GeoJson;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Identifies one issued fetch. Only the latest token of each kind is honoured.
pub type RequestToken = u64;

/// A fetch the controller wants issued. The event loop runs it and feeds the
/// resulting [`AppEvent`] back into [`App::handle_event`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fetch {
    Catalog {
        token: RequestToken,
        resource_type: ResourceType,
    },
    Map {
        token: RequestToken,
        path: String,
    },
    DateRange,
}

impl Fetch {
    pub async fn run(self, client: &BackendClient) -> AppEvent {
        match self {
            Fetch::Catalog { token, resource_type } => AppEvent::CatalogLoaded {
                token,
                resource_type,
                result: client.fetch_catalog(resource_type).await,
            },
            Fetch::Map { token, path } => AppEvent::MapLoaded {
                token,
                result: client.fetch_map(&path).await,
            },
            Fetch::DateRange => AppEvent::DateRangeLoaded(client.fetch_imported_date_range().await),
        }
    }
}

/// Outcome of a [`Fetch`]
#[derive(Debug)]
pub enum AppEvent {
    CatalogLoaded {
        token: RequestToken,
        resource_type: ResourceType,
        result: Result<Vec<Resource>, FetchError>,
    },
    MapLoaded {
        token: RequestToken,
        result: Result<GeoJson, FetchError>,
    },
    DateRangeLoaded(Result<ImportedDateRange, FetchError>),
}

/// Sidebar control or map with keyboard focus
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    ResourceType,
    Mode,
    Resource,
    StartDate,
    EndDate,
    Update,
    Map,
}

impl Focus {
    const ORDER: [Focus; 7] = [
        Focus::ResourceType,
        Focus::Mode,
        Focus::Resource,
        Focus::StartDate,
        Focus::EndDate,
        Focus::Update,
        Focus::Map,
    ];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        Self::ORDER[(self.position() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateField {
    Start,
    End,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("{0:?} is not a YYYY-MM-DD date")]
    Malformed(String),

    #[error("{date} is after the last imported day {last}")]
    AfterImported { date: NaiveDate, last: NaiveDate },

    #[error("start date {from} is after end date {to}")]
    Reversed { from: NaiveDate, to: NaiveDate },
}

/// Blocking error dialog
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorModal {
    pub title: String,
    pub url: Option<String>,
    pub status: Option<u16>,
    pub message: String,
}

impl ErrorModal {
    fn from_fetch(title: &str, err: &FetchError) -> Self {
        Self {
            title: title.to_string(),
            url: Some(err.url().to_string()),
            status: err.status(),
            message: err.to_string(),
        }
    }

    fn message(title: &str, message: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            url: None,
            status: None,
            message: message.into(),
        }
    }
}

/// Context of the outstanding map fetch
#[derive(Debug)]
struct PendingMap {
    token: RequestToken,
    mode: Mode,
    resource_type: ResourceType,
    label: String,
}

/// Application state
pub struct App {
    pub selection: SelectionState,
    pub catalog: CatalogIndex,
    pub autocomplete: Autocomplete,
    /// Label of the resolved resource, if any
    pub selected_label: Option<String>,
    pub start_input: String,
    pub end_input: String,
    pub date_bounds: Option<ImportedDateRange>,
    pub map_view: MapView,
    pub map_renderer: MapRenderer,
    pub focus: Focus,
    pub error: Option<ErrorModal>,
    pub popup: Option<Popup>,
    pub status: Option<String>,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Top-left terminal cell of the map area
    map_origin: (u16, u16),
    accent: Rgb,
    legend_scale: LegendScale,
    auto_update: bool,
    next_token: RequestToken,
    pending_catalog: Option<RequestToken>,
    pending_map: Option<PendingMap>,
    /// Set when the selection changed since the last render started
    needs_render: bool,
}

impl App {
    /// `map_width`/`map_height` are the map area size in terminal cells
    pub fn new(config: &AppConfig, map_width: usize, map_height: usize) -> Self {
        Self {
            selection: SelectionState::new(),
            catalog: CatalogIndex::empty(ResourceType::default()),
            autocomplete: Autocomplete::default(),
            selected_label: None,
            start_input: String::new(),
            end_input: String::new(),
            date_bounds: None,
            map_view: MapView::new(config.home, map_width, map_height),
            map_renderer: MapRenderer::new(),
            focus: Focus::default(),
            error: None,
            popup: None,
            status: None,
            should_quit: false,
            last_mouse: None,
            map_origin: (0, 0),
            accent: config.accent,
            legend_scale: config.legend_scale,
            auto_update: config.auto_update,
            next_token: 0,
            pending_catalog: None,
            pending_map: None,
            needs_render: true,
        }
    }

    /// Fetches issued once at startup
    pub fn startup(&mut self) -> Vec<Fetch> {
        vec![Fetch::DateRange, self.load_catalog()]
    }

    /// Whether a catalog or map fetch is outstanding
    pub fn in_flight(&self) -> bool {
        self.pending_catalog.is_some() || self.pending_map.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_map.is_some()
    }

    pub fn availability(&self) -> InputAvailability {
        compute_input_availability(&self.selection, self.in_flight(), self.needs_render)
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Place the map at `(x, y)` with `width` x `height` cells
    pub fn set_map_area(&mut self, x: u16, y: u16, width: u16, height: u16) {
        self.map_origin = (x, y);
        self.map_view.resize(width as usize, height as usize);
    }

    fn issue_token(&mut self) -> RequestToken {
        self.next_token += 1;
        self.next_token
    }

    // Selection transitions

    /// Reset the resource input and selection, then fetch the catalog of the
    /// current resource type
    fn load_catalog(&mut self) -> Fetch {
        let resource_type = self.selection.resource_type();
        self.autocomplete.reset();
        self.selected_label = None;
        self.selection.clear_resource();
        self.catalog = CatalogIndex::empty(resource_type);

        let token = self.issue_token();
        self.pending_catalog = Some(token);
        info!("Loading {} catalog (request {})", resource_type, token);
        Fetch::Catalog { token, resource_type }
    }

    /// Step the resource type forward or backward
    pub fn cycle_resource_type(&mut self, forward: bool) -> Vec<Fetch> {
        if !self.availability().resource_type {
            return Vec::new();
        }
        let current = self.selection.resource_type();
        let next = if forward { current.next() } else { current.prev() };
        self.selection.set_resource_type(next);
        self.needs_render = true;
        vec![self.load_catalog()]
    }

    pub fn toggle_mode(&mut self) -> Vec<Fetch> {
        if !self.availability().mode {
            return Vec::new();
        }
        self.selection.set_mode(self.selection.mode().toggle());
        self.autocomplete.reset();
        self.selected_label = None;
        self.needs_render = true;
        self.auto_render().into_iter().collect()
    }

    pub fn resource_push_char(&mut self, ch: char) -> Vec<Fetch> {
        if !self.availability().resource {
            return Vec::new();
        }
        self.autocomplete.push_char(ch, &self.catalog);
        self.sync_typed_resource()
    }

    pub fn resource_backspace(&mut self) -> Vec<Fetch> {
        if !self.availability().resource {
            return Vec::new();
        }
        self.autocomplete.backspace(&self.catalog);
        self.sync_typed_resource()
    }

    pub fn highlight_next(&mut self) {
        self.autocomplete.highlight_next();
    }

    pub fn highlight_prev(&mut self) {
        self.autocomplete.highlight_prev();
    }

    /// Accept the highlighted suggestion
    pub fn accept_suggestion(&mut self) -> Vec<Fetch> {
        if !self.availability().resource {
            return Vec::new();
        }
        match self.autocomplete.accept(&self.catalog) {
            Some((label, id)) => self.select(label, id),
            None => {
                self.status = Some(format!("No {} named {:?}", self.catalog.resource_type(), self.autocomplete.input()));
                Vec::new()
            }
        }
    }

    /// Resolve the typed text as an exact label
    fn sync_typed_resource(&mut self) -> Vec<Fetch> {
        let typed = self.autocomplete.input().trim().to_string();
        match self.catalog.id_for(&typed).map(str::to_string) {
            Some(id) => self.select(typed, id),
            None if self.selection.resource_id().is_some() => {
                self.selection.clear_resource();
                self.selected_label = None;
                self.needs_render = true;
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    fn select(&mut self, label: String, id: String) -> Vec<Fetch> {
        if self.selection.resource_id() == Some(id.as_str()) {
            return Vec::new();
        }
        debug!("Selected {} {:?} ({})", self.selection.resource_type(), label, id);
        self.selection.select_resource(id);
        self.selected_label = Some(label);
        self.needs_render = true;
        self.auto_render().into_iter().collect()
    }

    pub fn date_input(&self, field: DateField) -> &str {
        match field {
            DateField::Start => &self.start_input,
            DateField::End => &self.end_input,
        }
    }

    fn date_input_mut(&mut self, field: DateField) -> &mut String {
        match field {
            DateField::Start => &mut self.start_input,
            DateField::End => &mut self.end_input,
        }
    }

    fn date_enabled(&self, field: DateField) -> bool {
        let availability = self.availability();
        match field {
            DateField::Start => availability.start_date,
            DateField::End => availability.end_date,
        }
    }

    pub fn date_push_char(&mut self, field: DateField, ch: char) {
        if !self.date_enabled(field) || !(ch.is_ascii_digit() || ch == '-') {
            return;
        }
        let input = self.date_input_mut(field);
        if input.len() < 10 {
            input.push(ch);
        }
    }

    pub fn date_backspace(&mut self, field: DateField) {
        if self.date_enabled(field) {
            self.date_input_mut(field).pop();
        }
    }

    /// Check a candidate date against the imported range and the other end
    /// of the selection
    pub fn validate_date(&self, field: DateField, date: NaiveDate) -> Result<(), DateError> {
        if let Some(last) = self.date_bounds.and_then(|b| b.to) {
            if date > last {
                return Err(DateError::AfterImported { date, last });
            }
        }
        let (from, to) = match field {
            DateField::Start => (Some(date), self.selection.end_date()),
            DateField::End => (self.selection.start_date(), Some(date)),
        };
        match (from, to) {
            (Some(from), Some(to)) if from > to => Err(DateError::Reversed { from, to }),
            _ => Ok(()),
        }
    }

    /// Parse the typed date into the selection. An empty field clears it.
    pub fn commit_date(&mut self, field: DateField) -> Vec<Fetch> {
        if !self.date_enabled(field) {
            return Vec::new();
        }
        let text = self.date_input(field).trim().to_string();
        let parsed = if text.is_empty() {
            Ok(None)
        } else {
            NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                .map_err(|_| DateError::Malformed(text.clone()))
                .and_then(|date| self.validate_date(field, date).map(|_| Some(date)))
        };

        let date = match parsed {
            Ok(date) => date,
            Err(e) => {
                warn!("Rejected date input: {}", e);
                self.status = Some(e.to_string());
                return Vec::new();
            }
        };

        let current = match field {
            DateField::Start => self.selection.start_date(),
            DateField::End => self.selection.end_date(),
        };
        if current == date {
            return Vec::new();
        }
        match field {
            DateField::Start => self.selection.set_start_date(date),
            DateField::End => self.selection.set_end_date(date),
        }
        self.status = None;
        self.needs_render = true;
        self.auto_render().into_iter().collect()
    }

    // Rendering

    /// The update action
    pub fn request_update(&mut self) -> Vec<Fetch> {
        if !self.availability().update {
            return Vec::new();
        }
        self.begin_render().into_iter().collect()
    }

    fn auto_render(&mut self) -> Option<Fetch> {
        if self.auto_update && self.availability().update {
            self.begin_render()
        } else {
            None
        }
    }

    /// Lock the inputs and the map, reset the view, drop the current data
    /// layer and legend, then request the new map.
    fn begin_render(&mut self) -> Option<Fetch> {
        let path = match query_for(&self.selection) {
            Ok(path) => path,
            Err(e) => {
                error!("Cannot build map query: {}", e);
                self.error = Some(ErrorModal::message("Invalid selection", e.to_string()));
                return None;
            }
        };

        self.map_view.disable_interaction();
        self.map_view.reset();
        self.map_renderer.clear_overlays();
        self.popup = None;
        self.needs_render = false;

        let token = self.issue_token();
        self.pending_map = Some(PendingMap {
            token,
            mode: self.selection.mode(),
            resource_type: self.selection.resource_type(),
            label: self.selected_label.clone().unwrap_or_default(),
        });
        info!("Rendering {} (request {})", path, token);
        Some(Fetch::Map { token, path })
    }

    /// Apply the outcome of a fetch
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::CatalogLoaded {
                token,
                resource_type,
                result,
            } => self.on_catalog_loaded(token, resource_type, result),
            AppEvent::MapLoaded { token, result } => self.on_map_loaded(token, result),
            AppEvent::DateRangeLoaded(result) => match result {
                Ok(range) => {
                    info!("Imported data spans {:?} to {:?}", range.from, range.to);
                    self.date_bounds = Some(range);
                }
                Err(e) => {
                    warn!("Could not load imported date range: {}", e);
                    self.status = Some("Imported date range unavailable".to_string());
                }
            },
        }
    }

    fn on_catalog_loaded(
        &mut self,
        token: RequestToken,
        resource_type: ResourceType,
        result: Result<Vec<Resource>, FetchError>,
    ) {
        if self.pending_catalog != Some(token) {
            debug!("Discarding stale {} catalog (request {})", resource_type, token);
            return;
        }
        self.pending_catalog = None;

        let resources = match result {
            Ok(resources) => resources,
            Err(e) => {
                error!("Failed to load {} catalog: {}", resource_type, e);
                self.error = Some(ErrorModal::from_fetch("Failed to load catalog", &e));
                return;
            }
        };

        match CatalogIndex::build(resource_type, &resources) {
            Ok(index) => {
                info!("Loaded {} {} entries", index.len(), resource_type);
                self.catalog = index;
            }
            Err(e) => {
                error!("Malformed {} catalog: {}", resource_type, e);
                self.error = Some(ErrorModal::message("Malformed catalog", e.to_string()));
            }
        }
    }

    fn on_map_loaded(&mut self, token: RequestToken, result: Result<GeoJson, FetchError>) {
        let pending = match self.pending_map.take() {
            Some(pending) if pending.token == token => pending,
            other => {
                debug!("Discarding stale map response (request {})", token);
                self.pending_map = other;
                return;
            }
        };
        self.map_view.enable_interaction();

        let geojson = match result {
            Ok(geojson) => geojson,
            Err(e) => {
                error!("Map request failed: {}", e);
                self.error = Some(ErrorModal::from_fetch("Failed to load map", &e));
                return;
            }
        };

        let features = match decode_features(geojson, pending.mode, pending.resource_type) {
            Ok(features) => features,
            Err(e) => {
                error!("Malformed map response: {}", e);
                self.error = Some(ErrorModal::message("Malformed map data", e.to_string()));
                return;
            }
        };

        let count = features.len();
        let (layer, legend) = match pending.mode {
            Mode::Popularity => ChoroplethLayer::popularity(
                features,
                pending.resource_type,
                &pending.label,
                self.accent,
                self.legend_scale,
            ),
            Mode::Trends => ChoroplethLayer::trends(features, pending.resource_type),
        };
        self.map_renderer.show(layer, legend);
        info!("Rendered {} countries", count);
        self.status = Some(format!("{} countries", count));
    }

    // Map interaction

    /// Terminal cell to braille pixel inside the map area
    fn to_map_pixel(&self, col: u16, row: u16) -> (i32, i32) {
        let px = col.saturating_sub(self.map_origin.0) as i32 * 2;
        let py = row.saturating_sub(self.map_origin.1) as i32 * 4;
        (px, py)
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.map_view.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.map_view.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.map_view.zoom_out();
    }

    /// Zoom towards a screen position (terminal column/row)
    pub fn zoom_at(&mut self, col: u16, row: u16, zoom_in: bool) {
        let (px, py) = self.to_map_pixel(col, row);
        self.map_view.zoom_at(px, py, zoom_in);
    }

    pub fn reset_view(&mut self) {
        if self.map_view.is_interactive() {
            self.map_view.reset();
        }
    }

    pub fn handle_drag(&mut self, col: u16, row: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - col as i32;
            let dy = last_y as i32 - row as i32;
            // Less sensitive when zoomed out
            let scale = if self.map_view.viewport.zoom < 2.0 {
                2
            } else if self.map_view.viewport.zoom < 4.0 {
                3
            } else {
                4
            };
            self.pan(dx * scale, dy * scale);
        }
        self.last_mouse = Some((col, row));
    }

    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    /// Open the popup of the country under a screen position
    pub fn inspect(&mut self, col: u16, row: u16) {
        if !self.map_view.is_interactive() {
            return;
        }
        let (px, py) = self.to_map_pixel(col, row);
        let (lon, lat) = self.map_view.viewport.unproject(px, py);
        self.popup = self
            .map_renderer
            .layer()
            .and_then(|layer| layer.feature_at(lon, lat))
            .map(|f| f.popup.clone());
    }

    /// Open the popup of the country at the map center
    pub fn inspect_center(&mut self) {
        if !self.map_view.is_interactive() {
            return;
        }
        let vp = &self.map_view.viewport;
        self.popup = self
            .map_renderer
            .layer()
            .and_then(|layer| layer.feature_at(vp.center_lon, vp.center_lat))
            .map(|f| f.popup.clone());
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    /// Esc backs out one level. Text fields never quit: the resource field
    /// closes its dropdown and the date fields ignore the key.
    pub fn escape(&mut self) {
        match self.focus {
            Focus::Resource => self.autocomplete.dismiss(),
            Focus::StartDate | Focus::EndDate => {}
            _ if self.popup.is_some() => self.close_popup(),
            _ => self.quit(),
        }
    }
}
