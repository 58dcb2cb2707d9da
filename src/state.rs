use chrono::NaiveDate;
use std::fmt;

/// Category of catalog entity being browsed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResourceType {
    #[default]
    Artist,
    Album,
    Track,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [ResourceType::Artist, ResourceType::Album, ResourceType::Track];

    /// Singular path segment used by the maps endpoints and GeoJSON property key
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Artist => "artist",
            ResourceType::Album => "album",
            ResourceType::Track => "track",
        }
    }

    /// Plural path segment of the catalog listing endpoint
    pub fn collection(self) -> &'static str {
        match self {
            ResourceType::Artist => "artists",
            ResourceType::Album => "albums",
            ResourceType::Track => "tracks",
        }
    }

    pub fn next(self) -> Self {
        match self {
            ResourceType::Artist => ResourceType::Album,
            ResourceType::Album => ResourceType::Track,
            ResourceType::Track => ResourceType::Artist,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ResourceType::Artist => ResourceType::Track,
            ResourceType::Album => ResourceType::Artist,
            ResourceType::Track => ResourceType::Album,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display mode of the choropleth
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Geographic popularity of a single resource
    #[default]
    Popularity,
    /// Most popular resource per country
    Trends,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Popularity => "popularity",
            Mode::Trends => "trends",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Mode::Popularity => Mode::Trends,
            Mode::Trends => Mode::Popularity,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user's current choices.
///
/// Fields are private so that every change goes through a transition that keeps
/// `resource_id` consistent with the resource type and mode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    resource_type: ResourceType,
    resource_id: Option<String>,
    mode: Mode,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// Switch resource type. Any selected resource belongs to the old catalog
    /// and is dropped.
    pub fn set_resource_type(&mut self, resource_type: ResourceType) {
        self.resource_type = resource_type;
        self.resource_id = None;
    }

    /// Switch display mode, dropping the selected resource
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.resource_id = None;
    }

    pub fn select_resource(&mut self, id: impl Into<String>) {
        self.resource_id = Some(id.into());
    }

    pub fn clear_resource(&mut self) {
        self.resource_id = None;
    }

    pub fn set_start_date(&mut self, date: Option<NaiveDate>) {
        self.start_date = date;
    }

    pub fn set_end_date(&mut self, date: Option<NaiveDate>) {
        self.end_date = date;
    }

    /// Whether the selection is sufficient to issue a map query
    pub fn can_query(&self) -> bool {
        self.mode == Mode::Trends || self.resource_id.is_some()
    }
}

/// Enabled flag for every interactive control
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputAvailability {
    pub resource_type: bool,
    pub mode: bool,
    pub resource: bool,
    pub start_date: bool,
    pub end_date: bool,
    pub update: bool,
}

/// Derive which controls are usable.
///
/// Every input is locked while any request is outstanding. The update action
/// additionally needs a queryable selection that changed since the last render.
pub fn compute_input_availability(
    state: &SelectionState,
    in_flight: bool,
    needs_render: bool,
) -> InputAvailability {
    let idle = !in_flight;
    InputAvailability {
        resource_type: idle,
        mode: idle,
        resource: idle,
        start_date: idle,
        end_date: idle,
        update: idle && needs_render && state.can_query(),
    }
}
