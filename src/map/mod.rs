mod choropleth;
mod geometry;
mod palette;
mod projection;
mod renderer;
mod spatial;
mod view;

pub use choropleth::{
    format_popularity, popularity_color, rank_winners, ChoroplethLayer, Legend, LegendEntry, LegendScale, Popup,
    StyledFeature,
};
pub use geometry::fill_polygon;
pub use projection::Viewport;
pub use renderer::{Lod, MapLayers, MapRenderer};
pub use spatial::BoundingBox;
pub use view::{HomeView, MapView};
