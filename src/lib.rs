//! Terminal choropleth dashboard for music popularity data.
//!
//! The backend serves pre-computed GeoJSON per country; this crate selects
//! what to ask for, fetches it and draws it over a braille world map.

pub mod api;
pub mod app;
pub mod braille;
pub mod catalog;
pub mod color;
pub mod config;
pub mod data;
pub mod map;
pub mod query;
pub mod state;
pub mod ui;
