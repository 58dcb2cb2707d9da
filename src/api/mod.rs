mod client;
mod models;

pub use client::{catalog_path, BackendClient, FetchError, DATE_RANGE_PATH};
pub use models::{AlbumRef, ArtistRef, ImportedDateRange, Resource};
