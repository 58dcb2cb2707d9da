use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Artist reference nested in albums and tracks
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

/// Album reference nested in tracks
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct AlbumRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub album_type: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A selectable catalog entity: artist, album or track.
///
/// The three backend shapes share `id` and `name`; everything else is optional
/// and only present for the matching kind.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Resource {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub spotify_url: Option<String>,
    #[serde(default)]
    pub artists: Option<Vec<ArtistRef>>,
    #[serde(default)]
    pub album: Option<AlbumRef>,
    // Artist only
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    // Album only
    #[serde(default)]
    pub album_type: Option<String>,
    #[serde(default)]
    pub total_tracks: Option<u32>,
    // Track only
    #[serde(default)]
    pub preview_url: Option<String>,
}

impl Resource {
    /// Cover or portrait URL; tracks fall back to their album's image
    pub fn display_image(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .or_else(|| self.album.as_ref().and_then(|a| a.image_url.as_deref()))
    }

    pub fn artist_names(&self) -> Option<String> {
        self.artists.as_ref().map(|artists| {
            artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
    }
}

/// Span of the imported trend data
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct ImportedDateRange {
    #[serde(deserialize_with = "lenient_date")]
    pub from: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient_date")]
    pub to: Option<NaiveDate>,
}

/// Accept `YYYY-MM-DD` optionally followed by a time part, or null when no
/// data has been imported yet.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) => {
            let day = s.get(..10).unwrap_or(&s);
            NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
    }
}
