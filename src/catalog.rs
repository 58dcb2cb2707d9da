use crate::api::Resource;
use crate::state::ResourceType;
use std::collections::HashMap;
use thiserror::Error;

/// Characters needed before suggestions appear
pub const MIN_QUERY_LEN: usize = 3;
/// Maximum number of suggestions offered at once
pub const SUGGESTION_LIMIT: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{resource_type} {id} has no artist list")]
    MissingArtists { resource_type: ResourceType, id: String },
}

/// Display label of a resource.
///
/// Albums and tracks often share a bare name across artists, so their label
/// carries the artist list.
pub fn resource_label(resource_type: ResourceType, resource: &Resource) -> Result<String, CatalogError> {
    match resource_type {
        ResourceType::Artist => Ok(resource.name.clone()),
        ResourceType::Album | ResourceType::Track => {
            let artists = resource.artist_names().ok_or_else(|| CatalogError::MissingArtists {
                resource_type,
                id: resource.id.clone(),
            })?;
            Ok(format!("{} ({})", resource.name, artists))
        }
    }
}

/// Label, id and image of every resource of the loaded type
#[derive(Debug, Default)]
pub struct CatalogIndex {
    resource_type: ResourceType,
    labels: Vec<String>,
    ids: HashMap<String, String>,
    images: HashMap<String, Option<String>>,
}

impl CatalogIndex {
    pub fn empty(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            ..Self::default()
        }
    }

    /// Build the Name→Id and Name→Image indexes.
    ///
    /// A repeated label keeps the last resource's id and image.
    pub fn build(resource_type: ResourceType, resources: &[Resource]) -> Result<Self, CatalogError> {
        let mut index = Self::empty(resource_type);
        index.labels.reserve(resources.len());

        for resource in resources {
            let label = resource_label(resource_type, resource)?;
            let image = resource.display_image().map(str::to_string);
            if index.ids.insert(label.clone(), resource.id.clone()).is_none() {
                index.labels.push(label.clone());
            }
            index.images.insert(label, image);
        }

        Ok(index)
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Resolve a label to its resource id
    pub fn id_for(&self, label: &str) -> Option<&str> {
        self.ids.get(label.trim()).map(String::as_str)
    }

    pub fn image_for(&self, label: &str) -> Option<&str> {
        self.images.get(label).and_then(|i| i.as_deref())
    }

    /// Labels containing `query`, case-insensitive, in catalog order
    pub fn suggestions(&self, query: &str) -> Vec<&str> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }
        self.labels
            .iter()
            .filter(|label| label.to_lowercase().contains(&query))
            .take(SUGGESTION_LIMIT)
            .map(String::as_str)
            .collect()
    }
}

/// Text input with a suggestion dropdown fed by a [`CatalogIndex`]
#[derive(Debug, Default)]
pub struct Autocomplete {
    input: String,
    suggestions: Vec<String>,
    /// Set only once the user moves through the list
    highlighted: Option<usize>,
}

impl Autocomplete {
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted.filter(|&i| i < self.suggestions.len())
    }

    /// Clear text and suggestions
    pub fn reset(&mut self) {
        self.input.clear();
        self.suggestions.clear();
        self.highlighted = None;
    }

    /// Close the dropdown, keeping the typed text
    pub fn dismiss(&mut self) {
        self.suggestions.clear();
        self.highlighted = None;
    }

    pub fn push_char(&mut self, ch: char, index: &CatalogIndex) {
        self.input.push(ch);
        self.refresh(index);
    }

    pub fn backspace(&mut self, index: &CatalogIndex) {
        self.input.pop();
        self.refresh(index);
    }

    pub fn highlight_next(&mut self) {
        let len = self.suggestions.len();
        if len > 0 {
            self.highlighted = Some(self.highlighted().map_or(0, |i| (i + 1) % len));
        }
    }

    pub fn highlight_prev(&mut self) {
        let len = self.suggestions.len();
        if len > 0 {
            self.highlighted = Some(self.highlighted().map_or(len - 1, |i| (i + len - 1) % len));
        }
    }

    /// Accept the highlighted suggestion. Without a highlight the typed text
    /// wins when it is an exact label, otherwise the first suggestion is
    /// taken. Returns the label and the resolved id.
    pub fn accept(&mut self, index: &CatalogIndex) -> Option<(String, String)> {
        let typed = self.input.trim();
        let label = match self.highlighted() {
            Some(i) => self.suggestions[i].clone(),
            None if index.id_for(typed).is_some() => typed.to_string(),
            None => self.suggestions.first().cloned().unwrap_or_else(|| typed.to_string()),
        };
        let id = index.id_for(&label)?.to_string();
        self.input = label.clone();
        self.dismiss();
        Some((label, id))
    }

    fn refresh(&mut self, index: &CatalogIndex) {
        self.suggestions = index.suggestions(&self.input).into_iter().map(str::to_string).collect();
        self.highlighted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ArtistRef;

    fn artist(id: &str, name: &str) -> Resource {
        Resource {
            id: id.into(),
            name: name.into(),
            image_url: Some(format!("https://img/{id}")),
            ..Resource::default()
        }
    }

    fn track(id: &str, name: &str, artists: &[&str]) -> Resource {
        Resource {
            id: id.into(),
            name: name.into(),
            artists: Some(
                artists
                    .iter()
                    .map(|a| ArtistRef {
                        id: None,
                        name: a.to_string(),
                    })
                    .collect(),
            ),
            ..Resource::default()
        }
    }

    #[test]
    fn test_track_label_lists_artists() {
        let label = resource_label(ResourceType::Track, &track("t", "Song", &["A", "B"])).unwrap();
        assert_eq!(label, "Song (A, B)");
    }

    #[test]
    fn test_artist_label_is_name() {
        assert_eq!(resource_label(ResourceType::Artist, &artist("a", "Band")).unwrap(), "Band");
    }

    #[test]
    fn test_album_without_artists_is_rejected() {
        let bare = artist("al", "Record");
        let err = resource_label(ResourceType::Album, &bare).unwrap_err();
        assert_eq!(
            err,
            CatalogError::MissingArtists {
                resource_type: ResourceType::Album,
                id: "al".into()
            }
        );
        assert!(CatalogIndex::build(ResourceType::Album, &[bare]).is_err());
    }

    #[test]
    fn test_same_name_disambiguated() {
        let resources = [track("1", "Intro", &["X"]), track("2", "Intro", &["Y"])];
        let index = CatalogIndex::build(ResourceType::Track, &resources).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.id_for("Intro (X)"), Some("1"));
        assert_eq!(index.id_for("Intro (Y)"), Some("2"));
    }

    #[test]
    fn test_collision_last_write_wins() {
        let resources = [artist("1", "Twin"), artist("2", "Twin")];
        let index = CatalogIndex::build(ResourceType::Artist, &resources).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.id_for("Twin"), Some("2"));
        assert_eq!(index.image_for("Twin"), Some("https://img/2"));
    }

    #[test]
    fn test_suggestions_need_three_chars_and_are_limited() {
        let resources: Vec<Resource> = (0..15).map(|i| artist(&i.to_string(), &format!("Echo {i}"))).collect();
        let index = CatalogIndex::build(ResourceType::Artist, &resources).unwrap();
        assert!(index.suggestions("ec").is_empty());
        let found = index.suggestions("ECH");
        assert_eq!(found.len(), SUGGESTION_LIMIT);
        assert_eq!(found[0], "Echo 0");
    }

    #[test]
    fn test_autocomplete_accepts_highlighted() {
        let resources = [artist("1", "Alpha"), artist("2", "Alphaville")];
        let index = CatalogIndex::build(ResourceType::Artist, &resources).unwrap();
        let mut ac = Autocomplete::default();
        for ch in "alph".chars() {
            ac.push_char(ch, &index);
        }
        assert_eq!(ac.suggestions().len(), 2);
        assert_eq!(ac.highlighted(), None);
        ac.highlight_next();
        ac.highlight_next();
        assert_eq!(ac.highlighted(), Some(1));
        assert_eq!(ac.accept(&index), Some(("Alphaville".to_string(), "2".to_string())));
        assert_eq!(ac.input(), "Alphaville");
        assert!(ac.suggestions().is_empty());
    }

    #[test]
    fn test_autocomplete_keeps_exact_typed_label() {
        let resources = [artist("1", "Alphaville"), artist("2", "Alpha")];
        let index = CatalogIndex::build(ResourceType::Artist, &resources).unwrap();
        let mut ac = Autocomplete::default();
        for ch in "Alpha".chars() {
            ac.push_char(ch, &index);
        }
        assert_eq!(ac.suggestions(), ["Alphaville", "Alpha"]);
        assert_eq!(ac.accept(&index), Some(("Alpha".to_string(), "2".to_string())));

        // Without an exact match the first suggestion is taken
        ac.reset();
        for ch in "lphav".chars() {
            ac.push_char(ch, &index);
        }
        assert_eq!(ac.accept(&index), Some(("Alphaville".to_string(), "1".to_string())));
    }

    #[test]
    fn test_autocomplete_highlight_wraps() {
        let resources = [artist("1", "Alphaville"), artist("2", "Alpha")];
        let index = CatalogIndex::build(ResourceType::Artist, &resources).unwrap();
        let mut ac = Autocomplete::default();
        for ch in "alp".chars() {
            ac.push_char(ch, &index);
        }
        ac.highlight_prev();
        assert_eq!(ac.highlighted(), Some(1));
        ac.highlight_next();
        assert_eq!(ac.highlighted(), Some(0));
        ac.dismiss();
        assert_eq!(ac.highlighted(), None);
        assert_eq!(ac.input(), "alp");
    }

    #[test]
    fn test_autocomplete_unknown_text() {
        let index = CatalogIndex::build(ResourceType::Artist, &[artist("1", "Alpha")]).unwrap();
        let mut ac = Autocomplete::default();
        for ch in "zzzz".chars() {
            ac.push_char(ch, &index);
        }
        assert_eq!(ac.accept(&index), None);
        ac.reset();
        assert_eq!(ac.input(), "");
    }
}
