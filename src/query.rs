use crate::state::{Mode, ResourceType, SelectionState};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("a {0} must be selected to show its popularity")]
    MissingResource(ResourceType),
}

/// Format a picked date the way the backend receives it.
///
/// The picker yields a local calendar day. Its wall-clock midnight is written
/// with a `Z` suffix without converting to UTC.
pub fn format_query_date(date: NaiveDate) -> String {
    format!("{}T00:00:00Z", date.format("%Y-%m-%d"))
}

/// Build the path and query string of a map request
pub fn build_query(
    mode: Mode,
    resource_type: ResourceType,
    resource_id: Option<&str>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<String, QueryError> {
    let mut path = format!("/api/maps/{}/{}", mode, resource_type);

    match (mode, resource_id) {
        (Mode::Popularity, None) => return Err(QueryError::MissingResource(resource_type)),
        (_, Some(id)) => {
            path.push('/');
            path.push_str(&urlencoding::encode(id));
        }
        (Mode::Trends, None) => {}
    }

    let params: Vec<String> = [("from_date", start_date), ("to_date", end_date)]
        .into_iter()
        .filter_map(|(key, date)| {
            date.map(|d| format!("{}={}", key, urlencoding::encode(&format_query_date(d))))
        })
        .collect();

    if !params.is_empty() {
        path.push('?');
        path.push_str(&params.join("&"));
    }

    Ok(path)
}

/// Build the map request path for the current selection
pub fn query_for(state: &SelectionState) -> Result<String, QueryError> {
    build_query(
        state.mode(),
        state.resource_type(),
        state.resource_id(),
        state.start_date(),
        state.end_date(),
    )
}
