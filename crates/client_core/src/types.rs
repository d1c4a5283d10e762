use std::time::Duration;

use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);
pub const DEFAULT_SPECIALTY_QUERY_KEY: &str = "speciality";

/// How the provider filter endpoint expects its criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRoute {
    /// `GET /doctor/filter?name=..&time=..&<specialty_key>=..`, absent criteria omitted.
    Query { specialty_key: String },
    /// `GET /doctor/filter/{name}/{time}/{specialty}`, absent criteria sent as `null`.
    Path,
}

impl Default for FilterRoute {
    fn default() -> Self {
        FilterRoute::Query {
            specialty_key: DEFAULT_SPECIALTY_QUERY_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: Url,
    pub debounce: Duration,
    pub filter_route: FilterRoute,
}

impl ClientConfig {
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            debounce: DEFAULT_DEBOUNCE,
            filter_route: FilterRoute::default(),
        }
    }
}
