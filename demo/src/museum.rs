//! Museum collection fetched through the shared client.
//!
//! Unlike the client itself, this collaborator prefers an empty list to an
//! error: a failed fetch or a malformed payload is logged and yields `[]`.

use networking::Networking;
use serde::Deserialize;

pub const MUSEUM_LIST_URL: &str =
    "https://raw.githubusercontent.com/Kotlin/KMP-App-Template/main/list.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MuseumObject {
    #[serde(rename = "objectID")]
    pub object_id: u64,
    pub title: String,
    #[serde(default)]
    pub artist_display_name: String,
    #[serde(default)]
    pub medium: String,
    #[serde(default)]
    pub dimensions: String,
    #[serde(rename = "objectURL", default)]
    pub object_url: String,
    #[serde(default)]
    pub object_date: String,
    #[serde(default)]
    pub primary_image: String,
    #[serde(default)]
    pub primary_image_small: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub credit_line: String,
}

pub struct MuseumApi {
    networking: Networking,
    url: String,
}

impl MuseumApi {
    pub fn new(networking: Networking) -> Self {
        Self::with_url(networking, MUSEUM_LIST_URL)
    }

    pub fn with_url(networking: Networking, url: impl Into<String>) -> Self {
        Self {
            networking,
            url: url.into(),
        }
    }

    pub async fn get_data(&self) -> Vec<MuseumObject> {
        let body = match self.networking.get(&self.url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "could not fetch museum list");
                return Vec::new();
            }
        };
        serde_json::from_str(&body).unwrap_or_else(|e| {
            tracing::warn!(url = %self.url, error = %e, "could not parse museum list");
            Vec::new()
        })
    }
}
