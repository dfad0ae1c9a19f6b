//! Microlink response types.

use serde::Deserialize;

use crate::fetch::is_http_url;

/// Raw response from the Microlink API. Only the fields used for previews.
#[derive(Debug, Default, Deserialize)]
pub struct MicrolinkResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Option<MicrolinkData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MicrolinkData {
    #[serde(default)]
    pub image: Option<Asset>,
    #[serde(default)]
    pub logo: Option<Asset>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Asset {
    #[serde(default)]
    pub url: Option<String>,
}

impl MicrolinkResponse {
    /// The page image, else the site logo, whichever is first a valid http(s) URL.
    pub fn preview_image(self) -> Option<String> {
        let data = self.data?;
        [data.image, data.logo]
            .into_iter()
            .flatten()
            .filter_map(|asset| asset.url)
            .find(|url| is_http_url(url))
    }
}
