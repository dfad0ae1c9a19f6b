//! Mapping of loosely-typed gift rows.
//!
//! Exported data and older tables name the same column several ways
//! (`imageUrl`, `image_url`, `nome`, `link_loja`, ...). All of that is
//! resolved here so nothing downstream sees more than one schema.

use serde::Deserialize;

use super::{Gift, Room};
use crate::Error;
use crate::options::BgSample;

/// A gift row with any of its known column spellings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GiftRow {
    pub id: Option<i64>,
    #[serde(alias = "nome")]
    pub name: Option<String>,
    #[serde(alias = "imageUrl", alias = "image")]
    pub image_url: Option<String>,
    #[serde(alias = "linkLoja", alias = "link_loja", alias = "storeLink", alias = "link")]
    pub store_link: Option<String>,
    #[serde(alias = "comodo")]
    pub room: Option<String>,
    #[serde(alias = "removeBg")]
    pub remove_bg: Option<bool>,
    #[serde(alias = "bgTolerance")]
    pub bg_tolerance: Option<f64>,
    #[serde(alias = "bgSample")]
    pub bg_sample: Option<String>,
}

impl GiftRow {
    /// Validate and convert into a [`Gift`].
    ///
    /// `id`, `name` and `room` are required. An unrecognised `bg_sample`
    /// is dropped so the default strategy applies.
    pub fn into_gift(self) -> Result<Gift, Error> {
        let id = self.id.ok_or_else(|| Error::InvalidInput("gift row without id".into()))?;
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::InvalidInput(format!("gift {id} has no name")))?;
        let room = self
            .room
            .as_deref()
            .ok_or_else(|| Error::InvalidInput(format!("gift {id} has no room")))
            .and_then(Room::parse)?;

        let bg_sample = self.bg_sample.as_deref().and_then(|s| {
            let parsed = BgSample::parse(s);
            if parsed.is_none() {
                tracing::warn!(gift_id = id, bg_sample = s, "ignoring unknown background sample mode");
            }
            parsed
        });

        Ok(Gift {
            id,
            name,
            image_url: self.image_url.unwrap_or_default().trim().to_string(),
            store_link: self.store_link.unwrap_or_default().trim().to_string(),
            room,
            remove_bg: self.remove_bg,
            bg_tolerance: self.bg_tolerance,
            bg_sample,
        })
    }
}

/// Parse a JSON array of loosely-typed gift rows.
pub fn parse_gift_rows(json: &str) -> Result<Vec<Gift>, Error> {
    let rows: Vec<GiftRow> =
        serde_json::from_str(json).map_err(|e| Error::InvalidInput(format!("invalid gift rows: {e}")))?;
    rows.into_iter().map(GiftRow::into_gift).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_row() {
        let gifts = parse_gift_rows(
            r#"[{"id": 2, "nome": "Copos", "imageUrl": "https://cdn.example/c.webp",
                 "linkLoja": "https://shop.example/c", "comodo": "Cozinha",
                 "removeBg": false, "bgTolerance": 20, "bgSample": "border"}]"#,
        )
        .unwrap();

        let gift = &gifts[0];
        assert_eq!(gift.id, 2);
        assert_eq!(gift.name, "Copos");
        assert_eq!(gift.image_url, "https://cdn.example/c.webp");
        assert_eq!(gift.store_link, "https://shop.example/c");
        assert_eq!(gift.room, Room::Kitchen);
        assert_eq!(gift.remove_bg, Some(false));
        assert_eq!(gift.bg_tolerance, Some(20.0));
        assert_eq!(gift.bg_sample, Some(BgSample::Border));
    }

    #[test]
    fn test_snake_case_row() {
        let gifts = parse_gift_rows(
            r#"[{"id": 3, "nome": "Jarra", "image_url": null, "link_loja": "https://shop.example/j",
                 "comodo": "Sala", "remove_bg": null, "bg_tolerance": null, "bg_sample": null}]"#,
        )
        .unwrap();

        let gift = &gifts[0];
        assert_eq!(gift.image_url, "");
        assert_eq!(gift.store_link, "https://shop.example/j");
        assert_eq!(gift.room, Room::LivingRoom);
        assert_eq!(gift.remove_bg, None);
    }

    #[test]
    fn test_missing_required_fields() {
        assert!(parse_gift_rows(r#"[{"nome": "x", "comodo": "Sala"}]"#).is_err());
        assert!(parse_gift_rows(r#"[{"id": 1, "comodo": "Sala"}]"#).is_err());
        assert!(parse_gift_rows(r#"[{"id": 1, "nome": "x"}]"#).is_err());
        assert!(parse_gift_rows(r#"[{"id": 1, "nome": "x", "comodo": "Garagem"}]"#).is_err());
    }

    #[test]
    fn test_unknown_sample_mode_dropped() {
        let gifts = parse_gift_rows(r#"[{"id": 1, "nome": "x", "comodo": "Outros", "bgSample": "diagonal"}]"#).unwrap();
        assert_eq!(gifts[0].bg_sample, None);
    }
}
