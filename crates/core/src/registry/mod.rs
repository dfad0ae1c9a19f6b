//! Gift registry: gifts, purchase marks and RSVPs.
//!
//! The image pipeline only consumes `Gift::process_options`; everything
//! else here is plain CRUD behind [`RegistryRepository`].

mod rows;
mod sqlite;

pub use rows::{GiftRow, parse_gift_rows};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::options::{BgSample, ProcessOptions};

/// Room a gift belongs to. Serialized with the names stored in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub enum Room {
    #[serde(rename = "Cozinha")]
    Kitchen,
    #[serde(rename = "Banheiro")]
    Bathroom,
    #[serde(rename = "Sala")]
    LivingRoom,
    #[serde(rename = "Quarto")]
    Bedroom,
    #[serde(rename = "Lavanderia")]
    Laundry,
    #[serde(rename = "Outros")]
    Other,
}

impl Room {
    pub const ALL: [Room; 6] =
        [Room::Kitchen, Room::Bathroom, Room::LivingRoom, Room::Bedroom, Room::Laundry, Room::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            Room::Kitchen => "Cozinha",
            Room::Bathroom => "Banheiro",
            Room::LivingRoom => "Sala",
            Room::Bedroom => "Quarto",
            Room::Laundry => "Lavanderia",
            Room::Other => "Outros",
        }
    }

    /// Case-insensitive parse of the stored name.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        Room::ALL
            .into_iter()
            .find(|room| room.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidInput(format!("unknown room: {s}")))
    }
}

/// A gift on the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Gift {
    pub id: i64,
    pub name: String,
    /// Product image. May be empty, in which case a preview of `store_link` is used.
    pub image_url: String,
    pub store_link: String,
    pub room: Room,
    pub remove_bg: Option<bool>,
    pub bg_tolerance: Option<f64>,
    pub bg_sample: Option<BgSample>,
}

impl Gift {
    /// Processing options with this gift's overrides applied.
    pub fn process_options(&self) -> ProcessOptions {
        ProcessOptions::from_parts(self.remove_bg, self.bg_tolerance, self.bg_sample)
    }
}

/// Gift to insert. `id` is assigned by the store when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NewGift {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub store_link: String,
    pub room: Room,
    #[serde(default)]
    pub remove_bg: Option<bool>,
    #[serde(default)]
    pub bg_tolerance: Option<f64>,
    #[serde(default)]
    pub bg_sample: Option<BgSample>,
}

/// A stored RSVP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Rsvp {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub attending: bool,
    /// RFC 3339 timestamp.
    pub date: String,
}

/// RSVP as submitted. `date` defaults to the time of insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NewRsvp {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub attending: bool,
    #[serde(default)]
    pub date: Option<String>,
}

/// Persistence for the registry.
#[async_trait]
pub trait RegistryRepository: Send + Sync {
    /// All gifts ordered by id.
    async fn list_gifts(&self) -> Result<Vec<Gift>, Error>;

    async fn list_gifts_by_room(&self, room: Room) -> Result<Vec<Gift>, Error>;

    async fn insert_gift(&self, gift: NewGift) -> Result<Gift, Error>;

    /// Replace every field of an existing gift.
    async fn update_gift(&self, gift: &Gift) -> Result<(), Error>;

    async fn delete_gift(&self, id: i64) -> Result<(), Error>;

    async fn list_purchased_gift_ids(&self) -> Result<Vec<i64>, Error>;

    /// Mark a gift purchased. Marking twice is a no-op.
    async fn mark_purchased(&self, gift_id: i64) -> Result<(), Error>;

    async fn unmark_purchased(&self, gift_id: i64) -> Result<(), Error>;

    async fn insert_rsvp(&self, rsvp: NewRsvp) -> Result<Rsvp, Error>;

    /// All RSVPs, newest first.
    async fn list_rsvps(&self) -> Result<Vec<Rsvp>, Error>;
}
