//! Gift registry tools: listing gifts, purchase marks, RSVPs and bulk import.

use std::collections::HashSet;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use giftlist_client::{GalleryLoader, Generation};
use giftlist_core::{Gift, NewRsvp, RegistryRepository, Room, Rsvp, StoreDb};

/// Parameters for the gifts_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GiftsListParams {
    /// Only gifts in this room (Cozinha, Banheiro, Sala, Quarto, Lavanderia, Outros).
    #[serde(default)]
    pub room: Option<String>,

    /// Resolve each gift's display image through the image pipeline, using a
    /// store-link preview for gifts without one.
    #[serde(default)]
    pub resolve_images: bool,
}

/// A gift with its purchase state.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GiftListing {
    #[serde(flatten)]
    pub gift: Gift,
    pub purchased: bool,

    /// Display image, when `resolve_images` was set and one was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    /// True when `src` is a processed PNG rather than the source passed through.
    #[serde(default)]
    pub processed: bool,
}

/// Output from the gifts_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GiftsListOutput {
    pub gifts: Vec<GiftListing>,
}

/// Implementation of the gifts_list tool.
pub async fn list_impl(
    registry: &dyn RegistryRepository, gallery: &GalleryLoader, params: GiftsListParams,
) -> Result<CallToolResult, McpError> {
    let gifts = match params.room.as_deref() {
        Some(room) => registry.list_gifts_by_room(Room::parse(room)?).await?,
        None => registry.list_gifts().await?,
    };
    let purchased: HashSet<i64> = registry.list_purchased_gift_ids().await?.into_iter().collect();

    let images = if params.resolve_images {
        gallery.load(&gifts, &Generation::new().ticket()).await.unwrap_or_default()
    } else {
        Vec::new()
    };

    let gifts = gifts
        .into_iter()
        .map(|gift| {
            let image = images.iter().find(|image| image.gift_id == gift.id);
            GiftListing {
                purchased: purchased.contains(&gift.id),
                src: image.and_then(|image| image.src.clone()),
                processed: image.is_some_and(|image| image.processed),
                gift,
            }
        })
        .collect();

    json_result(&GiftsListOutput { gifts })
}

/// Parameters for the gift_mark_purchased tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GiftMarkPurchasedParams {
    pub gift_id: i64,

    /// `false` clears the mark (default: true).
    #[serde(default = "default_true")]
    pub purchased: bool,
}

fn default_true() -> bool {
    true
}

/// Output from the gift_mark_purchased tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GiftMarkPurchasedOutput {
    pub gift_id: i64,
    pub purchased: bool,
}

/// Implementation of the gift_mark_purchased tool.
pub async fn mark_impl(
    registry: &dyn RegistryRepository, params: GiftMarkPurchasedParams,
) -> Result<CallToolResult, McpError> {
    if params.purchased {
        registry.mark_purchased(params.gift_id).await?;
    } else {
        registry.unmark_purchased(params.gift_id).await?;
    }

    json_result(&GiftMarkPurchasedOutput { gift_id: params.gift_id, purchased: params.purchased })
}

/// Parameters for the gifts_import tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GiftsImportParams {
    /// JSON array of gift rows. Accepts snake_case, camelCase and the
    /// Portuguese column names (nome, comodo, linkLoja, ...).
    pub rows: String,
}

/// Output from the gifts_import tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GiftsImportOutput {
    pub imported: usize,
}

/// Implementation of the gifts_import tool.
pub async fn import_impl(db: &StoreDb, params: GiftsImportParams) -> Result<CallToolResult, McpError> {
    let imported = db.import_gift_rows(&params.rows).await?;
    json_result(&GiftsImportOutput { imported })
}

/// Parameters for the rsvp_submit tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RsvpSubmitParams {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub attending: bool,
}

/// Output from the rsvp_submit tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RsvpSubmitOutput {
    pub rsvp: Rsvp,
}

/// Implementation of the rsvp_submit tool.
pub async fn submit_impl(registry: &dyn RegistryRepository, params: RsvpSubmitParams) -> Result<CallToolResult, McpError> {
    let phone = params.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
    let rsvp = registry
        .insert_rsvp(NewRsvp { name: params.name, phone, attending: params.attending, date: None })
        .await?;

    json_result(&RsvpSubmitOutput { rsvp })
}

/// Parameters for the rsvp_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RsvpListParams {
    /// Only RSVPs with this attendance answer.
    #[serde(default)]
    pub attending: Option<bool>,
}

/// Output from the rsvp_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RsvpListOutput {
    pub rsvps: Vec<Rsvp>,
    pub attending_count: usize,
}

/// Implementation of the rsvp_list tool.
pub async fn rsvp_list_impl(registry: &dyn RegistryRepository, params: RsvpListParams) -> Result<CallToolResult, McpError> {
    let rsvps: Vec<Rsvp> = registry
        .list_rsvps()
        .await?
        .into_iter()
        .filter(|r| params.attending.is_none_or(|attending| r.attending == attending))
        .collect();
    let attending_count = rsvps.iter().filter(|r| r.attending).count();

    json_result(&RsvpListOutput { rsvps, attending_count })
}
