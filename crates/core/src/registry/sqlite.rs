//! [`RegistryRepository`] on the local SQLite store.

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Row};

use super::{Gift, NewGift, NewRsvp, RegistryRepository, Room, Rsvp, parse_gift_rows};
use crate::Error;
use crate::cache::StoreDb;
use crate::options::BgSample;

const GIFT_COLUMNS: &str = "id, name, image_url, store_link, room, remove_bg, bg_tolerance, bg_sample";

fn gift_from_row(row: &Row<'_>) -> rusqlite::Result<(Gift, String)> {
    let room: String = row.get(4)?;
    let bg_sample: Option<String> = row.get(7)?;
    let gift = Gift {
        id: row.get(0)?,
        name: row.get(1)?,
        image_url: row.get(2)?,
        store_link: row.get(3)?,
        room: Room::Other,
        remove_bg: row.get(5)?,
        bg_tolerance: row.get(6)?,
        bg_sample: bg_sample.as_deref().and_then(BgSample::parse),
    };
    Ok((gift, room))
}

fn query_gifts(conn: &rusqlite::Connection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Gift>, Error> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, gift_from_row)?;

    let mut gifts = Vec::new();
    for row in rows {
        let (mut gift, room) = row?;
        gift.room = Room::parse(&room)?;
        gifts.push(gift);
    }
    Ok(gifts)
}

fn rsvp_from_row(row: &Row<'_>) -> rusqlite::Result<Rsvp> {
    Ok(Rsvp { id: row.get(0)?, name: row.get(1)?, phone: row.get(2)?, attending: row.get(3)?, date: row.get(4)? })
}

fn upsert_gift(conn: &rusqlite::Connection, gift: &Gift) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO gifts (id, name, image_url, store_link, room, remove_bg, bg_tolerance, bg_sample)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            image_url = excluded.image_url,
            store_link = excluded.store_link,
            room = excluded.room,
            remove_bg = excluded.remove_bg,
            bg_tolerance = excluded.bg_tolerance,
            bg_sample = excluded.bg_sample",
        params![
            gift.id,
            &gift.name,
            &gift.image_url,
            &gift.store_link,
            gift.room.as_str(),
            gift.remove_bg,
            gift.bg_tolerance,
            gift.bg_sample.map(BgSample::as_str),
        ],
    )?;
    Ok(())
}

impl StoreDb {
    /// Insert or update gifts by id in one transaction.
    ///
    /// Returns the number of rows written.
    pub async fn import_gifts(&self, gifts: Vec<Gift>) -> Result<usize, Error> {
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                for gift in &gifts {
                    upsert_gift(&tx, gift)?;
                }
                tx.commit()?;
                Ok(gifts.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Parse a JSON array of loosely typed gift rows and upsert them.
    pub async fn import_gift_rows(&self, json: &str) -> Result<usize, Error> {
        let gifts = parse_gift_rows(json)?;
        tracing::info!(count = gifts.len(), "importing gift rows");
        self.import_gifts(gifts).await
    }
}

#[async_trait]
impl RegistryRepository for StoreDb {
    async fn list_gifts(&self) -> Result<Vec<Gift>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<Gift>, Error> {
                query_gifts(conn, &format!("SELECT {GIFT_COLUMNS} FROM gifts ORDER BY id ASC"), &[])
            })
            .await
            .map_err(Error::from)
    }

    async fn list_gifts_by_room(&self, room: Room) -> Result<Vec<Gift>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<Gift>, Error> {
                query_gifts(
                    conn,
                    &format!("SELECT {GIFT_COLUMNS} FROM gifts WHERE room = ?1 ORDER BY id ASC"),
                    &[&room.as_str()],
                )
            })
            .await
            .map_err(Error::from)
    }

    async fn insert_gift(&self, gift: NewGift) -> Result<Gift, Error> {
        self.conn
            .call(move |conn| -> Result<Gift, Error> {
                conn.execute(
                    "INSERT INTO gifts (id, name, image_url, store_link, room, remove_bg, bg_tolerance, bg_sample)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        gift.id,
                        &gift.name,
                        &gift.image_url,
                        &gift.store_link,
                        gift.room.as_str(),
                        gift.remove_bg,
                        gift.bg_tolerance,
                        gift.bg_sample.map(BgSample::as_str),
                    ],
                )?;

                Ok(Gift {
                    id: conn.last_insert_rowid(),
                    name: gift.name,
                    image_url: gift.image_url,
                    store_link: gift.store_link,
                    room: gift.room,
                    remove_bg: gift.remove_bg,
                    bg_tolerance: gift.bg_tolerance,
                    bg_sample: gift.bg_sample,
                })
            })
            .await
            .map_err(Error::from)
    }

    async fn update_gift(&self, gift: &Gift) -> Result<(), Error> {
        let gift = gift.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let updated = conn.execute(
                    "UPDATE gifts SET name = ?2, image_url = ?3, store_link = ?4, room = ?5,
                        remove_bg = ?6, bg_tolerance = ?7, bg_sample = ?8
                     WHERE id = ?1",
                    params![
                        gift.id,
                        &gift.name,
                        &gift.image_url,
                        &gift.store_link,
                        gift.room.as_str(),
                        gift.remove_bg,
                        gift.bg_tolerance,
                        gift.bg_sample.map(BgSample::as_str),
                    ],
                )?;
                if updated == 0 {
                    return Err(Error::NotFound(format!("gift {}", gift.id)));
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_gift(&self, id: i64) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                if conn.execute("DELETE FROM gifts WHERE id = ?1", params![id])? == 0 {
                    return Err(Error::NotFound(format!("gift {id}")));
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn list_purchased_gift_ids(&self) -> Result<Vec<i64>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<i64>, Error> {
                let mut stmt = conn.prepare("SELECT gift_id FROM purchases ORDER BY gift_id ASC")?;
                let ids = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<i64>, _>>()?;
                Ok(ids)
            })
            .await
            .map_err(Error::from)
    }

    async fn mark_purchased(&self, gift_id: i64) -> Result<(), Error> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let exists: bool =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM gifts WHERE id = ?1)", params![gift_id], |row| {
                        row.get(0)
                    })?;
                if !exists {
                    return Err(Error::NotFound(format!("gift {gift_id}")));
                }

                conn.execute(
                    "INSERT INTO purchases (gift_id, purchased_at) VALUES (?1, ?2)
                     ON CONFLICT(gift_id) DO NOTHING",
                    params![gift_id, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn unmark_purchased(&self, gift_id: i64) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM purchases WHERE gift_id = ?1", params![gift_id])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn insert_rsvp(&self, rsvp: NewRsvp) -> Result<Rsvp, Error> {
        let name = rsvp.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidInput("rsvp name cannot be empty".into()));
        }
        let date = rsvp.date.unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

        self.conn
            .call(move |conn| -> Result<Rsvp, Error> {
                conn.execute(
                    "INSERT INTO rsvps (name, phone, attending, date) VALUES (?1, ?2, ?3, ?4)",
                    params![&name, &rsvp.phone, rsvp.attending, &date],
                )?;
                Ok(Rsvp { id: conn.last_insert_rowid(), name, phone: rsvp.phone, attending: rsvp.attending, date })
            })
            .await
            .map_err(Error::from)
    }

    async fn list_rsvps(&self) -> Result<Vec<Rsvp>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<Rsvp>, Error> {
                let mut stmt =
                    conn.prepare("SELECT id, name, phone, attending, date FROM rsvps ORDER BY date DESC, id DESC")?;
                let rsvps = stmt.query_map([], rsvp_from_row)?.collect::<Result<Vec<_>, _>>()?;
                Ok(rsvps)
            })
            .await
            .map_err(Error::from)
    }
}
