use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::db::DatabaseError;
use crate::models::enums::Role;
use crate::models::*;

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, content, sent_at, read_at";

fn message_from_row(row: &Row) -> rusqlite::Result<Message> {
    Ok(Message {
        id: uuid_at(row, 0)?,
        sender_id: uuid_at(row, 1)?,
        receiver_id: uuid_at(row, 2)?,
        content: row.get(3)?,
        sent_at: row.get(4)?,
        read_at: row.get(5)?,
    })
}

pub fn insert_message(conn: &Connection, msg: &Message) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        params![
            msg.id.to_string(),
            msg.sender_id.to_string(),
            msg.receiver_id.to_string(),
            msg.content,
            msg.sent_at,
            msg.read_at,
        ],
    )?;
    Ok(())
}

pub fn get_message(conn: &Connection, id: &Uuid) -> Result<Option<Message>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
        params![id.to_string()],
        message_from_row,
    );

    match result {
        Ok(msg) => Ok(Some(msg)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Stamp `read_at` unless it is already set; the first read time wins.
pub fn mark_message_read(
    conn: &Connection,
    id: &Uuid,
    at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE messages SET read_at = COALESCE(read_at, ?1) WHERE id = ?2",
        params![at, id.to_string()],
    )?;
    Ok(())
}

/// Both directions between two users, oldest first.
pub fn conversation_between(
    conn: &Connection,
    a: &Uuid,
    b: &Uuid,
) -> Result<Vec<Message>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE (sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1)
         ORDER BY sent_at ASC"
    ))?;
    let messages = stmt
        .query_map(params![a.to_string(), b.to_string()], message_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}

/// One summary per partner of `user_id`, most recent conversation first.
pub fn list_conversations(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Vec<ConversationSummary>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE sender_id = ?1 OR receiver_id = ?1
         ORDER BY sent_at DESC"
    ))?;
    let messages = stmt
        .query_map(params![user_id.to_string()], message_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut order: Vec<Uuid> = Vec::new();
    let mut latest: HashMap<Uuid, (Message, i64)> = HashMap::new();
    for msg in messages {
        let incoming = msg.receiver_id == *user_id;
        let partner = if incoming { msg.sender_id } else { msg.receiver_id };
        let unread = i64::from(incoming && msg.read_at.is_none());
        match latest.get_mut(&partner) {
            Some((_, count)) => *count += unread,
            None => {
                order.push(partner);
                latest.insert(partner, (msg, unread));
            }
        }
    }

    let mut partner_stmt = conn.prepare(
        "SELECT u.username,
                EXISTS(SELECT 1 FROM doctors d WHERE d.user_id = u.id),
                EXISTS(SELECT 1 FROM patients p WHERE p.user_id = u.id)
         FROM users u WHERE u.id = ?1",
    )?;

    let mut summaries = Vec::with_capacity(order.len());
    for partner in order {
        let Some((last_message, unread_count)) = latest.remove(&partner) else {
            continue;
        };
        let (username, is_doctor, is_patient): (String, bool, bool) = partner_stmt
            .query_row(params![partner.to_string()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;
        let role = if is_doctor {
            Some(Role::Doctor)
        } else if is_patient {
            Some(Role::Patient)
        } else {
            None
        };
        summaries.push(ConversationSummary {
            user_id: partner,
            username,
            role,
            is_incoming: last_message.receiver_id == *user_id,
            last_message,
            unread_count,
        });
    }
    Ok(summaries)
}
