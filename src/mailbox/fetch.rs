//! Pull messages from Gmail into the local cache.
//!
//! Each message is fetched in `raw` format, decoded from base64url, parsed
//! with `mail-parser`, flattened into a [`MessageRecord`] and upserted.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use mail_parser::{MessageParser, PartType};
use tracing::{error, info};

use crate::error::MailboxError;
use crate::mailbox::GmailClient;
use crate::mailbox::types::Message;
use crate::store::{MessageRecord, MessageStore};

/// Fetch up to `max_results` messages matching `query` and cache them.
///
/// Listing failures abort; a failure on one message is logged and skipped.
/// Returns how many messages were stored.
pub async fn fetch_and_store(
    client: &GmailClient,
    store: &dyn MessageStore,
    query: &str,
    max_results: u32,
) -> Result<usize, MailboxError> {
    let ids = client.list_message_ids(query, max_results).await?;
    info!("Found {} messages (limited to {})", ids.len(), max_results);

    let mut stored = 0;
    for (i, id) in ids.iter().enumerate() {
        let record = match client.get_raw_message(id).await {
            Ok(message) => match record_from_message(&message) {
                Ok(record) => record,
                Err(e) => {
                    error!(message_id = %id, error = %e, "Failed to parse message");
                    continue;
                }
            },
            Err(e) => {
                error!(message_id = %id, error = %e, "Failed to fetch message");
                continue;
            }
        };

        if let Err(e) = store.upsert_message(&record).await {
            error!(message_id = %id, error = %e, "Failed to cache message");
            continue;
        }

        stored += 1;
        info!(
            "[{}] Stored message id={} subject={}",
            i + 1,
            record.id,
            record.subject.chars().take(150).collect::<String>()
        );
    }

    Ok(stored)
}

/// Convert a `format=raw` Gmail message into a cache record.
pub fn record_from_message(message: &Message) -> Result<MessageRecord, MailboxError> {
    let raw = message
        .raw
        .as_deref()
        .ok_or_else(|| MailboxError::Decode(format!("message {} has no raw payload", message.id)))?;

    // Gmail pads its base64url output; the no-pad engine wants it stripped.
    let bytes = URL_SAFE_NO_PAD
        .decode(raw.trim().trim_end_matches('='))
        .map_err(|e| MailboxError::Decode(format!("message {}: {e}", message.id)))?;

    record_from_rfc822(&message.id, &message.label_ids, &bytes)
}

/// Parse an RFC 822 message into a cache record.
pub fn record_from_rfc822(
    id: &str,
    label_ids: &[String],
    bytes: &[u8],
) -> Result<MessageRecord, MailboxError> {
    let parsed = MessageParser::default()
        .parse(bytes)
        .ok_or_else(|| MailboxError::Decode(format!("message {id} is not valid RFC 822")))?;

    Ok(MessageRecord {
        id: id.to_string(),
        from_address: format_addresses(parsed.from()),
        to_address: format_addresses(parsed.to()),
        subject: parsed.subject().unwrap_or_default().to_string(),
        body: body_parts(&parsed),
        received_at: parsed
            .header_raw("Date")
            .map(|date| date.trim().to_string())
            .unwrap_or_default(),
        label_ids: label_ids.join(","),
    })
}

/// Every text/plain and text/html part, in document order, joined with "\n".
fn body_parts(parsed: &mail_parser::Message) -> String {
    let parts: Vec<&str> = parsed
        .parts
        .iter()
        .filter_map(|part| match &part.body {
            PartType::Text(text) | PartType::Html(text) => Some(text.as_ref()),
            _ => None,
        })
        .collect();
    parts.join("\n")
}

/// Render an address header as `Name <addr>` entries joined with ", ".
fn format_addresses(addr: Option<&mail_parser::Address>) -> String {
    let Some(addr) = addr else {
        return String::new();
    };

    let rendered: Vec<String> = match addr {
        mail_parser::Address::List(addrs) => addrs.iter().filter_map(render_addr).collect(),
        mail_parser::Address::Group(groups) => groups
            .iter()
            .flat_map(|g| g.addresses.iter().filter_map(render_addr))
            .collect(),
    };
    rendered.join(", ")
}

fn render_addr(addr: &mail_parser::Addr) -> Option<String> {
    let address = addr.address.as_deref()?;
    match addr.name.as_deref() {
        Some(name) if !name.is_empty() => Some(format!("{name} <{address}>")),
        _ => Some(address.to_string()),
    }
}
