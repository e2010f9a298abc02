//! MIME part flattening.
//!
//! The provider returns each message body as a tree of parts. Storage is
//! flat: every node becomes one row, with the enclosing container recorded
//! as `parent_part_id`. The parent id is derived purely from the part id
//! string, so flattening needs no bookkeeping beyond the traversal itself.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use mailsift_gmail::{Message, MessagePart};

use super::model::{FlatPart, StoredHeader};

/// Largest base64url-encoded body kept inline. Bigger bodies keep their
/// size and attachment reference but drop the data itself.
pub const MAX_INLINE_BODY_BYTES: usize = 65_536;

/// Headers that survive ingestion, compared case-insensitively.
const PERSISTED_HEADERS: [&str; 7] = ["date", "from", "sender", "to", "cc", "bcc", "subject"];

/// Flatten a message's MIME tree into part and header rows.
///
/// Traversal is pre-order, so a container always precedes its children in
/// the returned vector. Messages without a payload flatten to nothing.
#[must_use]
pub fn flatten_message(message: &Message) -> (Vec<FlatPart>, Vec<StoredHeader>) {
    let mut parts = Vec::new();
    let mut headers = Vec::new();
    if let Some(payload) = &message.payload {
        visit(&message.id, payload, &mut parts, &mut headers);
    }
    (parts, headers)
}

fn visit(
    message_id: &str,
    part: &MessagePart,
    parts: &mut Vec<FlatPart>,
    headers: &mut Vec<StoredHeader>,
) {
    // Containers only exist to hold children; whatever body the wire
    // attaches to them is boundary noise, not content.
    let body = if part.is_container() {
        None
    } else {
        part.body.as_ref()
    };
    let body_data = body
        .and_then(|b| b.data.as_ref())
        .filter(|data| data.len() <= MAX_INLINE_BODY_BYTES)
        .cloned();

    parts.push(FlatPart {
        message_id: message_id.to_string(),
        part_id: normalize_part_id(part.part_id.as_deref()),
        mime_type: part.mime_type.clone(),
        filename: part.filename.clone(),
        attachment_id: body.and_then(|b| b.attachment_id.clone()),
        body_size: body.map(|b| b.size).unwrap_or_default(),
        body_data,
        parent_part_id: part
            .part_id
            .as_deref()
            .and_then(derive_parent_part_id),
    });

    for header in &part.headers {
        let name = header.name.to_ascii_lowercase();
        if PERSISTED_HEADERS.contains(&name.as_str()) {
            headers.push(StoredHeader {
                message_id: message_id.to_string(),
                message_part_id: normalize_part_id(part.part_id.as_deref()),
                name,
                value: header.value.clone(),
            });
        }
    }

    for child in &part.parts {
        visit(message_id, child, parts, headers);
    }
}

/// Part id of the container enclosing `part_id`, if any.
///
/// `"1.2.3"` is a child of `"1.2"`; a single-segment id like `"0"` hangs
/// off the unnamed root. Derivation strips the trailing digit run and then
/// one trailing dot; an empty remainder means no parent.
fn derive_parent_part_id(part_id: &str) -> Option<String> {
    let without_digits = part_id.trim_end_matches(|c: char| c.is_ascii_digit());
    let parent = without_digits.strip_suffix('.').unwrap_or(without_digits);
    if parent.is_empty() {
        None
    } else {
        Some(parent.to_string())
    }
}

fn normalize_part_id(part_id: Option<&str>) -> Option<String> {
    part_id.filter(|id| !id.is_empty()).map(str::to_string)
}

/// Decoded text of the first `text/plain` part carrying inline data.
#[must_use]
pub fn plain_text_body(parts: &[FlatPart]) -> Option<String> {
    parts
        .iter()
        .filter(|part| part.mime_type == "text/plain")
        .filter_map(|part| part.body_data.as_deref())
        .find_map(|data| {
            URL_SAFE
                .decode(data)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mailsift_gmail::{MessagePartBody, PartHeader};

    use super::*;

    fn part(id: &str, mime: &str, children: Vec<MessagePart>) -> MessagePart {
        MessagePart {
            part_id: Some(id.to_string()),
            mime_type: mime.to_string(),
            parts: children,
            ..MessagePart::default()
        }
    }

    fn message_with_payload(payload: MessagePart) -> Message {
        Message {
            id: "m1".to_string(),
            thread_id: "t1".to_string(),
            payload: Some(payload),
            ..Message::default()
        }
    }

    #[test]
    fn test_parent_derivation_three_levels() {
        let tree = MessagePart {
            part_id: None,
            mime_type: "multipart/mixed".to_string(),
            parts: vec![part(
                "1",
                "multipart/alternative",
                vec![part("1.1", "text/plain", vec![]), part("1.2", "text/html", vec![])],
            )],
            ..MessagePart::default()
        };

        let (parts, _) = flatten_message(&message_with_payload(tree));
        assert_eq!(parts.len(), 4);

        assert_eq!(parts[0].part_id, None);
        assert_eq!(parts[0].parent_part_id, None);
        assert_eq!(parts[1].part_id.as_deref(), Some("1"));
        assert_eq!(parts[1].parent_part_id, None);
        assert_eq!(parts[2].part_id.as_deref(), Some("1.1"));
        assert_eq!(parts[2].parent_part_id.as_deref(), Some("1"));
        assert_eq!(parts[3].part_id.as_deref(), Some("1.2"));
        assert_eq!(parts[3].parent_part_id.as_deref(), Some("1"));

        // Pre-order: every parent shows up before its children.
        for flat in &parts {
            if let Some(parent) = &flat.parent_part_id {
                assert!(
                    parts
                        .iter()
                        .take_while(|p| p.part_id != flat.part_id)
                        .any(|p| p.part_id.as_deref() == Some(parent)),
                    "parent {parent} must precede its child"
                );
            }
        }
    }

    #[test]
    fn test_multidigit_segments_derive_correctly() {
        assert_eq!(derive_parent_part_id("1.12"), Some("1".to_string()));
        assert_eq!(derive_parent_part_id("2.10.3"), Some("2.10".to_string()));
        assert_eq!(derive_parent_part_id("0"), None);
        assert_eq!(derive_parent_part_id("17"), None);
    }

    #[test]
    fn test_header_allow_list_filtering() {
        let mut root = part("0", "text/plain", vec![]);
        root.headers = vec![
            PartHeader {
                name: "Subject".to_string(),
                value: "Hello".to_string(),
            },
            PartHeader {
                name: "FROM".to_string(),
                value: "a@example.com".to_string(),
            },
            PartHeader {
                name: "X-Mailer".to_string(),
                value: "something".to_string(),
            },
            PartHeader {
                name: "Received".to_string(),
                value: "by mx".to_string(),
            },
        ];

        let (_, headers) = flatten_message(&message_with_payload(root));
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].name, "subject");
        assert_eq!(headers[1].name, "from");
        assert_eq!(headers[1].value, "a@example.com");
    }

    #[test]
    fn test_oversized_body_is_capped() {
        let mut big = part("0", "text/plain", vec![]);
        big.body = Some(MessagePartBody {
            attachment_id: Some("att-9".to_string()),
            size: 200_000,
            data: Some("A".repeat(MAX_INLINE_BODY_BYTES + 1)),
        });

        let (parts, _) = flatten_message(&message_with_payload(big));
        assert_eq!(parts[0].body_data, None);
        assert_eq!(parts[0].body_size, 200_000);
        assert_eq!(parts[0].attachment_id.as_deref(), Some("att-9"));
    }

    #[test]
    fn test_body_at_cap_is_kept() {
        let mut just_fits = part("0", "text/plain", vec![]);
        just_fits.body = Some(MessagePartBody {
            attachment_id: None,
            size: 100,
            data: Some("B".repeat(MAX_INLINE_BODY_BYTES)),
        });

        let (parts, _) = flatten_message(&message_with_payload(just_fits));
        assert!(parts[0].body_data.is_some());
    }

    #[test]
    fn test_container_body_is_not_stored() {
        let mut root = part("0", "multipart/mixed", vec![part("0.1", "text/plain", vec![])]);
        root.body = Some(MessagePartBody {
            attachment_id: None,
            size: 42,
            data: Some(URL_SAFE.encode("--boundary--")),
        });

        let (parts, _) = flatten_message(&message_with_payload(root));
        assert_eq!(parts[0].body_data, None);
        assert_eq!(parts[0].body_size, 0);
        assert_eq!(parts[0].attachment_id, None);
    }

    #[test]
    fn test_message_without_payload_flattens_to_nothing() {
        let message = Message {
            id: "m1".to_string(),
            ..Message::default()
        };
        let (parts, headers) = flatten_message(&message);
        assert!(parts.is_empty());
        assert!(headers.is_empty());
    }

    #[test]
    fn test_plain_text_body_decodes_first_plain_part() {
        let mut plain = part("0.1", "text/plain", vec![]);
        plain.body = Some(MessagePartBody {
            attachment_id: None,
            size: 8,
            data: Some(URL_SAFE.encode("Hi there")),
        });
        let tree = part("0", "multipart/alternative", vec![plain]);

        let (parts, _) = flatten_message(&message_with_payload(tree));
        assert_eq!(plain_text_body(&parts).as_deref(), Some("Hi there"));
    }

    #[test]
    fn test_plain_text_body_skips_undecodable_data() {
        let mut broken = part("0", "text/plain", vec![]);
        broken.body = Some(MessagePartBody {
            attachment_id: None,
            size: 4,
            data: Some("not!valid!base64!".to_string()),
        });

        let (parts, _) = flatten_message(&message_with_payload(broken));
        assert_eq!(plain_text_body(&parts), None);
    }
}
