use crate::{
    application::services::media::MediaResolver,
    domain::{
        errors::DispatchResult,
        models::{InboundMessage, InboundNode, MessageBody, contact::split_cards},
    },
};

/// Normalizes raw inbound nodes. Returns `None` when nothing arrived.
pub async fn transform_messages(
    media: &MediaResolver,
    nodes: Vec<InboundNode>,
) -> DispatchResult<Option<Vec<InboundMessage>>> {
    if nodes.is_empty() {
        return Ok(None);
    }

    let mut transformed = Vec::with_capacity(nodes.len());
    for node in nodes {
        transformed.push(transform(media, node).await?);
    }
    Ok(Some(transformed))
}

async fn transform(media: &MediaResolver, node: InboundNode) -> DispatchResult<InboundMessage> {
    let mut attributes = node.attributes;
    let timestamp = attributes.remove("t");
    let is_media = attributes.get("type").is_some_and(|kind| kind == "media");

    let body = match node.children.into_iter().next() {
        Some(child) => {
            let mut body = MessageBody {
                tag: child.tag.clone(),
                attributes: child.attributes.clone(),
                data: String::from_utf8_lossy(&child.data).into_owned(),
                file: None,
                html: None,
                vcard: Vec::new(),
            };
            if is_media {
                if child.attribute("type") == Some("vcard") {
                    let payload = child
                        .child(0)
                        .map(|card| String::from_utf8_lossy(&card.data).into_owned())
                        .unwrap_or_default();
                    body.vcard = split_cards(&payload);
                } else {
                    let linked = media.linkify(&child).await?;
                    body.file = Some(linked.file);
                    body.html = Some(linked.html);
                }
            }
            Some(body)
        }
        None => None,
    };

    Ok(InboundMessage {
        attributes,
        timestamp,
        body,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::{
        domain::models::{ContactCard, ProtocolNode},
        infrastructure::media::{hasher::Sha256Hasher, http::HttpMediaFetcher},
    };

    fn resolver(storage: &std::path::Path) -> MediaResolver {
        MediaResolver::new(
            storage,
            HttpMediaFetcher::new(Duration::from_secs(1)).unwrap(),
            Sha256Hasher::new(),
        )
    }

    #[tokio::test]
    async fn nothing_received_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(transform_messages(&resolver(dir.path()), vec![]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn text_messages_keep_body_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let node = ProtocolNode::new("message")
            .with_attribute("from", "5219511552222@s.whatsapp.net")
            .with_attribute("type", "text")
            .with_attribute("t", "1420000000")
            .with_child(ProtocolNode::new("body").with_data("hola"));

        let messages = transform_messages(&resolver(dir.path()), vec![node])
            .await
            .unwrap()
            .unwrap();

        let message = &messages[0];
        assert_eq!(message.timestamp.as_deref(), Some("1420000000"));
        assert!(!message.attributes.contains_key("t"));
        assert_eq!(message.message_type(), Some("text"));
        let body = message.body.as_ref().unwrap();
        assert_eq!(body.tag, "body");
        assert_eq!(body.data, "hola");
        assert!(body.file.is_none());
    }

    #[tokio::test]
    async fn vcard_media_lists_every_card() {
        let dir = tempfile::tempdir().unwrap();
        let payload = format!(
            "{}{}",
            ContactCard::new("Ann").render(),
            ContactCard::new("Ben").render()
        );
        let node = ProtocolNode::new("message")
            .with_attribute("type", "media")
            .with_child(
                ProtocolNode::new("media")
                    .with_attribute("type", "vcard")
                    .with_child(ProtocolNode::new("vcard").with_data(payload)),
            );

        let messages = transform_messages(&resolver(dir.path()), vec![node])
            .await
            .unwrap()
            .unwrap();

        let body = messages[0].body.as_ref().unwrap();
        assert_eq!(body.vcard.len(), 2);
        assert!(body.vcard[0].contains("FN:Ann"));
    }

    #[tokio::test]
    async fn location_media_is_linked() {
        let dir = tempfile::tempdir().unwrap();
        let node = ProtocolNode::new("message")
            .with_attribute("type", "media")
            .with_child(
                ProtocolNode::new("media")
                    .with_attribute("type", "location")
                    .with_attribute("longitude", "-89.1")
                    .with_attribute("latitude", "19.4")
                    .with_data(b"png".to_vec()),
            );

        let messages = transform_messages(&resolver(dir.path()), vec![node])
            .await
            .unwrap()
            .unwrap();

        let body = messages[0].body.as_ref().unwrap();
        assert_eq!(body.file, Some(dir.path().join("pictures").join("891194.jpg")));
        assert!(body.html.as_deref().unwrap().contains("google.com/maps"));
    }
}
