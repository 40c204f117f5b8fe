//! Notification dispatcher.
//!
//! Sending is best-effort: every failure is logged and swallowed so that a
//! broken transport never stops an event loop.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};

use vigil_domain::error::VigilError;
use vigil_domain::manager::TransportNames;
use vigil_domain::media::Image;
use vigil_domain::notification::Notification;
use vigil_domain::template::TemplateContext;
use vigil_domain::time::Timestamp;

use crate::ports::{Media, OutboundMessage, SendReceipt, WebhookClient};
use crate::resource_table::ResourceCache;

fn media(image: &Image) -> Media {
    Media {
        base64: STANDARD.encode(&image.data),
        mime_type: image.mime_type.clone(),
    }
}

/// Dispatches notifications through the configured transports.
pub struct Notifier {
    webhook: Arc<dyn WebhookClient>,
    transports: TransportNames,
}

impl Notifier {
    #[must_use]
    pub fn new(webhook: Arc<dyn WebhookClient>, transports: TransportNames) -> Self {
        Self {
            webhook,
            transports,
        }
    }

    #[must_use]
    pub fn transports(&self) -> &TransportNames {
        &self.transports
    }

    /// Send one notification for the event described by `context`.
    pub async fn notify(
        &self,
        notification: &Notification,
        context: &TemplateContext,
        image: Option<&Image>,
        cache: &mut ResourceCache,
    ) {
        if let Err(err) = self.dispatch(notification, context, image, cache).await {
            tracing::error!(
                event = %context.event_name,
                kind = notification.kind(),
                error = %err,
                "unable to send notification"
            );
        }
    }

    async fn dispatch(
        &self,
        notification: &Notification,
        context: &TemplateContext,
        image: Option<&Image>,
        cache: &mut ResourceCache,
    ) -> Result<(), VigilError> {
        match notification {
            Notification::Sms {
                to,
                preset,
                include_image,
            } => {
                let Some(module) = &self.transports.sms else {
                    tracing::warn!(event = %context.event_name, "no SMS module defined, skipping notification");
                    return Ok(());
                };
                let transport = cache.sms(module)?;
                let message = OutboundMessage {
                    to: vec![to.clone()],
                    preset: preset.clone(),
                    template_vars: context.variables(),
                    media: image.filter(|_| *include_image).map(media),
                    metadata: Map::new(),
                };
                check_receipt(&transport.send(message).await?, notification, context);
            }
            Notification::Email {
                to,
                preset,
                include_image,
            } => {
                let Some(module) = &self.transports.email else {
                    tracing::warn!(event = %context.event_name, "no email module defined, skipping notification");
                    return Ok(());
                };
                let transport = cache.notifier(module)?;
                let mut template_vars = context.variables();
                if let Some(image) = image.filter(|_| *include_image) {
                    let Media { base64, mime_type } = media(image);
                    template_vars.insert("image_base64".into(), Value::String(base64));
                    template_vars.insert("media_mime_type".into(), Value::String(mime_type));
                }
                let message = OutboundMessage {
                    to: vec![to.clone()],
                    preset: preset.clone(),
                    template_vars,
                    media: None,
                    metadata: Map::new(),
                };
                check_receipt(&transport.send(message).await?, notification, context);
            }
            Notification::WebhookGet { url } => {
                self.webhook.get(url).await?;
                tracing::debug!(event = %context.event_name, url = %url, "webhook called");
            }
            Notification::Push {
                device_tokens,
                preset,
                include_image,
            } => {
                let Some(module) = &self.transports.push else {
                    tracing::warn!(event = %context.event_name, "no push module defined, skipping notification");
                    return Ok(());
                };
                let transport = cache.notifier(module)?;
                let mut metadata = Map::new();
                metadata.insert(
                    "camera".into(),
                    Value::String(context.triggered_camera.clone()),
                );
                metadata.insert("event".into(), Value::String(context.event_name.clone()));
                let message = OutboundMessage {
                    to: device_tokens.clone(),
                    preset: preset.clone(),
                    template_vars: context.variables(),
                    media: image.filter(|_| *include_image).map(media),
                    metadata,
                };
                check_receipt(&transport.send(message).await?, notification, context);
            }
        }
        Ok(())
    }

    /// First reply received after `since` from any SMS destination of `notifications`.
    ///
    /// Returns an empty string when nothing was received or no SMS module is set.
    pub async fn check_response(
        &self,
        notifications: &[Notification],
        since: Timestamp,
        cache: &mut ResourceCache,
    ) -> String {
        let Some(module) = &self.transports.sms else {
            return String::new();
        };
        let transport = match cache.sms(module) {
            Ok(transport) => transport,
            Err(err) => {
                tracing::error!(error = %err, "unable to poll for responses");
                return String::new();
            }
        };
        for notification in notifications {
            let Notification::Sms { to, .. } = notification else {
                continue;
            };
            match transport.poll(since, to).await {
                Ok(messages) => {
                    if let Some(message) = messages.into_iter().next() {
                        tracing::info!(from = %message.from, "response received");
                        return message.body;
                    }
                }
                Err(err) => tracing::error!(from = %to, error = %err, "unable to poll for responses"),
            }
        }
        String::new()
    }
}

fn check_receipt(receipt: &SendReceipt, notification: &Notification, context: &TemplateContext) {
    if let Some(error) = &receipt.error {
        tracing::error!(
            event = %context.event_name,
            kind = notification.kind(),
            error = %error,
            "transport rejected notification"
        );
    }
}
