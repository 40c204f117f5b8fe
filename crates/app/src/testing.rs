//! In-memory fakes of the resource ports, shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use vigil_domain::error::VigilError;
use vigil_domain::event::EventSnapshot;
use vigil_domain::id::TriggerRecordId;
use vigil_domain::media::Image;
use vigil_domain::time::Timestamp;
use vigil_domain::trigger_record::TriggerRecord;

use crate::ports::{
    Camera, Classification, Detection, GenericResource, InboundMessage, NotificationTransport,
    OutboundMessage, SendReceipt, SmsTransport, StateStore, TrackedFrame, TriggerHistory,
    VideoSaveRequest, VideoStore, Vision, WebhookClient,
};

pub fn at(secs: i64) -> Timestamp {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn frame() -> Image {
    Image::jpeg(vec![0xFF, 0xD8, 0xFF])
}

pub fn detection(class_name: &str, confidence: f64) -> Detection {
    Detection {
        class_name: class_name.to_string(),
        confidence,
    }
}

#[derive(Default)]
pub struct FakeCamera {
    pub broken: bool,
}

#[async_trait]
impl Camera for FakeCamera {
    async fn get_image(&self) -> Result<Image, VigilError> {
        if self.broken {
            return Err(VigilError::evaluation("camera offline"));
        }
        Ok(frame())
    }
}

/// Vision service answering with fixed detections.
///
/// `known` is returned under `list_current` for tracker lookups.
#[derive(Default)]
pub struct FakeVision {
    pub detections: Vec<Detection>,
    pub classifications: Vec<Classification>,
    pub known: Value,
    pub calls: Mutex<Vec<String>>,
}

impl FakeVision {
    pub fn detecting(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenericResource for FakeVision {
    async fn invoke(&self, method: &str, payload: Value) -> Result<Value, VigilError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{method} {payload}"));
        Ok(serde_json::json!({ "list_current": self.known }))
    }
}

#[async_trait]
impl Vision for FakeVision {
    async fn detect(&self, _image: &Image) -> Result<Vec<Detection>, VigilError> {
        self.calls.lock().unwrap().push("detect".to_string());
        Ok(self.detections.clone())
    }

    async fn classify(
        &self,
        _image: &Image,
        count: usize,
    ) -> Result<Vec<Classification>, VigilError> {
        self.calls.lock().unwrap().push(format!("classify {count}"));
        Ok(self.classifications.clone())
    }

    async fn detect_and_image(&self, camera: &str) -> Result<TrackedFrame, VigilError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("detect_and_image {camera}"));
        Ok(TrackedFrame {
            image: Some(frame()),
            detections: self.detections.clone(),
        })
    }
}

/// Generic resource returning a settable reply. `None` makes every call fail.
#[derive(Default)]
pub struct FakeResource {
    pub reply: Mutex<Option<Value>>,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl FakeResource {
    pub fn replying(value: Value) -> Self {
        Self {
            reply: Mutex::new(Some(value)),
            calls: Mutex::default(),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn set_reply(&self, value: Value) {
        *self.reply.lock().unwrap() = Some(value);
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenericResource for FakeResource {
    async fn invoke(&self, method: &str, payload: Value) -> Result<Value, VigilError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), payload));
        self.reply
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| VigilError::evaluation("resource failure"))
    }
}

/// Transport recording what it sends and serving queued replies.
#[derive(Default)]
pub struct FakeTransport {
    pub sent: Mutex<Vec<OutboundMessage>>,
    pub inbound: Mutex<Vec<InboundMessage>>,
    pub receipt_error: Option<String>,
}

impl FakeTransport {
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn reply(&self, from: &str, body: &str, time: Timestamp) {
        self.inbound.lock().unwrap().push(InboundMessage {
            body: body.to_string(),
            from: from.to_string(),
            time,
        });
    }
}

#[async_trait]
impl NotificationTransport for FakeTransport {
    async fn send(&self, message: OutboundMessage) -> Result<SendReceipt, VigilError> {
        self.sent.lock().unwrap().push(message);
        Ok(SendReceipt {
            error: self.receipt_error.clone(),
        })
    }
}

#[async_trait]
impl SmsTransport for FakeTransport {
    async fn poll(
        &self,
        since: Timestamp,
        from: &str,
    ) -> Result<Vec<InboundMessage>, VigilError> {
        Ok(self
            .inbound
            .lock()
            .unwrap()
            .iter()
            .filter(|msg| msg.from == from && msg.time > since)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct FakeVideoStore {
    pub saved: Mutex<Vec<VideoSaveRequest>>,
}

#[async_trait]
impl VideoStore for FakeVideoStore {
    async fn save(&self, request: VideoSaveRequest) -> Result<Value, VigilError> {
        self.saved.lock().unwrap().push(request);
        Ok(serde_json::json!({ "saved": true }))
    }
}

#[derive(Default)]
pub struct FakeWebhook {
    pub urls: Mutex<Vec<String>>,
}

#[async_trait]
impl WebhookClient for FakeWebhook {
    async fn get(&self, url: &str) -> Result<(), VigilError> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryStateStore {
    pub snapshots: Mutex<HashMap<String, EventSnapshot>>,
    pub corrupt: bool,
}

impl StateStore for InMemoryStateStore {
    async fn save(&self, event: &str, snapshot: &EventSnapshot) -> Result<(), VigilError> {
        self.snapshots
            .lock()
            .unwrap()
            .insert(event.to_string(), snapshot.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<HashMap<String, EventSnapshot>, VigilError> {
        if self.corrupt {
            return Err(VigilError::Persistence("unreadable state".into()));
        }
        Ok(self.snapshots.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct InMemoryTriggerHistory {
    pub records: Mutex<Vec<TriggerRecord>>,
}

impl TriggerHistory for InMemoryTriggerHistory {
    async fn record(&self, record: TriggerRecord) -> Result<(), VigilError> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }

    async fn recent(
        &self,
        event: Option<&str>,
        limit: usize,
    ) -> Result<Vec<TriggerRecord>, VigilError> {
        let mut records: Vec<TriggerRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| event.is_none_or(|name| r.event == name))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn delete(&self, id: TriggerRecordId) -> Result<u64, VigilError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok((before - records.len()) as u64)
    }
}
