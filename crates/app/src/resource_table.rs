//! Named resources shared by events, and the per-task cache over them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use vigil_domain::error::{ResourceKind, ResourceUnavailable};

use crate::ports::{Camera, GenericResource, NotificationTransport, SmsTransport, VideoStore, Vision};

/// A resolved resource handle.
#[derive(Clone)]
pub enum Resource {
    Camera(Arc<dyn Camera>),
    Vision(Arc<dyn Vision>),
    Generic(Arc<dyn GenericResource>),
    Sms(Arc<dyn SmsTransport>),
    Notifier(Arc<dyn NotificationTransport>),
    VideoStore(Arc<dyn VideoStore>),
}

impl Resource {
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Camera(_) => ResourceKind::Camera,
            Self::Vision(_) => ResourceKind::Vision,
            Self::Generic(_) => ResourceKind::Generic,
            Self::Sms(_) => ResourceKind::SmsTransport,
            Self::Notifier(_) => ResourceKind::NotificationTransport,
            Self::VideoStore(_) => ResourceKind::VideoStore,
        }
    }

    fn as_camera(&self) -> Option<Arc<dyn Camera>> {
        match self {
            Self::Camera(camera) => Some(Arc::clone(camera)),
            _ => None,
        }
    }

    fn as_vision(&self) -> Option<Arc<dyn Vision>> {
        match self {
            Self::Vision(vision) => Some(Arc::clone(vision)),
            _ => None,
        }
    }

    /// Vision services accept generic calls too.
    fn as_generic(&self) -> Option<Arc<dyn GenericResource>> {
        match self {
            Self::Generic(generic) => Some(Arc::clone(generic)),
            Self::Vision(vision) => Some(Arc::clone(vision) as Arc<dyn GenericResource>),
            _ => None,
        }
    }

    fn as_sms(&self) -> Option<Arc<dyn SmsTransport>> {
        match self {
            Self::Sms(sms) => Some(Arc::clone(sms)),
            _ => None,
        }
    }

    /// SMS transports can also be used as plain one-way notifiers.
    fn as_notifier(&self) -> Option<Arc<dyn NotificationTransport>> {
        match self {
            Self::Notifier(notifier) => Some(Arc::clone(notifier)),
            Self::Sms(sms) => Some(Arc::clone(sms) as Arc<dyn NotificationTransport>),
            _ => None,
        }
    }

    fn as_video_store(&self) -> Option<Arc<dyn VideoStore>> {
        match self {
            Self::VideoStore(store) => Some(Arc::clone(store)),
            _ => None,
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource({})", self.kind())
    }
}

/// Read-only table of resolved resources, shared by every event task.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    resources: Arc<HashMap<String, Resource>>,
}

impl ResourceTable {
    #[must_use]
    pub fn new(resources: HashMap<String, Resource>) -> Self {
        Self {
            resources: Arc::new(resources),
        }
    }

    /// Builder-style insertion, used while assembling the table.
    #[must_use]
    pub fn with(self, name: impl Into<String>, resource: Resource) -> Self {
        let mut resources = Arc::unwrap_or_clone(self.resources);
        resources.insert(name.into(), resource);
        Self::new(resources)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Start a task-local cache seeded from this table.
    #[must_use]
    pub fn cache(&self) -> ResourceCache {
        ResourceCache {
            table: self.clone(),
            resolved: HashMap::new(),
        }
    }
}

/// Per-task cache of lazily resolved handles.
///
/// Each event task owns one, so lookups never contend across tasks.
#[derive(Debug)]
pub struct ResourceCache {
    table: ResourceTable,
    resolved: HashMap<String, Resource>,
}

impl ResourceCache {
    fn lookup<T>(
        &mut self,
        name: &str,
        kind: ResourceKind,
        pick: impl Fn(&Resource) -> Option<T>,
    ) -> Result<T, ResourceUnavailable> {
        if !self.resolved.contains_key(name)
            && let Some(resource) = self.table.get(name)
        {
            self.resolved.insert(name.to_string(), resource.clone());
        }
        self.resolved
            .get(name)
            .and_then(pick)
            .ok_or_else(|| ResourceUnavailable {
                name: name.to_string(),
                kind,
            })
    }

    /// # Errors
    ///
    /// Returns [`ResourceUnavailable`] when `name` is missing or not a camera.
    pub fn camera(&mut self, name: &str) -> Result<Arc<dyn Camera>, ResourceUnavailable> {
        self.lookup(name, ResourceKind::Camera, Resource::as_camera)
    }

    /// # Errors
    ///
    /// Returns [`ResourceUnavailable`] when `name` is missing or not a vision service.
    pub fn vision(&mut self, name: &str) -> Result<Arc<dyn Vision>, ResourceUnavailable> {
        self.lookup(name, ResourceKind::Vision, Resource::as_vision)
    }

    /// # Errors
    ///
    /// Returns [`ResourceUnavailable`] when `name` is missing or cannot take calls.
    pub fn generic(&mut self, name: &str) -> Result<Arc<dyn GenericResource>, ResourceUnavailable> {
        self.lookup(name, ResourceKind::Generic, Resource::as_generic)
    }

    /// # Errors
    ///
    /// Returns [`ResourceUnavailable`] when `name` is missing or not an SMS transport.
    pub fn sms(&mut self, name: &str) -> Result<Arc<dyn SmsTransport>, ResourceUnavailable> {
        self.lookup(name, ResourceKind::SmsTransport, Resource::as_sms)
    }

    /// # Errors
    ///
    /// Returns [`ResourceUnavailable`] when `name` is missing or cannot send.
    pub fn notifier(
        &mut self,
        name: &str,
    ) -> Result<Arc<dyn NotificationTransport>, ResourceUnavailable> {
        self.lookup(
            name,
            ResourceKind::NotificationTransport,
            Resource::as_notifier,
        )
    }

    /// # Errors
    ///
    /// Returns [`ResourceUnavailable`] when `name` is missing or not a video store.
    pub fn video_store(&mut self, name: &str) -> Result<Arc<dyn VideoStore>, ResourceUnavailable> {
        self.lookup(name, ResourceKind::VideoStore, Resource::as_video_store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use vigil_domain::error::VigilError;
    use vigil_domain::media::Image;

    use crate::ports::{Classification, Detection, OutboundMessage, SendReceipt, TrackedFrame};

    struct StubCamera;

    #[async_trait]
    impl Camera for StubCamera {
        async fn get_image(&self) -> Result<Image, VigilError> {
            Ok(Image::jpeg(vec![1, 2, 3]))
        }
    }

    struct StubVision;

    #[async_trait]
    impl GenericResource for StubVision {
        async fn invoke(&self, method: &str, _payload: Value) -> Result<Value, VigilError> {
            Ok(Value::String(method.to_string()))
        }
    }

    #[async_trait]
    impl Vision for StubVision {
        async fn detect(&self, _image: &Image) -> Result<Vec<Detection>, VigilError> {
            Ok(Vec::new())
        }

        async fn classify(
            &self,
            _image: &Image,
            _count: usize,
        ) -> Result<Vec<Classification>, VigilError> {
            Ok(Vec::new())
        }

        async fn detect_and_image(&self, _camera: &str) -> Result<TrackedFrame, VigilError> {
            Ok(TrackedFrame::default())
        }
    }

    struct StubNotifier;

    #[async_trait]
    impl NotificationTransport for StubNotifier {
        async fn send(&self, _message: OutboundMessage) -> Result<SendReceipt, VigilError> {
            Ok(SendReceipt::default())
        }
    }

    fn table() -> ResourceTable {
        ResourceTable::default()
            .with("cam1", Resource::Camera(Arc::new(StubCamera)))
            .with("people", Resource::Vision(Arc::new(StubVision)))
            .with("mailer", Resource::Notifier(Arc::new(StubNotifier)))
    }

    #[test]
    fn should_build_table_with_builder() {
        let table = table();
        assert_eq!(table.len(), 3);
        assert!(table.contains("cam1"));
        assert!(!table.contains("nope"));
    }

    #[test]
    fn should_resolve_resource_of_matching_kind() {
        let mut cache = table().cache();
        assert!(cache.camera("cam1").is_ok());
        assert!(cache.vision("people").is_ok());
        assert!(cache.notifier("mailer").is_ok());
    }

    #[test]
    fn should_report_missing_resource_with_requested_kind() {
        let mut cache = table().cache();
        let err = cache.camera("garage").err().unwrap();
        assert_eq!(err.name, "garage");
        assert_eq!(err.kind, ResourceKind::Camera);
    }

    #[test]
    fn should_reject_resource_of_wrong_kind() {
        let mut cache = table().cache();
        let err = cache.sms("mailer").err().unwrap();
        assert_eq!(err.kind, ResourceKind::SmsTransport);
        assert!(cache.video_store("cam1").is_err());
    }

    #[tokio::test]
    async fn should_use_vision_service_as_generic_resource() {
        let mut cache = table().cache();
        let generic = cache.generic("people").unwrap();
        let result = generic.invoke("ping", Value::Null).await.unwrap();
        assert_eq!(result, Value::String("ping".to_string()));
    }

    #[test]
    fn should_keep_resolved_handle_in_cache() {
        let mut cache = table().cache();
        cache.camera("cam1").unwrap();
        assert!(cache.resolved.contains_key("cam1"));
        assert!(!cache.resolved.contains_key("people"));
    }
}
