//! Runtime supervisor: owns the running event tasks.
//!
//! [`EventManager`] is the host-facing entry point: it validates
//! specifications, (re)starts one task per event, persists their snapshots
//! and answers state queries and commands.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::{Mutex as AsyncMutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use vigil_domain::error::{NotFoundError, VigilError};
use vigil_domain::event::{EventSnapshot, EventState, EventStatus};
use vigil_domain::id::TriggerRecordId;
use vigil_domain::manager::{Dependencies, ManagerSpec, StateReport};
use vigil_domain::mode::ModeState;
use vigil_domain::time::{self, Timestamp};

use crate::event_bus::InProcessTriggerBus;
use crate::event_loop::{EventHandle, EventTask, TaskShared};
use crate::notifier::Notifier;
use crate::ports::{StateStore, TriggerHistory, WebhookClient};
use crate::resource_table::ResourceTable;

const TRIGGER_BUS_CAPACITY: usize = 64;
const DEFAULT_TRIGGERED_LIMIT: usize = 5;

/// When and whether event snapshots are written to the [`StateStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceSettings {
    pub enabled: bool,
    pub save_interval: Duration,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            save_interval: Duration::from_secs(30),
        }
    }
}

/// Which events [`EventManager::get_state`] reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StateFilter {
    #[default]
    All,
    /// Only triggered or actioning events whose trigger was not reported yet.
    NewTriggersOnly,
}

/// One configuration generation: its tasks and the handles to reach them.
struct Generation {
    mode: watch::Sender<ModeState>,
    handles: BTreeMap<String, EventHandle>,
    incomplete: BTreeMap<String, EventStatus>,
    tasks: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

pub struct EventManager<S, H> {
    store: Arc<S>,
    history: Arc<H>,
    webhook: Arc<dyn WebhookClient>,
    persistence: PersistenceSettings,
    bus: InProcessTriggerBus,
    current: AsyncMutex<Option<Generation>>,
    reported: Mutex<HashMap<String, Timestamp>>,
}

impl<S, H> EventManager<S, H>
where
    S: StateStore + Send + Sync + 'static,
    H: TriggerHistory + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(
        store: Arc<S>,
        history: Arc<H>,
        webhook: Arc<dyn WebhookClient>,
        persistence: PersistenceSettings,
    ) -> Self {
        Self {
            store,
            history,
            webhook,
            persistence,
            bus: InProcessTriggerBus::new(TRIGGER_BUS_CAPACITY),
            current: AsyncMutex::new(None),
            reported: Mutex::new(HashMap::new()),
        }
    }

    /// Validate `spec` and list the resources it needs.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Configuration`] when the specification is invalid.
    pub fn configure(&self, spec: &ManagerSpec) -> Result<Dependencies, VigilError> {
        Ok(spec.dependencies()?)
    }

    /// Stop every running task and start a fresh generation from `spec`.
    ///
    /// Events missing a required resource are kept as `incomplete` and
    /// never scheduled.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Configuration`] when the specification is
    /// invalid. Running tasks are left untouched in that case.
    #[tracing::instrument(skip_all, fields(events = spec.events.len()))]
    pub async fn reconfigure(
        &self,
        spec: ManagerSpec,
        table: ResourceTable,
    ) -> Result<(), VigilError> {
        let events = spec.build_events()?;
        let mode = spec.mode_state()?;

        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            self.stop(previous).await;
        }
        self.reported
            .lock()
            .map_err(|_| VigilError::evaluation("reported triggers lock poisoned"))?
            .clear();

        let snapshots = self.load_snapshots().await;
        let (mode_tx, mode_rx) = watch::channel(mode);
        let shared = TaskShared {
            notifier: Arc::new(Notifier::new(Arc::clone(&self.webhook), spec.transports())),
            mode: mode_rx,
            bus: self.bus.clone(),
            video_padding_secs: spec.event_video_capture_padding_secs,
        };
        let cancel = CancellationToken::new();
        let mut tasks = vec![tokio::spawn(record_triggers(
            Arc::clone(&self.history),
            self.bus.subscribe(),
            cancel.child_token(),
        ))];

        let mut handles = BTreeMap::new();
        let mut incomplete = BTreeMap::new();
        for (event_spec, mut event) in spec.events.iter().zip(events) {
            if let Some(snapshot) = snapshots.get(&event.name) {
                event.restore(snapshot);
            }
            let missing: Vec<String> = event_spec
                .required_resources()
                .into_iter()
                .filter(|name| !table.contains(name))
                .collect();
            if !missing.is_empty() {
                tracing::warn!(event = %event.name, ?missing, "event incomplete, required resources missing");
                event.mark_incomplete();
                incomplete.insert(event.name.clone(), event.status());
                continue;
            }
            let (task, handle) = EventTask::new(event, &table, shared.clone(), cancel.child_token());
            tasks.push(tokio::spawn(task.run()));
            handles.insert(handle.name().to_string(), handle);
        }

        if self.persistence.enabled {
            tasks.push(tokio::spawn(persist_snapshots(
                Arc::clone(&self.store),
                handles.values().cloned().collect(),
                self.persistence.save_interval,
                cancel.child_token(),
            )));
        }

        tracing::info!(
            running = handles.len(),
            incomplete = incomplete.len(),
            "event manager configured"
        );
        *current = Some(Generation {
            mode: mode_tx,
            handles,
            incomplete,
            tasks,
            cancel,
        });
        Ok(())
    }

    async fn load_snapshots(&self) -> HashMap<String, EventSnapshot> {
        if !self.persistence.enabled {
            return HashMap::new();
        }
        match self.store.load_all().await {
            Ok(snapshots) => snapshots,
            Err(err) => {
                tracing::error!(error = %err, "unable to load event state, starting fresh");
                HashMap::new()
            }
        }
    }

    async fn stop(&self, generation: Generation) {
        generation.cancel.cancel();
        for task in generation.tasks {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "event task ended abnormally");
            }
        }
        if self.persistence.enabled {
            let handles: Vec<EventHandle> = generation.handles.into_values().collect();
            save_all(self.store.as_ref(), &handles).await;
        }
    }

    /// Cancel every task and wait for them, saving their final state.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self) {
        if let Some(generation) = self.current.lock().await.take() {
            self.stop(generation).await;
        }
        tracing::info!("event manager stopped");
    }

    /// Current mode and per-event status.
    pub async fn get_state(&self, filter: StateFilter) -> StateReport {
        let now = time::now();
        let current = self.current.lock().await;
        let Some(generation) = current.as_ref() else {
            return StateReport {
                mode: ModeState::default().current(now).to_string(),
                events: BTreeMap::new(),
            };
        };
        let mode = generation.mode.borrow().current(now).to_string();
        let mut events: BTreeMap<String, EventStatus> = generation
            .handles
            .iter()
            .map(|(name, handle)| (name.clone(), handle.view().status))
            .chain(generation.incomplete.clone())
            .collect();
        drop(current);

        if filter == StateFilter::NewTriggersOnly {
            match self.reported.lock() {
                Ok(mut reported) => {
                    events.retain(|name, status| is_new_trigger(&mut reported, name, status));
                }
                Err(_) => events.clear(),
            }
        }
        StateReport { mode, events }
    }

    async fn handle(&self, event: &str) -> Result<EventHandle, VigilError> {
        self.current
            .lock()
            .await
            .as_ref()
            .and_then(|generation| generation.handles.get(event).cloned())
            .ok_or_else(|| NotFoundError::new("event", event).into())
    }

    /// Run a named host command.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::NotFound`] for unknown commands or events,
    /// [`VigilError::InvalidArgument`] for malformed arguments, and the
    /// underlying error when the command itself fails.
    #[tracing::instrument(skip(self, args))]
    pub async fn invoke_command(&self, name: &str, args: &Value) -> Result<Value, VigilError> {
        match name {
            "trigger_event" => {
                self.handle(required_str(args, "event")?).await?.trigger().await?;
                Ok(json!({ "triggered": true }))
            }
            "pause_triggered" => {
                let paused = self.handle(required_str(args, "event")?).await?.pause().await?;
                Ok(json!({ "paused": paused }))
            }
            "respond_triggered" => {
                let handle = self.handle(required_str(args, "event")?).await?;
                let response = required_str(args, "response")?.to_string();
                handle.respond(response).await?;
                Ok(json!({ "responded": true }))
            }
            "get_triggered" => {
                let event = args.get("event").and_then(Value::as_str);
                let limit = match args.get("number") {
                    None | Some(Value::Null) => DEFAULT_TRIGGERED_LIMIT,
                    Some(number) => number
                        .as_u64()
                        .and_then(|n| usize::try_from(n).ok())
                        .ok_or_else(|| {
                            VigilError::InvalidArgument("number must be a non-negative integer".into())
                        })?,
                };
                let records = self.history.recent(event, limit).await?;
                Ok(json!({ "triggered": records }))
            }
            "delete_triggered" => {
                let id: TriggerRecordId = args
                    .get("id")
                    .cloned()
                    .and_then(|id| serde_json::from_value(id).ok())
                    .ok_or_else(|| VigilError::InvalidArgument("id must be a record id".into()))?;
                let total = self.history.delete(id).await?;
                Ok(json!({ "total": total }))
            }
            other => Err(NotFoundError::new("command", other).into()),
        }
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, VigilError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| VigilError::InvalidArgument(format!("missing string argument {key:?}")))
}

/// Keep `status` when it carries a trigger not reported before, and remember it.
fn is_new_trigger(
    reported: &mut HashMap<String, Timestamp>,
    name: &str,
    status: &EventStatus,
) -> bool {
    if !matches!(status.state, EventState::Triggered | EventState::Actioning) {
        return false;
    }
    let Some(last_triggered) = status.last_triggered else {
        return false;
    };
    if reported.get(name) == Some(&last_triggered) {
        return false;
    }
    reported.insert(name.to_string(), last_triggered);
    true
}

async fn save_all<S: StateStore>(store: &S, handles: &[EventHandle]) {
    for handle in handles {
        let snapshot = handle.view().snapshot;
        if let Err(err) = store.save(handle.name(), &snapshot).await {
            tracing::error!(event = handle.name(), error = %err, "unable to save event state");
        }
    }
}

async fn persist_snapshots<S: StateStore>(
    store: Arc<S>,
    handles: Vec<EventHandle>,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => save_all(store.as_ref(), &handles).await,
        }
    }
}

async fn record_triggers<H: TriggerHistory>(
    history: Arc<H>,
    mut records: broadcast::Receiver<vigil_domain::trigger_record::TriggerRecord>,
    cancel: CancellationToken,
) {
    loop {
        let record = tokio::select! {
            () = cancel.cancelled() => break,
            record = records.recv() => record,
        };
        match record {
            Ok(record) => {
                let event = record.event.clone();
                if let Err(err) = history.record(record).await {
                    tracing::error!(event = %event, error = %err, "unable to record trigger");
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "trigger recorder lagging, records dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_table::Resource;
    use crate::testing::{
        FakeResource, FakeWebhook, InMemoryStateStore, InMemoryTriggerHistory, at,
    };
    use vigil_domain::trigger_record::TriggerRecord;

    type Manager = EventManager<InMemoryStateStore, InMemoryTriggerHistory>;

    fn manager(store: Arc<InMemoryStateStore>, persistence: PersistenceSettings) -> Manager {
        EventManager::new(
            store,
            Arc::new(InMemoryTriggerHistory::default()),
            Arc::new(FakeWebhook::default()),
            persistence,
        )
    }

    fn persisted() -> PersistenceSettings {
        PersistenceSettings {
            enabled: true,
            save_interval: Duration::from_secs(5),
        }
    }

    fn spec(value: Value) -> ManagerSpec {
        serde_json::from_value(value).unwrap()
    }

    fn quiet_spec() -> ManagerSpec {
        spec(json!({
            "mode": "home",
            "events": [
                {"name": "porch", "modes": ["away"]},
                {
                    "name": "garage",
                    "modes": ["home"],
                    "rules": [{
                        "type": "call",
                        "resource": "door",
                        "method": "status",
                        "result_operator": "eq",
                        "result_value": "open"
                    }]
                }
            ]
        }))
    }

    fn table() -> ResourceTable {
        ResourceTable::default().with(
            "door",
            Resource::Generic(Arc::new(FakeResource::replying(json!("closed")))),
        )
    }

    #[test]
    fn should_report_dependencies_on_configure() {
        let manager = manager(Arc::default(), PersistenceSettings::default());
        let spec = spec(json!({
            "sms_module": "twilio",
            "events": [{
                "name": "garage",
                "rules": [{
                    "type": "call",
                    "resource": "door",
                    "method": "status",
                    "result_operator": "eq",
                    "result_value": "open"
                }]
            }]
        }));

        let deps = manager.configure(&spec).unwrap();

        assert!(deps.required.contains("door"));
        assert!(deps.optional.contains("twilio"));
    }

    #[test]
    fn should_reject_duplicate_events_on_configure() {
        let manager = manager(Arc::default(), PersistenceSettings::default());
        let spec = spec(json!({"events": [{"name": "porch"}, {"name": "porch"}]}));

        let err = manager.configure(&spec).unwrap_err();

        assert!(matches!(err, VigilError::Configuration(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_state_of_every_event() {
        let manager = manager(Arc::default(), PersistenceSettings::default());
        manager.reconfigure(quiet_spec(), table()).await.unwrap();

        let report = manager.get_state(StateFilter::All).await;

        assert_eq!(report.mode, "home");
        assert_eq!(report.events.len(), 2);
        assert!(report.events.contains_key("porch"));
        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_mark_event_incomplete_when_resource_missing() {
        let manager = manager(Arc::default(), PersistenceSettings::default());
        manager
            .reconfigure(quiet_spec(), ResourceTable::default())
            .await
            .unwrap();

        let report = manager.get_state(StateFilter::All).await;
        assert_eq!(report.events["garage"].state, EventState::Incomplete);
        assert_ne!(report.events["porch"].state, EventState::Incomplete);

        let err = manager
            .invoke_command("trigger_event", &json!({"event": "garage"}))
            .await
            .unwrap_err();
        assert!(matches!(err, VigilError::NotFound(_)));
        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_trigger_and_pause_through_commands() {
        let manager = manager(Arc::default(), PersistenceSettings::default());
        manager.reconfigure(quiet_spec(), table()).await.unwrap();

        let paused = manager
            .invoke_command("pause_triggered", &json!({"event": "porch"}))
            .await
            .unwrap();
        assert_eq!(paused, json!({"paused": false}));

        let triggered = manager
            .invoke_command("trigger_event", &json!({"event": "porch"}))
            .await
            .unwrap();
        assert_eq!(triggered, json!({"triggered": true}));
        let report = manager.get_state(StateFilter::All).await;
        assert!(matches!(
            report.events["porch"].state,
            EventState::Triggered | EventState::Actioning
        ));

        let paused = manager
            .invoke_command("pause_triggered", &json!({"event": "porch"}))
            .await
            .unwrap();
        assert_eq!(paused, json!({"paused": true}));
        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_new_trigger_only_once() {
        let manager = manager(Arc::default(), PersistenceSettings::default());
        manager.reconfigure(quiet_spec(), table()).await.unwrap();
        assert!(manager
            .get_state(StateFilter::NewTriggersOnly)
            .await
            .events
            .is_empty());

        manager
            .invoke_command("trigger_event", &json!({"event": "porch"}))
            .await
            .unwrap();

        let first = manager.get_state(StateFilter::NewTriggersOnly).await;
        assert_eq!(first.events.keys().collect::<Vec<_>>(), vec!["porch"]);
        let second = manager.get_state(StateFilter::NewTriggersOnly).await;
        assert!(second.events.is_empty());
        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_reject_unknown_command_and_bad_arguments() {
        let manager = manager(Arc::default(), PersistenceSettings::default());
        manager.reconfigure(quiet_spec(), table()).await.unwrap();

        let unknown = manager.invoke_command("explode", &json!({})).await.unwrap_err();
        assert!(matches!(unknown, VigilError::NotFound(_)));

        let missing = manager
            .invoke_command("trigger_event", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(missing, VigilError::InvalidArgument(_)));

        let ghost = manager
            .invoke_command("trigger_event", &json!({"event": "attic"}))
            .await
            .unwrap_err();
        assert!(matches!(ghost, VigilError::NotFound(_)));
        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_query_and_delete_trigger_history() {
        let history = Arc::new(InMemoryTriggerHistory::default());
        let manager: Manager = EventManager::new(
            Arc::default(),
            Arc::clone(&history),
            Arc::new(FakeWebhook::default()),
            PersistenceSettings::default(),
        );
        let old = TriggerRecord::new("porch", at(10), "person", "cam1");
        let recent = TriggerRecord::new("porch", at(20), "cat", "cam1");
        let other = TriggerRecord::new("garage", at(30), "", "");
        let old_id = old.id;
        history.records.lock().unwrap().extend([old, recent, other]);

        let listed = manager
            .invoke_command("get_triggered", &json!({"event": "porch", "number": 1}))
            .await
            .unwrap();
        assert_eq!(listed["triggered"].as_array().unwrap().len(), 1);
        assert_eq!(listed["triggered"][0]["label"], "cat");

        let all = manager.invoke_command("get_triggered", &json!({})).await.unwrap();
        assert_eq!(all["triggered"].as_array().unwrap().len(), 3);

        let deleted = manager
            .invoke_command("delete_triggered", &json!({"id": old_id}))
            .await
            .unwrap();
        assert_eq!(deleted, json!({"total": 1}));
        assert_eq!(history.records.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn should_record_triggers_published_by_events() {
        let history = Arc::new(InMemoryTriggerHistory::default());
        let manager: Manager = EventManager::new(
            Arc::default(),
            Arc::clone(&history),
            Arc::new(FakeWebhook::default()),
            PersistenceSettings::default(),
        );
        let spec = spec(json!({
            "mode": "home",
            "events": [{
                "name": "porch",
                "modes": ["home"],
                "pause_alerting_on_event_secs": 3600,
                "rules": [{"type": "time", "ranges": [{"start_hour": 0, "end_hour": 24}]}]
            }]
        }));

        manager.reconfigure(spec, ResourceTable::default()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let records = history.records.lock().unwrap().clone();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event, "porch");
        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_save_on_shutdown_and_restore_on_reconfigure() {
        let store = Arc::new(InMemoryStateStore::default());
        let manager = manager(Arc::clone(&store), persisted());
        manager.reconfigure(quiet_spec(), table()).await.unwrap();
        manager
            .invoke_command("trigger_event", &json!({"event": "porch"}))
            .await
            .unwrap();

        manager.shutdown().await;
        let saved = store.snapshots.lock().unwrap().clone();
        assert!(saved["porch"].is_triggered);

        let restarted = manager_with_store(&store);
        restarted.reconfigure(quiet_spec(), table()).await.unwrap();
        let report = restarted.get_state(StateFilter::All).await;
        assert!(matches!(
            report.events["porch"].state,
            EventState::Triggered | EventState::Actioning
        ));
        assert!(report.events["porch"].last_triggered.is_some());
        restarted.shutdown().await;
    }

    fn manager_with_store(store: &Arc<InMemoryStateStore>) -> Manager {
        manager(Arc::clone(store), persisted())
    }

    #[tokio::test(start_paused = true)]
    async fn should_start_fresh_when_stored_state_unreadable() {
        let store = Arc::new(InMemoryStateStore {
            corrupt: true,
            ..InMemoryStateStore::default()
        });
        let manager = manager(store, persisted());

        manager.reconfigure(quiet_spec(), table()).await.unwrap();

        let report = manager.get_state(StateFilter::All).await;
        assert!(report.events["porch"].last_triggered.is_none());
        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_running_tasks_on_invalid_reconfigure() {
        let manager = manager(Arc::default(), PersistenceSettings::default());
        manager.reconfigure(quiet_spec(), table()).await.unwrap();

        let bad = spec(json!({"events": [{"name": ""}]}));
        assert!(manager.reconfigure(bad, table()).await.is_err());

        let report = manager.get_state(StateFilter::All).await;
        assert_eq!(report.events.len(), 2);
        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_replace_events_on_reconfigure() {
        let manager = manager(Arc::default(), PersistenceSettings::default());
        manager.reconfigure(quiet_spec(), table()).await.unwrap();

        let next = spec(json!({"mode": "away", "events": [{"name": "attic", "modes": ["away"]}]}));
        manager.reconfigure(next, table()).await.unwrap();

        let report = manager.get_state(StateFilter::All).await;
        assert_eq!(report.mode, "away");
        assert_eq!(report.events.keys().collect::<Vec<_>>(), vec!["attic"]);
        manager.shutdown().await;
    }
}
