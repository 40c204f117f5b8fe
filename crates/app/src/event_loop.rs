//! Event task: the state machine loop driving one [`Event`].
//!
//! Each task owns its event exclusively. The supervisor talks to it through
//! an [`EventHandle`]: commands go in over an `mpsc` channel, and every
//! state change comes back out as an [`EventView`] on a `watch` channel.
//!
//! One iteration of the loop:
//! 1. stop if cancelled;
//! 2. idle while a rule-requested pause runs;
//! 3. when the mode matches and the debounce elapsed, run a monitoring pass
//!    and pace to `detection_hz`;
//! 4. otherwise, while triggered and not paused, run an actioning pass;
//! 5. otherwise idle.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeDelta};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use vigil_domain::error::{NotFoundError, VigilError};
use vigil_domain::event::{Event, EventSnapshot, EventState, EventStatus, NewTrigger};
use vigil_domain::mode::ModeState;
use vigil_domain::rule::{Rule, RuleOutcome};
use vigil_domain::time::{self, Timestamp};
use vigil_domain::trigger_record::TriggerRecord;

use crate::actions;
use crate::event_bus::InProcessTriggerBus;
use crate::notifier::Notifier;
use crate::ports::VideoSaveRequest;
use crate::resource_table::{ResourceCache, ResourceTable};
use crate::rules;

const IDLE: Duration = Duration::from_millis(500);
const ACTIONING: Duration = Duration::from_secs(1);
const ERROR_BACKOFF: Duration = Duration::from_secs(1);
const COMMAND_BUFFER: usize = 8;
const VIDEO_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Request sent to a running event task.
#[derive(Debug)]
pub enum EventCommand {
    /// Force the event into `triggered`.
    Trigger { reply: oneshot::Sender<()> },
    /// Stop actions of the current trigger. Replies `false` when not triggered.
    Pause { reply: oneshot::Sender<bool> },
    /// Evaluate actions against an inbound response.
    Respond {
        response: String,
        reply: oneshot::Sender<Result<(), VigilError>>,
    },
}

/// Latest observable state of an event.
#[derive(Debug, Clone)]
pub struct EventView {
    pub status: EventStatus,
    pub snapshot: EventSnapshot,
}

impl EventView {
    #[must_use]
    pub fn of(event: &Event) -> Self {
        Self {
            status: event.status(),
            snapshot: event.snapshot(),
        }
    }
}

/// Everything event tasks share.
#[derive(Clone)]
pub struct TaskShared {
    pub notifier: Arc<Notifier>,
    pub mode: watch::Receiver<ModeState>,
    pub bus: InProcessTriggerBus,
    pub video_padding_secs: u64,
}

/// Supervisor side of an event task.
#[derive(Debug, Clone)]
pub struct EventHandle {
    name: String,
    commands: mpsc::Sender<EventCommand>,
    view: watch::Receiver<EventView>,
}

impl EventHandle {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn view(&self) -> EventView {
        self.view.borrow().clone()
    }

    fn stopped(&self) -> VigilError {
        NotFoundError::new("event task", self.name.clone()).into()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> EventCommand,
    ) -> Result<T, VigilError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| self.stopped())?;
        response.await.map_err(|_| self.stopped())
    }

    /// # Errors
    ///
    /// Returns [`VigilError::NotFound`] when the task has stopped.
    pub async fn trigger(&self) -> Result<(), VigilError> {
        self.request(|reply| EventCommand::Trigger { reply }).await
    }

    /// # Errors
    ///
    /// Returns [`VigilError::NotFound`] when the task has stopped.
    pub async fn pause(&self) -> Result<bool, VigilError> {
        self.request(|reply| EventCommand::Pause { reply }).await
    }

    /// # Errors
    ///
    /// Returns [`VigilError::NotFound`] when the task has stopped, or the
    /// error of a failing action.
    pub async fn respond(&self, response: String) -> Result<(), VigilError> {
        self.request(|reply| EventCommand::Respond { response, reply })
            .await?
    }
}

/// Task side: owns the event and its private resource cache.
pub struct EventTask {
    event: Event,
    cache: ResourceCache,
    shared: TaskShared,
    commands: mpsc::Receiver<EventCommand>,
    view: watch::Sender<EventView>,
    cancel: CancellationToken,
}

impl EventTask {
    /// Build a task and the handle to drive it.
    #[must_use]
    pub fn new(
        event: Event,
        table: &ResourceTable,
        shared: TaskShared,
        cancel: CancellationToken,
    ) -> (Self, EventHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (view_tx, view_rx) = watch::channel(EventView::of(&event));
        let handle = EventHandle {
            name: event.name.clone(),
            commands: command_tx,
            view: view_rx,
        };
        let task = Self {
            event,
            cache: table.cache(),
            shared,
            commands: command_rx,
            view: view_tx,
            cancel,
        };
        (task, handle)
    }

    /// Run until cancelled.
    pub async fn run(mut self) {
        tracing::info!(event = %self.event.name, "event loop started");
        while !self.cancel.is_cancelled() {
            let started = Instant::now();
            let wait = match self.step(time::now()).await {
                Ok(wait) => wait,
                Err(err) => {
                    tracing::error!(event = %self.event.name, error = %err, "event iteration failed");
                    ERROR_BACKOFF
                }
            };
            self.publish();
            if !self.wait_until(started + wait).await {
                break;
            }
        }
        self.publish();
        tracing::info!(event = %self.event.name, "event loop stopped");
    }

    /// Sleep until `deadline` while serving commands. Returns `false` once cancelled.
    async fn wait_until(&mut self, deadline: Instant) -> bool {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return false,
                Some(command) = self.commands.recv() => {
                    self.handle(command, time::now()).await;
                }
                () = tokio::time::sleep_until(deadline) => return true,
            }
        }
    }

    /// Serve one command. The view is published before the caller is answered.
    async fn handle(&mut self, command: EventCommand, now: Timestamp) {
        match command {
            EventCommand::Trigger { reply } => {
                tracing::info!(event = %self.event.name, "event triggered manually");
                self.event.force_trigger(now);
                self.publish();
                let _ = reply.send(());
            }
            EventCommand::Pause { reply } => {
                let paused = self.event.pause_actions("manual");
                self.publish();
                let _ = reply.send(paused);
            }
            EventCommand::Respond { response, reply } => {
                let result = if self.event.is_triggered {
                    self.run_actions(&response, now).await
                } else {
                    tracing::debug!(event = %self.event.name, "response ignored, event not triggered");
                    Ok(())
                };
                self.publish();
                let _ = reply.send(result);
            }
        }
    }

    fn publish(&self) {
        self.view.send_replace(EventView::of(&self.event));
    }

    /// One iteration without sleeping. Returns how long to wait before the next.
    async fn step(&mut self, now: Timestamp) -> Result<Duration, VigilError> {
        if self.event.in_pause_window(now) {
            return Ok(IDLE);
        }
        let mode = self.shared.mode.borrow().current(now).to_string();
        if self.event.should_monitor(&mode, now) {
            let started = Instant::now();
            self.monitor(now).await;
            return Ok(self.pacing().saturating_sub(started.elapsed()));
        }
        if self.event.should_action() {
            self.action(now).await?;
            return Ok(ACTIONING);
        }
        Ok(IDLE)
    }

    fn pacing(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.event.detection_hz).unwrap_or(Duration::ZERO)
    }

    async fn monitor(&mut self, now: Timestamp) {
        self.event.begin_monitoring();
        let rules = std::mem::take(&mut self.event.rules);
        let outcomes = self.evaluate_rules(&rules, now).await;
        let trigger = outcomes.and_then(|outcomes| self.event.conclude_pass(&rules, outcomes, now));
        self.event.rules = rules;
        if let Some(trigger) = trigger {
            self.on_trigger(trigger, now).await;
        }
    }

    /// Outcomes in configuration order, or `None` when a rule paused the event.
    async fn evaluate_rules(
        &mut self,
        rule_set: &[Rule],
        now: Timestamp,
    ) -> Option<Vec<RuleOutcome>> {
        let context = self.event.template_context();
        let mut outcomes = Vec::with_capacity(rule_set.len());
        for rule in rule_set {
            let mut outcome = rules::evaluate(rule, &context, &mut self.cache, now).await;
            outcome.triggered = self.event.apply_sequence(outcome.triggered);
            if self.event.short_circuit(rule, &outcome, now) {
                tracing::info!(
                    event = %self.event.name,
                    reason = %self.event.pause_reason,
                    "event paused"
                );
                return None;
            }
            outcomes.push(outcome);
        }
        Some(outcomes)
    }

    async fn on_trigger(&mut self, trigger: NewTrigger, now: Timestamp) {
        tracing::info!(
            event = %self.event.name,
            label = %self.event.triggered_label,
            camera = %self.event.triggered_camera,
            "event triggered"
        );
        self.shared.bus.publish(TriggerRecord::new(
            self.event.name.clone(),
            now,
            self.event.triggered_label.clone(),
            self.event.triggered_camera.clone(),
        ));
        if self.event.capture_video && trigger.from_camera {
            self.capture_video(now);
        }
        let context = self.event.template_context();
        for notification in &self.event.notifications {
            self.shared
                .notifier
                .notify(notification, &context, trigger.image.as_ref(), &mut self.cache)
                .await;
        }
    }

    /// Save the video window around the trigger in a detached task.
    fn capture_video(&mut self, last_triggered: Timestamp) {
        let Some(resource) = self.event.video_capture_resource.clone() else {
            return;
        };
        let store = match self.cache.video_store(&resource) {
            Ok(store) => store,
            Err(err) => {
                tracing::error!(event = %self.event.name, error = %err, "unable to capture video");
                return;
            }
        };
        let event = self.event.name.clone();
        let padding = self.shared.video_padding_secs;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(padding)).await;
            let end = time::now() - TimeDelta::seconds(1);
            let request = video_request(&event, &resource, last_triggered, end, padding);
            match store.save(request).await {
                Ok(_) => tracing::info!(event = %event, "video capture requested"),
                Err(err) => tracing::error!(event = %event, error = %err, "video capture failed"),
            }
        });
    }

    async fn action(&mut self, now: Timestamp) -> Result<(), VigilError> {
        self.event.state = EventState::Actioning;
        if self.event.actions.is_empty() {
            return Ok(());
        }
        let since = self.event.last_triggered.unwrap_or(now);
        let response = self
            .shared
            .notifier
            .check_response(&self.event.notifications, since, &mut self.cache)
            .await;
        self.run_actions(&response, now).await
    }

    /// Fire every due action. A failing action stays untaken and does not stop
    /// the others; the first failure is returned once all have run.
    async fn run_actions(&mut self, response: &str, now: Timestamp) -> Result<(), VigilError> {
        if !response.is_empty() {
            self.event.actions_paused = true;
            self.event.state = EventState::Paused;
            self.event.pause_reason = "response received".to_string();
        }
        let context = self.event.template_context();
        let last_triggered = self.event.last_triggered;
        let mut first_failure = None;
        for action in &mut self.event.actions {
            if !action.should_fire(last_triggered, response, now) {
                continue;
            }
            if let Err(err) = actions::execute(action, &context, &mut self.cache, now).await {
                tracing::error!(
                    event = %context.event_name,
                    resource = %action.resource,
                    method = %action.method,
                    error = %err,
                    "action failed"
                );
                first_failure.get_or_insert(err);
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}

/// Window `[end - 2·padding, end]` to keep, labelled after the trigger.
#[must_use]
pub fn video_request(
    event: &str,
    resource: &str,
    last_triggered: Timestamp,
    end: Timestamp,
    padding_secs: u64,
) -> VideoSaveRequest {
    let span = i64::try_from(padding_secs.saturating_mul(2)).unwrap_or(i64::MAX);
    let start = TimeDelta::try_seconds(span)
        .and_then(|span| end.checked_sub_signed(span))
        .unwrap_or(end);
    let format = |at: Timestamp| at.with_timezone(&Local).format(VIDEO_TIME_FORMAT).to_string();
    VideoSaveRequest {
        from: format(start),
        to: format(end),
        metadata: format!(
            "SAVCAM--{event}--{resource}--{}",
            last_triggered.timestamp()
        )
        .replace(' ', "_"),
    }
}
