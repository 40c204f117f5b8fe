//! Rule evaluator: runs one [`Rule`] against live resources.
//!
//! Evaluation never fails from the caller's point of view: resource errors
//! are logged and the rule degrades to "not triggered".

use chrono::{Local, Timelike};
use serde_json::{Map, Value, json};

use vigil_domain::error::VigilError;
use vigil_domain::logic::{LogicType, logical_trigger};
use vigil_domain::media::Image;
use vigil_domain::pattern::{Pattern, matches_or_any};
use vigil_domain::rule::{
    CallRule, ClassifierRule, DetectorRule, HourRange, Rule, RuleOutcome, TrackerRule,
};
use vigil_domain::template::TemplateContext;
use vigil_domain::time::Timestamp;

use crate::resource_table::ResourceCache;

/// Number of classifications requested per image.
const CLASSIFICATION_COUNT: usize = 3;

/// Evaluate `rule` for the event described by `context`.
pub async fn evaluate(
    rule: &Rule,
    context: &TemplateContext,
    cache: &mut ResourceCache,
    now: Timestamp,
) -> RuleOutcome {
    let result = match rule {
        Rule::Time { ranges, .. } => Ok(evaluate_time(ranges, now.with_timezone(&Local).hour())),
        Rule::Detector(rule) => evaluate_detector(rule, cache).await,
        Rule::Classifier(rule) => evaluate_classifier(rule, cache).await,
        Rule::Tracker(rule) => evaluate_tracker(rule, cache).await,
        Rule::Call(rule) => evaluate_call(rule, context, cache).await,
    };
    match result {
        Ok(outcome) => {
            tracing::debug!(
                event = %context.event_name,
                rule = rule.kind(),
                triggered = outcome.triggered,
                "rule evaluated"
            );
            outcome
        }
        Err(err) => {
            tracing::error!(
                event = %context.event_name,
                rule = rule.kind(),
                error = %err,
                "rule evaluation failed"
            );
            RuleOutcome::not_triggered()
        }
    }
}

/// Triggered when `hour` falls in any half-open range.
#[must_use]
pub fn evaluate_time(ranges: &[HourRange], hour: u32) -> RuleOutcome {
    if ranges.iter().any(|range| range.contains(hour)) {
        RuleOutcome::triggered()
    } else {
        RuleOutcome::not_triggered()
    }
}

fn accepts(class_name: &str, confidence: f64, threshold: f64, pattern: Option<&Pattern>) -> bool {
    confidence >= threshold && matches_or_any(pattern, class_name)
}

fn camera_match(label: String, camera: &str, image: Option<Image>) -> RuleOutcome {
    RuleOutcome {
        triggered: true,
        value: Some(Value::String(label)),
        resource: Some(camera.to_string()),
        image,
        known_person_seen: false,
    }
}

async fn evaluate_detector(
    rule: &DetectorRule,
    cache: &mut ResourceCache,
) -> Result<RuleOutcome, VigilError> {
    let detector = cache.vision(&rule.detector)?;
    let mut outcome = RuleOutcome::not_triggered();
    for camera_name in &rule.cameras {
        let image = cache.camera(camera_name)?.get_image().await?;
        let detections = detector.detect(&image).await?;
        let hit = detections.into_iter().find(|d| {
            accepts(
                &d.class_name,
                d.confidence,
                rule.confidence_pct,
                rule.class_regex.as_ref(),
            )
        });
        if let Some(hit) = hit {
            outcome = camera_match(hit.class_name, camera_name, Some(image));
        }
    }
    Ok(outcome)
}

async fn evaluate_classifier(
    rule: &ClassifierRule,
    cache: &mut ResourceCache,
) -> Result<RuleOutcome, VigilError> {
    let classifier = cache.vision(&rule.classifier)?;
    let mut outcome = RuleOutcome::not_triggered();
    for camera_name in &rule.cameras {
        let image = cache.camera(camera_name)?.get_image().await?;
        let classifications = classifier.classify(&image, CLASSIFICATION_COUNT).await?;
        let hit = classifications.into_iter().find(|c| {
            accepts(
                &c.class_name,
                c.confidence,
                rule.confidence_pct,
                rule.class_regex.as_ref(),
            )
        });
        if let Some(hit) = hit {
            outcome = camera_match(hit.class_name, camera_name, Some(image));
        }
    }
    Ok(outcome)
}

/// Drop the ` (label: ...)` suffix a tracker appends to trained identities.
#[must_use]
pub fn strip_training_label(class_name: &str) -> &str {
    class_name
        .split_once(" (label:")
        .map_or(class_name, |(identity, _)| identity)
}

fn is_authorized(flags: &Value) -> bool {
    flags
        .as_object()
        .is_some_and(|flags| flags.values().any(|flag| flag.as_bool().unwrap_or(false)))
}

async fn evaluate_tracker(
    rule: &TrackerRule,
    cache: &mut ResourceCache,
) -> Result<RuleOutcome, VigilError> {
    let tracker = cache.vision(&rule.tracker)?;
    let listing = tracker
        .invoke("list_current", json!({ "list_current": true }))
        .await?;
    let known: Map<String, Value> = listing
        .get("list_current")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut outcome = RuleOutcome::not_triggered();
    let mut authorizations = Vec::new();
    for camera_name in &rule.cameras {
        let frame = tracker.detect_and_image(camera_name).await?;
        for detection in &frame.detections {
            let identity = strip_training_label(&detection.class_name);
            let Some(flags) = known.get(identity) else {
                continue;
            };
            let authorized = is_authorized(flags);
            authorizations.push(authorized);
            if authorized {
                outcome.known_person_seen = true;
            } else {
                tracing::info!(identity, camera = %camera_name, "unknown person seen");
                outcome.value = Some(Value::String(identity.to_string()));
                outcome.resource = Some(camera_name.clone());
                outcome.image.clone_from(&frame.image);
            }
        }
    }
    // NOR: any authorized identity keeps the rule quiet.
    outcome.triggered =
        !authorizations.is_empty() && logical_trigger(LogicType::Nor, &authorizations);
    Ok(outcome)
}

async fn evaluate_call(
    rule: &CallRule,
    context: &TemplateContext,
    cache: &mut ResourceCache,
) -> Result<RuleOutcome, VigilError> {
    let resource = cache.generic(&rule.resource)?;
    let payload = context
        .render_json(&rule.payload)
        .map_err(VigilError::evaluation)?;
    let result = resource.invoke(&rule.method, payload).await?;
    let Some((triggered, value)) = rule.judge(&result) else {
        return Err(VigilError::evaluation(format!(
            "result path {:?} not found in {}",
            rule.result_path.as_deref().unwrap_or_default(),
            rule.method
        )));
    };
    Ok(RuleOutcome {
        triggered,
        value: Some(value),
        resource: Some(rule.resource.clone()),
        image: None,
        known_person_seen: false,
    })
}
