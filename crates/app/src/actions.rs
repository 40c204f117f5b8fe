//! Action executor.

use vigil_domain::action::Action;
use vigil_domain::error::VigilError;
use vigil_domain::template::TemplateContext;
use vigil_domain::time::Timestamp;

use crate::resource_table::ResourceCache;

/// Run `action` against its target resource and mark it taken.
///
/// # Errors
///
/// Returns [`VigilError`] when the resource is missing, the rendered payload
/// is not JSON, or the call fails. The action is left untaken in that case.
pub async fn execute(
    action: &mut Action,
    context: &TemplateContext,
    cache: &mut ResourceCache,
    now: Timestamp,
) -> Result<(), VigilError> {
    let target = cache.generic(&action.resource)?;
    let payload = context
        .render_json(&action.payload)
        .map_err(VigilError::evaluation)?;
    tracing::info!(
        event = %context.event_name,
        resource = %action.resource,
        method = %action.method,
        "executing action"
    );
    target.invoke(&action.method, payload).await?;
    action.mark_taken(now);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::resource_table::{Resource, ResourceTable};
    use crate::testing::{FakeResource, at};

    fn action() -> Action {
        serde_json::from_value(json!({
            "resource": "siren",
            "method": "do_command",
            "payload": "{'sound': '<<triggered_label>> at <<triggered_camera>>'}",
            "when_secs": 0
        }))
        .unwrap()
    }

    fn context() -> TemplateContext {
        TemplateContext {
            event_name: "porch".to_string(),
            triggered_label: "person".to_string(),
            triggered_camera: "cam1".to_string(),
        }
    }

    #[tokio::test]
    async fn should_invoke_rendered_payload_and_mark_taken() {
        let siren = Arc::new(FakeResource::replying(json!({})));
        let mut cache = ResourceTable::default()
            .with("siren", Resource::Generic(siren.clone()))
            .cache();
        let mut action = action();

        execute(&mut action, &context(), &mut cache, at(42))
            .await
            .unwrap();

        assert!(action.taken);
        assert_eq!(action.last_taken, Some(at(42)));
        assert_eq!(
            siren.calls(),
            vec![(
                "do_command".to_string(),
                json!({"sound": "person at cam1"})
            )]
        );
    }

    #[tokio::test]
    async fn should_leave_action_untaken_when_call_fails() {
        let mut cache = ResourceTable::default()
            .with("siren", Resource::Generic(Arc::new(FakeResource::failing())))
            .cache();
        let mut action = action();

        let result = execute(&mut action, &context(), &mut cache, at(42)).await;

        assert!(result.is_err());
        assert!(!action.taken);
        assert!(action.last_taken.is_none());
    }

    #[tokio::test]
    async fn should_fail_when_resource_missing() {
        let mut cache = ResourceTable::default().cache();
        let mut action = action();

        let err = execute(&mut action, &context(), &mut cache, at(42))
            .await
            .unwrap_err();

        assert!(matches!(err, VigilError::ResourceUnavailable(_)));
        assert!(!action.taken);
    }
}
