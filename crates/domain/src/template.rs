//! Placeholder substitution for action payloads and call-rule payloads.
//!
//! Templates reference the current event with `<<event_name>>`,
//! `<<triggered_label>>` and `<<triggered_camera>>`.

use serde_json::{Map, Value};

/// Event context substituted into templates and handed to notification transports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    pub event_name: String,
    pub triggered_label: String,
    pub triggered_camera: String,
}

impl TemplateContext {
    /// Replace every known placeholder in `template`.
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        template
            .replace("<<triggered_label>>", &self.triggered_label)
            .replace("<<triggered_camera>>", &self.triggered_camera)
            .replace("<<event_name>>", &self.event_name)
    }

    /// Render `template` and parse the result as JSON.
    ///
    /// Single quotes are accepted in place of double quotes.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the rendered text is not valid JSON.
    pub fn render_json(&self, template: &str) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.render(template).replace('\'', "\""))
    }

    /// Template variables every notification carries.
    #[must_use]
    pub fn variables(&self) -> Map<String, Value> {
        let mut vars = Map::new();
        vars.insert("event_name".into(), Value::String(self.event_name.clone()));
        vars.insert(
            "triggered_label".into(),
            Value::String(self.triggered_label.clone()),
        );
        vars.insert(
            "triggered_camera".into(),
            Value::String(self.triggered_camera.clone()),
        );
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> TemplateContext {
        TemplateContext {
            event_name: "Front door".to_string(),
            triggered_label: "person".to_string(),
            triggered_camera: "cam1".to_string(),
        }
    }

    #[test]
    fn should_substitute_all_placeholders() {
        let rendered = context().render("<<event_name>>: <<triggered_label>> on <<triggered_camera>>");
        assert_eq!(rendered, "Front door: person on cam1");
    }

    #[test]
    fn should_parse_single_quoted_payloads() {
        let value = context()
            .render_json("{'label': '<<triggered_label>>', 'on': true}")
            .unwrap();
        assert_eq!(value, serde_json::json!({"label": "person", "on": true}));
    }

    #[test]
    fn should_fail_on_malformed_payload() {
        assert!(context().render_json("{not json").is_err());
    }

    #[test]
    fn should_expose_event_variables() {
        let vars = context().variables();
        assert_eq!(vars["event_name"], "Front door");
        assert_eq!(vars["triggered_label"], "person");
        assert_eq!(vars["triggered_camera"], "cam1");
    }
}
