//! Message catalog
//!
//! Findings store message keys with arguments; rendering them needs a
//! [`Translator`]. [`Catalog`] is the built-in one, backed by an English
//! JSON catalog embedded at compile time.

use super::report::{Finding, Message, Meta};
use hostward_core::{Error, Result, Translator};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::LazyLock;

const EMBEDDED_EN: &str = include_str!("../../locales/en.json");

static PLACEHOLDER: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\{(\w+)\}").expect("Failed to compile placeholder pattern")
});

static HTML_TAG: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"<[^>]+>").expect("Failed to compile tag pattern"));

/// Key-to-template message catalog with `{name}` placeholders
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    messages: IndexMap<String, String>,
}

impl Catalog {
    /// Parse a catalog from a flat JSON object
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the document is not an object of strings
    pub fn from_json(content: &str) -> Result<Self> {
        let messages: IndexMap<String, String> = serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid message catalog: {e}")))?;
        Ok(Self { messages })
    }

    /// The English catalog shipped with the engine
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the embedded catalog is malformed
    pub fn english() -> Result<Self> {
        Self::from_json(EMBEDDED_EN)
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

fn render_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(render_arg).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Substitute `{name}` placeholders; unknown placeholders are left as-is
#[must_use]
pub fn format_template(template: &str, args: &IndexMap<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| match args.get(&caps[1]) {
            Some(value) => render_arg(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

impl Translator for Catalog {
    fn translate(&self, key: &str, args: &IndexMap<String, Value>) -> String {
        match self.messages.get(key) {
            Some(template) => format_template(template, args),
            None => key.to_string(),
        }
    }

    fn has_key(&self, key: &str) -> bool {
        self.messages.contains_key(key)
    }
}

/// Turn markup into plain text
///
/// `<cmd>` becomes a quote, `<br>` a newline, other tags disappear.
#[must_use]
pub fn strip_html(text: &str) -> String {
    let text = text
        .replace("<cmd>", "'")
        .replace("</cmd>", "'")
        .replace("<br>", "\n");
    HTML_TAG.replace_all(&text, "").into_owned()
}

/// Human description of a category
pub fn category_description(translator: &dyn Translator, id: &str) -> String {
    let key = format!("diagnosis_description_{id}");
    if translator.has_key(&key) {
        translator.translate(&key, &IndexMap::new())
    } else {
        id.to_string()
    }
}

/// Render one message of a finding
///
/// The message's own arguments are completed, and overridden, by the
/// finding's `meta` then `data`.
pub fn render_message(translator: &dyn Translator, message: &Message, finding: &Finding) -> String {
    let mut args: Meta = message.args().cloned().unwrap_or_default();
    for (key, value) in finding.meta.iter().chain(finding.data.iter()) {
        args.insert(key.clone(), value.clone());
    }
    translator.translate(message.key(), &args)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::diagnosis::report::Status;
    use serde_json::json;

    fn args(value: Value) -> IndexMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_embedded_catalog_loads() {
        let catalog = Catalog::english().unwrap();
        assert!(!catalog.is_empty());
        assert!(catalog.has_key("diagnosis_ports_ok"));
        assert!(catalog.has_key("diagnosis_description_dnsrecords"));
    }

    #[test]
    fn test_format_template() {
        let rendered = format_template(
            "Port {port} needed by {service} on {missing}",
            &args(json!({"port": 25, "service": "postfix"})),
        );
        assert_eq!(rendered, "Port 25 needed by postfix on {missing}");

        let list = format_template("{current}", &args(json!({"current": ["a", "b"]})));
        assert_eq!(list, "a, b");
    }

    #[test]
    fn test_unknown_key_renders_as_key() {
        let catalog = Catalog::english().unwrap();
        assert_eq!(catalog.translate("no_such_key", &IndexMap::new()), "no_such_key");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("Run <cmd>hostward diagnosis run</cmd><br>Value: <code>1.2.3.4</code>"),
            "Run 'hostward diagnosis run'\nValue: 1.2.3.4"
        );
    }

    #[test]
    fn test_category_description_falls_back_to_id() {
        let catalog = Catalog::english().unwrap();
        assert_eq!(category_description(&catalog, "ports"), "Ports exposure");
        assert_eq!(category_description(&catalog, "custom"), "custom");
    }

    #[test]
    fn test_data_overrides_message_args() {
        let catalog = Catalog::from_json(r#"{"m": "{domain} {status}"}"#).unwrap();
        let finding = Finding::new(Status::Error, "m")
            .with_meta("domain", "example.org")
            .with_data("status", "down");
        let message = Message::with_args("m", [("status", "up"), ("domain", "x")]);

        assert_eq!(render_message(&catalog, &message, &finding), "example.org down");
    }
}
