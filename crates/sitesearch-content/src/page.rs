//! Raw CMS page records.
//!
//! A page is a site map node plus named content zones, each an ordered list
//! of modules. Zone order is kept as delivered by the CMS.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A content item: structured fields keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    #[serde(default, rename = "contentID")]
    pub content_id: Option<i64>,

    #[serde(default)]
    pub fields: Value,
}

impl ContentItem {
    pub fn new(fields: Value) -> Self {
        Self {
            content_id: None,
            fields,
        }
    }

    /// String value of a field, if present.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// One module placed in a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Module definition name, e.g. "RichTextArea"
    pub module: String,

    #[serde(default)]
    pub item: Option<ContentItem>,
}

impl ModuleRecord {
    pub fn new(module: impl Into<String>, fields: Value) -> Self {
        Self {
            module: module.into(),
            item: Some(ContentItem::new(fields)),
        }
    }
}

/// A named content zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub modules: Vec<ModuleRecord>,
}

/// A fetched page ready for text extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    /// Canonical site map path; becomes the document id and url
    pub path: String,

    pub title: String,

    pub zones: Vec<Zone>,

    /// Dynamic content item bound to the page (detail pages only)
    #[serde(default)]
    pub content_item: Option<ContentItem>,
}

impl RawPage {
    pub fn new(path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            zones: Vec::new(),
            content_item: None,
        }
    }

    /// Append a module to the named zone, creating the zone if needed.
    pub fn with_module(mut self, zone: &str, module: ModuleRecord) -> Self {
        match self.zones.iter_mut().find(|z| z.name == zone) {
            Some(existing) => existing.modules.push(module),
            None => self.zones.push(Zone {
                name: zone.to_string(),
                modules: vec![module],
            }),
        }
        self
    }

    /// Page with a single rich text module in the main zone.
    pub fn rich_text(path: impl Into<String>, title: impl Into<String>, html: &str) -> Self {
        Self::new(path, title).with_module(
            "MainContentZone",
            ModuleRecord::new("RichTextArea", serde_json::json!({ "textblob": html })),
        )
    }

    pub fn with_content_item(mut self, fields: Value) -> Self {
        self.content_item = Some(ContentItem::new(fields));
        self
    }
}

/// JSON object decoded as key/value pairs in document order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, V>()? {
                    entries.push(entry);
                }
                Ok(OrderedMap(entries))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(OrderedMap::default())
            }
        }

        deserializer.deserialize_any(OrderedVisitor(PhantomData))
    }
}

/// Zones as delivered by the CMS: `zone name -> [module]`, possibly null.
pub(crate) fn zones_from_map(map: OrderedMap<Option<Vec<ModuleRecord>>>) -> Vec<Zone> {
    map.0
        .into_iter()
        .map(|(name, modules)| Zone {
            name,
            modules: modules.unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Wrapper {
        zones: OrderedMap<Option<Vec<ModuleRecord>>>,
    }

    #[test]
    fn test_zones_keep_document_order() {
        let raw = r#"{"zones": {
            "Main": [{"module": "RichTextArea", "item": {"contentID": 7, "fields": {"textblob": "<p>a</p>"}}}],
            "Aside": [{"module": "Heading", "item": {"fields": {"title": "x"}}}],
            "Empty": null
        }}"#;
        let parsed: Wrapper = serde_json::from_str(raw).unwrap();
        let zones = zones_from_map(parsed.zones);
        let names: Vec<&str> = zones.iter().map(|z| z.name.as_str()).collect();
        assert_eq!(names, vec!["Main", "Aside", "Empty"]);
        assert_eq!(zones[0].modules[0].module, "RichTextArea");
        assert_eq!(zones[0].modules[0].item.as_ref().unwrap().content_id, Some(7));
        assert!(zones[2].modules.is_empty());
    }

    #[test]
    fn test_with_module_groups_by_zone() {
        let page = RawPage::new("/", "Home")
            .with_module("Main", ModuleRecord::new("RichTextArea", json!({})))
            .with_module("Main", ModuleRecord::new("TextBlockWithImage", json!({})))
            .with_module("Footer", ModuleRecord::new("RichTextArea", json!({})));
        assert_eq!(page.zones.len(), 2);
        assert_eq!(page.zones[0].modules.len(), 2);
    }

    #[test]
    fn test_field_str() {
        let item = ContentItem::new(json!({"content": "<b>x</b>", "count": 3}));
        assert_eq!(item.field_str("content"), Some("<b>x</b>"));
        assert_eq!(item.field_str("count"), None);
        assert_eq!(item.field_str("missing"), None);
    }
}
