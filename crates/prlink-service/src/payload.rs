//! Notion request bodies and page decoding.

use chrono::{DateTime, Utc};
use prlink_core::record::{CreatePrRecord, PrRecord, TaskRecord, UpdatePrRecord};
use prlink_core::schema::{PrSchema, TaskSchema};
use prlink_core::PrState;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::ServiceError;

/// A page object as returned by query, create and update calls.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Page {
    /// The page URL, or the canonical notion.so URL built from the id.
    pub fn page_url(&self) -> String {
        match &self.url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!("https://www.notion.so/{}", self.id.replace('-', "")),
        }
    }

    fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
}

pub fn number_filter(property: &str, number: u64) -> Value {
    json!({ "filter": { "property": property, "number": { "equals": number } } })
}

pub fn unique_id_filter(property: &str, number: u64) -> Value {
    json!({ "filter": { "property": property, "unique_id": { "equals": number } } })
}

pub fn text_contains_filter(property: &str, text: &str) -> Value {
    json!({ "filter": { "property": property, "rich_text": { "contains": text } } })
}

fn rich_text(content: &str) -> Value {
    json!([{ "type": "text", "text": { "content": content } }])
}

fn relation(page_id: &str) -> Value {
    json!({ "relation": [{ "id": page_id }] })
}

/// Properties for a new PR record.
pub fn create_pr_properties(schema: &PrSchema, input: &CreatePrRecord) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert(
        schema.title.clone(),
        json!({ "title": rich_text(&input.record_title()) }),
    );
    props.insert(schema.number.clone(), json!({ "number": input.number }));
    props.insert(schema.url.clone(), json!({ "url": input.url }));
    props.insert(
        schema.state.clone(),
        json!({ "select": { "name": input.state.display_name() } }),
    );
    if let Some(ref task) = input.task_page_id {
        props.insert(schema.task_relation.clone(), relation(task));
    }
    if let Some(ref author) = input.author {
        props.insert(schema.author.clone(), json!({ "rich_text": rich_text(author) }));
    }
    if let Some(created_at) = input.created_at {
        props.insert(
            schema.created_at.clone(),
            json!({ "date": { "start": created_at.to_rfc3339() } }),
        );
    }
    props
}

pub fn create_page_body(database_id: &str, properties: Map<String, Value>) -> Value {
    json!({
        "parent": { "database_id": database_id },
        "properties": properties,
    })
}

/// Properties for a partial update; only fields present in `update` are sent.
pub fn update_pr_properties(schema: &PrSchema, update: &UpdatePrRecord) -> Map<String, Value> {
    let mut props = Map::new();
    if let Some(ref title) = update.title {
        props.insert(schema.title.clone(), json!({ "title": rich_text(title) }));
    }
    if let Some(state) = update.state {
        props.insert(
            schema.state.clone(),
            json!({ "select": { "name": state.display_name() } }),
        );
    }
    if let Some(ref task) = update.task_page_id {
        props.insert(schema.task_relation.clone(), relation(task));
    }
    props
}

fn text_items(items: &Value) -> Option<String> {
    let items = items.as_array()?;
    let text: String = items
        .iter()
        .filter_map(|item| {
            item["plain_text"]
                .as_str()
                .or_else(|| item["text"]["content"].as_str())
        })
        .collect();
    Some(text)
}

/// Render a property value as plain text, whatever its type.
pub fn property_text(prop: &Value) -> Option<String> {
    match prop["type"].as_str() {
        Some("title") => text_items(&prop["title"]),
        Some("rich_text") => text_items(&prop["rich_text"]),
        Some("unique_id") => {
            let number = prop["unique_id"]["number"].as_u64()?;
            match prop["unique_id"]["prefix"].as_str() {
                Some(prefix) if !prefix.is_empty() => Some(format!("{prefix}-{number}")),
                _ => Some(number.to_string()),
            }
        }
        Some("formula") => prop["formula"]["string"].as_str().map(String::from),
        Some("number") => prop["number"].as_u64().map(|n| n.to_string()),
        Some("select") => prop["select"]["name"].as_str().map(String::from),
        Some("url") => prop["url"].as_str().map(String::from),
        _ => None,
    }
}

pub fn relation_ids(prop: &Value) -> Vec<String> {
    prop["relation"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["id"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

fn property_number(prop: &Value) -> Option<u64> {
    let number = &prop["number"];
    number
        .as_u64()
        .or_else(|| number.as_f64().filter(|n| *n >= 0.0 && n.fract() == 0.0).map(|n| n as u64))
}

fn property_date(prop: &Value) -> Option<DateTime<Utc>> {
    let start = prop["date"]["start"].as_str()?;
    DateTime::parse_from_rfc3339(start)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn decode_pr(schema: &PrSchema, page: &Page) -> Result<PrRecord, ServiceError> {
    let number = page
        .property(&schema.number)
        .and_then(property_number)
        .ok_or_else(|| {
            ServiceError::Decode(format!(
                "page {} has no numeric {:?} property",
                page.id, schema.number
            ))
        })?;

    Ok(PrRecord {
        id: page.id.clone(),
        url: page.page_url(),
        number,
        title: page
            .property(&schema.title)
            .and_then(property_text)
            .unwrap_or_default(),
        state: page
            .property(&schema.state)
            .and_then(property_text)
            .and_then(|s| PrState::parse_str(&s)),
        related_task_ids: page
            .property(&schema.task_relation)
            .map(relation_ids)
            .unwrap_or_default(),
        author: page
            .property(&schema.author)
            .and_then(property_text)
            .filter(|s| !s.is_empty()),
        created_at: page.property(&schema.created_at).and_then(property_date),
    })
}

pub fn decode_task(schema: &TaskSchema, page: &Page) -> TaskRecord {
    // every database has exactly one title-typed property, whatever its name
    let title = page
        .properties
        .values()
        .find(|prop| prop["type"] == "title")
        .and_then(property_text)
        .unwrap_or_default();

    TaskRecord {
        id: page.id.clone(),
        url: page.page_url(),
        title,
        identifier: page.property(&schema.identifier).and_then(property_text),
        related_pr_ids: page
            .property(&schema.pr_relation)
            .map(relation_ids)
            .unwrap_or_default(),
    }
}
