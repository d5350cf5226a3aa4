//! # Feed Decoders
//!
//! One decoding contract, two wire formats. Both the current JSON feed and
//! the legacy element-tagged XML feed express the same stream: one version
//! token, one total-count hint, zero-or-more add/delete records, and a
//! fixed end sentinel. The reconciler consumes [`FeedEvent`]s and never
//! sees which format produced them.
//!
//! ## Event Stream
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Version("7")                                                       │
//! │  Total(2)                                                           │
//! │  Menu { id: "animals", … }          (zero or more)                  │
//! │  Add(ContentRecord { id: "1", … })  (zero or more, any order)       │
//! │  Delete("2")                                                        │
//! │  End                                                                │
//! │                                                                     │
//! │  A malformed record surfaces as an Err from next_event(); the       │
//! │  reconciler treats it as end-of-input and salvages what was         │
//! │  already applied.                                                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Deserialize;
use std::collections::VecDeque;

use crate::error::{SyncError, SyncResult};
use fieldbase_core::{ContentRecord, MenuRecord};

// =============================================================================
// Events
// =============================================================================

/// One unit of a decoded content feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// The feed's version token.
    Version(String),
    /// Declared number of records in the stream.
    Total(u32),
    /// Upsert of a top-level menu.
    Menu(MenuRecord),
    /// Upsert of a content record (replace-by-id).
    Add(ContentRecord),
    /// Deletion of a content record by id.
    Delete(String),
    /// Explicit end of stream.
    End,
}

/// Streaming decoder contract. Implementations yield events in stream
/// order and return [`FeedEvent::End`] forever once exhausted.
pub trait FeedDecoder {
    /// Returns the next event, or an error for a malformed record (which
    /// callers treat as end-of-input).
    fn next_event(&mut self) -> SyncResult<FeedEvent>;
}

// =============================================================================
// Format Detection & Sentinels
// =============================================================================

/// The two wire formats a feed payload can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    /// Current token-tagged JSON format.
    Json,
    /// Legacy element-tagged XML format.
    Xml,
}

/// Fixed suffix that marks a complete JSON feed payload.
pub const JSON_FEED_SENTINEL: &str = "\"end\":true}";

/// Fixed closing tag that marks a complete XML feed payload.
pub const XML_FEED_SENTINEL: &str = "</ContentFeed>";

impl FeedFormat {
    /// Picks the format from the payload's first non-whitespace byte.
    pub fn detect(payload: &str) -> FeedFormat {
        if payload.trim_start().starts_with('<') {
            FeedFormat::Xml
        } else {
            FeedFormat::Json
        }
    }

    /// The end sentinel a complete payload of this format must carry.
    pub fn sentinel(&self) -> &'static str {
        match self {
            FeedFormat::Json => JSON_FEED_SENTINEL,
            FeedFormat::Xml => XML_FEED_SENTINEL,
        }
    }
}

/// Checks the structural end marker. A payload failing this check is a
/// truncated download and must not be decoded.
pub fn payload_is_complete(payload: &str) -> bool {
    let format = FeedFormat::detect(payload);
    payload.trim_end().ends_with(format.sentinel())
}

/// Builds the decoder matching the payload's detected format.
pub fn decoder_for(payload: &str) -> Box<dyn FeedDecoder + Send> {
    match FeedFormat::detect(payload) {
        FeedFormat::Json => Box::new(JsonFeedDecoder::new(payload)),
        FeedFormat::Xml => Box::new(XmlFeedDecoder::new(payload)),
    }
}

// =============================================================================
// JSON Decoder
// =============================================================================

#[derive(Deserialize)]
struct JsonFeed {
    version: String,
    #[serde(default)]
    total: u32,
    #[serde(default)]
    records: Vec<serde_json::Value>,
    #[serde(default)]
    end: bool,
}

#[derive(Deserialize)]
struct JsonMenu {
    id: String,
    #[serde(default)]
    label: String,
}

#[derive(Deserialize)]
struct JsonItem {
    id: String,
    #[serde(default)]
    menu: String,
    #[serde(default)]
    order: i64,
    #[serde(default)]
    category: String,
    #[serde(default)]
    attribution: String,
    #[serde(default)]
    updated: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    body: String,
}

#[derive(Deserialize)]
struct JsonRemove {
    id: String,
}

/// Decoder for the token-tagged JSON feed.
pub struct JsonFeedDecoder {
    events: VecDeque<FeedEvent>,
    trailing: Option<SyncError>,
}

impl JsonFeedDecoder {
    /// Tokenizes the payload. Decode problems are deferred to
    /// `next_event` so callers see every event up to the bad record.
    pub fn new(payload: &str) -> Self {
        let mut events = VecDeque::new();
        let mut trailing = None;

        match serde_json::from_str::<JsonFeed>(payload) {
            Ok(feed) => {
                if feed.total == 0 {
                    // A readable document without a usable total is a
                    // malformed feed, not an empty one.
                    trailing = Some(SyncError::Decode("feed declared zero total".into()));
                } else {
                    events.push_back(FeedEvent::Version(feed.version));
                    events.push_back(FeedEvent::Total(feed.total));

                    for record in feed.records {
                        match Self::record_event(&record) {
                            Ok(event) => events.push_back(event),
                            Err(e) => {
                                trailing = Some(e);
                                break;
                            }
                        }
                    }

                    if trailing.is_none() && feed.end {
                        events.push_back(FeedEvent::End);
                    }
                }
            }
            Err(e) => {
                trailing = Some(SyncError::Decode(e.to_string()));
            }
        }

        JsonFeedDecoder { events, trailing }
    }

    fn record_event(record: &serde_json::Value) -> SyncResult<FeedEvent> {
        let op = record
            .get("op")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SyncError::Decode("record missing 'op'".into()))?;

        match op {
            "add" | "update" => {
                let kind = record.get("type").and_then(|v| v.as_str()).unwrap_or("item");
                if kind == "menu" {
                    let menu: JsonMenu = serde_json::from_value(record.clone())?;
                    Ok(FeedEvent::Menu(MenuRecord {
                        id: menu.id,
                        label: menu.label,
                    }))
                } else {
                    let item: JsonItem = serde_json::from_value(record.clone())?;
                    Ok(FeedEvent::Add(ContentRecord {
                        id: item.id,
                        menu_id: item.menu,
                        order: item.order,
                        category: item.category,
                        attribution: item.attribution,
                        last_updated: item.updated,
                        keywords: item.keywords,
                        body: item.body,
                    }))
                }
            }
            "remove" | "delete" => {
                let remove: JsonRemove = serde_json::from_value(record.clone())?;
                Ok(FeedEvent::Delete(remove.id))
            }
            other => Err(SyncError::Decode(format!("unknown record op '{}'", other))),
        }
    }
}

impl FeedDecoder for JsonFeedDecoder {
    fn next_event(&mut self) -> SyncResult<FeedEvent> {
        if let Some(event) = self.events.pop_front() {
            return Ok(event);
        }
        if let Some(err) = self.trailing.take() {
            return Err(err);
        }
        Ok(FeedEvent::End)
    }
}

// =============================================================================
// XML Decoder
// =============================================================================

/// Decoder for the legacy element-tagged XML feed.
pub struct XmlFeedDecoder {
    events: VecDeque<FeedEvent>,
    trailing: Option<SyncError>,
}

#[derive(Default)]
struct PendingItem {
    id: String,
    menu_id: String,
    order: i64,
    category: String,
    attribution: String,
    last_updated: String,
    keywords: Vec<String>,
    body: String,
}

enum TextTarget {
    Keywords,
    Body,
}

impl XmlFeedDecoder {
    /// Tokenizes the payload, mirroring the JSON decoder's leniency: a
    /// malformed record ends the stream after the events before it.
    pub fn new(payload: &str) -> Self {
        let mut decoder = XmlFeedDecoder {
            events: VecDeque::new(),
            trailing: None,
        };

        if let Err(e) = decoder.tokenize(payload) {
            decoder.trailing = Some(e);
        }

        decoder
    }

    fn tokenize(&mut self, payload: &str) -> SyncResult<()> {
        let mut reader = Reader::from_str(payload);
        reader.config_mut().trim_text(true);

        let mut pending: Option<PendingItem> = None;
        let mut text_target: Option<TextTarget> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    match e.name().as_ref() {
                        b"ContentFeed" => self.header(&e)?,
                        b"menu" => self.menu(&e)?,
                        b"add" | b"update" | b"menu-item" => {
                            pending = Some(Self::item_from_attrs(&e)?);
                        }
                        b"remove" | b"delete" => self.delete(&e)?,
                        b"keywords" if pending.is_some() => {
                            text_target = Some(TextTarget::Keywords);
                        }
                        b"body" if pending.is_some() => {
                            text_target = Some(TextTarget::Body);
                        }
                        _ => {}
                    }
                }
                Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"menu" => self.menu(&e)?,
                    b"add" | b"update" | b"menu-item" => {
                        let item = Self::item_from_attrs(&e)?;
                        self.events.push_back(FeedEvent::Add(Self::into_record(item)));
                    }
                    b"remove" | b"delete" => self.delete(&e)?,
                    _ => {}
                },
                Ok(Event::Text(t)) => {
                    if let (Some(target), Some(item)) = (&text_target, pending.as_mut()) {
                        let text = t
                            .unescape()
                            .map_err(|e| SyncError::Decode(e.to_string()))?
                            .into_owned();
                        match target {
                            TextTarget::Keywords => {
                                item.keywords =
                                    text.split_whitespace().map(str::to_string).collect();
                            }
                            TextTarget::Body => item.body = text,
                        }
                    }
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"add" | b"update" | b"menu-item" => {
                        if let Some(item) = pending.take() {
                            self.events.push_back(FeedEvent::Add(Self::into_record(item)));
                        }
                    }
                    b"keywords" | b"body" => text_target = None,
                    b"ContentFeed" => {
                        self.events.push_back(FeedEvent::End);
                        break;
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(SyncError::Decode(e.to_string())),
            }
        }

        Ok(())
    }

    fn header(&mut self, e: &BytesStart<'_>) -> SyncResult<()> {
        let version = attr(e, b"version")?.unwrap_or_default();
        let total: u32 = attr(e, b"total")?
            .unwrap_or_default()
            .parse()
            .unwrap_or(0);

        if total == 0 {
            return Err(SyncError::Decode("feed declared zero total".into()));
        }

        self.events.push_back(FeedEvent::Version(version));
        self.events.push_back(FeedEvent::Total(total));
        Ok(())
    }

    fn menu(&mut self, e: &BytesStart<'_>) -> SyncResult<()> {
        let id = attr(e, b"id")?
            .ok_or_else(|| SyncError::Decode("menu record missing id".into()))?;
        let label = attr(e, b"label")?.unwrap_or_default();

        self.events.push_back(FeedEvent::Menu(MenuRecord { id, label }));
        Ok(())
    }

    fn delete(&mut self, e: &BytesStart<'_>) -> SyncResult<()> {
        let id = attr(e, b"id")?
            .ok_or_else(|| SyncError::Decode("remove record missing id".into()))?;

        self.events.push_back(FeedEvent::Delete(id));
        Ok(())
    }

    fn item_from_attrs(e: &BytesStart<'_>) -> SyncResult<PendingItem> {
        let id = attr(e, b"id")?
            .ok_or_else(|| SyncError::Decode("add record missing id".into()))?;

        Ok(PendingItem {
            id,
            menu_id: attr(e, b"menu")?.unwrap_or_default(),
            order: attr(e, b"order")?
                .unwrap_or_default()
                .parse()
                .unwrap_or(0),
            category: attr(e, b"category")?.unwrap_or_default(),
            attribution: attr(e, b"attribution")?.unwrap_or_default(),
            last_updated: attr(e, b"updated")?.unwrap_or_default(),
            keywords: Vec::new(),
            body: String::new(),
        })
    }

    fn into_record(item: PendingItem) -> ContentRecord {
        ContentRecord {
            id: item.id,
            menu_id: item.menu_id,
            order: item.order,
            category: item.category,
            attribution: item.attribution,
            last_updated: item.last_updated,
            keywords: item.keywords,
            body: item.body,
        }
    }
}

impl FeedDecoder for XmlFeedDecoder {
    fn next_event(&mut self) -> SyncResult<FeedEvent> {
        if let Some(event) = self.events.pop_front() {
            return Ok(event);
        }
        if let Some(err) = self.trailing.take() {
            return Err(err);
        }
        Ok(FeedEvent::End)
    }
}

/// Reads one attribute by name from an element.
fn attr(e: &BytesStart<'_>, name: &[u8]) -> SyncResult<Option<String>> {
    for attribute in e.attributes() {
        let attribute = attribute.map_err(|err| SyncError::Decode(err.to_string()))?;
        if attribute.key.as_ref() == name {
            let value = attribute
                .unescape_value()
                .map_err(|err| SyncError::Decode(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const JSON_FEED: &str = r#"{"version":"7","total":2,"records":[
        {"op":"add","type":"menu","id":"animals","label":"Animals"},
        {"op":"add","type":"item","id":"1","menu":"animals","order":1,"category":"Animals","attribution":"ag-dept","updated":"2026-05-01","keywords":["Animals","Cattle"],"body":"Cattle"},
        {"op":"add","type":"item","id":"2","menu":"crops","order":1,"category":"Crops","keywords":["Crops","Maize"],"body":"Maize"},
        {"op":"remove","id":"9"}
    ],"end":true}"#;

    const XML_FEED: &str = r#"<ContentFeed version="7" total="2">
        <menu id="animals" label="Animals"/>
        <add id="1" menu="animals" order="1" category="Animals" attribution="ag-dept" updated="2026-05-01">
            <keywords>Animals Cattle</keywords>
            <body>Cattle</body>
        </add>
        <add id="2" menu="crops" order="1" category="Crops">
            <keywords>Crops Maize</keywords>
            <body>Maize</body>
        </add>
        <remove id="9"/>
    </ContentFeed>"#;

    fn drain(decoder: &mut dyn FeedDecoder) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        loop {
            match decoder.next_event() {
                Ok(FeedEvent::End) => {
                    events.push(FeedEvent::End);
                    break;
                }
                Ok(event) => events.push(event),
                Err(_) => break,
            }
        }
        events
    }

    #[test]
    fn test_format_detection_and_sentinels() {
        assert_eq!(FeedFormat::detect(JSON_FEED), FeedFormat::Json);
        assert_eq!(FeedFormat::detect(XML_FEED), FeedFormat::Xml);

        assert!(payload_is_complete(JSON_FEED));
        assert!(payload_is_complete(XML_FEED));

        assert!(!payload_is_complete(&JSON_FEED[..JSON_FEED.len() - 4]));
        assert!(!payload_is_complete(&XML_FEED[..XML_FEED.len() - 4]));
    }

    #[test]
    fn test_both_formats_yield_identical_events() {
        let mut json = JsonFeedDecoder::new(JSON_FEED);
        let mut xml = XmlFeedDecoder::new(XML_FEED);

        let json_events = drain(&mut json);
        let xml_events = drain(&mut xml);

        assert_eq!(json_events, xml_events);
    }

    #[test]
    fn test_json_events_in_stream_order() {
        let mut decoder = JsonFeedDecoder::new(JSON_FEED);

        assert_eq!(decoder.next_event().unwrap(), FeedEvent::Version("7".into()));
        assert_eq!(decoder.next_event().unwrap(), FeedEvent::Total(2));
        assert!(matches!(decoder.next_event().unwrap(), FeedEvent::Menu(_)));
        assert!(matches!(decoder.next_event().unwrap(), FeedEvent::Add(_)));
        assert!(matches!(decoder.next_event().unwrap(), FeedEvent::Add(_)));
        assert_eq!(decoder.next_event().unwrap(), FeedEvent::Delete("9".into()));
        assert_eq!(decoder.next_event().unwrap(), FeedEvent::End);
        // Exhausted decoders keep answering End.
        assert_eq!(decoder.next_event().unwrap(), FeedEvent::End);
    }

    #[test]
    fn test_malformed_record_ends_stream_after_good_prefix() {
        let payload = r#"{"version":"5","total":2,"records":[
            {"op":"add","type":"item","id":"1","keywords":["A"],"body":"ok"},
            {"op":"launch"}
        ],"end":true}"#;

        let mut decoder = JsonFeedDecoder::new(payload);
        assert_eq!(decoder.next_event().unwrap(), FeedEvent::Version("5".into()));
        assert_eq!(decoder.next_event().unwrap(), FeedEvent::Total(2));
        assert!(matches!(decoder.next_event().unwrap(), FeedEvent::Add(_)));
        assert!(decoder.next_event().is_err());
        // After the error is taken, the stream is simply over.
        assert_eq!(decoder.next_event().unwrap(), FeedEvent::End);
    }

    #[test]
    fn test_zero_total_is_malformed() {
        let mut decoder = JsonFeedDecoder::new(r#"{"version":"5","total":0,"records":[],"end":true}"#);
        assert!(decoder.next_event().is_err());

        let mut decoder = XmlFeedDecoder::new(r#"<ContentFeed version="5" total="0"></ContentFeed>"#);
        assert!(decoder.next_event().is_err());
    }

    #[test]
    fn test_xml_legacy_tag_aliases() {
        let payload = r#"<ContentFeed version="3" total="1">
            <menu-item id="1" menu="animals" order="2">
                <keywords>Animals Goats</keywords>
                <body>Goats</body>
            </menu-item>
            <delete id="4"/>
        </ContentFeed>"#;

        let mut decoder = XmlFeedDecoder::new(payload);
        let events = drain(&mut decoder);

        assert!(events.iter().any(|e| matches!(e, FeedEvent::Add(r) if r.id == "1" && r.order == 2)));
        assert!(events.contains(&FeedEvent::Delete("4".into())));
    }
}
