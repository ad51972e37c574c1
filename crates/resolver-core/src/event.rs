use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// An ECS field that may hold a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::One(s) => Some(s.as_str()),
            Self::Many(v) => v.first().map(String::as_str),
        }
    }

    /// Exact match, or a one-element array holding exactly `value`.
    pub fn is_value(&self, value: &str) -> bool {
        match self {
            Self::One(s) => s == value,
            Self::Many(v) => v.len() == 1 && v[0] == value,
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::One(s) => vec![s.as_str()],
            Self::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

/// Legacy identifiers are numeric on the wire but some exporters stringify them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacyId {
    Number(u64),
    Text(String),
}

impl LegacyId {
    // zero and "" are treated as absent
    fn present(&self) -> Option<String> {
        match self {
            Self::Number(0) => None,
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) if s.is_empty() => None,
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for LegacyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// ---------------- tolerant field decoding ----------------
//
// A field holding the wrong JSON type decodes as absent instead of failing
// the whole record, and with it the page or tree the record arrived in.

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// Integers, also when an exporter wrote them as decimal strings.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

// ---------------- legacy (flat endgame namespace) ----------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endgame {
    #[serde(deserialize_with = "lenient_number")]
    pub pid: Option<i64>,
    #[serde(deserialize_with = "lenient_number")]
    pub ppid: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub unique_pid: Option<LegacyId>,
    #[serde(deserialize_with = "lenient")]
    pub unique_ppid: Option<LegacyId>,
    #[serde(deserialize_with = "lenient")]
    pub event_type_full: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub event_subtype_full: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub process_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub process_path: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub serial_event_id: Option<LegacyId>,
    #[serde(deserialize_with = "lenient")]
    pub timestamp_utc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyEventMeta {
    #[serde(deserialize_with = "lenient")]
    pub action: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub event_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyEndpointEvent {
    #[serde(rename = "@timestamp", deserialize_with = "lenient")]
    pub timestamp: Option<f64>,
    #[serde(deserialize_with = "lenient_or_default")]
    pub endgame: Endgame,
    #[serde(deserialize_with = "lenient")]
    pub event: Option<LegacyEventMeta>,
    #[serde(deserialize_with = "lenient")]
    pub user: Option<UserInfo>,
}

// ---------------- modern (ECS nested) ----------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcsEvent {
    #[serde(deserialize_with = "lenient")]
    pub category: Option<OneOrMany>,
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub event_type: Option<OneOrMany>,
    #[serde(deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub sequence: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessHash {
    #[serde(deserialize_with = "lenient")]
    pub md5: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentProcess {
    #[serde(deserialize_with = "lenient")]
    pub entity_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub pid: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessExt {
    /// Nearest ancestor first: `ancestry[0]` is the parent.
    #[serde(deserialize_with = "lenient")]
    pub ancestry: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcsProcess {
    #[serde(deserialize_with = "lenient")]
    pub entity_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub executable: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub args: Option<OneOrMany>,
    #[serde(deserialize_with = "lenient_number")]
    pub pid: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub hash: Option<ProcessHash>,
    #[serde(deserialize_with = "lenient")]
    pub parent: Option<ParentProcess>,
    #[serde(rename = "Ext", deserialize_with = "lenient")]
    pub ext: Option<ProcessExt>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileInfo {
    #[serde(deserialize_with = "lenient")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkInfo {
    #[serde(deserialize_with = "lenient")]
    pub direction: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub forwarded_ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsQuestion {
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsInfo {
    #[serde(deserialize_with = "lenient")]
    pub question: Option<DnsQuestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryInfo {
    #[serde(deserialize_with = "lenient")]
    pub path: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointEvent {
    #[serde(rename = "@timestamp", deserialize_with = "lenient")]
    pub timestamp: Option<f64>,
    #[serde(deserialize_with = "lenient_or_default")]
    pub event: EcsEvent,
    #[serde(deserialize_with = "lenient_or_default")]
    pub process: EcsProcess,
    #[serde(deserialize_with = "lenient")]
    pub user: Option<UserInfo>,
    #[serde(deserialize_with = "lenient")]
    pub file: Option<FileInfo>,
    #[serde(deserialize_with = "lenient")]
    pub network: Option<NetworkInfo>,
    #[serde(deserialize_with = "lenient")]
    pub dns: Option<DnsInfo>,
    #[serde(deserialize_with = "lenient")]
    pub registry: Option<RegistryInfo>,
}

/// One record from either schema generation.
///
/// Deserialization checks a single discriminant: an object carrying a
/// non-null `endgame` key is legacy, everything else is modern ECS.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolverEvent {
    Legacy(LegacyEndpointEvent),
    Endpoint(EndpointEvent),
}

impl<'de> Deserialize<'de> for ResolverEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Ok(ResolverEvent::Endpoint(EndpointEvent::default()));
        }
        let is_legacy = value.get("endgame").is_some_and(|v| !v.is_null());
        if is_legacy {
            serde_json::from_value(value)
                .map(ResolverEvent::Legacy)
                .map_err(serde::de::Error::custom)
        } else {
            serde_json::from_value(value)
                .map(ResolverEvent::Endpoint)
                .map_err(serde::de::Error::custom)
        }
    }
}

/// Classification of a process lifecycle record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventCategory {
    ProcessCreated,
    ProcessRan,
    ProcessTerminated,
    ProcessCausedAlert,
    UnknownProcessEvent,
    UnknownEvent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptiveName {
    pub subject: String,
    pub descriptor: Option<String>,
}

impl DescriptiveName {
    fn subject(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            descriptor: None,
        }
    }
}

impl fmt::Display for DescriptiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.descriptor {
            Some(descriptor) => write!(f, "{descriptor} {}", self.subject),
            None => f.write_str(&self.subject),
        }
    }
}

// ---------------- uniform accessors ----------------

impl ResolverEvent {
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }

    /// Stable process identifier. Empty when the record carries none.
    pub fn entity_id(&self) -> String {
        match self {
            Self::Legacy(e) => e
                .endgame
                .unique_pid
                .as_ref()
                .and_then(LegacyId::present)
                .unwrap_or_default(),
            Self::Endpoint(e) => e.process.entity_id.clone().unwrap_or_default(),
        }
    }

    pub fn parent_entity_id(&self) -> Option<String> {
        match self {
            Self::Legacy(e) => e.endgame.unique_ppid.as_ref().and_then(LegacyId::present),
            Self::Endpoint(e) => e
                .process
                .parent
                .as_ref()
                .and_then(|p| p.entity_id.clone())
                .filter(|id| !id.is_empty()),
        }
    }

    /// The explicit ancestry array, when the record has one.
    pub fn ancestry_array(&self) -> Option<&[String]> {
        match self {
            Self::Legacy(_) => None,
            Self::Endpoint(e) => e
                .process
                .ext
                .as_ref()
                .and_then(|ext| ext.ancestry.as_deref()),
        }
    }

    /// Ancestor ids, nearest first. Falls back to the single parent link.
    pub fn ancestry_ids(&self) -> Vec<String> {
        if let Some(ancestors) = self.ancestry_array() {
            return ancestors.to_vec();
        }
        self.parent_entity_id().into_iter().collect()
    }

    /// Milliseconds since the epoch.
    pub fn timestamp(&self) -> Option<f64> {
        let ts = match self {
            Self::Legacy(e) => e.timestamp,
            Self::Endpoint(e) => e.timestamp,
        };
        ts.filter(|t| t.is_finite())
    }

    pub fn event_id(&self) -> Option<String> {
        match self {
            Self::Legacy(e) => e.endgame.serial_event_id.as_ref().and_then(LegacyId::present),
            Self::Endpoint(e) => e.event.id.clone(),
        }
    }

    pub fn event_category(&self) -> EventCategory {
        match self {
            Self::Legacy(e) => {
                let kind = e.endgame.event_type_full.as_deref();
                let sub = e.endgame.event_subtype_full.as_deref();
                match (kind, sub) {
                    (Some("process_event"), Some("creation_event" | "fork_event" | "exec_event")) => {
                        EventCategory::ProcessCreated
                    }
                    (Some("process_event"), Some("already_running")) => EventCategory::ProcessRan,
                    (Some("process_event"), Some("termination_event")) => {
                        EventCategory::ProcessTerminated
                    }
                    (Some("process_event"), _) => EventCategory::UnknownProcessEvent,
                    (Some("alert_event"), _) => EventCategory::ProcessCausedAlert,
                    _ => EventCategory::UnknownEvent,
                }
            }
            Self::Endpoint(e) => {
                let is_type = |value: &str| {
                    e.event
                        .event_type
                        .as_ref()
                        .is_some_and(|t| t.is_value(value))
                };
                let is_process = e
                    .event
                    .category
                    .as_ref()
                    .is_some_and(|c| c.is_value("process"));
                if is_process {
                    if is_type("start") || is_type("change") || is_type("creation") {
                        EventCategory::ProcessCreated
                    } else if is_type("info") {
                        EventCategory::ProcessRan
                    } else if is_type("end") {
                        EventCategory::ProcessTerminated
                    } else {
                        EventCategory::UnknownProcessEvent
                    }
                } else if e.event.kind.as_deref() == Some("alert") {
                    EventCategory::ProcessCausedAlert
                } else {
                    EventCategory::UnknownEvent
                }
            }
        }
    }

    /// Only created/ran records are placed in the graph.
    pub fn is_graphable_process(&self) -> bool {
        matches!(
            self.event_category(),
            EventCategory::ProcessCreated | EventCategory::ProcessRan
        )
    }

    pub fn is_terminated_process(&self) -> bool {
        self.event_category() == EventCategory::ProcessTerminated
    }

    /// Legacy `event_type_full`, or the first modern `event.category`.
    pub fn primary_category(&self) -> Option<String> {
        match self {
            Self::Legacy(e) => e.endgame.event_type_full.clone(),
            Self::Endpoint(e) => e
                .event
                .category
                .as_ref()
                .and_then(|c| c.first())
                .map(str::to_string),
        }
    }

    /// Every category value the record carries.
    pub fn categories(&self) -> Vec<String> {
        match self {
            Self::Legacy(e) => e.endgame.event_type_full.clone().into_iter().collect(),
            Self::Endpoint(e) => e
                .event
                .category
                .as_ref()
                .map(|c| c.values().into_iter().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }

    pub fn ecs_types(&self) -> Vec<String> {
        match self {
            Self::Legacy(e) => e.endgame.event_subtype_full.clone().into_iter().collect(),
            Self::Endpoint(e) => e
                .event
                .event_type
                .as_ref()
                .map(|t| t.values().into_iter().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }

    pub fn name(&self) -> Option<String> {
        match self {
            Self::Legacy(e) => e.endgame.process_name.clone().filter(|n| !n.is_empty()),
            Self::Endpoint(e) => e.process.name.clone(),
        }
    }

    pub fn pid(&self) -> Option<i64> {
        match self {
            Self::Legacy(e) => e.endgame.pid,
            Self::Endpoint(e) => e.process.pid,
        }
    }

    pub fn ppid(&self) -> Option<i64> {
        match self {
            Self::Legacy(e) => e.endgame.ppid,
            Self::Endpoint(e) => e.process.parent.as_ref().and_then(|p| p.pid),
        }
    }

    pub fn path(&self) -> Option<String> {
        match self {
            Self::Legacy(e) => e.endgame.process_path.clone(),
            Self::Endpoint(e) => e.process.executable.clone(),
        }
    }

    /// Legacy records carry no hash.
    pub fn md5(&self) -> Option<String> {
        match self {
            Self::Legacy(_) => None,
            Self::Endpoint(e) => e.process.hash.as_ref().and_then(|h| h.md5.clone()),
        }
    }

    /// Command line including the executable. Legacy records carry none.
    pub fn args(&self) -> Option<String> {
        match self {
            Self::Legacy(_) => None,
            Self::Endpoint(e) => e.process.args.as_ref().map(|a| a.values().join(" ")),
        }
    }

    pub fn user_info(&self) -> Option<&UserInfo> {
        match self {
            Self::Legacy(e) => e.user.as_ref(),
            Self::Endpoint(e) => e.user.as_ref(),
        }
    }

    /// A human-scannable label for a related (non-process) record.
    pub fn descriptive_name(&self) -> DescriptiveName {
        let e = match self {
            Self::Legacy(_) => {
                return DescriptiveName::subject(self.name().unwrap_or_default());
            }
            Self::Endpoint(e) => e,
        };

        if let Some(network) = &e.network {
            if let Some(ip) = network.forwarded_ip.as_deref().filter(|s| !s.is_empty()) {
                return DescriptiveName {
                    subject: ip.to_string(),
                    descriptor: network.direction.clone(),
                };
            }
        }
        if let Some(path) = e
            .file
            .as_ref()
            .and_then(|f| f.path.as_deref())
            .filter(|s| !s.is_empty())
        {
            return DescriptiveName::subject(path);
        }
        if let Some(registry) = &e.registry {
            let path_or_key = registry
                .path
                .as_deref()
                .filter(|s| !s.is_empty())
                .or_else(|| registry.key.as_deref().filter(|s| !s.is_empty()));
            if let Some(subject) = path_or_key {
                return DescriptiveName::subject(subject);
            }
        }
        if let Some(name) = e
            .dns
            .as_ref()
            .and_then(|d| d.question.as_ref())
            .and_then(|q| q.name.as_deref())
            .filter(|s| !s.is_empty())
        {
            return DescriptiveName::subject(name);
        }

        DescriptiveName::subject(self.entity_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> ResolverEvent {
        serde_json::from_value(value).expect("event parses")
    }

    fn legacy(type_full: &str, subtype: Option<&str>) -> ResolverEvent {
        parse(json!({
            "endgame": {
                "unique_pid": 1,
                "unique_ppid": 2,
                "event_type_full": type_full,
                "event_subtype_full": subtype,
            }
        }))
    }

    fn modern(category: Value, event_type: Value, kind: Option<&str>) -> ResolverEvent {
        parse(json!({
            "process": { "entity_id": "1", "parent": { "entity_id": "2" } },
            "event": { "category": category, "type": event_type, "kind": kind },
        }))
    }

    #[test]
    fn legacy_and_modern_process_start_agree() {
        let old = legacy("process_event", Some("creation_event"));
        let new = modern(json!("process"), json!("start"), None);

        assert!(old.is_legacy());
        assert!(!new.is_legacy());
        for event in [&old, &new] {
            assert_eq!(event.event_category(), EventCategory::ProcessCreated);
            assert_eq!(event.entity_id(), "1");
            assert_eq!(event.parent_entity_id().as_deref(), Some("2"));
        }
    }

    #[test]
    fn legacy_classification_table() {
        let cases = [
            ("process_event", Some("creation_event"), EventCategory::ProcessCreated),
            ("process_event", Some("fork_event"), EventCategory::ProcessCreated),
            ("process_event", Some("exec_event"), EventCategory::ProcessCreated),
            ("process_event", Some("already_running"), EventCategory::ProcessRan),
            ("process_event", Some("termination_event"), EventCategory::ProcessTerminated),
            ("process_event", Some("something_else"), EventCategory::UnknownProcessEvent),
            ("process_event", None, EventCategory::UnknownProcessEvent),
            ("alert_event", None, EventCategory::ProcessCausedAlert),
            ("alert_event", Some("creation_event"), EventCategory::ProcessCausedAlert),
            ("file_event", Some("creation_event"), EventCategory::UnknownEvent),
        ];
        for (type_full, subtype, expected) in cases {
            assert_eq!(
                legacy(type_full, subtype).event_category(),
                expected,
                "{type_full} / {subtype:?}"
            );
        }
    }

    #[test]
    fn modern_classification_table() {
        let cases = [
            (json!("process"), json!("start"), None, EventCategory::ProcessCreated),
            (json!(["process"]), json!(["change"]), None, EventCategory::ProcessCreated),
            (json!("process"), json!("creation"), None, EventCategory::ProcessCreated),
            (json!("process"), json!("info"), None, EventCategory::ProcessRan),
            (json!("process"), json!("end"), None, EventCategory::ProcessTerminated),
            (json!("process"), json!("access"), None, EventCategory::UnknownProcessEvent),
            // multi-valued fields never match a single value
            (json!("process"), json!(["start", "end"]), None, EventCategory::UnknownProcessEvent),
            (json!(["process", "file"]), json!("start"), None, EventCategory::UnknownEvent),
            (json!("file"), json!("creation"), Some("alert"), EventCategory::ProcessCausedAlert),
            (json!("network"), json!("start"), Some("event"), EventCategory::UnknownEvent),
        ];
        for (category, event_type, kind, expected) in cases {
            let event = modern(category.clone(), event_type.clone(), kind);
            assert_eq!(
                event.event_category(),
                expected,
                "{category} / {event_type} / {kind:?}"
            );
        }
    }

    #[test]
    fn missing_fields_resolve_to_none() {
        let bare = parse(json!({}));
        assert!(!bare.is_legacy());
        assert_eq!(bare.entity_id(), "");
        assert_eq!(bare.parent_entity_id(), None);
        assert!(bare.ancestry_ids().is_empty());
        assert_eq!(bare.timestamp(), None);
        assert_eq!(bare.name(), None);
        assert_eq!(bare.event_category(), EventCategory::UnknownEvent);

        let bare_legacy = parse(json!({ "endgame": {} }));
        assert!(bare_legacy.is_legacy());
        assert_eq!(bare_legacy.entity_id(), "");
        assert_eq!(bare_legacy.parent_entity_id(), None);
        assert_eq!(bare_legacy.event_category(), EventCategory::UnknownEvent);
    }

    #[test]
    fn null_endgame_is_not_legacy() {
        let event = parse(json!({ "endgame": null, "process": { "entity_id": "x" } }));
        assert!(!event.is_legacy());
        assert_eq!(event.entity_id(), "x");
    }

    #[test]
    fn legacy_zero_parent_is_absent() {
        let event = parse(json!({ "endgame": { "unique_pid": 5, "unique_ppid": 0 } }));
        assert_eq!(event.entity_id(), "5");
        assert_eq!(event.parent_entity_id(), None);
    }

    #[test]
    fn ancestry_prefers_explicit_array() {
        let with_array = parse(json!({
            "process": {
                "entity_id": "c",
                "parent": { "entity_id": "b" },
                "Ext": { "ancestry": ["b", "a"] },
            }
        }));
        assert_eq!(with_array.ancestry_ids(), vec!["b", "a"]);

        let without = parse(json!({
            "process": { "entity_id": "c", "parent": { "entity_id": "b" } }
        }));
        assert_eq!(without.ancestry_ids(), vec!["b"]);

        let legacy = legacy("process_event", Some("creation_event"));
        assert_eq!(legacy.ancestry_ids(), vec!["2"]);
    }

    #[test]
    fn descriptive_names_follow_category_fields() {
        let network = parse(json!({
            "process": { "entity_id": "p" },
            "network": { "direction": "outbound", "forwarded_ip": "10.0.0.1" },
        }));
        assert_eq!(
            network.descriptive_name(),
            DescriptiveName {
                subject: "10.0.0.1".to_string(),
                descriptor: Some("outbound".to_string()),
            }
        );
        assert_eq!(network.descriptive_name().to_string(), "outbound 10.0.0.1");

        let file = parse(json!({ "file": { "path": "C:\\temp\\a.txt" } }));
        assert_eq!(file.descriptive_name().subject, "C:\\temp\\a.txt");

        let registry = parse(json!({ "registry": { "key": "HKLM/Windows/Software/abc" } }));
        assert_eq!(registry.descriptive_name().subject, "HKLM/Windows/Software/abc");

        let dns = parse(json!({ "dns": { "question": { "name": "example.com" } } }));
        assert_eq!(dns.descriptive_name().subject, "example.com");

        let fallback = parse(json!({ "process": { "entity_id": "p" } }));
        assert_eq!(fallback.descriptive_name().subject, "p");
    }

    #[test]
    fn modern_accessors() {
        let event = parse(json!({
            "@timestamp": 1_600_000_000_000.0,
            "event": { "id": "ev-1", "category": ["process"], "type": ["start"] },
            "process": {
                "entity_id": "e",
                "name": "explorer.exe",
                "executable": "C:\\Windows\\explorer.exe",
                "args": ["explorer.exe", "/n"],
                "pid": 42,
                "hash": { "md5": "abc" },
                "parent": { "entity_id": "p", "pid": 7 },
            },
            "user": { "name": "alice", "domain": "corp" },
        }));
        assert_eq!(event.timestamp(), Some(1_600_000_000_000.0));
        assert_eq!(event.event_id().as_deref(), Some("ev-1"));
        assert_eq!(event.primary_category().as_deref(), Some("process"));
        assert_eq!(event.ecs_types(), vec!["start"]);
        assert_eq!(event.pid(), Some(42));
        assert_eq!(event.ppid(), Some(7));
        assert_eq!(event.path().as_deref(), Some("C:\\Windows\\explorer.exe"));
        assert_eq!(event.md5().as_deref(), Some("abc"));
        assert_eq!(event.args().as_deref(), Some("explorer.exe /n"));
        assert_eq!(
            event.user_info().and_then(|u| u.domain.as_deref()),
            Some("corp")
        );
        assert!(event.is_graphable_process());
    }

    #[test]
    fn wrong_field_types_decode_as_absent() {
        let event = parse(json!({
            "event": { "category": 7, "type": "start", "id": ["x"] },
            "process": { "entity_id": "p", "name": 12, "pid": " 31 ", "args": [1, 2] },
            "user": "root",
        }));
        assert_eq!(event.entity_id(), "p");
        assert_eq!(event.pid(), Some(31));
        assert_eq!(event.name(), None);
        assert_eq!(event.args(), None);
        assert_eq!(event.event_id(), None);
        assert!(event.user_info().is_none());
        assert_eq!(event.event_category(), EventCategory::UnknownEvent);

        let legacy = parse(json!({
            "endgame": { "unique_pid": 3, "unique_ppid": false, "pid": "x", "process_name": [] }
        }));
        assert_eq!(legacy.entity_id(), "3");
        assert_eq!(legacy.parent_entity_id(), None);
        assert_eq!(legacy.pid(), None);
        assert_eq!(legacy.name(), None);

        let scalar = parse(json!("not a record"));
        assert_eq!(scalar.entity_id(), "");
        assert_eq!(scalar.event_category(), EventCategory::UnknownEvent);
    }

    #[test]
    fn legacy_string_ids_are_accepted() {
        let event = parse(json!({
            "endgame": { "unique_pid": "77", "serial_event_id": 9, "process_name": "" }
        }));
        assert_eq!(event.entity_id(), "77");
        assert_eq!(event.event_id().as_deref(), Some("9"));
        assert_eq!(event.name(), None);
    }
}
