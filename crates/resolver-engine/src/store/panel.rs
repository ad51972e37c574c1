use url::form_urlencoded;

pub const PANEL_VIEW: &str = "panelView";
pub const PANEL_NODE_ID: &str = "panelNodeID";
pub const PANEL_RELATED_EVENT_ID: &str = "panelRelatedEventID";
pub const PANEL_EVENT_CATEGORY: &str = "panelEventCategory";

const PANEL_KEYS: [&str; 4] = [
    PANEL_VIEW,
    PANEL_NODE_ID,
    PANEL_RELATED_EVENT_ID,
    PANEL_EVENT_CATEGORY,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEventsRefinement {
    All,
    RelatedEvent(String),
    Category(String),
}

/// What the side panel shows, as encoded in the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelQueryStringState {
    Node {
        panel_node_id: Option<String>,
    },
    NodeEvents {
        panel_node_id: String,
        refinement: NodeEventsRefinement,
    },
}

impl Default for PanelQueryStringState {
    fn default() -> Self {
        Self::Node {
            panel_node_id: None,
        }
    }
}

impl PanelQueryStringState {
    pub fn panel_node_id(&self) -> Option<&str> {
        match self {
            Self::Node { panel_node_id } => panel_node_id.as_deref(),
            Self::NodeEvents { panel_node_id, .. } => Some(panel_node_id),
        }
    }

    pub fn panel_related_event_id(&self) -> Option<&str> {
        match self {
            Self::NodeEvents {
                refinement: NodeEventsRefinement::RelatedEvent(id),
                ..
            } => Some(id),
            _ => None,
        }
    }

    pub fn panel_event_category(&self) -> Option<&str> {
        match self {
            Self::NodeEvents {
                refinement: NodeEventsRefinement::Category(category),
                ..
            } => Some(category),
            _ => None,
        }
    }

    fn pairs(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Node { panel_node_id } => {
                let mut out = vec![(PANEL_VIEW, "node")];
                if let Some(id) = panel_node_id {
                    out.push((PANEL_NODE_ID, id.as_str()));
                }
                out
            }
            Self::NodeEvents {
                panel_node_id,
                refinement,
            } => {
                let mut out = vec![(PANEL_VIEW, "nodeEvents"), (PANEL_NODE_ID, panel_node_id.as_str())];
                match refinement {
                    NodeEventsRefinement::All => {}
                    NodeEventsRefinement::RelatedEvent(id) => {
                        out.push((PANEL_RELATED_EVENT_ID, id.as_str()))
                    }
                    NodeEventsRefinement::Category(category) => {
                        out.push((PANEL_EVENT_CATEGORY, category.as_str()))
                    }
                }
                out
            }
        }
    }
}

fn strip_question_mark(url_search: &str) -> &str {
    url_search.strip_prefix('?').unwrap_or(url_search)
}

/// Parses the panel keys out of a query string.
///
/// `None` means the combination is invalid and the panel should show its
/// not-found view. The first occurrence of a repeated key wins.
pub fn parse_panel_state(url_search: &str) -> Option<PanelQueryStringState> {
    let mut view = None;
    let mut node_id = None;
    let mut related_event_id = None;
    let mut category = None;
    for (key, value) in form_urlencoded::parse(strip_question_mark(url_search).as_bytes()) {
        let slot = match &*key {
            PANEL_VIEW => &mut view,
            PANEL_NODE_ID => &mut node_id,
            PANEL_RELATED_EVENT_ID => &mut related_event_id,
            PANEL_EVENT_CATEGORY => &mut category,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }

    if view.is_none() && node_id.is_none() && related_event_id.is_none() && category.is_none() {
        return Some(PanelQueryStringState::default());
    }

    match view.as_deref() {
        Some("node") => Some(PanelQueryStringState::Node {
            panel_node_id: node_id,
        }),
        Some("nodeEvents") => {
            let panel_node_id = node_id?;
            let refinement = match (related_event_id, category) {
                (Some(_), Some(_)) => return None,
                (Some(id), None) => NodeEventsRefinement::RelatedEvent(id),
                (None, Some(category)) => NodeEventsRefinement::Category(category),
                (None, None) => NodeEventsRefinement::All,
            };
            Some(PanelQueryStringState::NodeEvents {
                panel_node_id,
                refinement,
            })
        }
        _ => None,
    }
}

/// Rewrites `url_search` to show `panel`: drops all four panel keys, keeps
/// every other parameter in order, then appends the new panel keys.
pub fn with_panel_state(url_search: &str, panel: &PanelQueryStringState) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(strip_question_mark(url_search).as_bytes()) {
        if !PANEL_KEYS.contains(&&*key) {
            out.append_pair(&key, &value);
        }
    }
    for (key, value) in panel.pairs() {
        out.append_pair(key, value);
    }
    out.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_is_default_node_view() {
        assert_eq!(parse_panel_state(""), Some(PanelQueryStringState::default()));
        assert_eq!(
            parse_panel_state("?unrelated=1"),
            Some(PanelQueryStringState::default())
        );
    }

    #[test]
    fn both_related_refinements_are_invalid() {
        assert_eq!(
            parse_panel_state(
                "?panelView=nodeEvents&panelNodeID=x&panelRelatedEventID=y&panelEventCategory=z"
            ),
            None
        );
    }

    #[test]
    fn valid_combinations() {
        assert_eq!(
            parse_panel_state("panelView=node&panelNodeID=abc"),
            Some(PanelQueryStringState::Node {
                panel_node_id: Some("abc".into())
            })
        );
        assert_eq!(
            parse_panel_state("panelView=nodeEvents&panelNodeID=abc&panelEventCategory=file"),
            Some(PanelQueryStringState::NodeEvents {
                panel_node_id: "abc".into(),
                refinement: NodeEventsRefinement::Category("file".into()),
            })
        );
        let related = parse_panel_state("panelView=nodeEvents&panelNodeID=abc&panelRelatedEventID=e%201")
            .expect("valid");
        assert_eq!(related.panel_related_event_id(), Some("e 1"));
        assert_eq!(related.panel_node_id(), Some("abc"));
    }

    #[test]
    fn invalid_combinations() {
        // node id required for nodeEvents
        assert_eq!(parse_panel_state("panelView=nodeEvents"), None);
        assert_eq!(parse_panel_state("panelView=bogus&panelNodeID=a"), None);
        // keys present without a view
        assert_eq!(parse_panel_state("panelNodeID=a"), None);
    }

    #[test]
    fn first_value_wins() {
        let parsed = parse_panel_state("panelView=node&panelNodeID=a&panelNodeID=b").expect("valid");
        assert_eq!(parsed.panel_node_id(), Some("a"));
    }

    #[test]
    fn setter_clears_stale_panel_keys() {
        let before = "?q=1&panelView=nodeEvents&panelNodeID=a&panelRelatedEventID=r&other=x";
        let after = with_panel_state(
            before,
            &PanelQueryStringState::NodeEvents {
                panel_node_id: "b".into(),
                refinement: NodeEventsRefinement::Category("network".into()),
            },
        );
        assert_eq!(
            after,
            "q=1&other=x&panelView=nodeEvents&panelNodeID=b&panelEventCategory=network"
        );
        assert_eq!(
            parse_panel_state(&after).and_then(|p| p.panel_related_event_id().map(str::to_string)),
            None
        );
    }
}
