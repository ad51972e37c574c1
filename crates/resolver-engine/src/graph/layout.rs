use crate::camera::geometry::{Aabb, DVec2};
use crate::graph::tree::IndexedProcessTree;
use crate::util::ids::edge_id;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub const COL_SPACING: f64 = 180.0;
pub const ROW_SPACING: f64 = 120.0;
/// World-space footprint of a rendered process node, used for culling.
pub const NODE_SIZE: DVec2 = DVec2::new(150.0, 60.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Millisecond => "ms",
            Self::Second => "s",
            Self::Minute => "m",
            Self::Hour => "h",
            Self::Day => "d",
            Self::Week => "w",
            Self::Month => "mo",
            Self::Year => "y",
        }
    }
}

/// Parent-to-child start delay in the largest unit it fills at least once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedTime {
    pub duration: u64,
    pub unit: TimeUnit,
}

impl ElapsedTime {
    pub fn from_millis(ms: f64) -> Option<Self> {
        if !ms.is_finite() || ms < 0.0 {
            return None;
        }
        const SECOND: f64 = 1_000.0;
        const MINUTE: f64 = 60.0 * SECOND;
        const HOUR: f64 = 60.0 * MINUTE;
        const DAY: f64 = 24.0 * HOUR;
        const WEEK: f64 = 7.0 * DAY;
        const MONTH: f64 = 30.0 * DAY;
        const YEAR: f64 = 365.0 * DAY;

        let (per, unit) = if ms >= YEAR {
            (YEAR, TimeUnit::Year)
        } else if ms >= MONTH {
            (MONTH, TimeUnit::Month)
        } else if ms >= WEEK {
            (WEEK, TimeUnit::Week)
        } else if ms >= DAY {
            (DAY, TimeUnit::Day)
        } else if ms >= HOUR {
            (HOUR, TimeUnit::Hour)
        } else if ms >= MINUTE {
            (MINUTE, TimeUnit::Minute)
        } else if ms >= SECOND {
            (SECOND, TimeUnit::Second)
        } else {
            (1.0, TimeUnit::Millisecond)
        };
        Some(Self {
            duration: (ms / per).floor() as u64,
            unit,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMetadata {
    pub unique_id: u32,
    pub elapsed_time: Option<ElapsedTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLineSegment {
    pub parent_entity_id: String,
    pub child_entity_id: String,
    pub points: [DVec2; 2],
    pub metadata: EdgeMetadata,
}

impl EdgeLineSegment {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.points[0], self.points[1])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodePosition {
    pub entity_id: String,
    pub position: DVec2,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleEntities {
    pub process_node_positions: Vec<NodePosition>,
    pub connecting_edge_line_segments: Vec<EdgeLineSegment>,
}

/// World positions for every node reachable from the tree's root.
#[derive(Debug, Default)]
pub struct ProcessLayout {
    nodes: Vec<NodePosition>,
    index: HashMap<String, usize>,
    edges: Vec<EdgeLineSegment>,
    visible_cache: Mutex<Option<(Aabb, Arc<VisibleEntities>)>>,
}

impl ProcessLayout {
    /// Subtree-width layout: each node is centered over the span its leaves
    /// occupy, siblings in traversal order, one row per level.
    pub fn new(tree: &IndexedProcessTree) -> Self {
        let order: Vec<String> = tree.level_order().map(|e| e.entity_id()).collect();

        // ----- widths, leaves first -----
        let mut widths: HashMap<&str, f64> = HashMap::new();
        for id in order.iter().rev() {
            let width: f64 = tree
                .children_ids(id)
                .iter()
                .filter_map(|kid| widths.get(kid.as_str()))
                .sum();
            widths.insert(id.as_str(), if width > 0.0 { width } else { 1.0 });
        }

        // ----- positions, root first -----
        let mut starts: HashMap<&str, f64> = HashMap::new();
        let mut nodes = Vec::with_capacity(order.len());
        let mut index = HashMap::with_capacity(order.len());
        for id in &order {
            let start = starts.get(id.as_str()).copied().unwrap_or(0.0);
            let width = widths.get(id.as_str()).copied().unwrap_or(1.0);
            let level = tree.node_level(id).unwrap_or(1);

            let mut cursor = start;
            for kid in tree.children_ids(id) {
                if let Some(kid_width) = widths.get(kid.as_str()) {
                    starts.insert(kid.as_str(), cursor);
                    cursor += kid_width;
                }
            }

            let x_units = start + width / 2.0;
            let position = DVec2::new(
                x_units * COL_SPACING,
                -((level.saturating_sub(1)) as f64) * ROW_SPACING,
            );
            index.insert(id.clone(), nodes.len());
            nodes.push(NodePosition {
                entity_id: id.clone(),
                position,
            });
        }

        let mut edges = Vec::new();
        for node in &nodes {
            let Some(parent) = tree.parent(&node.entity_id) else {
                continue;
            };
            let parent_id = parent.entity_id();
            let Some(&parent_idx) = index.get(&parent_id) else {
                continue;
            };
            let elapsed_time = tree
                .event(&node.entity_id)
                .and_then(|child| child.timestamp())
                .zip(parent.timestamp())
                .and_then(|(child_ts, parent_ts)| ElapsedTime::from_millis(child_ts - parent_ts));
            edges.push(EdgeLineSegment {
                points: [nodes[parent_idx].position, node.position],
                metadata: EdgeMetadata {
                    unique_id: edge_id(&parent_id, &node.entity_id),
                    elapsed_time,
                },
                parent_entity_id: parent_id,
                child_entity_id: node.entity_id.clone(),
            });
        }

        Self {
            nodes,
            index,
            edges,
            visible_cache: Mutex::new(None),
        }
    }

    pub fn nodes(&self) -> &[NodePosition] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeLineSegment] {
        &self.edges
    }

    pub fn position(&self, entity_id: &str) -> Option<DVec2> {
        self.index.get(entity_id).map(|&i| self.nodes[i].position)
    }

    pub fn bounds(&self) -> Option<Aabb> {
        let first = self.nodes.first()?.position;
        let bbox = self
            .nodes
            .iter()
            .fold(Aabb::new(first, first), |acc, n| acc.including(n.position));
        Some(bbox)
    }

    /// Nodes whose footprint and edges whose segment touch `bbox`.
    /// The last answer is kept and reused while the box is unchanged.
    pub fn visible_in(&self, bbox: Aabb) -> Arc<VisibleEntities> {
        let mut cache = self.visible_cache.lock();
        if let Some((cached_box, cached)) = cache.as_ref() {
            if *cached_box == bbox {
                return Arc::clone(cached);
            }
        }

        let process_node_positions = self
            .nodes
            .iter()
            .filter(|n| Aabb::around(n.position, NODE_SIZE).intersects(&bbox))
            .cloned()
            .collect();
        let connecting_edge_line_segments = self
            .edges
            .iter()
            .filter(|e| e.bounds().intersects(&bbox))
            .cloned()
            .collect();
        let visible = Arc::new(VisibleEntities {
            process_node_positions,
            connecting_edge_line_segments,
        });
        *cache = Some((bbox, Arc::clone(&visible)));
        visible
    }
}
