use resolver_core::ResolverEvent;
use std::collections::{HashMap, HashSet, VecDeque};

/// Links of one node. Ids are keys into the tree's event map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjacency {
    pub parent: Option<String>,
    pub first_child: Option<String>,
    pub previous_sibling: Option<String>,
    pub next_sibling: Option<String>,
    pub level: usize,
}

impl Default for Adjacency {
    fn default() -> Self {
        Self {
            parent: None,
            first_child: None,
            previous_sibling: None,
            next_sibling: None,
            level: 1,
        }
    }
}

/// Parent/child/sibling index over a flat batch of process events.
///
/// Built once per batch and never mutated; a refetch builds a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedProcessTree {
    id_to_event: HashMap<String, ResolverEvent>,
    /// `None` holds the roots.
    id_to_children: HashMap<Option<String>, Vec<String>>,
    id_to_adjacency: HashMap<String, Adjacency>,
    /// Event ids in first-seen order.
    discovery: Vec<String>,
}

impl IndexedProcessTree {
    pub fn new<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a ResolverEvent>,
    {
        let mut tree = Self::default();
        // adjacency keys in insertion order, placeholders included
        let mut adjacency_order: Vec<String> = Vec::new();

        for event in events {
            let id = event.entity_id();
            if id.is_empty() || tree.id_to_event.contains_key(&id) {
                continue;
            }
            tree.id_to_event.insert(id.clone(), event.clone());
            tree.discovery.push(id.clone());

            if !tree.id_to_adjacency.contains_key(&id) {
                tree.id_to_adjacency.insert(id.clone(), Adjacency::default());
                adjacency_order.push(id.clone());
            }

            let parent = event.parent_entity_id();
            if let Some(parent_id) = &parent {
                if !tree.id_to_adjacency.contains_key(parent_id) {
                    tree.id_to_adjacency
                        .insert(parent_id.clone(), Adjacency::default());
                    adjacency_order.push(parent_id.clone());
                }
            }

            let siblings = tree.id_to_children.entry(parent.clone()).or_default();
            let previous = siblings.last().cloned();
            siblings.push(id.clone());

            match &previous {
                Some(prev) => {
                    if let Some(adj) = tree.id_to_adjacency.get_mut(prev) {
                        adj.next_sibling = Some(id.clone());
                    }
                }
                None => {
                    if let Some(parent_id) = &parent {
                        if let Some(adj) = tree.id_to_adjacency.get_mut(parent_id) {
                            adj.first_child = Some(id.clone());
                        }
                    }
                }
            }
            if let Some(adj) = tree.id_to_adjacency.get_mut(&id) {
                adj.parent = parent;
                adj.previous_sibling = previous;
            }
        }

        tree.assign_levels(&adjacency_order);
        tree
    }

    // ----- levels -----

    /// Depth-first from every parentless node over the sibling/child links.
    /// A placeholder parent sits above the tree at level 0, so its children
    /// start at level 1 like true roots. Nodes on a parent cycle are never
    /// reached and keep the default level.
    fn assign_levels(&mut self, adjacency_order: &[String]) {
        let starts: Vec<(String, usize)> = adjacency_order
            .iter()
            .filter(|id| {
                self.id_to_adjacency
                    .get(*id)
                    .is_some_and(|adj| adj.parent.is_none() && adj.previous_sibling.is_none())
            })
            .map(|id| {
                let level = if self.id_to_event.contains_key(id) { 1 } else { 0 };
                (id.clone(), level)
            })
            .collect();

        let mut visited: HashSet<String> = HashSet::new();
        let mut stack: Vec<(String, usize)> = starts.into_iter().rev().collect();

        while let Some((id, level)) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            let Some(adj) = self.id_to_adjacency.get_mut(&id) else {
                continue;
            };
            adj.level = level;
            if let Some(next) = adj.next_sibling.clone() {
                stack.push((next, level));
            }
            if let Some(child) = adj.first_child.clone() {
                stack.push((child, level + 1));
            }
        }
    }

    // ----- traversal -----

    pub fn size(&self) -> usize {
        self.id_to_event.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_event.is_empty()
    }

    pub fn event(&self, entity_id: &str) -> Option<&ResolverEvent> {
        self.id_to_event.get(entity_id)
    }

    pub fn adjacency(&self, entity_id: &str) -> Option<&Adjacency> {
        self.id_to_adjacency.get(entity_id)
    }

    pub fn children_ids(&self, entity_id: &str) -> &[String] {
        self.id_to_children
            .get(&Some(entity_id.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn children(&self, entity_id: &str) -> Vec<&ResolverEvent> {
        self.children_ids(entity_id)
            .iter()
            .filter_map(|id| self.id_to_event.get(id))
            .collect()
    }

    pub fn roots(&self) -> Vec<&ResolverEvent> {
        self.id_to_children
            .get(&None)
            .into_iter()
            .flatten()
            .filter_map(|id| self.id_to_event.get(id))
            .collect()
    }

    /// `None` when the parent is absent or only a placeholder.
    pub fn parent(&self, entity_id: &str) -> Option<&ResolverEvent> {
        let parent_id = self.id_to_adjacency.get(entity_id)?.parent.as_ref()?;
        self.id_to_event.get(parent_id)
    }

    /// Climbs from the first-seen event until no indexed parent remains.
    pub fn root(&self) -> Option<&ResolverEvent> {
        let first = self.discovery.first()?;
        let mut current = self.id_to_event.get(first)?;
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(first.clone());
        loop {
            let id = current.entity_id();
            let Some(parent) = self.parent(&id) else {
                return Some(current);
            };
            if !seen.insert(parent.entity_id()) {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Breadth-first from `root()`. Each call starts a fresh pass.
    pub fn level_order(&self) -> LevelOrder<'_> {
        let mut queue = VecDeque::new();
        let mut seen = HashSet::new();
        if let Some(root) = self.root() {
            let id = root.entity_id();
            seen.insert(id.clone());
            queue.push_back(id);
        }
        LevelOrder {
            tree: self,
            queue,
            seen,
        }
    }

    pub fn next_sibling(&self, entity_id: &str) -> Option<&ResolverEvent> {
        let next = self.id_to_adjacency.get(entity_id)?.next_sibling.as_ref()?;
        self.id_to_event.get(next)
    }

    pub fn node_level(&self, entity_id: &str) -> Option<usize> {
        self.id_to_adjacency.get(entity_id).map(|adj| adj.level)
    }
}

pub struct LevelOrder<'a> {
    tree: &'a IndexedProcessTree,
    queue: VecDeque<String>,
    seen: HashSet<String>,
}

impl<'a> Iterator for LevelOrder<'a> {
    type Item = &'a ResolverEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        while let Some(id) = self.queue.pop_front() {
            for child in tree.children_ids(&id) {
                if self.seen.insert(child.clone()) {
                    self.queue.push_back(child.clone());
                }
            }
            if let Some(event) = tree.id_to_event.get(&id) {
                return Some(event);
            }
        }
        None
    }
}
