use crate::core::models::ids::ElementId;
use indexmap::IndexMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Nodes,
    Connectors,
    AnchorNodes,
    LinkedConnectors,
    ConnectedObjs,
    Coordinates,
    Attributes,
    Representation,
    Formula,
    Parent,
    Owner,
    Id,
    References,
    Info,
    /// Summary signal raised on an element and each of its ancestors after a structural change.
    Structure,
}

impl ChangeKind {
    /// Whether a change of this kind also raises [`ChangeKind::Structure`] up the parent chain.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            Self::Nodes
                | Self::Connectors
                | Self::AnchorNodes
                | Self::LinkedConnectors
                | Self::ConnectedObjs
                | Self::Coordinates
                | Self::Attributes
                | Self::Representation
                | Self::Formula
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    /// The element the observer is being told about.
    pub target: ElementId,
    pub kind: ChangeKind,
    /// The element whose property actually changed.
    pub origin: ElementId,
}

pub type ChangeCallback = Box<dyn FnMut(&ChangeEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Observer list with update brackets.
///
/// Inside a bracket events are queued and coalesced per `(target, kind)`, keeping the origin of
/// the first occurrence, and delivered in first-raised order once the outermost bracket closes.
#[derive(Default)]
pub struct ChangeNotifier {
    observers: Vec<(SubscriptionId, ChangeCallback)>,
    next_subscription: u64,
    depth: usize,
    pending: IndexMap<(ElementId, ChangeKind), ElementId>,
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("observers", &self.observers.len())
            .field("depth", &self.depth)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: ChangeCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, callback));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    pub fn is_updating(&self) -> bool {
        self.depth > 0
    }

    pub fn begin_update(&mut self) {
        self.depth += 1;
    }

    pub fn end_update(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.flush();
        }
    }

    #[inline]
    pub fn emit(&mut self, event: ChangeEvent) {
        if self.depth > 0 {
            self.pending
                .entry((event.target, event.kind))
                .or_insert(event.origin);
        } else {
            self.dispatch(&event);
        }
    }

    fn dispatch(&mut self, event: &ChangeEvent) {
        for (_, callback) in &mut self.observers {
            callback(event);
        }
    }

    fn flush(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for ((target, kind), origin) in pending {
            self.dispatch(&ChangeEvent {
                target,
                kind,
                origin,
            });
        }
    }
}
