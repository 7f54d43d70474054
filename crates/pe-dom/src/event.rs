//! Typed events and the listener registry.

use crate::NodeId;
use core::fmt;

/// User-interaction events the host dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Submit,
    Input,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Submit => "submit",
            Self::Input => "input",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "click" => Some(Self::Click),
            "submit" => Some(Self::Submit),
            "input" => Some(Self::Input),
            _ => None,
        }
    }
}

/// Event payload handed to every listener on the propagation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub target: NodeId,
    pub current_target: NodeId,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    pub fn new(kind: EventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            current_target: target,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Stops bubbling after the current node's listeners have run.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

pub type ListenerId = u64;

type Handler<C> = Box<dyn FnMut(&mut Event, &mut C)>;

struct ListenerEntry<C> {
    id: ListenerId,
    node: NodeId,
    kind: EventKind,
    handler: Handler<C>,
}

/// Listener registry generic over the context handed to handlers.
///
/// The registry lives beside (not inside) the context so a dispatch can lend
/// the context mutably to every handler in turn.
pub struct EventListeners<C> {
    next_id: ListenerId,
    entries: Vec<ListenerEntry<C>>,
}

impl<C> Default for EventListeners<C> {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: Vec::new(),
        }
    }
}

impl<C> fmt::Debug for EventListeners<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("next_id", &self.next_id)
            .field("listeners", &self.entries.len())
            .finish()
    }
}

impl<C> EventListeners<C> {
    pub fn add(
        &mut self,
        node: NodeId,
        kind: EventKind,
        handler: impl FnMut(&mut Event, &mut C) + 'static,
    ) -> ListenerId {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.entries.push(ListenerEntry {
            id,
            node,
            kind,
            handler: Box::new(handler),
        });
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_for(&self, node: NodeId, kind: EventKind) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.node == node && entry.kind == kind)
            .count()
    }

    /// Runs listeners along `path` (target first), each node's listeners in
    /// attachment order.
    pub fn dispatch(&mut self, path: &[NodeId], event: &mut Event, context: &mut C) {
        let kind = event.kind;
        for node in path {
            event.current_target = *node;
            for entry in self
                .entries
                .iter_mut()
                .filter(|entry| entry.node == *node && entry.kind == kind)
            {
                (entry.handler)(event, context);
            }
            if event.propagation_stopped {
                break;
            }
        }
        event.current_target = event.target;
    }
}

#[cfg(test)]
mod tests {
    use super::Event;
    use super::EventKind;
    use super::EventListeners;

    #[test]
    fn fires_in_attachment_order_and_bubbles() {
        let mut listeners: EventListeners<Vec<String>> = EventListeners::default();
        listeners.add(1, EventKind::Submit, |_, log| log.push("first".to_owned()));
        listeners.add(2, EventKind::Submit, |event, log| {
            log.push(format!("parent saw {}", event.target));
        });
        listeners.add(1, EventKind::Submit, |event, log| {
            event.prevent_default();
            log.push("second".to_owned());
        });
        listeners.add(1, EventKind::Click, |_, log| log.push("click".to_owned()));

        let mut log = Vec::new();
        let mut event = Event::new(EventKind::Submit, 1);
        listeners.dispatch(&[1, 2], &mut event, &mut log);

        assert_eq!(log, vec!["first", "second", "parent saw 1"]);
        assert!(event.default_prevented());
        assert_eq!(listeners.count_for(1, EventKind::Submit), 2);
    }

    #[test]
    fn stateful_handlers_keep_their_own_state() {
        let mut listeners: EventListeners<u32> = EventListeners::default();
        for node in [1, 2] {
            let mut seen = false;
            listeners.add(node, EventKind::Submit, move |event, _| {
                if seen {
                    event.prevent_default();
                }
                seen = true;
            });
        }

        let mut sink = 0;
        let outcomes = [1, 1, 2]
            .into_iter()
            .map(|node| {
                let mut event = Event::new(EventKind::Submit, node);
                listeners.dispatch(&[node], &mut event, &mut sink);
                event.default_prevented()
            })
            .collect::<Vec<_>>();
        assert_eq!(outcomes, vec![false, true, false]);
    }

    #[test]
    fn stops_bubbling_and_removes_listeners() {
        let mut listeners: EventListeners<u32> = EventListeners::default();
        listeners.add(1, EventKind::Click, |event, count| {
            *count += 1;
            event.stop_propagation();
        });
        let parent = listeners.add(2, EventKind::Click, |_, count| *count += 10);

        let mut count = 0;
        let mut event = Event::new(EventKind::Click, 1);
        listeners.dispatch(&[1, 2], &mut event, &mut count);
        assert_eq!(count, 1);

        assert!(listeners.remove(parent));
        assert!(!listeners.remove(parent));
        assert_eq!(listeners.len(), 1);
        assert_eq!(EventKind::from_name(" Submit "), Some(EventKind::Submit));
    }
}
