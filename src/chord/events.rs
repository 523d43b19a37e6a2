use crate::chord::types::Node;
use log::debug;
use tokio::sync::broadcast;

const EVENT_BUFFER: usize = 64;

/// Ring membership changes, consumed by layers that place data on the ring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RingEvent {
    /// This node joined the ring between `predecessor` and `successor`.
    Joined { successor: Node, predecessor: Node },
    /// A newcomer took over as this node's predecessor. Keys in
    /// `(old, new]` now belong to `new`; `old` is `None` when no
    /// predecessor was known.
    PredecessorChanged { old: Option<Node>, new: Node },
    /// `node` left the ring gracefully; `predecessor` inherits its arc.
    Left { node: Node, predecessor: Node },
    SuccessorFailed(Node),
    PredecessorFailed(Node),
}

/// Fan-out of [`RingEvent`]s. Publishing never blocks and never fails; slow
/// subscribers observe `RecvError::Lagged`.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<RingEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender }
    }

    pub fn publish(&self, event: RingEvent) {
        debug!("Ring event: {:?}", event);
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RingEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
