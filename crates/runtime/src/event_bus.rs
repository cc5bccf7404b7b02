/// Minimal event type for traceability.
///
/// Sessions emit these instead of linking a logger; the host decides
/// whether they go to a console, an on-screen log, or nowhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEvent {
    /// Round the event belongs to (0 before the first round starts).
    pub round: u32,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<GameEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, round: u32, kind: &'static str, message: impl Into<String>) {
        self.events.push(GameEvent {
            round,
            kind,
            message: message.into(),
        });
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
