use std::collections::HashMap;
use crossterm::event::{Event, KeyCode};

// --- SimulatedInput: scripted key presses for headless runs ---
pub struct SimulatedInput {
    events: HashMap<u64, Vec<Event>>,
}

impl SimulatedInput {
    pub fn new(keys: &[(u64, KeyCode)]) -> Self {
        let mut events: HashMap<u64, Vec<Event>> = HashMap::new();
        for &(frame, code) in keys {
            events.entry(frame).or_default().push(Event::Key(code.into()));
        }
        SimulatedInput { events }
    }

    /// Start a round, weave between lanes, pause briefly, then leave.
    pub fn demo_script() -> Self {
        SimulatedInput::new(&[
            (1, KeyCode::Enter),
            (20, KeyCode::Left),
            (40, KeyCode::Left),
            (80, KeyCode::Right),
            (120, KeyCode::Char('p')),
            (150, KeyCode::Char('p')),
            (200, KeyCode::Right),
            (600, KeyCode::Esc),
        ])
    }

    /// Removes and returns every event scripted for `frame_count`.
    pub fn take(&mut self, frame_count: u64) -> Vec<Event> {
        self.events.remove(&frame_count).unwrap_or_default()
    }
}
