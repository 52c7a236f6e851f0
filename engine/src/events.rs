//! Named events and the listener registry that fans them out.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::protocol::{BestMove, OptionDescriptor};

/// Key under which listeners register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    UciOk,
    IdName,
    IdAuthor,
    Option,
    ReadyOk,
    Info,
    BestMove,
    OptionSet,
    Line,
    Eof,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::UciOk => "uciok",
            EventKind::IdName => "id_name",
            EventKind::IdAuthor => "id_author",
            EventKind::Option => "option",
            EventKind::ReadyOk => "readyok",
            EventKind::Info => "info",
            EventKind::BestMove => "bestmove",
            EventKind::OptionSet => "option_set",
            EventKind::Line => "line",
            EventKind::Eof => "eof",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event together with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    UciOk,
    IdName(String),
    IdAuthor(String),
    /// An option the engine advertised.
    Option {
        name: String,
        descriptor: OptionDescriptor,
    },
    ReadyOk,
    /// A raw `info` line.
    Info(String),
    BestMove(BestMove),
    /// An option the caller set through the session.
    OptionSet {
        name: String,
        value: Option<String>,
    },
    /// Every line received from the engine, before it is parsed.
    Line(String),
    /// The engine closed its output. Fired once per session.
    Eof,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::UciOk => EventKind::UciOk,
            Event::IdName(_) => EventKind::IdName,
            Event::IdAuthor(_) => EventKind::IdAuthor,
            Event::Option { .. } => EventKind::Option,
            Event::ReadyOk => EventKind::ReadyOk,
            Event::Info(_) => EventKind::Info,
            Event::BestMove(_) => EventKind::BestMove,
            Event::OptionSet { .. } => EventKind::OptionSet,
            Event::Line(_) => EventKind::Line,
            Event::Eof => EventKind::Eof,
        }
    }
}

pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;
pub type ListenerResult = Result<(), ListenerError>;

type Listener = Box<dyn FnMut(&Event) -> ListenerResult + Send>;

/// Ordered listeners per [`EventKind`].
///
/// A listener that returns an error or panics is logged and skipped; the
/// ones after it still run.
#[derive(Default)]
pub struct CallbackRegistry {
    listeners: HashMap<EventKind, Vec<Listener>>,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<_> = self
            .listeners
            .iter()
            .map(|(kind, list)| (kind.as_str(), list.len()))
            .collect();
        counts.sort();
        f.debug_struct("CallbackRegistry")
            .field("listeners", &counts)
            .finish()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, kind: EventKind, listener: F)
    where
        F: FnMut(&Event) -> ListenerResult + Send + 'static,
    {
        self.listeners
            .entry(kind)
            .or_default()
            .push(Box::new(listener));
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }

    /// Call every listener for `event.kind()` in registration order.
    ///
    /// Returns how many of them failed.
    pub fn emit(&mut self, event: &Event) -> usize {
        let kind = event.kind();
        let Some(listeners) = self.listeners.get_mut(&kind) else {
            return 0;
        };

        let mut failures = 0;
        for (index, listener) in listeners.iter_mut().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::warn!("Listener #{} for '{}' failed: {}", index, kind, e);
                }
                Err(_) => {
                    failures += 1;
                    tracing::warn!("Listener #{} for '{}' panicked", index, kind);
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_listeners_fire_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CallbackRegistry::new();
        for id in 0..3 {
            let seen = seen.clone();
            registry.on(EventKind::ReadyOk, move |_| {
                seen.lock().unwrap().push(id);
                Ok(())
            });
        }

        assert_eq!(registry.emit(&Event::ReadyOk), 0);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_failing_listener_is_isolated() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CallbackRegistry::new();
        registry.on(EventKind::Info, |_| Err("listener broke".into()));
        registry.on(EventKind::Info, |_| panic!("listener panicked"));
        let sink = seen.clone();
        registry.on(EventKind::Info, move |event| {
            if let Event::Info(line) = event {
                sink.lock().unwrap().push(line.clone());
            }
            Ok(())
        });

        let failures = registry.emit(&Event::Info("info depth 1".to_string()));
        assert_eq!(failures, 2);
        assert_eq!(*seen.lock().unwrap(), vec!["info depth 1".to_string()]);
    }

    #[test]
    fn test_only_matching_kind_fires() {
        let seen = Arc::new(Mutex::new(0));
        let mut registry = CallbackRegistry::new();
        let counter = seen.clone();
        registry.on(EventKind::Eof, move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        registry.emit(&Event::UciOk);
        registry.emit(&Event::Eof);
        assert_eq!(*seen.lock().unwrap(), 1);
        assert_eq!(registry.listener_count(EventKind::Eof), 1);
        assert_eq!(registry.listener_count(EventKind::UciOk), 0);
    }

    #[test]
    fn test_event_kind_names() {
        assert_eq!(EventKind::OptionSet.to_string(), "option_set");
        assert_eq!(
            Event::OptionSet {
                name: "Hash".to_string(),
                value: None
            }
            .kind(),
            EventKind::OptionSet
        );
    }
}
