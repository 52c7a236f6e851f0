use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::parser::UciMessage;
use crate::events::Event;

/// The type of an engine option, as advertised after `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Check,
    Spin,
    Combo,
    Button,
    String,
    /// Vendor-specific type names are kept verbatim.
    Other(std::string::String),
}

impl From<&str> for OptionKind {
    fn from(s: &str) -> Self {
        match s {
            "check" => OptionKind::Check,
            "spin" => OptionKind::Spin,
            "combo" => OptionKind::Combo,
            "button" => OptionKind::Button,
            "string" => OptionKind::String,
            other => OptionKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::Check => f.write_str("check"),
            OptionKind::Spin => f.write_str("spin"),
            OptionKind::Combo => f.write_str("combo"),
            OptionKind::Button => f.write_str("button"),
            OptionKind::String => f.write_str("string"),
            OptionKind::Other(name) => f.write_str(name),
        }
    }
}

/// An engine option. Values and bounds are kept as the engine spelled them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionDescriptor {
    pub kind: OptionKind,
    pub default: Option<String>,
    /// Current value; starts at `default` and follows `set_option`.
    pub value: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    /// Choices of a combo option, in advertised order.
    pub vars: Vec<String>,
}

impl OptionDescriptor {
    pub fn new(kind: OptionKind) -> Self {
        Self {
            kind,
            default: None,
            value: None,
            min: None,
            max: None,
            vars: Vec::new(),
        }
    }
}

/// A parsed `bestmove` line. Moves are coordinate strings (`e2e4`, `e7e8q`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestMove {
    pub mv: String,
    pub ponder: Option<String>,
}

impl BestMove {
    /// The best move as a board move, if it is one (`(none)` and `0000` are not).
    pub fn to_move(&self) -> Option<cozy_chess::Move> {
        super::moves::parse_uci_move(&self.mv)
    }

    pub fn ponder_move(&self) -> Option<cozy_chess::Move> {
        self.ponder.as_deref().and_then(super::moves::parse_uci_move)
    }
}

/// Everything learned from the engine since the last `uci` handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub uciok: bool,
    pub readyok: bool,
    pub id_name: Option<String>,
    pub id_author: Option<String>,
    pub options: BTreeMap<String, OptionDescriptor>,
    /// Raw `info` lines in arrival order.
    pub info_lines: Vec<String>,
    pub best_move: Option<String>,
    pub ponder_move: Option<String>,
    /// Set once `uci` has been sent; a banner only counts as a handshake
    /// before that.
    #[serde(skip)]
    pub(crate) uci_requested: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn option(&self, name: &str) -> Option<&OptionDescriptor> {
        self.options.get(name)
    }

    pub fn last_info(&self) -> Option<&str> {
        self.info_lines.last().map(String::as_str)
    }

    pub fn last_best_move(&self) -> Option<BestMove> {
        self.best_move.as_ref().map(|mv| BestMove {
            mv: mv.clone(),
            ponder: self.ponder_move.clone(),
        })
    }

    /// Fold one parsed message into the state and return the events it fires.
    ///
    /// [`UciMessage::Abort`] is not handled here: it targets the session's
    /// liveness, not its state.
    pub fn apply(&mut self, message: UciMessage) -> Vec<Event> {
        match message {
            UciMessage::UciOk => {
                self.uciok = true;
                vec![Event::UciOk]
            }
            UciMessage::Banner { name } => {
                self.id_name = Some(name.clone());
                let mut events = vec![Event::IdName(name)];
                if !self.uci_requested && !self.uciok {
                    self.uciok = true;
                    events.push(Event::UciOk);
                }
                events
            }
            UciMessage::IdName(name) => {
                self.id_name = Some(name.clone());
                vec![Event::IdName(name)]
            }
            UciMessage::IdAuthor(author) => {
                self.id_author = Some(author.clone());
                vec![Event::IdAuthor(author)]
            }
            UciMessage::Option { name, descriptor } => {
                self.options.insert(name.clone(), descriptor.clone());
                vec![Event::Option { name, descriptor }]
            }
            UciMessage::ReadyOk => {
                self.readyok = true;
                vec![Event::ReadyOk]
            }
            UciMessage::Info(line) => {
                self.info_lines.push(line.clone());
                vec![Event::Info(line)]
            }
            UciMessage::BestMove(best) => {
                self.best_move = Some(best.mv.clone());
                self.ponder_move = best.ponder.clone();
                vec![Event::BestMove(best)]
            }
            UciMessage::Abort | UciMessage::Unknown => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parser::parse_line;

    fn feed(state: &mut SessionState, line: &str) -> Vec<Event> {
        let message = parse_line(line, state.id_name.is_some());
        state.apply(message)
    }

    #[test]
    fn test_handshake_lines_fill_state() {
        let mut state = SessionState::new();
        state.uci_requested = true;
        feed(&mut state, "id name Foo 1.0");
        feed(&mut state, "id author Bar");
        feed(&mut state, "option name Hash type spin default 16 min 1 max 33554432");
        let events = feed(&mut state, "uciok");

        assert_eq!(events, vec![Event::UciOk]);
        assert!(state.uciok);
        assert_eq!(state.id_name.as_deref(), Some("Foo 1.0"));
        assert_eq!(state.id_author.as_deref(), Some("Bar"));
        let hash = state.option("Hash").unwrap();
        assert_eq!(hash.kind, OptionKind::Spin);
        assert_eq!(hash.value.as_deref(), Some("16"));
    }

    #[test]
    fn test_option_overwrites_previous_descriptor() {
        let mut state = SessionState::new();
        feed(&mut state, "option name Threads type spin default 1 min 1 max 8");
        feed(&mut state, "option name Threads type spin default 2 min 1 max 512");
        assert_eq!(state.options.len(), 1);
        assert_eq!(state.option("Threads").unwrap().max.as_deref(), Some("512"));
    }

    #[test]
    fn test_banner_before_uci_counts_as_handshake() {
        let mut state = SessionState::new();
        let events = feed(&mut state, "Stockfish 16 by the Stockfish developers (see AUTHORS file)");
        assert_eq!(
            events,
            vec![Event::IdName("Stockfish 16".to_string()), Event::UciOk]
        );
        assert!(state.uciok);
    }

    #[test]
    fn test_banner_after_uci_only_names() {
        let mut state = SessionState::new();
        state.uci_requested = true;
        let events = feed(&mut state, "Stockfish 16 by the Stockfish developers");
        assert_eq!(events, vec![Event::IdName("Stockfish 16".to_string())]);
        assert!(!state.uciok);
    }

    #[test]
    fn test_id_name_replaces_banner_name() {
        let mut state = SessionState::new();
        feed(&mut state, "Stockfish 16 by the Stockfish developers");
        feed(&mut state, "id name Stockfish 16.1");
        assert_eq!(state.id_name.as_deref(), Some("Stockfish 16.1"));
    }

    #[test]
    fn test_info_lines_accumulate_verbatim() {
        let mut state = SessionState::new();
        feed(&mut state, "info depth 1 score cp 20");
        feed(&mut state, "info  string  two  spaces");
        assert_eq!(
            state.info_lines,
            vec!["info depth 1 score cp 20", "info  string  two  spaces"]
        );
        assert_eq!(state.last_info(), Some("info  string  two  spaces"));
    }

    #[test]
    fn test_bestmove_sets_move_and_ponder() {
        let mut state = SessionState::new();
        feed(&mut state, "bestmove e2e4 ponder e7e5");
        assert_eq!(state.best_move.as_deref(), Some("e2e4"));
        assert_eq!(state.ponder_move.as_deref(), Some("e7e5"));

        feed(&mut state, "bestmove d2d4");
        assert_eq!(state.best_move.as_deref(), Some("d2d4"));
        assert_eq!(state.ponder_move, None);
    }

    #[test]
    fn test_best_move_converts_to_board_move() {
        let best = BestMove {
            mv: "e7e8q".to_string(),
            ponder: Some("(none)".to_string()),
        };
        let mv = best.to_move().unwrap();
        assert_eq!(mv.promotion, Some(cozy_chess::Piece::Queen));
        assert_eq!(best.ponder_move(), None);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = SessionState::new();
        feed(&mut state, "id name Foo");
        feed(&mut state, "readyok");
        feed(&mut state, "bestmove e2e4");
        state.reset();
        assert_eq!(state, SessionState::new());
    }

    #[test]
    fn test_unknown_lines_leave_state_alone() {
        let mut state = SessionState::new();
        state.uci_requested = true;
        let before = state.clone();
        assert!(feed(&mut state, "copyprotection ok").is_empty());
        assert!(feed(&mut state, "").is_empty());
        assert_eq!(state, before);
    }
}
