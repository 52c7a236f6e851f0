pub mod info;
pub mod moves;
pub mod parser;
pub mod state;

pub use info::{EngineInfo, Score, ScoreBound};
pub use moves::{format_move_list, format_uci_move, parse_uci_move};
pub use parser::{parse_line, UciMessage, ABORT_SENTINEL};
pub use state::{BestMove, OptionDescriptor, OptionKind, SessionState};
