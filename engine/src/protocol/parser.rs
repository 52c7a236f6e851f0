use super::state::{BestMove, OptionDescriptor, OptionKind};

/// Control line that aborts any wait in progress. It is never sent by an
/// engine; hosts inject it to unblock a session.
pub const ABORT_SENTINEL: &str = "__uci_engine_abort__";

/// First tokens of the lines the protocol defines. A line starting with one
/// of these is never taken for a banner.
const KEYWORDS: &[&str] = &[
    "id",
    "uciok",
    "readyok",
    "bestmove",
    "copyprotection",
    "registration",
    "info",
    "option",
];

/// Incoming line from a UCI engine, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciMessage {
    Abort,
    UciOk,
    /// A free-form startup line such as `Stockfish 16 by the Stockfish developers`.
    Banner { name: String },
    IdName(String),
    IdAuthor(String),
    Option {
        name: String,
        descriptor: OptionDescriptor,
    },
    ReadyOk,
    /// The whole `info` line, verbatim.
    Info(String),
    BestMove(BestMove),
    Unknown,
}

/// Classify one line from the engine.
///
/// `has_id_name` tells whether a name is already known; the banner fallback
/// only applies while it is not. Malformed lines come back as
/// [`UciMessage::Unknown`].
pub fn parse_line(line: &str, has_id_name: bool) -> UciMessage {
    let line = line.trim();
    if line == ABORT_SENTINEL {
        return UciMessage::Abort;
    }
    if line == "uciok" {
        return UciMessage::UciOk;
    }
    if !has_id_name {
        if let Some(name) = parse_banner(line) {
            return UciMessage::Banner { name };
        }
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["id", "name", _, ..] => UciMessage::IdName(remainder(line, 2).to_string()),
        ["id", "author", _, ..] => UciMessage::IdAuthor(remainder(line, 2).to_string()),
        ["option", rest @ ..] => match parse_option(rest) {
            Some((name, descriptor)) => UciMessage::Option { name, descriptor },
            None => UciMessage::Unknown,
        },
        ["readyok"] => UciMessage::ReadyOk,
        ["info", ..] => UciMessage::Info(line.to_string()),
        ["bestmove", mv] | ["bestmove", mv, "ponder"] => UciMessage::BestMove(BestMove {
            mv: mv.to_string(),
            ponder: None,
        }),
        ["bestmove", mv, "ponder", ponder] => UciMessage::BestMove(BestMove {
            mv: mv.to_string(),
            ponder: Some(ponder.to_string()),
        }),
        _ => UciMessage::Unknown,
    }
}

/// The text after the first `skip` whitespace-separated tokens, with its
/// inner spacing intact.
fn remainder(line: &str, skip: usize) -> &str {
    let mut rest = line;
    for _ in 0..skip {
        rest = rest.trim_start();
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = &rest[end..];
    }
    rest.trim()
}

fn parse_banner(line: &str) -> Option<String> {
    let first = line.split_whitespace().next()?;
    if KEYWORDS.contains(&first) {
        return None;
    }
    let (name, _) = line.split_once(" by ")?;
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Parse the tokens after `option`.
///
/// The name is every token between `name` and `type`. After `type <kind>`,
/// `default`, `min`, `max` and `var` each take exactly one value token.
fn parse_option(tokens: &[&str]) -> Option<(String, OptionDescriptor)> {
    let name_at = tokens.iter().position(|t| *t == "name")?;
    let type_at = name_at + 1 + tokens[name_at + 1..].iter().position(|t| *t == "type")?;
    let name = tokens[name_at + 1..type_at].join(" ");
    if name.is_empty() {
        return None;
    }
    let kind = OptionKind::from(*tokens.get(type_at + 1)?);

    let mut descriptor = OptionDescriptor::new(kind);
    let mut i = type_at + 2;
    while i < tokens.len() {
        let key = tokens[i];
        let slot = match key {
            "default" => &mut descriptor.default,
            "min" => &mut descriptor.min,
            "max" => &mut descriptor.max,
            "var" => {
                if let Some(value) = tokens.get(i + 1) {
                    descriptor.vars.push(value.to_string());
                }
                i += 2;
                continue;
            }
            _ => {
                i += 1;
                continue;
            }
        };
        *slot = tokens.get(i + 1).map(|v| v.to_string());
        i += 2;
    }
    descriptor.value = descriptor.default.clone();

    Some((name, descriptor))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(line: &str) -> (String, OptionDescriptor) {
        match parse_line(line, true) {
            UciMessage::Option { name, descriptor } => (name, descriptor),
            other => panic!("expected option, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_bestmove_with_ponder() {
        assert_eq!(
            parse_line("bestmove e2e4 ponder e7e5", true),
            UciMessage::BestMove(BestMove {
                mv: "e2e4".to_string(),
                ponder: Some("e7e5".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_bestmove_without_ponder() {
        assert_eq!(
            parse_line("bestmove e2e4", true),
            UciMessage::BestMove(BestMove {
                mv: "e2e4".to_string(),
                ponder: None,
            })
        );
        assert_eq!(
            parse_line("bestmove e2e4 ponder ", true),
            UciMessage::BestMove(BestMove {
                mv: "e2e4".to_string(),
                ponder: None,
            })
        );
    }

    #[test]
    fn test_parse_bestmove_other_shapes_ignored() {
        assert_eq!(parse_line("bestmove", true), UciMessage::Unknown);
        assert_eq!(parse_line("bestmove e2e4 e7e5", true), UciMessage::Unknown);
    }

    #[test]
    fn test_parse_option_bounds_round_trip() {
        let (name, descriptor) = option("option name Hash type spin default 16 min 1 max 33554432");
        assert_eq!(name, "Hash");
        assert_eq!(descriptor.kind, OptionKind::Spin);
        assert_eq!(descriptor.default.as_deref(), Some("16"));
        assert_eq!(descriptor.value.as_deref(), Some("16"));
        assert_eq!(descriptor.min.as_deref(), Some("1"));
        assert_eq!(descriptor.max.as_deref(), Some("33554432"));
    }

    #[test]
    fn test_parse_option_multi_word_name() {
        let (name, descriptor) = option("option name Skill Level type spin default 20 min 0 max 20");
        assert_eq!(name, "Skill Level");
        assert_eq!(descriptor.max.as_deref(), Some("20"));
    }

    #[test]
    fn test_parse_option_button_without_values() {
        let (name, descriptor) = option("option name Clear Hash type button");
        assert_eq!(name, "Clear Hash");
        assert_eq!(descriptor.kind, OptionKind::Button);
        assert_eq!(descriptor.default, None);
        assert_eq!(descriptor.value, None);
        assert_eq!(descriptor.min, None);
        assert_eq!(descriptor.max, None);
    }

    #[test]
    fn test_parse_option_combo_vars() {
        let (_, descriptor) =
            option("option name Style type combo default Normal var Solid var Normal var Risky");
        assert_eq!(descriptor.kind, OptionKind::Combo);
        assert_eq!(descriptor.vars, vec!["Solid", "Normal", "Risky"]);
        assert_eq!(descriptor.value.as_deref(), Some("Normal"));
    }

    #[test]
    fn test_parse_option_vendor_kind() {
        let (_, descriptor) = option("option name NNUE type path default nn.bin");
        assert_eq!(descriptor.kind, OptionKind::Other("path".to_string()));
    }

    #[test]
    fn test_parse_option_missing_name_or_type_dropped() {
        assert_eq!(parse_line("option type spin default 1", true), UciMessage::Unknown);
        assert_eq!(parse_line("option name Hash default 16", true), UciMessage::Unknown);
        assert_eq!(parse_line("option name type spin", true), UciMessage::Unknown);
        assert_eq!(parse_line("option name Hash type", true), UciMessage::Unknown);
    }

    #[test]
    fn test_parse_id_keeps_free_text() {
        assert_eq!(
            parse_line("id name Stockfish 16  NNUE", true),
            UciMessage::IdName("Stockfish 16  NNUE".to_string())
        );
        assert_eq!(
            parse_line("  id author the Stockfish developers (see AUTHORS file)\r", true),
            UciMessage::IdAuthor("the Stockfish developers (see AUTHORS file)".to_string())
        );
        assert_eq!(parse_line("id name", true), UciMessage::Unknown);
    }

    #[test]
    fn test_parse_banner_only_without_name() {
        let banner = "Stockfish 16 by the Stockfish developers (see AUTHORS file)";
        assert_eq!(
            parse_line(banner, false),
            UciMessage::Banner {
                name: "Stockfish 16".to_string()
            }
        );
        assert_eq!(parse_line(banner, true), UciMessage::Unknown);
    }

    #[test]
    fn test_parse_banner_never_shadows_protocol_lines() {
        assert_eq!(
            parse_line("id name Engine by Someone", false),
            UciMessage::IdName("Engine by Someone".to_string())
        );
        assert!(matches!(
            parse_line("info string written by hand", false),
            UciMessage::Info(_)
        ));
        assert_eq!(parse_line("readyok", false), UciMessage::ReadyOk);
    }

    #[test]
    fn test_parse_sentinel_and_uciok() {
        assert_eq!(parse_line(ABORT_SENTINEL, false), UciMessage::Abort);
        assert_eq!(parse_line(" uciok ", false), UciMessage::UciOk);
    }

    #[test]
    fn test_parse_info_verbatim() {
        assert_eq!(
            parse_line("info depth 12 score cp 35 nodes 15234 pv e2e4 e7e5", true),
            UciMessage::Info("info depth 12 score cp 35 nodes 15234 pv e2e4 e7e5".to_string())
        );
    }

    #[test]
    fn test_parse_unknown_ignored() {
        assert_eq!(parse_line("registration checking", true), UciMessage::Unknown);
        assert_eq!(parse_line("readyok now", true), UciMessage::Unknown);
    }
}
