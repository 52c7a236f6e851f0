//! Conversion between coordinate notation (`e2e4`, `e7e8q`) and
//! `cozy_chess::Move`.

use cozy_chess::{File, Move, Piece, Rank, Square};

/// Parse a coordinate move. Null moves (`0000`, `(none)`) and anything
/// malformed give `None`.
pub fn parse_uci_move(s: &str) -> Option<Move> {
    let bytes = s.as_bytes();
    if !(4..=5).contains(&bytes.len()) {
        return None;
    }

    let from = parse_square(bytes[0], bytes[1])?;
    let to = parse_square(bytes[2], bytes[3])?;
    let promotion = match bytes.get(4) {
        None => None,
        Some(b'q') => Some(Piece::Queen),
        Some(b'r') => Some(Piece::Rook),
        Some(b'b') => Some(Piece::Bishop),
        Some(b'n') => Some(Piece::Knight),
        Some(_) => return None,
    };

    Some(Move {
        from,
        to,
        promotion,
    })
}

fn parse_square(file: u8, rank: u8) -> Option<Square> {
    let file = *File::ALL.get(file.checked_sub(b'a')? as usize)?;
    let rank = *Rank::ALL.get(rank.checked_sub(b'1')? as usize)?;
    Some(Square::new(file, rank))
}

/// Format a move for the wire.
pub fn format_uci_move(mv: &Move) -> String {
    let mut s = String::with_capacity(5);
    push_square(&mut s, mv.from);
    push_square(&mut s, mv.to);
    match mv.promotion {
        Some(Piece::Queen) => s.push('q'),
        Some(Piece::Rook) => s.push('r'),
        Some(Piece::Bishop) => s.push('b'),
        Some(Piece::Knight) => s.push('n'),
        _ => {}
    }
    s
}

fn push_square(s: &mut String, sq: Square) {
    s.push((b'a' + sq.file() as u8) as char);
    s.push((b'1' + sq.rank() as u8) as char);
}

/// Join moves into the space-separated list used by `position ... moves`.
pub fn format_move_list(moves: &[Move]) -> String {
    moves
        .iter()
        .map(format_uci_move)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_move() {
        let mv = parse_uci_move("e2e4").unwrap();
        assert_eq!(mv.from, Square::new(File::E, Rank::Second));
        assert_eq!(mv.to, Square::new(File::E, Rank::Fourth));
        assert_eq!(mv.promotion, None);
    }

    #[test]
    fn test_parse_promotion() {
        let mv = parse_uci_move("a7a8n").unwrap();
        assert_eq!(mv.promotion, Some(Piece::Knight));
        assert_eq!(format_uci_move(&mv), "a7a8n");
    }

    #[test]
    fn test_parse_rejects_null_and_garbage() {
        assert_eq!(parse_uci_move("0000"), None);
        assert_eq!(parse_uci_move("(none)"), None);
        assert_eq!(parse_uci_move("e2e9"), None);
        assert_eq!(parse_uci_move("e7e8k"), None);
        assert_eq!(parse_uci_move("e2"), None);
    }

    #[test]
    fn test_format_move_list() {
        let moves: Vec<Move> = ["e2e4", "e7e5", "g1f3"]
            .iter()
            .filter_map(|s| parse_uci_move(s))
            .collect();
        assert_eq!(format_move_list(&moves), "e2e4 e7e5 g1f3");
        assert_eq!(format_move_list(&[]), "");
    }
}
