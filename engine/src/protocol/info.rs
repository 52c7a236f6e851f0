//! Typed view of `info` lines.
//!
//! The session keeps `info` lines verbatim; this is for callers that want
//! depth, score and principal variation without parsing them themselves.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Score {
    Centipawns(i32),
    /// Moves to mate; negative when the engine is getting mated.
    Mate(i32),
}

/// Whether a score is exact or only a bound from an aspiration window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ScoreBound {
    #[default]
    Exact,
    Lower,
    Upper,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub score: Option<Score>,
    pub bound: ScoreBound,
    /// Principal variation in coordinate notation.
    pub pv: Vec<String>,
    pub currmove: Option<String>,
    pub hashfull: Option<u16>,
    /// Free text after `string`; it runs to the end of the line.
    pub string: Option<String>,
}

const KEYWORDS: &[&str] = &[
    "depth", "seldepth", "time", "nodes", "pv", "multipv", "score", "currmove",
    "currmovenumber", "hashfull", "nps", "tbhits", "sbhits", "cpuload", "string",
    "refutation", "currline",
];

impl EngineInfo {
    /// Parse an `info` line. Unknown keys and unparsable values are skipped.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace().peekable();
        if tokens.next()? != "info" {
            return None;
        }

        let mut info = EngineInfo::default();
        while let Some(key) = tokens.next() {
            match key {
                "depth" => info.depth = tokens.next().and_then(|s| s.parse().ok()),
                "seldepth" => info.seldepth = tokens.next().and_then(|s| s.parse().ok()),
                "time" => info.time_ms = tokens.next().and_then(|s| s.parse().ok()),
                "nodes" => info.nodes = tokens.next().and_then(|s| s.parse().ok()),
                "nps" => info.nps = tokens.next().and_then(|s| s.parse().ok()),
                "hashfull" => info.hashfull = tokens.next().and_then(|s| s.parse().ok()),
                "currmove" => info.currmove = tokens.next().map(str::to_string),
                "score" => {
                    let kind = tokens.next();
                    let value = tokens.next().and_then(|s| s.parse().ok());
                    info.score = match (kind, value) {
                        (Some("cp"), Some(v)) => Some(Score::Centipawns(v)),
                        (Some("mate"), Some(v)) => Some(Score::Mate(v)),
                        _ => None,
                    };
                    match tokens.peek() {
                        Some(&"lowerbound") => {
                            info.bound = ScoreBound::Lower;
                            tokens.next();
                        }
                        Some(&"upperbound") => {
                            info.bound = ScoreBound::Upper;
                            tokens.next();
                        }
                        _ => {}
                    }
                }
                "pv" => {
                    while let Some(mv) = tokens.next_if(|t| !KEYWORDS.contains(t)) {
                        info.pv.push(mv.to_string());
                    }
                }
                "string" => {
                    let rest: Vec<&str> = tokens.by_ref().collect();
                    info.string = Some(rest.join(" "));
                }
                _ => {}
            }
        }

        Some(info)
    }

    pub fn pv_moves(&self) -> Vec<cozy_chess::Move> {
        self.pv
            .iter()
            .filter_map(|mv| super::moves::parse_uci_move(mv))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_info() {
        let info = EngineInfo::parse("info depth 12 score cp 35 nodes 15234 pv e2e4 e7e5").unwrap();
        assert_eq!(info.depth, Some(12));
        assert_eq!(info.score, Some(Score::Centipawns(35)));
        assert_eq!(info.nodes, Some(15234));
        assert_eq!(info.pv, vec!["e2e4", "e7e5"]);
        assert_eq!(info.pv_moves().len(), 2);
    }

    #[test]
    fn test_parse_mate_with_bound() {
        let info = EngineInfo::parse("info depth 20 seldepth 31 score mate -3 upperbound time 812 nps 1200000").unwrap();
        assert_eq!(info.seldepth, Some(31));
        assert_eq!(info.score, Some(Score::Mate(-3)));
        assert_eq!(info.bound, ScoreBound::Upper);
        assert_eq!(info.time_ms, Some(812));
        assert_eq!(info.nps, Some(1_200_000));
    }

    #[test]
    fn test_parse_pv_stops_at_keyword() {
        let info = EngineInfo::parse("info pv d2d4 d7d5 hashfull 37").unwrap();
        assert_eq!(info.pv, vec!["d2d4", "d7d5"]);
        assert_eq!(info.hashfull, Some(37));
    }

    #[test]
    fn test_parse_string_runs_to_end() {
        let info = EngineInfo::parse("info string NNUE evaluation using nn-5af11540bbfe.nnue enabled").unwrap();
        assert_eq!(
            info.string.as_deref(),
            Some("NNUE evaluation using nn-5af11540bbfe.nnue enabled")
        );
    }

    #[test]
    fn test_parse_rejects_other_lines() {
        assert_eq!(EngineInfo::parse("bestmove e2e4"), None);
        assert_eq!(EngineInfo::parse(""), None);
    }

    #[test]
    fn test_parse_tolerates_garbage_values() {
        let info = EngineInfo::parse("info depth x nodes 10 score cp").unwrap();
        assert_eq!(info.depth, None);
        assert_eq!(info.nodes, Some(10));
        assert_eq!(info.score, None);
    }
}
