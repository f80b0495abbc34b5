use std::fmt::Write as _;

use thiserror::Error;

use crate::distance::{Distance, INFINITY_TOKEN};
use crate::MAX_NODES;

/// The five wire messages this overlay exchanges, as a tagged variant with
/// one constructor per message — replacing `node.py`'s dispatch on the first
/// whitespace token of a raw line with a total match over an enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Hello {
        sender: u8,
    },
    InDistance {
        sender: u8,
        distances: [Distance; MAX_NODES],
    },
    DVector {
        sender: u8,
        origin: u8,
        distances: [Distance; MAX_NODES],
        in_neighbors: Vec<u8>,
    },
    Join {
        rid: u8,
        sid: u8,
        pid: u8,
        nid: u8,
    },
    Data {
        sender: u8,
        root: u8,
        payload: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unknown message tag {0:?}")]
    UnknownTag(String),
    #[error("{tag} expected {expected} fields, got {got}")]
    WrongArity {
        tag: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("field {field} in {tag} is not a valid integer: {token:?}")]
    BadInteger {
        tag: &'static str,
        field: &'static str,
        token: String,
    },
    #[error("field {field} in {tag} value {value} is outside [0, {MAX_NODES})")]
    OutOfRange {
        tag: &'static str,
        field: &'static str,
        value: u32,
    },
    #[error("dvector message is missing the 'in-neighbors' keyword")]
    MissingInNeighborsKeyword,
    #[error("empty line")]
    Empty,
}

fn parse_node_id(tag: &'static str, field: &'static str, token: &str) -> Result<u8, CodecError> {
    let value: u32 = token
        .parse()
        .map_err(|_| CodecError::BadInteger { tag, field, token: token.to_string() })?;
    if value as usize >= MAX_NODES {
        return Err(CodecError::OutOfRange { tag, field, value });
    }
    Ok(value as u8)
}

fn parse_distance(tag: &'static str, field: &'static str, token: &str) -> Result<Distance, CodecError> {
    let value: u32 = token
        .parse()
        .map_err(|_| CodecError::BadInteger { tag, field, token: token.to_string() })?;
    if value != INFINITY_TOKEN as u32 && value as usize >= MAX_NODES {
        return Err(CodecError::OutOfRange { tag, field, value });
    }
    Ok(Distance::from_wire(value as u8))
}

fn parse_distance_vector(
    tag: &'static str,
    tokens: &[&str],
) -> Result<[Distance; MAX_NODES], CodecError> {
    if tokens.len() != MAX_NODES {
        return Err(CodecError::WrongArity { tag, expected: "MAX_NODES distances", got: tokens.len() });
    }
    let mut distances = [Distance::INFINITY; MAX_NODES];
    for (slot, token) in distances.iter_mut().zip(tokens) {
        *slot = parse_distance(tag, "distance", token)?;
    }
    Ok(distances)
}

fn join_distances(distances: &[Distance; MAX_NODES]) -> String {
    let mut out = String::new();
    for (i, d) in distances.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write!(out, "{d}").unwrap();
    }
    out
}

impl Message {
    /// Serialise to a single line, without a trailing newline.
    pub fn to_line(&self) -> String {
        match self {
            Message::Hello { sender } => format!("hello {sender}"),
            Message::InDistance { sender, distances } => {
                format!("in-distance {sender} {}", join_distances(distances))
            }
            Message::DVector { sender, origin, distances, in_neighbors } => {
                let neighbors = in_neighbors
                    .iter()
                    .map(u8::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                format!(
                    "dvector {sender} {origin} {} in-neighbors {neighbors}",
                    join_distances(distances)
                )
            }
            Message::Join { rid, sid, pid, nid } => format!("join {rid} {sid} {pid} {nid}"),
            Message::Data { sender, root, payload } => format!("data {sender} {root} {payload}"),
        }
    }

    /// Parse a single line (the trailing newline, if any, is ignored).
    pub fn parse_line(line: &str) -> Result<Message, CodecError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let mut tokens = line.split_whitespace();
        let tag = tokens.next().ok_or(CodecError::Empty)?;
        let rest: Vec<&str> = tokens.collect();
        match tag {
            "hello" => {
                if rest.len() != 1 {
                    return Err(CodecError::WrongArity { tag: "hello", expected: "1", got: rest.len() });
                }
                Ok(Message::Hello { sender: parse_node_id("hello", "sender", rest[0])? })
            }
            "in-distance" => {
                if rest.len() != 1 + MAX_NODES {
                    return Err(CodecError::WrongArity {
                        tag: "in-distance",
                        expected: "1 + MAX_NODES",
                        got: rest.len(),
                    });
                }
                let sender = parse_node_id("in-distance", "sender", rest[0])?;
                let distances = parse_distance_vector("in-distance", &rest[1..])?;
                Ok(Message::InDistance { sender, distances })
            }
            "dvector" => {
                if rest.len() < 2 + MAX_NODES + 1 {
                    return Err(CodecError::WrongArity {
                        tag: "dvector",
                        expected: "sender origin MAX_NODES distances in-neighbors ...",
                        got: rest.len(),
                    });
                }
                let sender = parse_node_id("dvector", "sender", rest[0])?;
                let origin = parse_node_id("dvector", "origin", rest[1])?;
                let distances = parse_distance_vector("dvector", &rest[2..2 + MAX_NODES])?;
                let keyword_idx = 2 + MAX_NODES;
                if rest[keyword_idx] != "in-neighbors" {
                    return Err(CodecError::MissingInNeighborsKeyword);
                }
                let mut in_neighbors = Vec::new();
                for token in &rest[keyword_idx + 1..] {
                    in_neighbors.push(parse_node_id("dvector", "in-neighbor", token)?);
                }
                Ok(Message::DVector { sender, origin, distances, in_neighbors })
            }
            "join" => {
                if rest.len() != 4 {
                    return Err(CodecError::WrongArity { tag: "join", expected: "4", got: rest.len() });
                }
                Ok(Message::Join {
                    rid: parse_node_id("join", "rid", rest[0])?,
                    sid: parse_node_id("join", "sid", rest[1])?,
                    pid: parse_node_id("join", "pid", rest[2])?,
                    nid: parse_node_id("join", "nid", rest[3])?,
                })
            }
            "data" => {
                if rest.len() < 3 {
                    return Err(CodecError::WrongArity { tag: "data", expected: ">= 3", got: rest.len() });
                }
                Ok(Message::Data {
                    sender: parse_node_id("data", "sender", rest[0])?,
                    root: parse_node_id("data", "root", rest[1])?,
                    payload: rest[2..].join(" "),
                })
            }
            other => Err(CodecError::UnknownTag(other.to_string())),
        }
    }
}
