//! Newick tree-description parser
//!
//! Iterative (explicit stack) so deep caterpillar trees cannot overflow the
//! call stack. Supports quoted labels with `''` escapes, `[...]` comments,
//! and optional branch lengths (missing = 0.0).

use crate::error::{GuildError, GuildResult};

/// Node as produced by the parser, before conversion into a flat `PhyloTree`
#[derive(Debug, Clone, Default)]
pub(crate) struct RawNode {
    pub parent: Option<u32>,
    pub length: f64,
    pub label: Option<String>,
    pub children: Vec<u32>,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { bytes: src.as_bytes(), src, pos: 0 }
    }

    fn error(&self, message: impl Into<String>) -> GuildError {
        GuildError::TreeParse { position: self.pos, message: message.into() }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Skip whitespace and bracketed comments
    fn skip_trivia(&mut self) -> GuildResult<()> {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if b == b'[' {
                let start = self.pos;
                match self.src[start..].find(']') {
                    Some(offset) => self.pos = start + offset + 1,
                    None => return Err(self.error("unterminated comment")),
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    fn quoted_label(&mut self) -> GuildResult<String> {
        // opening quote
        self.pos += 1;
        let mut out = String::new();
        loop {
            let rest = &self.src[self.pos..];
            let Some(offset) = rest.find('\'') else {
                return Err(self.error("unterminated quoted label"));
            };
            out.push_str(&rest[..offset]);
            self.pos += offset + 1;
            if self.peek() == Some(b'\'') {
                out.push('\'');
                self.pos += 1;
            } else {
                return Ok(out);
            }
        }
    }

    fn bare_label(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'(' | b')' | b',' | b':' | b';' | b'[') || b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        self.src[start..self.pos].to_string()
    }

    fn number(&mut self) -> GuildResult<f64> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = &self.src[start..self.pos];
        if text.is_empty() {
            return Err(self.error("expected branch length after ':'"));
        }
        text.parse::<f64>().map_err(|_| GuildError::TreeParse {
            position: start,
            message: format!("invalid branch length '{}'", text),
        })
    }
}

fn add_child(nodes: &mut Vec<RawNode>, parent: u32) -> u32 {
    let id = nodes.len() as u32;
    nodes.push(RawNode { parent: Some(parent), ..RawNode::default() });
    nodes[parent as usize].children.push(id);
    id
}

/// Parse a Newick string into raw nodes. Node 0 is the root.
pub(crate) fn parse(src: &str) -> GuildResult<Vec<RawNode>> {
    let mut cur = Cursor::new(src);
    let mut nodes = vec![RawNode::default()];
    let mut open: Vec<u32> = Vec::new();
    let mut current: u32 = 0;
    // label/length already set on `current`
    let mut labelled = false;
    let mut measured = false;

    cur.skip_trivia()?;
    if cur.peek().is_none() {
        return Err(cur.error("empty tree description"));
    }

    loop {
        cur.skip_trivia()?;
        let Some(b) = cur.peek() else { break };
        match b {
            b'(' => {
                if labelled || measured || !nodes[current as usize].children.is_empty() {
                    return Err(cur.error("unexpected '('"));
                }
                cur.pos += 1;
                open.push(current);
                current = add_child(&mut nodes, current);
            }
            b',' => {
                let Some(&parent) = open.last() else {
                    return Err(cur.error("',' outside of a clade"));
                };
                cur.pos += 1;
                current = add_child(&mut nodes, parent);
                labelled = false;
                measured = false;
            }
            b')' => {
                let Some(parent) = open.pop() else {
                    return Err(cur.error("unbalanced ')'"));
                };
                cur.pos += 1;
                current = parent;
                labelled = false;
                measured = false;
            }
            b':' => {
                if measured {
                    return Err(cur.error("node has two branch lengths"));
                }
                cur.pos += 1;
                cur.skip_trivia()?;
                let length = cur.number()?;
                let node = &mut nodes[current as usize];
                if length < 0.0 {
                    return Err(GuildError::NegativeBranchLength {
                        label: node.label.clone().unwrap_or_default(),
                        length,
                    });
                }
                node.length = length;
                measured = true;
            }
            b';' => {
                cur.pos += 1;
                cur.skip_trivia()?;
                if cur.peek().is_some() {
                    return Err(cur.error("trailing characters after ';'"));
                }
                break;
            }
            _ => {
                if labelled || measured {
                    return Err(cur.error("unexpected label"));
                }
                let label = if b == b'\'' { cur.quoted_label()? } else { cur.bare_label() };
                if !label.is_empty() {
                    nodes[current as usize].label = Some(label);
                }
                labelled = true;
            }
        }
    }

    if !open.is_empty() {
        return Err(cur.error(format!("{} unclosed '('", open.len())));
    }

    // Root carries no stem
    nodes[0].length = 0.0;
    Ok(nodes)
}
