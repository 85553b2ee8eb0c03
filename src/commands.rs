//! `workspace/executeCommand` handlers for list items.
//!
//! A list item is its marker line plus every following line indented deeper
//! than the marker (blank lines inside the item included, trailing blank
//! lines not). Moving swaps an item with its neighbouring sibling at the
//! same indentation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tower_lsp::lsp_types::{Position, Range, TextEdit, Url};

pub const MOVE_LIST_ITEM_UP: &str = "notedown.moveListItemUp";
pub const MOVE_LIST_ITEM_DOWN: &str = "notedown.moveListItemDown";
pub const GET_LIST_ITEM_BOUNDARIES: &str = "notedown.getListItemBoundaries";

pub const COMMANDS: &[&str] = &[MOVE_LIST_ITEM_UP, MOVE_LIST_ITEM_DOWN, GET_LIST_ITEM_BOUNDARIES];

static LIST_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*(?:[-*+]|\d+[.)])(?:[ \t]|$)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemBoundaries {
    pub start_line: u32,
    pub end_line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItemMove {
    pub edit: TextEdit,
    /// Where the moved item starts after the edit
    pub new_start_line: u32,
}

/// `[uri, line]` command arguments.
pub fn parse_arguments(arguments: &[JsonValue]) -> Option<(Url, u32)> {
    let uri = Url::parse(arguments.first()?.as_str()?).ok()?;
    let line = u32::try_from(arguments.get(1)?.as_u64()?).ok()?;
    Some((uri, line))
}

fn indent_of(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn is_item(line: &str) -> bool {
    LIST_ITEM_RE.is_match(line)
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Last line belonging to the item that starts at `start`.
fn block_end(lines: &[&str], start: usize) -> usize {
    let indent = indent_of(lines[start]);
    let mut end = start;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        if is_blank(line) {
            continue;
        }
        if indent_of(line) > indent {
            end = i;
        } else {
            break;
        }
    }
    end
}

/// Innermost list item containing `line`, as `(start, end)`.
fn item_at(lines: &[&str], line: usize) -> Option<(usize, usize)> {
    if line >= lines.len() {
        return None;
    }

    (0..=line)
        .rev()
        .filter(|&start| is_item(lines[start]))
        .map(|start| (start, block_end(lines, start)))
        .find(|&(_, end)| end >= line)
}

fn previous_sibling(lines: &[&str], start: usize) -> Option<usize> {
    let indent = indent_of(lines[start]);
    for p in (0..start).rev() {
        let line = lines[p];
        if is_blank(line) {
            continue;
        }
        match indent_of(line) {
            i if i > indent => continue,
            i if i == indent && is_item(line) => return Some(p),
            _ => return None,
        }
    }
    None
}

fn next_sibling(lines: &[&str], end: usize, indent: usize) -> Option<usize> {
    let next = (end + 1..lines.len()).find(|&i| !is_blank(lines[i]))?;
    (indent_of(lines[next]) == indent && is_item(lines[next])).then_some(next)
}

pub fn list_item_boundaries(text: &str, line: u32) -> Option<ListItemBoundaries> {
    let lines: Vec<&str> = text.lines().collect();
    let (start, end) = item_at(&lines, line as usize)?;

    Some(ListItemBoundaries {
        start_line: start as u32,
        end_line: end as u32,
    })
}

/// Swaps the item at `line` with its previous or next sibling. `None` when
/// there is no item or no sibling in that direction.
pub fn move_list_item(text: &str, line: u32, direction: Direction) -> Option<ListItemMove> {
    let lines: Vec<&str> = text.lines().collect();
    let (start, end) = item_at(&lines, line as usize)?;

    // first block, gap, second block; the two blocks trade places
    let (first, second, new_start_line) = match direction {
        Direction::Up => {
            let p = previous_sibling(&lines, start)?;
            ((p, block_end(&lines, p)), (start, end), p)
        }
        Direction::Down => {
            let q = next_sibling(&lines, end, indent_of(lines[start]))?;
            let q_end = block_end(&lines, q);
            ((start, end), (q, q_end), start + q_end - end)
        }
    };

    let mut reordered: Vec<&str> = Vec::with_capacity(second.1 - first.0 + 1);
    reordered.extend(&lines[second.0..=second.1]);
    reordered.extend(&lines[first.1 + 1..second.0]);
    reordered.extend(&lines[first.0..=first.1]);

    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let last = second.1;

    Some(ListItemMove {
        edit: TextEdit {
            range: Range {
                start: Position {
                    line: first.0 as u32,
                    character: 0,
                },
                end: Position {
                    line: last as u32,
                    character: lines[last].chars().count() as u32,
                },
            },
            new_text: reordered.join(newline),
        },
        new_start_line: new_start_line as u32,
    })
}
