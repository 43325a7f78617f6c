//! Best-effort topic list parsing
//!
//! Generation output that was asked to be "a list" arrives in whatever shape
//! the model felt like producing. The parser tries an ordered chain of
//! strategies and keeps the first one that yields at least one item:
//!
//! 1. [`ListStrategy::LiteralList`]: `['A', "B", 'C']`
//! 2. [`ListStrategy::DelimitedSplit`]: `A, B, C` on a single line
//! 3. [`ListStrategy::LineSplit`]: one topic per line, list markers stripped
//!
//! Results are capped at [`MAX_TOPICS`] items.

/// Number of child topics produced per expansion
pub const MAX_TOPICS: usize = 5;

/// One parse strategy in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStrategy {
    LiteralList,
    DelimitedSplit,
    LineSplit,
}

impl ListStrategy {
    /// Strategies in the order they are attempted
    pub const CHAIN: [ListStrategy; 3] = [
        ListStrategy::LiteralList,
        ListStrategy::DelimitedSplit,
        ListStrategy::LineSplit,
    ];

    /// Apply this strategy alone
    ///
    /// Returns `None` unless at least one non-empty item was produced.
    pub fn apply(self, text: &str) -> Option<Vec<String>> {
        let items = match self {
            ListStrategy::LiteralList => parse_literal_list(text)?,
            ListStrategy::DelimitedSplit => split_delimited(text)?,
            ListStrategy::LineSplit => split_lines(text),
        };

        if items.is_empty() {
            None
        } else {
            Some(items)
        }
    }
}

/// Successful parse result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedList {
    /// Strategy that produced the items
    pub strategy: ListStrategy,
    /// At most [`MAX_TOPICS`] non-empty items
    pub items: Vec<String>,
}

/// Run the strategy chain over `text`
///
/// Returns `None` only when no strategy finds a single item (blank input).
pub fn parse_topic_list(text: &str) -> Option<ParsedList> {
    let text = text.trim();

    ListStrategy::CHAIN.iter().find_map(|&strategy| {
        strategy.apply(text).map(|mut items| {
            items.truncate(MAX_TOPICS);
            ParsedList { strategy, items }
        })
    })
}

/// Render items as a literal list: `['A', 'B']`
///
/// Items are single-quoted; backslashes, single quotes and newlines are
/// escaped so the output parses back with [`ListStrategy::LiteralList`].
pub fn render_list(items: &[String]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| {
            let mut out = String::with_capacity(item.len() + 2);
            out.push('\'');
            for c in item.chars() {
                match c {
                    '\\' => out.push_str("\\\\"),
                    '\'' => out.push_str("\\'"),
                    '\n' => out.push_str("\\n"),
                    c => out.push(c),
                }
            }
            out.push('\'');
            out
        })
        .collect();

    format!("[{}]", quoted.join(", "))
}

fn parse_literal_list(text: &str) -> Option<Vec<String>> {
    let inner = text.strip_prefix('[')?.strip_suffix(']')?;
    let mut chars = inner.chars().peekable();
    let mut items = Vec::new();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let quote = match chars.next() {
            None => break,
            Some(q @ ('\'' | '"')) => q,
            Some(_) => return None,
        };

        let mut item = String::new();
        loop {
            match chars.next()? {
                '\\' => match chars.next()? {
                    'n' => item.push('\n'),
                    't' => item.push('\t'),
                    other => item.push(other),
                },
                c if c == quote => break,
                c => item.push(c),
            }
        }
        items.push(item);

        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return None,
        }
    }

    Some(
        items
            .iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
    )
}

fn split_delimited(text: &str) -> Option<Vec<String>> {
    let non_blank_lines = text.lines().filter(|line| !line.trim().is_empty()).count();
    if non_blank_lines != 1 || !text.contains(',') {
        return None;
    }

    let stripped: String = text.chars().filter(|c| *c != '[' && *c != ']').collect();
    Some(stripped.split(',').filter_map(clean_item).collect())
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim().trim_matches(|c| c == '[' || c == ']' || c == ','))
        .map(strip_list_marker)
        .filter_map(clean_item)
        .collect()
}

/// Drop one leading `-`, `*`, `•`, `1.` or `1)` marker
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim_start();

    for bullet in ['-', '*', '•'] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest;
        }
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(after) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            if after.is_empty() || after.starts_with(char::is_whitespace) {
                return after;
            }
        }
    }

    line
}

fn clean_item(raw: &str) -> Option<String> {
    let item = raw.trim().trim_matches(|c| c == '\'' || c == '"').trim();
    if item.is_empty() {
        None
    } else {
        Some(item.to_string())
    }
}
