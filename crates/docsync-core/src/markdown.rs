//! Plain-text rendering of Markdown documents for terminal previews.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

const OPTIONS: Options = Options::ENABLE_STRIKETHROUGH
    .union(Options::ENABLE_TABLES)
    .union(Options::ENABLE_TASKLISTS);

/// Render markdown to a plain-text approximation for terminal preview.
///
/// List items keep a `- ` (or `N. `) marker, task items a `[ ]`/`[x]` box and
/// block quotes a `> ` prefix. Everything else is flattened to its text.
pub fn plain_text(source: &str) -> String {
    let mut out = Writer::default();
    // One entry per open list: `Some(n)` for ordered lists, `None` otherwise.
    let mut lists: Vec<Option<u64>> = Vec::new();

    for event in Parser::new_ext(source, OPTIONS) {
        match event {
            Event::Start(Tag::List(start)) => {
                out.newline();
                lists.push(start);
            }
            Event::Start(Tag::Item) => {
                out.newline();
                let depth = lists.len().saturating_sub(1);
                let marker = match lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "- ".to_owned(),
                };
                out.text(&"  ".repeat(depth));
                out.text(&marker);
            }
            Event::Start(Tag::BlockQuote(_)) => out.quote_depth += 1,
            Event::TaskListMarker(checked) => out.text(if checked { "[x] " } else { "[ ] " }),
            Event::Text(text) | Event::Code(text) => out.text(&text),
            Event::SoftBreak | Event::HardBreak => out.newline(),
            Event::Rule => {
                out.newline();
                out.text("---");
                out.newline();
            }
            Event::End(end) => match end {
                TagEnd::List(_) => {
                    lists.pop();
                    out.newline();
                }
                TagEnd::BlockQuote(_) => {
                    out.newline();
                    out.quote_depth = out.quote_depth.saturating_sub(1);
                }
                TagEnd::Paragraph
                | TagEnd::Heading { .. }
                | TagEnd::CodeBlock
                | TagEnd::Item
                | TagEnd::Table
                | TagEnd::TableHead
                | TagEnd::TableRow => out.newline(),
                TagEnd::TableCell => {
                    if !out.at_line_start {
                        out.buf.push('\t');
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    out.buf
}

struct Writer {
    buf: String,
    at_line_start: bool,
    quote_depth: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self {
            buf: String::new(),
            at_line_start: true,
            quote_depth: 0,
        }
    }
}

impl Writer {
    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        // Code blocks arrive as one text event with embedded newlines.
        let mut lines = text.split('\n').peekable();
        while let Some(line) = lines.next() {
            if !line.is_empty() {
                if self.at_line_start {
                    for _ in 0..self.quote_depth {
                        self.buf.push_str("> ");
                    }
                }
                self.buf.push_str(line);
                self.at_line_start = false;
            }
            if lines.peek().is_some() {
                self.newline();
            }
        }
    }

    fn newline(&mut self) {
        if !self.at_line_start {
            self.buf.push('\n');
            self.at_line_start = true;
        }
    }
}
