//! The small markdown subset replies are displayed with.
//!
//! Output is structured data rather than HTML, so front-ends build their own
//! nodes and model text can never inject markup.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InlineStyle {
    Plain,
    Bold,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineSpan {
    pub style: InlineStyle,
    pub text: String,
}

impl InlineSpan {
    fn new(style: InlineStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkdownBlock {
    /// Consecutive text lines; line breaks are kept inside the spans.
    Paragraph { spans: Vec<InlineSpan> },
    Heading { level: u8, spans: Vec<InlineSpan> },
    List {
        ordered: bool,
        start: u32,
        items: Vec<Vec<InlineSpan>>,
    },
    /// Fenced block. An unclosed fence runs to the end of the text.
    Code {
        language: Option<String>,
        code: String,
    },
}

/// Splits `**bold**` and `` `code` `` spans out of one run of text.
/// Unclosed or empty markers stay literal.
pub fn parse_inline(text: &str) -> Vec<InlineSpan> {
    let mut spans: Vec<InlineSpan> = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let next_bold = rest.find("**");
        let next_code = rest.find('`');
        let (start, marker, style) = match (next_bold, next_code) {
            (Some(b), Some(c)) if c < b => (c, "`", InlineStyle::Code),
            (Some(b), _) => (b, "**", InlineStyle::Bold),
            (None, Some(c)) => (c, "`", InlineStyle::Code),
            (None, None) => break,
        };

        let after = &rest[start + marker.len()..];
        match after.find(marker) {
            Some(end) if end > 0 => {
                push_plain(&mut spans, &rest[..start]);
                spans.push(InlineSpan::new(style, &after[..end]));
                rest = &after[end + marker.len()..];
            }
            _ => {
                let literal_end = start + marker.len();
                push_plain(&mut spans, &rest[..literal_end]);
                rest = &rest[literal_end..];
            }
        }
    }

    push_plain(&mut spans, rest);
    spans
}

fn push_plain(spans: &mut Vec<InlineSpan>, text: &str) {
    if text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(last) if last.style == InlineStyle::Plain => last.text.push_str(text),
        _ => spans.push(InlineSpan::new(InlineStyle::Plain, text)),
    }
}

/// Groups a whole message into paragraphs, headings, lists and code fences.
pub fn parse_blocks(text: &str) -> Vec<MarkdownBlock> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();

        if let Some(info) = trimmed.strip_prefix("```") {
            flush_paragraph(&mut paragraph, &mut blocks);
            let language = Some(info.trim())
                .filter(|l| !l.is_empty())
                .map(str::to_string);
            let code: Vec<&str> = lines
                .by_ref()
                .take_while(|l| !l.trim_start().starts_with("```"))
                .collect();
            blocks.push(MarkdownBlock::Code {
                language,
                code: code.join("\n"),
            });
        } else if trimmed.is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
        } else if let Some((level, heading)) = heading(trimmed) {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(MarkdownBlock::Heading {
                level,
                spans: parse_inline(heading),
            });
        } else if let Some((ordered, start, item)) = list_item(trimmed) {
            flush_paragraph(&mut paragraph, &mut blocks);
            match blocks.last_mut() {
                Some(MarkdownBlock::List {
                    ordered: same,
                    items,
                    ..
                }) if *same == ordered => items.push(parse_inline(item)),
                _ => blocks.push(MarkdownBlock::List {
                    ordered,
                    start,
                    items: vec![parse_inline(item)],
                }),
            }
        } else {
            paragraph.push(line.trim_end());
        }
    }

    flush_paragraph(&mut paragraph, &mut blocks);
    blocks
}

fn flush_paragraph(lines: &mut Vec<&str>, blocks: &mut Vec<MarkdownBlock>) {
    if lines.is_empty() {
        return;
    }
    blocks.push(MarkdownBlock::Paragraph {
        spans: parse_inline(&lines.join("\n")),
    });
    lines.clear();
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &line[level..];
    if rest.is_empty() {
        Some((level as u8, rest))
    } else {
        rest.strip_prefix(' ').map(|text| (level as u8, text.trim()))
    }
}

fn list_item(line: &str) -> Option<(bool, u32, &str)> {
    for bullet in ["- ", "* ", "+ "] {
        if let Some(item) = line.strip_prefix(bullet) {
            return Some((false, 1, item));
        }
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let item = line[digits..]
        .strip_prefix(". ")
        .or_else(|| line[digits..].strip_prefix(") "))?;
    let start = line[..digits].parse().ok()?;
    Some((true, start, item))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> InlineSpan {
        InlineSpan::new(InlineStyle::Plain, text)
    }

    #[test]
    fn test_inline_bold_and_code() {
        assert_eq!(
            parse_inline("run `cargo test` **now**"),
            vec![
                plain("run "),
                InlineSpan::new(InlineStyle::Code, "cargo test"),
                plain(" "),
                InlineSpan::new(InlineStyle::Bold, "now"),
            ]
        );
    }

    #[test]
    fn test_unclosed_markers_stay_literal() {
        assert_eq!(parse_inline("2 ** 3"), vec![plain("2 ** 3")]);
        assert_eq!(parse_inline("it`s"), vec![plain("it`s")]);
        assert_eq!(parse_inline("****"), vec![plain("****")]);
        assert!(parse_inline("").is_empty());
    }

    #[test]
    fn test_markup_is_kept_as_text() {
        assert_eq!(
            parse_inline("<script>alert(1)</script>"),
            vec![plain("<script>alert(1)</script>")]
        );
    }

    #[test]
    fn test_blocks_of_a_typical_reply() {
        let reply = "# Steps\n\nFirst line\nsecond **line**\n\n- one\n- two\n\n3. three\n4. four\n\n```rust\nfn main() {}\n```\nDone.";

        assert_eq!(
            parse_blocks(reply),
            vec![
                MarkdownBlock::Heading {
                    level: 1,
                    spans: vec![plain("Steps")],
                },
                MarkdownBlock::Paragraph {
                    spans: vec![
                        plain("First line\nsecond "),
                        InlineSpan::new(InlineStyle::Bold, "line"),
                    ],
                },
                MarkdownBlock::List {
                    ordered: false,
                    start: 1,
                    items: vec![vec![plain("one")], vec![plain("two")]],
                },
                MarkdownBlock::List {
                    ordered: true,
                    start: 3,
                    items: vec![vec![plain("three")], vec![plain("four")]],
                },
                MarkdownBlock::Code {
                    language: Some("rust".to_string()),
                    code: "fn main() {}".to_string(),
                },
                MarkdownBlock::Paragraph {
                    spans: vec![plain("Done.")],
                },
            ]
        );
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        assert_eq!(
            parse_blocks("```\nlet x = 1;\nlet y = **2**;"),
            vec![MarkdownBlock::Code {
                language: None,
                code: "let x = 1;\nlet y = **2**;".to_string(),
            }]
        );
    }

    #[test]
    fn test_not_headings_or_lists() {
        let blocks = parse_blocks("#hashtag\n**bold** start\n2024.");
        assert_eq!(blocks.len(), 1);
        assert!(matches!(blocks[0], MarkdownBlock::Paragraph { .. }));
    }

    #[test]
    fn test_block_json_shape() {
        let value = serde_json::to_value(parse_blocks("**Hi**")).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                {"kind": "paragraph", "spans": [{"style": "bold", "text": "Hi"}]}
            ])
        );
    }
}
