//! Markup parser - raw HTML text into a tag arena
//!
//! This is a tolerant, single-pass tokenizer, not an HTML5 tree builder:
//! - Stray end tags are ignored
//! - Elements never closed stay `Open` and end where an ancestor closed
//! - `li`, `p`, `td` and friends end an open sibling of their kind, the way
//!   browsers apply implied end tags
//! - Void elements and `<x/>` are `Single`
//! - Comments become comment nodes, doctypes and processing instructions
//!   are skipped
//! - Raw-text elements (`script`, `style`, ...) take everything up to their
//!   end tag as a single text child

use crate::arena::TagArena;
use crate::types::*;
use crate::utils::{cap_text_length, decode_entities, line_of, line_starts};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Configuration for the markup parser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    pub void_elements: Vec<String>,
    pub raw_text_elements: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            void_elements: VOID_ELEMENTS.iter().map(|s| s.to_string()).collect(),
            raw_text_elements: RAW_TEXT_ELEMENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ParserConfig {
    fn is_void(&self, tag: &str) -> bool {
        self.void_elements.iter().any(|v| v == tag)
    }

    fn is_raw_text(&self, tag: &str) -> bool {
        self.raw_text_elements.iter().any(|r| r == tag)
    }
}

/// Implied end tags: (new tag, open tags it ends, tags that stop the search)
const IMPLIED_END_TAGS: &[(&str, &[&str], &[&str])] = &[
    ("li", &["li"], &["ul", "ol", "menu"]),
    ("dt", &["dt", "dd"], &["dl"]),
    ("dd", &["dt", "dd"], &["dl"]),
    (
        "p",
        &["p"],
        &["div", "li", "td", "th", "table", "button", "section", "article", "blockquote"],
    ),
    ("option", &["option"], &["select", "datalist", "optgroup"]),
    ("optgroup", &["option", "optgroup"], &["select"]),
    ("tr", &["tr", "td", "th"], &["table", "thead", "tbody", "tfoot"]),
    ("td", &["td", "th"], &["tr", "table"]),
    ("th", &["td", "th"], &["tr", "table"]),
];

/// A start tag as read from the source
struct StartTag {
    name: String,
    attributes: Vec<(String, String)>,
    self_closing: bool,
    /// Byte offset just past the closing `>`
    end: usize,
}

/// An element waiting for its end tag
struct OpenElement {
    node_id: NodeId,
    start: usize,
}

pub struct MarkupParser<'a> {
    config: &'a ParserConfig,
    source: &'a str,
    shared: SourceText,
    line_starts: Vec<usize>,
    arena: TagArena,
    stack: Vec<OpenElement>,
}

impl<'a> MarkupParser<'a> {
    pub fn new(config: &'a ParserConfig, source: &'a str) -> Self {
        Self {
            config,
            source,
            shared: SourceText::new(source),
            line_starts: line_starts(source),
            arena: TagArena::with_capacity(source.len() / 16),
            stack: Vec::new(),
        }
    }

    /// Parse the whole source. Never fails: malformed markup degrades to text.
    pub fn parse(mut self) -> TagArena {
        let source = self.source;
        let bytes = source.as_bytes();
        let mut text_start = 0;
        let mut cursor = 0;

        while let Some(offset) = source[cursor..].find('<') {
            let lt = cursor + offset;
            let rest = &source[lt..];

            if rest.starts_with("<!--") {
                self.push_text(text_start, lt);
                let end = rest[4..]
                    .find("-->")
                    .map(|i| lt + 4 + i + 3)
                    .unwrap_or(source.len());
                self.push_comment(lt, end);
                cursor = end;
                text_start = end;
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.push_text(text_start, lt);
                let end = rest.find('>').map(|i| lt + i + 1).unwrap_or(source.len());
                cursor = end;
                text_start = end;
            } else if rest.starts_with("</")
                && bytes.get(lt + 2).map_or(false, |b| b.is_ascii_alphabetic())
            {
                self.push_text(text_start, lt);
                let end = rest.find('>').map(|i| lt + i + 1).unwrap_or(source.len());
                let name = read_name(&source[lt + 2..end]);
                self.close_element(&name, lt, end);
                cursor = end;
                text_start = end;
            } else if bytes.get(lt + 1).map_or(false, |b| b.is_ascii_alphabetic()) {
                match read_start_tag(source, lt) {
                    Some(tag) => {
                        self.push_text(text_start, lt);
                        let end = self.open_element(tag, lt);
                        cursor = end;
                        text_start = end;
                    }
                    None => {
                        // Unterminated tag: the rest of the source is text
                        cursor = source.len();
                    }
                }
            } else {
                // A lone '<' is text
                cursor = lt + 1;
            }
        }

        self.push_text(text_start, source.len());

        for open in std::mem::take(&mut self.stack).into_iter().rev() {
            self.finish_open(open, source.len());
        }

        debug!("Parsed markup into {} nodes", self.arena.len());
        self.arena
    }

    fn current_parent(&self) -> NodeId {
        self.stack.last().map(|open| open.node_id).unwrap_or(ROOT_ID)
    }

    fn line(&self, offset: usize) -> u32 {
        line_of(&self.line_starts, offset)
    }

    fn append(&mut self, node: ParsedTag) -> NodeId {
        let parent = self.current_parent();
        // The parent is always a node this parser created
        self.arena
            .append_child(parent, node)
            .unwrap_or(ROOT_ID)
    }

    fn push_text(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let mut node = ParsedTag::new(0, NodeKind::Text, "#text".to_string(), self.line(start));
        node.set_markup(&self.shared, start..end);
        self.append(node);
    }

    fn push_comment(&mut self, start: usize, end: usize) {
        let mut node = ParsedTag::new(
            0,
            NodeKind::Comment,
            "#comment".to_string(),
            self.line(start),
        );
        node.set_markup(&self.shared, start..end);
        self.append(node);
    }

    /// Create the element for `tag`; returns the offset parsing resumes at
    fn open_element(&mut self, tag: StartTag, start: usize) -> usize {
        self.close_implied(&tag.name, start);

        let mut node = ParsedTag::new(0, NodeKind::Element, tag.name.clone(), self.line(start));
        node.set_markup(&self.shared, start..tag.end);
        for (key, value) in tag.attributes {
            // First occurrence wins
            if !node.attributes.iter().any(|(existing, _)| *existing == key) {
                node.attributes.push((key, value));
            }
        }

        if tag.self_closing || self.config.is_void(&tag.name) {
            node.status = TagStatus::Single;
            self.append(node);
            return tag.end;
        }

        node.status = TagStatus::Open;
        let node_id = self.append(node);

        if self.config.is_raw_text(&tag.name) {
            return self.read_raw_text(node_id, &tag.name, start, tag.end);
        }

        self.stack.push(OpenElement { node_id, start });
        tag.end
    }

    /// End open elements that a `<name>` start tag implicitly closes
    fn close_implied(&mut self, name: &str, start: usize) {
        let Some((_, ends, boundaries)) = IMPLIED_END_TAGS.iter().find(|(tag, _, _)| *tag == name)
        else {
            return;
        };

        let mut close_from = None;
        for (depth, open) in self.stack.iter().enumerate().rev() {
            let Ok(node) = self.arena.get(open.node_id) else {
                break;
            };
            let open_name = node.tag_name.as_str();
            if ends.contains(&open_name) {
                close_from = Some(depth);
            } else if boundaries.contains(&open_name) {
                break;
            }
        }

        if let Some(depth) = close_from {
            for open in self.stack.split_off(depth).into_iter().rev() {
                self.finish_open(open, start);
            }
        }
    }

    /// Body of a raw-text element up to its end tag, as one text child
    fn read_raw_text(&mut self, node_id: NodeId, name: &str, start: usize, body: usize) -> usize {
        let closing = format!("</{}", name);
        let close_at = find_ignore_ascii_case(&self.source[body..], &closing).map(|i| body + i);

        self.stack.push(OpenElement { node_id, start });
        match close_at {
            Some(lt) => {
                self.push_text(body, lt);
                let end = self.source[lt..]
                    .find('>')
                    .map(|i| lt + i + 1)
                    .unwrap_or(self.source.len());
                self.close_element(name, lt, end);
                end
            }
            None => {
                self.push_text(body, self.source.len());
                self.source.len()
            }
        }
    }

    /// Handle `</name>` spanning `start..end`
    fn close_element(&mut self, name: &str, start: usize, end: usize) {
        let Some(depth) = self.stack.iter().rposition(|open| {
            self.arena
                .get(open.node_id)
                .map(|node| node.tag_name == name)
                .unwrap_or(false)
        }) else {
            trace!(
                "Ignoring stray end tag at line {}: {}",
                self.line(start),
                cap_text_length(&self.source[start..end], 40)
            );
            return;
        };

        // Anything opened inside and never closed ends where the ancestor does
        for open in self.stack.split_off(depth + 1).into_iter().rev() {
            self.finish_open(open, start);
        }

        if let Some(open) = self.stack.pop() {
            if let Ok(node) = self.arena.get_mut(open.node_id) {
                node.status = TagStatus::Closed;
                node.span = open.start..end;
            }
        }
    }

    fn finish_open(&mut self, open: OpenElement, end: usize) {
        if let Ok(node) = self.arena.get_mut(open.node_id) {
            trace!("Element <{}> left open", node.tag_name);
            node.status = TagStatus::Open;
            node.span = open.start..end;
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

/// Lower-cased element name at the start of `text`
fn read_name(text: &str) -> String {
    text.chars()
        .take_while(|&c| is_name_char(c))
        .collect::<String>()
        .to_ascii_lowercase()
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

/// Read a start tag beginning at `lt`. None if the source ends inside it.
fn read_start_tag(source: &str, lt: usize) -> Option<StartTag> {
    let bytes = source.as_bytes();
    let name = read_name(&source[lt + 1..]);
    let mut i = lt + 1 + name.len();
    let mut attributes = Vec::new();

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match *bytes.get(i)? {
            b'>' => {
                return Some(StartTag {
                    name,
                    attributes,
                    self_closing: false,
                    end: i + 1,
                })
            }
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                return Some(StartTag {
                    name,
                    attributes,
                    self_closing: true,
                    end: i + 2,
                })
            }
            b'/' => {
                i += 1;
                continue;
            }
            _ => {}
        }

        let key_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        if i == key_start {
            // Lone '=' with no name
            i += 1;
            continue;
        }
        let key = source[key_start..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) != Some(&b'=') {
            attributes.push((key, String::new()));
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let value = match *bytes.get(i)? {
            quote @ (b'"' | b'\'') => {
                let close = source[i + 1..].find(quote as char)? + i + 1;
                let value = &source[i + 1..close];
                i = close + 1;
                value
            }
            _ => {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                &source[value_start..i]
            }
        };
        attributes.push((key, decode_entities(value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(markup: &str) -> TagArena {
        MarkupParser::new(&ParserConfig::default(), markup).parse()
    }

    fn elements(arena: &TagArena) -> Vec<&ParsedTag> {
        arena.iter().filter(|n| n.is_element()).collect()
    }

    #[test]
    fn test_nesting_and_raw_markup() {
        let arena = parse("<div><p>A</p><p>B</p></div>");
        let tags = elements(&arena);

        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].raw_markup(), "<div><p>A</p><p>B</p></div>");
        assert_eq!(tags[1].raw_markup(), "<p>A</p>");
        assert_eq!(tags[1].status, TagStatus::Closed);
        assert_eq!(tags[2].parent_id, Some(tags[0].node_id));
    }

    #[test]
    fn test_attributes() {
        let arena = parse(
            r#"<input Type="text" name='q' data-x=1 disabled value="a &amp; b" type="dup">"#,
        );
        let input = elements(&arena)[0];

        assert_eq!(input.status, TagStatus::Single);
        assert_eq!(input.attr("type"), Some("text"));
        assert_eq!(input.attr("NAME"), Some("q"));
        assert_eq!(input.attr("data-x"), Some("1"));
        assert_eq!(input.attr("disabled"), Some(""));
        assert_eq!(input.attr("value"), Some("a & b"));

        let keys: Vec<_> = input.attributes.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["type", "name", "data-x", "disabled", "value"]);
    }

    #[test]
    fn test_self_closing_and_void() {
        let arena = parse("<p>Hello<br/>there<img src=a.png></p><widget/>");
        let tags = elements(&arena);

        assert_eq!(tags[1].tag_name, "br");
        assert_eq!(tags[1].status, TagStatus::Single);
        assert_eq!(tags[2].raw_markup(), "<img src=a.png>");
        assert_eq!(tags[2].attr("src"), Some("a.png"));
        assert_eq!(tags[3].tag_name, "widget");
        assert_eq!(tags[3].status, TagStatus::Single);
    }

    #[test]
    fn test_unclosed_elements() {
        let arena = parse("<div><b>bold<i>both</div><span>tail");
        let tags = elements(&arena);

        let div = tags[0];
        assert_eq!(div.status, TagStatus::Closed);
        let b = tags[1];
        assert_eq!(b.status, TagStatus::Open);
        assert_eq!(b.raw_markup(), "<b>bold<i>both");
        assert_eq!(tags[2].parent_id, Some(b.node_id));
        let span = tags[3];
        assert_eq!(span.status, TagStatus::Open);
        assert_eq!(span.raw_markup(), "<span>tail");
    }

    #[test]
    fn test_implied_end_tags() {
        let arena = parse("<ul><li>a<li>b</ul>");
        let tags = elements(&arena);
        let ul = tags[0];

        assert_eq!(ul.children_ids.as_slice(), &[tags[1].node_id, tags[2].node_id]);
        assert_eq!(tags[1].status, TagStatus::Open);
        assert_eq!(tags[1].raw_markup(), "<li>a");
        assert_eq!(tags[2].parent_id, Some(ul.node_id));
        assert_eq!(tags[2].raw_markup(), "<li>b");
    }

    #[test]
    fn test_implied_end_tags_respect_boundaries() {
        // Nested list items stay nested; the inner list is the boundary
        let arena = parse("<ul><li>a<ul><li>a.1<li>a.2</ul><li>b</ul>");
        let items: Vec<_> = elements(&arena)
            .into_iter()
            .filter(|n| n.tag_name == "li")
            .collect();
        let outer = arena.get(1).unwrap();

        assert_eq!(items.len(), 4);
        assert_eq!(items[1].parent_id, items[2].parent_id);
        assert_ne!(items[1].parent_id, Some(outer.node_id));
        assert_eq!(items[3].parent_id, Some(outer.node_id));

        // A new row ends the open cell and row; inline elements close with them
        let arena = parse("<table><tr><td><b>1<td>2<tr><td>3</table>");
        let rows: Vec<_> = elements(&arena)
            .into_iter()
            .filter(|n| n.tag_name == "tr")
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].parent_id, rows[1].parent_id);
        assert_eq!(rows[0].children_ids.len(), 2);
    }

    #[test]
    fn test_many_unclosed_siblings() {
        let markup = format!("<ul>{}</ul>", "<li>item\n".repeat(5_000));
        let arena = parse(&markup);
        assert_eq!(arena.get(1).unwrap().children_ids.len(), 5_000);
    }

    #[test]
    fn test_markup_is_shared_not_copied() {
        let markup = format!("{}x", "<span>".repeat(50_000));
        let arena = parse(&markup);

        let outer = arena.get(1).unwrap();
        assert_eq!(outer.raw_markup().len(), markup.len());
        let innermost = arena.get(50_000).unwrap();
        assert_eq!(innermost.raw_markup(), "<span>x");
        assert_eq!(innermost.span, markup.len() - 7..markup.len());
    }

    #[test]
    fn test_stray_end_tag_ignored() {
        let arena = parse("<div>a</span>b</div>");
        let div = elements(&arena)[0];
        assert_eq!(div.status, TagStatus::Closed);
        assert_eq!(div.children_ids.len(), 2);
    }

    #[test]
    fn test_comments_doctype_and_lone_brackets() {
        let arena = parse("<!DOCTYPE html><!-- note --><p>1 < 2</p>");
        let kinds: Vec<_> = arena.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Document,
                NodeKind::Comment,
                NodeKind::Element,
                NodeKind::Text
            ]
        );
        assert_eq!(arena.get(3).unwrap().raw_markup(), "1 < 2");
    }

    #[test]
    fn test_raw_text_elements() {
        let arena = parse("<script>if (a<b) { x = '</p>'; }</SCRIPT><p>after</p>");
        let tags = elements(&arena);

        assert_eq!(tags[0].tag_name, "script");
        assert_eq!(tags[0].status, TagStatus::Closed);
        assert_eq!(
            arena.get(tags[0].children_ids[0]).unwrap().raw_markup(),
            "if (a<b) { x = '</p>'; }"
        );
        assert_eq!(tags[1].tag_name, "p");
        assert_eq!(tags[1].parent_id, Some(ROOT_ID));
    }

    #[test]
    fn test_source_lines() {
        let arena = parse("<html>\n  <body>\n    <p>x</p>\n  </body>\n</html>");
        let tags = elements(&arena);
        let lines: Vec<_> = tags.iter().map(|t| t.source_line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_unterminated_tag_is_text() {
        let arena = parse("<p>ok</p><a href=\"x");
        assert_eq!(elements(&arena).len(), 1);
        assert_eq!(arena.iter().last().unwrap().raw_markup(), "<a href=\"x");
    }
}
