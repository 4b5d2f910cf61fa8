//! Text serializer - render a subtree back to prose
//!
//! Models the bare minimum of block/inline reflow without a layout engine:
//! - `<br>` becomes a line break
//! - `<p>` ends with a line break after its content
//! - whitespace runs in text collapse to one space
//! - `script`, `style` and friends are never rendered

use crate::arena::TagArena;
use crate::types::*;
use crate::utils::{decode_entities, push_collapsed, push_newline};

#[derive(Debug, Clone)]
pub struct TextSerializer {
    skip_elements: Vec<String>,
}

impl TextSerializer {
    pub fn new() -> Self {
        Self {
            skip_elements: NON_RENDERED_ELEMENTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Render `node_id` and its descendants. Unknown ids render as "".
    pub fn to_text(&self, arena: &TagArena, node_id: NodeId) -> String {
        let mut output = String::new();
        self.render(arena, node_id, &mut output);
        output
    }

    /// Rendered text with surrounding whitespace removed
    pub fn inner_text(&self, arena: &TagArena, node_id: NodeId) -> String {
        self.to_text(arena, node_id).trim().to_string()
    }

    /// Depth-first walk with an explicit stack; `EndParagraph` fires after
    /// the last child of a `<p>`
    fn render(&self, arena: &TagArena, node_id: NodeId, output: &mut String) {
        let mut stack = vec![Step::Enter(node_id)];

        while let Some(step) = stack.pop() {
            let node_id = match step {
                Step::Enter(node_id) => node_id,
                Step::EndParagraph => {
                    push_newline(output);
                    continue;
                }
            };
            let Ok(node) = arena.get(node_id) else {
                continue;
            };

            match node.kind {
                NodeKind::Text => push_collapsed(output, &decode_entities(node.raw_markup())),
                NodeKind::Comment => {}
                NodeKind::Document => push_children(&mut stack, node),
                NodeKind::Element => {
                    if self.skip_elements.iter().any(|s| *s == node.tag_name) {
                        continue;
                    }
                    match node.tag_name.as_str() {
                        "br" => push_newline(output),
                        "p" => {
                            if node.has_children() {
                                stack.push(Step::EndParagraph);
                            }
                            push_children(&mut stack, node);
                        }
                        _ => push_children(&mut stack, node),
                    }
                }
            }
        }
    }
}

enum Step {
    Enter(NodeId),
    EndParagraph,
}

fn push_children(stack: &mut Vec<Step>, node: &ParsedTag) {
    stack.extend(node.children_ids.iter().rev().map(|&child_id| Step::Enter(child_id)));
}

impl Default for TextSerializer {
    fn default() -> Self {
        Self::new()
    }
}
