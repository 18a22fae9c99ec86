//! Markdown to HTML rendering with heading anchors, link rewriting and at-block output.

use std::collections::HashMap;

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Parser, Tag, TagEnd};

use ccap_md::{markdown_options, BlockKind, ParsedDoc};

/// Per-page inputs to [`render_doc`].
pub struct RenderOptions<'a> {
    /// Generated HTML for at-blocks, by block index
    pub blocks: &'a HashMap<usize, String>,
    /// Rewrites a link destination that points at another page
    pub resolve_link: &'a (dyn Fn(&str) -> Option<String> + Sync),
}

/// Render a parsed page to HTML.
pub fn render_doc(doc: &ParsedDoc, opts: &RenderOptions<'_>) -> String {
    let mut events = Vec::new();
    let mut heading_index = 0;
    let mut block_index = 0;
    let mut skipping = false;

    for event in Parser::new_ext(&doc.content, markdown_options()) {
        if skipping {
            if matches!(event, Event::End(TagEnd::CodeBlock)) {
                skipping = false;
            }
            continue;
        }

        match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                let id = id.or_else(|| {
                    doc.toc
                        .get(heading_index)
                        .map(|e| CowStr::from(e.id.clone()))
                });
                heading_index += 1;
                events.push(Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                }));
            }

            Event::Start(Tag::CodeBlock(kind)) => {
                let index = block_index;
                block_index += 1;

                match doc.code_blocks.get(index).map(|b| b.kind) {
                    Some(k) if k.is_generated() => {
                        skipping = true;
                        if let Some(html) = opts.blocks.get(&index) {
                            events.push(Event::Html(CowStr::from(html.clone())));
                        }
                    }
                    Some(BlockKind::Example | BlockKind::Repl) => {
                        events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(
                            CowStr::Borrowed("julia"),
                        ))));
                    }
                    _ => events.push(Event::Start(Tag::CodeBlock(kind))),
                }
            }

            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let dest_url = match (opts.resolve_link)(&dest_url) {
                    Some(url) => CowStr::from(url),
                    None => dest_url,
                };
                events.push(Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }));
            }

            other => events.push(other),
        }
    }

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());
    html_output
}

/// Simple markdown to HTML renderer, used for docstring bodies.
pub fn render_markdown(content: &str) -> String {
    let parser = Parser::new_ext(content, markdown_options());

    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);

    html_output
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
