use std::cell::RefCell;
use std::rc::Rc;

use html_escape::decode_html_entities;
use lol_html::{RewriteStrSettings, element, rewrite_str, text};
use serde::Serialize;

use super::error::ContentError;
use crate::domain::slug::AnchorSlugger;

const HEADINGS: &str = "h1, h2, h3, h4, h5, h6";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub level: u8,
    pub text: String,
    pub anchor: String,
}

/// Document with an id on every heading, plus the outline built from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocDocument {
    pub html: String,
    pub entries: Vec<TocEntry>,
}

#[derive(Debug, Default)]
struct Heading {
    level: u8,
    text: String,
    existing_id: Option<String>,
}

/// Give every heading a stable anchor id and collect the outline.
///
/// Ids already present anywhere in the document are kept and never reused
/// for generated anchors.
pub fn extract_toc(html: &str) -> Result<TocDocument, ContentError> {
    let (headings, taken_ids) = collect_headings(html)?;

    let mut slugger = AnchorSlugger::new();
    for id in &taken_ids {
        slugger.reserve(id);
    }

    let entries: Vec<TocEntry> = headings
        .into_iter()
        .map(|heading| {
            let text = collapse_whitespace(&decode_html_entities(&heading.text));
            let anchor = match heading.existing_id {
                Some(id) => id,
                None => slugger.anchor_for(&text),
            };
            TocEntry {
                level: heading.level,
                text,
                anchor,
            }
        })
        .collect();

    let html = apply_anchor_ids(html, &entries)?;
    Ok(TocDocument { html, entries })
}

fn collect_headings(html: &str) -> Result<(Vec<Heading>, Vec<String>), ContentError> {
    let headings = Rc::new(RefCell::new(Vec::<Heading>::new()));
    let taken_ids = Rc::new(RefCell::new(Vec::<String>::new()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("[id]", {
                    let taken_ids = Rc::clone(&taken_ids);
                    move |el| {
                        if let Some(id) = el.get_attribute("id").filter(|id| !id.is_empty()) {
                            taken_ids.borrow_mut().push(id);
                        }
                        Ok(())
                    }
                }),
                element!(HEADINGS, {
                    let headings = Rc::clone(&headings);
                    move |el| {
                        headings.borrow_mut().push(Heading {
                            level: heading_level(&el.tag_name()),
                            text: String::new(),
                            existing_id: el.get_attribute("id").filter(|id| !id.is_empty()),
                        });
                        Ok(())
                    }
                }),
                text!(HEADINGS, {
                    let headings = Rc::clone(&headings);
                    move |chunk| {
                        if let Some(current) = headings.borrow_mut().last_mut() {
                            current.text.push_str(chunk.as_str());
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| ContentError::Rewrite {
        message: err.to_string(),
    })?;

    let headings = headings.take();
    let taken_ids = taken_ids.take();
    Ok((headings, taken_ids))
}

fn apply_anchor_ids(html: &str, entries: &[TocEntry]) -> Result<String, ContentError> {
    let anchors: Rc<Vec<String>> = Rc::new(entries.iter().map(|e| e.anchor.clone()).collect());
    let index = Rc::new(RefCell::new(0usize));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!(HEADINGS, {
                let anchors = Rc::clone(&anchors);
                let index = Rc::clone(&index);
                move |el| {
                    let mut idx = index.borrow_mut();
                    if let Some(anchor) = anchors.get(*idx) {
                        el.set_attribute("id", anchor)?;
                    }
                    *idx += 1;
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| ContentError::Rewrite {
        message: err.to_string(),
    })
}

fn heading_level(tag_name: &str) -> u8 {
    tag_name
        .trim_start_matches(['h', 'H'])
        .parse::<u8>()
        .unwrap_or(0)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_unique_anchors_in_document_order() {
        let doc = extract_toc("<h2>Nguyên liệu</h2><p>…</p><h3>Cách làm</h3><h2>Nguyên liệu</h2>")
            .expect("toc");

        let anchors: Vec<&str> = doc.entries.iter().map(|e| e.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["nguyen-lieu", "cach-lam", "nguyen-lieu-2"]);
        assert_eq!(doc.entries[1].level, 3);
        assert!(doc.html.contains(r#"<h2 id="nguyen-lieu-2">Nguyên liệu</h2>"#));
    }

    #[test]
    fn keeps_existing_ids_and_avoids_collisions() {
        let doc = extract_toc(
            r#"<div id="intro"></div><h2 id="top">Start</h2><h2>Intro</h2>"#,
        )
        .expect("toc");

        assert_eq!(doc.entries[0].anchor, "top");
        assert_eq!(doc.entries[1].anchor, "intro-2");
    }

    #[test]
    fn heading_text_spans_inline_markup_and_entities() {
        let doc = extract_toc("<h2>Salt <em>&amp;</em>\n pepper</h2>").expect("toc");
        assert_eq!(doc.entries[0].text, "Salt & pepper");
        assert_eq!(doc.entries[0].anchor, "salt-pepper");
    }

    #[test]
    fn named_and_numeric_entities_decode_before_slugging() {
        let doc = extract_toc(
            "<h2>B&aacute;nh m&igrave;</h2><h2>&#272;&#7891; u&#7889;ng</h2><h3>Tr&agrave;&nbsp;&#x111;&#xE1;</h3>",
        )
        .expect("toc");

        let outline: Vec<(&str, &str)> = doc
            .entries
            .iter()
            .map(|e| (e.text.as_str(), e.anchor.as_str()))
            .collect();
        assert_eq!(
            outline,
            vec![
                ("Bánh mì", "banh-mi"),
                ("Đồ uống", "do-uong"),
                ("Trà đá", "tra-da"),
            ]
        );
        assert!(doc.html.contains(r#"<h2 id="banh-mi">"#));
    }

    #[test]
    fn document_without_headings_is_unchanged() {
        let html = "<p>plain</p>";
        let doc = extract_toc(html).expect("toc");
        assert!(doc.entries.is_empty());
        assert_eq!(doc.html, html);
    }
}
