use std::borrow::Cow;
use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use once_cell::sync::Lazy;

static EDITOR_SANITIZER: Lazy<AmmoniaBuilder<'static>> = Lazy::new(editor_builder);

/// Clean editor HTML before it is stored or previewed.
pub fn sanitize_html(html: &str) -> String {
    EDITOR_SANITIZER.clean(html).to_string()
}

fn editor_builder() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "b",
        "blockquote",
        "br",
        "caption",
        "code",
        "del",
        "div",
        "em",
        "figcaption",
        "figure",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "li",
        "mark",
        "ol",
        "p",
        "pre",
        "s",
        "span",
        "strong",
        "sub",
        "sup",
        "table",
        "tbody",
        "td",
        "tfoot",
        "th",
        "thead",
        "tr",
        "u",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from(["class", "id", "title", "lang", "dir"]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("a", &["target"]);
    builder.add_tag_attributes(
        "img",
        &["alt", "width", "height", "srcset", "sizes", "loading", "style"],
    );
    builder.add_tag_attributes("figure", &["style"]);
    builder.add_tag_attributes("p", &["style"]);
    builder.add_tag_attributes("span", &["style"]);
    builder.add_tag_attributes("th", &["align", "colspan", "rowspan", "scope", "style"]);
    builder.add_tag_attributes("td", &["align", "colspan", "rowspan", "style"]);
    builder.add_tag_attributes("ol", &["start", "reversed"]);

    builder.url_schemes(HashSet::from(["http", "https", "mailto"]));

    builder.attribute_filter(|_element, attribute, value| {
        if attribute.eq_ignore_ascii_case("style") {
            sanitize_style_attribute(value).map(Cow::Owned)
        } else {
            Some(Cow::Borrowed(value))
        }
    });

    builder
}

/// Layout properties the editor emits for alignment and image sizing.
const STYLE_PROPERTIES: [&str; 8] = [
    "text-align",
    "width",
    "height",
    "max-width",
    "float",
    "margin-left",
    "margin-right",
    "color",
];

fn sanitize_style_attribute(value: &str) -> Option<String> {
    let kept: Vec<String> = value
        .split(';')
        .filter_map(|declaration| {
            let (property, val) = declaration.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let val = val.trim();
            let lower = val.to_ascii_lowercase();
            let allowed = STYLE_PROPERTIES.contains(&property.as_str())
                && !val.is_empty()
                && !lower.contains("url(")
                && !lower.contains("expression(")
                && !lower.contains("javascript:");
            allowed.then(|| format!("{property}: {val}"))
        })
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_and_event_handlers() {
        let cleaned = sanitize_html(
            r#"<p onclick="steal()">Xin chào<script>alert(1)</script></p><img src="https://cdn.example.com/a.png" onerror="x()">"#,
        );
        assert!(!cleaned.contains("script"));
        assert!(!cleaned.contains("onclick"));
        assert!(!cleaned.contains("onerror"));
        assert!(cleaned.contains("Xin chào"));
        assert!(cleaned.contains(r#"src="https://cdn.example.com/a.png""#));
    }

    #[test]
    fn keeps_editor_structure() {
        let html = r#"<figure class="image"><img src="https://cdn.example.com/cake.png" alt="Bánh"><figcaption>Bánh bông lan</figcaption></figure><table><tbody><tr><td colspan="2">x</td></tr></tbody></table>"#;
        let cleaned = sanitize_html(html);
        assert!(cleaned.contains(r#"<figure class="image">"#));
        assert!(cleaned.contains("<figcaption>Bánh bông lan</figcaption>"));
        assert!(cleaned.contains(r#"<td colspan="2">"#));
    }

    #[test]
    fn rejects_javascript_links() {
        let cleaned = sanitize_html(r#"<a href="javascript:alert(1)">x</a>"#);
        assert!(!cleaned.contains("javascript"));
    }

    #[test]
    fn style_keeps_layout_rules_only() {
        assert_eq!(
            sanitize_style_attribute("width: 50%; position: fixed; background: url(x.png)"),
            Some("width: 50%".to_string())
        );
        assert_eq!(sanitize_style_attribute("position: absolute"), None);
    }
}
