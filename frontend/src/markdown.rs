use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

fn is_script_url(url: &str) -> bool {
    let url = url.trim_start().to_ascii_lowercase();
    url.starts_with("javascript:") || url.starts_with("vbscript:") || url.starts_with("data:")
}

/// Renders message markdown to HTML. Raw HTML in the source is shown as
/// text and script links are neutralised; fenced code keeps its
/// `language-*` class.
pub fn to_html(content: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let events = Parser::new_ext(content, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link { link_type, dest_url, title, id }) if is_script_url(&dest_url) => {
            Event::Start(Tag::Link { link_type, dest_url: CowStr::Borrowed("#"), title, id })
        }
        other => other,
    });

    let mut out = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_markup_and_lists_render() {
        let out = to_html("**Note**\n\n- a\n- b");
        assert!(out.contains("<strong>Note</strong>"));
        assert!(out.contains("<li>a</li>"));
        assert!(out.contains("<li>b</li>"));
    }

    #[test]
    fn fenced_code_keeps_language_class() {
        let out = to_html("Here:\n```rust\nfn main() {}\n```\nDone.");
        assert!(out.contains(r#"<pre><code class="language-rust">fn main() {}"#));
        assert!(out.contains("<p>Done.</p>"));
    }

    #[test]
    fn inline_code_and_headings() {
        let out = to_html("# Title\n\nuse `cargo`");
        assert!(out.contains("<h1>Title</h1>"));
        assert!(out.contains("<code>cargo</code>"));
    }

    #[test]
    fn raw_html_is_escaped() {
        let out = to_html("<script>alert(1)</script>\n\nhi <b>there</b>");
        assert!(!out.contains("<script>"));
        assert!(!out.contains("<b>"));
        assert!(out.contains("&lt;script&gt;"));
    }

    #[test]
    fn script_links_are_neutralised() {
        let out = to_html("[click](javascript:alert(1)) and [docs](https://docs.rs)");
        assert!(!out.contains("javascript:"));
        assert!(out.contains(r#"href="https://docs.rs""#));
    }
}
