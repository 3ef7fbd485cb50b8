//! Markdown rendering for blog posts.

use comrak::{Options, markdown_to_html};

/// Render post markdown to HTML with the GFM extensions enabled.
///
/// Raw HTML in the source is not passed through.
#[must_use]
pub fn render_markdown(source: &str) -> String {
    let mut options = Options::default();

    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.header_ids = Some(String::new());
    options.extension.footnotes = true;

    markdown_to_html(source, &options)
}
