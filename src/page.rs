use std::time::Duration;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// The one action the extractor answers.
pub const GET_PAGE_CONTENT: &str = "getPageContent";

/// A message to the extractor task. Actions other than
/// [`GET_PAGE_CONTENT`] get no reply: the sender is dropped and the caller's
/// timeout fires, the same as asking a page that isn't there.
#[derive(Debug)]
pub struct PageRequest {
    pub action: String,
    pub reply: oneshot::Sender<PageResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse {
    pub content: String,
}

/// Caller-side handle to the extractor task.
#[derive(Clone)]
pub struct PageHandle {
    tx: mpsc::UnboundedSender<PageRequest>,
}

impl PageHandle {
    /// Spawn an extractor serving the given rendered text.
    pub fn spawn(text: String) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PageRequest>();

        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                match request.action.as_str() {
                    GET_PAGE_CONTENT => {
                        let _ = request.reply.send(PageResponse { content: text.clone() });
                    }
                    _ => {}
                }
            }
        });

        Self { tx }
    }

    /// A handle with no extractor behind it. Every request comes back empty,
    /// which is how the panel experiences a page context that never loaded.
    pub fn disconnected() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }

    pub async fn get_page_content(&self, timeout: Duration) -> Option<String> {
        self.request(GET_PAGE_CONTENT, timeout).await
    }

    pub async fn request(&self, action: &str, timeout: Duration) -> Option<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = PageRequest {
            action: action.to_string(),
            reply: reply_tx,
        };
        self.tx.send(request).ok()?;

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(response)) => Some(response.content),
            _ => None,
        }
    }
}

/// Load the document the panel was opened on. URLs are fetched over HTTP,
/// anything else is read from disk. HTML documents are reduced to their
/// visible text; plain text passes through untouched.
pub async fn load_document(source: &str) -> Result<String> {
    let raw = if source.starts_with("http://") || source.starts_with("https://") {
        let response = reqwest::Client::new().get(source).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("failed to fetch {}: {}", source, response.status()));
        }
        response.text().await?
    } else {
        tokio::fs::read_to_string(source).await?
    };

    if looks_like_html(&raw) {
        Ok(visible_text(&raw))
    } else {
        Ok(raw)
    }
}

fn looks_like_html(raw: &str) -> bool {
    raw.trim_start().starts_with('<')
}

/// Render markup to the text a reader would see: tags stripped, script and
/// style subtrees skipped entirely, common entities decoded, block elements
/// separated by line breaks, whitespace collapsed.
fn visible_text(html: &str) -> String {
    let mut text = String::new();
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        rest = &rest[open..];

        let close = match rest.find('>') {
            Some(i) => i,
            None => break,
        };
        let tag = rest[1..close].trim();
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        rest = &rest[close + 1..];

        if !tag.starts_with('/') && (name == "script" || name == "style") {
            // Nothing inside these subtrees is visible
            let closing = format!("</{}", name);
            match rest.to_ascii_lowercase().find(&closing) {
                Some(pos) => {
                    rest = &rest[pos..];
                    match rest.find('>') {
                        Some(i) => rest = &rest[i + 1..],
                        None => break,
                    }
                }
                None => {
                    rest = "";
                    break;
                }
            }
        } else if is_block_tag(&name) {
            text.push('\n');
        }
    }
    text.push_str(rest);

    collapse_whitespace(&decode_entities(&text))
}

fn is_block_tag(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "br"
            | "li"
            | "ul"
            | "ol"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "tr"
            | "table"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "blockquote"
            | "pre"
    )
}

fn decode_entities(text: &str) -> String {
    // &amp; last so freshly decoded ampersands aren't re-expanded
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn collapse_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for line in text.lines() {
        let compact = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if compact.is_empty() {
            // At most one blank line between blocks
            if lines.last().map(|l| !l.is_empty()).unwrap_or(false) {
                lines.push(String::new());
            }
        } else {
            lines.push(compact);
        }
    }

    while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_extractor_answers_get_page_content() {
        let page = PageHandle::spawn("Photosynthesis converts light.".to_string());
        let content = page.get_page_content(Duration::from_secs(1)).await;
        assert_eq!(content.as_deref(), Some("Photosynthesis converts light."));
    }

    #[tokio::test]
    async fn test_extractor_ignores_unknown_actions() {
        let page = PageHandle::spawn("text".to_string());
        let content = page.request("scrollToTop", Duration::from_millis(100)).await;
        assert_eq!(content, None);

        // The extractor is still alive and answering afterwards
        let content = page.get_page_content(Duration::from_secs(1)).await;
        assert_eq!(content.as_deref(), Some("text"));
    }

    #[tokio::test]
    async fn test_disconnected_handle_never_answers() {
        let page = PageHandle::disconnected();
        let content = page.get_page_content(Duration::from_millis(100)).await;
        assert_eq!(content, None);
    }

    #[test]
    fn test_visible_text_strips_markup() {
        let html = "<html><body><h1>Leaves</h1>\
                    <p>Green <b>pigment</b> absorbs light.</p>\
                    <script>var hidden = 1;</script>\
                    <style>p { color: green; }</style>\
                    <p>Cells &amp; chloroplasts</p></body></html>";
        assert_eq!(
            visible_text(html),
            "Leaves\n\nGreen pigment absorbs light.\n\nCells & chloroplasts"
        );
    }

    #[test]
    fn test_visible_text_collapses_whitespace() {
        let html = "<div>one   two</div>\n\n\n<div>three</div>";
        assert_eq!(visible_text(html), "one two\n\nthree");
    }

    #[test]
    fn test_visible_text_decodes_entities() {
        assert_eq!(visible_text("<p>a &lt;b&gt; &quot;c&quot; &#39;d&#39;</p>"), "a <b> \"c\" 'd'");
    }

    #[test]
    fn test_plain_text_is_not_treated_as_html() {
        assert!(!looks_like_html("Photosynthesis < respiration in the dark."));
        assert!(looks_like_html("  <!DOCTYPE html><html></html>"));
    }
}
