//! Telegram HTML builders for the bot's own messages.

/// Escape text for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Caption attached to broadcast media.
pub const ANNOUNCEMENT_CAPTION: &str = "📢 Announcement";

/// Broadcast body for a text announcement: bold header, blank line, admin text.
pub fn announcement_html(text: &str) -> String {
    format!("📢 <b>Announcement:</b>\n\n{}", escape_html(text))
}

/// `/donate` reply. Lines for unset payment options are omitted.
pub fn donate_html(upi: Option<&str>, url: Option<&str>) -> String {
    let mut out = String::from("💖 <b>Support this bot!</b>\n");
    if let Some(upi) = upi {
        out.push_str(&format!("\n📱 UPI: <code>{}</code>", escape_html(upi)));
    }
    if let Some(url) = url {
        let url = escape_html(url);
        out.push_str(&format!("\n🌐 Pay online: <a href=\"{url}\">{url}</a>"));
    }
    out.push_str("\n💬 Thank you ❤️");
    out
}

pub fn broadcast_report(sent: usize, failed: usize) -> String {
    format!("✅ Broadcast sent to {sent} users. ({failed} failed)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
    }

    #[test]
    fn announcement_escapes_admin_text() {
        let html = announcement_html("1 < 2 & <b>");
        assert_eq!(html, "📢 <b>Announcement:</b>\n\n1 &lt; 2 &amp; &lt;b&gt;");
    }

    #[test]
    fn donate_lists_only_configured_options() {
        let html = donate_html(Some("me@bank"), None);
        assert!(html.contains("<code>me@bank</code>"));
        assert!(!html.contains("Pay online"));
        assert!(html.ends_with("Thank you ❤️"));

        let html = donate_html(None, Some("https://pay.example/x"));
        assert!(!html.contains("UPI"));
        assert!(html.contains(r#"<a href="https://pay.example/x">"#));
    }

    #[test]
    fn report_counts() {
        assert_eq!(
            broadcast_report(2, 1),
            "✅ Broadcast sent to 2 users. (1 failed)"
        );
    }
}
