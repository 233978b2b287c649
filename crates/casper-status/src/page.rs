//! HTML rendering of the status page.

use std::fmt::Write as _;

use qrcode::QrCode;
use qrcode::render::svg;
use tracing::warn;

use crate::report::StatusReport;

/// Seconds between automatic page reloads.
pub const REFRESH_SECS: u32 = 5;

/// Render the full status page.
#[must_use]
pub fn render(bot_name: &str, report: &StatusReport) -> String {
    let name = escape_html(bot_name);
    let headline = if report.connected {
        "Connected ✅"
    } else if report.qr_payload.is_some() {
        "Waiting for QR scan 📱"
    } else {
        "Disconnected ⏳"
    };

    let mut html = String::with_capacity(4096);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta http-equiv=\"refresh\" content=\"{REFRESH_SECS}\">\n\
         <title>{name} status</title>\n\
         <style>\
         body{{font-family:system-ui,sans-serif;max-width:36em;margin:2em auto;padding:0 1em}}\
         .qr svg{{width:16em;height:16em}}\
         code{{word-break:break-all}}\
         </style>\n\
         </head>\n\
         <body>\n\
         <h1>{name}</h1>\n\
         <p><strong>{headline}</strong></p>\n\
         <ul>\n\
         <li>State: {state}</li>\n\
         <li>Uptime: {uptime}s</li>\n\
         <li>Reconnect attempts: {attempts}</li>\n\
         </ul>\n",
        state = report.state,
        uptime = report.uptime_seconds,
        attempts = report.reconnect_attempts,
    );

    if let Some(payload) = &report.qr_payload {
        html.push_str("<section class=\"qr\">\n<h2>Scan to pair</h2>\n");
        if let Some(image) = qr_svg(payload) {
            html.push_str(&image);
            html.push('\n');
        }
        let _ = writeln!(html, "<p><code>{}</code></p>", escape_html(payload));
        html.push_str("</section>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Inline SVG for a QR payload, without the XML prolog.
///
/// Returns `None` if the payload does not fit in a QR code.
#[must_use]
pub fn qr_svg(payload: &str) -> Option<String> {
    let code = match QrCode::new(payload.as_bytes()) {
        Ok(code) => code,
        Err(e) => {
            warn!(error = %e, "Cannot encode pairing payload as QR");
            return None;
        },
    };
    let image = code
        .render::<svg::Color<'_>>()
        .min_dimensions(200, 200)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();
    let start = image.find("<svg").unwrap_or(0);
    Some(image[start..].to_owned())
}

/// Escape text for use in HTML bodies and attribute values.
#[must_use]
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
