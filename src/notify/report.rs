//! Static HTML rendering of a digest, written next to the delivered message for local
//! inspection. It is built from the same [`Digest`] as the webhook text.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::notify::Digest;
use crate::notify::digest::{DigestHost, or_dash};
use crate::{MonitorError, MonitorResult};

pub fn report_path(dir: &Path, digest: &Digest) -> PathBuf {
    dir.join(format!(
        "server-status-{}.html",
        digest.generated_at.format("%Y-%m-%d")
    ))
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn render_html(digest: &Digest) -> String {
    let title = escape(&digest.title());
    let mut html = String::new();

    let _ = write!(
        html,
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         <style>\n\
         body {{ font-family: sans-serif; margin: 2em; }}\n\
         table {{ border-collapse: collapse; margin-bottom: 1.5em; }}\n\
         th, td {{ border: 1px solid #ccc; padding: 4px 10px; text-align: left; }}\n\
         .online {{ color: #2e7d32; }} .partial {{ color: #f9a825; }} .offline {{ color: #c62828; }}\n\
         </style>\n\
         </head>\n\
         <body>\n\
         <h1>{title}</h1>\n"
    );

    let _ = write!(
        html,
        "<table>\n\
         <tr><th>Total</th><th class=\"online\">Online</th><th class=\"partial\">Partial</th>\
         <th class=\"offline\">Offline</th><th>Invalid IP</th></tr>\n\
         <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n\
         </table>\n",
        digest.total,
        digest.online,
        digest.partial,
        digest.offline,
        digest.invalid()
    );

    html.push_str("<h2>Offline servers</h2>\n");
    if digest.offline_hosts.is_empty() {
        html.push_str("<p>No offline servers</p>\n");
    } else {
        html.push_str(
            "<table>\n<tr><th>Name</th><th>IP</th><th>Application</th>\
             <th>Environment</th><th>Type</th></tr>\n",
        );
        for host in &digest.offline_hosts {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&host.name),
                escape(&host.address),
                escape(or_dash(&host.application)),
                escape(or_dash(&host.environment)),
                escape(or_dash(&host.kind))
            );
        }
        html.push_str("</table>\n");
    }

    if !digest.invalid_hosts.is_empty() {
        html.push_str("<h2>Servers with invalid IP</h2>\n");
        html.push_str("<table>\n<tr><th>Name</th><th>IP</th></tr>\n");
        for DigestHost { name, address, .. } in &digest.invalid_hosts {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(name),
                escape(address)
            );
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Write the rendering into `dir`, creating the directory if needed.
#[instrument(skip(digest), fields(dir = %dir.display()))]
pub async fn write_report(dir: &Path, digest: &Digest) -> MonitorResult<PathBuf> {
    let path = report_path(dir, digest);
    let report_error = |source| MonitorError::Report {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(report_error)?;
    tokio::fs::write(&path, render_html(digest))
        .await
        .map_err(report_error)?;

    debug!("report written to {}", path.display());
    Ok(path)
}
