//! Server-rendered HTML table of stored submissions.

use std::fmt::Write;

use repairdesk_shared::constants::APP_NAME;
use repairdesk_shared::SubmissionRecord;

const STYLE: &str = "body{font-family:Arial,Helvetica,sans-serif;padding:20px;background:#f7f9fc}\
h2{margin:0 0 10px}\
table{border-collapse:collapse;width:100%;margin-top:10px}\
th,td{border:1px solid #ddd;padding:8px;text-align:left;vertical-align:top}\
th{background:#e3f2fd}\
tr:nth-child(even){background:#fafafa}\
code{background:#eef;padding:2px 4px;border-radius:4px}";

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

/// Full page for `GET /submissions/view`, rows in storage order.
pub fn render_submissions(records: &[SubmissionRecord]) -> String {
    if records.is_empty() {
        return "<h3 style=\"font-family:Arial\">No submissions yet</h3>".to_string();
    }

    let mut html = String::new();
    let _ = write!(
        html,
        "<html><head><title>Submissions</title>\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"/>\
         <style>{STYLE}</style></head><body>\
         <h2>{} submissions</h2>\
         <p>API source: <code>/submissions</code></p>\
         <table>\
         <tr><th>Name</th><th>Email</th><th>Model</th><th>Priority</th>\
         <th>Problem</th><th>Image</th><th>Date</th></tr>",
        escape_html(APP_NAME)
    );

    for r in records {
        let image = match &r.image {
            Some(link) => format!(
                "<a href=\"{}\" target=\"_blank\">View</a>",
                escape_html(link)
            ),
            None => "\u{2014}".to_string(),
        };
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td style=\"min-width:240px\">{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&r.name),
            escape_html(&r.email),
            escape_html(&r.device_model),
            r.priority,
            escape_html(&r.problem_description),
            image,
            r.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );
    }

    html.push_str("</table></body></html>");
    html
}
