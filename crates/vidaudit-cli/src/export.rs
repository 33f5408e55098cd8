use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use vidaudit_engine::AnalysisSession;

/// Writes the print layout of the current results as a standalone HTML page.
pub fn export_html(session: &AnalysisSession, out_path: &Path) -> Result<()> {
    let Some(result) = session.result() else {
        bail!("nothing to export: no analysis results yet");
    };
    let stats = &result.extracted_stats;

    let mut sections = String::new();
    for category in &result.categories {
        let details = category
            .details
            .iter()
            .map(|detail| format!("<li>{}</li>", escape_html(detail)))
            .collect::<String>();
        sections.push_str(&format!(
            "<section class='category'><h3><span class='icon'>{icon}</span> {name}</h3><ul>{details}</ul></section>",
            icon = category.icon.as_str(),
            name = escape_html(&category.name),
        ));
    }

    let actions = session
        .checklist()
        .iter()
        .map(|item| {
            format!(
                "<li class='{class}'>{text}</li>",
                class = if item.checked { "done" } else { "todo" },
                text = escape_html(&item.text),
            )
        })
        .collect::<String>();

    let html_doc = format!(
        "<!doctype html>\n<html>\n<head>\n  <meta charset='utf-8'>\n  <title>Video Audit</title>\n  <style>\n    body {{ font-family: Arial, sans-serif; margin: 0 auto; max-width: 820px; padding: 32px; color: #0f172a; }}\n    .score {{ font-size: 48px; font-weight: bold; }}\n    .stats {{ display: grid; grid-template-columns: repeat(3, 1fr); gap: 12px; margin: 16px 0; }}\n    .stats div {{ border: 1px solid #e2e8f0; border-radius: 8px; padding: 10px; }}\n    .icon {{ font-size: 11px; text-transform: uppercase; color: #2563eb; }}\n    li.done {{ text-decoration: line-through; color: #64748b; }}\n    @media print {{ body {{ padding: 0; }} }}\n  </style>\n</head>\n<body>\n  <h1>Video Audit Report</h1>\n  <div class='score'>{score}/100</div>\n  <div class='stats'><div>Title<br><b>{title}</b></div><div>CTR<br><b>{ctr}</b></div><div>Retention<br><b>{retention}</b></div></div>\n  <p>{analysis}</p>\n  {sections}\n  <h2>Action plan</h2>\n  <ol>{actions}</ol>\n</body>\n</html>\n",
        score = result.score,
        title = escape_html(&stats.title),
        ctr = escape_html(&stats.ctr),
        retention = escape_html(&stats.retention),
        analysis = escape_html(&result.stat_analysis),
    );

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(out_path, html_doc)
        .with_context(|| format!("failed to write {}", out_path.display()))?;
    Ok(())
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}
