use std::io::Write;

use tracing::warn;
use vidaudit_contracts::analysis::{AnalysisResult, CategoryIcon};
use vidaudit_contracts::view::ViewState;
use vidaudit_engine::{AnalysisSession, ViewRenderer};

const GAUGE_WIDTH: usize = 20;

pub struct TerminalRenderer<W: Write> {
    out: W,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ViewRenderer for TerminalRenderer<W> {
    fn render(&mut self, session: &AnalysisSession) {
        let text = render_view(session);
        if let Err(err) = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
        {
            warn!(error = %err, "failed to write view");
        }
    }
}

pub fn render_view(session: &AnalysisSession) -> String {
    match (session.view(), session.result()) {
        (ViewState::Input, _) => render_input(session),
        (ViewState::Analyzing, _) => render_analyzing(session),
        (ViewState::Results { export_mode: false }, Some(result)) => {
            render_dashboard(session, result)
        }
        (ViewState::Results { export_mode: true }, Some(result)) => render_print(session, result),
        (ViewState::Results { .. }, None) => render_input(session),
    }
}

fn render_input(session: &AnalysisSession) -> String {
    let mut out = String::new();
    if let Some(error) = session.error() {
        out.push_str(&format!("! {error}\n"));
    }
    out.push_str(&format!(
        "Link: {}\n",
        session.video_reference().unwrap_or("(none)")
    ));
    if session.attachments().is_empty() {
        out.push_str("Screenshots: (none)\n");
    } else {
        out.push_str(&format!("Screenshots ({}):\n", session.attachments().len()));
        for attachment in session.attachments().iter() {
            out.push_str(&format!(
                "  #{} {}\n",
                attachment.id,
                attachment.preview.describe()
            ));
        }
    }
    out
}

fn render_analyzing(session: &AnalysisSession) -> String {
    let screenshots = session.attachments().len();
    match session.video_reference() {
        Some(reference) => format!("Analyzing {reference} with {screenshots} screenshot(s)...\n"),
        None => format!("Analyzing {screenshots} screenshot(s)...\n"),
    }
}

fn render_dashboard(session: &AnalysisSession, result: &AnalysisResult) -> String {
    let mut out = String::new();
    out.push_str("== Audit dashboard ==\n");
    out.push_str(&format!(
        "Score: {}/100 {}\n",
        result.score,
        score_gauge(result.score)
    ));
    let stats = &result.extracted_stats;
    out.push_str(&format!(
        "Title: {} | CTR: {} | Retention: {}\n",
        stats.title, stats.ctr, stats.retention
    ));
    if !result.stat_analysis.is_empty() {
        out.push_str(&format!("Analysis: {}\n", result.stat_analysis));
    }
    for category in &result.categories {
        out.push_str(&format!(
            "\n{} {}\n",
            icon_badge(category.icon),
            category.name
        ));
        for detail in &category.details {
            out.push_str(&format!("  - {detail}\n"));
        }
    }
    out.push_str(&format!(
        "\nChecklist ({}/{} done):\n",
        session.completed_count(),
        session.checklist().len()
    ));
    for item in session.checklist() {
        let mark = if item.checked { "x" } else { " " };
        out.push_str(&format!("  [{mark}] {}. {}\n", item.id, item.text));
    }
    out
}

/// Document-style layout: no gauges or badges, numbered action plan.
pub fn render_print(session: &AnalysisSession, result: &AnalysisResult) -> String {
    let stats = &result.extracted_stats;
    let mut out = String::new();
    out.push_str("VIDEO AUDIT REPORT\n");
    out.push_str("==================\n\n");
    out.push_str(&format!("Video: {}\n", stats.title));
    out.push_str(&format!("Score: {}/100\n", result.score));
    out.push_str(&format!("CTR: {}\n", stats.ctr));
    out.push_str(&format!("Retention: {}\n\n", stats.retention));
    if !result.stat_analysis.is_empty() {
        out.push_str("Stat analysis\n-------------\n");
        out.push_str(&format!("{}\n\n", result.stat_analysis));
    }
    for category in &result.categories {
        out.push_str(&format!("{} ({})\n", category.name, category.icon.as_str()));
        for detail in &category.details {
            out.push_str(&format!("  * {detail}\n"));
        }
        out.push('\n');
    }
    out.push_str("Action plan\n-----------\n");
    for (idx, item) in session.checklist().iter().enumerate() {
        let status = if item.checked { " (done)" } else { "" };
        out.push_str(&format!("{}. {}{}\n", idx + 1, item.text, status));
    }
    out
}

fn score_gauge(score: u8) -> String {
    let filled = (usize::from(score) * GAUGE_WIDTH + 50) / 100;
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(GAUGE_WIDTH - filled)
    )
}

fn icon_badge(icon: CategoryIcon) -> &'static str {
    match icon {
        CategoryIcon::Hook => "[hook]",
        CategoryIcon::Seo => "[seo]",
        CategoryIcon::Engagement => "[engagement]",
        CategoryIcon::Other => "[*]",
    }
}
