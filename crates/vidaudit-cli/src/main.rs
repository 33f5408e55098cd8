mod commands;
mod export;
mod render;

use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use vidaudit_contracts::attachment::AttachmentId;
use vidaudit_contracts::events::EventLog;
use vidaudit_engine::{
    AnalysisSession, AnalysisStateMachine, AnalysisTransport, AttachmentStore, RequestBuilder,
    RetryingTransport, TransportConfig,
};

use crate::commands::{parse_command, ShellCommand, HELP_COMMANDS};
use crate::export::export_html;
use crate::render::TerminalRenderer;

#[derive(Debug, Parser)]
#[command(name = "vidaudit", version, about = "Audit a video from its link and analytics screenshots")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG wins when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Analyze(AnalyzeArgs),
    Preview(InputArgs),
}

#[derive(Debug, Args)]
struct InputArgs {
    #[arg(long)]
    url: Option<String>,
    #[arg(long = "image")]
    images: Vec<PathBuf>,
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    #[command(flatten)]
    input: InputArgs,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    api_base: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    export: Option<PathBuf>,
    #[arg(long)]
    print: bool,
    #[arg(long)]
    json: bool,
    /// Drive the session from stdin; one-shot output flags don't apply.
    #[arg(long, conflicts_with_all = ["print", "json", "export"])]
    interactive: bool,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("vidaudit error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Preview(args) => run_preview(args),
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn transport_config(args: &AnalyzeArgs) -> TransportConfig {
    let mut config = TransportConfig::from_env();
    if let Some(api_key) = &args.api_key {
        config.api_key = api_key.trim().to_string();
    }
    if let Some(api_base) = args.api_base.as_deref() {
        config = config.with_api_base(api_base);
    }
    if let Some(model) = args.model.as_deref() {
        config = config.with_model(model);
    }
    config
}

fn run_analyze(args: AnalyzeArgs) -> Result<i32> {
    let config = transport_config(&args);
    let session_id = Uuid::new_v4().to_string();
    info!(session_id = %session_id, model = %config.model, "starting session");

    let events = args
        .events
        .as_deref()
        .map(|path| EventLog::open(path, session_id.clone()))
        .transpose()?;
    let mut transport = RetryingTransport::from_config(config)?;
    if let Some(events) = &events {
        transport = transport.with_events(events.clone());
    }
    let mut machine = AnalysisStateMachine::new(transport);
    if !args.json {
        machine = machine.with_renderer(Box::new(TerminalRenderer::new(io::stdout())));
    }
    if let Some(events) = events {
        machine = machine.with_events(events);
    }

    let mut session = AnalysisSession::new();
    session.set_video_reference(args.input.url.clone());
    ingest(&mut session, &args.input.images);

    if args.interactive {
        return run_shell(&mut machine, &mut session);
    }

    machine.submit(&mut session)?;
    if !session.view().is_results() {
        if args.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "error": session.error() }))?
            );
        }
        return Ok(2);
    }
    if args.print {
        machine.toggle_export(&mut session, true)?;
    }
    if let Some(path) = &args.export {
        export_html(&session, path)?;
        println!("Exported to {}", path.display());
    }
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "result": session.result(),
                "checklist": session.checklist(),
            }))?
        );
    }
    Ok(0)
}

/// Prints the request body that would be sent, with image data elided.
fn run_preview(args: InputArgs) -> Result<i32> {
    let mut store = AttachmentStore::new();
    for path in &args.images {
        store.add_path(path);
    }
    let request = match RequestBuilder::new().build(args.url.as_deref(), &store.list()) {
        Ok(request) => request,
        Err(err) => {
            eprintln!("{err}");
            return Ok(2);
        }
    };
    let mut payload = request.payload();
    elide_inline_data(&mut payload);
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(0)
}

fn elide_inline_data(payload: &mut Value) {
    let Some(parts) = payload
        .pointer_mut("/contents/0/parts")
        .and_then(Value::as_array_mut)
    else {
        return;
    };
    for part in parts {
        if let Some(data) = part.pointer_mut("/inlineData/data") {
            let len = data.as_str().map(str::len).unwrap_or_default();
            *data = Value::String(format!("<{len} base64 chars>"));
        }
    }
}

fn ingest(session: &mut AnalysisSession, paths: &[PathBuf]) -> usize {
    paths
        .iter()
        .filter(|path| session.add_attachment_path(path).is_some())
        .count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShellFlow {
    Continue,
    Quit,
}

fn run_shell<T: AnalysisTransport>(
    machine: &mut AnalysisStateMachine<T>,
    session: &mut AnalysisSession,
) -> Result<i32> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    println!("vidaudit shell started. Type /help for commands.");

    loop {
        print!("> ");
        stdout.flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let command = parse_command(line.trim_end_matches(['\n', '\r']));
        if apply_command(machine, session, command, &mut stdout)? == ShellFlow::Quit {
            break;
        }
    }
    Ok(0)
}

/// Illegal transitions and export problems are reported to the user; only
/// output failures abort the shell.
fn apply_command<T: AnalysisTransport>(
    machine: &mut AnalysisStateMachine<T>,
    session: &mut AnalysisSession,
    command: ShellCommand,
    out: &mut impl Write,
) -> Result<ShellFlow> {
    match command {
        ShellCommand::Noop => {}
        ShellCommand::Help => writeln!(out, "Commands: {}", HELP_COMMANDS.join(" "))?,
        ShellCommand::SetUrl(url) => {
            match &url {
                Some(url) => writeln!(out, "Link set to {url}")?,
                None => writeln!(out, "Link cleared")?,
            }
            session.set_video_reference(url);
        }
        ShellCommand::Add(paths) => {
            let added = ingest(session, &paths);
            writeln!(
                out,
                "Added {added} of {} screenshot(s); {} attached",
                paths.len(),
                session.attachments().len()
            )?;
        }
        ShellCommand::Remove(id) => {
            if session.remove_attachment(AttachmentId(id)) {
                writeln!(out, "Removed #{id}")?;
            } else {
                writeln!(out, "No screenshot #{id}")?;
            }
        }
        ShellCommand::List => {
            if session.attachments().is_empty() {
                writeln!(out, "No screenshots attached")?;
            }
            for attachment in session.attachments().iter() {
                writeln!(out, "#{} {}", attachment.id, attachment.preview.describe())?;
            }
        }
        ShellCommand::Analyze => {
            if let Err(err) = machine.submit(session) {
                writeln!(out, "{err}")?;
            }
        }
        ShellCommand::Toggle(id) => match machine.toggle_checklist_item(session, id) {
            Ok(true) => {}
            Ok(false) => writeln!(out, "No checklist item {id}")?,
            Err(err) => writeln!(out, "{err}")?,
        },
        ShellCommand::Print => {
            if let Err(err) = machine.toggle_export(session, true) {
                writeln!(out, "{err}")?;
            }
        }
        ShellCommand::Dashboard => {
            if let Err(err) = machine.toggle_export(session, false) {
                writeln!(out, "{err}")?;
            }
        }
        ShellCommand::Export(path) => match export_html(session, &path) {
            Ok(()) => writeln!(out, "Exported to {}", path.display())?,
            Err(err) => writeln!(out, "Export failed: {err:#}")?,
        },
        ShellCommand::Restart => {
            if let Err(err) = machine.restart(session) {
                writeln!(out, "{err}")?;
            }
        }
        ShellCommand::Quit => return Ok(ShellFlow::Quit),
        ShellCommand::Usage(usage) => writeln!(out, "usage: {usage}")?,
        ShellCommand::Unknown(command) => {
            writeln!(out, "Unknown command /{command}. Type /help for commands.")?
        }
    }
    out.flush().context("failed to flush shell output")?;
    Ok(ShellFlow::Continue)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use vidaudit_contracts::view::ViewState;
    use vidaudit_engine::{AnalysisSession, AnalysisStateMachine};

    use clap::error::ErrorKind;
    use clap::Parser;

    use super::{apply_command, elide_inline_data, Cli, Command, ShellFlow};
    use crate::commands::parse_command;
    use crate::render::tests::{results_session, FixedTransport};

    fn run_line(
        machine: &mut AnalysisStateMachine<FixedTransport>,
        session: &mut AnalysisSession,
        line: &str,
    ) -> anyhow::Result<(ShellFlow, String)> {
        let mut out = Vec::new();
        let flow = apply_command(machine, session, parse_command(line), &mut out)?;
        Ok((flow, String::from_utf8(out)?))
    }

    #[test]
    fn shell_drives_results_commands() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let (mut machine, mut session) = results_session();

        run_line(&mut machine, &mut session, "/toggle 2")?;
        assert!(session.checklist()[2].checked);
        let (_, missing) = run_line(&mut machine, &mut session, "/toggle 7")?;
        assert_eq!(missing, "No checklist item 7\n");

        run_line(&mut machine, &mut session, "/print")?;
        assert_eq!(session.view(), ViewState::Results { export_mode: true });

        let export_path = temp.path().join("audit.html");
        let (_, exported) = run_line(
            &mut machine,
            &mut session,
            &format!("/export '{}'", export_path.display()),
        )?;
        assert!(exported.starts_with("Exported to"));
        assert!(fs::read_to_string(&export_path)?.contains("Pin a comment"));

        run_line(&mut machine, &mut session, "/restart")?;
        assert_eq!(session.view(), ViewState::Input);
        let (flow, _) = run_line(&mut machine, &mut session, "/quit")?;
        assert_eq!(flow, ShellFlow::Quit);
        Ok(())
    }

    #[test]
    fn shell_reports_invalid_transitions_and_attachments() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let shot = temp.path().join("stats one.png");
        fs::write(&shot, b"not really a png")?;
        let (mut machine, mut session) = results_session();
        run_line(&mut machine, &mut session, "/restart")?;

        let (_, rejected) = run_line(&mut machine, &mut session, "/print")?;
        assert_eq!(rejected, "cannot toggle export while in input view\n");

        let (_, added) = run_line(
            &mut machine,
            &mut session,
            &format!("/add '{}' missing.png", shot.display()),
        )?;
        assert_eq!(added, "Added 1 of 2 screenshot(s); 1 attached\n");

        let (_, listed) = run_line(&mut machine, &mut session, "/list")?;
        assert!(listed.contains("stats one.png"));

        let (_, unknown) = run_line(&mut machine, &mut session, "/dance")?;
        assert!(unknown.starts_with("Unknown command /dance"));
        Ok(())
    }

    #[test]
    fn interactive_rejects_one_shot_output_flags() {
        for flag in ["--print", "--json", "--export=audit.html"] {
            let err = Cli::try_parse_from(["vidaudit", "analyze", "--interactive", flag])
                .map(|_| ())
                .expect_err("flag conflicts with --interactive");
            assert_eq!(err.kind(), ErrorKind::ArgumentConflict, "{flag}");
        }

        let cli = Cli::try_parse_from(["vidaudit", "analyze", "--interactive", "--url", "x"])
            .expect("interactive alone parses");
        assert!(matches!(cli.command, Command::Analyze(ref args) if args.interactive));
    }

    #[test]
    fn preview_elides_inline_image_data() {
        let mut payload = json!({
            "contents": [{"role": "user", "parts": [
                {"text": "Analyze my video"},
                {"inlineData": {"mimeType": "image/png", "data": "QUJDRA=="}}
            ]}]
        });
        elide_inline_data(&mut payload);
        assert_eq!(
            payload["contents"][0]["parts"][1]["inlineData"]["data"],
            json!("<8 base64 chars>")
        );
        assert_eq!(
            payload["contents"][0]["parts"][0]["text"],
            json!("Analyze my video")
        );
    }
}
