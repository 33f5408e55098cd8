use std::path::PathBuf;

pub const HELP_COMMANDS: &[&str] = &[
    "/url <link>",
    "/add <paths...>",
    "/remove <id>",
    "/list",
    "/analyze",
    "/toggle <n>",
    "/print",
    "/dashboard",
    "/export <path>",
    "/restart",
    "/help",
    "/quit",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Noop,
    Help,
    SetUrl(Option<String>),
    Add(Vec<PathBuf>),
    Remove(u64),
    List,
    Analyze,
    Toggle(usize),
    Print,
    Dashboard,
    Export(PathBuf),
    Restart,
    Quit,
    Usage(&'static str),
    Unknown(String),
}

/// Bare text is taken as the video link; everything else is a `/command`.
pub fn parse_command(line: &str) -> ShellCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ShellCommand::Noop;
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return ShellCommand::SetUrl(Some(trimmed.to_string()));
    };
    let (command, arg) = match rest.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (rest, ""),
    };

    match command.to_ascii_lowercase().as_str() {
        "help" | "?" => ShellCommand::Help,
        "url" | "link" => ShellCommand::SetUrl(Some(arg.to_string()).filter(|v| !v.is_empty())),
        "add" => {
            let paths = parse_path_args(arg);
            if paths.is_empty() {
                return ShellCommand::Usage("/add <paths...>");
            }
            ShellCommand::Add(paths.into_iter().map(PathBuf::from).collect())
        }
        "remove" | "rm" => arg
            .trim_start_matches('#')
            .parse::<u64>()
            .map(ShellCommand::Remove)
            .unwrap_or(ShellCommand::Usage("/remove <id>")),
        "list" | "ls" => ShellCommand::List,
        "analyze" | "run" => ShellCommand::Analyze,
        "toggle" | "check" => arg
            .parse::<usize>()
            .map(ShellCommand::Toggle)
            .unwrap_or(ShellCommand::Usage("/toggle <n>")),
        "print" | "pdf" => ShellCommand::Print,
        "dashboard" => ShellCommand::Dashboard,
        "export" => match parse_path_args(arg).into_iter().next() {
            Some(path) => ShellCommand::Export(PathBuf::from(path)),
            None => ShellCommand::Usage("/export <path>"),
        },
        "restart" => ShellCommand::Restart,
        "quit" | "exit" => ShellCommand::Quit,
        other => ShellCommand::Unknown(other.to_string()),
    }
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{parse_command, ShellCommand};

    #[test]
    fn bare_text_sets_the_link() {
        assert_eq!(
            parse_command("  https://youtu.be/abc "),
            ShellCommand::SetUrl(Some("https://youtu.be/abc".to_string()))
        );
        assert_eq!(parse_command("/url"), ShellCommand::SetUrl(None));
        assert_eq!(parse_command("   "), ShellCommand::Noop);
    }

    #[test]
    fn add_supports_quoted_paths() {
        assert_eq!(
            parse_command(r#"/add "shots/studio one.png" b.jpg"#),
            ShellCommand::Add(vec![
                PathBuf::from("shots/studio one.png"),
                PathBuf::from("b.jpg")
            ])
        );
        assert_eq!(parse_command("/add"), ShellCommand::Usage("/add <paths...>"));
    }

    #[test]
    fn numeric_arguments_are_validated() {
        assert_eq!(parse_command("/toggle 2"), ShellCommand::Toggle(2));
        assert_eq!(parse_command("/toggle two"), ShellCommand::Usage("/toggle <n>"));
        assert_eq!(parse_command("/remove #3"), ShellCommand::Remove(3));
        assert_eq!(parse_command("/rm"), ShellCommand::Usage("/remove <id>"));
    }

    #[test]
    fn commands_are_case_insensitive_with_aliases() {
        assert_eq!(parse_command("/ANALYZE"), ShellCommand::Analyze);
        assert_eq!(parse_command("/pdf"), ShellCommand::Print);
        assert_eq!(parse_command("/exit"), ShellCommand::Quit);
        assert_eq!(
            parse_command("/export 'out dir/audit.html'"),
            ShellCommand::Export(PathBuf::from("out dir/audit.html"))
        );
        assert_eq!(
            parse_command("/frobnicate"),
            ShellCommand::Unknown("frobnicate".to_string())
        );
    }
}
