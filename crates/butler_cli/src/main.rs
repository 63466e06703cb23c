//! Timing Butler command-line host
//!
//! ## Usage
//!
//! ```bash
//! timing-butler call session.json                 # Align the selected event
//! timing-butler call session.json -o out.json     # Write the result elsewhere
//! timing-butler config show                       # Show project/local settings
//! timing-butler config set lead_in 80             # Personal setting
//! timing-butler config set chain -1 --project     # Clear a project override
//! ```

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use butler_core::butler::{Butler, ButlerOutcome, Session, Workspace};
use butler_core::config::{
    ButlerConfigService, ConfigKey, ConfigScope, ConfigSnapshot, TomlConfigStore,
};
use butler_core::logging::{init_tracing, LogLevel};
use butler_core::timing::ConstantFpsVideo;
use clap::{Args, Parser, Subcommand};
use directories::ProjectDirs;

#[derive(Parser, Debug)]
#[command(name = "timing-butler", version, about = "Snap subtitle lines to keyframes")]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Personal settings file
    #[arg(long, global = true, env = "TIMING_BUTLER_CONFIG")]
    local_config: Option<PathBuf>,

    /// Project settings file
    #[arg(long, global = true, default_value = "timing_butler.project.toml")]
    project_config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Align the selected event of a session
    Call(CallArgs),
    /// Show or edit the Butler settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
struct CallArgs {
    /// Session file (JSON)
    session: PathBuf,

    /// Where to write the updated session (defaults to the input file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keyframe file replacing the session's keyframe list
    #[arg(long)]
    keyframes: Option<PathBuf>,

    /// Frame rate to use with --keyframes when the file does not name one
    #[arg(long, requires = "keyframes")]
    fps: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print both settings layers and the effective values
    Show,
    /// Set one setting
    Set {
        /// Setting name (e.g. lead_in or LeadIn)
        key: ConfigKey,
        /// Value; on the project scope -1 or "none" removes the override
        #[arg(allow_hyphen_values = true)]
        value: String,
        /// Write to the project settings instead of the personal ones
        #[arg(long)]
        project: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let local_config = match cli.local_config {
        Some(path) => path,
        None => default_local_config()?,
    };
    tracing::debug!(
        "Config files: project={}, local={}",
        cli.project_config.display(),
        local_config.display()
    );
    let store = TomlConfigStore::new(cli.project_config, local_config);
    let service = ButlerConfigService::new(store);

    match cli.command {
        Commands::Call(args) => run_call(service, &args),
        Commands::Config(ConfigCommand::Show) => run_config_show(service),
        Commands::Config(ConfigCommand::Set {
            key,
            value,
            project,
        }) => run_config_set(service, key, &value, project),
    }
}

fn default_local_config() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "timing-butler")
        .context("Could not determine the user configuration directory")?;
    Ok(dirs.config_dir().join("timing_butler.toml"))
}

fn run_call(service: ButlerConfigService<TomlConfigStore>, args: &CallArgs) -> Result<()> {
    let mut session = Session::load(&args.session)
        .with_context(|| format!("Loading session {}", args.session.display()))?;

    if let Some(path) = &args.keyframes {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Reading keyframes {}", path.display()))?;
        let fallback_fps = args
            .fps
            .or_else(|| session.video().map(ConstantFpsVideo::fps))
            .unwrap_or(0.0);
        let video = ConstantFpsVideo::from_keyframe_file(&content, fallback_fps)
            .with_context(|| format!("Loading keyframes {}", path.display()))?;
        session.load_video(video);
    }

    let mut butler = Butler::new(service).with_notice(Box::new(|msg: &str| eprintln!("{msg}")));
    let outcome = butler.call(Some(&mut session))?;

    match outcome {
        ButlerOutcome::Skipped(_) => {}
        ButlerOutcome::Unchanged => println!("Nothing to do: event already aligned"),
        ButlerOutcome::Committed(alignment) => {
            let output = args.output.as_ref().unwrap_or(&args.session);
            session
                .save(output)
                .with_context(|| format!("Writing session {}", output.display()))?;
            println!(
                "Event aligned (start {}, end {}) -> {}",
                if alignment.start_changed { "changed" } else { "kept" },
                if alignment.end_changed { "changed" } else { "kept" },
                output.display()
            );
        }
    }
    Ok(())
}

fn run_config_show(mut service: ButlerConfigService<TomlConfigStore>) -> Result<()> {
    let snapshot = service.snapshot()?;
    for scope in [ConfigScope::Project, ConfigScope::Local] {
        println!("{} settings: {}", scope, service.store().path(scope).display());
    }
    println!();
    print_snapshot(&snapshot);
    Ok(())
}

fn print_snapshot(snapshot: &ConfigSnapshot) {
    println!(
        "{:<38} {:>8} {:>8} {:>10}",
        "Setting", "Project", "Local", "Effective"
    );
    for key in ConfigKey::ALL {
        let show = |v: Option<u32>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
        println!(
            "{:<38} {:>8} {:>8} {:>10}",
            key.label(),
            show(snapshot.project.get(key)),
            show(snapshot.local.get(key)),
            snapshot.effective.get(key)
        );
    }
}

fn run_config_set(
    mut service: ButlerConfigService<TomlConfigStore>,
    key: ConfigKey,
    value: &str,
    project: bool,
) -> Result<()> {
    let scope = if project {
        ConfigScope::Project
    } else {
        ConfigScope::Local
    };

    let parsed = parse_value(scope, key, value)?;
    service.set(scope, key, parsed)?;
    println!(
        "{} {} = {}",
        scope,
        key,
        parsed.map_or_else(|| "unset".to_string(), |v| v.to_string())
    );
    Ok(())
}

/// Parse a setting value; the project scope also accepts "unset" markers.
fn parse_value(scope: ConfigScope, key: ConfigKey, value: &str) -> Result<Option<u32>> {
    match value.trim() {
        "-1" | "none" if scope == ConfigScope::Project => Ok(None),
        raw => match raw.parse::<u32>() {
            Ok(v) => Ok(Some(v)),
            Err(_) => bail!(
                "'{value}' is not a valid value for {key} (expected a non-negative integer)"
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use butler_core::butler::SessionError;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    /// One event at 5000-6000ms, 25 fps, keyframes at 0 and 5120ms.
    fn session_json(active: Option<u64>, start_ms: f64) -> String {
        let active = active.map_or_else(String::new, |id| format!(r#""active": {id},"#));
        format!(
            r#"{{
                "events": [{{ "id": 1, "start_ms": {start_ms:.1}, "end_ms": 6000.0, "text": "Hello" }}],
                {active}
                "video": {{ "fps": 25.0, "keyframes": [0, 128, 150] }}
            }}"#
        )
    }

    fn setup(json: &str) -> (TempDir, PathBuf, ButlerConfigService<TomlConfigStore>) {
        let dir = tempdir().unwrap();
        let session = dir.path().join("session.json");
        fs::write(&session, json).unwrap();
        let store = TomlConfigStore::new(
            dir.path().join("project.toml"),
            dir.path().join("local.toml"),
        );
        (dir, session, ButlerConfigService::new(store))
    }

    fn call_args(session: &Path, output: Option<PathBuf>) -> CallArgs {
        CallArgs {
            session: session.to_path_buf(),
            output,
            keyframes: None,
            fps: None,
        }
    }

    fn start_of(path: &Path) -> Result<f64, SessionError> {
        Ok(Session::load(path)?.events()[0].start_ms)
    }

    #[test]
    fn call_writes_session_back_after_commit() {
        let (_dir, session, service) = setup(&session_json(Some(1), 5000.0));

        run_call(service, &call_args(&session, None)).unwrap();

        assert_eq!(start_of(&session).unwrap(), 4880.0);
    }

    #[test]
    fn call_output_redirects_write() {
        let json = session_json(Some(1), 5000.0);
        let (dir, session, service) = setup(&json);
        let output = dir.path().join("aligned.json");

        run_call(service, &call_args(&session, Some(output.clone()))).unwrap();

        assert_eq!(fs::read_to_string(&session).unwrap(), json);
        assert_eq!(start_of(&output).unwrap(), 4880.0);
    }

    #[test]
    fn call_without_change_writes_nothing() {
        // Start already on keyframe 128, end 6000ms on keyframe 150
        let json = session_json(Some(1), 5120.0);
        let (dir, session, service) = setup(&json);
        let output = dir.path().join("aligned.json");

        run_call(service, &call_args(&session, Some(output.clone()))).unwrap();

        assert_eq!(fs::read_to_string(&session).unwrap(), json);
        assert!(!output.exists());
    }

    #[test]
    fn skipped_call_writes_nothing() {
        let json = session_json(None, 5000.0);
        let (dir, session, service) = setup(&json);

        run_call(service, &call_args(&session, None)).unwrap();

        assert_eq!(fs::read_to_string(&session).unwrap(), json);
        // Preconditions fail before the settings are touched
        assert!(!dir.path().join("local.toml").exists());
    }

    #[test]
    fn call_loads_keyframe_file() {
        // Keyframe file moves the nearest keyframe to frame 127 (5080ms)
        let (dir, session, service) = setup(&session_json(Some(1), 5000.0));
        let keyframes = dir.path().join("keyframes.txt");
        fs::write(&keyframes, "# keyframe format v1\nfps 25\n0\n127\n150\n").unwrap();
        let mut args = call_args(&session, None);
        args.keyframes = Some(keyframes);

        run_call(service, &args).unwrap();

        assert_eq!(start_of(&session).unwrap(), 5080.0);
    }

    #[test]
    fn parses_values_per_scope() {
        let key = ConfigKey::LeadIn;
        assert_eq!(parse_value(ConfigScope::Local, key, "80").unwrap(), Some(80));
        assert_eq!(parse_value(ConfigScope::Project, key, "-1").unwrap(), None);
        assert_eq!(parse_value(ConfigScope::Project, key, "none").unwrap(), None);
        assert!(parse_value(ConfigScope::Local, key, "-1").is_err());
        assert!(parse_value(ConfigScope::Local, key, "fast").is_err());
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::try_parse_from([
            "timing-butler",
            "config",
            "set",
            "SnapEndLater",
            "-1",
            "--project",
        ])
        .unwrap();
        match cli.command {
            Commands::Config(ConfigCommand::Set {
                key,
                value,
                project,
            }) => {
                assert_eq!(key, ConfigKey::SnapEndLater);
                assert_eq!(value, "-1");
                assert!(project);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_requires_keyframes_for_fps() {
        assert!(Cli::try_parse_from(["timing-butler", "call", "s.json", "--fps", "24"]).is_err());
        assert!(Cli::try_parse_from([
            "timing-butler",
            "call",
            "s.json",
            "--keyframes",
            "kf.txt",
            "--fps",
            "24"
        ])
        .is_ok());
    }
}
