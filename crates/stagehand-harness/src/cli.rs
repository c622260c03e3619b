use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use stagehand::{Scene, SceneConfig};

use crate::error::{HarnessError, Result};
use crate::walkthrough::{Walkthrough, WalkthroughOptions};

#[derive(Debug, Parser)]
#[command(
    name = "stagehand-harness",
    about = "Replay the scripted stagehand walkthrough and record it as JSONL",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Play the full walkthrough.
    Run(RunArgs),

    /// Print the built-in configuration as TOML.
    #[command(name = "print-default-config")]
    PrintDefaultConfig,

    /// Load and validate a TOML or JSON config file.
    #[command(name = "check-config")]
    CheckConfig {
        /// Config file (`.toml` or `.json`).
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Scene config file (`.toml` or `.json`). Defaults are used if absent.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Frame length in milliseconds.
    #[arg(long, default_value_t = 16)]
    pub frame_ms: u64,

    /// Sample interval in milliseconds; 0 disables samples.
    #[arg(long, default_value_t = 250)]
    pub sample_ms: u64,

    /// Stop in the projects view instead of resetting.
    #[arg(long)]
    pub no_reset: bool,

    /// Write JSONL here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run_walkthrough(&args),
        Commands::PrintDefaultConfig => {
            let toml = SceneConfig::default().to_toml_string()?;
            let mut out = io::stdout().lock();
            out.write_all(toml.as_bytes())?;
            Ok(())
        }
        Commands::CheckConfig { path } => {
            SceneConfig::from_file(&path)?;
            println!("{}: ok", path.display());
            Ok(())
        }
    }
}

fn run_walkthrough(args: &RunArgs) -> Result<()> {
    if args.frame_ms == 0 {
        return Err(HarnessError::invalid("--frame-ms must be > 0"));
    }
    let scene = match &args.config {
        Some(path) => Scene::from_config_file(path)?,
        None => Scene::new(SceneConfig::default()),
    };
    let options = WalkthroughOptions {
        frame: Duration::from_millis(args.frame_ms),
        sample_every: Duration::from_millis(args.sample_ms),
        include_reset: !args.no_reset,
    };

    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let summary = Walkthrough::new(scene, options, out)?.run()?;
    tracing::info!(
        target: "stagehand.harness",
        frames = summary.frames,
        events = summary.events,
        stage = ?summary.final_stage,
        "done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use tempfile::tempdir;

    use super::{Cli, Commands, RunArgs, run};

    fn run_args() -> RunArgs {
        RunArgs {
            config: None,
            frame_ms: 16,
            sample_ms: 0,
            no_reset: true,
            output: None,
        }
    }

    #[test]
    fn run_writes_jsonl_to_output_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("walk.jsonl");
        run(Cli {
            command: Commands::Run(RunArgs {
                output: Some(path.clone()),
                ..run_args()
            }),
        })
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let last: serde_json::Value = serde_json::from_str(text.lines().last().unwrap()).unwrap();
        assert_eq!(last["kind"], "done");
        assert_eq!(last["stage"], "ProjectsView");
    }

    #[test]
    fn zero_frame_is_invalid() {
        let err = run(Cli {
            command: Commands::Run(RunArgs {
                frame_ms: 0,
                ..run_args()
            }),
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn check_config_rejects_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scene.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[gesture]\nfriction = 1.5").unwrap();
        let err = run(Cli {
            command: Commands::CheckConfig { path },
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("friction"), "{err}");
    }

    #[test]
    fn run_with_config_file_uses_it() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scene.json");
        std::fs::write(&path, r#"{ "timing": { "blink_ms": 100 } }"#).unwrap();
        let out = dir.path().join("walk.jsonl");
        run(Cli {
            command: Commands::Run(RunArgs {
                config: Some(path),
                output: Some(out.clone()),
                ..run_args()
            }),
        })
        .unwrap();
        assert!(std::fs::read_to_string(out).unwrap().contains("greenBatteryComplete"));
    }

    #[test]
    fn print_default_config_succeeds() {
        assert!(run(Cli {
            command: Commands::PrintDefaultConfig
        })
        .is_ok());
    }
}
