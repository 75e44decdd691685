// Karaml CLI
// Compiles a karaml keymap into Karabiner-Elements complex modifications

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use karaml_core::{HoldFlavor, KaramlConfig, RuleSet};

/// Karabiner-Elements rule compiler
#[derive(Parser, Debug)]
#[command(name = "karaml")]
#[command(author = "karaml contributors")]
#[command(version)]
#[command(about = "Compile karaml keymaps into Karabiner-Elements rules", long_about = None)]
struct Args {
    /// YAML (or .toml) karaml configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Put hold outputs in to_if_held_down instead of to
    #[arg(short = 'd', long)]
    hold_down: bool,

    /// Write the result to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit a karabiner.json profile instead of a complex modifications file
    #[arg(long)]
    profile: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn hold_flavor(&self) -> HoldFlavor {
        if self.hold_down {
            HoldFlavor::ToIfHeldDown
        } else {
            HoldFlavor::To
        }
    }
}

/// Loaded configuration and the options it is compiled with
struct Application {
    config: KaramlConfig,
    args: Args,
}

impl Application {
    fn new(args: Args) -> Result<Self> {
        let config = KaramlConfig::from_path(&args.config)
            .with_context(|| format!("failed to load {}", args.config.display()))?;
        Ok(Self { config, args })
    }

    fn compile(&self) -> Result<RuleSet> {
        self.config
            .compile(self.args.hold_flavor())
            .with_context(|| format!("failed to compile {}", self.args.config.display()))
    }

    /// Compile everything without writing output
    fn validate(&self) -> Result<()> {
        let rule_set = self.compile()?;
        let stats = self.config.stats();
        println!(
            "Configuration is valid: {} mapping(s) in {} layer(s), {} rule(s)",
            stats.mappings,
            stats.layers,
            rule_set.manipulator_count()
        );
        Ok(())
    }

    fn run(&self) -> Result<()> {
        let rule_set = self.compile()?;
        let document = if self.args.profile {
            rule_set.profile()
        } else {
            rule_set.complex_modifications()
        }
        .context("failed to render rules")?;
        let rendered = render(&document)?;

        match &self.args.output {
            Some(path) => {
                write_file(path, &rendered)?;
                info!("wrote '{}' to {}", rule_set.title, path.display());
            }
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(rendered.as_bytes())?;
                stdout.write_all(b"\n")?;
            }
        }
        Ok(())
    }
}

/// Pretty JSON with four-space indentation, as Karabiner-Elements writes it
fn render(document: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    document
        .serialize(&mut serializer)
        .context("failed to render rules as JSON")?;
    String::from_utf8(buf).context("rendered JSON is not UTF-8")
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    debug!("writing {} bytes to {}", contents.len(), path.display());
    fs::write(path, format!("{}\n", contents))
        .with_context(|| format!("failed to write {}", path.display()))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let result = Application::new(args).and_then(|app| {
        if app.args.check_config {
            app.validate()
        } else {
            app.run()
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["karaml", "karaml.yaml"]);

        assert_eq!(args.config, PathBuf::from("karaml.yaml"));
        assert!(!args.hold_down);
        assert_eq!(args.output, None);
        assert!(!args.profile);
        assert!(!args.check_config);
        assert!(!args.verbose);
        assert_eq!(args.hold_flavor(), HoldFlavor::To);
    }

    #[test]
    fn test_args_with_options() {
        let args = Args::parse_from([
            "karaml",
            "karaml.yaml",
            "-d",
            "--output",
            "/tmp/rules.json",
            "--profile",
            "--verbose",
        ]);

        assert!(args.hold_down);
        assert_eq!(args.hold_flavor(), HoldFlavor::ToIfHeldDown);
        assert_eq!(args.output, Some(PathBuf::from("/tmp/rules.json")));
        assert!(args.profile);
        assert!(args.verbose);
    }

    #[test]
    fn test_args_check_config() {
        let args = Args::parse_from(["karaml", "karaml.toml", "--check-config"]);

        assert!(args.check_config);
        assert_eq!(args.config, PathBuf::from("karaml.toml"));
    }

    #[test]
    fn test_args_require_config() {
        assert!(Args::try_parse_from(["karaml"]).is_err());
    }

    #[test]
    fn test_render_uses_four_space_indent() {
        let rendered = render(&serde_json::json!({"title": "t", "rules": []})).unwrap();
        assert_eq!(rendered, "{\n    \"title\": \"t\",\n    \"rules\": []\n}");
    }

    #[test]
    fn test_run_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("karaml.yaml");
        let output_path = dir.path().join("rules.json");
        fs::write(
            &config_path,
            "title: Test rules\n/base/:\n  caps_lock: [escape, left_control]\n",
        )
        .unwrap();

        let args = Args::parse_from([
            "karaml",
            config_path.to_str().unwrap(),
            "-o",
            output_path.to_str().unwrap(),
        ]);
        Application::new(args).unwrap().run().unwrap();

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&output_path).unwrap()).unwrap();
        assert_eq!(written["title"], "Test rules");
        assert_eq!(
            written["rules"][0]["manipulators"][0]["to_if_alone"],
            serde_json::json!([{"key_code": "escape"}])
        );
    }

    #[test]
    fn test_invalid_config_reports_context() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("karaml.yaml");
        fs::write(&config_path, "/base/:\n  caps_lock: not_a_key\n").unwrap();

        let args = Args::parse_from(["karaml", config_path.to_str().unwrap(), "--check-config"]);
        let err = Application::new(args).unwrap().validate().unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("failed to compile"), "{message}");
        assert!(message.contains("caps_lock"), "{message}");
    }
}
