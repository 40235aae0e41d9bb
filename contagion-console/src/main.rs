mod commands;
mod data;
mod reports;
mod simulate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use contagion_engine::{DiseaseEngine, EngineFactory};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use commands::{Session, Target};
use data::FileData;
use simulate::{SimulationOptions, run_simulation};

#[derive(Debug, Parser)]
#[command(name = "contagion-console", version = "0.1.0")]
#[command(about = "Administration console and outbreak simulator for the contagion engine")]
struct Args {
    /// Disease catalog JSON to load instead of the bundled one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Engine tuning JSON to load instead of the defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured roll seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Optional path to write output instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Infect a sandbox mob with a disease
    Infect {
        /// `#<id>` or mob name
        target: String,
        disease: String,
        /// Starting stage (clamped to the disease's stages)
        stage: Option<u32>,
        /// Mobs to spawn before running the command (default: a single `subject`)
        #[arg(long = "mob")]
        mobs: Vec<String>,
    },
    /// Vaccinate a sandbox mob against a disease
    Vaccinate {
        /// `#<id>` or mob name
        target: String,
        disease: String,
        /// Mobs to spawn before running the command (default: a single `subject`)
        #[arg(long = "mob")]
        mobs: Vec<String>,
    },
    /// Run a command script line by line
    Script {
        #[arg(long)]
        file: PathBuf,
    },
    /// Seed a grid of mobs, infect patient zero and report the outbreak
    Simulate {
        /// Simulated seconds
        #[arg(long, default_value_t = 600.0)]
        duration: f64,

        /// Mobs per side of the grid
        #[arg(long, default_value_t = 5)]
        grid: u16,

        /// Tiles between neighbouring mobs
        #[arg(long, default_value_t = 1.0)]
        spacing: f32,

        /// Disease given to patient zero
        #[arg(long, default_value = "common_cold")]
        disease: String,

        /// Patient zero's starting stage
        #[arg(long, default_value_t = 1)]
        stage: u32,

        /// Output report format
        #[arg(long, default_value = "console")]
        #[arg(value_parser = ["json", "markdown", "console"])]
        report: String,
    },
    /// List the diseases in the loaded catalog
    ListDiseases,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let engine = build_engine(&args)?;
    let mut output_target = OutputTarget::new(args.output.clone())?;

    let succeeded = match &args.command {
        Commands::Infect {
            target,
            disease,
            stage,
            mobs,
        } => {
            let mut session = sandbox_session(engine, mobs);
            let target = parse_target(target)?;
            report_outcome(
                &mut output_target,
                session.infect(&target, disease, *stage),
            )?
        }
        Commands::Vaccinate {
            target,
            disease,
            mobs,
        } => {
            let mut session = sandbox_session(engine, mobs);
            let target = parse_target(target)?;
            report_outcome(&mut output_target, session.vaccinate(&target, disease))?
        }
        Commands::Script { file } => {
            let source = std::fs::read_to_string(file)
                .with_context(|| format!("failed to read script {}", file.display()))?;
            let mut session = Session::new(engine);
            for line in session.run_script(&source) {
                writeln!(output_target, "{line}")?;
            }
            true
        }
        Commands::Simulate {
            duration,
            grid,
            spacing,
            disease,
            stage,
            report,
        } => {
            let options = SimulationOptions {
                seed: engine.config().seed,
                duration_secs: *duration,
                grid: *grid,
                spacing: *spacing,
                disease: disease.clone(),
                stage: *stage,
            };
            run_simulate(&mut output_target, engine, &options, report)?;
            true
        }
        Commands::ListDiseases => {
            reports::generate_catalog_listing(&mut output_target, engine.catalog())?;
            true
        }
    };

    output_target.flush_inner()?;
    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn build_engine(args: &Args) -> Result<DiseaseEngine> {
    let factory = EngineFactory::new(FileData::new(args.catalog.clone(), args.config.clone()));
    let engine = match args.seed {
        Some(seed) => factory.build_seeded(seed),
        None => factory.build(),
    }
    .map_err(|err| {
        log::error!("engine data rejected: {err}");
        err
    })
    .context("failed to load engine data")?;
    Ok(engine)
}

fn sandbox_session(engine: DiseaseEngine, mobs: &[String]) -> Session {
    let mut session = Session::new(engine);
    let default_mob = ["subject".to_string()];
    let names = if mobs.is_empty() { &default_mob[..] } else { mobs };
    for (index, name) in names.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let x = index as f32;
        session
            .world_mut()
            .spawn_mob(name, contagion_engine::Position::new(x, 0.0));
    }
    session
}

fn parse_target(token: &str) -> Result<Target> {
    commands::parse_line(&format!("diagnose {token}"))?
        .and_then(|command| match command {
            commands::Command::Diagnose { target } => Some(target),
            _ => None,
        })
        .with_context(|| format!("invalid target `{token}`"))
}

fn report_outcome(
    out: &mut OutputTarget,
    outcome: Result<String, commands::CommandError>,
) -> Result<bool> {
    match outcome {
        Ok(line) => {
            writeln!(out, "{line}")?;
            Ok(true)
        }
        Err(err) => {
            writeln!(out, "error: {err}")?;
            Ok(false)
        }
    }
}

fn announce_banner() {
    println!("{}", "🦠 Contagion Outbreak Simulator".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn run_simulate(
    out: &mut OutputTarget,
    engine: DiseaseEngine,
    options: &SimulationOptions,
    report: &str,
) -> Result<()> {
    if report == "console" {
        announce_banner();
    }
    let start_time = Instant::now();
    let result = run_simulation(engine, options)?;
    match report {
        "json" => reports::generate_json_report(out, &result)?,
        "markdown" => reports::generate_markdown_report(out, &result)?,
        _ => {
            reports::generate_console_report(out, &result)?;
            writeln!(out)?;
            writeln!(out, "🏁 Total time: {:?}", start_time.elapsed())?;
        }
    }
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_subcommands_and_globals() {
        let args = Args::try_parse_from([
            "contagion-console",
            "--seed",
            "9",
            "infect",
            "subject",
            "common_cold",
            "2",
        ])
        .unwrap();
        assert_eq!(args.seed, Some(9));
        assert!(matches!(
            args.command,
            Commands::Infect { stage: Some(2), .. }
        ));
    }

    #[test]
    fn simulate_rejects_unknown_report_format() {
        let parsed =
            Args::try_parse_from(["contagion-console", "simulate", "--report", "yaml"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn parse_target_accepts_ids_and_names() {
        assert_eq!(
            parse_target("#3").unwrap(),
            Target::Id(contagion_engine::EntityId::new(3))
        );
        assert_eq!(
            parse_target("subject").unwrap(),
            Target::Name("subject".to_string())
        );
        assert!(parse_target("#abc").is_err());
    }

    #[test]
    fn sandbox_session_defaults_to_one_subject() {
        let session = sandbox_session(DiseaseEngine::with_default_catalog(), &[]);
        assert!(session.world().find("subject").is_some());
        assert_eq!(session.world().mobs().count(), 1);
    }
}
