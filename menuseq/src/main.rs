//! Staged build scheduler for trigger-menu reconstruction sequences.
//!
//! Reads menu declarations (`.menuseq/menu.toml`) and reconstruction options
//! (`.menuseq/reco.toml`) and prints, per step, the algorithms needed to
//! produce the requested inputs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use menuseq::exit_codes;
use menuseq::io::init::{InitOptions, ProjectPaths, init_project};
use menuseq::io::plan_store::{plan_to_json, write_plan};
use menuseq::logging;
use menuseq::plan::{PlanOutcome, PlanRequest, plan_from_files, render_text};
use menuseq::validate::{ValidateOutcome, validate_menus};

#[derive(Parser, Debug)]
#[command(
    name = "menuseq",
    version,
    about = "Staged dependency-resolving build scheduler for trigger menus"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create `.menuseq/` with a sample menu and reconstruction config.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// Load menu files and config, then audit the dependency graph.
    Validate {
        #[command(flatten)]
        files: FileArgs,
    },
    /// Resolve requested inputs and print the per-step schedule.
    Plan {
        /// Input to produce (repeatable, or comma separated).
        #[arg(
            short,
            long = "request",
            value_name = "NAME",
            required = true,
            value_delimiter = ','
        )]
        requests: Vec<String>,
        #[command(flatten)]
        files: FileArgs,
        /// Also write the plan as JSON to this path.
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug)]
struct FileArgs {
    /// Menu file (repeatable). Defaults to `.menuseq/menu.toml`.
    #[arg(short, long = "menu", value_name = "PATH")]
    menus: Vec<PathBuf>,
    /// Reconstruction config. Defaults to `.menuseq/reco.toml`.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl FileArgs {
    fn resolve(self, paths: &ProjectPaths) -> (Vec<PathBuf>, PathBuf) {
        let menus = if self.menus.is_empty() {
            vec![paths.menu_path.clone()]
        } else {
            self.menus
        };
        let config = self.config.unwrap_or_else(|| paths.config_path.clone());
        (menus, config)
    }
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return Ok(if err.use_stderr() {
                exit_codes::INVALID
            } else {
                exit_codes::OK
            });
        }
    };
    let paths = ProjectPaths::new(".");
    match cli.command {
        Command::Init { force } => cmd_init(&paths.root, force),
        Command::Validate { files } => {
            let (menus, config) = files.resolve(&paths);
            cmd_validate(&menus, &config)
        }
        Command::Plan {
            requests,
            files,
            out,
            json,
        } => {
            let (menus, config_path) = files.resolve(&paths);
            cmd_plan(
                PlanRequest {
                    menus,
                    config_path,
                    requested: requests,
                },
                out.as_deref(),
                json,
            )
        }
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<i32> {
    let paths = init_project(root, &InitOptions { force })?;
    println!("initialized {}", paths.project_dir.display());
    Ok(exit_codes::OK)
}

fn cmd_validate(menus: &[PathBuf], config: &Path) -> Result<i32> {
    match validate_menus(menus, config)? {
        ValidateOutcome::Ok { inputs, steps } => {
            println!("ok: {inputs} inputs, {steps} steps");
            Ok(exit_codes::OK)
        }
        ValidateOutcome::Problems(problems) => {
            for problem in &problems {
                println!("- {problem}");
            }
            eprintln!("error: {} problem(s) found", problems.len());
            Ok(exit_codes::UNRESOLVED)
        }
    }
}

fn cmd_plan(request: PlanRequest, out: Option<&Path>, json: bool) -> Result<i32> {
    let plan = match plan_from_files(&request)? {
        PlanOutcome::Planned(plan) => plan,
        PlanOutcome::Unresolved(err) => {
            eprintln!("error: {err}");
            return Ok(exit_codes::UNRESOLVED);
        }
        PlanOutcome::OutOfOrder(problems) => {
            for problem in &problems {
                eprintln!("- {problem}");
            }
            eprintln!("error: plan schedules inputs before their dependencies");
            return Ok(exit_codes::UNRESOLVED);
        }
    };

    if let Some(path) = out {
        write_plan(path, &plan).with_context(|| format!("write plan {}", path.display()))?;
        info!(path = %path.display(), "wrote plan");
    }
    if json {
        print!("{}", plan_to_json(&plan)?);
    } else {
        print!("{}", render_text(&plan));
    }
    Ok(exit_codes::OK)
}
