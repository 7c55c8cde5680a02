//! Husk CLI - strip Python sources and flatten codebases for LLMs.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use husk::errors::{exit_code, HuskError};
use husk::filter::{InclusionPolicy, DEFAULT_OUTPUT};
use husk::flatten::Flattener;
use husk::strip::{strip_file, StripOptions};
use husk::tokens::Encoding;
use husk::walker::WalkOptions;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "husk")]
#[command(about = "Strip Python sources and flatten codebases for LLMs")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove comments, docstrings and function bodies from a Python file, in place
    Strip {
        /// Python file to rewrite
        file: PathBuf,

        /// Print the result instead of overwriting the file
        #[arg(long)]
        stdout: bool,

        /// Print a JSON report
        #[arg(long)]
        json: bool,

        /// Token encoding for the report
        #[arg(long, default_value = "cl100k")]
        encoding: EncodingArg,
    },

    /// Concatenate a directory's files into one labeled text artifact
    Flatten {
        /// Root directory of the codebase
        directory: PathBuf,

        /// Include files and folders with 'test' or 'mock' in the name
        #[arg(short = 't', long)]
        include_tests: bool,

        /// Disable every default exclusion
        #[arg(long, conflicts_with = "include_tests")]
        all: bool,

        /// Exclude paths matching a glob (repeatable)
        #[arg(long, value_name = "GLOB")]
        exclude: Vec<String>,

        /// Where to write the artifact
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Respect .gitignore files
        #[arg(long)]
        gitignore: bool,

        /// Descend into symlinked directories
        #[arg(short = 'L', long)]
        follow_symlinks: bool,

        /// Maximum directory depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Print a JSON summary instead of the artifact
        #[arg(long)]
        json: bool,

        /// Do not print the artifact
        #[arg(short, long)]
        quiet: bool,

        /// Token encoding for the summary
        #[arg(long, default_value = "cl100k")]
        encoding: EncodingArg,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EncodingArg {
    Cl100k,
    O200k,
}

impl From<EncodingArg> for Encoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Cl100k => Encoding::Cl100kBase,
            EncodingArg::O200k => Encoding::O200kBase,
        }
    }
}

fn main() {
    // Usage errors exit with 1; --help and --version exit cleanly.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            e.print().ok();
            std::process::exit(code);
        }
    };

    let filter = if cli.verbose {
        EnvFilter::new("husk=debug")
    } else {
        EnvFilter::try_from_env("HUSK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let json_output = json_flag(&cli.command);

    let result = match cli.command {
        Commands::Strip {
            file,
            stdout,
            json,
            encoding,
        } => run_strip(&file, stdout, json, encoding.into()),
        Commands::Flatten {
            directory,
            include_tests,
            all,
            exclude,
            output,
            gitignore,
            follow_symlinks,
            max_depth,
            json,
            quiet,
            encoding,
        } => {
            let walk_options = WalkOptions {
                max_depth,
                follow_symlinks,
                respect_gitignore: gitignore,
                ..Default::default()
            };
            build_policy(all, include_tests, &exclude, &output).and_then(|policy| {
                run_flatten(
                    &directory,
                    policy,
                    walk_options,
                    &output,
                    json,
                    quiet,
                    encoding.into(),
                )
            })
        }
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "husk", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        if json_output {
            #[derive(Serialize)]
            struct ErrorOutput {
                error: String,
            }

            let payload = ErrorOutput {
                error: e.to_string(),
            };

            let json = serde_json::to_string(&payload)
                .unwrap_or_else(|_| "{\"error\":\"serialization failed\"}".to_string());
            eprintln!("{json}");
        } else {
            eprintln!("error: {}", e);
        }
        std::process::exit(exit_code(&e));
    }
}

fn json_flag(cmd: &Commands) -> bool {
    match cmd {
        Commands::Strip { json, .. } => *json,
        Commands::Flatten { json, .. } => *json,
        Commands::Completions { .. } => false,
    }
}

// --- Strip command ---

fn run_strip(file: &Path, stdout: bool, json: bool, encoding: Encoding) -> Result<(), HuskError> {
    let options = StripOptions {
        dry_run: stdout,
        encoding,
    };
    let report = strip_file(file, &options)?;

    if stdout {
        print!("{}", report.output);
    }

    if json {
        let json = serde_json::to_string_pretty(&report)?;
        if stdout {
            eprintln!("{json}");
        } else {
            println!("{json}");
        }
    } else if !stdout {
        println!(
            "Removed comments, docstrings, and function bodies from {}",
            file.display()
        );
    }

    Ok(())
}

// --- Flatten command ---

fn build_policy(
    all: bool,
    include_tests: bool,
    exclude: &[String],
    output: &Path,
) -> Result<InclusionPolicy, HuskError> {
    let mut policy = if all {
        InclusionPolicy::unfiltered()
    } else {
        InclusionPolicy::default().include_tests(include_tests)
    };

    if let Some(name) = output.file_name() {
        let name = name.to_string_lossy();
        if name != DEFAULT_OUTPUT {
            policy = policy.exclude_file(name.into_owned());
        }
    }

    for pattern in exclude {
        policy = policy.exclude_glob(pattern)?;
    }

    Ok(policy)
}

fn run_flatten(
    directory: &Path,
    policy: InclusionPolicy,
    walk_options: WalkOptions,
    output: &Path,
    json: bool,
    quiet: bool,
    encoding: Encoding,
) -> Result<(), HuskError> {
    let flattened = Flattener::new(directory)
        .policy(policy)
        .walk_options(walk_options)
        .flatten()?;

    let artifact = flattened.render();
    fs::write(output, &artifact).map_err(|e| HuskError::io(output, e))?;

    if json {
        let summary = flattened.summary(output, encoding);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !quiet {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{artifact}").map_err(|e| HuskError::io(Path::new("<stdout>"), e))?;
    }

    Ok(())
}
