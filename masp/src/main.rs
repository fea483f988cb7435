//! MASP binary entry point: installs `color-eyre` and `tracing-subscriber`,
//! parses the CLI (§6), and drives the engine over each input file in
//! order.

mod cli;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::Cli;
use masp_core::engine::{Engine, EngineConfig};

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(
            "masp=info".parse().expect("static directive parses"),
        ))
        .init();

    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "masp", &mut io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let config = EngineConfig {
        copy_source: cli.copy_source,
        comment_char: cli.comment_char,
        include_path: cli.include_dir.clone(),
    };

    let exit_code = match cli.output {
        Some(path) => {
            let file = File::create(&path)
                .map_err(|source| color_eyre::eyre::eyre!("cannot create {}: {source}", path.display()))?;
            run(cli, config, BufWriter::new(file))?
        }
        None => run(cli, config, io::stdout().lock())?,
    };

    Ok(ExitCode::from(exit_code))
}

fn run<W: Write>(cli: Cli, config: EngineConfig, out: W) -> color_eyre::Result<u8> {
    let mut engine = Engine::new(out, config);

    if cli.inputs.is_empty() {
        tracing::warn!("no input files given; nothing to do");
        return Ok(0);
    }

    for path in &cli.inputs {
        if let Err(err) = engine.process_file(path) {
            tracing::error!("{path:?}: {err}");
        }
        if let Some(fatal) = engine.fatal() {
            tracing::error!("stopping: {fatal}");
            break;
        }
    }

    engine.emitter.flush().map_err(|source| color_eyre::eyre::eyre!("flush failed: {source}"))?;

    Ok(engine.exit_code() as u8)
}
