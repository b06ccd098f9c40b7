use std::fs::File;
use std::io::{self, BufReader, Read, Write};

use anyhow::Context;
use atomicwrite::{
    default_registry, resolve, AtomicWriteError, AtomicWriter, FinalizeStrategy, ResolvedUri,
};
use colored::Colorize;
use serde::Serialize;
use tracing::warn;

use crate::cli::*;
use crate::config::CliConfig;

pub fn run_command(cli: Cli, config: &CliConfig) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Write(args) => match &args.input {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("opening input {}", path.display()))?;
                cmd_write(&args, config, BufReader::new(file), cli.format, &mut out)
            }
            None => cmd_write(&args, config, io::stdin().lock(), cli.format, &mut out),
        },
        Command::Cat(args) => cmd_cat(&args, &mut out),
        Command::Resolve(args) => cmd_resolve(&args, cli.format, &mut out),
    }
}

#[derive(Debug, Serialize)]
pub struct WriteReport {
    pub destination: String,
    pub bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stray_temp_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub uri: String,
    pub scheme: String,
    pub location: String,
    pub key: String,
}

impl From<&ResolvedUri> for ResolveReport {
    fn from(r: &ResolvedUri) -> Self {
        Self {
            uri: r.to_string(),
            scheme: r.address.scheme().to_string(),
            location: r.address.location().to_string(),
            key: r.key.to_string(),
        }
    }
}

pub fn cmd_write(
    args: &WriteArgs,
    config: &CliConfig,
    mut input: impl Read,
    format: OutputFormat,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut options = config.write_options();
    if args.copy {
        options = options.with_finalize(FinalizeStrategy::Copy);
    }

    let mut writer = AtomicWriter::with_options(&args.dest, options)
        .with_context(|| format!("opening {}", args.dest))?;
    io::copy(&mut input, &mut writer)
        .with_context(|| format!("staging {} at {}", args.dest, writer.temp_key()))?;
    writer
        .close()
        .with_context(|| format!("finalizing {}", args.dest))?;

    let report = WriteReport {
        destination: args.dest.clone(),
        bytes: writer.bytes_written(),
        stray_temp_key: writer.stray_temp_key().map(ToString::to_string),
    };
    if let Some(stray) = &report.stray_temp_key {
        warn!(temp_key = %stray, "temp object left behind");
    }

    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?,
        OutputFormat::Text => {
            writeln!(
                out,
                "{} Wrote {} bytes to {}",
                "✓".green().bold(),
                report.bytes,
                report.destination.bold()
            )?;
            if let Some(stray) = &report.stray_temp_key {
                writeln!(out, "  {} temp object {} was not removed", "warning:".yellow(), stray)?;
            }
        }
    }
    Ok(())
}

pub fn cmd_cat(args: &CatArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let resolved = resolve(&args.uri)?;
    let store = default_registry()
        .open(&resolved.address)
        .map_err(|source| AtomicWriteError::BackendOpen {
            address: resolved.address.clone(),
            source,
        })?;
    let mut reader = store
        .open_reader(&resolved.key)
        .with_context(|| format!("reading {resolved}"))?;
    io::copy(&mut reader, out).with_context(|| format!("reading {resolved}"))?;
    out.flush()?;
    Ok(())
}

pub fn cmd_resolve(
    args: &ResolveArgs,
    format: OutputFormat,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let resolved = resolve(&args.uri)?;
    let report = ResolveReport::from(&resolved);
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?,
        OutputFormat::Text => {
            writeln!(out, "store: {}", resolved.address.to_string().cyan())?;
            writeln!(out, "key:   {}", report.key.yellow())?;
        }
    }
    Ok(())
}
