use anyhow::{bail, Context};
use colored::Colorize;
use oppsql_merge::{MergeConfig, MergeReport, Merger, Target};
use oppsql_query::{unique_param, vector_samples, VectorSample};

use crate::cli::*;
use crate::discover::{default_output, discover_sources};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Merge(args) => cmd_merge(args, &cli.format),
        Command::Param(args) => cmd_param(args, &cli.format),
        Command::Vector(args) => cmd_vector(args, &cli.format),
    }
}

fn cmd_merge(args: MergeArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => MergeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MergeConfig::default(),
    };
    config.strip_quotes |= args.strip_quotes;

    if !args.dir.is_dir() {
        bail!("not a directory: {}", args.dir.display());
    }
    let sources = discover_sources(&args.dir, &config.source_extensions)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.dir, &sources, &config.output_extension));

    let target = Target::prepare(&output, args.force)?;
    let conn = target
        .open()
        .with_context(|| format!("creating {}", target.path().display()))?;
    let mut merger = Merger::new(conn, config)?;
    let report = merger
        .merge_all(&sources)
        .with_context(|| format!("merging into {}", target.path().display()))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_merge_report(&report, &target),
    }
    Ok(())
}

fn print_merge_report(report: &MergeReport, target: &Target) {
    println!(
        "{} Merged {} files into {}",
        "✓".green().bold(),
        report.sources.len(),
        target.path().display().to_string().bold()
    );
    for source in &report.sources {
        let skipped = if source.tables_deduplicated.is_empty() {
            String::new()
        } else {
            format!(" (shared: {})", source.tables_deduplicated.join(", "))
                .dimmed()
                .to_string()
        };
        println!(
            "  {} {} rows{}",
            format!("[{}]", source.db_id).yellow(),
            source.rows_copied,
            skipped
        );
        println!("      {}", source.path.display());
    }
    if let Some(rows) = report.quotes_stripped {
        println!("  Quotes stripped from {} values", rows.to_string().cyan());
    }
}

fn cmd_param(args: ParamArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let conn = oppsql_query::open(&args.db)
        .with_context(|| format!("opening {}", args.db.display()))?;
    let value = unique_param::<String>(&conn, &args.name)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&value)?),
        OutputFormat::Text => match value {
            Some(v) => println!("{} = {}", args.name.bold(), v),
            None => println!("{} = {}", args.name.bold(), "(not set)".dimmed()),
        },
    }
    Ok(())
}

fn cmd_vector(args: VectorArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let conn = oppsql_query::open(&args.db)
        .with_context(|| format!("opening {}", args.db.display()))?;
    let samples = vector_samples(&conn, &args.names, &args.by)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&samples)?),
        OutputFormat::Text => print_samples(&args, &samples),
    }
    Ok(())
}

fn print_samples(args: &VectorArgs, samples: &[VectorSample]) {
    let attrs: Vec<&str> = args
        .by
        .iter()
        .filter(|f| f.is_reported())
        .map(|f| f.name.as_str())
        .collect();
    let several = args.names.len() > 1;

    let mut header = vec!["run"];
    header.extend(&attrs);
    if args.time {
        header.push("simtime");
    }
    if args.module {
        header.push("module");
    }
    if several {
        header.push("vector");
    }
    header.push("value");
    println!("{}", header.join("\t").bold());

    for s in samples {
        let mut cells = vec![s.run_name.clone()];
        cells.extend(attrs.iter().map(|a| s.attrs.get(*a).cloned().unwrap_or_default()));
        if args.time {
            cells.push(s.simtime.to_string());
        }
        if args.module {
            cells.push(s.module_name.clone());
        }
        if several {
            cells.push(s.vector_name.clone());
        }
        cells.push(s.value.to_string());
        println!("{}", cells.join("\t"));
    }
}
