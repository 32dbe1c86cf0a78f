use crate::cli::AnalyzeArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use fepflow::core::units::Unit;
use fepflow::core::work::Selection;
use fepflow::engine::progress::ProgressReporter;
use fepflow::workflows;
use fepflow::workflows::analyze::{AnalyzeConfig, Method};
use fepflow::workflows::report::{ReportHeader, Tee, write_report};
use std::fs::File;
use tracing::info;

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let config = build_config(&args)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the analysis workflow...");
    let Some(results) = workflows::analyze::run(&config, &reporter)? else {
        println!(
            "✓ Integrated work written to {} and {}.",
            config.integ_out.0.display(),
            config.integ_out.1.display()
        );
        return Ok(());
    };

    let header = build_header();
    let file = File::create(&args.output)?;
    let stdout = std::io::stdout();
    let mut tee = Tee::new(file, stdout.lock());
    write_report(&mut tee, &header, &results)?;

    println!("✓ Results written to {}.", args.output.display());
    Ok(())
}

fn build_config(args: &AnalyzeArgs) -> Result<AnalyzeConfig> {
    let unit: Unit = args
        .units
        .parse()
        .map_err(|e: fepflow::core::units::ParseUnitError| CliError::Argument(e.to_string()))?;

    let integ_in = match (&args.integ_in_forward, &args.integ_in_reverse) {
        (Some(a), Some(b)) => Some((a.clone(), b.clone())),
        _ => None,
    };
    if integ_in.is_none() && (args.files_forward.is_empty() || args.files_reverse.is_empty()) {
        return Err(CliError::Argument(
            "forward and reverse dgdl files are required unless --iA/--iB are given".to_string(),
        ));
    }

    let sel = &args.selection;
    let selection = if let Some(n) = sel.skip {
        Selection::Skip(n)
    } else if let Some(range) = &sel.slice {
        Selection::Slice {
            first: range[0],
            last: range[1],
        }
    } else if let Some(n) = sel.rand {
        Selection::Random(n)
    } else if let Some(indices) = &sel.index {
        Selection::Index(indices.clone())
    } else {
        Selection::All
    };

    let mut methods: Vec<Method> = args.methods.iter().map(|&m| m.into()).collect();
    methods.dedup();

    Ok(AnalyzeConfig {
        files_forward: args.files_forward.clone(),
        files_reverse: args.files_reverse.clone(),
        methods,
        temperature: args.temperature,
        selection,
        reverse_b: args.reverse_b,
        integ_only: args.integ_only,
        integ_in,
        integ_out: (
            args.integ_out_forward.clone(),
            args.integ_out_reverse.clone(),
        ),
        nboots: args.nboots,
        nblocks: args.nblocks,
        unit,
        precision: args.precision,
        do_ks_test: !args.no_ks,
    })
}

fn build_header() -> ReportHeader {
    ReportHeader {
        version: env!("CARGO_PKG_VERSION").to_string(),
        cwd: std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "unknown".to_string()),
        timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        user: std::env::var("USER").unwrap_or_else(|_| "unknown".to_string()),
        command: std::env::args().collect::<Vec<_>>().join(" "),
    }
}
