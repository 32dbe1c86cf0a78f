use crate::cli::EquilArgs;
use crate::config::PartialStudyConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use fepflow::engine::config::SchedulerKind;
use fepflow::engine::progress::ProgressReporter;
use fepflow::engine::scheduler::{JobRunner, LocalRunner, SgeScheduler};
use fepflow::workflows;
use tracing::info;

pub fn run(args: EquilArgs) -> Result<()> {
    let partial = match &args.config {
        Some(path) => PartialStudyConfig::from_file(path)?,
        None => PartialStudyConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let settings = partial.merge_with_cli(&args)?;

    let runner: Box<dyn JobRunner> = match settings.scheduler {
        SchedulerKind::Local => Box::new(LocalRunner),
        SchedulerKind::Sge => Box::new(SgeScheduler::new()),
    };
    info!(
        scheduler = ?settings.scheduler,
        proteins = args.proteins.len(),
        repeats = settings.n_repeats,
        "Invoking the equilibration workflow..."
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting equilibration for {} study folder(s)...", args.proteins.len());
    let summary = workflows::equil::run(&settings, &args.proteins, runner.as_ref(), &reporter)?;

    println!(
        "✓ Equilibration complete: {} job(s) run, {} already finished.",
        summary.completed.len(),
        summary.skipped.len()
    );
    Ok(())
}
