use clap::Parser;
use order_report::core::report::ReportRun;
use order_report::utils::logger;
use order_report::{CliArgs, ConsoleDispatcher, ReportEngine, ReportOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    logger::init_cli_logger(args.verbose);
    tracing::info!("Starting order-report CLI");

    let outcome = match execute(&args).await {
        Ok(run) => run.outcome,
        Err(e) => {
            tracing::error!(error = %e, "Report could not start");
            ReportOutcome::from_error(&e)
        }
    };

    report(&outcome)
}

async fn execute(args: &CliArgs) -> order_report::Result<ReportRun> {
    let config = args.validated_config()?;
    if args.verbose {
        tracing::debug!("Report config: {:?}", config);
    }
    let now = args.invocation_time()?;

    let store = config.order_store()?;
    let run = if args.dry_run {
        tracing::info!("Dry run: the summary will be printed, not emailed");
        ReportEngine::new(store, ConsoleDispatcher, config.settings())
            .run_at(now)
            .await
    } else {
        ReportEngine::new(store, config.email_dispatcher()?, config.settings())
            .run_at(now)
            .await
    };
    Ok(run)
}

fn report(outcome: &ReportOutcome) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(&outcome.to_body())?;
    if outcome.is_success() {
        println!("{}", body);
        Ok(())
    } else {
        eprintln!("{}", body);
        std::process::exit(2);
    }
}
