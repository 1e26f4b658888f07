//! Entry point for the zonal-means application.
//! Handles CLI parsing, builds the job, and dispatches the run or an inspection.

use clap::Parser;
use zonal_means::aggregate::run_job;
use zonal_means::config::JobConfig;
use zonal_means::metadata::{describe_boundary, describe_raster};
use zonal_means::output::RunManifest;
use zonal_means::parallel::{ParallelConfig, ParallelInfo};
use zonal_means::Result;

mod cli;

use cli::{Args, Command};

fn main() {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    println!(
        r#"
------------------------------------------------------------------
     zonal-means : per-region, per-year raster statistics
------------------------------------------------------------------"#
    );

    if let Err(e) = run(args) {
        log::error!("FATAL: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    ParallelConfig::new(args.threads).setup_global_pool()?;
    if args.verbose {
        ParallelInfo::current().print_info();
    }

    let mut config = match args.command {
        Command::Climate { root } => JobConfig::climate(&root),
        Command::Indices { root } => JobConfig::indices(&root),
        Command::Run { config } => JobConfig::from_toml_file(&config)?,
        Command::Inspect { path, boundary } => {
            if boundary {
                describe_boundary(&path)?.print();
            } else {
                describe_raster(&path)?.print();
            }
            return Ok(());
        }
    };

    if let Some(output) = args.output {
        config.output = output;
    }
    if let Some(stat) = args.stat {
        config.statistic = stat;
    }
    if let Some(years) = args.years {
        config.restrict_years(years)?;
    }

    let report = run_job(&config)?;

    if args.manifest {
        let manifest = RunManifest::new(
            &config,
            report.regions,
            report.rows_written,
            report.variables.clone(),
        );
        manifest.write(&RunManifest::path_for(&config.output))?;
    }

    report.print_summary();
    report.table.print_preview(args.preview);

    Ok(())
}
