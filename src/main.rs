use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cdvtask::project::Project;
use cdvtask::tasks::{standard_tasks, TaskName};

#[derive(Parser)]
#[command(name = "cdvtask")]
#[command(about = "Manage a Cordova app whose native project is a disposable build directory")]
struct Cli {
    /// Project directory containing package.json and src/
    #[arg(short = 'C', long, default_value = ".")]
    project_dir: PathBuf,

    /// Tasks to run, together with the tasks they depend on
    #[arg(value_enum, required = true)]
    tasks: Vec<TaskName>,
}

/// Initialize tracing with output to stderr.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "cdvtask=info,tower_http=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let project = Arc::new(Project::load(&cli.project_dir)?);
    tracing::debug!(
        base = %project.layout.base_dir.display(),
        build = %project.layout.build_dir.display(),
        "Loaded project"
    );

    let graph = standard_tasks(project);
    let report = graph.run(&cli.tasks).await?;

    let total: std::time::Duration = report.tasks.iter().map(|t| t.elapsed).sum();
    tracing::info!(tasks = ?report.names(), "Done after {:?}", total);

    Ok(())
}
