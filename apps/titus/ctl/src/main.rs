//! Titus CLI
//!
//! Drives the Titus job-scheduler client from the command line. Connection
//! settings come from the `TITUS_*` environment variables.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use domain_titus::{JobDescription, JobManagementApi, TitusClient, TitusClientConfig};
use eyre::{Result, WrapErr};
use grpc_client::BackoffScheduler;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "titus-ctl")]
#[command(about = "Submit, inspect and manage Titus jobs")]
struct Cli {
    /// Print the Prometheus text exposition after the command
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a job by id
    GetJob { job_id: String },

    /// Show a task by id
    GetTask { task_id: String },

    /// Find a job submitted by this client by name
    FindJob { name: String },

    /// List jobs, either all service jobs or those of one application
    ListJobs {
        #[arg(short, long)]
        application: Option<String>,
    },

    /// Submit a job from a JSON job description
    Submit {
        #[arg(short, long)]
        file: PathBuf,

        /// Destination account label. Defaults to TITUS_ACCOUNT.
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Change a job's instance counts
    Resize {
        job_id: String,

        #[arg(long)]
        desired: u32,

        #[arg(long)]
        min: u32,

        #[arg(long)]
        max: u32,
    },

    /// Put a service job in service
    Activate { job_id: String },

    /// Take a service job out of service
    Deactivate { job_id: String },

    /// Kill a job
    Terminate { job_id: String },

    /// Kill tasks, optionally shrinking the job
    KillTasks {
        #[arg(required = true)]
        task_ids: Vec<String>,

        #[arg(long)]
        shrink: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let environment = Environment::from_env();
    init_tracing(&environment);

    let cli = Cli::parse();
    observability::init_metrics()?;

    let config = TitusClientConfig::from_env()?;
    let scheduler = BackoffScheduler::new();
    let client = TitusClient::connect(&config, &scheduler, config.credentials())?;

    let result = run(&client, cli.command, &config.account).await;

    drop(client);
    scheduler.shutdown().await;

    if cli.print_metrics {
        print!("{}", observability::render_metrics());
    }

    result
}

async fn run<A: JobManagementApi>(
    client: &TitusClient<A>,
    command: Commands,
    default_account: &str,
) -> Result<()> {
    match command {
        Commands::GetJob { job_id } => print_json(&client.get_job(&job_id).await?)?,

        Commands::GetTask { task_id } => print_json(&client.get_task(&task_id).await?)?,

        Commands::FindJob { name } => match client.find_job_by_name(&name).await? {
            Some(job) => print_json(&job)?,
            None => eyre::bail!("No job named '{}'", name),
        },

        Commands::ListJobs { application } => {
            let jobs = match application {
                Some(application) => client.find_jobs_by_application(&application).await?,
                None => client.get_all_jobs().await?,
            };
            print_json(&jobs)?;
        }

        Commands::Submit { file, account } => {
            let raw = std::fs::read_to_string(&file)
                .wrap_err_with(|| format!("Failed to read {}", file.display()))?;
            let description: JobDescription = serde_json::from_str(&raw)
                .wrap_err_with(|| format!("Invalid job description in {}", file.display()))?;

            let account = account.as_deref().unwrap_or(default_account);
            let job_id = client.submit_job(description, account).await?;
            info!(%job_id, account, "Job submitted");
            println!("{}", job_id);
        }

        Commands::Resize {
            job_id,
            desired,
            min,
            max,
        } => {
            if !(min <= desired && desired <= max) {
                eyre::bail!("Expected min <= desired <= max, got {min}/{desired}/{max}");
            }
            client.resize_job(&job_id, desired, min, max).await?;
            info!(%job_id, desired, min, max, "Job resized");
        }

        Commands::Activate { job_id } => {
            client.activate_job(&job_id, true).await?;
            info!(%job_id, "Job activated");
        }

        Commands::Deactivate { job_id } => {
            client.activate_job(&job_id, false).await?;
            info!(%job_id, "Job deactivated");
        }

        Commands::Terminate { job_id } => {
            client.terminate_job(&job_id).await?;
            info!(%job_id, "Job terminated");
        }

        Commands::KillTasks { task_ids, shrink } => {
            let count = task_ids.len();
            client.terminate_tasks_and_shrink(task_ids, shrink).await?;
            info!(count, shrink, "Tasks killed");
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
