use clap::Parser;
use scriptpack_rs::{BuildConfig, BuildError, TaskRegistry};
use std::path::PathBuf;

/// scriptpack: bundle JavaScript entry files into minified, source-mapped scripts
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Task to run. One of the registered tasks (see --tasks)
    #[clap(default_value = "default")]
    pub task: String,

    /// Path to a configuration file. Defaults to scriptpack.toml in the working directory, if present
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Working directory that patterns and the destination resolve against
    #[clap(short = 'C', long, default_value = ".")]
    pub cwd: PathBuf,

    /// List the registered tasks and exit
    #[clap(long)]
    pub tasks: bool,
}

async fn run(args: &Args, registry: &TaskRegistry) -> Result<(), BuildError> {
    let config = match &args.config {
        Some(path) => BuildConfig::from_file(path)?,
        None => BuildConfig::discover(&args.cwd)?,
    };
    registry.run(&args.task, &config).await
}

#[tokio::main]
async fn main() {
    let args: Args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let registry = TaskRegistry::with_defaults();
    if args.tasks {
        for name in registry.names() {
            println!("{}", name);
        }
        return;
    }

    if let Err(err) = run(&args, &registry).await {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
