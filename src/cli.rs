use clap::Parser;
use std::path::PathBuf;

/// Student records and attendance daemon speaking JSON lines over stdin/stdout
#[derive(Parser, Debug, Clone)]
#[command(name = "edutainmentd")]
#[command(about = "Student records, attendance and performance summaries", long_about = None)]
#[command(version)]
pub struct Args {
    /// Workspace directory to open at startup
    #[arg(long, value_name = "PATH", env = "EDUTAINMENTD_WORKSPACE")]
    pub workspace: Option<PathBuf>,
}
