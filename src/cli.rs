use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "annotation-finder")]
#[command(about = "Find annotated Java classes on a class search path")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Class search path; defaults to $CLASSPATH, then the current directory
    #[arg(long, visible_alias = "cp", value_name = "PATH_LIST", global = true)]
    pub classpath: Option<String>,

    /// Add every jar found below DIR (repeatable)
    #[arg(long = "lib", value_name = "DIR", global = true)]
    pub libs: Vec<PathBuf>,

    /// Add every jar of the local Maven repository
    #[arg(long, global = true)]
    pub m2: bool,

    /// Location of the local Maven repository (implies --m2)
    #[arg(long, value_name = "DIR", global = true)]
    pub m2_repo: Option<PathBuf>,

    /// Log progress to stderr (-vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// List classes in PACKAGE annotated with ANNOTATION
    Find {
        annotation: String,

        package: String,

        #[arg(short, long)]
        recursive: bool,

        /// Also match class-retention (invisible) annotations
        #[arg(long)]
        invisible: bool,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Print the scan pattern used for PACKAGE
    Pattern {
        package: String,

        #[arg(short, long)]
        recursive: bool,
    },
    /// Print the header metadata of CLASS as found on the search path
    Inspect { class_name: String },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
