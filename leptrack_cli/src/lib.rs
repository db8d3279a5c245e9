#![allow(clippy::missing_errors_doc)]
#![allow(missing_docs)]

mod helpers;
mod media;
mod propagate;
mod range;

use anyhow::Result;
use clap::{ArgAction, Parser};
use enum_dispatch::enum_dispatch;
use std::process::ExitCode;

#[derive(Parser)]
pub struct GlobalConfiguration {
    /// Increase the log verbosity; repeat for more detail.
    #[arg(action = ArgAction::Count, long, short)]
    pub verbose: u8,
}

#[enum_dispatch]
pub trait Subcommand {
    fn run(&self, cfg: &GlobalConfiguration) -> Result<ExitCode>;
}

#[enum_dispatch(Subcommand)]
#[derive(Parser)]
pub enum SubcommandEnum {
    Media(media::Opts),
    Propagate(propagate::Opts),
    Range(range::Opts),
}

#[derive(Parser)]
#[command(
    arg_required_else_help = true,
    author,
    about,
    disable_help_subcommand = true,
    name = "leptrack",
    version
)]
pub struct Opts {
    #[command(flatten)]
    pub configuration: GlobalConfiguration,
    #[command(subcommand)]
    pub subcommand: SubcommandEnum,
}
