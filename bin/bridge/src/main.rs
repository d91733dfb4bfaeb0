#![doc = include_str!("../README.md")]

use clap::Parser;

mod cli;
mod commands;
mod flags;

fn main() {
    iris_cli::backtrace::enable();
    if let Err(err) = cli::Cli::parse().run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
