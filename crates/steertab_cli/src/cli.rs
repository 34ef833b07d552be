use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use steertab_core::classify::TableGeometry;

#[derive(Parser)]
#[command(name = "steertab")]
#[command(author, version, about = "Build and apply traffic steering tables")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub geometry: GeometryArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Shape of the simulated tables
#[derive(Args, Clone, Copy)]
pub struct GeometryArgs {
    /// Width of the table index
    #[arg(long, global = true, default_value_t = 14)]
    pub input_bits: u32,

    /// Width of an entry's destination
    #[arg(long, global = true, default_value_t = 6)]
    pub output_bits: u32,

    #[arg(long, global = true, default_value_t = 4)]
    pub hash_bits: u32,

    #[arg(long, global = true, default_value_t = 8)]
    pub color_bits: u32,

    #[arg(long, global = true, default_value_t = 2)]
    pub interface_bits: u32,
}

impl From<GeometryArgs> for TableGeometry {
    fn from(args: GeometryArgs) -> Self {
        TableGeometry {
            input_bits: args.input_bits,
            output_bits: args.output_bits,
            hash_bits: args.hash_bits,
            color_bits: args.color_bits,
            interface_bits: args.interface_bits,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a bin layout and show the slots each bin receives
    Check {
        /// Layout file
        layout: PathBuf,
    },

    /// Write a bin layout to a table, flip to it and read it back
    Build {
        /// Layout file
        layout: PathBuf,
    },

    /// Apply steering rules with read-back verification, then flip
    Rules {
        /// Rules file
        rules: PathBuf,

        /// Leave the rules in the inactive bank
        #[arg(long)]
        no_flip: bool,
    },

    /// Print the register map of a table
    Regs,
}
