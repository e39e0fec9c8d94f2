//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    u16::try_from(parse_hex_u32(s)?).map_err(|_| format!("{} does not fit in 16 bits", s))
}

fn parse_hex_u8(s: &str) -> Result<u8, String> {
    u8::try_from(parse_hex_u32(s)?).map_err(|_| format!("{} does not fit in 8 bits", s))
}

fn parse_hex_usize(s: &str) -> Result<usize, String> {
    parse_hex_u32(s).map(|v| v as usize)
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        plxeeprom_device::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "plxeeprom")]
#[command(author, version, about = "PLX PCI905x serial EEPROM programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Device selection shared across commands
///
/// Without --bus/--slot or IDs the first PLX device whose device ID matches
/// --plx (PCI9050 by default) is used.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DeviceArgs {
    /// Programmer to use
    #[arg(short, long, default_value = "pci", help = programmer_help())]
    pub programmer: String,

    /// PCI bus number
    #[arg(long, value_parser = parse_hex_u8)]
    pub bus: Option<u8>,

    /// PCI slot (device) number
    #[arg(long, value_parser = parse_hex_u8)]
    pub slot: Option<u8>,

    /// PCI vendor ID
    #[arg(long, value_parser = parse_hex_u16)]
    pub vendor: Option<u16>,

    /// PCI device ID
    #[arg(long, value_parser = parse_hex_u16)]
    pub device: Option<u16>,

    /// PCI subsystem vendor ID
    #[arg(long, value_parser = parse_hex_u16)]
    pub subvendor: Option<u16>,

    /// PCI subsystem device ID
    #[arg(long, value_parser = parse_hex_u16)]
    pub subdevice: Option<u16>,

    /// Which of several matching devices to use, counting from 0
    #[arg(long, default_value = "0", value_parser = parse_hex_u32)]
    pub instance: u32,

    /// Expected PLX model (9030, 9050, 9052, 9054, 9056, 9060, 9080, 9656)
    #[arg(long, value_parser = parse_hex_u32)]
    pub plx: Option<u32>,

    /// EEPROM type (46, 56, 66) or size in bytes or bits
    #[arg(long, value_parser = parse_hex_u32)]
    pub eeprom: Option<u32>,
}

/// Byte range within the EEPROM
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// Start offset in bytes
    #[arg(long, default_value = "0", value_parser = parse_hex_usize)]
    pub offset: usize,

    /// Number of bytes (default: up to the end of the EEPROM)
    #[arg(long, value_parser = parse_hex_usize)]
    pub length: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect the bridge and report it
    Probe {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Show detailed information about the bridge and its EEPROM
    Info {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Read EEPROM contents to file
    Read {
        #[command(flatten)]
        device: DeviceArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Write file to EEPROM
    Write {
        #[command(flatten)]
        device: DeviceArgs,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Start offset in bytes
        #[arg(long, default_value = "0", value_parser = parse_hex_usize)]
        offset: usize,

        /// Don't verify after writing
        #[arg(long)]
        no_verify: bool,
    },

    /// Verify EEPROM contents against file
    Verify {
        #[command(flatten)]
        device: DeviceArgs,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Start offset in bytes
        #[arg(long, default_value = "0", value_parser = parse_hex_usize)]
        offset: usize,
    },

    /// List available programmers
    ListProgrammers,

    /// List supported bridges and their EEPROM options
    ListChips,
}
