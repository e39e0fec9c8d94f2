//! plxeeprom - Serial EEPROM programmer for PLX PCI bridges
//!
//! Reads, writes and verifies the 93CS46/56/66 configuration EEPROM behind
//! PLX PCI9030/9050/9052/9054/9056/9060/9080/9656 bridges.
//!
//! # Architecture
//!
//! Every command opens a backend through `plxeeprom_device::open_device`,
//! which detects the bridge and returns an `EepromHandle`. The handle
//! presents the EEPROM as a fixed-size byte array no matter which backend
//! (host PCI bus or the simulator) is underneath, so the same command
//! implementations serve both.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, DeviceArgs};
use plxeeprom_device::{open_device, DetectOptions, DeviceInfo, EepromHandle};

/// Detection options from the command line
fn detect_options(args: &DeviceArgs) -> DetectOptions {
    DetectOptions {
        bus: args.bus,
        slot: args.slot,
        vendor: args.vendor,
        device: args.device,
        subvendor: args.subvendor,
        subdevice: args.subdevice,
        instance: args.instance,
        plx: args.plx,
        eeprom: args.eeprom,
    }
}

fn open(args: &DeviceArgs) -> Result<(EepromHandle, DeviceInfo), Box<dyn std::error::Error>> {
    open_device(&args.programmer, &detect_options(args))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let result = match cli.command {
        Commands::Probe { device } => {
            let (_handle, info) = open(&device)?;
            commands::print_probe(&info);
            Ok(())
        }
        Commands::Info { device } => {
            let (_handle, info) = open(&device)?;
            commands::print_info(&info);
            Ok(())
        }
        Commands::Read {
            device,
            output,
            range,
        } => {
            let (handle, _info) = open(&device)?;
            commands::eeprom::run_read(&handle, &output, range.offset, range.length)
        }
        Commands::Write {
            device,
            input,
            offset,
            no_verify,
        } => {
            let (handle, _info) = open(&device)?;
            commands::eeprom::run_write(&handle, &input, offset, !no_verify)
        }
        Commands::Verify {
            device,
            input,
            offset,
        } => {
            let (handle, _info) = open(&device)?;
            commands::eeprom::run_verify(&handle, &input, offset)
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
        Commands::ListChips => {
            commands::list_chips();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
