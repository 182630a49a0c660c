use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Parser, Subcommand};
use pcsc::{ReaderState, State, PNP_NOTIFICATION};

use crate::core::{
    atr::classify_atr,
    scan::ScanConfig,
    session::{CardReport, ReaderEvent, SessionController},
    transport::PcscConnector,
    utils::format_hex_spaced,
};

#[derive(Parser)]
#[command(name = "cardprobe")]
#[command(about = "Cross-platform PCSC tool for identifying smart cards and reading EMV cardholder data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available PCSC readers and classify any inserted cards
    List {
        /// Show detailed information about readers
        #[arg(short = 'l', long)]
        detailed: bool,
    },

    /// Probe a card already present in a reader
    Probe {
        /// Reader name or index (use 'list' to see available readers)
        reader: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Highest short file identifier to scan (SFI fits 5 bits of P2)
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u8).range(1..=31))]
        max_files: u8,

        /// Highest record number to read per file
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u8).range(1..=255))]
        max_records: u8,
    },

    /// Monitor all readers for card insertions and probe each card
    Monitor {
        /// Print reports as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug {
        log::LevelFilter::Debug
    } else if cli.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    match cli.command {
        Commands::List { detailed } => cmd_list(detailed),
        Commands::Probe {
            reader,
            json,
            max_files,
            max_records,
        } => cmd_probe(&reader, json, max_files, max_records),
        Commands::Monitor { json } => cmd_monitor(json),
    }
}

fn cmd_list(detailed: bool) -> Result<()> {
    let connector = PcscConnector::new().context("Failed to initialize PCSC")?;

    let readers = connector.list_readers().context("Failed to list readers")?;

    if readers.is_empty() {
        println!("No PCSC readers found.");
        return Ok(());
    }

    println!("Available PCSC readers:");
    for (i, reader_info) in readers.iter().enumerate() {
        if detailed {
            println!("  [{}] {}", i, reader_info.name);
            println!(
                "      Status: {}",
                if reader_info.card_present {
                    "Card present"
                } else {
                    "No card"
                }
            );
            if let Some(ref atr) = reader_info.atr {
                println!("      ATR: {}", format_hex_spaced(atr));
                println!("      Type: {}", classify_atr(atr).family.label());
            }
        } else if reader_info.card_present {
            if let Some(ref atr) = reader_info.atr {
                println!(
                    "  [{}] {} [{}]",
                    i,
                    reader_info.name,
                    classify_atr(atr).family.label()
                );
            } else {
                println!("  [{}] {} [CARD]", i, reader_info.name);
            }
        } else {
            println!("  [{}] {}", i, reader_info.name);
        }
    }

    Ok(())
}

fn cmd_probe(reader_name: &str, json: bool, max_files: u8, max_records: u8) -> Result<()> {
    let connector = PcscConnector::new().context("Failed to initialize PCSC")?;
    let reader_name = resolve_reader_name(&connector, reader_name)?;

    let config = ScanConfig {
        max_files,
        max_records,
    };
    let controller = SessionController::with_config(connector, config);

    match controller.probe(&reader_name) {
        Some(report) => print_report(&report, json),
        None => bail!("Failed to probe card in reader: {reader_name}"),
    }
}

fn cmd_monitor(json: bool) -> Result<()> {
    let connector = PcscConnector::new().context("Failed to initialize PCSC")?;
    let controller = SessionController::new(connector);

    let ctx = pcsc::Context::establish(pcsc::Scope::User)
        .context("Failed to establish PCSC context")?;

    // The PnP pseudo-reader wakes the wait when readers come and go
    let mut reader_states = vec![ReaderState::new(PNP_NOTIFICATION(), State::UNAWARE)];

    println!("Monitoring for card events. Press Ctrl-C to exit.");

    loop {
        // Forget readers that have disappeared
        reader_states.retain(|rs| !is_dead(rs));

        // Pick up readers that have appeared
        let mut readers_buf = [0; 2048];
        let names = ctx
            .list_readers(&mut readers_buf)
            .context("Failed to list readers")?;
        for name in names {
            if !reader_states.iter().any(|rs| rs.name() == name) {
                reader_states.push(ReaderState::new(name, State::UNAWARE));
            }
        }

        ctx.get_status_change(None, &mut reader_states)
            .context("Failed to wait for reader status change")?;

        for event in reader_events(&reader_states) {
            if let Some(report) = controller.handle_event(&event) {
                print_report(&report, json)?;
                println!();
            }
        }

        // every entry must be acknowledged, the PnP pseudo-reader
        // included, or the next wait returns on the stale entry at once
        for rs in &mut reader_states {
            rs.sync_current_state();
        }
    }
}

/// Presence events for the real readers in a status-change batch.
/// The PnP pseudo-reader only wakes the wait and never maps to an event.
fn reader_events(reader_states: &[ReaderState]) -> Vec<ReaderEvent> {
    reader_states
        .iter()
        .filter(|rs| rs.name() != PNP_NOTIFICATION())
        .map(|rs| ReaderEvent {
            reader_name: rs.name().to_string_lossy().to_string(),
            present: rs.event_state().contains(State::PRESENT),
        })
        .collect()
}

fn is_dead(rs: &ReaderState) -> bool {
    rs.event_state().intersects(State::UNKNOWN | State::IGNORE)
}

fn resolve_reader_name(connector: &PcscConnector, name_or_index: &str) -> Result<String> {
    // Try to parse as index first
    if let Ok(index) = name_or_index.parse::<usize>() {
        let readers = connector.list_readers()?;
        if index < readers.len() {
            return Ok(readers[index].name.clone());
        } else if readers.is_empty() {
            bail!("No PCSC readers found");
        } else {
            bail!(
                "Reader index {} out of range (0-{})",
                index,
                readers.len() - 1
            );
        }
    }

    // Use as reader name directly
    Ok(name_or_index.to_string())
}

fn print_report(report: &CardReport, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialize report")?
        );
        return Ok(());
    }

    println!("Reader: {}", report.reader);
    println!("ATR: {}", report.atr);
    println!("Card type: {}", report.family.label());
    if let Some(ref hint) = report.issuer_hint {
        println!("Possibly manufactured by {hint}");
    }
    if let Some(ref app) = report.selected_application {
        println!("Application: {app}");
    }
    if let Some(ref pan) = report.pan {
        println!("Card Number (PAN): {pan}");
    }
    if let Some(ref expiry) = report.expiry {
        println!("Expiration Date (YYMM): {expiry}");
    }
    if let Some(ref name) = report.cardholder_name {
        println!("Cardholder Name: {name}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["cardprobe", "list", "--detailed"]).unwrap();
        assert!(matches!(cli.command, Commands::List { detailed: true }));

        let cli = Cli::try_parse_from([
            "cardprobe",
            "probe",
            "0",
            "--json",
            "--max-files",
            "3",
            "--max-records",
            "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Probe {
                reader,
                json,
                max_files,
                max_records,
            } => {
                assert_eq!(reader, "0");
                assert!(json);
                assert_eq!(max_files, 3);
                assert_eq!(max_records, 5);
            }
            _ => panic!("Expected probe command"),
        }
    }

    #[test]
    fn test_scan_bounds_default_to_ten() {
        let cli = Cli::try_parse_from(["cardprobe", "probe", "Reader A"]).unwrap();
        match cli.command {
            Commands::Probe {
                max_files,
                max_records,
                ..
            } => {
                assert_eq!(max_files, 10);
                assert_eq!(max_records, 10);
            }
            _ => panic!("Expected probe command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["cardprobe", "bogus"]).is_err());
    }

    #[test]
    fn test_scan_bounds_are_range_checked() {
        // an SFI above 31 cannot be encoded in P2's five high bits
        assert!(Cli::try_parse_from(["cardprobe", "probe", "0", "--max-files", "40"]).is_err());
        assert!(Cli::try_parse_from(["cardprobe", "probe", "0", "--max-files", "0"]).is_err());
        assert!(Cli::try_parse_from(["cardprobe", "probe", "0", "--max-records", "0"]).is_err());

        let cli = Cli::try_parse_from([
            "cardprobe",
            "probe",
            "0",
            "--max-files",
            "31",
            "--max-records",
            "255",
        ])
        .unwrap();
        match cli.command {
            Commands::Probe {
                max_files,
                max_records,
                ..
            } => {
                assert_eq!(max_files, 31);
                assert_eq!(max_records, 255);
            }
            _ => panic!("Expected probe command"),
        }
    }

    #[test]
    fn test_reader_events_exclude_pnp_pseudo_reader() {
        let states = vec![
            ReaderState::new(PNP_NOTIFICATION(), State::UNAWARE),
            ReaderState::new(std::ffi::CString::new("Reader A").unwrap(), State::UNAWARE),
        ];

        // the pseudo-reader never becomes an event, but it stays in the
        // state list so the sync pass acknowledges it with the rest
        let events = reader_events(&states);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reader_name, "Reader A");
        assert!(!events[0].present);
        assert_eq!(states.len(), 2);
    }
}
