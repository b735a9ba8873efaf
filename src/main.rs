use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use env_logger::Env;
use log::{info, warn};
use std::net::IpAddr;
use std::path::PathBuf;

use addrspace::audit::audit_tables;
use addrspace::config::load_inventory;
use addrspace::engine::InventoryEngine;
use addrspace::orchestrator::apply_inventory;
use addrspace::prefix::Prefix;
use addrspace::report;
use addrspace::store::Store;

/// Address-space bookkeeping engine for network inventory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the inventory YAML file
    #[arg(short, long)]
    inventory: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the inventory and write the hierarchy/occupancy report
    Check {
        /// Output path for the JSON report
        #[arg(short, long, default_value = "blocks.json")]
        output: PathBuf,
    },
    /// Find the most specific block covering an address
    Match {
        /// Address to look up
        #[arg(long)]
        address: IpAddr,
        /// Routing domain to search from (global blocks are always visible)
        #[arg(long)]
        domain: Option<String>,
    },
    /// Report occupancy of a block or range
    Utilization {
        /// Block CIDR value
        #[arg(long, conflicts_with = "range_id")]
        block: Option<String>,
        /// Range id as listed in the check report
        #[arg(long)]
        range_id: Option<u64>,
        /// Routing domain of the block
        #[arg(long)]
        domain: Option<String>,
    },
    /// List free addresses in a block
    Available {
        /// Block CIDR value
        #[arg(long)]
        block: String,
        /// Routing domain of the block
        #[arg(long)]
        domain: Option<String>,
        /// Cap on the number of addresses listed
        #[arg(long, default_value_t = 64)]
        limit: usize,
    },
    /// Sweep the inventory for invariant drift
    Audit,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting addrspace");
    info!("Inventory file: {:?}", args.inventory);

    let inventory = load_inventory(&args.inventory)?;
    let engine = InventoryEngine::in_memory();
    apply_inventory(&engine, &inventory)?;

    match args.command {
        Command::Check { output } => {
            let report = report::report_from(engine.store());
            report::write_report(&report, &output)?;
            println!(
                "Inventory OK: {} blocks, {} ranges, {} addresses",
                report.blocks.len(),
                report.ranges.len(),
                report.address_count
            );
        }
        Command::Match { address, domain } => {
            match engine.match_address(&address, domain.as_deref()) {
                Some(hit) => println!(
                    "{} is covered by {} (id {}, domain {})",
                    address,
                    hit.prefix,
                    hit.block_id,
                    hit.domain.as_deref().unwrap_or("global")
                ),
                None => println!("{} has no covering block", address),
            }
        }
        Command::Utilization {
            block,
            range_id,
            domain,
        } => {
            let report = match (block, range_id) {
                (Some(cidr), None) => {
                    let prefix = Prefix::parse(&cidr)?;
                    let id = engine
                        .find_block(&prefix, domain.as_deref())
                        .ok_or_else(|| eyre!("no block {} in that domain", prefix))?;
                    engine.block_utilization(id)
                }
                (None, Some(id)) => engine.range_utilization(id),
                _ => return Err(eyre!("pass exactly one of --block or --range-id")),
            };
            println!(
                "{:.3}% used ({} of {})",
                report.percentage, report.used, report.total
            );
        }
        Command::Available {
            block,
            domain,
            limit,
        } => {
            let prefix = Prefix::parse(&block)?;
            let id = engine
                .find_block(&prefix, domain.as_deref())
                .ok_or_else(|| eyre!("no block {} in that domain", prefix))?;
            let free = engine.available_addresses(id, Some(limit))?;
            if free.is_empty() {
                println!("no addresses available in {}", prefix);
            } else {
                for addr in &free {
                    println!("{}", addr);
                }
                if free.len() == limit {
                    warn!("output capped at {} addresses", limit);
                }
            }
        }
        Command::Audit => {
            let findings = engine.store().read(audit_tables);
            if findings.is_empty() {
                println!("audit clean");
            } else {
                for finding in &findings {
                    println!("{}: {}", finding.entity, finding.problem);
                }
                return Err(eyre!("audit found {} problems", findings.len()));
            }
        }
    }

    Ok(())
}
