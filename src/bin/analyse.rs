//! Price analysis of a stored quote dataset.
//!
//! Loads every record once, then for each breakdown prints one row per
//! aggregate group and renders a box plot figure.

use std::path::PathBuf;

use clap::Parser;
use quotesim::{
    aggregate::{AggregateGroup, Breakdown, GroupKey},
    cli::{self, StoreArgs},
    prelude::*,
    render::Figure,
    store::QuoteStore,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[clap(flatten)]
    store: StoreArgs,

    /// Directory the figures are written to.
    #[clap(long = "output-dir", default_value = "figures")]
    output_dir: PathBuf,

    /// Print the tables only.
    #[clap(long)]
    no_figures: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    cli::init();
    let args = Args::parse();

    let store = args.store.connect().await?;
    let records = store.load_all().await.context("failed to load quote records")?;
    if records.is_empty() {
        bail!("the quote store is empty, run `quotesim` first");
    }
    println!("Quote records: {}", records.len());

    for breakdown in Breakdown::ALL {
        let groups = breakdown.aggregate(&records);
        print_groups(breakdown, &groups);
        if !args.no_figures {
            Figure::from_groups(breakdown, &groups).render(&args.output_dir)?;
        }
    }
    Ok(())
}

fn print_groups(breakdown: Breakdown, groups: &[AggregateGroup<GroupKey>]) {
    println!("\n=== Prices by {} ({} groups) ===", breakdown.name(), groups.len());
    println!(
        "{:<32} | {:>6} | {:>8} | {:>8} | {:>8} | {:>8} | {:>8} | {:>8}",
        "Group", "Count", "Avg", "Min", "P25", "Median", "P75", "Max"
    );
    println!("{}", "-".repeat(32 + 3 * 7 + 6 + 8 * 7));
    for g in groups {
        let s = &g.stats;
        println!(
            "{:<32} | {:>6} | {:>8.2} | {:>8.2} | {:>8.2} | {:>8.2} | {:>8.2} | {:>8.2}",
            g.key.to_string(),
            s.count,
            s.avg,
            s.min,
            s.p25,
            s.median,
            s.p75,
            s.max,
        );
    }
}
