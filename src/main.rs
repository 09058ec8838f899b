use chrono::{Local, NaiveDate};
use clap::Parser;
use quotesim::{
    cli::{self, StoreArgs},
    config::{GeneratorConfig, PricingConfig},
    generator::Generator,
    prelude::*,
    pricing::PricingModel,
    store::QuoteStore,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Generate a synthetic car insurance quote dataset and store it.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[clap(flatten)]
    store: StoreArgs,

    /// Random seed; the same seed and reference date reproduce the dataset.
    #[clap(long, env = "QUOTESIM_SEED")]
    seed: Option<u64>,

    /// Number of quote records.
    #[clap(long, short = 'n')]
    records: Option<usize>,

    /// Reference date quotes are generated back from. Defaults to today.
    #[clap(long)]
    today: Option<NaiveDate>,

    /// Remove stored records before inserting the new ones.
    #[clap(long)]
    replace: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    cli::init();
    let args = Args::parse();

    let mut config = GeneratorConfig::canonical();
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(records) = args.records {
        config.records = records;
    }
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let pricing = PricingModel::new(PricingConfig::canonical()).context("invalid pricing configuration")?;
    let generator = Generator::new(&config, &pricing, today).context("invalid generator configuration")?;
    let store = args.store.connect().await?;

    info!(seed = config.seed, records = config.records, %today, "generating");
    let mut rng = ChaCha20Rng::seed_from_u64(config.seed);
    let records = generator.generate(config.records, &mut rng)?;

    if args.replace {
        let removed = store.truncate().await.context("failed to clear the quote store")?;
        info!(removed, "cleared store");
    }
    let inserted = store.insert_many(&records).await.context("failed to store the dataset")?;

    println!("Quotes generated: {}", records.len());
    println!("Prices offered:   {}", records.iter().map(|r| r.prices().len()).sum::<usize>());
    println!("Records stored:   {inserted}");
    Ok(())
}
