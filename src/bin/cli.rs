use clap::{Parser, Subcommand, ValueEnum};
use sliced_bloom_rs::{
    AnyStorage, BloomFilter, BloomFilterConfigBuilder, FilterStats, GrowthMode,
    MembershipFilter, ScalableBloomFilter, ScalableBloomFilterConfigBuilder,
    StorageKind, bits2hr, bytes2hr,
};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the filter file
    #[arg(short, long, global = true, default_value = "filter.sbf")]
    path: PathBuf,

    /// Treat the file as a scalable filter
    #[arg(short, long, global = true)]
    scalable: bool,

    /// Bit storage used in memory
    #[arg(long, global = true, value_enum, default_value_t = StorageArg::BitArray)]
    storage: StorageArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StorageArg {
    BitArray,
    BoolVec,
}

impl From<StorageArg> for StorageKind {
    fn from(arg: StorageArg) -> Self {
        match arg {
            StorageArg::BitArray => StorageKind::BitArray,
            StorageArg::BoolVec => StorageKind::BoolVec,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Small,
    Large,
}

impl From<ModeArg> for GrowthMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Small => GrowthMode::Small,
            ModeArg::Large => GrowthMode::Large,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty filter file
    Create {
        /// Filter capacity (initial capacity for scalable filters)
        #[arg(short, long, default_value = "10000")]
        capacity: usize,

        /// False positive rate (between 0 and 1)
        #[arg(short, long, default_value = "0.001")]
        error_rate: f64,

        /// Growth mode for scalable filters
        #[arg(short, long, value_enum, default_value_t = ModeArg::Small)]
        mode: ModeArg,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Add elements and save the filter
    Add {
        #[arg(required = true)]
        elements: Vec<String>,
    },

    /// Check whether elements may be in the filter
    Check {
        #[arg(required = true)]
        elements: Vec<String>,
    },

    /// Display information about the filter
    Info {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

enum Filter {
    Fixed(BloomFilter<AnyStorage>),
    Scalable(ScalableBloomFilter<AnyStorage>),
}

impl Filter {
    fn load(
        path: &Path,
        scalable: bool,
        kind: StorageKind,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut reader = BufReader::new(File::open(path)?);
        let filter = if scalable {
            Filter::Scalable(ScalableBloomFilter::read_from_kind(
                &mut reader,
                kind,
            )?)
        } else {
            Filter::Fixed(BloomFilter::read_from_kind(&mut reader, kind)?)
        };
        Ok(filter)
    }

    fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let mut writer = BufWriter::new(File::create(path)?);
        match self {
            Filter::Fixed(filter) => filter.write_to(&mut writer)?,
            Filter::Scalable(filter) => filter.write_to(&mut writer)?,
        }
        writer.flush()?;
        Ok(())
    }

    fn add(&mut self, element: &str) -> sliced_bloom_rs::BloomResult<bool> {
        match self {
            Filter::Fixed(filter) => filter.add(element),
            Filter::Scalable(filter) => filter.add(element),
        }
    }

    fn contains(&self, element: &str) -> bool {
        match self {
            Filter::Fixed(filter) => filter.contains(element),
            Filter::Scalable(filter) => filter.contains(element),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let kind = StorageKind::from(cli.storage);

    match &cli.command {
        Commands::Create {
            capacity,
            error_rate,
            mode,
            force,
        } => {
            if cli.path.exists() && !force {
                println!("Error: Filter already exists at {}", cli.path.display());
                println!("Use --force to overwrite it.");
                return Ok(());
            }

            let filter = if cli.scalable {
                let config = ScalableBloomFilterConfigBuilder::default()
                    .initial_capacity(*capacity)
                    .error_rate(*error_rate)
                    .mode(GrowthMode::from(*mode))
                    .storage(kind)
                    .build()?;
                Filter::Scalable(ScalableBloomFilter::new(config)?)
            } else {
                let config = BloomFilterConfigBuilder::default()
                    .capacity(*capacity)
                    .error_rate(*error_rate)
                    .storage(kind)
                    .build()?;
                Filter::Fixed(BloomFilter::new(config)?)
            };
            filter.save(&cli.path)?;

            info!(path = %cli.path.display(), "Created filter");
            println!("Created new Bloom filter at {}", cli.path.display());
            println!("Configuration:");
            println!("  Capacity: {capacity}");
            println!("  False positive rate: {error_rate}");
            if cli.scalable {
                println!("  Growth ratio: {}", GrowthMode::from(*mode).ratio());
            }
        }
        Commands::Add { elements } => {
            let mut filter = Filter::load(&cli.path, cli.scalable, kind)?;
            let mut added = 0;
            for element in elements {
                match filter.add(element) {
                    Ok(true) => {
                        println!("Element '{element}' already present");
                    }
                    Ok(false) => {
                        added += 1;
                        println!("Element '{element}' inserted successfully");
                    }
                    Err(err) => {
                        // Keep what was added so far.
                        warn!(%err, element = %element, "Insert failed");
                        filter.save(&cli.path)?;
                        return Err(err.into());
                    }
                }
            }
            filter.save(&cli.path)?;
            info!(added, "Saved filter");
        }
        Commands::Check { elements } => {
            let filter = Filter::load(&cli.path, cli.scalable, kind)?;
            for element in elements {
                if filter.contains(element) {
                    println!("Element '{element}' may exist in the filter");
                } else {
                    println!("Element '{element}' does not exist in the filter");
                }
            }
        }
        Commands::Info { json } => {
            let filter = Filter::load(&cli.path, cli.scalable, kind)?;
            match (&filter, *json) {
                (Filter::Fixed(filter), true) => {
                    println!("{}", serde_json::to_string_pretty(&filter.summary())?);
                }
                (Filter::Scalable(filter), true) => {
                    println!("{}", serde_json::to_string_pretty(&filter.summary())?);
                }
                (Filter::Fixed(filter), false) => print_fixed_info(&cli.path, filter),
                (Filter::Scalable(filter), false) => {
                    print_scalable_info(&cli.path, filter)
                }
            }
        }
    }

    Ok(())
}

fn print_fixed_info(path: &Path, filter: &BloomFilter<AnyStorage>) {
    println!("Bloom Filter Configuration:");
    println!("  File: {}", path.display());
    println!("  Capacity: {}", filter.capacity());
    println!("  False positive rate: {:.6}", filter.error_rate());
    println!("  Slices: {}", filter.num_slices());
    println!("  Bits per slice: {}", filter.bits_per_slice());
    println!(
        "  Bit array: {} bits ({})",
        filter.num_bits(),
        bits2hr(filter.num_bits())
    );
    println!("  Digest: {:?}", filter.hash_scheme().digest_kind());
    println!("  Storage: {}", filter.storage_kind());
    println!("  Encoded size: {}", bytes2hr(filter.encoded_len()));

    println!("\nCurrent State:");
    println!("  Items: {}", filter.len());
    println!("  Fill ratio: {:.4}", filter.fill_ratio());
    println!(
        "  Estimated false positive rate: {:.6}",
        filter.estimated_error_rate()
    );
}

fn print_scalable_info(path: &Path, filter: &ScalableBloomFilter<AnyStorage>) {
    let config = filter.config();
    println!("Scalable Bloom Filter Configuration:");
    println!("  File: {}", path.display());
    println!("  Initial capacity: {}", config.initial_capacity);
    println!("  False positive rate: {:.6}", config.error_rate);
    println!("  Growth ratio: {}", config.mode.ratio());
    println!("  Decay ratio: {}", config.decay_ratio);
    println!("  Storage: {}", filter.storage_kind());
    println!("  Encoded size: {}", bytes2hr(filter.encoded_len()));

    println!("\nCurrent State:");
    println!("  Items: {} of {}", filter.len(), filter.capacity());
    for (i, generation) in filter.generations().iter().enumerate() {
        println!(
            "  Generation {i}: {}/{} items, {} bits ({}), error rate {:.6}",
            generation.len(),
            generation.capacity(),
            generation.num_bits(),
            bits2hr(generation.num_bits()),
            generation.error_rate()
        );
    }
}
