use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use prettytable::{cell, row, Table};
use rand::{rngs::StdRng, SeedableRng};
use std::{
    env,
    path::{Path, PathBuf},
};
use voc_grid::{loader::array_to_rgb, Config, ImageLoader};

#[derive(Debug, Clone, Parser)]
/// Grid target encoding and batch generation for VOC style datasets
enum Opts {
    /// Encode one sample and print its occupied grid cells
    Inspect {
        /// configuration file
        config_file: PathBuf,
        /// sample identifier
        sample_id: String,
        /// write the loaded image to this file
        #[clap(long)]
        save_image: Option<PathBuf>,
    },
    /// Run the batch generator and report each batch
    Generate {
        /// configuration file
        config_file: PathBuf,
        /// number of batches to produce
        #[clap(long, default_value = "10")]
        num_batches: usize,
    },
    /// Shuffle the sample pool file once and write it back
    Shuffle {
        /// configuration file
        config_file: PathBuf,
        /// RNG seed, overriding the configured one
        #[clap(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    let filters = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();

    match Opts::parse() {
        Opts::Inspect {
            config_file,
            sample_id,
            save_image,
        } => {
            inspect(config_file, &sample_id, save_image.as_deref())?;
        }
        Opts::Generate {
            config_file,
            num_batches,
        } => {
            generate(config_file, num_batches)?;
        }
        Opts::Shuffle { config_file, seed } => {
            shuffle(config_file, seed)?;
        }
    }

    Ok(())
}

fn open_config(config_file: impl AsRef<Path>) -> Result<Config> {
    let config_file = config_file.as_ref();
    Config::open(config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))
}

fn inspect(
    config_file: impl AsRef<Path>,
    sample_id: &str,
    save_image: Option<&Path>,
) -> Result<()> {
    let config = open_config(config_file)?;
    let assembler = config.assembler()?;
    let classes = assembler.classes();
    let annotated = assembler.encode_sample(sample_id)?;

    println!("image: {}", annotated.image_path().display());

    // print occupied cells
    {
        let mut table = Table::new();
        table.add_row(row!["row", "col", "class", "x", "y", "sqrt_h", "sqrt_w"]);

        annotated.objects().for_each(|(row, col, record)| {
            table.add_row(row![
                row,
                col,
                classes.name(record.class_index).unwrap_or("?"),
                format!("{:.4}", record.cell_x),
                format!("{:.4}", record.cell_y),
                format!("{:.4}", record.sqrt_h),
                format!("{:.4}", record.sqrt_w),
            ]);
        });

        table.printstd();
    }

    if let Some(path) = save_image {
        let image = assembler
            .loader()
            .load(annotated.image_path())
            .with_context(|| format!("failed to load '{}'", annotated.image_path().display()))?;
        array_to_rgb(image.view()).save(path)?;
        info!("saved the loaded image to '{}'", path.display());
    }

    Ok(())
}

fn generate(config_file: impl AsRef<Path>, num_batches: usize) -> Result<()> {
    let config = open_config(config_file)?;
    let mut generator = config.generator()?;
    let plan = *generator.plan();
    info!(
        "{} samples per epoch, {} batches of size {}",
        plan.num_samples, plan.num_windows, plan.batch_size
    );

    for _ in 0..num_batches {
        let batch = match generator.next() {
            Some(result) => result?,
            None => break,
        };
        info!(
            "epoch {} step {}: images {:?}, targets {:?}",
            generator.epoch(),
            generator.global_step(),
            batch.images.shape(),
            batch.targets.shape()
        );
    }

    Ok(())
}

fn shuffle(config_file: impl AsRef<Path>, seed: Option<u64>) -> Result<()> {
    let config = open_config(config_file)?;
    let mut pool = config.sample_pool()?;
    let mut rng = match seed.or(config.generator.seed) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    pool.shuffle(&mut rng);
    pool.save()?;
    info!(
        "shuffled {} samples in '{}'",
        pool.len(),
        config.dataset.sample_pool_file.display()
    );

    Ok(())
}
