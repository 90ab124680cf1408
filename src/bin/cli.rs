//! tagaa CLI
//!
//! Command-line interface for managing a tagaa store.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use tagaa::{Config, Group, GroupStore, Image, ImageStore, Rating};
use tracing_subscriber::{fmt, EnvFilter};

/// tagaa CLI
#[derive(Parser, Debug)]
#[command(name = "tagaa")]
#[command(about = "Manage grouped image tagging metadata")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./tagaa_data")]
    data_dir: PathBuf,

    /// Seconds to wait for another process holding the store
    #[arg(short, long, default_value = "5")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all groups in creation order
    Groups,

    /// Show one group
    Group { name: String },

    /// Create an empty group
    CreateGroup { name: String },

    /// Delete an empty group
    DeleteGroup { name: String },

    /// List the images of a group
    Images { group: String },

    /// Add an image to a group (the group is created if missing)
    Add {
        group: String,

        #[command(flatten)]
        fields: ImageFields,
    },

    /// Change fields of an existing image
    Update {
        group: String,
        id: u64,

        #[command(flatten)]
        fields: ImageFields,
    },

    /// Show one image
    Get { group: String, id: u64 },

    /// Delete one image
    DeleteImage { group: String, id: u64 },

    /// Store a file's bytes under a content hash
    PutData { hash: String, file: PathBuf },

    /// Write the bytes stored under a hash to a file (or stdout length)
    GetData {
        hash: String,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Image fields settable from the command line; unset fields are left alone
#[derive(ClapArgs, Debug, Default)]
struct ImageFields {
    #[arg(long)]
    name: Option<String>,

    /// Space-separated tags
    #[arg(long)]
    tags: Option<String>,

    #[arg(long)]
    source: Option<String>,

    /// s, q or e
    #[arg(long)]
    rating: Option<Rating>,

    #[arg(long)]
    size: Option<u64>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    #[arg(long)]
    hash: Option<String>,

    #[arg(long)]
    ext: Option<String>,
}

impl ImageFields {
    fn apply(self, image: &mut Image) {
        if let Some(v) = self.name {
            image.name = v;
        }
        if let Some(v) = self.tags {
            image.tags = v;
        }
        if let Some(v) = self.source {
            image.source = v;
        }
        if let Some(v) = self.rating {
            image.rating = v;
        }
        if let Some(v) = self.size {
            image.size = v;
        }
        if let Some(v) = self.width {
            image.width = v;
        }
        if let Some(v) = self.height {
            image.height = v;
        }
        if let Some(v) = self.hash {
            image.hash = v;
        }
        if let Some(v) = self.ext {
            image.ext = v;
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,tagaa=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .open_timeout(Duration::from_secs(args.timeout))
        .build();

    let store = match GroupStore::open(config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = run(&store, args.command);

    if let Err(e) = store.close() {
        tracing::error!("Failed to close store: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = outcome {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(store: &dyn ImageStore, command: Commands) -> tagaa::Result<()> {
    match command {
        Commands::Groups => {
            for group in store.get_all_groups()? {
                print_group(&group);
            }
        }
        Commands::Group { name } => print_group(&store.get_group(&name)?),
        Commands::CreateGroup { name } => store.create_group(&name)?,
        Commands::DeleteGroup { name } => store.delete_group(&name)?,
        Commands::Images { group } => {
            for image in store.get_group_images(&group)? {
                print_image(&image);
            }
        }
        Commands::Add { group, fields } => {
            let mut image = Image::default();
            fields.apply(&mut image);
            store.add_image(&group, &mut image)?;
            println!("{}", image.id);
        }
        Commands::Update { group, id, fields } => {
            let mut image = store.get_image(&group, id)?;
            fields.apply(&mut image);
            store.update_image(&group, &mut image)?;
            print_image(&image);
        }
        Commands::Get { group, id } => print_image(&store.get_image(&group, id)?),
        Commands::DeleteImage { group, id } => store.delete_image(&group, id)?,
        Commands::PutData { hash, file } => {
            let data = fs::read(&file)?;
            store.put_image_data(&hash, &data)?;
        }
        Commands::GetData { hash, out } => {
            let data = store.get_image_data(&hash)?;
            match out {
                Some(path) => fs::write(path, &data)?,
                None => println!("{} bytes", data.len()),
            }
        }
    }
    Ok(())
}

fn print_group(group: &Group) {
    println!("{}\t{} images\t{} bytes", group.name, group.len(), group.size);
}

fn print_image(image: &Image) {
    let added = image.added.map(|t| t.to_rfc3339()).unwrap_or_default();
    let updated = image.updated.map(|t| t.to_rfc3339()).unwrap_or_default();
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}x{}\t{} bytes\tadded={}\tupdated={}",
        image.id,
        image.name,
        image.rating,
        image.tags,
        image.source,
        image.width,
        image.height,
        image.size,
        added,
        updated
    );
}
