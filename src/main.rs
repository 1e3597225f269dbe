use clap::{Parser, Subcommand};
use std::{path::PathBuf, process::ExitCode};
use swatchtag::{BrandTable, CatalogService, InMemoryCatalog, ItemId, TagQuery, Tagger};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "swatchtag")]
#[command(about = "Tag catalog items by cover image color and search them")]
struct Cli {
    /// Catalog snapshot file
    #[arg(short, long, default_value = "catalog.json")]
    catalog: PathBuf,

    /// Brand translation table (JSON)
    #[arg(short, long)]
    brands: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag an image and store it in the catalog
    Tag {
        /// Image file
        image: PathBuf,

        /// Item identifier
        #[arg(long)]
        id: String,

        /// Extra tags such as "type_hoodie" or "company_nike"
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Number of color clusters
        #[arg(short = 'k', long, default_value_t = swatchtag::DEFAULT_CLUSTER_COUNT)]
        clusters: usize,
    },
    /// Search items by tags
    Search {
        /// Tags to search for
        #[arg(required = true)]
        tags: Vec<String>,

        /// Colors to rank results by
        #[arg(long = "sort-color")]
        sort_colors: Vec<String>,

        /// Require the item's type tags to equal the requested ones
        #[arg(long)]
        exclusive_type: bool,
    },
    /// List items of the same type ranked by color similarity
    Similar {
        /// Reference item identifier
        id: String,

        #[arg(short, long, default_value_t = swatchtag::search::DEFAULT_SIMILAR_LIMIT)]
        limit: usize,

        /// Only consider items of the same brand
        #[arg(long)]
        same_brand: bool,
    },
    /// Pull colors toward their corpus average
    Adjust {
        /// Colors to adjust, e.g. "grey white"
        #[arg(required = true)]
        colors: Vec<String>,
    },
    /// Print every item
    List,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let brands = match &cli.brands {
        Some(path) => BrandTable::load(path)?,
        None => BrandTable::default(),
    };

    let catalog = InMemoryCatalog::load_json(&cli.catalog)?;

    match cli.command {
        Commands::Tag {
            image,
            id,
            tags,
            clusters,
        } => {
            let bytes = std::fs::read(&image)?;
            let service = CatalogService::new(catalog, Tagger::new(brands).cluster_count(clusters));
            let item = service.tag_and_store(ItemId::new(id), &bytes, &tags)?;

            service.store().save_json(&cli.catalog)?;
            print_json(&item)?;
        }
        Commands::Search {
            tags,
            sort_colors,
            exclusive_type,
        } => {
            let service = CatalogService::new(catalog, Tagger::new(brands));
            let query = TagQuery::new(tags)
                .sort_by_colors(sort_colors)
                .exclusive_type(exclusive_type);

            print_json(&service.search(&query)?)?;
        }
        Commands::Similar { id, limit, same_brand } => {
            let service = CatalogService::new(catalog, Tagger::new(brands));
            let results = service.similar_by_color_scored(&ItemId::new(id), limit, same_brand)?;
            let ranked: Vec<serde_json::Value> = results
                .into_iter()
                .map(|(item, distance)| serde_json::json!({ "item": item, "distance": distance }))
                .collect();

            print_json(&ranked)?;
        }
        Commands::Adjust { colors } => {
            let service = CatalogService::new(catalog, Tagger::new(brands));
            let adjustment = service.adjust_colors(&colors)?;

            service.store().save_json(&cli.catalog)?;
            print_json(&adjustment)?;
        }
        Commands::List => {
            print_json(&swatchtag::CatalogStore::items(&catalog)?)?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
