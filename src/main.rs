//! openstax-chef CLI: build the OpenStax learning channel.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

use openstax_chef::assemble::{TreeAssembler, write_channel};
use openstax_chef::catalog::{CatalogClient, TableOfContents};
use openstax_chef::config::ChefConfig;
use openstax_chef::fetch::HttpFetcher;
use openstax_chef::page_index::PageIndexStore;
use openstax_chef::split::ChapterSplitter;
use openstax_chef::split::pdf::PdfSplitEngine;
use openstax_chef::thumbnail::AssetNormalizer;
use openstax_chef::tree::ContentNode;

#[derive(Parser)]
#[command(name = "openstax-chef", version, about = "Build the OpenStax learning channel")]
struct Cli {
    /// Chef config file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog API root, overriding the config.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Cache directory for PDFs, thumbnails and chapters.
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    /// Page-index override file.
    #[arg(long, global = true)]
    page_index: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the validated channel tree.
    Build {
        /// Output file for the channel tree (JSON).
        #[arg(long, default_value = "channel.json")]
        output: PathBuf,

        /// Process only the first N catalog books.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Produce the local thumbnail for one cover URL.
    Thumbnail {
        /// Cover URL or local path.
        url: String,
    },

    /// Split one PDF into chapters.
    Split {
        /// PDF URL or local path.
        pdf: String,

        /// Book identifier used for the page-index lookup and chapter ids.
        #[arg(long)]
        id: String,
    },

    /// Write a config file with every default filled in.
    InitConfig {
        /// Destination path.
        #[arg(default_value = "chef.toml")]
        path: PathBuf,
    },
}

fn load_config(cli: &Cli) -> Result<ChefConfig> {
    let mut config = match &cli.config {
        Some(path) => ChefConfig::load(path)?,
        None => ChefConfig::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(dir) = &cli.download_dir {
        config.download_dir = dir.clone();
    }
    if let Some(file) = &cli.page_index {
        config.page_index_file = file.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Build { output, limit } => {
            let paths = config.paths();
            paths.ensure_dirs()?;
            let store = PageIndexStore::load(&config.page_index_file)?;
            let licenses = config.license_table()?;
            let fetcher = HttpFetcher::new(&config.fetch);
            let engine = PdfSplitEngine;

            let mut assembler = TreeAssembler::new(
                CatalogClient::new(&fetcher, &config.base_url),
                AssetNormalizer::new(&fetcher, &paths, &config.assets_dir),
                ChapterSplitter::new(&fetcher, &paths, &store, &engine),
                &licenses,
                &config.copyright_holder,
            );

            let mut books = assembler.list_books()?;
            if let Some(limit) = limit {
                books.truncate(limit);
            }

            let mut channel = ContentNode::channel(&config.channel);
            let report = assembler.assemble(&mut channel, &books)?;
            write_channel(&channel, &output)?;

            let summary = assembler.summary();
            println!("Wrote {} ({} nodes)", output.display(), report.nodes);
            for (kind, count) in channel.count_by_kind() {
                println!("  {:<12} {count}", kind.as_str());
            }
            println!(
                "Books: {} added, {} skipped",
                summary.books_added,
                summary.books_skipped.len()
            );
            for slug in &summary.books_skipped {
                println!("  skipped: {slug}");
            }
            if report.empty_topics > 0 || report.repeated_ids > 0 {
                println!(
                    "Warnings: {} empty topic(s), {} repeated id(s)",
                    report.empty_topics, report.repeated_ids
                );
            }
        }

        Commands::Thumbnail { url } => {
            let paths = config.paths();
            paths.ensure_dirs()?;
            let fetcher = HttpFetcher::new(&config.fetch);
            let normalizer = AssetNormalizer::new(&fetcher, &paths, &config.assets_dir);
            let path = normalizer.normalize(&url)?;
            println!("{}", path.display());
        }

        Commands::Split { pdf, id } => {
            let paths = config.paths();
            paths.ensure_dirs()?;
            let store = PageIndexStore::load(&config.page_index_file)?;
            let fetcher = HttpFetcher::new(&config.fetch);
            let engine = PdfSplitEngine;
            let splitter = ChapterSplitter::new(&fetcher, &paths, &store, &engine);

            let chapters = splitter.split(&pdf, &id, &TableOfContents::default())?;
            println!("{} chapter(s):", chapters.len());
            for chapter in &chapters {
                println!("  {:<24} {}  {}", chapter.source_id, chapter.path.display(), chapter.title);
            }
        }

        Commands::InitConfig { path } => {
            config.save(&path)?;
            println!("Wrote default config to {}", path.display());
        }
    }

    Ok(())
}
