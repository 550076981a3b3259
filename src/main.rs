use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stepsite::{config, generate, ingest, validate};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "stepsite")]
#[command(about = "Static-site build pipeline for the Stepping Stones website")]
#[command(long_about = "\
Static-site build pipeline for the Stepping Stones website

Reads the CMS JSON export, sanitizes legacy markup, and renders the full
route set plus sitemap.xml and robots.txt. Every build is a from-scratch
regeneration of both output trees.

Data directory layout:

  data/
  ├── site.json          # Site config (name, phones, contact URL, base URL)
  ├── site.local.json    # Optional field-wise config overrides
  ├── asset-map.json     # Optional legacy URL → local path substitutions
  ├── pages.json         # Page records (canonical link + raw HTML body)
  ├── posts.json         # Post records (same shape + date, categories)
  ├── categories.json    # Category records for /category/<slug>/ archives
  ├── services.json      # Service records (slug, path, FAQs, expectations)
  ├── nav.json           # Header tree + footer sections
  └── hero-slider.json   # Home hero slides

Output:

  dist/                  # public tree: index.html per route, assets/,
                         # sitemap.xml, robots.txt
  mirror/                # inspection tree: pages/ and posts/ split

Run 'stepsite check' and 'stepsite check-links' after a build to validate
the rendered output.")]
#[command(version = version_string())]
struct Cli {
    /// Content data directory (CMS JSON export)
    #[arg(long, default_value = "data", global = true)]
    data: PathBuf,

    /// Static assets directory, copied into the output root
    #[arg(long, default_value = "assets", global = true)]
    assets: PathBuf,

    /// Public output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Mirror tree used for inspection/versioning
    #[arg(long, default_value = "mirror", global = true)]
    mirror: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Delete and regenerate the full site
    Build,
    /// QA-check the rendered output: metadata, alt text, phone CTA, images
    Check,
    /// Verify every relative link and asset reference resolves
    CheckLinks,
    /// Merge posts from Markdown or CSV into posts.json, then rebuild
    ImportPosts {
        /// Directory of Markdown posts with frontmatter
        #[arg(long, value_name = "DIR", conflicts_with = "from_csv")]
        from_md: Option<PathBuf>,
        /// CSV export with a header row
        #[arg(long, value_name = "FILE")]
        from_csv: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let options = generate::BuildOptions {
        data_dir: cli.data.clone(),
        assets_dir: cli.assets.clone(),
        output_dir: cli.output.clone(),
        mirror_dir: cli.mirror.clone(),
    };

    match cli.command {
        Command::Build => {
            run_build(&options)?;
        }
        Command::Check => {
            let site = config::SiteConfig::load(&cli.data)?;
            let report = validate::check_output(&cli.output, &site)?;
            let warnings = report.warnings();
            if !warnings.is_empty() {
                eprintln!("Warnings:");
                for warning in &warnings {
                    eprintln!("{warning}");
                }
            }
            if !report.is_ok() {
                eprintln!("QA check failed:");
                for failure in report.failures() {
                    eprintln!("{failure}");
                }
                std::process::exit(1);
            }
            println!("QA check passed.");
        }
        Command::CheckLinks => {
            let report = validate::check_links(&cli.output)?;
            if !report.is_ok() {
                eprintln!("Broken links found:");
                for failure in report.failures() {
                    eprintln!("{failure}");
                }
                std::process::exit(1);
            }
            println!("Link check passed.");
        }
        Command::ImportPosts { from_md, from_csv } => {
            let source = match (from_md, from_csv) {
                (Some(dir), None) => ingest::ImportSource::MarkdownDir(dir),
                (None, Some(file)) => ingest::ImportSource::CsvFile(file),
                _ => {
                    eprintln!("Use exactly one of --from-md <DIR> or --from-csv <FILE>.");
                    std::process::exit(2);
                }
            };
            let site = config::SiteConfig::load(&cli.data)?;
            let count = ingest::import_posts(&source, &cli.data, &site.base_url)?;
            println!("Updated posts: {count}");
            run_build(&options)?;
        }
    }

    Ok(())
}

fn run_build(options: &generate::BuildOptions) -> Result<(), generate::GenerateError> {
    println!("==> Building site from {}", options.data_dir.display());
    let summary = generate::build(options)?;
    println!(
        "==> {} routes written ({} pages, {} posts, {} archives)",
        summary.routes, summary.pages, summary.posts, summary.categories
    );
    Ok(())
}
