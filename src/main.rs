use blog_prep::config::{self, ProjectPaths, SiteConfig};
use blog_prep::http::ReqwestClient;
use blog_prep::{check, link_cards, ogp_image, output, raw_markdown};
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

/// Shared flags for commands that render images.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Disable the render cache and re-render every OGP image
    #[arg(long)]
    no_cache: bool,
}

#[derive(Parser)]
#[command(name = "blog-prep")]
#[command(about = "Build-time content processing for a Markdown blog")]
#[command(long_about = "\
Build-time content processing for a Markdown blog

One Markdown file per post, YAML front matter on top. The `slug` key names
the post everywhere: the raw export, the OGP image, the page URL.

Content structure:

  src/content/blog/
  ├── 2024-01-01-hello-world.md    # slug: hello-world
  └── 2024-02-10-nihongo.md        # slug: nihongo-post

  ---
  title: \"Hello World\"
  slug: hello-world
  date: 2024-01-01
  tags:
    - rust
    - blog
  ---

Pipelines:
  link-cards   Lines holding only a URL become link-card HTML (rewrites sources)
  ogp-images   One 1200x630 PNG per post from a base image and a web font
  raw-markdown Copy each post to {slug}.md in the build output (after the build)

Run 'blog-prep gen-config' to generate a documented blog-prep.toml.")]
#[command(version)]
struct Cli {
    /// Project root; configured paths are relative to it
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file, which must exist (default: blog-prep.toml under the root, optional)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy each post to {slug}.md in the build output
    RawMarkdown,
    /// Replace standalone URL lines with link cards
    LinkCards,
    /// Render an OGP image for every post
    OgpImages(CacheArgs),
    /// Run the pre-build pipelines: link-cards → ogp-images
    Prebuild(CacheArgs),
    /// Validate front matter of every post without writing anything
    Check,
    /// Print a stock blog-prep.toml with all options documented
    GenConfig,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let cli = Cli::parse();

    match &cli.command {
        Command::RawMarkdown => {
            let (_, paths) = load_project(&cli)?;
            println!("==> Copying raw Markdown → {}", paths.raw_output_dir.display());
            let report = raw_markdown::copy_raw_markdown(
                &paths.content_dir,
                &paths.raw_build_dir,
                &paths.raw_output_dir,
            )?;
            output::print_copy_report(&report);
        }
        Command::LinkCards => {
            let (site_config, paths) = load_project(&cli)?;
            run_link_cards(&paths, &site_config).await?;
        }
        Command::OgpImages(cache_args) => {
            let (site_config, paths) = load_project(&cli)?;
            run_ogp_images(&paths, &site_config, cache_args.no_cache).await?;
        }
        Command::Prebuild(cache_args) => {
            let (site_config, paths) = load_project(&cli)?;
            println!("==> Stage 1: Link cards");
            run_link_cards(&paths, &site_config).await?;
            println!("==> Stage 2: OGP images");
            run_ogp_images(&paths, &site_config, cache_args.no_cache).await?;
            println!("==> Prebuild complete");
        }
        Command::Check => {
            let (_, paths) = load_project(&cli)?;
            println!("==> Checking {}", paths.content_dir.display());
            let report = check::check_content(&paths.content_dir)?;
            output::print_check_report(&report);
            if report.is_clean() {
                println!("==> Content is valid");
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file and resolve every configured path against `--root`.
fn load_project(cli: &Cli) -> Result<(SiteConfig, ProjectPaths), config::ConfigError> {
    let site_config = match &cli.config {
        Some(path) => config::load_required_config(path)?,
        None => config::load_config(&cli.root.join(config::CONFIG_FILENAME))?,
    };
    let paths = ProjectPaths::resolve(&cli.root, &site_config);
    Ok((site_config, paths))
}

async fn run_link_cards(
    paths: &ProjectPaths,
    site_config: &SiteConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ReqwestClient::new()?;
    let report = link_cards::prebuild_link_cards(
        &paths.content_dir,
        &paths.link_card_cache,
        &client,
        &site_config.link_cards,
        chrono::Utc::now().timestamp_millis(),
    )
    .await?;
    output::print_link_card_report(&report);
    Ok(())
}

async fn run_ogp_images(
    paths: &ProjectPaths,
    site_config: &SiteConfig,
    no_cache: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ReqwestClient::new()?;
    let report =
        ogp_image::prebuild_ogp_images(paths, &site_config.ogp_images, &client, no_cache).await?;
    output::print_ogp_image_report(&report);
    Ok(())
}
