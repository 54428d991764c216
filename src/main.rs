use clap::{Parser, Subcommand};
use podcast_press::build::{self, BuildOptions};
use podcast_press::{config, output};
use std::path::PathBuf;

/// Shared flags for commands that resolve the site.
#[derive(clap::Args, Clone)]
struct VariantArgs {
    /// Build the restricted-network variant (alternate URL, no analytics, small favicon)
    #[arg(long)]
    restricted: bool,
}

#[derive(Parser)]
#[command(name = "podcast-press")]
#[command(about = "Static site and RSS/iTunes feed generator for podcasts")]
#[command(long_about = "\
Static site and RSS/iTunes feed generator for podcasts

Project structure:

  ./
  ├── config.toml                  # Build config (optional, see gen-config)
  ├── data/
  │   ├── site.json                # Show identity: name, URLs, iTunes fields, FEED_LIMIT, blacklist
  │   ├── index.json               # Extra context for index.html
  │   ├── store.json               # Extra context for store.html
  │   └── episodes/
  │       └── 001/
  │           ├── episode.json     # NUMBER, TITLE, DESCRIPTION, CONTENT, FILE, ...
  │           └── notes.md         # Show notes (markdown)
  ├── templates/                   # episode.html, index.html, store.html (Tera)
  ├── public/                      # Copied verbatim to the output root
  └── media/
      ├── audio/                   # Episode audio → <output>/audio/
      └── images/                  # Cover art → <output>/images/

Output:

  dist/
  ├── index.html
  ├── store/index.html
  ├── feed.rss
  └── <NUMBER>/index.html          # One per episode, including blacklisted ones

Run 'podcast-press gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site and feed
    Build(VariantArgs),
    /// Validate the project without writing anything
    Check(VariantArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Build(variant) => {
            let options = BuildOptions {
                root: cli.root.clone(),
                output: cli.output.clone(),
                restricted: variant.restricted,
            };
            println!("==> Building {} → {}", cli.root.display(), cli.output.display());
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_build_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = build::build(&options, Some(tx));
            printer.join().ok();
            output::print_build_summary(&result?);
        }
        Command::Check(variant) => {
            let options = BuildOptions {
                root: cli.root.clone(),
                output: cli.output.clone(),
                restricted: variant.restricted,
            };
            println!("==> Checking {}", cli.root.display());
            let report = build::check(&options)?;
            output::print_check_report(&report);
            println!("==> Project is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
