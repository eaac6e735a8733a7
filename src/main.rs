use clap::{Parser, Subcommand};
use quire::{config, output, pipeline};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Incremental static site generator for a Markdown blog")]
#[command(long_about = "\
Incremental static site generator for a Markdown blog

Markdown sources plus YAML metadata become minified HTML. Posts whose
source is unchanged since the last build are skipped.

Project structure:

  project/
  ├── quire.toml                   # Layout overrides (optional)
  ├── content/
  │   ├── posts/                   # One .md per post, any depth
  │   │   └── hello-world.md       # slug = file name without .md
  │   └── pages/
  │       └── about.md
  ├── settings/
  │   ├── site.yaml                # title, base_url, external_styles, ...
  │   ├── categories.yaml          # rust: { name: Rust }
  │   ├── posts.yaml               # hello-world: { title, category, published_at, draft }
  │   └── pages.yaml               # about: { name: About }
  ├── static/
  │   └── styles.css               # Inlined after external_styles
  └── var/                         # Output + manifest.json

Dates use the form \"15 June, 2024\". The home page lists posts newest first.

Run 'quire gen-config' to generate a documented quire.toml.")]
#[command(version)]
struct Cli {
    /// Project root directory
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the home page, all pages, and changed posts
    Build {
        /// Ignore the manifest and re-render every post
        #[arg(long)]
        force: bool,
    },
    /// Validate metadata and sources without writing anything
    Check,
    /// Print a stock quire.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build { force } => {
            let options = if force {
                pipeline::BuildOptions::force()
            } else {
                pipeline::BuildOptions::default()
            };
            let output_dir = config::load_config(&cli.root)?.paths(&cli.root).output;

            println!("==> Building {}", cli.root.display());
            let (tx, rx) = std::sync::mpsc::channel();
            let printer_output = output_dir.clone();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_build_event(&event, &printer_output);
                }
            });
            let result = pipeline::build(&cli.root, &options, Some(tx));
            printer.join().map_err(|_| "output printer panicked")?;
            let report = result?;
            println!("==> Build complete: {} ({})", output_dir.display(), report);
        }
        Command::Check => {
            println!("==> Checking {}", cli.root.display());
            let summary = pipeline::check(&cli.root)?;
            output::print_check_summary(&summary);
            println!("==> Content is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr so build progress on stdout stays readable.
///
/// `RUST_LOG` directives are honoured on top of the `-v` level.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
