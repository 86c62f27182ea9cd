use clap::{Parser, Subcommand};
use commgroup::layout::SiteLayout;
use commgroup::tools::SystemRunner;
use commgroup::{clean, config, output, pipeline};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "commgroup")]
#[command(about = "Build pipeline for the commutative.group LaTeX blog")]
#[command(long_about = "\
Build pipeline for the commutative.group LaTeX blog

Renders the root document and every post with plasTeX, wraps posts in the
shared templates, builds companion PDFs and algorithm diagrams with latexmk,
pdfcrop and pdftoppm, and assembles the result under gen/.

Site structure:

  ./
  ├── main.tex                     # Home, about and post index pages
  ├── site.toml                    # Build config (optional)
  ├── posts/
  │   └── rings/
  │       ├── main.tex             # Post source
  │       ├── meta.json            # {\"title\": \"...\"}
  │       └── algos/               # Diagrams → rings/<name>.png (optional)
  │           └── euclid.tex
  └── template/                    # Shared CSS, JS, SVG, header/footer, .sty
      └── pkgs/                    # Renderer packages

Running without a subcommand builds the site.
Run 'commgroup gen-config' to generate a documented site.toml.")]
#[command(version)]
struct Cli {
    /// Site root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Discard the external tools' standard output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Run the full pipeline: preflight → clean → main site → posts → cleanup
    Build,
    /// Verify the site's inputs and list its posts without building
    Check,
    /// Remove the output tree and any leftover build artifacts
    Clean,
    /// Print a stock site.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // Tools run inside subdirectories of the site, so every path handed to
    // them must be absolute.
    let layout = SiteLayout::resolve(&cli.root)?;

    match cli.command.unwrap_or(Command::Build) {
        Command::Build => {
            let site_config = config::load_config(layout.root())?;
            let runner = SystemRunner::new(cli.quiet);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_event(&event);
                }
            });
            let result = pipeline::build(&layout, &site_config, &runner, Some(tx));
            printer.join().map_err(|_| "output thread panicked")?;
            let summary = result?;
            output::print_summary(&summary, &layout.output_dir());
        }
        Command::Check => {
            println!("==> Checking {}", cli.root.display());
            let entries = pipeline::check(&layout)?;
            output::print_check_output(&entries);
            println!("==> Site is valid");
        }
        Command::Clean => {
            let site_config = config::load_config(layout.root())?;
            println!("==> Cleaning {}", cli.root.display());
            for path in clean::clean(&layout, &site_config)? {
                let shown = path.strip_prefix(layout.root()).unwrap_or(&path);
                println!("    removed {}", shown.display());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
