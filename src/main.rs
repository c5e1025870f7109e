use clap::Parser;
use eyre::{bail, eyre, Result, WrapErr};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use vlog2xact::extract::process_files;
use vlog2xact::syntax::VeribleParser;
use vlog2xact::xact::{component_document, update_component, VlnvOptions};
use vlog2xact::xml::Element;

/// Extracts a SystemVerilog/Verilog module interface into an IP-XACT 2014
/// component.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// IP-XACT output file, stdout if not given.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Name of the root module.
    #[arg(short, long)]
    module: Option<String>,

    /// Existing IP-XACT 2014 component to be updated with module
    /// information.
    #[arg(long)]
    xact: Option<PathBuf>,

    /// Path to the `verible-verilog-syntax` binary.
    #[arg(long, default_value = "verible-verilog-syntax")]
    verible: PathBuf,

    /// IP-XACT component vendor name.
    #[arg(long = "xact-vendor", value_name = "VENDOR")]
    vendor: Option<String>,

    /// IP-XACT component library name.
    #[arg(long = "xact-library", value_name = "LIBRARY")]
    library: Option<String>,

    /// IP-XACT component version number.
    #[arg(long = "xact-version", value_name = "VERSION")]
    version: Option<String>,

    /// Relative working directory which to make file paths relative to.
    /// Applies only if no output file is given.
    #[arg(long)]
    rwd: Option<PathBuf>,

    /// Logging severity, one of: trace, debug, info, warn, error.
    #[arg(long, default_value = "error")]
    log_level: String,

    /// Path to a log file, stderr if not given.
    #[arg(short = 'l', long)]
    log_file: Option<PathBuf>,

    /// SystemVerilog/Verilog files to process.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let parser = VeribleParser::new(&cli.verible);
    let modules = process_files(&parser, &cli.files);
    if modules.is_empty() {
        bail!("no modules extracted from the input files");
    }

    let module = match &cli.module {
        Some(name) => modules
            .iter()
            .find(|module| module.name == *name)
            .ok_or_else(|| eyre!("failed to find module `{name}`"))?,
        None => modules
            .iter()
            .find(|module| module.is_root)
            .ok_or_else(|| eyre!("no root module among the processed files"))?,
    };

    let base_dir = cli
        .output
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .or_else(|| cli.rwd.clone());
    let vlnv = VlnvOptions {
        vendor: cli.vendor.clone(),
        library: cli.library.clone(),
        version: cli.version.clone(),
    };

    let document = match &cli.xact {
        Some(path) => {
            let xml = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read {}", path.display()))?;
            let mut component = Element::parse(&xml)
                .wrap_err_with(|| format!("failed to parse {}", path.display()))?;
            update_component(&mut component, module, &modules, &vlnv, base_dir.as_deref())?;
            component
        }
        None => component_document(module, &modules, &vlnv, base_dir.as_deref())?,
    };

    let xml = document.to_xml()?;
    match &cli.output {
        Some(path) => std::fs::write(path, xml)
            .wrap_err_with(|| format!("failed to write {}", path.display()))?,
        None => std::io::stdout().write_all(xml.as_bytes())?,
    }
    Ok(())
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level: Level = cli
        .log_level
        .parse()
        .map_err(|_| eyre!("invalid log level `{}`", cli.log_level))?;
    let subscriber = tracing_subscriber::fmt().with_max_level(level).with_target(false);
    match &cli.log_file {
        Some(path) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("failed to create {}", path.display()))?;
            subscriber.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => subscriber.with_writer(std::io::stderr).init(),
    }
    Ok(())
}
