use std::{
    fs::File,
    io::{stdin, stdout, BufReader, BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use windows_catalog::{CatalogTrustList, DigestAlgorithm};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Cli::parse();

    match args.command {
        Commands::Sums(args) => sums(args),
        Commands::Dump(args) => dump(args),
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print each member's digest and filename, `sha256sum -c` style.
    Sums(SumsArgs),
    /// Dump the catalog's members as JSON.
    Dump(DumpArgs),
}

#[derive(Args, Debug)]
struct SumsArgs {
    /// The catalog file (DER-encoded PKCS#7); stdin if absent or `-`
    input: Option<PathBuf>,

    /// Only print entries whose digest uses this algorithm
    #[arg(short, long, value_enum)]
    algorithm: Option<AlgorithmArg>,
}

#[derive(Args, Debug)]
struct DumpArgs {
    /// The catalog file (DER-encoded PKCS#7); stdin if absent or `-`
    input: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AlgorithmArg {
    Sha1,
    Sha256,
}

impl From<AlgorithmArg> for DigestAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Sha1 => DigestAlgorithm::Sha1,
            AlgorithmArg::Sha256 => DigestAlgorithm::Sha256,
        }
    }
}

fn load_catalog(input: Option<PathBuf>) -> Result<CatalogTrustList> {
    match input {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            log::debug!("reading catalog from {}", path.display());

            CatalogTrustList::from_der(BufReader::new(file))
                .context("failed to load catalog from PKCS#7")
        }
        _ => {
            log::debug!("reading catalog from stdin");

            CatalogTrustList::from_der(stdin().lock())
                .context("failed to load catalog from PKCS#7")
        }
    }
}

fn sums(args: SumsArgs) -> Result<()> {
    let ctl = load_catalog(args.input)?;
    if !ctl.is_catalog_list() {
        log::warn!("trust list doesn't declare itself a catalog; continuing anyway");
    }

    // Everything is resolved before anything is written: a bad member means no output.
    let entries = ctl
        .entries()
        .context("failed to resolve catalog members")?;
    let wanted = args.algorithm.map(DigestAlgorithm::from);

    let mut out = BufWriter::new(stdout().lock());
    for entry in entries
        .iter()
        .filter(|e| wanted.map_or(true, |alg| e.digest_algorithm() == alg))
    {
        writeln!(out, "{entry}")?;
    }
    out.flush()?;

    Ok(())
}

fn dump(args: DumpArgs) -> Result<()> {
    let ctl = load_catalog(args.input)?;
    let members = ctl.members().collect::<Vec<_>>();

    // Serialize up front, so that a bad member doesn't leave half a document on stdout.
    let json = serde_json::to_string(&members).context("failed to resolve catalog members")?;

    let mut out = stdout().lock();
    writeln!(out, "{json}")?;

    Ok(())
}
