use anyhow::{Context, bail};
use clap::Parser;
use log::info;
use patharg::{InputArg, OutputArg};
use std::io::Write;
use std::process::exit;
use tracing_subscriber::EnvFilter;
use wacodec::{EncodeOptions, Module, decode_module, encode_module};

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// The module to decode. If not provided or is '-', read from
    /// standard input.
    #[arg(default_value_t)]
    pub input: InputArg,

    /// Re-encode the module and write it to this file ('-' for standard
    /// output).
    #[arg(short, long)]
    pub output: Option<OutputArg>,

    /// Enable verbose output, including a debug representation of
    /// the decoded module.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    /// Type check the decoded module.
    #[arg(long, default_value_t = false)]
    pub validate: bool,

    /// Re-encode the module and check that decoding the result gives back
    /// the same module.
    #[arg(long, default_value_t = false)]
    pub roundtrip: bool,

    /// Only allow WebAssembly 1.0 constructs when re-encoding.
    #[arg(long, default_value_t = false)]
    pub mvp: bool,

    /// Leave custom sections out when re-encoding.
    #[arg(long, default_value_t = false)]
    pub strip: bool,
}

fn main() {
    let cli = Cli::parse();
    initialize_logging(cli.verbose);

    if let Err(err) = run(&cli) {
        abort(&cli, err);
    }
}

/// Library diagnostics go through `log`; the subscriber picks them up and
/// writes to stderr, leaving stdout to `--output -`. `RUST_LOG` takes
/// precedence over `--verbose`.
fn initialize_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let input = cli.input.open().context("failed to open input")?;
    let module = decode_module(input).context("failed to decode module")?;
    summarize(&module);

    if cli.verbose {
        println!("{module:#?}");
    }

    if cli.validate {
        module.validate().context("module is invalid")?;
        info!("module is valid");
    }

    if cli.roundtrip || cli.output.is_some() {
        let mut options = if cli.mvp {
            EncodeOptions::mvp()
        } else {
            EncodeOptions::default()
        };
        options.validate = cli.validate;
        if cli.strip {
            options.custom_sections = false;
            options.debug_names = false;
        }

        let bytes = encode_module(&module, &options).context("failed to encode module")?;

        if cli.roundtrip {
            let decoded =
                decode_module(bytes.as_slice()).context("failed to decode re-encoded module")?;
            let expected = if cli.strip {
                Module {
                    customs: Vec::new(),
                    ..module.clone()
                }
            } else {
                module.clone()
            };
            if decoded != expected {
                bail!("re-encoded module differs from the input");
            }
            println!("round trip ok ({} bytes)", bytes.len());
        }

        if let Some(output) = &cli.output {
            let mut writer = output.create().context("failed to open output")?;
            writer.write_all(&bytes).context("failed to write output")?;
        }
    }

    Ok(())
}

fn summarize(module: &Module) {
    println!(
        "{} types, {} imports, {} functions, {} tables, {} memories, {} globals, {} exports",
        module.types.len(),
        module.imports.len(),
        module.func_count(),
        module.table_count(),
        module.memory_count(),
        module.global_count(),
        module.exports.len(),
    );
    println!(
        "{} element segments, {} data segments, {} custom sections",
        module.elements.len(),
        module.datas.len(),
        module.customs.len(),
    );
}

fn abort(cli: &Cli, err: anyhow::Error) -> ! {
    eprintln!("ERROR: {err}");

    let sources: Vec<_> = err.chain().skip(1).collect();
    if !sources.is_empty() {
        eprintln!("\nCaused by:");
        for (i, cause) in sources.iter().enumerate() {
            eprintln!("    {i}: {cause}");
        }
    }

    if cli.verbose {
        eprintln!("\nDEBUG OUTPUT:\n{err:#?}");
    }

    exit(1)
}
