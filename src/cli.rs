use crate::config::{OptionsSpec, load_config};
use crate::ir::{Register, load_register, parse_register};
use crate::layout::BitfieldLayout;
use crate::layout_dump::write_layout_dump;
use crate::node::serialize;
use crate::render::write_output_svg;
use anyhow::Result;
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bfsvg", version, about = "Render register bit-field diagrams to SVG")]
pub struct Args {
    /// Register description (.json / .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output SVG file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Options JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Write the resolved lane layout as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,

    /// Row height
    #[arg(long)]
    pub vspace: Option<i64>,

    /// Row width
    #[arg(long)]
    pub hspace: Option<i64>,

    /// Number of rows
    #[arg(long)]
    pub lanes: Option<i64>,

    /// Total register width in bits
    #[arg(long)]
    pub bits: Option<i64>,

    #[arg(long)]
    pub fontsize: Option<i64>,

    /// `--bigendian` alone means true; `--bigendian false` overrides a file value
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub bigendian: Option<bool>,

    #[arg(long)]
    pub fontfamily: Option<String>,

    #[arg(long)]
    pub fontweight: Option<String>,
}

impl Args {
    fn option_overrides(&self) -> OptionsSpec {
        OptionsSpec {
            vspace: self.vspace,
            hspace: self.hspace,
            lanes: self.lanes,
            bits: self.bits,
            fontsize: self.fontsize,
            bigendian: self.bigendian,
            fontfamily: self.fontfamily.clone(),
            fontweight: self.fontweight.clone(),
        }
    }
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let register = read_register(args.input.as_deref())?;
    // Register file options, then the config file, then flags.
    let options = register
        .options
        .merge(load_config(args.config.as_deref())?)
        .merge(args.option_overrides())
        .build()?;

    let layout = BitfieldLayout::new(&register.segments, &options);
    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &layout)?;
        tracing::info!(path = %path.display(), "wrote layout dump");
    }

    let svg = serialize(&layout.to_node());
    write_output_svg(&svg, args.output.as_deref())?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_register(path: Option<&Path>) -> Result<Register> {
    if let Some(path) = path.filter(|p| *p != Path::new("-")) {
        return load_register(path);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    parse_register(&buf)
}
