use std::path::PathBuf;

use anyhow::bail;
use functionfs::Format;
use log::debug;
use structopt::StructOpt;

mod config;
mod desc;
mod error;
mod flags;
mod parse;
mod strs;

/// Generates FunctionFS descriptor and string images from a configuration file
#[derive(StructOpt)]
struct Opts {
    /// Descriptor image output
    #[structopt(
        short,
        long,
        default_value = "out.desc",
        parse(from_os_str),
        value_name = "file"
    )]
    descriptors_file: PathBuf,

    /// String image output; only written if the configuration defines strings
    #[structopt(
        short,
        long,
        default_value = "out.strs",
        parse(from_os_str),
        value_name = "file"
    )]
    strings_file: PathBuf,

    /// Descriptor image format [default: newest]
    #[structopt(short = "f", long, value_name = "version")]
    descriptors_format: Option<Format>,

    /// Prints the supported descriptor formats and exits
    #[structopt(long)]
    list_desc_formats: bool,

    #[structopt(name = "FILE", parse(from_os_str))]
    input: Option<PathBuf>,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let opts = Opts::from_args();

    if opts.list_desc_formats {
        for format in Format::ALL.iter() {
            println!("{}", format);
        }
        return Ok(());
    }

    let input = match opts.input {
        Some(input) => input,
        None => bail!("no input files"),
    };

    let format = opts.descriptors_format.unwrap_or_default();
    debug!(
        "{} -> {} ({}), {}",
        input.display(),
        opts.descriptors_file.display(),
        format,
        opts.strings_file.display()
    );

    parse::generate(&input, &opts.descriptors_file, &opts.strings_file, format)
}
