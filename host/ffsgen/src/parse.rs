use std::{fs, path::Path};

use anyhow::Context as _;
use functionfs::Format;
use log::{debug, info};

use crate::{config::Config, desc, error::Error, strs};

/// The images produced from one configuration file
#[derive(Debug)]
pub struct Images {
    pub descs: Vec<u8>,
    /// `None` if the configuration has no `strings` section
    pub strs: Option<Vec<u8>>,
    pub str_count: usize,
}

/// Encodes both sections of `config`
///
/// Strings are encoded first since descriptors refer to them by index
pub fn encode(config: &Config, format: Format) -> Result<Images, Error> {
    let root = config.root();

    let (strs, str_count) = match strs::parse(root)? {
        Some(strings) => (Some(strings.image), strings.str_count),
        None => (None, 0),
    };

    let descs = desc::parse(root, str_count, format)?;

    Ok(Images {
        descs,
        strs,
        str_count,
    })
}

/// Reads `input` and writes the descriptor and string images
///
/// Nothing is written if either section fails to validate
pub fn generate(
    input: &Path,
    descs_file: &Path,
    strs_file: &Path,
    format: Format,
) -> Result<(), anyhow::Error> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("couldn't read {}", input.display()))?;
    let config = Config::parse(&text, &input.display().to_string())?;

    let images = encode(&config, format).map_err(|e| {
        debug!(
            "{:?} ({:?}) at {}: {}",
            e.kind(),
            e.kind().category(),
            e.location(),
            e.message()
        );
        e
    })?;

    fs::write(descs_file, &images.descs)
        .with_context(|| format!("couldn't write {}", descs_file.display()))?;
    println!(
        "{} bytes of {} descriptors written to {}",
        images.descs.len(),
        format,
        descs_file.display()
    );

    match &images.strs {
        Some(strs) => {
            fs::write(strs_file, strs)
                .with_context(|| format!("couldn't write {}", strs_file.display()))?;
            println!(
                "{} bytes of strings ({} per language) written to {}",
                strs.len(),
                images.str_count,
                strs_file.display()
            );
        }

        None => info!("no strings defined; {} not written", strs_file.display()),
    }

    Ok(())
}
