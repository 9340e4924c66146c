//! `strings` section
//!
//! ``` text
//! strings = (
//!     { lang = 0x0409; strs = ("Config1", "IfaceA"); },
//!     { lang = 0x0415; strs = ("Konfiguracja1", "InterfejsA"); },
//! );
//! ```

use core::convert::TryFrom;

use functionfs::{strs::Lang, Error as EncodeError};

use crate::{
    config::Setting,
    error::{Error, ErrorKind},
};

/// An encoded string image
#[derive(Debug)]
pub struct Strings {
    pub image: Vec<u8>,
    /// Number of strings per language
    pub str_count: usize,
}

/// Encodes the `strings` section of `root`, if there's one
pub fn parse(root: &Setting) -> Result<Option<Strings>, Error> {
    let list = match root.member("strings") {
        Some(list) => list,
        None => return Ok(None),
    };

    if !list.is_list() {
        return Err(Error::new(list, ErrorKind::BadValue, "expected list"));
    }

    let langs = list
        .elems()
        .iter()
        .map(lang)
        .collect::<Result<Vec<_>, _>>()?;

    let image = functionfs::strs::encode(&langs).map_err(|e| locate(list, e))?;

    Ok(Some(Strings {
        image,
        str_count: functionfs::strs::str_count(&langs),
    }))
}

fn lang(group: &Setting) -> Result<Lang, Error> {
    if !group.is_group() {
        return Err(Error::new(group, ErrorKind::BadValue, "expected group"));
    }

    let node = group
        .member("lang")
        .ok_or_else(|| Error::new(group, ErrorKind::NotFound, "lang not defined"))?;
    let code = u16::try_from(node.get_int()?)
        .map_err(|_| Error::new(node, ErrorKind::BadValue, "language code out of range"))?;

    let node = group
        .member("strs")
        .ok_or_else(|| Error::new(group, ErrorKind::NotFound, "strs not defined"))?;
    if !node.is_list() && !node.is_array() {
        return Err(Error::new(
            node,
            ErrorKind::BadValue,
            "expected list or array",
        ));
    }

    let strs = node
        .elems()
        .iter()
        .map(|s| s.get_string().map(str::to_owned))
        .collect::<Result<_, _>>()?;

    Ok(Lang { code, strs })
}

// reports an encoding error at the setting that caused it
fn locate(list: &Setting, e: EncodeError) -> Error {
    let node = match e {
        EncodeError::DuplicateLanguage { index, .. } => {
            list.elem(index).and_then(|group| group.member("lang"))
        }
        EncodeError::InconsistentStringCount { index, .. } => {
            list.elem(index).and_then(|group| group.member("strs"))
        }
        EncodeError::NulInString { lang, index } => list
            .elem(lang)
            .and_then(|group| group.member("strs"))
            .and_then(|strs| strs.elem(index)),
        _ => None,
    };

    Error::encoding(node.unwrap_or(list), e)
}
