//! String image
//!
//! ``` text
//! | magic = 2 | length | str_count | lang_count | lang 0 | lang 1 | .. |
//!
//! lang: | code (u16) | string 0 | NUL | string 1 | NUL | .. |
//! ```

use arrayref::array_ref;
use log::debug;

use crate::{Error, STRINGS_MAGIC};

/// Size of the string image header
pub const HEAD_SIZE: usize = 16;

/// Strings of one language
#[derive(Clone, Debug, PartialEq)]
pub struct Lang {
    /// Language code, e.g. `0x0409` (English, United States)
    pub code: u16,
    /// Strings; the first one has index 1
    pub strs: Vec<String>,
}

impl Lang {
    fn size(&self) -> usize {
        2 + self.strs.iter().map(|s| s.len() + 1).sum::<usize>()
    }
}

/// Number of strings each language of `langs` declares
///
/// This is also the largest string index descriptors may refer to
pub fn str_count(langs: &[Lang]) -> usize {
    langs.first().map(|lang| lang.strs.len()).unwrap_or(0)
}

/// Checks that all languages are distinct and have the same number of strings
pub fn check(langs: &[Lang]) -> Result<(), Error> {
    let expected = str_count(langs);

    for (index, lang) in langs.iter().enumerate() {
        if langs[..index].iter().any(|prev| prev.code == lang.code) {
            return Err(Error::DuplicateLanguage {
                index,
                code: lang.code,
            });
        }

        if lang.strs.len() != expected {
            return Err(Error::InconsistentStringCount {
                index,
                expected,
                found: lang.strs.len(),
            });
        }

        if let Some(i) = lang.strs.iter().position(|s| s.as_bytes().contains(&0)) {
            return Err(Error::NulInString {
                lang: index,
                index: i,
            });
        }
    }

    Ok(())
}

/// Serializes `langs` into a string image
pub fn encode(langs: &[Lang]) -> Result<Vec<u8>, Error> {
    check(langs)?;

    let size = HEAD_SIZE + langs.iter().map(Lang::size).sum::<usize>();
    let str_count = str_count(langs);
    debug!(
        "string image: {} lang(s) x {} string(s), {} bytes",
        langs.len(),
        str_count,
        size
    );

    let mut buf = crate::alloc(size)?;
    crate::push_u32(&mut buf, STRINGS_MAGIC);
    crate::push_u32(&mut buf, size as u32);
    crate::push_u32(&mut buf, str_count as u32);
    crate::push_u32(&mut buf, langs.len() as u32);

    for lang in langs {
        buf.extend_from_slice(&lang.code.to_le_bytes());
        for s in &lang.strs {
            buf.extend_from_slice(s.as_bytes());
            buf.push(0);
        }
    }

    debug_assert_eq!(buf.len(), size);

    Ok(buf)
}

/// Decoded string image header
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Head {
    /// Total length of the image, header included
    pub length: u32,
    /// Number of strings per language
    pub str_count: u32,
    /// Number of languages
    pub lang_count: u32,
}

impl Head {
    /// Parses the header of the string image `bytes`
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < HEAD_SIZE {
            return Err(Error::Truncated);
        }

        let word = |offset: usize| u32::from_le_bytes(*array_ref!(bytes, offset, 4));

        let magic = word(0);
        if magic != STRINGS_MAGIC {
            return Err(Error::BadMagic(magic));
        }

        let length = word(4);
        if length as usize != bytes.len() {
            return Err(Error::LengthMismatch {
                header: length,
                actual: bytes.len(),
            });
        }

        Ok(Head {
            length,
            str_count: word(8),
            lang_count: word(12),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{encode, str_count, Head, Lang};
    use crate::Error;

    fn lang(code: u16, strs: &[&str]) -> Lang {
        Lang {
            code,
            strs: strs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn one_lang() {
        let langs = [lang(0x0409, &["Config1", "IfaceA"])];
        let image = encode(&langs).unwrap();

        let mut expected = vec![];
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(&33u32.to_le_bytes());
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(&1u32.to_le_bytes());
        expected.extend_from_slice(&[0x09, 0x04]);
        expected.extend_from_slice(b"Config1\0IfaceA\0");
        assert_eq!(image, expected);

        assert_eq!(
            Head::parse(&image),
            Ok(Head {
                length: 33,
                str_count: 2,
                lang_count: 1,
            })
        );
        assert_eq!(str_count(&langs), 2);
    }

    #[test]
    fn langs_keep_declaration_order() {
        let langs = [lang(0x0415, &["Wejście"]), lang(0x0409, &["Input"])];
        let image = encode(&langs).unwrap();

        let pl = 16;
        let en = pl + 2 + "Wejście".len() + 1;
        assert_eq!(&image[pl..pl + 2], &[0x15, 0x04]);
        assert_eq!(&image[en..en + 2], &[0x09, 0x04]);
        assert_eq!(&image[en + 2..], b"Input\0");

        let head = Head::parse(&image).unwrap();
        assert_eq!(head.length as usize, image.len());
        assert_eq!(head.lang_count, 2);
        assert_eq!(head.str_count, 1);
    }

    #[test]
    fn empty_strings() {
        let image = encode(&[lang(0x0409, &["", "", "x"])]).unwrap();
        assert_eq!(image.len(), 16 + 2 + 1 + 1 + 2);
        assert_eq!(&image[18..], b"\0\0x\0");
        assert_eq!(Head::parse(&image).unwrap().length, 22);
    }

    #[test]
    fn no_langs() {
        let image = encode(&[]).unwrap();
        assert_eq!(
            Head::parse(&image),
            Ok(Head {
                length: 16,
                str_count: 0,
                lang_count: 0,
            })
        );
    }

    #[test]
    fn inconsistent_string_count() {
        let langs = [
            lang(0x0409, &["a", "b", "c"]),
            lang(0x0407, &["a", "b"]),
        ];

        assert_eq!(
            encode(&langs),
            Err(Error::InconsistentStringCount {
                index: 1,
                expected: 3,
                found: 2,
            })
        );
    }

    #[test]
    fn duplicate_lang() {
        let langs = [
            lang(0x0409, &["a"]),
            lang(0x0407, &["b"]),
            lang(0x0409, &["c"]),
        ];

        assert_eq!(
            encode(&langs),
            Err(Error::DuplicateLanguage {
                index: 2,
                code: 0x0409,
            })
        );
    }

    #[test]
    fn nul_in_string() {
        assert_eq!(
            encode(&[lang(0x0409, &["ok", "not\0ok"])]),
            Err(Error::NulInString { lang: 0, index: 1 })
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!(Head::parse(&[2, 0, 0, 0]), Err(Error::Truncated));

        let mut image = encode(&[lang(0x0409, &["a"])]).unwrap();
        image.push(0);
        assert_eq!(
            Head::parse(&image),
            Err(Error::LengthMismatch {
                header: 20,
                actual: 21,
            })
        );

        image[0] = 1;
        assert_eq!(Head::parse(&image[..20]), Err(Error::BadMagic(1)));
    }
}
