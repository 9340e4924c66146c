//! `|` separated symbolic flags, e.g. `"USB_ENDPOINT_XFER_BULK | USB_ENDPOINT_MAX_ADJUSTABLE"`

use functionfs::consts;

/// Flag name that's not in the table
#[derive(Debug, PartialEq)]
pub struct UnknownFlag<'s>(pub &'s str);

/// Resolves every name of `flags` against `table` and ORs the values together
///
/// Whitespace around names is ignored; a blank string has no flags set
pub fn parse<'s>(flags: &'s str, table: &[(&str, u32)]) -> Result<u32, UnknownFlag<'s>> {
    if flags.trim().is_empty() {
        return Ok(0);
    }

    flags.split('|').map(str::trim).try_fold(0, |bits, name| {
        consts::lookup(table, name)
            .map(|value| bits | value)
            .ok_or(UnknownFlag(name))
    })
}
