use crate::error::{Error, Result};

pub mod address;
pub use address::{parse_address_range, AddressRange};

const RANGE_SEPARATOR: char = '-';

/// An inclusive `[low, high]` interval of unsigned values, always stored with `low <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarRange {
    pub low: u32,
    pub high: u32,
}

impl ScalarRange {
    /// Builds a range from two endpoints given in any order.
    pub fn new(a: u32, b: u32) -> Self {
        ScalarRange {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn single(value: u32) -> Self {
        ScalarRange {
            low: value,
            high: value,
        }
    }

    /// Number of distinct values in the range.
    pub fn len(&self) -> u64 {
        (self.high - self.low) as u64 + 1
    }

    pub fn is_single(&self) -> bool {
        self.low == self.high
    }

    pub fn contains(&self, value: u32) -> bool {
        self.low <= value && value <= self.high
    }

    /// Value following `current`, wrapping to `low` after `high`.
    /// The boolean is true when the wrap happened.
    pub fn step(&self, current: u32) -> (u32, bool) {
        if current >= self.high {
            (self.low, true)
        } else {
            (current + 1, false)
        }
    }
}

fn parse_value(input: &str, part: &str) -> Result<u32> {
    part.parse::<u32>()
        .map_err(|e| Error::range(input, format!("[{part}] is not a non-negative integer ({e})")))
}

/// Parses `"N"` or `"N-M"` into a canonical range. The order of the endpoints in `"N-M"` does
/// not matter: `"10-3"` and `"3-10"` give the same range.
pub fn parse_range(input: &str) -> Result<ScalarRange> {
    if input.contains(RANGE_SEPARATOR) {
        let parts: Vec<&str> = input.split(RANGE_SEPARATOR).collect();
        if parts.len() != 2 {
            return Err(Error::range(input, "expected exactly one '-' separator"));
        }
        let a = parse_value(input, parts[0])?;
        let b = parse_value(input, parts[1])?;
        Ok(ScalarRange::new(a, b))
    } else {
        Ok(ScalarRange::single(parse_value(input, input)?))
    }
}

/// Same as [`parse_range`], restricted to 16-bit UDP ports.
pub fn parse_port_range(input: &str) -> Result<ScalarRange> {
    let range = parse_range(input)?;
    if range.high > u16::MAX as u32 {
        return Err(Error::range(
            input,
            format!("port {} does not fit in 16 bits", range.high),
        ));
    }
    Ok(range)
}

/// TEIDs use the whole 32-bit space, so this is [`parse_range`] under its protocol name.
pub fn parse_teid_range(input: &str) -> Result<ScalarRange> {
    parse_range(input)
}
