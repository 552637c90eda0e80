use super::{parse_range, ScalarRange};
use crate::error::{Error, Result};
use std::fmt;
use std::net::Ipv4Addr;

/// An IPv4 address range where each octet has its own `[low, high]` bounds, along with the
/// current position of the odometer walking it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRange {
    low: [u8; 4],
    high: [u8; 4],
    current: [u8; 4],
}

impl AddressRange {
    /// The range is positioned on its start address.
    pub fn new(low: [u8; 4], high: [u8; 4]) -> Self {
        let lo: [u8; 4] = std::array::from_fn(|i| low[i].min(high[i]));
        let hi: [u8; 4] = std::array::from_fn(|i| low[i].max(high[i]));
        AddressRange {
            low: lo,
            high: hi,
            current: lo,
        }
    }

    pub fn single(addr: Ipv4Addr) -> Self {
        AddressRange::new(addr.octets(), addr.octets())
    }

    pub fn start(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.low)
    }

    pub fn end(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.high)
    }

    pub fn current(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.current)
    }

    /// Number of distinct addresses visited before the odometer wraps.
    pub fn len(&self) -> u64 {
        (0..4)
            .map(|i| (self.high[i] - self.low[i]) as u64 + 1)
            .product()
    }

    pub fn is_single(&self) -> bool {
        self.low == self.high
    }

    /// Moves to the next address. The last octet moves fastest; an octet at its upper bound
    /// goes back to its lower bound and carries into the octet on its left. After the end
    /// address comes the start address again. Returns true on that wrap.
    pub fn advance(&mut self) -> bool {
        for i in (0..4).rev() {
            if self.current[i] < self.high[i] {
                self.current[i] += 1;
                return false;
            }
            self.current[i] = self.low[i];
        }
        true
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let octets: Vec<String> = (0..4)
            .map(|i| {
                if self.low[i] == self.high[i] {
                    self.low[i].to_string()
                } else {
                    format!("{}-{}", self.low[i], self.high[i])
                }
            })
            .collect();
        write!(f, "{}", octets.join("."))
    }
}

fn octet_bound(input: &str, value: u32) -> Result<u8> {
    u8::try_from(value).map_err(|_| Error::address(input, format!("octet {value} exceeds 255")))
}

/// Parses a dotted quad where every octet is either a number or a `"N-M"` range,
/// e.g. `"10.0.1-3.11"` covers 10.0.1.11 to 10.0.3.11.
pub fn parse_address_range(input: &str) -> Result<AddressRange> {
    let segments: Vec<&str> = input.split('.').collect();
    if segments.len() != 4 {
        return Err(Error::address(
            input,
            format!("expected 4 octets, found {}", segments.len()),
        ));
    }
    let mut low = [0u8; 4];
    let mut high = [0u8; 4];
    for (i, segment) in segments.iter().enumerate() {
        let ScalarRange { low: l, high: h } = parse_range(segment).map_err(|e| match e {
            Error::RangeFormat { reason, .. } => Error::address(input, reason),
            other => other,
        })?;
        low[i] = octet_bound(input, l)?;
        high[i] = octet_bound(input, h)?;
    }
    Ok(AddressRange::new(low, high))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_third_octet_range() {
        let r = parse_address_range("10.0.1-3.11").unwrap();
        assert_eq!(r.start(), Ipv4Addr::new(10, 0, 1, 11));
        assert_eq!(r.end(), Ipv4Addr::new(10, 0, 3, 11));
        assert_eq!(r.current(), r.start());
        assert_eq!(r.len(), 3);
        assert_eq!(r.to_string(), "10.0.1-3.11");
    }

    #[test]
    fn test_parse_reversed_octet() {
        let r = parse_address_range("127.0.0.3-2").unwrap();
        assert_eq!(r.start(), Ipv4Addr::new(127, 0, 0, 2));
        assert_eq!(r.end(), Ipv4Addr::new(127, 0, 0, 3));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_address_range("1.2.3"),
            Err(Error::AddressFormat { .. })
        ));
        assert!(matches!(
            parse_address_range("1.2.3.4.5"),
            Err(Error::AddressFormat { .. })
        ));
        assert!(matches!(
            parse_address_range("1.2.a-3.4"),
            Err(Error::AddressFormat { .. })
        ));
        assert!(matches!(
            parse_address_range("1.2.3.256"),
            Err(Error::AddressFormat { .. })
        ));
    }

    #[test]
    fn test_odometer_cycle() {
        let mut r = AddressRange::new([10, 0, 0, 0], [10, 0, 0, 2]);
        let mut seen = vec![r.current()];
        let mut wraps = vec![];
        for _ in 0..4 {
            wraps.push(r.advance());
            seen.push(r.current());
        }
        assert_eq!(
            seen,
            vec![
                Ipv4Addr::new(10, 0, 0, 0),
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 2),
                Ipv4Addr::new(10, 0, 0, 0),
                Ipv4Addr::new(10, 0, 0, 1),
            ]
        );
        assert_eq!(wraps, vec![false, false, true, false]);
    }

    #[test]
    fn test_odometer_carry() {
        let mut r = parse_address_range("10.0-1.0.1-2").unwrap();
        let mut seen = vec![r.current()];
        for _ in 0..4 {
            r.advance();
            seen.push(r.current());
        }
        assert_eq!(
            seen,
            vec![
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 2),
                Ipv4Addr::new(10, 1, 0, 1),
                Ipv4Addr::new(10, 1, 0, 2),
                Ipv4Addr::new(10, 0, 0, 1),
            ]
        );
    }

    #[test]
    fn test_single_address_always_wraps() {
        let mut r = AddressRange::single(Ipv4Addr::new(127, 0, 0, 2));
        assert!(r.is_single());
        assert!(r.advance());
        assert_eq!(r.current(), Ipv4Addr::new(127, 0, 0, 2));
    }
}
