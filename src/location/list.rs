//! Pasted coordinate lists and stepping through them.

use super::LatLng;

/// Parse one `lng lat` pair per line.
///
/// Fields are separated by spaces or tabs; extra fields are ignored. Each
/// field contributes its leading decimal number, so `144.9, -37.8` reads as
/// `144.9 -37.8`. Lines where either field does not start with a number are
/// skipped.
pub fn parse_coordinate_list(text: &str) -> Vec<LatLng> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split([' ', '\t']).filter(|field| !field.is_empty());
            let lng = leading_number(fields.next()?)?;
            let lat = leading_number(fields.next()?)?;
            Some(LatLng::new(lat, lng))
        })
        .collect()
}

/// The longest prefix of `field` that reads as a decimal number: an optional
/// sign, digits with at most one point, and an optional exponent.
fn leading_number(field: &str) -> Option<f64> {
    let bytes = field.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    let whole = count_digits(&bytes[end..]);
    end += whole;
    let mut fraction = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction = count_digits(&bytes[end + 1..]);
        end += 1 + fraction;
    }
    if whole + fraction == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let digits = count_digits(&bytes[exponent..]);
        if digits > 0 {
            end = exponent + digits;
        }
    }

    field[..end].parse().ok()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// A position within a coordinate list.
///
/// Stepping stops at either end instead of wrapping.
#[derive(Clone, Debug, Default)]
pub struct CoordinateCursor {
    coords: Vec<LatLng>,
    index: usize,
}

impl CoordinateCursor {
    pub fn new(coords: Vec<LatLng>) -> Self {
        Self { coords, index: 0 }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(parse_coordinate_list(text))
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<LatLng> {
        self.coords.get(self.index).copied()
    }

    /// Step forward. `None` at the end of the list.
    pub fn forward(&mut self) -> Option<LatLng> {
        if self.index + 1 >= self.coords.len() {
            return None;
        }
        self.index += 1;
        self.current()
    }

    /// Step back. `None` at the start of the list.
    pub fn back(&mut self) -> Option<LatLng> {
        if self.index == 0 || self.coords.is_empty() {
            return None;
        }
        self.index -= 1;
        self.current()
    }
}
