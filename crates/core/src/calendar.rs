// crates/core/src/calendar.rs
//! Fixed chronological date table.
//!
//! Every day from `20-01-01` to `26-12-31` gets a dense id in calendar order.
//! Ids are assigned once at construction, independent of the input, and
//! [`CalendarIndex::decode`] recomputes them from a `YY-MM-DD` token with
//! plain arithmetic.
//!
//! Leap years use the "divisible by 4" rule only. That is exact for the
//! supported span (2000 is the only century year nearby and it *is* a leap
//! year), but the table must not be extended past 2099 without fixing it.

/// Dense surrogate key for a calendar day.
pub type DateId = u32;

/// First supported year, as an offset from 2000.
pub const FIRST_YEAR: u32 = 20;
/// Last supported year (inclusive), as an offset from 2000.
pub const LAST_YEAR: u32 = 26;

const YEARS: usize = (LAST_YEAR - FIRST_YEAR + 1) as usize;

/// Days before the first of each month in a non-leap year.
const DAYS_BEFORE_MONTH: [u32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

fn is_leap(year: u32) -> bool {
    (2000 + year) % 4 == 0
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        2 if is_leap(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

#[derive(Debug, Clone)]
pub struct CalendarIndex {
    year_base: [DateId; YEARS],
    /// Canonical `20YY-MM-DD` label per id.
    labels: Vec<String>,
}

impl CalendarIndex {
    pub fn new() -> Self {
        let mut year_base = [0; YEARS];
        let mut labels = Vec::with_capacity(YEARS * 366);

        for year in FIRST_YEAR..=LAST_YEAR {
            year_base[(year - FIRST_YEAR) as usize] = labels.len() as DateId;
            for month in 1..=12 {
                for day in 1..=days_in_month(year, month) {
                    labels.push(format!("20{year:02}-{month:02}-{day:02}"));
                }
            }
        }

        Self { year_base, labels }
    }

    /// Number of days in the span.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Decode an 8-byte `YY-MM-DD` token into its id.
    ///
    /// Returns `None` for anything that is not a real day inside the span.
    /// Only the first 8 bytes of `token` are looked at.
    #[inline]
    pub fn decode(&self, token: &[u8]) -> Option<DateId> {
        let t: &[u8; 8] = token.get(..8)?.try_into().ok()?;
        if t[2] != b'-' || t[5] != b'-' {
            return None;
        }

        let year = two_digits(t[0], t[1])?;
        let month = two_digits(t[3], t[4])?;
        let day = two_digits(t[6], t[7])?;

        if !(FIRST_YEAR..=LAST_YEAR).contains(&year)
            || !(1..=12).contains(&month)
            || day == 0
            || day > days_in_month(year, month)
        {
            return None;
        }

        let leap_shift = u32::from(month > 2 && is_leap(year));
        Some(
            self.year_base[(year - FIRST_YEAR) as usize]
                + DAYS_BEFORE_MONTH[(month - 1) as usize]
                + leap_shift
                + (day - 1),
        )
    }

    /// Decode the date part of a full `YYYY-MM-DD...` timestamp.
    pub fn decode_timestamp(&self, timestamp: &str) -> Option<DateId> {
        let bytes = timestamp.as_bytes();
        if bytes.get(..2)? != b"20" {
            return None;
        }
        self.decode(bytes.get(2..10)?)
    }

    /// Canonical `20YY-MM-DD` label for an id.
    pub fn label(&self, id: DateId) -> Option<&str> {
        self.labels.get(id as usize).map(String::as_str)
    }

    /// The `YY-MM-DD` token that decodes to `id`.
    pub fn token(&self, id: DateId) -> Option<&str> {
        self.label(id).map(|l| &l[2..])
    }
}

impl Default for CalendarIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn two_digits(hi: u8, lo: u8) -> Option<u32> {
    let hi = hi.wrapping_sub(b'0');
    let lo = lo.wrapping_sub(b'0');
    if hi > 9 || lo > 9 {
        return None;
    }
    Some(u32::from(hi) * 10 + u32::from(lo))
}
