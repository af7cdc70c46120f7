//! Calendar time
//!
//! Broken-down local date/time used only for human-readable text
//! (display caption, status suffix, logs).

use core::fmt;

/// Seconds per day
const SECS_PER_DAY: i64 = 86_400;

/// Day of the week
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    /// Three-letter abbreviation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        }
    }

    /// Weekday for a count of days since 1970-01-01 (a Thursday)
    fn from_days_since_epoch(days: i64) -> Self {
        Self::ALL[(days + 3).rem_euclid(7) as usize]
    }
}

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Local calendar date and time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarTime {
    pub year: i32,
    /// 1-12
    pub month: u8,
    /// 1-31
    pub day: u8,
    pub weekday: Weekday,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CalendarTime {
    /// Midnight, 1 January 1970
    pub const EPOCH: Self = Self {
        year: 1970,
        month: 1,
        day: 1,
        weekday: Weekday::Thu,
        hour: 0,
        minute: 0,
        second: 0,
    };

    /// Break down Unix seconds shifted by a whole-hour timezone offset
    pub fn from_unix(unix_secs: i64, tz_offset_hours: i8) -> Self {
        let local = unix_secs.saturating_add(tz_offset_hours as i64 * 3600);
        let days = local.div_euclid(SECS_PER_DAY);
        let secs_of_day = local.rem_euclid(SECS_PER_DAY);

        let (year, month, day) = civil_from_days(days);

        Self {
            year,
            month,
            day,
            weekday: Weekday::from_days_since_epoch(days),
            hour: (secs_of_day / 3600) as u8,
            minute: ((secs_of_day % 3600) / 60) as u8,
            second: (secs_of_day % 60) as u8,
        }
    }

    /// Three-letter month abbreviation
    pub fn month_str(&self) -> &'static str {
        MONTHS
            .get(self.month.saturating_sub(1) as usize)
            .copied()
            .unwrap_or("???")
    }

    /// Compact "Mon 14:03" form for the display caption
    pub fn short(&self) -> ShortClock<'_> {
        ShortClock(self)
    }
}

/// Long form: "Mon, Jan 5, 2026 at 14:03"
impl fmt::Display for CalendarTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {} {}, {} at {:02}:{:02}",
            self.weekday.as_str(),
            self.month_str(),
            self.day,
            self.year,
            self.hour,
            self.minute
        )
    }
}

/// Short clock text, see [`CalendarTime::short`]
pub struct ShortClock<'a>(&'a CalendarTime);

impl fmt::Display for ShortClock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:02}:{:02}",
            self.0.weekday.as_str(),
            self.0.hour,
            self.0.minute
        )
    }
}

/// Convert days since 1970-01-01 into (year, month, day)
///
/// Proleptic Gregorian calendar, valid for negative day counts too.
fn civil_from_days(days: i64) -> (i32, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);

    (year as i32, month, day)
}
