//! Datetime structure and methods

/// Datetime structure, as read from the RTC once per cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datetime {
    pub date: Date,
    pub time: Time,
}

/// Date structure, with the full year (century included)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

/// Time structure, 24-hour format
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Datetime {
    /// Build a datetime from its six fields.
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            date: Date { year, month, day },
            time: Time {
                hour,
                minute,
                second,
            },
        }
    }

    /// True when the year lies within the inclusive bounds.
    /// A year outside them means the clock is lying, not that time has moved.
    pub fn is_plausible(&self, min_year: u16, max_year: u16) -> bool {
        (min_year..=max_year).contains(&self.date.year)
    }
}

/// Write `value` in decimal, left-padded with zeros up to `width` digits.
fn write_padded<W>(f: &mut ufmt::Formatter<'_, W>, value: u16, width: u8) -> Result<(), W::Error>
where
    W: ufmt::uWrite + ?Sized,
{
    let mut digits = 1;
    let mut rest = value / 10;
    while rest > 0 {
        digits += 1;
        rest /= 10;
    }
    for _ in digits..width {
        f.write_str("0")?;
    }
    ufmt::uDisplay::fmt(&value, f)
}

impl ufmt::uDisplay for Date {
    /// Format a date for the logs,
    /// for instance 2021-03-09
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        write_padded(f, self.year, 4)?;
        f.write_str("-")?;
        write_padded(f, self.month as u16, 2)?;
        f.write_str("-")?;
        write_padded(f, self.day as u16, 2)
    }
}

impl ufmt::uDisplay for Time {
    /// Format a time for the logs,
    /// for instance 19:05:03
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        write_padded(f, self.hour as u16, 2)?;
        f.write_str(":")?;
        write_padded(f, self.minute as u16, 2)?;
        f.write_str(":")?;
        write_padded(f, self.second as u16, 2)
    }
}

impl ufmt::uDisplay for Datetime {
    /// Format a datetime for the logs,
    /// for instance 2021-03-09T19:05:03 (no timezone)
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        ufmt::uDisplay::fmt(&self.date, f)?;
        f.write_str("T")?;
        ufmt::uDisplay::fmt(&self.time, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::String;

    fn render(datetime: Datetime) -> String<32> {
        let mut out = String::new();
        ufmt::uwrite!(&mut out, "{}", datetime).unwrap();
        out
    }

    #[test]
    fn pads_every_field() {
        assert_eq!(
            render(Datetime::new(2021, 3, 9, 19, 5, 3)).as_str(),
            "2021-03-09T19:05:03"
        );
        assert_eq!(
            render(Datetime::new(2010, 1, 1, 0, 0, 0)).as_str(),
            "2010-01-01T00:00:00"
        );
    }

    #[test]
    fn width_is_fixed() {
        for (year, month, day, hour, minute, second) in [
            (2100, 12, 31, 23, 59, 59),
            (2024, 2, 29, 7, 0, 9),
            (999, 10, 10, 10, 10, 10),
            (0, 0, 0, 0, 0, 0),
        ] {
            let out = render(Datetime::new(year, month, day, hour, minute, second));
            assert_eq!(out.len(), 19, "{}", out.as_str());
        }
        assert_eq!(
            render(Datetime::new(999, 10, 10, 10, 10, 10)).as_str(),
            "0999-10-10T10:10:10"
        );
    }

    #[test]
    fn formatting_is_repeatable() {
        let datetime = Datetime::new(2033, 11, 4, 6, 45, 30);
        assert_eq!(render(datetime), render(datetime));
    }

    #[test]
    fn plausibility_bounds_are_inclusive() {
        let at = |year| Datetime::new(year, 6, 1, 12, 0, 0);
        assert!(at(2010).is_plausible(2010, 2100));
        assert!(at(2100).is_plausible(2010, 2100));
        assert!(at(2055).is_plausible(2010, 2100));
        assert!(!at(2009).is_plausible(2010, 2100));
        assert!(!at(2101).is_plausible(2010, 2100));
        assert!(!at(2165).is_plausible(2010, 2100));
    }
}
