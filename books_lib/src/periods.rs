use crate::errors::{BooksError, Result};
use chrono::{Datelike, Days, Months, NaiveDate};
use regex::{Captures, Regex};
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Specifies a day, that is relative to some "today".
/// Such a specification can be stored in configuration files, for instance
/// as "one year ago".  That way, when we launch the application at some point
/// in the future, this is still "one year ago".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instant {
    Today,
    On(NaiveDate),
    DaysAgo(u64),
    MonthsAgo(u32),
    YearsAgo(u32),
    StartOfMonth,
    StartOfYear,
}

impl Instant {
    /// Convert self to an actual date.
    pub fn to_date(&self, today: NaiveDate) -> Result<NaiveDate> {
        let d = match self {
            Instant::Today => Some(today),
            Instant::On(d) => Some(*d),
            Instant::DaysAgo(count) => today.checked_sub_days(Days::new(*count)),
            Instant::MonthsAgo(count) => {
                today.checked_sub_months(Months::new(*count))
            }
            Instant::YearsAgo(count) => {
                today.checked_sub_months(Months::new(*count * 12))
            }
            Instant::StartOfMonth => today.with_day(1),
            Instant::StartOfYear => {
                NaiveDate::from_ymd_opt(today.year(), 1, 1)
            }
        };
        d.ok_or_else(|| {
            BooksError::invalid("date", format!("{self:?} from {today}"))
        })
    }
}

/// A range of days [start; end] including both ends.
/// When start is None, the range extends back to the first entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: Option<NaiveDate>,
    pub end: NaiveDate,
}

fn month_range(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((start, end))
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|e| {
        BooksError::invalid("date", format!("{text:?} ({e}), expected YYYY-MM-DD"))
    })
}

/// A group of a regexp match.  Groups are never optional in our regexps.
fn group<'t>(c: &Captures<'t>, n: usize) -> Result<&'t str> {
    c.get(n)
        .map(|m| m.as_str())
        .ok_or_else(|| BooksError::invalid("period", format!("missing group {n}")))
}

fn period_regexps() -> &'static [Regex; 4] {
    static RE: OnceLock<[Regex; 4]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"^(\d{4})$").expect("valid regexp"),
            Regex::new(r"^(\d{4})-(\d{1,2})$").expect("valid regexp"),
            Regex::new(r"^last-(\d+)-days?$").expect("valid regexp"),
            Regex::new(r"^(.*)\.\.(.*)$").expect("valid regexp"),
        ]
    })
}

impl Period {
    pub fn new(start: Option<NaiveDate>, end: NaiveDate) -> Result<Self> {
        match start {
            Some(s) if s > end => Err(BooksError::invalid(
                "period",
                format!("start {s} is after end {end}"),
            )),
            Some(_) | None => Ok(Period { start, end }),
        }
    }

    /// Everything up to, and including, the given day
    pub fn up_to(end: NaiveDate) -> Self {
        Period { start: None, end }
    }

    pub fn from_instants(
        start: Option<Instant>,
        end: Instant,
        today: NaiveDate,
    ) -> Result<Self> {
        Period::new(
            start.map(|s| s.to_date(today)).transpose()?,
            end.to_date(today)?,
        )
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date <= self.end && self.start.map_or(true, |s| s <= date)
    }

    /// Whether the date is before the start of the period
    pub fn is_before(&self, date: NaiveDate) -> bool {
        self.start.is_some_and(|s| date < s)
    }

    /// The last day before the period, used to compute opening balances.
    pub fn day_before_start(&self) -> Option<NaiveDate> {
        self.start.and_then(|s| s.pred_opt())
    }

    /// Parse a textual description of a period:
    ///    all, ytd, mtd, last-month, last-year, last-N-days,
    ///    YYYY, YYYY-MM, YYYY-MM-DD, START..END (either bound may be
    ///    omitted)
    pub fn parse(text: &str, today: NaiveDate) -> Result<Self> {
        let text = text.trim().to_lowercase();
        let [re_year, re_month, re_days, re_range] = period_regexps();
        let invalid = || {
            BooksError::invalid("period", format!("cannot parse {text:?}"))
        };

        match text.as_str() {
            "all" => return Ok(Period::up_to(today)),
            "ytd" => {
                return Period::from_instants(
                    Some(Instant::StartOfYear),
                    Instant::Today,
                    today,
                )
            }
            "mtd" => {
                return Period::from_instants(
                    Some(Instant::StartOfMonth),
                    Instant::Today,
                    today,
                )
            }
            "last-month" => {
                let d = Instant::MonthsAgo(1).to_date(today)?;
                let (s, e) =
                    month_range(d.year(), d.month()).ok_or_else(invalid)?;
                return Period::new(Some(s), e);
            }
            "last-year" => {
                let y = today.year() - 1;
                let s = NaiveDate::from_ymd_opt(y, 1, 1).ok_or_else(invalid)?;
                let e =
                    NaiveDate::from_ymd_opt(y, 12, 31).ok_or_else(invalid)?;
                return Period::new(Some(s), e);
            }
            _ => {}
        }

        if let Some(c) = re_year.captures(&text) {
            let y: i32 = group(&c, 1)?.parse()?;
            let s = NaiveDate::from_ymd_opt(y, 1, 1).ok_or_else(invalid)?;
            let e = NaiveDate::from_ymd_opt(y, 12, 31).ok_or_else(invalid)?;
            return Period::new(Some(s), e);
        }
        if let Some(c) = re_month.captures(&text) {
            let (s, e) = month_range(group(&c, 1)?.parse()?, group(&c, 2)?.parse()?)
                .ok_or_else(invalid)?;
            return Period::new(Some(s), e);
        }
        if let Some(c) = re_days.captures(&text) {
            let n: u64 = group(&c, 1)?.parse()?;
            if n == 0 {
                return Err(invalid());
            }
            return Period::from_instants(
                Some(Instant::DaysAgo(n - 1)),
                Instant::Today,
                today,
            );
        }
        if let Some(c) = re_range.captures(&text) {
            let start = match group(&c, 1)?.trim() {
                "" => None,
                s => Some(parse_date(s)?),
            };
            let end = match group(&c, 2)?.trim() {
                "" => today,
                e => parse_date(e)?,
            };
            return Period::new(start, end);
        }

        let d = parse_date(&text).map_err(|_| invalid())?;
        Period::new(Some(d), d)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            None => write!(f, "up to {}", self.end),
            Some(s) if s == self.end => write!(f, "{s}"),
            Some(s) => write!(f, "{s} to {}", self.end),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::periods::{Instant, Period};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_instants() {
        let today = d(2024, 3, 31);
        assert_eq!(Instant::Today.to_date(today).unwrap(), today);
        assert_eq!(Instant::DaysAgo(31).to_date(today).unwrap(), d(2024, 2, 29));
        assert_eq!(Instant::MonthsAgo(1).to_date(today).unwrap(), d(2024, 2, 29));
        assert_eq!(Instant::YearsAgo(1).to_date(today).unwrap(), d(2023, 3, 31));
        assert_eq!(Instant::StartOfMonth.to_date(today).unwrap(), d(2024, 3, 1));
        assert_eq!(Instant::StartOfYear.to_date(today).unwrap(), d(2024, 1, 1));
    }

    #[test]
    fn test_parse() {
        let today = d(2024, 3, 15);
        let p = |s: &str| Period::parse(s, today).unwrap();

        assert_eq!(p("all"), Period::up_to(today));
        assert_eq!(p("2023"), Period::new(Some(d(2023, 1, 1)), d(2023, 12, 31)).unwrap());
        assert_eq!(p("2024-02"), Period::new(Some(d(2024, 2, 1)), d(2024, 2, 29)).unwrap());
        assert_eq!(p("ytd"), Period::new(Some(d(2024, 1, 1)), today).unwrap());
        assert_eq!(p("MTD"), Period::new(Some(d(2024, 3, 1)), today).unwrap());
        assert_eq!(p("last-month"), Period::new(Some(d(2024, 2, 1)), d(2024, 2, 29)).unwrap());
        assert_eq!(p("last-year"), Period::new(Some(d(2023, 1, 1)), d(2023, 12, 31)).unwrap());
        assert_eq!(p("last-7-days"), Period::new(Some(d(2024, 3, 9)), today).unwrap());
        assert_eq!(p("2024-01-10..2024-01-20"), Period::new(Some(d(2024, 1, 10)), d(2024, 1, 20)).unwrap());
        assert_eq!(p("..2024-01-20"), Period::up_to(d(2024, 1, 20)));
        assert_eq!(p("2024-01-10.."), Period::new(Some(d(2024, 1, 10)), today).unwrap());
        assert_eq!(p("2024-01-10"), Period::new(Some(d(2024, 1, 10)), d(2024, 1, 10)).unwrap());

        assert!(Period::parse("2024-13", today).is_err());
        assert!(Period::parse("2024-02-01..2024-01-01", today).is_err());
        assert!(Period::parse("last-0-days", today).is_err());
        assert!(Period::parse("soon", today).is_err());
    }

    #[test]
    fn test_contains() {
        let p = Period::new(Some(d(2024, 1, 1)), d(2024, 1, 31)).unwrap();
        assert!(p.contains(d(2024, 1, 1)));
        assert!(p.contains(d(2024, 1, 31)));
        assert!(!p.contains(d(2024, 2, 1)));
        assert!(p.is_before(d(2023, 12, 31)));
        assert_eq!(p.day_before_start(), Some(d(2023, 12, 31)));
        assert_eq!(Period::up_to(d(2024, 1, 31)).day_before_start(), None);
        assert_eq!(p.to_string(), "2024-01-01 to 2024-01-31");
    }
}
