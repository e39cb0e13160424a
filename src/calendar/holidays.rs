use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;
use std::str::FromStr;
use strum::{Display, EnumString};
use tracing::{debug, info};

use crate::config::HolidayConfig;
use crate::errors::ServiceError;

/// Holiday names keyed by date. A date carrying several holidays joins their names with `"; "`.
pub type HolidayMap = BTreeMap<NaiveDate, String>;

pub trait HolidayCalendar {
    fn holidays(&self, years: RangeInclusive<i32>) -> HolidayMap;
}

/// Adds `name` for `date`, appending to any holiday already recorded that day.
pub fn insert_holiday(map: &mut HolidayMap, date: NaiveDate, name: &str) {
    map.entry(date)
        .and_modify(|existing| {
            if !existing.split("; ").any(|n| n == name) {
                existing.push_str("; ");
                existing.push_str(name);
            }
        })
        .or_insert_with(|| name.to_string());
}

/// Malaysian states and federal territories (ISO 3166-2:MY codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Subdivision {
    Jhr,
    Kdh,
    Ktn,
    Kul,
    Lbn,
    Mlk,
    Nsn,
    Phg,
    Pjy,
    Pls,
    Png,
    Prk,
    Sbh,
    Sgr,
    Swk,
    Trg,
}

impl Subdivision {
    fn is_federal_territory(self) -> bool {
        matches!(self, Subdivision::Kul | Subdivision::Lbn | Subdivision::Pjy)
    }

    fn observes_new_year(self) -> bool {
        !matches!(
            self,
            Subdivision::Jhr | Subdivision::Kdh | Subdivision::Ktn | Subdivision::Pls | Subdivision::Trg
        )
    }

    /// Kedah, Kelantan and Terengganu rest on Friday and Saturday.
    fn weekend(self) -> [Weekday; 2] {
        match self {
            Subdivision::Kdh | Subdivision::Ktn | Subdivision::Trg => [Weekday::Fri, Weekday::Sat],
            _ => [Weekday::Sat, Weekday::Sun],
        }
    }

    /// Holidays on this day are replaced by the next working day.
    fn rest_day(self) -> Weekday {
        match self {
            Subdivision::Kdh | Subdivision::Ktn | Subdivision::Trg => Weekday::Fri,
            _ => Weekday::Sun,
        }
    }
}

/// Rule-based Malaysian public holidays. Lunar-calendar holidays (Hari Raya, Chinese New
/// Year, Deepavali, ...) are not computed here; supply them through [`ExtraHolidays`].
#[derive(Debug, Clone)]
pub struct MalaysiaCalendar {
    subdivision: Subdivision,
}

impl MalaysiaCalendar {
    pub fn new(subdivision: Subdivision) -> Self {
        Self { subdivision }
    }

    fn fixed_holidays(&self, year: i32) -> Vec<(NaiveDate, &'static str)> {
        let mut days = Vec::new();
        let mut add = |month: u32, day: u32, name: &'static str| {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                days.push((date, name));
            }
        };

        if self.subdivision.observes_new_year() {
            add(1, 1, "New Year's Day");
        }
        if self.subdivision.is_federal_territory() {
            add(2, 1, "Federal Territory Day");
        }
        add(5, 1, "Labour Day");
        add(8, 31, "National Day");
        add(9, 16, "Malaysia Day");
        add(12, 25, "Christmas Day");

        if let Some(date) = NaiveDate::from_weekday_of_month_opt(year, 6, Weekday::Mon, 1) {
            days.push((date, "Birthday of the Yang di-Pertuan Agong"));
        }

        days.sort();
        days
    }

    fn is_weekend(&self, date: NaiveDate) -> bool {
        self.subdivision.weekend().contains(&date.weekday())
    }
}

impl HolidayCalendar for MalaysiaCalendar {
    fn holidays(&self, years: RangeInclusive<i32>) -> HolidayMap {
        let mut map = HolidayMap::new();
        let mut observed = Vec::new();

        for year in years {
            for (date, name) in self.fixed_holidays(year) {
                insert_holiday(&mut map, date, name);
                if date.weekday() == self.subdivision.rest_day() {
                    observed.push((date, name));
                }
            }
        }

        for (date, name) in observed {
            let mut substitute = date + Duration::days(1);
            while self.is_weekend(substitute) || map.contains_key(&substitute) {
                substitute += Duration::days(1);
            }
            map.insert(substitute, format!("{name} (in lieu)"));
        }

        map
    }
}

#[derive(Debug, Deserialize)]
struct ExtraHolidayRow {
    date: NaiveDate,
    name: String,
}

/// Dated holidays read from a `date,name` CSV file.
#[derive(Debug, Clone, Default)]
pub struct ExtraHolidays {
    entries: Vec<(NaiveDate, String)>,
}

impl ExtraHolidays {
    pub fn new(entries: Vec<(NaiveDate, String)>) -> Self {
        Self { entries }
    }

    pub fn from_csv(path: &Path) -> Result<Self, ServiceError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut entries = Vec::new();
        for row in reader.deserialize() {
            let row: ExtraHolidayRow = row?;
            entries.push((row.date, row.name.trim().to_string()));
        }
        debug!("Read {} extra holidays from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HolidayCalendar for ExtraHolidays {
    fn holidays(&self, years: RangeInclusive<i32>) -> HolidayMap {
        let mut map = HolidayMap::new();
        for (date, name) in &self.entries {
            if years.contains(&date.year()) {
                insert_holiday(&mut map, *date, name);
            }
        }
        map
    }
}

/// Several calendars merged date by date.
#[derive(Default)]
pub struct LayeredCalendar {
    layers: Vec<Box<dyn HolidayCalendar + Send + Sync>>,
}

impl LayeredCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer<C>(mut self, calendar: C) -> Self
    where
        C: HolidayCalendar + Send + Sync + 'static,
    {
        self.layers.push(Box::new(calendar));
        self
    }
}

impl HolidayCalendar for LayeredCalendar {
    fn holidays(&self, years: RangeInclusive<i32>) -> HolidayMap {
        let mut merged = HolidayMap::new();
        for layer in &self.layers {
            for (date, names) in layer.holidays(years.clone()) {
                for name in names.split("; ") {
                    insert_holiday(&mut merged, date, name);
                }
            }
        }
        merged
    }
}

/// Builds the configured country/subdivision calendar plus any extra-holidays file.
pub fn calendar_from_config(config: &HolidayConfig) -> Result<LayeredCalendar, ServiceError> {
    if !config.country.eq_ignore_ascii_case("MY") {
        return Err(ServiceError::ConfigError(format!(
            "unsupported holiday country '{}'",
            config.country
        )));
    }

    let subdivision = Subdivision::from_str(&config.subdivision).map_err(|_| {
        ServiceError::ConfigError(format!(
            "unknown Malaysian subdivision '{}'",
            config.subdivision
        ))
    })?;

    let mut calendar = LayeredCalendar::new().with_layer(MalaysiaCalendar::new(subdivision));

    if let Some(path) = config.extra_holidays_file.as_ref() {
        let extra = load_extra_holidays(path)?;
        info!("Loaded {} extra holidays from {}", extra.len(), path.display());
        calendar = calendar.with_layer(extra);
    }

    Ok(calendar)
}

fn load_extra_holidays(path: &Path) -> Result<ExtraHolidays, ServiceError> {
    if !path.exists() {
        return Err(ServiceError::NotFound(format!(
            "extra holidays file {}",
            path.display()
        )));
    }
    ExtraHolidays::from_csv(path)
}
