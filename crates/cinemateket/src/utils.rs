use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;

use crate::scraper::ScraperError;
use crate::types::{
    Film, FilmProgramme, Programme, ScreeningKey, ScreeningRecord, SeriesProgramme,
};

pub const UNGROUPED_SERIES_TITLE: &str = "Øvrige film & events";

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ScraperError> {
        if start > end {
            return Err(ScraperError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Days between `date` and the nearest end of the range, zero inside it.
    pub fn distance(&self, date: NaiveDate) -> i64 {
        if date < self.start {
            (self.start - date).num_days()
        } else if date > self.end {
            (date - self.end).num_days()
        } else {
            0
        }
    }
}

/// Drops repeated `(date, time, title)` keys, keeping the first occurrence,
/// and orders the rest by date, time and title.
pub fn normalize_screenings(
    records: impl IntoIterator<Item = ScreeningRecord>,
) -> Vec<ScreeningRecord> {
    let mut unique: BTreeMap<ScreeningKey, ScreeningRecord> = BTreeMap::new();
    for record in records {
        unique.entry(record.key()).or_insert(record);
    }
    unique.into_values().collect()
}

pub fn assemble_programme(range: DateRange, films: Vec<Film>) -> Programme {
    let screenings = normalize_screenings(
        films
            .iter()
            .flat_map(|f| f.screenings.iter().cloned())
            .filter(|s| range.contains(s.date)),
    );

    let mut groups: Vec<SeriesProgramme> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for film in films {
        let film_screenings = normalize_screenings(
            film.screenings
                .into_iter()
                .filter(|s| range.contains(s.date)),
        );
        if film_screenings.is_empty() {
            continue;
        }

        let (key, title, url) = match film.series {
            Some(series) => (
                series.url.clone().unwrap_or_else(|| series.title.clone()),
                series.title,
                series.url,
            ),
            None => (
                UNGROUPED_SERIES_TITLE.to_string(),
                UNGROUPED_SERIES_TITLE.to_string(),
                None,
            ),
        };

        let index = *positions.entry(key).or_insert_with(|| {
            groups.push(SeriesProgramme {
                title,
                url,
                films: Vec::new(),
            });
            groups.len() - 1
        });

        groups[index].films.push(FilmProgramme {
            title: film.title,
            url: film.url,
            description: film.description,
            metadata: film.metadata,
            image_url: film.image_url,
            screenings: film_screenings,
        });
    }

    for group in &mut groups {
        group.films.sort_by_key(first_screening_of_film);
    }
    groups.sort_by_key(|g| g.films.first().and_then(first_screening_of_film));

    Programme {
        start: range.start(),
        end: range.end(),
        screenings,
        series: groups,
    }
}

fn first_screening_of_film(film: &FilmProgramme) -> Option<(NaiveDate, chrono::NaiveTime)> {
    film.screenings.first().map(|s| (s.date, s.time))
}

#[derive(Debug, PartialEq, Eq)]
pub struct ProgrammeStats {
    pub screenings: usize,
    pub films: usize,
    pub days: usize,
    pub events: usize,
    pub sold_out: usize,
}

impl ProgrammeStats {
    pub fn from_screenings(screenings: &[ScreeningRecord]) -> ProgrammeStats {
        ProgrammeStats {
            screenings: screenings.len(),
            films: screenings
                .iter()
                .map(|s| s.film_url.as_str())
                .collect::<HashSet<_>>()
                .len(),
            days: screenings
                .iter()
                .map(|s| s.date)
                .collect::<HashSet<_>>()
                .len(),
            events: screenings.iter().filter(|s| s.is_event).count(),
            sold_out: screenings.iter().filter(|s| s.sold_out).count(),
        }
    }
}

impl std::fmt::Display for ProgrammeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Screenings:   {}", self.screenings)?;
        writeln!(f, "  Films:        {}", self.films)?;
        writeln!(f, "  Days:         {}", self.days)?;
        writeln!(f, "  Events:       {}", self.events)?;
        writeln!(f, "  Sold out:     {}", self.sold_out)
    }
}
