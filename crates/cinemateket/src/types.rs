use std::fmt::Display;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Identity of a screening within one fetch.
pub type ScreeningKey = (NaiveDate, NaiveTime, String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Series {
    pub title: String,
    pub url: Option<String>,
}

/// A film entry found on an "Alle film" listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmLink {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub films: Vec<FilmLink>,
    pub next_page: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningRecord {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub title: String,
    pub venue: Option<String>,
    pub metadata: Option<String>,
    pub film_url: String,
    pub ticket_url: Option<String>,
    pub is_event: bool,
    pub sold_out: bool,
    pub series: Option<Series>,
}

impl ScreeningRecord {
    pub fn key(&self) -> ScreeningKey {
        (self.date, self.time, self.title.clone())
    }
}

impl Display for ScreeningRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} — {}",
            self.date,
            self.time.format("%H:%M"),
            self.title
        )?;
        if let Some(venue) = &self.venue {
            write!(f, " [{}]", venue)?;
        }
        if self.is_event {
            write!(f, " (event)")?;
        }
        if self.sold_out {
            write!(f, " (sold out)")?;
        }
        Ok(())
    }
}

/// A film page together with its screenings inside the requested range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Film {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub metadata: Option<String>,
    pub image_url: Option<String>,
    pub series: Option<Series>,
    pub screenings: Vec<ScreeningRecord>,
}

impl Display for Film {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "┌─ {}", self.title)?;
        if let Some(metadata) = &self.metadata {
            writeln!(f, "│  {}", metadata)?;
        }
        if let Some(series) = &self.series {
            writeln!(f, "│  Series: {}", series.title)?;
        }
        write!(f, "└─ {} screening(s)", self.screenings.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmProgramme {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub metadata: Option<String>,
    pub image_url: Option<String>,
    pub screenings: Vec<ScreeningRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesProgramme {
    pub title: String,
    pub url: Option<String>,
    pub films: Vec<FilmProgramme>,
}

impl Display for SeriesProgramme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "══ {}", self.title)?;
        for film in &self.films {
            writeln!(f, "  ▸ {}", film.title)?;
            if let Some(metadata) = &film.metadata {
                writeln!(f, "    {}", metadata)?;
            }
            for screening in &film.screenings {
                write!(
                    f,
                    "    {} {}",
                    screening.date.format("%d/%m"),
                    screening.time.format("%H:%M")
                )?;
                if let Some(venue) = &screening.venue {
                    write!(f, "  {}", venue)?;
                }
                if screening.sold_out {
                    write!(f, "  (sold out)")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// The full programme for a date range, both flat and grouped by series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Programme {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub screenings: Vec<ScreeningRecord>,
    pub series: Vec<SeriesProgramme>,
}

impl Display for Programme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Programme {} – {}", self.start, self.end)?;
        let mut current_day = None;
        for screening in &self.screenings {
            if current_day != Some(screening.date) {
                writeln!(f)?;
                writeln!(f, "{}", screening.date.format("%A %d %B %Y"))?;
                current_day = Some(screening.date);
            }
            write!(f, "  {}  {}", screening.time.format("%H:%M"), screening.title)?;
            if let Some(venue) = &screening.venue {
                write!(f, "  [{}]", venue)?;
            }
            if screening.is_event {
                write!(f, "  (event)")?;
            }
            if screening.sold_out {
                write!(f, "  (sold out)")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
