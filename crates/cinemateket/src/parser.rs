use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveTime};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::types::{Film, FilmLink, ListingPage, ScreeningRecord, Series};
use crate::utils::DateRange;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to parse date: {0}")]
    DateParse(String),
    #[error("Failed to parse time: {0}")]
    TimeParse(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Unexpected ticket row: {0}")]
    UnexpectedRow(String),
}

static RE_TICKET_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\b(?:mandag|tirsdag|onsdag|torsdag|fredag|lørdag|søndag|man|tir|ons|tor|fre|lør|søn)\.?\s+)?\b(\d{1,2})\.?\s+([a-zæøå]+)\.?\s+(\d{1,2})[:.](\d{2})\b(.*)$",
    )
    .expect("invalid regex: ticket row")
});
static RE_STATUS_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(event|udsolgt|bestil billet)\b").expect("invalid regex: status words")
});
static RE_EVENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bevent\b").expect("invalid regex: event"));
static RE_NEXT_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^næste\b").expect("invalid regex: next page"));
static RE_COUNTRY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-ZÆØÅ][A-Za-zæøåÆØÅ]+(?:[ /-][A-Za-zæøåÆØÅ]+)*,\s*(19|20)\d{2}")
        .expect("invalid regex: country year")
});

const CREDIT_MARKERS: [&str; 5] = [
    "Instruktør:",
    "Medvirkende:",
    "Original titel:",
    "Længde:",
    "Tilladt for",
];
const SKIPPED_LINES: [&str; 3] = ["Læs mere", "Bestil billet", "Se mere"];
const DESCRIPTION_STOP_MARKERS: [&str; 2] = ["køb billetter", "film i serien"];

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn spaced_text(element: ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_heading(element: &ElementRef) -> bool {
    matches!(element.value().name(), "h1" | "h2" | "h3")
}

pub(crate) fn resolve_href(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", base_url, href)
    } else if href.starts_with('?') {
        format!("{}{}{}", base_url, crate::ALL_FILMS_PATH, href)
    } else {
        format!("{}/{}", base_url, href)
    }
}

fn parse_month(month: &str) -> Result<u32, ParseError> {
    match month.to_lowercase().trim_end_matches('.') {
        "jan" | "januar" => Ok(1),
        "feb" | "februar" => Ok(2),
        "mar" | "marts" => Ok(3),
        "apr" | "april" => Ok(4),
        "maj" => Ok(5),
        "jun" | "juni" => Ok(6),
        "jul" | "juli" => Ok(7),
        "aug" | "august" => Ok(8),
        "sep" | "sept" | "september" => Ok(9),
        "okt" | "oktober" => Ok(10),
        "nov" | "november" => Ok(11),
        "dec" | "december" => Ok(12),
        _ => Err(ParseError::DateParse(format!("Unknown month: {}", month))),
    }
}

/// The site prints day and month only. Picks the earliest year that puts the
/// date inside `range`, otherwise the year that lands nearest to it.
pub(crate) fn resolve_year(range: DateRange, month: u32, day: u32) -> Option<NaiveDate> {
    (range.start().year() - 1..=range.end().year() + 1)
        .filter_map(|y| NaiveDate::from_ymd_opt(y, month, day))
        .min_by_key(|date| range.distance(*date))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TicketRow {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub venue: Option<String>,
    pub is_event: bool,
    pub sold_out: bool,
}

pub(crate) fn parse_ticket_row(text: &str, range: DateRange) -> Result<TicketRow, ParseError> {
    let cleaned = normalize_whitespace(text);
    let caps = RE_TICKET_ROW
        .captures(&cleaned)
        .ok_or_else(|| ParseError::UnexpectedRow(cleaned.clone()))?;

    let day: u32 = caps[1]
        .parse()
        .map_err(|_| ParseError::DateParse(format!("Invalid day: {}", &caps[1])))?;
    let month = parse_month(&caps[2])?;
    let date = resolve_year(range, month, day).ok_or_else(|| {
        ParseError::DateParse(format!("Invalid date: {}. {}", day, &caps[2]))
    })?;

    let hour: u32 = caps[3]
        .parse()
        .map_err(|_| ParseError::TimeParse(format!("Invalid hour: {}", &caps[3])))?;
    let minute: u32 = caps[4]
        .parse()
        .map_err(|_| ParseError::TimeParse(format!("Invalid minute: {}", &caps[4])))?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| ParseError::TimeParse(format!("Invalid time: {}:{}", hour, minute)))?;

    let tail = &caps[5];
    let venue = normalize_whitespace(&RE_STATUS_WORDS.replace_all(tail, " "))
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | '|' | '·' | ','))
        .to_string();

    Ok(TicketRow {
        date,
        time,
        venue: (!venue.is_empty()).then_some(venue),
        is_event: RE_EVENT.is_match(tail),
        sold_out: cleaned.to_lowercase().contains("udsolgt"),
    })
}

/// Parses one "Alle film" page. The page must have a `<main>` element; a
/// `<main>` without film links is a valid empty page.
pub fn parse_listing_page(html: &str, base_url: &str) -> Result<ListingPage, ParseError> {
    let document = Html::parse_document(html);

    let main_selector = Selector::parse("main").unwrap();
    if document.select(&main_selector).next().is_none() {
        return Err(ParseError::MissingField("listing container <main>".to_string()));
    }

    let anchor_selector = Selector::parse("a[href]").unwrap();
    let mut films: Vec<FilmLink> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut next_page = None;

    for anchor in document.select(&anchor_selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let text = normalize_whitespace(&elem_text(anchor));
        let path = href.strip_prefix(base_url).unwrap_or(href);

        if !path.starts_with(crate::FILM_PATH_PREFIX) {
            if next_page.is_none() && RE_NEXT_PAGE.is_match(&text) {
                next_page = Some(resolve_href(base_url, href));
            }
            continue;
        }

        let url = resolve_href(base_url, path);
        let title = text
            .split(" / ")
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        match positions.get(&url) {
            Some(&i) => {
                if films[i].title.is_empty() && !title.is_empty() {
                    films[i].title = title;
                }
            }
            None => {
                positions.insert(url.clone(), films.len());
                films.push(FilmLink { title, url });
            }
        }
    }

    log::debug!(
        "Parsed listing page: {} film(s), next page: {:?}",
        films.len(),
        next_page
    );

    Ok(ListingPage { films, next_page })
}

fn find_film_heading(headings: &[ElementRef]) -> Option<usize> {
    headings.iter().position(|h| {
        h.value().name() == "h3" && normalize_whitespace(&elem_text(*h)) == "Film"
    })
}

fn parse_title(headings: &[ElementRef], film_heading: Option<usize>) -> Option<String> {
    let after_film = film_heading.and_then(|i| {
        headings[i + 1..]
            .iter()
            .find(|h| h.value().name() == "h2")
            .map(|h| normalize_whitespace(&elem_text(*h)))
    });

    after_film.filter(|t| !t.is_empty()).or_else(|| {
        headings
            .iter()
            .filter(|h| h.value().name() == "h2")
            .map(|h| normalize_whitespace(&elem_text(*h)))
            .find(|t| !t.is_empty() && !t.contains("Cinemateket"))
    })
}

fn title_heading<'a>(
    headings: &[ElementRef<'a>],
    film_heading: Option<usize>,
    title: &str,
) -> Option<ElementRef<'a>> {
    film_heading
        .and_then(|i| headings[i + 1..].iter().find(|h| h.value().name() == "h2"))
        .or_else(|| {
            headings.iter().find(|h| {
                h.value().name() == "h2" && normalize_whitespace(&elem_text(**h)) == title
            })
        })
        .copied()
}

/// Splits the block after the title heading into description and credits.
fn parse_description(heading: Option<ElementRef>) -> (Option<String>, Option<String>) {
    let Some(heading) = heading else {
        return (None, None);
    };

    let mut description = Vec::new();
    let mut credits = Vec::new();
    let mut in_credits = false;

    for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
        if is_heading(&sibling) {
            break;
        }

        let line = spaced_text(sibling);
        if line.is_empty() || SKIPPED_LINES.contains(&line.as_str()) {
            continue;
        }
        if line == "* * *" {
            break;
        }
        let lower = line.to_lowercase();
        if DESCRIPTION_STOP_MARKERS.iter().any(|m| lower.contains(m)) {
            break;
        }

        if !in_credits
            && (CREDIT_MARKERS.iter().any(|m| line.starts_with(m))
                || RE_COUNTRY_YEAR.is_match(&line))
        {
            in_credits = true;
        }

        if in_credits {
            credits.push(line);
        } else {
            description.push(line);
        }
    }

    (
        (!description.is_empty()).then(|| description.join("\n\n")),
        (!credits.is_empty()).then(|| credits.join(", ")),
    )
}

fn parse_image(document: &Html, base_url: &str) -> Option<String> {
    let picture_selector = Selector::parse("img.picture__image[src]").unwrap();
    if let Some(src) = document
        .select(&picture_selector)
        .next()
        .and_then(|e| e.value().attr("src"))
    {
        return Some(resolve_href(base_url, src));
    }

    let ordered_selector = Selector::parse("h3, img[src]").unwrap();
    document
        .select(&ordered_selector)
        .skip_while(|e| {
            !(e.value().name() == "h3" && normalize_whitespace(&elem_text(*e)) == "Film")
        })
        .find(|e| e.value().name() == "img")
        .and_then(|e| e.value().attr("src"))
        .map(|src| resolve_href(base_url, src))
}

fn parse_series(document: &Html, base_url: &str) -> Option<Series> {
    let ordered_selector = Selector::parse("h2, h3, a[href]").unwrap();
    let mut after_heading = document
        .select(&ordered_selector)
        .skip_while(|e| !(e.value().name() == "h3" && elem_text(*e).contains("Film i serien")))
        .skip(1)
        .peekable();

    after_heading.peek()?;

    let mut title = None;
    let mut url = None;
    for element in after_heading {
        match element.value().name() {
            "h3" => break,
            "h2" if title.is_none() => title = Some(normalize_whitespace(&elem_text(element))),
            "a" if url.is_none() && elem_text(element).contains("Se alle") => {
                url = element
                    .value()
                    .attr("href")
                    .map(|href| resolve_href(base_url, href));
            }
            _ => {}
        }
        if title.is_some() && url.is_some() {
            break;
        }
    }

    title
        .filter(|t| !t.is_empty())
        .map(|title| Series { title, url })
}

fn ticket_anchors<'a>(document: &'a Html) -> Vec<ElementRef<'a>> {
    let h3_selector = Selector::parse("h3").unwrap();
    let anchor_selector = Selector::parse("a[href]").unwrap();

    let Some(buy_heading) = document
        .select(&h3_selector)
        .find(|h| elem_text(*h).contains("Køb billetter"))
    else {
        return Vec::new();
    };

    let mut anchors = Vec::new();
    for sibling in buy_heading.next_siblings().filter_map(ElementRef::wrap) {
        if sibling.value().name() == "h3" {
            break;
        }
        if sibling.value().name() == "a" && sibling.value().attr("href").is_some() {
            anchors.push(sibling);
        }
        anchors.extend(sibling.select(&anchor_selector));
    }

    anchors
        .into_iter()
        .filter(|a| {
            let text = elem_text(*a);
            text.contains("Bestil billet") || text.to_lowercase().contains("udsolgt")
        })
        .collect()
}

/// Parses a film page into a [`Film`] carrying every screening on the page.
/// `range` only settles the year of each row; filtering is left to the caller.
pub fn parse_film_page(
    html: &str,
    link: &FilmLink,
    base_url: &str,
    range: DateRange,
) -> Result<Film, ParseError> {
    let document = Html::parse_document(html);

    let heading_selector = Selector::parse("h2, h3").unwrap();
    let headings: Vec<ElementRef> = document.select(&heading_selector).collect();
    let film_heading = find_film_heading(&headings);

    let title = parse_title(&headings, film_heading)
        .or_else(|| (!link.title.is_empty()).then(|| link.title.clone()))
        .ok_or_else(|| ParseError::MissingField(format!("film title for {}", link.url)))?;

    let (description, metadata) =
        parse_description(title_heading(&headings, film_heading, &title));
    let image_url = parse_image(&document, base_url);
    let series = parse_series(&document, base_url);

    let screenings = ticket_anchors(&document)
        .into_iter()
        .map(|anchor| -> Result<ScreeningRecord, ParseError> {
            let row = parse_ticket_row(&spaced_text(anchor), range)?;
            Ok(ScreeningRecord {
                date: row.date,
                time: row.time,
                title: title.clone(),
                venue: row.venue,
                metadata: metadata.clone(),
                film_url: link.url.clone(),
                ticket_url: anchor
                    .value()
                    .attr("href")
                    .filter(|href| !href.is_empty() && *href != "#")
                    .map(|href| resolve_href(base_url, href)),
                is_event: row.is_event,
                sold_out: row.sold_out,
                series: series.clone(),
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    Ok(Film {
        title,
        url: link.url.clone(),
        description,
        metadata,
        image_url,
        series,
        screenings,
    })
}
