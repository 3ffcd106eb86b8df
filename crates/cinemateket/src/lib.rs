mod parser;
pub mod scraper;
pub mod types;
pub mod utils;

pub use parser::ParseError;
pub use scraper::{FetcherConfig, ProgramFetcher, ScraperError};
pub use utils::DateRange;

pub const BASE_URL: &str = "https://www.dfi.dk";
pub(crate) const ALL_FILMS_PATH: &str = "/cinemateket/biograf/alle-film";
pub(crate) const FILM_PATH_PREFIX: &str = "/cinemateket/biograf/alle-film/film/";
