use super::University;
use crate::{to_records, utils, LinkParams, RawRecord, ScrapeError, SourceAdapter};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

const DEFAULT_PAGES: usize = 10;
const SEARCH_URL: &str = concat!(
    "https://classes.berkeley.edu/search/class",
    "?f%5B0%5D=subject_area:5582&f%5B1%5D=term:8573&f%5B2%5D=term:8576",
);

const E: &str = "Invalid selector";
lazy_static! {
    static ref ROW: Selector = Selector::parse("div.views-row").expect(E);
    static ref ARTICLE: Selector = Selector::parse("article.st").expect(E);
    static ref TITLE: Selector = Selector::parse("div.st--title").expect(E);
    static ref H2: Selector = Selector::parse("h2").expect(E);
    static ref SECTION_NAME: Selector = Selector::parse("span.st--section-name").expect(E);
    static ref SECTION_CODE: Selector = Selector::parse("span.st--section-code").expect(E);
    static ref SECTION_COUNT: Selector = Selector::parse("span.st--section-count").expect(E);
    static ref UNITS: Selector = Selector::parse("div.st--details-unit").expect(E);
    static ref DESCRIPTION: Selector = Selector::parse("div.st--description").expect(E);
    static ref MEETINGS: Selector = Selector::parse("div.st--meetings").expect(E);
    static ref DAYS: Selector = Selector::parse("div.st--meeting-days").expect(E);
    static ref TIME: Selector = Selector::parse("div.st--meeting-time").expect(E);
    static ref LOCATION: Selector = Selector::parse("div.st--location").expect(E);
    static ref SPAN: Selector = Selector::parse("span").expect(E);
    static ref A: Selector = Selector::parse("a").expect(E);
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UcbCourse {
    pub code: String,
    pub title: String,
    pub section: String,
    pub units: String,
    pub description: String,
    pub days: String,
    pub time: String,
    pub location: String,
}

/// Paginated class search: one `views-row` per class section.
#[derive(Debug)]
pub struct UcbAdapter;

#[async_trait::async_trait]
impl SourceAdapter for UcbAdapter {
    fn university(&self) -> University {
        University::Ucb
    }

    fn links(&self, params: &LinkParams) -> Vec<String> {
        let pages = params.pages.filter(|&p| p > 0).unwrap_or(DEFAULT_PAGES);
        (0..pages)
            .map(|page| format!("{}&page={}", SEARCH_URL, page))
            .collect()
    }

    fn parse(&self, html: &str) -> Result<Vec<RawRecord>, ScrapeError> {
        to_records(University::Ucb, extract(html))
    }
}

pub(crate) fn extract(html: &str) -> Vec<UcbCourse> {
    let doc = Html::parse_document(html);
    doc.select(&ROW)
        .filter_map(|row| row.select(&ARTICLE).next())
        .map(extract_course)
        .collect()
}

fn first_text(scope: ElementRef, selector: &Selector) -> String {
    scope
        .select(selector)
        .next()
        .map(utils::stripped_text)
        .unwrap_or_default()
}

/// Text of the second `span` in a meeting block; the first one is an icon.
fn labelled_value(meetings: ElementRef, selector: &Selector) -> String {
    meetings
        .select(selector)
        .next()
        .and_then(|block| block.select(&SPAN).nth(1))
        .map(utils::stripped_text)
        .unwrap_or_default()
}

fn extract_course(article: ElementRef) -> UcbCourse {
    let title = article
        .select(&TITLE)
        .next()
        .and_then(|t| t.select(&H2).next())
        .map(utils::stripped_text)
        .unwrap_or_default();

    // The count label appears twice before the resolved section number, so the last one wins.
    let section_code = first_text(article, &SECTION_CODE);
    let section_number = article
        .select(&SECTION_COUNT)
        .last()
        .map(utils::stripped_text)
        .unwrap_or_default();

    let units = first_text(article, &UNITS).replace("Units:", "").trim().to_string();

    let mut course = UcbCourse {
        code: first_text(article, &SECTION_NAME),
        title,
        section: format!("{} {}", section_code, section_number).trim().to_string(),
        units,
        description: first_text(article, &DESCRIPTION),
        ..UcbCourse::default()
    };

    if let Some(meetings) = article.select(&MEETINGS).next() {
        course.days = labelled_value(meetings, &DAYS);
        course.time = labelled_value(meetings, &TIME);
        if let Some(location) = meetings.select(&LOCATION).next() {
            course.location = match location.select(&A).next() {
                Some(link) => utils::stripped_text_without(link, "svg"),
                None => utils::stripped_text(location),
            };
        }
    }

    course
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn test_parsing_class_section() {
        let html = fs::read_to_string("tests/htmls/ucb.html").expect("Invalid file url");
        let courses = extract(&html);
        assert_eq!(courses.len(), 1);

        let course = &courses[0];
        assert!(course
            .description
            .starts_with("Logic, infinity, and induction"));

        let expected = UcbCourse {
            code: "COMPSCI 70".to_string(),
            title: "Discrete Mathematics and Probability Theory".to_string(),
            section: "LEC 120".to_string(),
            units: "4".to_string(),
            description: course.description.clone(),
            days: "We, Fr".to_string(),
            time: "03:00 pm  -  03:59 pm".to_string(),
            location: "Evans 35".to_string(),
        };
        assert_eq!(course, &expected);
    }

    #[test]
    fn last_section_count_wins() {
        let html = r#"
            <div class="views-row"><article class="st">
                <span class="st--section-count">001</span>
                <span class="st--section-code">DIS</span>
                <span class="st--section-count">104</span>
            </article></div>
            <div class="views-row"><p>no article here</p></div>"#;

        let courses = extract(html);
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].section, "DIS 104");
        assert_eq!(courses[0].location, "");
    }

    #[test]
    fn pages_parameter_controls_link_count() {
        let adapter = UcbAdapter;
        let default = adapter.links(&LinkParams::default());
        assert_eq!(default.len(), 10);
        assert!(default[0].ends_with("&page=0"));
        assert!(default[9].ends_with("&page=9"));

        let three = adapter.links(&LinkParams {
            pages: Some(3),
            ..LinkParams::default()
        });
        assert_eq!(three, default[..3].to_vec());

        let zero = adapter.links(&LinkParams {
            pages: Some(0),
            ..LinkParams::default()
        });
        assert_eq!(zero, default);
    }
}
