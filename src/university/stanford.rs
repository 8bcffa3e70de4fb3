use super::University;
use crate::{to_records, utils, LinkParams, PageRequest, RawRecord, ScrapeError, SourceAdapter};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

const BASE_URL: &str = "https://explorecourses.stanford.edu/print";
const DEFAULT_QUERY: &str = "CS";
const TERMS: [&str; 4] = ["Autumn", "Winter", "Spring", "Summer"];

const E: &str = "Invalid selector";
lazy_static! {
    static ref RESULT: Selector = Selector::parse("div.searchResult").expect(E);
    static ref COURSE_INFO: Selector = Selector::parse("div.courseInfo").expect(E);
    static ref NUMBER: Selector = Selector::parse("span.courseNumber").expect(E);
    static ref TITLE: Selector = Selector::parse("span.courseTitle").expect(E);
    static ref DESCRIPTION: Selector = Selector::parse("div.courseDescription").expect(E);
    static ref ATTRIBUTES: Selector = Selector::parse("div.courseAttributes").expect(E);
    static ref A: Selector = Selector::parse("a").expect(E);
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StanfordCourse {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub terms: Vec<String>,
    pub units: Option<String>,
    pub instructors: Vec<String>,
}

/// Print view of the course search: one `searchResult` block per course.
#[derive(Debug)]
pub struct StanfordAdapter;

#[async_trait::async_trait]
impl SourceAdapter for StanfordAdapter {
    fn university(&self) -> University {
        University::Stanford
    }

    fn links(&self, params: &LinkParams) -> Vec<String> {
        let query = params
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(DEFAULT_QUERY);

        let mut terms: Vec<&str> = params
            .terms
            .iter()
            .filter_map(|p| TERMS.iter().copied().find(|t| p.trim().eq_ignore_ascii_case(t)))
            .collect();
        if terms.is_empty() {
            terms = TERMS.to_vec();
        }

        let mut query_params = vec![
            "filter-coursestatus-Active=on".to_string(),
            "descriptions=on".to_string(),
            format!("q={}", query),
        ];
        query_params.extend(terms.iter().map(|t| format!("filter-term-{}=on", t)));

        vec![format!("{}?{}", BASE_URL, query_params.join("&"))]
    }

    fn request(&self, url: &str) -> PageRequest {
        PageRequest::get(url).with_cookie("jsenabled=1")
    }

    fn parse(&self, html: &str) -> Result<Vec<RawRecord>, ScrapeError> {
        to_records(University::Stanford, extract(html))
    }
}

pub(crate) fn extract(html: &str) -> Vec<StanfordCourse> {
    let doc = Html::parse_document(html);
    doc.select(&RESULT).map(extract_course).collect()
}

fn first_text(scope: ElementRef, selector: &Selector) -> Option<String> {
    scope.select(selector).next().map(utils::stripped_text)
}

fn extract_course(result: ElementRef) -> StanfordCourse {
    let mut course = StanfordCourse::default();

    if let Some(info) = result.select(&COURSE_INFO).next() {
        course.id = first_text(info, &NUMBER).map(|n| n.trim_end_matches(':').to_string());
        course.title = first_text(info, &TITLE);
        course.description = first_text(info, &DESCRIPTION);
    }

    for attributes in result.select(&ATTRIBUTES) {
        let text = utils::joined_text(attributes, " ");

        if text.contains("Terms:") {
            for segment in text.split('|').map(str::trim) {
                if let Some(terms) = segment.strip_prefix("Terms:") {
                    course.terms = terms
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(ToString::to_string)
                        .collect();
                } else if let Some(units) = segment.strip_prefix("Units:") {
                    course.units = Some(units.trim().to_string());
                }
            }
        }

        if text.contains("Instructors:") {
            let raw = text.replace("Instructors:", "");
            let raw = raw.trim();
            let raw = raw.strip_prefix(';').map(str::trim).unwrap_or(raw);

            if !raw.is_empty() {
                let linked: Vec<String> = attributes.select(&A).map(utils::stripped_text).collect();
                course.instructors = if linked.is_empty() {
                    vec![raw.to_string()]
                } else {
                    linked
                };
            }
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
    fn test_parsing_search_result() {
        let html = fs::read_to_string("tests/htmls/stanford.html").expect("Invalid file url");
        let courses = extract(&html);
        assert_eq!(courses.len(), 1);

        let course = &courses[0];
        assert_eq!(course.id.as_deref(), Some("CS 7"));
        assert_eq!(course.title.as_deref(), Some("Personal Finance for Engineers"));
        assert_eq!(course.units.as_deref(), Some("1"));
        assert_eq!(course.terms, vec!["Aut".to_string()]);
        assert!(course
            .description
            .as_deref()
            .unwrap()
            .starts_with("Introduction to the fundamentals"));
        assert_eq!(course.instructors, vec!["Nash, A. (PI)".to_string()]);
    }

    #[test]
    fn missing_blocks_become_empty_fields() {
        let html = r#"
            <div class="searchResult">
                <div class="courseAttributes">Terms: Aut, Win, | Units: 3-5</div>
                <div class="courseAttributes">Instructors: ; Staff</div>
            </div>"#;

        let expected = StanfordCourse {
            terms: vec!["Aut".to_string(), "Win".to_string()],
            units: Some("3-5".to_string()),
            instructors: vec!["Staff".to_string()],
            ..StanfordCourse::default()
        };
        assert_eq!(extract(html), vec![expected]);
    }

    #[test]
    fn query_and_terms_shape_the_link() {
        let adapter = StanfordAdapter;

        let default = adapter.links(&LinkParams::default());
        assert_eq!(
            default,
            vec![concat!(
                "https://explorecourses.stanford.edu/print",
                "?filter-coursestatus-Active=on&descriptions=on&q=CS",
                "&filter-term-Autumn=on&filter-term-Winter=on",
                "&filter-term-Spring=on&filter-term-Summer=on",
            )]
        );

        let math = adapter.links(&LinkParams {
            query: Some("MATH".to_string()),
            terms: vec!["Winter".to_string()],
            ..LinkParams::default()
        });
        assert!(math[0].contains("q=MATH"));
        assert!(math[0].contains("filter-term-Winter=on"));
        assert!(!math[0].contains("filter-term-Autumn=on"));

        let unknown = adapter.links(&LinkParams {
            terms: vec!["Monsoon".to_string()],
            ..LinkParams::default()
        });
        assert_eq!(unknown, default);
    }

    #[test]
    fn terms_keep_the_requested_order() {
        let links = StanfordAdapter.links(&LinkParams {
            terms: vec!["spring".to_string(), "Monsoon".to_string(), "Autumn".to_string()],
            ..LinkParams::default()
        });
        assert!(links[0].ends_with("q=CS&filter-term-Spring=on&filter-term-Autumn=on"));
    }

    #[test]
    fn requests_carry_the_session_cookie() {
        let request = StanfordAdapter.request("https://explorecourses.stanford.edu/print");
        assert_eq!(request.cookie.as_deref(), Some("jsenabled=1"));
    }
}
