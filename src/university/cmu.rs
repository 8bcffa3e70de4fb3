use super::University;
use crate::{to_records, utils, LinkParams, PageRequest, RawRecord, ScrapeError, SourceAdapter};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::warn;

const SEARCH_URL: &str = "https://enr-apps.as.cmu.edu/open/SOC/SOCServlet/search";
const ALLOWED_DEPARTMENTS: [&str; 2] = ["ELECTRICAL & COMPUTER ENGINEERING", "COMPUTER SCIENCE"];
const MIN_COLUMNS: usize = 10;
const SEARCH_FORM: [(&str, &str); 10] = [
    ("SEMESTER", "S25"),
    ("MINI", "NO"),
    ("GRAD_UNDER", "All"),
    ("PRG_LOCATION", "All"),
    ("DEPT", "CS"),
    ("DEPT", "ECE"),
    ("BEG_TIME", "All"),
    ("KEYWORD", ""),
    ("TITLE_ONLY", "NO"),
    ("SUBMIT", "Retrieve Schedule"),
];

const E: &str = "Invalid selector";
lazy_static! {
    static ref TABLE: Selector = Selector::parse("table#search-results-table").expect(E);
    static ref TBODY: Selector = Selector::parse("tbody").expect(E);
    static ref TR: Selector = Selector::parse("tr").expect(E);
    static ref TD: Selector = Selector::parse("td").expect(E);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CmuMeeting {
    pub days: String,
    pub begin: String,
    pub end: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CmuSection {
    pub id: String,
    pub meetings: Vec<CmuMeeting>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CmuCourse {
    pub id: String,
    pub title: String,
    pub units: String,
    pub sections: Vec<CmuSection>,
}

/// Schedule of classes: one results table per department, rows grouped course > section > meeting.
#[derive(Debug)]
pub struct CmuAdapter;

#[async_trait::async_trait]
impl SourceAdapter for CmuAdapter {
    fn university(&self) -> University {
        University::Cmu
    }

    fn links(&self, _params: &LinkParams) -> Vec<String> {
        vec![SEARCH_URL.to_string()]
    }

    fn request(&self, url: &str) -> PageRequest {
        PageRequest::post(url, &SEARCH_FORM)
    }

    fn parse(&self, html: &str) -> Result<Vec<RawRecord>, ScrapeError> {
        to_records(University::Cmu, extract(html))
    }
}

fn department(table: ElementRef) -> Option<String> {
    table
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "h4" && utils::has_class(*el, "department-title"))
        .map(utils::stripped_text)
}

pub(crate) fn extract(html: &str) -> Vec<CmuCourse> {
    let doc = Html::parse_document(html);
    let mut courses = vec![];

    for table in doc.select(&TABLE) {
        match department(table) {
            Some(dept) if ALLOWED_DEPARTMENTS.contains(&dept.as_str()) => {}
            _ => continue,
        }
        let Some(tbody) = table.select(&TBODY).next() else {
            continue;
        };

        let mut current: Option<CmuCourse> = None;
        for tr in tbody.select(&TR) {
            let cols: Vec<String> = tr.select(&TD).map(utils::stripped_text).collect();
            if cols.len() < MIN_COLUMNS {
                continue;
            }

            let (id, section) = (&cols[0], &cols[3]);
            let meeting = CmuMeeting {
                days: cols[5].clone(),
                begin: cols[6].clone(),
                end: cols[7].clone(),
                location: cols[8].clone(),
            };

            if !id.is_empty() {
                courses.extend(current.take());
                current = Some(CmuCourse {
                    id: id.clone(),
                    title: cols[1].clone(),
                    units: cols[2].clone(),
                    sections: vec![],
                });
            }

            if !id.is_empty() || !section.is_empty() {
                if let Some(course) = current.as_mut() {
                    course.sections.push(CmuSection {
                        id: section.clone(),
                        meetings: vec![meeting],
                    });
                }
            } else {
                match current.as_mut().and_then(|c| c.sections.last_mut()) {
                    Some(open) => open.meetings.push(meeting),
                    None => warn!(
                        "[cmu] Dropping meeting row ({} {}-{}) with no open section",
                        meeting.days, meeting.begin, meeting.end
                    ),
                }
            }
        }
        courses.extend(current);
    }

    courses
}
