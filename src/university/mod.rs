mod cmu;
mod mit;
mod stanford;
mod ucb;

pub use cmu::{CmuAdapter, CmuCourse, CmuMeeting, CmuSection};
pub use mit::{MitAdapter, MitCourse};
pub use stanford::{StanfordAdapter, StanfordCourse};
pub use ucb::{UcbAdapter, UcbCourse};

use crate::SourceAdapter;
use std::fmt;

/// Institutions with a catalog adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum University {
    Mit,
    Stanford,
    Ucb,
    Cmu,
}

impl University {
    pub const ALL: [University; 4] = [
        University::Mit,
        University::Stanford,
        University::Ucb,
        University::Cmu,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            University::Mit => "mit",
            University::Stanford => "stanford",
            University::Ucb => "ucb",
            University::Cmu => "cmu",
        }
    }

    pub fn adapter(&self) -> Box<dyn SourceAdapter> {
        match self {
            University::Mit => Box::new(MitAdapter),
            University::Stanford => Box::new(StanfordAdapter),
            University::Ucb => Box::new(UcbAdapter),
            University::Cmu => Box::new(CmuAdapter),
        }
    }
}

impl fmt::Display for University {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinkParams;
    use clap::ValueEnum;

    #[test]
    fn tokens_map_to_their_adapter() {
        for university in University::ALL {
            assert_eq!(
                University::from_str(university.token(), false),
                Ok(university)
            );
            assert_eq!(university.adapter().university(), university);
        }
        assert!(University::from_str("harvard", false).is_err());
    }

    #[test]
    fn every_adapter_has_stable_links() {
        for university in University::ALL {
            let adapter = university.adapter();
            let links = adapter.links(&LinkParams::default());
            assert!(!links.is_empty(), "{} has no links", university);
            assert_eq!(links, adapter.links(&LinkParams::default()));
        }
    }
}
