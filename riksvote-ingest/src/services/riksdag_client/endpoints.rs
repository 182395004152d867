//! Upstream endpoint URLs
//!
//! - member roster: `/personlista/?utformat=json&rdlstatus=samtliga`
//! - document list: `/dokumentlista/?doktyp=…&rm=…&sz=…&p=…&utformat=json`
//! - ballot list: `/voteringlista/?rm=…&bet=…&sz=…&utformat=json`
//! - document detail: `/dokumentstatus/{id}.json`

use crate::services::fetch_client::{Collection, PagedRequest};
use reqwest::Url;
use riksvote_common::{Error, Result, Session};

/// `personlista.person`
pub const MEMBER_COLLECTION: Collection = Collection {
    items: &["personlista", "person"],
    next_page: Some(&["personlista", "@nasta_sida"]),
};

/// `dokumentlista.dokument`
pub const DOCUMENT_COLLECTION: Collection = Collection {
    items: &["dokumentlista", "dokument"],
    next_page: Some(&["dokumentlista", "@nasta_sida"]),
};

/// `voteringlista.votering`
pub const BALLOT_COLLECTION: Collection = Collection {
    items: &["voteringlista", "votering"],
    next_page: None,
};

/// Builds request URLs against a configurable base
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
    page_size: u32,
    ballot_page_cap: u32,
}

impl Endpoints {
    pub fn new(base_url: &str, page_size: u32, ballot_page_cap: u32) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid API base URL '{}': {}", base_url, e)))?;

        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(Error::Config(format!("API base URL must be http(s): {}", base_url)));
        }

        Ok(Self {
            base,
            page_size: page_size.max(1),
            ballot_page_cap: ballot_page_cap.max(1),
        })
    }

    /// Full member roster, including former members
    pub fn member_list(&self) -> Url {
        let mut url = self.path(&["personlista", ""]);
        url.query_pairs_mut()
            .append_pair("utformat", "json")
            .append_pair("rdlstatus", "samtliga");
        url
    }

    /// Paged document list for one kind and session, oldest first
    pub fn document_list(&self, kind: &str, session: &Session, start_page: u32) -> PagedRequest {
        let mut url = self.path(&["dokumentlista", ""]);
        url.query_pairs_mut()
            .append_pair("doktyp", kind)
            .append_pair("rm", &session.label())
            .append_pair("sz", &self.page_size.to_string())
            .append_pair("sort", "datum")
            .append_pair("sortorder", "asc")
            .append_pair("utformat", "json");

        PagedRequest {
            url,
            page_param: "p",
            collection: DOCUMENT_COLLECTION,
            start_page,
        }
    }

    /// All ballots for one report in one session
    pub fn ballot_list(&self, session: &Session, designation: &str) -> Url {
        let mut url = self.path(&["voteringlista", ""]);
        url.query_pairs_mut()
            .append_pair("rm", &session.label())
            .append_pair("bet", designation)
            .append_pair("punkt", "")
            .append_pair("gruppering", "")
            .append_pair("sz", &self.ballot_page_cap.to_string())
            .append_pair("utformat", "json");
        url
    }

    /// Detail record (references, decision points) for one document
    pub fn document_status(&self, document_id: &str) -> Url {
        let file = format!("{}.json", document_id);
        self.path(&["dokumentstatus", file.as_str()])
    }

    fn path(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base URLs are rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}
