//! Riksdag open data API client
//!
//! Typed access to the four upstream feeds the pipeline consumes. Raw JSON
//! goes through the fetch client's list normalization and is decoded item by
//! item, so one malformed record never poisons its page.

mod endpoints;
mod records;

pub use endpoints::{Endpoints, BALLOT_COLLECTION, DOCUMENT_COLLECTION, MEMBER_COLLECTION};
pub use records::{
    normalize_date, BallotRecord, BallotRejection, CommitteeProposal, DocumentKind, DocumentRecord,
    DocumentStatus, DocumentStatusEnvelope, PersonRecord, Reference,
};

use crate::services::fetch_client::{decode_items, FetchClient, FetchError, Page};
use futures::Stream;
use riksvote_common::Session;

/// Records decoded from one response, plus how many items failed to decode
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub records: Vec<T>,
    pub malformed: usize,
}

/// Outcome of one document detail lookup
#[derive(Debug, Clone)]
pub enum StatusLookup {
    Found(Box<DocumentStatus>),
    NotFound,
    Malformed(String),
}

/// Riksdag API client
pub struct RiksdagClient {
    fetch: FetchClient,
    endpoints: Endpoints,
}

impl RiksdagClient {
    pub fn new(fetch: FetchClient, endpoints: Endpoints) -> Self {
        Self { fetch, endpoints }
    }

    /// Full member roster
    pub async fn fetch_members(&self) -> Result<Decoded<PersonRecord>, FetchError> {
        let items = self
            .fetch
            .fetch_linked(&self.endpoints.member_list(), &MEMBER_COLLECTION)
            .await?;
        let (records, malformed) = decode_items(items, "person");
        Ok(Decoded { records, malformed })
    }

    /// Pages of one document kind in one session, from `start_page` on
    pub fn document_pages(
        &self,
        kind: &DocumentKind,
        session: &Session,
        start_page: u32,
    ) -> impl Stream<Item = Result<Page, FetchError>> + '_ {
        self.fetch
            .paginate(self.endpoints.document_list(kind.code(), session, start_page))
    }

    /// Every ballot cast on one report
    pub async fn fetch_ballots(&self, session: &Session, designation: &str) -> Result<Decoded<BallotRecord>, FetchError> {
        let items = self
            .fetch
            .fetch_list(&self.endpoints.ballot_list(session, designation), &BALLOT_COLLECTION)
            .await?;
        let (records, malformed) = decode_items(items, "ballot");
        Ok(Decoded { records, malformed })
    }

    /// Detail record of one document
    ///
    /// A body that is not a `dokumentstatus` envelope is reported as
    /// [`StatusLookup::Malformed`]; transport and HTTP failures stay errors.
    pub async fn fetch_document_status(&self, document_id: &str) -> Result<StatusLookup, FetchError> {
        let Some(body) = self
            .fetch
            .fetch_json(&self.endpoints.document_status(document_id))
            .await?
        else {
            return Ok(StatusLookup::NotFound);
        };

        match serde_json::from_value::<DocumentStatusEnvelope>(body) {
            Ok(envelope) => Ok(StatusLookup::Found(Box::new(envelope.dokumentstatus))),
            Err(e) => Ok(StatusLookup::Malformed(e.to_string())),
        }
    }
}
