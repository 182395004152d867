//! Upstream JSON fixtures
//!
//! Shapes follow the live API: list fields are arrays or, for a single
//! item, a bare object; numbers are strings.

use serde_json::{json, Value};

pub fn person(id: &str, first: &str, last: &str, party: &str) -> Value {
    json!({
        "intressent_id": id,
        "tilltalsnamn": first,
        "efternamn": last,
        "parti": party,
        "valkrets": "Stockholms kommun",
        "fodd_ar": "1975",
        "kon": "kvinna",
        "status": "Tjänstgörande riksdagsledamot",
        "bild_url_192": format!("https://data.riksdagen.se/filarkiv/bilder/ledamot/{}_192.jpg", id)
    })
}

pub fn member_roster(people: Vec<Value>) -> Value {
    json!({"personlista": {"@hitlista": "true", "person": people}})
}

pub fn report_doc(id: &str, designation: &str) -> Value {
    json!({
        "dok_id": id,
        "rm": "2023/24",
        "beteckning": designation,
        "doktyp": "bet",
        "subtyp": "bet",
        "organ": "",
        "titel": format!("Betänkande {}", designation),
        "undertitel": "",
        "datum": "2024-03-01 00:00:00",
        "beslutsdag": "2024-03-20"
    })
}

pub fn motion_doc(id: &str, designation: &str) -> Value {
    json!({
        "dok_id": id,
        "rm": "2023/24",
        "beteckning": designation,
        "doktyp": "mot",
        "subtyp": "Partimotion",
        "organ": "AU",
        "titel": format!("Motion {}", designation),
        "undertitel": "av Anna Andersson m.fl. (S)",
        "datum": "2023-10-05 00:00:00"
    })
}

/// One page of a document list; the collection is a bare object for one item
pub fn document_page(docs: Vec<Value>) -> Value {
    let hits = docs.len().to_string();
    let collection = match docs.len() {
        1 => docs.into_iter().next().unwrap_or(Value::Null),
        _ => Value::Array(docs),
    };
    json!({"dokumentlista": {"@traffar": hits, "dokument": collection}})
}

/// Page past the end of a document list
pub fn empty_document_page() -> Value {
    json!({"dokumentlista": {"@traffar": "0", "@sidor": "0"}})
}

pub fn ballot(event: &str, member: &str, party: &str, choice: &str) -> Value {
    ballot_of_kind(event, member, party, choice, "sakfrågan", "huvud")
}

pub fn ballot_of_kind(event: &str, member: &str, party: &str, choice: &str, avser: &str, votering: &str) -> Value {
    json!({
        "votering_id": event,
        "intressent_id": member,
        "parti": party,
        "rost": choice,
        "avser": avser,
        "votering": votering,
        "punkt": "1",
        "beteckning": "AU10",
        "datum": "2024-03-20 15:04:05"
    })
}

pub fn ballot_list(ballots: Vec<Value>) -> Value {
    json!({"voteringlista": {"@antal": ballots.len().to_string(), "votering": ballots}})
}

pub fn decision_point(point: &str, label: &str, voting_event_id: &str) -> Value {
    json!({
        "punkt": point,
        "rubrik": label,
        "forslag": format!("Riksdagen bifaller punkt {}.", point),
        "beslutstyp": "röstning",
        "votering_id": voting_event_id
    })
}

pub fn reference(ref_dok_id: &str) -> Value {
    json!({
        "referenstyp": "behandlas_i",
        "ref_dok_id": ref_dok_id,
        "ref_dok_typ": "bet"
    })
}

pub fn document_status(points: Vec<Value>, references: Vec<Value>) -> Value {
    json!({
        "dokumentstatus": {
            "dokument": {"dok_id": "x"},
            "dokutskottsforslag": {"utskottsforslag": points},
            "dokreferens": {"referens": references}
        }
    })
}
