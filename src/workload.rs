//! The units of work flowing through the pipeline, and the generator
//! that builds them.
//!
//! A [`WorkloadGenerator`] produces [`Request`]s with fully built HTTP
//! descriptors: read requests query the whole index, write requests
//! index a small random document. In mixed mode the kinds alternate
//! deterministically with the sequence index; in read-only mode every
//! request is a read.

use std::fmt;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use uuid::Uuid;

/// Filler vocabulary for generated write documents.
const LOREM_WORDS: &[&str] = &[
    "lorem",
    "ipsum",
    "dolor",
    "sit",
    "amet",
    "consectetur",
    "adipiscing",
    "elit",
    "sed",
    "eiusmod",
    "tempor",
    "incididunt",
    "labore",
    "dolore",
    "magna",
    "aliqua",
    "veniam",
    "nostrud",
    "exercitation",
    "ullamco",
    "laboris",
    "nisi",
    "aliquip",
    "commodo",
];

/// The two kinds of work issued against the target index.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum RequestKind {
    /// A search against the whole index.
    Read,
    /// Indexing a freshly generated document.
    Write,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestKind::Read => "read",
            RequestKind::Write => "write",
        })
    }
}

/// One unit of work: a kind plus the ready-to-send HTTP descriptor.
///
/// Requests are immutable once built. Each one is moved from the queue
/// into exactly one worker and consumed by executing it.
#[derive(Debug)]
pub struct Request {
    /// What this request does, for statistics bookkeeping.
    pub kind: RequestKind,
    /// The fully built HTTP request.
    pub descriptor: reqwest::Request,
}

/// The outcome of executing one [`Request`].
///
/// The descriptor is consumed by execution, so only the kind travels on
/// to the aggregator. A failed execution carries the failure detail;
/// timing is recorded either way and it is the aggregator's business to
/// ignore it for failures.
#[derive(Clone, Debug)]
pub struct Response {
    /// Kind of the request this response answers.
    pub kind: RequestKind,
    /// When the worker started the call.
    pub started_at: Instant,
    /// Wall-clock time of the call itself.
    pub elapsed: Duration,
    /// Failure detail, if the call did not complete.
    pub error: Option<String>,
}

impl Response {
    /// Whether the call completed at the transport level.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Builds the request sequence for one run.
#[derive(Debug)]
pub struct WorkloadGenerator {
    client: reqwest::Client,
    base_url: String,
    read_only: bool,
    rng: SmallRng,
}

impl WorkloadGenerator {
    /// Creates a generator targeting `base_url` with the given client.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, read_only: bool) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            read_only,
            rng: SmallRng::seed_from_u64(rand::random()),
        }
    }

    /// Builds the request for the given sequence index.
    ///
    /// Mixed mode alternates: even indices read, odd indices write.
    pub fn next_request(&mut self, sequence: u64) -> reqwest::Result<Request> {
        let kind = if self.read_only || sequence % 2 == 0 {
            RequestKind::Read
        } else {
            RequestKind::Write
        };

        let descriptor = match kind {
            RequestKind::Read => self
                .client
                .post(format!("{}/_search", self.base_url))
                .json(&json!({ "query": { "match_all": {} } }))
                .build()?,
            RequestKind::Write => {
                let document = json!({
                    "id": Uuid::new_v4().to_string(),
                    "message": self.paragraph(),
                });
                self.client
                    .post(format!("{}/test", self.base_url))
                    .json(&document)
                    .build()?
            }
        };

        Ok(Request { kind, descriptor })
    }

    /// A paragraph of 5-6 filler sentences for write documents.
    fn paragraph(&mut self) -> String {
        let sentences = self.rng.random_range(5..=6);
        let mut text = String::new();

        for sentence in 0..sentences {
            if sentence > 0 {
                text.push(' ');
            }
            let words = self.rng.random_range(6..=10);
            for word in 0..words {
                if word > 0 {
                    text.push(' ');
                }
                let pick = LOREM_WORDS[self.rng.random_range(0..LOREM_WORDS.len())];
                if word == 0 {
                    text.push_str(&pick[..1].to_ascii_uppercase());
                    text.push_str(&pick[1..]);
                } else {
                    text.push_str(pick);
                }
            }
            text.push('.');
        }

        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(read_only: bool) -> WorkloadGenerator {
        WorkloadGenerator::new(
            reqwest::Client::new(),
            "http://localhost:9200/test/",
            read_only,
        )
    }

    #[test]
    fn mixed_mode_alternates_kinds() {
        let mut workload = generator(false);
        let kinds: Vec<_> = (0..4)
            .map(|sequence| workload.next_request(sequence).unwrap().kind)
            .collect();

        assert_eq!(
            kinds,
            [
                RequestKind::Read,
                RequestKind::Write,
                RequestKind::Read,
                RequestKind::Write,
            ]
        );
    }

    #[test]
    fn read_only_mode_never_writes() {
        let mut workload = generator(true);
        for sequence in 0..4 {
            let request = workload.next_request(sequence).unwrap();
            assert_eq!(request.kind, RequestKind::Read);
        }
    }

    #[test]
    fn read_requests_target_the_search_endpoint() {
        let request = generator(true).next_request(0).unwrap();

        assert_eq!(request.descriptor.method(), &reqwest::Method::POST);
        assert_eq!(
            request.descriptor.url().as_str(),
            "http://localhost:9200/test/_search"
        );
        assert_eq!(
            request.descriptor.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn write_requests_carry_a_random_document() {
        let request = generator(false).next_request(1).unwrap();

        assert_eq!(
            request.descriptor.url().as_str(),
            "http://localhost:9200/test/test"
        );

        let body = request.descriptor.body().unwrap().as_bytes().unwrap();
        let document: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert!(document["id"].as_str().unwrap().parse::<Uuid>().is_ok());
        assert!(!document["message"].as_str().unwrap().is_empty());
    }

    #[test]
    fn paragraphs_are_sentence_like() {
        let mut workload = generator(false);
        let paragraph = workload.paragraph();

        let sentences = paragraph.matches('.').count();
        assert!((5..=6).contains(&sentences), "got {sentences} sentences");
        assert!(paragraph.starts_with(|c: char| c.is_ascii_uppercase()));
    }
}
