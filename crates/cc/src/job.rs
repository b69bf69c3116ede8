//! Asynchronous jobs: fetching, polling to completion and the
//! operations that start them.

use std::future::Future;
use std::pin::Pin;

use cloudpush_protocol::{Envelope, Job, JobEntity, Outcome, Warnings};
use reqwest::RequestBuilder;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::{Client, segment};
use crate::config::PollingConfig;
use crate::error::CcError;

/// Anything that can fetch the current state of a job.
///
/// Implemented by [`Client`]; tests substitute scripted sources.
pub trait JobSource: Send + Sync {
    fn fetch_job<'a>(
        &'a self,
        guid: &'a str,
    ) -> Pin<Box<dyn Future<Output = Outcome<Job, CcError>> + Send + 'a>>;
}

/// Polls a job until it reaches a terminal status, fails to fetch, runs
/// out of time or is cancelled.
#[derive(Debug, Clone, Copy)]
pub struct JobTracker {
    polling: PollingConfig,
}

impl JobTracker {
    pub fn new(polling: PollingConfig) -> Self {
        Self { polling }
    }

    /// Tracks `job` to completion.
    ///
    /// Warnings from every poll are returned in poll order, on success
    /// and on failure alike. `JobFailed` and `JobTimeout` name the guid
    /// the tracker was started with.
    pub async fn track(
        &self,
        source: &dyn JobSource,
        job: Job,
        cancel: &CancellationToken,
    ) -> Outcome<(), CcError> {
        let original_guid = job.guid.clone();
        let mut current_guid = job.guid;
        let mut warnings = Warnings::new();
        let start = Instant::now();

        while start.elapsed() < self.polling.timeout {
            if cancel.is_cancelled() {
                return Outcome::err(CcError::Cancelled, warnings);
            }

            let job = match source.fetch_job(&current_guid).await.merge_into(&mut warnings) {
                Ok(job) => job,
                Err(e) => return Outcome::err(e, warnings),
            };
            debug!(job_guid = %job.guid, status = %job.status, "polled job");

            if job.failed() {
                return Outcome::err(
                    CcError::JobFailed {
                        job_guid: original_guid,
                        message: job.error,
                    },
                    warnings,
                );
            }
            if job.finished() {
                info!(job_guid = %original_guid, "job finished");
                return Outcome::ok((), warnings);
            }

            if !job.guid.is_empty() {
                current_guid = job.guid;
            }

            tokio::select! {
                _ = cancel.cancelled() => return Outcome::err(CcError::Cancelled, warnings),
                _ = tokio::time::sleep(self.polling.interval) => {}
            }
        }

        Outcome::err(
            CcError::JobTimeout {
                job_guid: original_guid,
                timeout: self.polling.timeout,
            },
            warnings,
        )
    }
}

impl Client {
    /// Sends a request whose response body is a job.
    pub(crate) async fn make_job(&self, req: RequestBuilder) -> Outcome<Job, CcError> {
        let (value, warnings) = self.make::<Envelope<JobEntity>>(req).await.into_parts();
        let job = value.and_then(|env| Job::try_from(env).map_err(CcError::from));
        Outcome::new(job, warnings)
    }

    /// `GET /v2/jobs/:guid`
    pub async fn get_job(&self, guid: &str) -> Outcome<Job, CcError> {
        let url = self.url(&format!("/v2/jobs/{}", segment(guid)));
        self.make_job(self.http().get(url)).await
    }

    /// Polls `job` with this client's polling configuration.
    pub async fn poll_job(&self, job: Job, cancel: &CancellationToken) -> Outcome<(), CcError> {
        JobTracker::new(self.polling()).track(self, job, cancel).await
    }

    /// Deletes an organization and everything in it. Returns the deletion
    /// job.
    pub async fn delete_organization(&self, org_guid: &str) -> Outcome<Job, CcError> {
        let url = self.url(&format!("/v2/organizations/{}", segment(org_guid)));
        let req = self
            .http()
            .delete(url)
            .query(&[("recursive", "true"), ("async", "true")]);
        self.make_job(req).await
    }
}

impl JobSource for Client {
    fn fetch_job<'a>(
        &'a self,
        guid: &'a str,
    ) -> Pin<Box<dyn Future<Output = Outcome<Job, CcError>> + Send + 'a>> {
        Box::pin(self.get_job(guid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::mock::{MockResponse, MockServer};
    use cloudpush_protocol::JobStatus;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted poll results; reports `running` once exhausted.
    struct ScriptedJobs {
        script: Mutex<VecDeque<Outcome<Job, CcError>>>,
        polled: Mutex<Vec<String>>,
    }

    impl ScriptedJobs {
        fn new(script: Vec<Outcome<Job, CcError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                polled: Mutex::new(Vec::new()),
            }
        }

        fn polled(&self) -> Vec<String> {
            self.polled.lock().unwrap().clone()
        }
    }

    impl JobSource for ScriptedJobs {
        fn fetch_job<'a>(
            &'a self,
            guid: &'a str,
        ) -> Pin<Box<dyn Future<Output = Outcome<Job, CcError>> + Send + 'a>> {
            self.polled.lock().unwrap().push(guid.to_string());
            let next = self.script.lock().unwrap().pop_front().unwrap_or_else(|| {
                Outcome::ok(Job::new(guid, JobStatus::Running), Warnings::new())
            });
            Box::pin(async move { next })
        }
    }

    fn polled_ok(job: Job, warning: &str) -> Outcome<Job, CcError> {
        Outcome::ok(job, std::iter::once(warning).collect())
    }

    fn tracker() -> JobTracker {
        JobTracker::new(PollingConfig {
            interval: Duration::from_millis(10),
            timeout: Duration::from_millis(100),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn finishes_after_queued_and_running() {
        let source = ScriptedJobs::new(vec![
            polled_ok(Job::new("job-1", JobStatus::Queued), "w1"),
            polled_ok(Job::new("job-1", JobStatus::Running), "w2"),
            polled_ok(Job::new("job-1", JobStatus::Finished), "w3"),
        ]);

        let out = tracker()
            .track(&source, Job::new("job-1", JobStatus::Queued), &CancellationToken::new())
            .await;

        assert!(out.value.is_ok());
        assert_eq!(out.warnings.as_slice(), ["w1", "w2", "w3"]);
        assert_eq!(source.polled().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_names_original_guid() {
        let source = ScriptedJobs::new(vec![
            polled_ok(Job::new("job-2", JobStatus::Running), "w1"),
            polled_ok(Job::failed_with("job-2", "staging exploded"), "w2"),
        ]);

        let out = tracker()
            .track(&source, Job::new("job-1", JobStatus::Queued), &CancellationToken::new())
            .await;

        match out.value {
            Err(CcError::JobFailed { job_guid, message }) => {
                assert_eq!(job_guid, "job-1");
                assert_eq!(message, "staging exploded");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(out.warnings.as_slice(), ["w1", "w2"]);
        // The second poll follows the guid returned by the first.
        assert_eq!(source.polled(), ["job-1", "job-2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_while_running() {
        let source = ScriptedJobs::new(Vec::new());

        let out = tracker()
            .track(&source, Job::new("job-1", JobStatus::Queued), &CancellationToken::new())
            .await;

        match out.value {
            Err(CcError::JobTimeout { job_guid, timeout }) => {
                assert_eq!(job_guid, "job-1");
                assert_eq!(timeout, Duration::from_millis(100));
            }
            other => panic!("unexpected: {other:?}"),
        }
        // One poll per interval inside the budget.
        let polls = source.polled().len();
        assert!((9..=11).contains(&polls), "polled {polls} times");
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_returns_immediately_with_warnings() {
        let source = ScriptedJobs::new(vec![
            polled_ok(Job::new("job-1", JobStatus::Running), "w1"),
            Outcome::err(
                CcError::ResourceNotFound("job gone".into()),
                std::iter::once("w2").collect(),
            ),
        ]);

        let out = tracker()
            .track(&source, Job::new("job-1", JobStatus::Queued), &CancellationToken::new())
            .await;

        assert!(matches!(out.value, Err(CcError::ResourceNotFound(_))));
        assert_eq!(out.warnings.as_slice(), ["w1", "w2"]);
        assert_eq!(source.polled().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_first_poll() {
        let source = ScriptedJobs::new(Vec::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let out = tracker()
            .track(&source, Job::new("job-1", JobStatus::Queued), &cancel)
            .await;

        assert!(matches!(out.value, Err(CcError::Cancelled)));
        assert!(source.polled().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_sleep() {
        let source =
            ScriptedJobs::new(vec![polled_ok(Job::new("job-1", JobStatus::Running), "w1")]);
        let cancel = CancellationToken::new();
        let slow = JobTracker::new(PollingConfig {
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(600),
        });

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let out = slow
            .track(&source, Job::new("job-1", JobStatus::Queued), &cancel)
            .await;

        assert!(matches!(out.value, Err(CcError::Cancelled)));
        assert_eq!(out.warnings.as_slice(), ["w1"]);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    fn http_client(url: &str) -> Client {
        let mut config = ClientConfig::new(url, "token");
        config.polling = PollingConfig {
            interval: Duration::from_millis(1),
            timeout: Duration::from_secs(10),
        };
        Client::new(&config).unwrap()
    }

    #[tokio::test]
    async fn get_job_decodes_envelope() {
        let server = MockServer::start(vec![MockResponse::json(
            200,
            r#"{"metadata":{"guid":"job-9"},"entity":{"guid":"job-9","status":"failed","error":"quota"}}"#,
        )
        .warnings("slow+down")])
        .await;
        let client = http_client(&server.url);

        let out = client.get_job("job-9").await;
        let job = out.value.unwrap();
        assert!(job.failed());
        assert_eq!(job.error, "quota");
        assert_eq!(out.warnings.as_slice(), ["slow down"]);
        assert_eq!(server.requests()[0].target, "/v2/jobs/job-9");
    }

    #[tokio::test]
    async fn unknown_status_is_rejected_with_warnings() {
        let server = MockServer::start(vec![MockResponse::json(
            200,
            r#"{"metadata":{"guid":"job-9"},"entity":{"guid":"job-9","status":"paused"}}"#,
        )
        .warnings("odd")])
        .await;
        let client = http_client(&server.url);

        let out = client.get_job("job-9").await;
        assert!(matches!(out.value, Err(CcError::UnknownJobStatus(ref s)) if s.0 == "paused"));
        assert_eq!(out.warnings.as_slice(), ["odd"]);
    }

    #[tokio::test]
    async fn delete_organization_is_recursive_and_async() {
        let server = MockServer::start(vec![MockResponse::json(
            202,
            r#"{"metadata":{"guid":"job-del"},"entity":{"guid":"job-del","status":"queued"}}"#,
        )])
        .await;
        let client = http_client(&server.url);

        let job = client.delete_organization("org-1").await.value.unwrap();
        assert_eq!(job, Job::new("job-del", JobStatus::Queued));

        let req = &server.requests()[0];
        assert_eq!(req.method, "DELETE");
        assert_eq!(req.target, "/v2/organizations/org-1?recursive=true&async=true");
    }

    #[tokio::test]
    async fn poll_job_over_http() {
        let server = MockServer::start(vec![
            MockResponse::json(
                200,
                r#"{"metadata":{"guid":"job-1"},"entity":{"guid":"job-1","status":"running"}}"#,
            )
            .warnings("one"),
            MockResponse::json(
                200,
                r#"{"metadata":{"guid":"job-1"},"entity":{"guid":"job-1","status":"finished"}}"#,
            )
            .warnings("two"),
        ])
        .await;
        let client = http_client(&server.url);

        let out = client
            .poll_job(Job::new("job-1", JobStatus::Queued), &CancellationToken::new())
            .await;
        assert!(out.value.is_ok());
        assert_eq!(out.warnings.as_slice(), ["one", "two"]);
        assert_eq!(server.requests().len(), 2);
    }
}
