//! Application bits upload.

use cloudpush_protocol::{Job, Outcome, Resource, Warnings};
use cloudpush_transfer::{UploadBody, build_upload_body};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::client::{Client, segment};
use crate::error::CcError;

impl Client {
    /// Uploads the application bits with `PUT /v2/apps/:guid/bits?async=true`.
    ///
    /// `existing` lists the resources the control plane already holds
    /// (an empty slice means a full upload) and `content` streams the zip
    /// of everything else, `content_len` bytes long. The body is streamed
    /// with an exact `Content-Length`. Returns the job that assembles the
    /// package.
    ///
    /// If the archive cannot be read in full the upload fails with
    /// [`CcError::Encoding`], whatever the transport reported.
    pub async fn upload_application_package<R>(
        &self,
        app_guid: &str,
        existing: Option<&[Resource]>,
        content: Option<R>,
        content_len: u64,
    ) -> Outcome<Job, CcError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let UploadBody {
            content_type,
            size,
            stream,
            mut errors,
        } = match build_upload_body(existing, content, content_len) {
            Ok(body) => body,
            Err(e) => return Outcome::err(e.into(), Warnings::new()),
        };

        debug!(app_guid, size, "uploading application bits");

        let url = self.url(&format!("/v2/apps/{}/bits", segment(app_guid)));
        let req = self
            .http()
            .put(url)
            .query(&[("async", "true")])
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(stream)));

        let (value, warnings) = self.make_job(req).await.into_parts();

        if let Ok(e) = errors.try_recv() {
            warn!(app_guid, error = %e, "application bits could not be streamed");
            return Outcome::err(CcError::from(e), warnings);
        }

        Outcome::new(value, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::mock::{MockResponse, MockServer};
    use cloudpush_protocol::JobStatus;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    const QUEUED_JOB: &str =
        r#"{"metadata":{"guid":"job-up"},"entity":{"guid":"job-up","status":"queued"}}"#;

    fn client_for(url: &str) -> Client {
        Client::new(&ClientConfig::new(url, "token")).unwrap()
    }

    #[tokio::test]
    async fn streams_multipart_body_with_exact_length() {
        let server = MockServer::start(vec![
            MockResponse::json(201, QUEUED_JOB).warnings("bits+received"),
        ])
        .await;
        let client = client_for(&server.url);

        let kept = vec![Resource::new("Procfile", "abc", 13, 0o644)];
        let out = client
            .upload_application_package(
                "app-1",
                Some(&kept),
                Some(Cursor::new(b"PK-zip".to_vec())),
                6,
            )
            .await;

        assert_eq!(out.value.unwrap(), Job::new("job-up", JobStatus::Queued));
        assert_eq!(out.warnings.as_slice(), ["bits received"]);

        let req = &server.requests()[0];
        assert_eq!(req.method, "PUT");
        assert_eq!(req.target, "/v2/apps/app-1/bits?async=true");

        let content_type = req.header("content-type").unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        let declared: usize = req.header("content-length").unwrap().parse().unwrap();
        assert_eq!(declared, req.body.len());

        let body = String::from_utf8(req.body.clone()).unwrap();
        assert!(body.contains(r#"name="resources""#));
        assert!(body.contains(r#""path":"Procfile""#));
        assert!(body.contains(r#"filename="application.zip""#));
        assert!(body.contains("PK-zip"));
    }

    #[tokio::test]
    async fn nil_arguments_are_rejected_without_a_request() {
        let client = client_for("http://127.0.0.1:9");

        let out = client
            .upload_application_package("app-1", None, Some(Cursor::new(Vec::new())), 0)
            .await;
        assert!(matches!(
            out.value,
            Err(CcError::InvalidArgument("existing resources must not be nil"))
        ));
        assert!(out.warnings.is_empty());

        let out = client
            .upload_application_package::<Cursor<Vec<u8>>>("app-1", Some(&[]), None, 0)
            .await;
        assert!(matches!(
            out.value,
            Err(CcError::InvalidArgument("new resources must not be nil"))
        ));
    }

    /// Yields a few bytes, then fails.
    struct BrokenArchive {
        served: bool,
    }

    impl AsyncRead for BrokenArchive {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            if self.served {
                return Poll::Ready(Err(std::io::Error::other("archive vanished")));
            }
            self.served = true;
            buf.put_slice(b"PK");
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn unreadable_archive_surfaces_as_encoding_error() {
        let server = MockServer::start(vec![MockResponse::json(201, QUEUED_JOB)]).await;
        let client = client_for(&server.url);

        let out = client
            .upload_application_package(
                "app-1",
                Some(&[]),
                Some(BrokenArchive { served: false }),
                1024,
            )
            .await;

        match out.value {
            Err(CcError::Encoding(msg)) => assert!(msg.contains("archive vanished")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
