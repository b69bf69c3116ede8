//! [`PushActor`] over the Cloud Controller client.

use cloudpush_cc::{CcError, Client, JobSource};
use cloudpush_protocol::{
    Application, CreateRouteRequest, Domain, Job, Outcome, Resource, Route, Warnings,
};
use tracing::{debug, info};

use crate::actor::{BoxFuture, PushActor, UploadContent};
use crate::types::RouteHints;

/// Pushes through a live Cloud Controller.
#[derive(Clone)]
pub struct CcActor {
    client: Client,
}

impl CcActor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn resolve_route(
        &self,
        app: &Application,
        hints: &RouteHints,
    ) -> Outcome<Route, CcError> {
        let mut warnings = Warnings::new();
        let route = self.route_for(app, hints, &mut warnings).await;
        Outcome::new(route, warnings)
    }

    /// Reuses a route already bound to `app` when nothing specific was
    /// asked for. Otherwise finds or creates `host.domain` and binds it.
    async fn route_for(
        &self,
        app: &Application,
        hints: &RouteHints,
        warnings: &mut Warnings,
    ) -> Result<Route, CcError> {
        let bound = self
            .client
            .get_application_routes(&app.guid)
            .await
            .merge_into(warnings)?;

        if hints.is_empty() {
            if let Some(route) = bound.first() {
                debug!(app_guid = %app.guid, route_guid = %route.guid, "reusing bound route");
                return Ok(route.clone());
            }
        }

        let domain = self
            .pick_domain(&app.space_guid, hints.domain.as_deref(), warnings)
            .await?;
        let host = hints.host.clone().unwrap_or_else(|| app.name.clone());

        if let Some(route) = bound
            .into_iter()
            .find(|r| r.host == host && r.domain_guid == domain.guid)
        {
            debug!(app_guid = %app.guid, route_guid = %route.guid, "reusing bound route");
            return Ok(route);
        }

        let route = match self
            .client
            .get_route_by_host_and_domain(&host, &domain.guid)
            .await
            .merge_into(warnings)
        {
            Ok(route) => route,
            Err(CcError::ResourceNotFound(_)) => {
                let req = CreateRouteRequest {
                    domain_guid: domain.guid.clone(),
                    space_guid: app.space_guid.clone(),
                    host: host.clone(),
                    ..CreateRouteRequest::default()
                };
                self.client.create_route(&req, false).await.merge_into(warnings)?
            }
            Err(e) => return Err(e),
        };

        self.client
            .bind_route_to_application(&route.guid, &app.guid)
            .await
            .merge_into(warnings)?;

        info!(
            app_guid = %app.guid,
            route = %route.url(&domain.name),
            "route bound"
        );
        Ok(route)
    }

    /// The domain named `wanted`, or the first shared domain, or the first
    /// private domain of the space's organization.
    async fn pick_domain(
        &self,
        space_guid: &str,
        wanted: Option<&str>,
        warnings: &mut Warnings,
    ) -> Result<Domain, CcError> {
        let shared = self.client.get_shared_domains().await.merge_into(warnings)?;
        if let Some(domain) = select_domain(shared, wanted) {
            return Ok(domain);
        }

        let org_guid = self
            .client
            .get_space_organization(space_guid)
            .await
            .merge_into(warnings)?;
        let private = self
            .client
            .get_organization_domains(&org_guid)
            .await
            .merge_into(warnings)?;

        select_domain(private, wanted).ok_or_else(|| match wanted {
            Some(name) => CcError::ResourceNotFound(format!("domain {name:?}")),
            None => CcError::ResourceNotFound(format!("any domain for space {space_guid}")),
        })
    }
}

fn select_domain(domains: Vec<Domain>, wanted: Option<&str>) -> Option<Domain> {
    match wanted {
        Some(name) => domains.into_iter().find(|d| d.name == name),
        None => domains.into_iter().next(),
    }
}

impl JobSource for CcActor {
    fn fetch_job<'a>(&'a self, guid: &'a str) -> BoxFuture<'a, Outcome<Job, CcError>> {
        Box::pin(self.client.get_job(guid))
    }
}

impl PushActor for CcActor {
    fn get_application_by_name_and_space<'a>(
        &'a self,
        name: &'a str,
        space_guid: &'a str,
    ) -> BoxFuture<'a, Outcome<Application, CcError>> {
        Box::pin(self.client.get_application_by_name_and_space(name, space_guid))
    }

    fn create_application<'a>(
        &'a self,
        app: &'a Application,
    ) -> BoxFuture<'a, Outcome<Application, CcError>> {
        Box::pin(self.client.create_application(app))
    }

    fn ensure_route<'a>(
        &'a self,
        app: &'a Application,
        hints: &'a RouteHints,
    ) -> BoxFuture<'a, Outcome<Route, CcError>> {
        Box::pin(self.resolve_route(app, hints))
    }

    fn list_application_resources<'a>(
        &'a self,
        _app_guid: &'a str,
        candidates: &'a [Resource],
    ) -> BoxFuture<'a, Outcome<Vec<Resource>, CcError>> {
        Box::pin(self.client.resource_match(candidates))
    }

    fn submit_upload<'a>(
        &'a self,
        app_guid: &'a str,
        existing: &'a [Resource],
        content: UploadContent,
        len: u64,
    ) -> BoxFuture<'a, Outcome<Job, CcError>> {
        Box::pin(
            self.client
                .upload_application_package(app_guid, Some(existing), Some(content), len),
        )
    }
}
