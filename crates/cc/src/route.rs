//! Domains, routes and route bindings.

use cloudpush_protocol::types::{DomainEntity, RouteEntity};
use cloudpush_protocol::{CreateRouteRequest, Domain, Envelope, Outcome, Route};
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::{Client, segment};
use crate::error::CcError;

#[derive(Debug, Deserialize)]
struct SpaceEntity {
    #[serde(default)]
    organization_guid: String,
}

impl Client {
    /// `GET /v2/shared_domains`
    pub async fn get_shared_domains(&self) -> Outcome<Vec<Domain>, CcError> {
        self.get_all_pages::<DomainEntity>("/v2/shared_domains", &[])
            .await
            .map(|envs| envs.into_iter().map(Domain::from).collect())
    }

    /// `GET /v2/organizations/:guid/private_domains`
    pub async fn get_organization_domains(&self, org_guid: &str) -> Outcome<Vec<Domain>, CcError> {
        let path = format!("/v2/organizations/{}/private_domains", segment(org_guid));
        self.get_all_pages::<DomainEntity>(&path, &[])
            .await
            .map(|envs| envs.into_iter().map(Domain::from).collect())
    }

    /// Organization owning a space, from `GET /v2/spaces/:guid`.
    pub async fn get_space_organization(&self, space_guid: &str) -> Outcome<String, CcError> {
        let url = self.url(&format!("/v2/spaces/{}", segment(space_guid)));
        self.make::<Envelope<SpaceEntity>>(self.http().get(url))
            .await
            .map(|env| env.entity.organization_guid)
    }

    /// Finds the route `host` under `domain_guid`; an empty result is
    /// [`CcError::ResourceNotFound`].
    pub async fn get_route_by_host_and_domain(
        &self,
        host: &str,
        domain_guid: &str,
    ) -> Outcome<Route, CcError> {
        let host_q = format!("host:{host}");
        let domain_q = format!("domain_guid:{domain_guid}");
        let query = [("q", host_q.as_str()), ("q", domain_q.as_str())];
        let (value, warnings) = self
            .get_all_pages::<RouteEntity>("/v2/routes", &query)
            .await
            .into_parts();
        let route = value.and_then(|envs| {
            envs.into_iter().next().map(Route::from).ok_or_else(|| {
                CcError::ResourceNotFound(format!("route {host:?} in domain {domain_guid}"))
            })
        });
        Outcome::new(route, warnings)
    }

    /// `POST /v2/routes`, optionally asking the control plane to pick a
    /// TCP port.
    pub async fn create_route(
        &self,
        route: &CreateRouteRequest,
        generate_port: bool,
    ) -> Outcome<Route, CcError> {
        let mut req = self.http().post(self.url("/v2/routes")).json(route);
        if generate_port {
            req = req.query(&[("generate_port", "true")]);
        }
        let out = self.make::<Envelope<RouteEntity>>(req).await.map(Route::from);
        if let Ok(created) = &out.value {
            info!(route_guid = %created.guid, host = %created.host, "route created");
        }
        out
    }

    /// `PUT /v2/routes/:route_guid/apps/:app_guid`
    pub async fn bind_route_to_application(
        &self,
        route_guid: &str,
        app_guid: &str,
    ) -> Outcome<(), CcError> {
        debug!(route_guid, app_guid, "binding route");
        let url = self.url(&format!(
            "/v2/routes/{}/apps/{}",
            segment(route_guid),
            segment(app_guid)
        ));
        self.make_empty(self.http().put(url)).await
    }

    /// Reports whether a route already exists anywhere on the platform.
    ///
    /// `GET /v2/routes/reserved/domain/:domain_guid/host/:host` answers
    /// 204 when it does and 404 when it does not.
    pub async fn check_route(&self, route: &Route) -> Outcome<bool, CcError> {
        let url = self.url(&format!(
            "/v2/routes/reserved/domain/{}/host/{}",
            segment(&route.domain_guid),
            segment(&route.host)
        ));
        let mut req = self.http().get(url);
        if !route.path.is_empty() {
            req = req.query(&[("path", route.path.as_str())]);
        }

        let (value, warnings) = self.make_empty(req).await.into_parts();
        let exists = match value {
            Ok(()) => Ok(true),
            Err(CcError::ResourceNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        };
        Outcome::new(exists, warnings)
    }
}
