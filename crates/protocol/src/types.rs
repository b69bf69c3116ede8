use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;

/// Desired run state of an application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationState {
    Started,
    #[default]
    Stopped,
}

/// Staging state of an application's package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PackageState {
    #[default]
    Pending,
    Staged,
    Failed,
}

/// An application as the Cloud Controller describes it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Envelope<ApplicationEntity>")]
pub struct Application {
    pub guid: String,
    pub name: String,
    pub space_guid: String,
    pub state: ApplicationState,
    pub package_state: PackageState,
    pub instances: u32,
    pub memory: u64,
    pub disk_quota: u64,
    pub buildpack: Option<String>,
    pub stack_guid: Option<String>,
}

/// Raw `entity` block of an application response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationEntity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub space_guid: String,
    #[serde(default)]
    pub state: ApplicationState,
    #[serde(default)]
    pub package_state: PackageState,
    #[serde(default)]
    pub instances: u32,
    #[serde(default)]
    pub memory: u64,
    #[serde(default)]
    pub disk_quota: u64,
    #[serde(default)]
    pub buildpack: Option<String>,
    #[serde(default)]
    pub stack_guid: Option<String>,
}

impl From<Envelope<ApplicationEntity>> for Application {
    fn from(env: Envelope<ApplicationEntity>) -> Self {
        let e = env.entity;
        Self {
            guid: env.metadata.guid,
            name: e.name,
            space_guid: e.space_guid,
            state: e.state,
            package_state: e.package_state,
            instances: e.instances,
            memory: e.memory,
            disk_quota: e.disk_quota,
            buildpack: e.buildpack,
            stack_guid: e.stack_guid,
        }
    }
}

/// Body of `POST /v2/apps` and `PUT /v2/apps/:guid`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateApplicationRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub space_guid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ApplicationState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buildpack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_guid: Option<String>,
}

impl From<&Application> for CreateApplicationRequest {
    fn from(app: &Application) -> Self {
        Self {
            name: app.name.clone(),
            space_guid: app.space_guid.clone(),
            state: Some(app.state),
            instances: (app.instances > 0).then_some(app.instances),
            memory: (app.memory > 0).then_some(app.memory),
            buildpack: app.buildpack.clone(),
            stack_guid: app.stack_guid.clone(),
        }
    }
}

/// A domain routes can be created under.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Envelope<DomainEntity>")]
pub struct Domain {
    pub guid: String,
    pub name: String,
    /// `false` for private domains owned by an organization.
    pub shared: bool,
}

/// Raw `entity` block of a domain response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomainEntity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owning_organization_guid: Option<String>,
}

impl From<Envelope<DomainEntity>> for Domain {
    fn from(env: Envelope<DomainEntity>) -> Self {
        Self {
            guid: env.metadata.guid,
            shared: env.entity.owning_organization_guid.is_none(),
            name: env.entity.name,
        }
    }
}

/// A route mapping `host.domain/path` to applications.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Envelope<RouteEntity>")]
pub struct Route {
    pub guid: String,
    pub host: String,
    pub domain_guid: String,
    pub path: String,
    pub port: Option<u16>,
    pub space_guid: String,
}

/// Raw `entity` block of a route response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteEntity {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub domain_guid: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub space_guid: String,
}

impl From<Envelope<RouteEntity>> for Route {
    fn from(env: Envelope<RouteEntity>) -> Self {
        let e = env.entity;
        Self {
            guid: env.metadata.guid,
            host: e.host,
            domain_guid: e.domain_guid,
            path: e.path,
            port: e.port,
            space_guid: e.space_guid,
        }
    }
}

impl Route {
    /// Human-readable form, e.g. `demo.example.com/api`.
    pub fn url(&self, domain_name: &str) -> String {
        let mut url = if self.host.is_empty() {
            domain_name.to_string()
        } else {
            format!("{}.{domain_name}", self.host)
        };
        if let Some(port) = self.port {
            url.push_str(&format!(":{port}"));
        }
        url.push_str(&self.path);
        url
    }
}

/// Body of `POST /v2/routes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateRouteRequest {
    pub domain_guid: String,
    pub space_guid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_from_envelope() {
        let json = r#"{
            "metadata": {"guid": "app-guid"},
            "entity": {
                "name": "demo",
                "space_guid": "space-1",
                "state": "STARTED",
                "package_state": "STAGED",
                "instances": 2,
                "memory": 256,
                "buildpack": null
            }
        }"#;
        let app: Application = serde_json::from_str(json).unwrap();
        assert_eq!(app.guid, "app-guid");
        assert_eq!(app.name, "demo");
        assert_eq!(app.state, ApplicationState::Started);
        assert_eq!(app.package_state, PackageState::Staged);
        assert_eq!(app.instances, 2);
        assert!(app.buildpack.is_none());
    }

    #[test]
    fn create_request_skips_empty_fields() {
        let req = CreateApplicationRequest {
            name: "demo".into(),
            space_guid: "space-1".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"name": "demo", "space_guid": "space-1"}));
    }

    #[test]
    fn domain_shared_flag() {
        let shared: Domain =
            serde_json::from_str(r#"{"metadata":{"guid":"d1"},"entity":{"name":"apps.io"}}"#)
                .unwrap();
        assert!(shared.shared);

        let private: Domain = serde_json::from_str(
            r#"{"metadata":{"guid":"d2"},"entity":{"name":"corp.io","owning_organization_guid":"org"}}"#,
        )
        .unwrap();
        assert!(!private.shared);
    }

    #[test]
    fn route_url_formats() {
        let route = Route {
            host: "demo".into(),
            path: "/api".into(),
            ..Default::default()
        };
        assert_eq!(route.url("apps.io"), "demo.apps.io/api");

        let tcp = Route {
            port: Some(1024),
            ..Default::default()
        };
        assert_eq!(tcp.url("tcp.apps.io"), "tcp.apps.io:1024");
    }

    #[test]
    fn route_from_envelope() {
        let json = r#"{
            "metadata": {"guid": "r1"},
            "entity": {"host": "demo", "domain_guid": "d1", "space_guid": "s1", "port": null}
        }"#;
        let route: Route = serde_json::from_str(json).unwrap();
        assert_eq!(route.guid, "r1");
        assert_eq!(route.host, "demo");
        assert_eq!(route.domain_guid, "d1");
        assert!(route.path.is_empty());
        assert!(route.port.is_none());
    }

    #[test]
    fn flat_shape_is_not_an_envelope() {
        let flat = r#"{"guid": "app-guid", "name": "demo", "space_guid": "s1"}"#;
        assert!(serde_json::from_str::<Application>(flat).is_err());
        assert!(serde_json::from_str::<Route>(r#"{"guid": "r1", "host": "demo"}"#).is_err());
    }
}
