//! Applications: lookup, creation, update and their routes.

use cloudpush_protocol::types::{ApplicationEntity, RouteEntity};
use cloudpush_protocol::{Application, CreateApplicationRequest, Envelope, Outcome, Route};
use tracing::info;

use crate::client::{Client, segment};
use crate::error::CcError;

impl Client {
    /// `GET /v2/apps?q=name:..&q=space_guid:..`
    pub async fn get_applications_by_name_and_space(
        &self,
        name: &str,
        space_guid: &str,
    ) -> Outcome<Vec<Application>, CcError> {
        let name_q = format!("name:{name}");
        let space_q = format!("space_guid:{space_guid}");
        let query = [("q", name_q.as_str()), ("q", space_q.as_str())];
        self.get_all_pages::<ApplicationEntity>("/v2/apps", &query)
            .await
            .map(|envs| envs.into_iter().map(Application::from).collect())
    }

    /// Like [`get_applications_by_name_and_space`](Self::get_applications_by_name_and_space)
    /// but expects exactly one match; an empty result is
    /// [`CcError::ResourceNotFound`].
    pub async fn get_application_by_name_and_space(
        &self,
        name: &str,
        space_guid: &str,
    ) -> Outcome<Application, CcError> {
        let (value, warnings) = self
            .get_applications_by_name_and_space(name, space_guid)
            .await
            .into_parts();
        let app = value.and_then(|apps| {
            apps.into_iter().next().ok_or_else(|| {
                CcError::ResourceNotFound(format!("application {name:?} in space {space_guid}"))
            })
        });
        Outcome::new(app, warnings)
    }

    /// `POST /v2/apps`
    pub async fn create_application(&self, app: &Application) -> Outcome<Application, CcError> {
        let body = CreateApplicationRequest::from(app);
        let req = self.http().post(self.url("/v2/apps")).json(&body);
        let out = self
            .make::<Envelope<ApplicationEntity>>(req)
            .await
            .map(Application::from);
        if let Ok(created) = &out.value {
            info!(app_guid = %created.guid, name = %created.name, "application created");
        }
        out
    }

    /// `PUT /v2/apps/:guid`
    pub async fn update_application(&self, app: &Application) -> Outcome<Application, CcError> {
        let body = CreateApplicationRequest::from(app);
        let url = self.url(&format!("/v2/apps/{}", segment(&app.guid)));
        self.make::<Envelope<ApplicationEntity>>(self.http().put(url).json(&body))
            .await
            .map(Application::from)
    }

    /// `GET /v2/apps/:guid/routes`
    pub async fn get_application_routes(&self, app_guid: &str) -> Outcome<Vec<Route>, CcError> {
        let path = format!("/v2/apps/{}/routes", segment(app_guid));
        self.get_all_pages::<RouteEntity>(&path, &[])
            .await
            .map(|envs| envs.into_iter().map(Route::from).collect())
    }
}
