use crate::error::ServiceError;
use crate::user::Profile;
use actix_web::dev::{self, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web::Data, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture, Ready};
use sea_orm::{DatabaseConnection, DbErr};
use std::rc::Rc;

/// Longest user name accepted from the identity header.
const MAX_NAME_LENGTH: usize = 255;

/// Client data stored for a single request cycle.
/// Distinct from ClientCtx because it is defined through request data.
#[derive(Clone, Debug, Default)]
pub struct ClientCtxInner {
    /// User data. Optional. None is a guest user.
    pub client: Option<Profile>,
    /// Granted through `auth.admin_users` rather than the stored flag.
    pub configured_admin: bool,
    /// Set when the header named someone but the lookup failed.
    pub identity_error: Option<String>,
}

impl ClientCtxInner {
    /// Resolves the caller named by the identity header, if any.
    pub async fn from_request_header(req: &ServiceRequest, db: &DatabaseConnection) -> Self {
        let config = crate::app_config::get_config();
        let auth = &config.auth;

        let name = match req
            .headers()
            .get(auth.user_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
        {
            Some(name) if !name.is_empty() && name.len() <= MAX_NAME_LENGTH => name.to_owned(),
            Some(name) if !name.is_empty() => {
                log::warn!("Ignoring over-long identity header ({} bytes)", name.len());
                return Self::default();
            }
            _ => return Self::default(),
        };

        let profile = if auth.auto_provision {
            Profile::get_or_provision(db, &name).await.map(Some)
        } else {
            Profile::get_by_name(db, &name).await
        };

        match profile {
            Ok(client) => Self {
                configured_admin: config.is_configured_admin(&name),
                client,
                identity_error: None,
            },
            Err(e) => {
                log::error!("Unable to resolve user {}: {}", name, e);
                Self {
                    identity_error: Some(e.to_string()),
                    ..Self::default()
                }
            }
        }
    }
}

/// Client context passed to routes.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Debug)]
pub struct ClientCtx(Data<ClientCtxInner>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self(Data::new(ClientCtxInner::default()))
    }
}

impl ClientCtx {
    fn get_or_default_from_request(req: &HttpRequest) -> Self {
        match req.extensions().get::<Data<ClientCtxInner>>() {
            Some(cbox) => Self(cbox.clone()),
            None => Self::default(),
        }
    }

    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.0.client.as_ref().map(|u| u.id)
    }

    /// Returns either the user's name or the word for guest.
    pub fn get_name(&self) -> String {
        match &self.0.client {
            Some(user) => user.name.to_owned(),
            None => crate::constants::GUEST_USERNAME.to_owned(),
        }
    }

    pub fn is_admin(&self) -> bool {
        match &self.0.client {
            Some(user) => user.is_admin || self.0.configured_admin,
            None => false,
        }
    }

    /// Require user to be logged in. Returns user_id or Unauthorized.
    ///
    /// A caller whose identity could not be looked up is a server error, not
    /// a guest.
    pub fn require_login(&self) -> Result<i32, ServiceError> {
        if let Some(err) = &self.0.identity_error {
            return Err(ServiceError::Database(DbErr::Custom(format!(
                "Unable to resolve the current user: {}",
                err
            ))));
        }
        self.get_id().ok_or(ServiceError::Unauthorized)
    }

    /// Require admin rights. Returns user_id or Forbidden.
    pub fn require_admin(&self) -> Result<i32, ServiceError> {
        let user_id = self.require_login()?;
        if !self.is_admin() {
            return Err(ServiceError::Forbidden("Insufficient permissions".to_string()));
        }
        Ok(user_id)
    }
}

/// This implementation is what actually provides the `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(ClientCtx::get_or_default_from_request(req)))
    }
}

impl<S: 'static, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ClientCtxMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ClientCtxMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// Client context middleware
pub struct ClientCtxMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();

        Box::pin(async move {
            // Without a database there is no way to resolve anyone; serve as guest.
            if let Some(db) = req.app_data::<Data<DatabaseConnection>>().cloned() {
                let inner = ClientCtxInner::from_request_header(&req, &db).await;
                if let Some(user) = &inner.client {
                    log::debug!("Request from user {} ({})", user.name, user.id);
                }
                req.extensions_mut().insert(Data::new(inner));
            } else {
                log::error!("Database connection is not registered as app data");
            }

            svc.call(req).await
        })
    }
}
