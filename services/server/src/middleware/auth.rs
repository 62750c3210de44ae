use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::types::auth_types::AuthUser;
use crate::utils::jwt::verify_jwt;

/// Validates the bearer token and attaches the `AuthUser` to the request.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

fn authenticate(req: &ServiceRequest) -> Result<AuthUser, ApiError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

    let token_str = header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid Authorization header".into()))?;

    let token = token_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid token format".into()))?;

    let config = req
        .app_data::<web::Data<AppConfig>>()
        .ok_or_else(|| ApiError::Internal("JWT secret not configured".into()))?;

    verify_jwt(token, &config.jwt_secret)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let user = match authenticate(&req) {
            Ok(user) => user,
            Err(e) => return Box::pin(async move { Err(Error::from(e)) }),
        };

        req.extensions_mut().insert(user);

        let service = self.service.clone();
        Box::pin(async move {
            let res = service.call(req).await?;
            Ok(res)
        })
    }
}
