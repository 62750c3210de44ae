use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use log::warn;
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::types::auth_types::AuthUser;

/// Admits admins by role, or any wallet on the `ADMIN_WALLETS` allow-list.
/// Must run after `AuthMiddleware`.
pub struct AdminMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AdminMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AdminMiddlewareService<S> {
    service: Rc<S>,
}

pub fn is_admin(user: &AuthUser, config: &AppConfig) -> bool {
    user.role.is_admin()
        || user
            .wallet_address
            .as_deref()
            .is_some_and(|wallet| config.is_admin_wallet(wallet))
}

impl<S, B> Service<ServiceRequest> for AdminMiddlewareService<S>
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
        let user = match req.extensions().get::<AuthUser>() {
            Some(user) => user.clone(),
            None => {
                return Box::pin(async {
                    Err(Error::from(ApiError::Unauthorized(
                        "Authentication required".into(),
                    )))
                });
            }
        };

        let allowed = req
            .app_data::<web::Data<AppConfig>>()
            .map(|config| is_admin(&user, config))
            .unwrap_or(false);

        if !allowed {
            warn!("Rejected admin request from user_id={}", user.user_id);
            return Box::pin(async {
                Err(Error::from(ApiError::Forbidden("Admin access required".into())))
            });
        }

        let service = self.service.clone();
        Box::pin(async move {
            let res = service.call(req).await?;
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::AuthMiddleware;
    use crate::utils::jwt::create_jwt;
    use actix_web::{http::StatusCode, test, App, HttpResponse};
    use settlement::UserRole;

    fn config() -> AppConfig {
        AppConfig::from_lookup(|name| match name {
            "DATABASE_URL" => Some("postgres://localhost/test".into()),
            "JWT_SECRET" => Some("test-secret".into()),
            "TREASURY_WALLET" => Some("Treasury".into()),
            "ADMIN_WALLETS" => Some("AllowListedWallet".into()),
            _ => None,
        })
        .unwrap()
    }

    fn token(role: UserRole, wallet: Option<&str>) -> String {
        let user = AuthUser {
            user_id: 9,
            role,
            wallet_address: wallet.map(String::from),
        };
        create_jwt(&user, "test-secret").unwrap()
    }

    async fn ping() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    async fn status_for(auth: Option<String>) -> StatusCode {
        let app = test::init_service(
            App::new().app_data(web::Data::new(config())).service(
                web::scope("/admin")
                    .wrap(AdminMiddleware)
                    .wrap(AuthMiddleware)
                    .route("/ping", web::get().to(ping)),
            ),
        )
        .await;
        let mut req = test::TestRequest::get().uri("/admin/ping");
        if let Some(value) = auth {
            req = req.insert_header(("Authorization", value));
        }
        match test::try_call_service(&app, req.to_request()).await {
            Ok(res) => res.status(),
            Err(e) => e.as_response_error().status_code(),
        }
    }

    #[actix_web::test]
    async fn test_missing_token() {
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_malformed_token() {
        assert_eq!(
            status_for(Some("Token abc".into())).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(Some("Bearer not.a.jwt".into())).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn test_regular_user_forbidden() {
        let auth = format!("Bearer {}", token(UserRole::User, Some("RandomWallet")));
        assert_eq!(status_for(Some(auth)).await, StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_admin_role_allowed() {
        let auth = format!("Bearer {}", token(UserRole::Admin, None));
        assert_eq!(status_for(Some(auth)).await, StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_allow_listed_wallet_allowed() {
        let auth = format!("Bearer {}", token(UserRole::User, Some("AllowListedWallet")));
        assert_eq!(status_for(Some(auth)).await, StatusCode::OK);
    }
}
