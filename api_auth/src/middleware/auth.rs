use std::{future::Future, pin::Pin, rc::Rc, sync::Arc};

use actix_web::{
    Error, HttpMessage, HttpResponse,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use common::{env_config::SessionConfig, jwt};
use futures::future::{Ready, ok};

/// Requires a valid `Authorization: Bearer <session token>` header.
/// On success the token's `SessionClaims` are inserted into the request extensions.
pub struct AuthMiddleware {
    session: Rc<SessionConfig>,
}

impl AuthMiddleware {
    pub fn new(session: SessionConfig) -> Self {
        AuthMiddleware {
            session: Rc::new(session),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Arc::new(service),
            session: self.session.clone(),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Arc<S>,
    session: Rc<SessionConfig>,
}

fn unauthorized(req: ServiceRequest, message: &str) -> ServiceResponse<actix_web::body::BoxBody> {
    let response = HttpResponse::Unauthorized()
        .json(serde_json::json!({ "error": message }))
        .map_into_boxed_body();
    req.into_response(response)
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|header| header.to_str().ok())
            .and_then(jwt::bearer_token)
            .map(str::to_string);

        let token = match token {
            Some(token) => token,
            None => {
                return Box::pin(async move {
                    Ok(unauthorized(req, "No authorization token provided"))
                });
            }
        };

        match jwt::validate_session_token(&token, &self.session) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let srv = Arc::clone(&self.service);
                Box::pin(async move { srv.call(req).await.map(|res| res.map_into_boxed_body()) })
            }
            Err(e) => {
                log::debug!("Rejected session token: {}", e);
                Box::pin(async move { Ok(unauthorized(req, "Invalid token")) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, HttpResponse, get, http::StatusCode, test, web};
    use common::jwt::SessionClaims;
    use jsonwebtoken::{EncodingKey, Header};
    use uuid::Uuid;

    use super::*;

    const SECRET: &str = "session-secret";

    fn session() -> SessionConfig {
        SessionConfig {
            secret: SECRET.to_string(),
            audience: None,
        }
    }

    fn token(user_id: Uuid, secret: &str) -> String {
        let exp = chrono::Utc::now().timestamp() as usize + 3600;
        jsonwebtoken::encode(
            &Header::default(),
            &SessionClaims { sub: user_id, exp },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[get("/me")]
    async fn me(claims: web::ReqData<SessionClaims>) -> HttpResponse {
        HttpResponse::Ok().body(claims.sub.to_string())
    }

    #[actix_web::test]
    async fn passes_claims_to_handler() {
        let app = test::init_service(
            App::new().service(web::scope("/secured").wrap(AuthMiddleware::new(session())).service(me)),
        )
        .await;
        let user_id = Uuid::new_v4();

        let req = test::TestRequest::get()
            .uri("/secured/me")
            .insert_header(("Authorization", format!("Bearer {}", token(user_id, SECRET))))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;

        assert_eq!(body, user_id.to_string().as_bytes());
    }

    #[actix_web::test]
    async fn rejects_missing_and_invalid_tokens() {
        let app = test::init_service(
            App::new().service(web::scope("/secured").wrap(AuthMiddleware::new(session())).service(me)),
        )
        .await;

        let missing = test::TestRequest::get().uri("/secured/me").to_request();
        assert_eq!(test::call_service(&app, missing).await.status(), StatusCode::UNAUTHORIZED);

        let forged = test::TestRequest::get()
            .uri("/secured/me")
            .insert_header((
                "Authorization",
                format!("Bearer {}", token(Uuid::new_v4(), "not-the-secret")),
            ))
            .to_request();
        assert_eq!(test::call_service(&app, forged).await.status(), StatusCode::UNAUTHORIZED);

        let wrong_scheme = test::TestRequest::get()
            .uri("/secured/me")
            .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
            .to_request();
        assert_eq!(
            test::call_service(&app, wrong_scheme).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
