use crate::application::auth_service::AuthService;
use crate::application::restaurant_service::RestaurantService;
use crate::data::memory::InMemoryRestaurantRepository;
use crate::data::user_repository::InMemoryUserRepository;
use crate::domain::error::DomainError;
use crate::domain::restaurant::RestaurantParams;
use crate::domain::validation::ValidationErrors;
use crate::presentation::session::{CurrentUser, Flash, SIGN_IN_PATH, SessionContext};
use crate::presentation::views::{self, Chrome};
use actix_web::http::StatusCode;
use actix_web::http::header::{self, ContentType};
use actix_web::{HttpResponse, ResponseError, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

pub struct AppState {
    pub restaurants: RestaurantService<InMemoryRestaurantRepository>,
    pub auth: AuthService<InMemoryUserRepository>,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Sign in required")]
    SignInRequired,
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SignInRequired => StatusCode::FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_msg = self.to_string();

        match self {
            AppError::SignInRequired => {
                info!(status = %status, "Redirecting to sign in");
                return HttpResponse::Found()
                    .insert_header((header::LOCATION, SIGN_IN_PATH))
                    .finish();
            }
            AppError::Storage(_) | AppError::Internal(_) => {
                error!(error = %error_msg, status = %status, "Request failed")
            }
            _ => warn!(error = %error_msg, status = %status, "Request rejected"),
        }

        // Server-side details stay in the log.
        let (title, message) = match self {
            AppError::NotFound(msg) => ("Not found", msg.as_str()),
            AppError::Unauthorized(msg) => ("Unauthorized", msg.as_str()),
            AppError::BadRequest(msg) => ("Bad request", msg.as_str()),
            AppError::Validation(_) => ("Unprocessable", "The submitted data was invalid."),
            _ => ("Something went wrong", "Please try again later."),
        };

        HttpResponse::build(status)
            .content_type(ContentType::html())
            .body(views::error_page(&Chrome::default(), title, message))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::Validation(errors)) => AppError::Validation(errors.clone()),
            Some(DomainError::RestaurantNotFound(id)) => {
                AppError::NotFound(format!("Restaurant {} does not exist", id))
            }
            Some(DomainError::Unauthorized(msg)) => AppError::Unauthorized(msg.clone()),
            Some(DomainError::Internal(msg)) => AppError::Internal(msg.clone()),
            None => AppError::Storage(err.to_string()),
        }
    }
}

pub(crate) fn html(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type(ContentType::html())
        .body(body)
}

/// 303 so the browser follows with a GET whatever the form method was.
pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Consumes the pending flash and looks up who is signed in.
pub(crate) async fn chrome(state: &AppState, session: &SessionContext) -> Result<Chrome, AppError> {
    let user = session.current_user(state).await?;
    Ok(Chrome {
        user_email: user.map(|u| u.email),
        flash: session.take_flash(),
    })
}

/// Restaurant form body. HTML forms can only POST, so `_method` carries
/// the intended verb for updates and deletes.
#[derive(Debug, Deserialize)]
pub struct RestaurantSubmission {
    #[serde(rename = "_method", default)]
    pub method: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
}

#[instrument]
pub async fn health_check() -> HttpResponse {
    info!("Health check requested");
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[instrument(skip_all)]
pub async fn list_restaurants(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, AppError> {
    let restaurants = state.restaurants.list().await?;
    info!(count = restaurants.len(), "Listing restaurants");
    let chrome = chrome(&state, &session).await?;
    Ok(html(
        StatusCode::OK,
        views::restaurants_index(&chrome, &restaurants),
    ))
}

#[instrument(skip(state, session), fields(restaurant_id = %*path))]
pub async fn show_restaurant(
    state: web::Data<AppState>,
    session: SessionContext,
    path: web::Path<u32>,
) -> Result<HttpResponse, AppError> {
    let chrome = chrome(&state, &session).await?;
    match state.restaurants.get(path.into_inner()).await.map_err(AppError::from) {
        Ok(restaurant) => Ok(html(
            StatusCode::OK,
            views::restaurant_show(&chrome, &restaurant),
        )),
        Err(AppError::NotFound(msg)) => Ok(not_found_page(&chrome, &msg)),
        Err(e) => Err(e),
    }
}

#[instrument(skip_all, fields(user_id = %user.0.id))]
pub async fn new_restaurant(
    state: web::Data<AppState>,
    session: SessionContext,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let chrome = chrome(&state, &session).await?;
    Ok(html(
        StatusCode::OK,
        views::restaurant_form(
            &chrome,
            None,
            &RestaurantParams::default(),
            &ValidationErrors::new(),
        ),
    ))
}

#[instrument(skip_all, fields(user_id = %user.0.id, name = %form.name))]
pub async fn create_restaurant(
    state: web::Data<AppState>,
    session: SessionContext,
    user: CurrentUser,
    form: web::Form<RestaurantParams>,
) -> Result<HttpResponse, AppError> {
    let params = form.into_inner();
    match state.restaurants.create(params.clone()).await.map_err(AppError::from) {
        Ok(restaurant) => {
            info!(restaurant_id = restaurant.id, "Restaurant created via form");
            session.set_flash(Flash::notice("Restaurant created successfully"))?;
            Ok(redirect("/restaurants"))
        }
        Err(AppError::Validation(errors)) => {
            let chrome = chrome(&state, &session).await?;
            Ok(html(
                StatusCode::UNPROCESSABLE_ENTITY,
                views::restaurant_form(&chrome, None, &params, &errors),
            ))
        }
        Err(other) => Err(other),
    }
}

#[instrument(skip(state, session, _user), fields(restaurant_id = %*path))]
pub async fn edit_restaurant(
    state: web::Data<AppState>,
    session: SessionContext,
    _user: CurrentUser,
    path: web::Path<u32>,
) -> Result<HttpResponse, AppError> {
    let restaurant = state.restaurants.get(path.into_inner()).await?;
    let chrome = chrome(&state, &session).await?;
    Ok(html(
        StatusCode::OK,
        views::restaurant_form(
            &chrome,
            Some(restaurant.id),
            &RestaurantParams::from_restaurant(&restaurant),
            &ValidationErrors::new(),
        ),
    ))
}

async fn apply_update(
    state: &AppState,
    session: &SessionContext,
    id: u32,
    params: RestaurantParams,
) -> Result<HttpResponse, AppError> {
    match state.restaurants.update(id, params.clone()).await.map_err(AppError::from) {
        Ok(restaurant) => {
            info!(restaurant_id = restaurant.id, "Restaurant updated via form");
            session.set_flash(Flash::notice("Restaurant updated successfully"))?;
            Ok(redirect("/restaurants"))
        }
        Err(AppError::Validation(errors)) => {
            let chrome = chrome(state, session).await?;
            Ok(html(
                StatusCode::UNPROCESSABLE_ENTITY,
                views::restaurant_form(&chrome, Some(id), &params, &errors),
            ))
        }
        Err(other) => Err(other),
    }
}

async fn apply_delete(
    state: &AppState,
    session: &SessionContext,
    id: u32,
) -> Result<HttpResponse, AppError> {
    let removed = state.restaurants.delete(id).await?;
    info!(restaurant_id = removed.id, "Restaurant deleted via form");
    session.set_flash(Flash::notice("Restaurant deleted successfully"))?;
    Ok(redirect("/restaurants"))
}

#[instrument(skip(state, session, _user, form), fields(restaurant_id = %*path))]
pub async fn update_restaurant(
    state: web::Data<AppState>,
    session: SessionContext,
    _user: CurrentUser,
    path: web::Path<u32>,
    form: web::Form<RestaurantParams>,
) -> Result<HttpResponse, AppError> {
    apply_update(&state, &session, path.into_inner(), form.into_inner()).await
}

#[instrument(skip(state, session, _user), fields(restaurant_id = %*path))]
pub async fn delete_restaurant(
    state: web::Data<AppState>,
    session: SessionContext,
    _user: CurrentUser,
    path: web::Path<u32>,
) -> Result<HttpResponse, AppError> {
    apply_delete(&state, &session, path.into_inner()).await
}

/// `POST /restaurants/{id}` dispatching on the `_method` field.
#[instrument(skip(state, session, _user, form), fields(restaurant_id = %*path, method))]
pub async fn submit_restaurant(
    state: web::Data<AppState>,
    session: SessionContext,
    _user: CurrentUser,
    path: web::Path<u32>,
    form: web::Form<RestaurantSubmission>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let submission = form.into_inner();
    let method = submission
        .method
        .as_deref()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    tracing::Span::current().record("method", method.as_str());

    match method.as_str() {
        "patch" | "put" => {
            let params = RestaurantParams {
                name: submission.name,
                description: submission.description,
            };
            apply_update(&state, &session, id, params).await
        }
        "delete" => apply_delete(&state, &session, id).await,
        other => Err(AppError::BadRequest(format!(
            "Unsupported form method {:?}",
            other
        ))),
    }
}

/// 404 rendered inside the visitor's own navigation bar.
fn not_found_page(chrome: &Chrome, message: &str) -> HttpResponse {
    warn!(error = %message, status = %StatusCode::NOT_FOUND, "Request rejected");
    html(
        StatusCode::NOT_FOUND,
        views::error_page(chrome, "Not found", message),
    )
}

pub async fn not_found(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, AppError> {
    let chrome = chrome(&state, &session).await?;
    Ok(not_found_page(
        &chrome,
        "The page you were looking for doesn't exist.",
    ))
}
