use crate::domain::user::{CreateUser, LoginRequest};
use crate::domain::validation::ValidationErrors;
use crate::presentation::handlers::{AppError, AppState, chrome, html, redirect};
use crate::presentation::session::{Flash, SessionContext, safe_return_path};
use crate::presentation::views;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use tracing::{info, instrument, warn};

#[instrument(skip_all)]
pub async fn sign_in_form(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, AppError> {
    if session.current_user(&state).await?.is_some() {
        session.set_flash(Flash::alert("You are already signed in."))?;
        return Ok(redirect("/"));
    }
    let chrome = chrome(&state, &session).await?;
    Ok(html(StatusCode::OK, views::sign_in_form(&chrome, "")))
}

#[instrument(skip_all, fields(email = %form.email))]
pub async fn sign_in(
    state: web::Data<AppState>,
    session: SessionContext,
    form: web::Form<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    info!("Sign in request received");
    let request = form.into_inner();
    let email = request.email.clone();

    match state.auth.login(request).await.map_err(AppError::from) {
        Ok(user) => {
            let return_to = safe_return_path(session.take_return_to());
            session.sign_in(&user)?;
            session.set_flash(Flash::notice("Signed in successfully."))?;
            info!(user_id = %user.id, return_to = %return_to, "User signed in");
            Ok(redirect(&return_to))
        }
        Err(AppError::Unauthorized(message)) => {
            warn!("Sign in rejected");
            let mut chrome = chrome(&state, &session).await?;
            chrome.flash = Some(Flash::alert(message));
            Ok(html(
                StatusCode::UNAUTHORIZED,
                views::sign_in_form(&chrome, &email),
            ))
        }
        Err(other) => Err(other),
    }
}

#[instrument(skip_all)]
pub async fn sign_up_form(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, AppError> {
    if session.current_user(&state).await?.is_some() {
        session.set_flash(Flash::alert("You are already signed in."))?;
        return Ok(redirect("/"));
    }
    let chrome = chrome(&state, &session).await?;
    Ok(html(
        StatusCode::OK,
        views::sign_up_form(&chrome, &CreateUser::default(), &ValidationErrors::new()),
    ))
}

#[instrument(skip_all, fields(email = %form.email))]
pub async fn sign_up(
    state: web::Data<AppState>,
    session: SessionContext,
    form: web::Form<CreateUser>,
) -> Result<HttpResponse, AppError> {
    info!("Registration request received");
    let request = form.into_inner();
    let echoed = CreateUser {
        email: request.email.clone(),
        ..CreateUser::default()
    };

    match state.auth.register_user(request).await.map_err(AppError::from) {
        Ok(user) => {
            session.sign_in(&user)?;
            session.set_flash(Flash::notice("Welcome! You have signed up successfully."))?;
            info!(user_id = %user.id, "User signed up");
            Ok(redirect("/"))
        }
        Err(AppError::Validation(errors)) => {
            let chrome = chrome(&state, &session).await?;
            Ok(html(
                StatusCode::UNPROCESSABLE_ENTITY,
                views::sign_up_form(&chrome, &echoed, &errors),
            ))
        }
        Err(other) => Err(other),
    }
}

#[instrument(skip_all)]
pub async fn sign_out(session: SessionContext) -> Result<HttpResponse, AppError> {
    let user_id = session.user_id()?;
    session.sign_out();
    session.set_flash(Flash::notice("Signed out successfully."))?;
    info!(user_id = ?user_id, "User signed out");
    Ok(redirect("/"))
}
