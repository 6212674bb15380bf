//! Server-rendered HTML pages.

use crate::domain::restaurant::{Restaurant, RestaurantParams};
use crate::domain::user::CreateUser;
use crate::domain::validation::ValidationErrors;
use crate::presentation::session::{Flash, FlashLevel, SIGN_IN_PATH};
use std::fmt::Write;

/// Per-request page furniture: who is signed in and any pending flash.
#[derive(Debug, Clone, Default)]
pub struct Chrome {
    pub user_email: Option<String>,
    pub flash: Option<Flash>,
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn link(href: &str, text: &str) -> String {
    format!(r#"<a href="{}">{}</a>"#, escape(href), escape(text))
}

/// A one-button form; `method` other than post is sent as `_method`.
fn button_to(action: &str, method: &str, text: &str) -> String {
    format!(
        r#"<form class="button_to" action="{}" method="post"><input type="hidden" name="_method" value="{}"><button type="submit">{}</button></form>"#,
        escape(action),
        escape(method),
        escape(text)
    )
}

fn nav(chrome: &Chrome) -> String {
    match &chrome.user_email {
        Some(email) => format!(
            r#"<nav><span class="current_user">Signed in as {}</span> {}</nav>"#,
            escape(email),
            button_to("/users/sign_out", "delete", "Sign out")
        ),
        None => format!(
            "<nav>{} {}</nav>",
            link(SIGN_IN_PATH, "Sign in"),
            link("/users/sign_up", "Sign up")
        ),
    }
}

fn flash(chrome: &Chrome) -> String {
    match &chrome.flash {
        Some(flash) => {
            let class = match flash.level {
                FlashLevel::Notice => "notice",
                FlashLevel::Alert => "alert",
            };
            format!(r#"<p class="{}">{}</p>"#, class, escape(&flash.message))
        }
        None => String::new(),
    }
}

pub fn layout(title: &str, chrome: &Chrome, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n{}\n<main>\n{}\n</main>\n</body>\n</html>\n",
        escape(title),
        nav(chrome),
        flash(chrome),
        body
    )
}

fn error_summary(errors: &ValidationErrors, model: &str) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let count = errors.len();
    let mut html = format!(
        r#"<div id="error_explanation"><h2>{} {} prohibited this {} from being saved:</h2><ul>"#,
        count,
        if count == 1 { "error" } else { "errors" },
        model
    );
    for message in errors.full_messages() {
        let _ = write!(html, "<li>{}</li>", escape(&message));
    }
    html.push_str("</ul></div>");
    html
}

pub fn restaurants_index(chrome: &Chrome, restaurants: &[Restaurant]) -> String {
    let mut body = String::from("<h1>Restaurants</h1>\n");
    if restaurants.is_empty() {
        body.push_str("<p>No restaurants yet</p>\n");
        body.push_str(&link("/restaurants/new", "Add a restaurant"));
    } else {
        body.push_str("<ul class=\"restaurants\">\n");
        for restaurant in restaurants {
            let path = format!("/restaurants/{}", restaurant.id);
            let _ = writeln!(
                body,
                "<li>{} {} {}</li>",
                link(&path, &restaurant.name),
                link(&format!("{}/edit", path), &format!("Edit {}", restaurant.name)),
                button_to(&path, "delete", &format!("Delete {}", restaurant.name))
            );
        }
        body.push_str("</ul>\n");
        body.push_str(&link("/restaurants/new", "New restaurant"));
    }
    layout("Restaurants", chrome, &body)
}

pub fn restaurant_show(chrome: &Chrome, restaurant: &Restaurant) -> String {
    let description = match &restaurant.description {
        Some(text) => format!(r#"<p class="description">{}</p>"#, escape(text)),
        None => r#"<p class="description empty">No description given.</p>"#.to_string(),
    };
    let body = format!(
        "<h1>{}</h1>\n{}\n{} {}",
        escape(&restaurant.name),
        description,
        link(
            &format!("/restaurants/{}/edit", restaurant.id),
            &format!("Edit {}", restaurant.name)
        ),
        link("/restaurants", "Back")
    );
    layout(&restaurant.name, chrome, &body)
}

/// New form when `id` is `None`, edit form otherwise.
pub fn restaurant_form(
    chrome: &Chrome,
    id: Option<u32>,
    params: &RestaurantParams,
    errors: &ValidationErrors,
) -> String {
    let (heading, action, method_field, submit) = match id {
        None => (
            "New restaurant".to_string(),
            "/restaurants".to_string(),
            String::new(),
            "Create Restaurant",
        ),
        Some(id) => (
            "Editing restaurant".to_string(),
            format!("/restaurants/{}", id),
            r#"<input type="hidden" name="_method" value="patch">"#.to_string(),
            "Update Restaurant",
        ),
    };

    let body = format!(
        r#"<h1>{heading}</h1>
{errors}
<form action="{action}" method="post">{method_field}
<label for="restaurant_name">Name</label>
<input type="text" id="restaurant_name" name="name" value="{name}">
<label for="restaurant_description">Description</label>
<textarea id="restaurant_description" name="description">{description}</textarea>
<button type="submit">{submit}</button>
</form>
{back}"#,
        heading = heading,
        errors = error_summary(errors, "restaurant"),
        action = escape(&action),
        method_field = method_field,
        name = escape(&params.name),
        description = escape(&params.description),
        submit = submit,
        back = link("/restaurants", "Back"),
    );
    layout(&heading, chrome, &body)
}

pub fn sign_in_form(chrome: &Chrome, email: &str) -> String {
    let body = format!(
        r#"<h1>Log in</h1>
<form action="{action}" method="post">
<label for="user_email">Email</label>
<input type="email" id="user_email" name="email" value="{email}">
<label for="user_password">Password</label>
<input type="password" id="user_password" name="password">
<button type="submit">Log in</button>
</form>
{sign_up}"#,
        action = SIGN_IN_PATH,
        email = escape(email),
        sign_up = link("/users/sign_up", "Sign up"),
    );
    layout("Log in", chrome, &body)
}

pub fn sign_up_form(chrome: &Chrome, form: &CreateUser, errors: &ValidationErrors) -> String {
    let body = format!(
        r#"<h1>Sign up</h1>
{errors}
<form action="/users" method="post">
<label for="user_email">Email</label>
<input type="email" id="user_email" name="email" value="{email}">
<label for="user_password">Password</label>
<input type="password" id="user_password" name="password">
<label for="user_password_confirmation">Password confirmation</label>
<input type="password" id="user_password_confirmation" name="password_confirmation">
<button type="submit">Sign up</button>
</form>
{sign_in}"#,
        errors = error_summary(errors, "user"),
        email = escape(&form.email),
        sign_in = link(SIGN_IN_PATH, "Log in"),
    );
    layout("Sign up", chrome, &body)
}

/// Bare page for error responses, which have no session context.
pub fn error_page(chrome: &Chrome, title: &str, message: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n{}",
        escape(title),
        escape(message),
        link("/restaurants", "Back to restaurants")
    );
    layout(title, chrome, &body)
}
