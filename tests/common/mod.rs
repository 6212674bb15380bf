//! A cookie-carrying "browser" for replaying user journeys against the app:
//! it follows redirects and finds links and buttons by their visible text.
#![allow(dead_code, unused_macros)]

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use restaurant_directory::infrastructure::config::SessionSettings;
use restaurant_directory::presentation::views::escape;

pub const COOKIE_NAME: &str = "test_session";

pub fn test_session_settings() -> SessionSettings {
    SessionSettings {
        secret: None,
        cookie_name: COOKIE_NAME.to_string(),
        cookie_secure: false,
    }
}

#[derive(Default)]
pub struct Browser {
    pub cookie: Option<Cookie<'static>>,
}

impl Browser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_cookies<'a>(&mut self, cookies: impl Iterator<Item = Cookie<'a>>) {
        for cookie in cookies {
            if cookie.name() == COOKIE_NAME {
                self.cookie = if cookie.value().is_empty() {
                    None
                } else {
                    Some(cookie.into_owned())
                };
            }
        }
    }
}

pub struct Response {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

/// Final page after following redirects.
pub struct Page {
    pub status: StatusCode,
    pub path: String,
    pub body: String,
}

/// A form found by the label of its submit button.
pub struct FormTarget {
    pub action: String,
    pub method: Option<String>,
}

fn unescape(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let needle = format!("{}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let end = tag[start..].find('"')? + start;
    Some(unescape(&tag[start..end]))
}

impl Page {
    /// Visible text: markup stripped, entities decoded.
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut in_tag = false;
        for c in self.body.chars() {
            match c {
                '<' => in_tag = true,
                '>' => {
                    in_tag = false;
                    out.push(' ');
                }
                _ if !in_tag => out.push(c),
                _ => {}
            }
        }
        unescape(&out)
    }

    pub fn has_content(&self, text: &str) -> bool {
        self.text().contains(text)
    }

    pub fn has_link(&self, text: &str) -> bool {
        self.link(text).is_some()
    }

    /// `href` of the anchor whose text is exactly `text`.
    pub fn link(&self, text: &str) -> Option<String> {
        let needle = format!("\">{}</a>", escape(text));
        let end = self.body.find(&needle)?;
        let start = self.body[..end].rfind("<a href=\"")? + "<a href=\"".len();
        Some(unescape(&self.body[start..end]))
    }

    pub fn has_field(&self, label: &str) -> bool {
        self.body.contains(&format!(">{}</label>", escape(label)))
    }

    pub fn form_for_button(&self, text: &str) -> Option<FormTarget> {
        let button = format!("<button type=\"submit\">{}</button>", escape(text));
        let end = self.body.find(&button)?;
        let start = self.body[..end].rfind("<form ")?;
        let form = &self.body[start..end];
        let tag_end = form.find('>')?;
        let action = attribute(&form[..tag_end], "action")?;
        let method = form
            .find("name=\"_method\"")
            .and_then(|pos| attribute(&form[pos..], "value"));
        Some(FormTarget { action, method })
    }
}

/// Builds the full application with fresh in-memory stores. Pass a session key
/// to share cookies between two apps.
macro_rules! test_app {
    () => {
        test_app!(actix_web::cookie::Key::generate())
    };
    ($key:expr) => {{
        use restaurant_directory::application::auth_service::AuthService;
        use restaurant_directory::application::restaurant_service::RestaurantService;
        use restaurant_directory::data::memory::InMemoryRestaurantRepository;
        use restaurant_directory::data::user_repository::InMemoryUserRepository;
        use restaurant_directory::infrastructure::security::{HashingParams, PasswordHashing};
        use restaurant_directory::presentation::handlers::{AppState, not_found};
        use restaurant_directory::presentation::middleware::RequestTrace;
        use restaurant_directory::presentation::routes::configure;
        use restaurant_directory::presentation::session::session_middleware;

        let hasher = PasswordHashing::new(HashingParams::minimal()).unwrap();
        let state = actix_web::web::Data::new(AppState {
            restaurants: RestaurantService::new(std::sync::Arc::new(
                InMemoryRestaurantRepository::new(),
            )),
            auth: AuthService::new(std::sync::Arc::new(InMemoryUserRepository::new()), hasher)
                .unwrap(),
        });

        let app = actix_web::test::init_service(
            actix_web::App::new()
                .app_data(state.clone())
                .wrap(session_middleware(
                    &$crate::common::test_session_settings(),
                    $key,
                ))
                .wrap(RequestTrace)
                .configure(configure)
                .default_service(actix_web::web::to(not_found)),
        )
        .await;

        (app, state)
    }};
}

/// One request, no redirect following. Carries and updates the session cookie.
macro_rules! send {
    ($app:expr, $browser:expr, $req:expr) => {{
        let mut req: actix_web::test::TestRequest = $req;
        if let Some(cookie) = $browser.cookie.clone() {
            req = req.cookie(cookie);
        }
        let resp = actix_web::test::call_service(&$app, req.to_request()).await;
        $browser.store_cookies(resp.response().cookies());
        let status = resp.status();
        let location = resp
            .headers()
            .get(actix_web::http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = actix_web::test::read_body(resp).await;
        $crate::common::Response {
            status,
            location,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }};
}

macro_rules! follow {
    ($app:expr, $browser:expr, $uri:expr, $req:expr) => {{
        let mut path: String = $uri.to_string();
        let mut response = send!($app, $browser, $req);
        let mut hops = 0;
        while response.status.is_redirection() {
            hops += 1;
            assert!(hops < 10, "too many redirects");
            path = response.location.clone().expect("redirect without location");
            response = send!(
                $app,
                $browser,
                actix_web::test::TestRequest::get().uri(&path)
            );
        }
        $crate::common::Page {
            status: response.status,
            path,
            body: response.body,
        }
    }};
}

macro_rules! visit {
    ($app:expr, $browser:expr, $uri:expr) => {
        follow!(
            $app,
            $browser,
            $uri,
            actix_web::test::TestRequest::get().uri($uri)
        )
    };
}

macro_rules! submit {
    ($app:expr, $browser:expr, $uri:expr, $form:expr) => {
        follow!(
            $app,
            $browser,
            $uri,
            actix_web::test::TestRequest::post().uri($uri).set_form($form)
        )
    };
}

/// Clicks the button labelled `$text` on `$page`, submitting its hidden fields.
macro_rules! click_button {
    ($app:expr, $browser:expr, $page:expr, $text:expr) => {{
        let target = $page
            .form_for_button($text)
            .unwrap_or_else(|| panic!("no button {:?}", $text));
        let mut fields: Vec<(&str, String)> = Vec::new();
        if let Some(method) = target.method.clone() {
            fields.push(("_method", method));
        }
        submit!($app, $browser, &target.action, &fields)
    }};
}

/// Follows the link labelled `$text` on `$page`.
macro_rules! click_link {
    ($app:expr, $browser:expr, $page:expr, $text:expr) => {{
        let href = $page
            .link($text)
            .unwrap_or_else(|| panic!("no link {:?}", $text));
        visit!($app, $browser, &href)
    }};
}

/// Signs in through the UI starting from the home page.
macro_rules! sign_in {
    ($app:expr, $browser:expr, $email:expr, $password:expr) => {{
        let home = visit!($app, $browser, "/");
        let form = click_link!($app, $browser, home, "Sign in");
        assert!(form.has_field("Email"));
        assert!(form.has_field("Password"));
        let target = form.form_for_button("Log in").expect("log in button");
        submit!(
            $app,
            $browser,
            &target.action,
            &[("email", $email), ("password", $password)]
        )
    }};
}
