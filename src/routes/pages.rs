// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Page shells: login and registration forms, and the dashboards behind the
//! access gate.

use axum::{response::Html, routing::get, Extension, Router};
use std::sync::Arc;

use crate::middleware::CurrentUser;
use crate::AppState;

/// Dashboard pages. All sit behind the same gate and differ only in title.
pub const PROTECTED_PAGES: &[(&str, &str)] = &[
    ("/", "Home"),
    ("/secrets", "Secrets"),
    ("/live-charts", "Live Charts"),
    ("/portfolio", "Portfolio"),
    ("/option-chain", "Option Chain"),
    ("/news", "News"),
    ("/screener", "Screener"),
    ("/learn", "Learning Center"),
];

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login_page))
        .route("/register", get(register_page))
}

/// Dashboard routes. The caller layers the session gate on top.
pub fn protected_routes() -> Router<Arc<AppState>> {
    PROTECTED_PAGES
        .iter()
        .fold(Router::new(), |router, &(path, title)| {
            router.route(
                path,
                get(move |Extension(CurrentUser(user)): Extension<CurrentUser>| async move {
                    dashboard_page(title, user.greeting_name())
                }),
            )
        })
}

pub(crate) fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{title} | Tradedesk</title></head><body>{body}</body></html>",
        title = escape_html(title),
        body = body,
    ))
}

fn dashboard_page(title: &str, greeting_name: &str) -> Html<String> {
    let nav: String = PROTECTED_PAGES
        .iter()
        .map(|(path, label)| format!("<a href=\"{}\">{}</a> ", path, label))
        .collect();

    layout(
        title,
        &format!(
            "<nav>{nav}<a href=\"/logout\">Log out</a></nav>\
             <h1>{title}</h1><p>Welcome, {name}</p>",
            nav = nav,
            title = escape_html(title),
            name = escape_html(greeting_name),
        ),
    )
}

async fn login_page() -> Html<String> {
    layout(
        "Log in",
        "<h1>Log in</h1>\
         <form method=\"post\" action=\"/login\">\
         <label>Email <input type=\"email\" name=\"username\" required></label>\
         <label>Password <input type=\"password\" name=\"password\" required></label>\
         <button type=\"submit\">Log in</button></form>\
         <p><a href=\"/auth/google\">Sign in with Google</a></p>\
         <p><a href=\"/register\">Create an account</a></p>",
    )
}

async fn register_page() -> Html<String> {
    layout(
        "Register",
        "<h1>Register</h1>\
         <form method=\"post\" action=\"/register\">\
         <label>Full name <input type=\"text\" name=\"fullName\"></label>\
         <label>Email <input type=\"email\" name=\"username\" required></label>\
         <label>Phone <input type=\"tel\" name=\"phoneNumber\"></label>\
         <label>Password <input type=\"password\" name=\"password\" required></label>\
         <button type=\"submit\">Register</button></form>\
         <p><a href=\"/auth/google\">Sign up with Google</a></p>\
         <p><a href=\"/login\">Already registered? Log in</a></p>",
    )
}
