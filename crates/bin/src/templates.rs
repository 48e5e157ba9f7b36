//! HTML pages for the demo server
//!
//! Inline templates, no template engine.

use crate::output::UserRow;

const STYLES: &str = r#"
    body {
        font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Arial, sans-serif;
        max-width: 800px;
        margin: 40px auto;
        padding: 0 20px;
        background: #f5f5f5;
    }
    .container {
        background: white;
        padding: 30px;
        border-radius: 8px;
        box-shadow: 0 2px 4px rgba(0,0,0,0.1);
    }
    h1 {
        color: #333;
        border-bottom: 2px solid #2f7d4f;
        padding-bottom: 10px;
    }
    .form-group { margin: 15px 0; }
    label { display: block; font-weight: bold; margin-bottom: 5px; }
    input[type="text"], input[type="password"], input[type="email"] {
        width: 100%;
        padding: 10px;
        border: 1px solid #ddd;
        border-radius: 4px;
        box-sizing: border-box;
    }
    button {
        background: #2f7d4f;
        color: white;
        padding: 8px 16px;
        border: none;
        border-radius: 4px;
        cursor: pointer;
    }
    table { width: 100%; border-collapse: collapse; margin: 20px 0; }
    th, td { text-align: left; padding: 10px; border-bottom: 1px solid #ddd; }
    th { background: #f0f0f0; }
    .error { color: #a94442; background: #f2dede; padding: 10px; border-radius: 4px; }
    .notice { background: #dff0d8; padding: 10px; border-radius: 4px; }
    .code { font-family: monospace; background: #f5f5f5; padding: 2px 6px; }
"#;

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Tollgate - {title}</title>
    <style>{STYLES}</style>
</head>
<body>
    <div class="container">
        <h1>Tollgate</h1>
        {body}
    </div>
</body>
</html>"#,
        title = html_escape(title),
    )
}

fn error_box(error: Option<&str>) -> String {
    error.map_or(String::new(), |e| {
        format!(r#"<div class="error">{}</div>"#, html_escape(e))
    })
}

/// Landing page; links depend on whether someone is logged in.
pub fn home_page(username: Option<&str>) -> String {
    let body = match username {
        Some(name) => format!(
            r#"<p>Logged in as <b>{}</b>.</p>
        <p><a href="/data">Your data</a> · <a href="/admin">Admin</a> · <a href="/logout">Log out</a></p>"#,
            html_escape(name)
        ),
        None => r#"<p>Not logged in.</p>
        <p><a href="/login">Log in</a> · <a href="/register">Register</a></p>"#
            .to_string(),
    };
    page("Home", &body)
}

pub fn login_page(error: Option<&str>) -> String {
    let body = format!(
        r#"<h2>Login</h2>
        {}
        <form method="POST" action="/login">
            <div class="form-group">
                <label for="username">Username:</label>
                <input type="text" id="username" name="username" required autofocus>
            </div>
            <div class="form-group">
                <label for="password">Password:</label>
                <input type="password" id="password" name="password" required>
            </div>
            <button type="submit">Login</button>
        </form>
        <p>No account? <a href="/register">Register here</a></p>"#,
        error_box(error)
    );
    page("Login", &body)
}

pub fn register_page(error: Option<&str>) -> String {
    let body = format!(
        r#"<h2>Register</h2>
        {}
        <form method="POST" action="/register">
            <div class="form-group">
                <label for="username">Username:</label>
                <input type="text" id="username" name="username" required autofocus>
                <small>Letters, digits, underscore and æøå</small>
            </div>
            <div class="form-group">
                <label for="password">Password:</label>
                <input type="password" id="password" name="password" required>
            </div>
            <div class="form-group">
                <label for="email">E-mail:</label>
                <input type="email" id="email" name="email" required>
            </div>
            <button type="submit">Create account</button>
        </form>"#,
        error_box(error)
    );
    page("Register", &body)
}

/// Shown after registering. There is no mail delivery, so the link is printed.
pub fn registered_page(username: &str, code: &str) -> String {
    let body = format!(
        r#"<div class="notice">Account <b>{}</b> created.</div>
        <p>Confirm it by visiting <a class="code" href="/confirm/{code}">/confirm/{code}</a>.</p>"#,
        html_escape(username),
        code = html_escape(code),
    );
    page("Registered", &body)
}

pub fn confirmed_page(username: &str) -> String {
    let body = format!(
        r#"<div class="notice">Account <b>{}</b> confirmed.</div>
        <p><a href="/login">Log in</a></p>"#,
        html_escape(username)
    );
    page("Confirmed", &body)
}

pub fn data_page(username: &str, email: &str, confirmed: bool) -> String {
    let status = if confirmed {
        "confirmed"
    } else {
        "awaiting confirmation"
    };
    let body = format!(
        r#"<h2>Your data</h2>
        <table>
            <tr><th>Username</th><td>{}</td></tr>
            <tr><th>E-mail</th><td>{}</td></tr>
            <tr><th>Status</th><td>{status}</td></tr>
        </table>
        <p><a href="/">Home</a> · <a href="/logout">Log out</a></p>"#,
        html_escape(username),
        html_escape(email),
    );
    page("Data", &body)
}

pub fn admin_page(users: &[UserRow]) -> String {
    let rows: String = users
        .iter()
        .map(|user| {
            let promote = if user.admin {
                String::new()
            } else {
                format!(
                    r#"<form method="POST" action="/admin/promote" style="margin:0">
                        <input type="hidden" name="username" value="{}">
                        <button type="submit">Make admin</button>
                    </form>"#,
                    html_escape(&user.username)
                )
            };
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{promote}</td></tr>\n",
                html_escape(&user.username),
                html_escape(&user.email),
                user.confirmed,
                user.admin,
                user.logged_in,
            )
        })
        .collect();
    let body = format!(
        r#"<h2>Users</h2>
        <table>
            <tr><th>Username</th><th>E-mail</th><th>Confirmed</th><th>Admin</th><th>Logged in</th><th></th></tr>
            {rows}
        </table>
        <p><a href="/">Home</a></p>"#
    );
    page("Admin", &body)
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
