//! Server-rendered page shells
//!
//! The landing page, the per-role sign-in forms and one dashboard shell per
//! role. The gatekeeper screens dashboard requests first and each dashboard
//! handler checks the role rules again for the page it renders.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Html,
    routing::get,
};
use schoolhub_db::Role;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

use super::management::RequireSession;

#[derive(Deserialize)]
struct LoginPageQuery {
    error: Option<String>,
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{} | SchoolHub</title></head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        body
    ))
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::SuperAdmin => "Super Admin",
        Role::SchoolAdmin => "School Admin",
        Role::Lecturer => "Lecturer",
        Role::Student => "Student",
        Role::Staff => "Staff",
    }
}

/// GET /
async fn landing() -> Html<String> {
    let links: String = Role::ALL
        .iter()
        .map(|role| {
            format!(
                "<li><a href=\"/login/{}\">{} sign in</a></li>",
                role.slug(),
                role_label(*role)
            )
        })
        .collect();
    layout("Welcome", &format!("<h1>SchoolHub</h1>\n<ul>{}</ul>", links))
}

fn login_page(role: Option<Role>, error: Option<&str>) -> Html<String> {
    let heading = match role {
        Some(role) => format!("{} sign in", role_label(role)),
        None => "Sign in".to_string(),
    };
    let hint = role
        .map(|r| format!("<input type=\"hidden\" name=\"role\" value=\"{}\">", r.slug()))
        .unwrap_or_default();
    let error = error
        .map(|e| format!("<p class=\"error\" role=\"alert\">{}</p>", escape_html(e)))
        .unwrap_or_default();

    layout(
        &heading,
        &format!(
            "<h1>{}</h1>\n{}\n<form method=\"post\" action=\"/login\">\n{}\
             <label>Email or username <input name=\"identifier\" autocomplete=\"username\"></label>\n\
             <label>Password <input type=\"password\" name=\"password\" autocomplete=\"current-password\"></label>\n\
             <button type=\"submit\">Sign in</button>\n</form>",
            escape_html(&heading),
            error,
            hint
        ),
    )
}

/// GET /login
async fn generic_login(Query(query): Query<LoginPageQuery>) -> Html<String> {
    login_page(None, query.error.as_deref())
}

/// GET /login/{role}
async fn role_login(
    Path(role): Path<String>,
    Query(query): Query<LoginPageQuery>,
) -> Result<Html<String>, ApiError> {
    let role = role
        .parse::<Role>()
        .map_err(|_| ApiError::NotFound(format!("Login page: {}", role)))?;
    Ok(login_page(Some(role), query.error.as_deref()))
}

/// GET /login/{role}/forgot-password
async fn forgot_password(Path(role): Path<String>) -> Result<Html<String>, ApiError> {
    let role = role
        .parse::<Role>()
        .map_err(|_| ApiError::NotFound(format!("Login page: {}", role)))?;
    let heading = format!("{} password reset", role_label(role));
    Ok(layout(
        &heading,
        &format!(
            "<h1>{}</h1>\n<p>Contact your school administrator to reset your password.</p>\n<p><a href=\"/login/{}\">Back to sign in</a></p>",
            escape_html(&heading),
            role.slug()
        ),
    ))
}

/// Dashboards re-check the role rules on the decoded path they serve.
/// The gate may have let the request through as exempt (any path with a
/// `.` in it), so it cannot be relied on alone.
fn ensure_permitted(state: &AppState, path: &str, session: &RequireSession) -> Result<(), ApiError> {
    let RequireSession(claims) = session;
    if state.gate.permits(path, claims.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

fn dashboard(title: &str, session: &RequireSession) -> Html<String> {
    let RequireSession(claims) = session;
    layout(
        title,
        &format!(
            "<h1>{}</h1>\n<p>Signed in as {} ({})</p>\n<form method=\"post\" action=\"/logout\"><button type=\"submit\">Sign out</button></form>",
            escape_html(title),
            escape_html(&claims.name),
            role_label(claims.role)
        ),
    )
}

/// GET /super-admin
async fn super_admin(
    session: RequireSession,
    State(state): State<AppState>,
) -> Result<Html<String>, ApiError> {
    ensure_permitted(&state, "/super-admin", &session)?;
    Ok(dashboard("Platform administration", &session))
}

/// GET /{school_id}/{section}
async fn school_section(
    session: RequireSession,
    State(state): State<AppState>,
    Path((school_id, section)): Path<(String, String)>,
) -> Result<Html<String>, ApiError> {
    let title = match section.as_str() {
        "admin" => "School administration",
        "lecturer" => "Lecturer dashboard",
        "student" => "Student dashboard",
        "staff" => "Staff dashboard",
        _ => return Err(ApiError::NotFound(format!("Page: /{}/{}", school_id, section))),
    };
    ensure_permitted(&state, &format!("/{}/{}", school_id, section), &session)?;
    Ok(dashboard(&format!("{} - {}", title, school_id), &session))
}

/// Create page routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/login", get(generic_login))
        .route("/login/{role}", get(role_login))
        .route("/login/{role}/forgot-password", get(forgot_password))
        .route("/super-admin", get(super_admin))
        .route("/{school_id}/{section}", get(school_section))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#39;x&#39;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
        assert_eq!(escape_html("Ada Obi"), "Ada Obi");
    }

    #[test]
    fn test_login_page_carries_role_hint() {
        let Html(page) = login_page(Some(Role::SchoolAdmin), Some("<b>Invalid</b>"));
        assert!(page.contains("name=\"role\" value=\"school-admin\""));
        assert!(page.contains("&lt;b&gt;Invalid&lt;/b&gt;"));
        assert!(!page.contains("<b>Invalid"));

        let Html(page) = login_page(None, None);
        assert!(!page.contains("name=\"role\""));
    }
}
