//! Raw calls to the `/auth` routes.
//!
//! These don't touch any client-side state. Use the
//! [`SessionStore`](crate::SessionStore) to log in and out.

use crate::{
    session::Profile,
    transport::{Body, RequestOptions, Transport, TransportError},
};
use reqwest::Method;
use serde_derive::{Deserialize, Serialize};

/// Exchange a username and password for a session cookie.
///
/// A `401` here means the credentials were wrong, so the request is sent
/// anonymously and won't invalidate the current session.
pub async fn login(
    transport: &Transport,
    username: &str,
    password: &str,
) -> Result<LoginResponse, TransportError> {
    let data = LoginData { username, password };
    let body = transport
        .json(
            Method::POST,
            "/auth/login",
            Body::json(&data)?,
            &RequestOptions::anonymous(),
        )
        .await?;

    serde_json::from_value(body).map_err(Into::into)
}

/// Tell the server to forget our session cookie.
pub async fn logout(transport: &Transport) -> Result<(), TransportError> {
    transport
        .json(
            Method::POST,
            "/auth/logout",
            Body::Empty,
            &RequestOptions::anonymous(),
        )
        .await?;

    Ok(())
}

/// Ask the server who we are logged in as.
pub async fn me(transport: &Transport) -> Result<Profile, TransportError> {
    let body = transport.get("/auth/me").await?;
    serde_json::from_value(body).map_err(Into::into)
}

/// Generate a new subscription token, returning it.
pub async fn reset_token(
    transport: &Transport,
) -> Result<String, TransportError> {
    let body = transport.post_empty("/auth/reset-token").await?;
    let response: ResetTokenResponse = serde_json::from_value(body)?;

    Ok(response.token)
}

/// Swap the current password for a new one.
///
/// The server answers a wrong `old_password` with a `401`, which must not be
/// mistaken for an expired session, so this is sent anonymously too.
pub async fn change_password(
    transport: &Transport,
    old_password: &str,
    new_password: &str,
) -> Result<(), TransportError> {
    let data = ChangePasswordData {
        old_password,
        new_password,
    };
    transport
        .json(
            Method::POST,
            "/auth/change-password",
            Body::json(&data)?,
            &RequestOptions::anonymous(),
        )
        .await?;

    Ok(())
}

/// Rename the current user, returning the name the server settled on.
pub async fn change_username(
    transport: &Transport,
    username: &str,
) -> Result<String, TransportError> {
    let data = ChangeUsernameData { username };
    let body = transport.post("/auth/change-username", &data).await?;
    let response: ChangeUsernameResponse = serde_json::from_value(body)?;

    // the server doesn't echo the name back when nothing changed
    Ok(response.username.unwrap_or_else(|| username.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: Profile,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Copy, Clone, Serialize)]
struct LoginData<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct ResetTokenResponse {
    token: String,
}

#[derive(Debug, Copy, Clone, Serialize)]
struct ChangePasswordData<'a> {
    old_password: &'a str,
    new_password: &'a str,
}

#[derive(Debug, Copy, Clone, Serialize)]
struct ChangeUsernameData<'a> {
    username: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct ChangeUsernameResponse {
    #[serde(default)]
    username: Option<String>,
}
