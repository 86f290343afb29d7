//! `Authorization` header parsing

use base64::{engine::general_purpose::STANDARD, Engine};
use http::HeaderValue;

use crate::credential::Credential;
use crate::types::DenialReason;

/// Turn an `Authorization` header into a credential.
///
/// A missing header, or one without material after the scheme, yields the
/// anonymous credential so it takes the normal verification path. A `Basic`
/// header that cannot be decoded, or whose decoded form has no `:`, is
/// rejected outright. Every scheme other than `Basic` is a bearer token.
pub fn parse_authorization(value: Option<&HeaderValue>) -> Result<Credential, DenialReason> {
    let Some(value) = value else {
        return Ok(Credential::anonymous());
    };
    let value = value.to_str().map_err(|_| DenialReason::MalformedCredentials)?;

    let Some((scheme, material)) = value.trim().split_once(' ') else {
        return Ok(Credential::anonymous());
    };
    let material = material.trim();
    if material.is_empty() {
        return Ok(Credential::anonymous());
    }

    if scheme.eq_ignore_ascii_case("basic") {
        parse_basic(material)
    } else {
        Ok(Credential::bearer(material))
    }
}

fn parse_basic(material: &str) -> Result<Credential, DenialReason> {
    let decoded = STANDARD
        .decode(material)
        .map_err(|_| DenialReason::MalformedCredentials)?;
    let decoded = String::from_utf8(decoded).map_err(|_| DenialReason::MalformedCredentials)?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or(DenialReason::MalformedCredentials)?;
    Ok(Credential::username_password(username, password))
}
