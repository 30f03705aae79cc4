//! Share links: identifier in the clear, key in the fragment
//!
//! ```text
//! https://burn.example/#<base64 key>?id=<secret id>
//!                      └──────── fragment ────────┘
//! ```
//!
//! Browsers and HTTP clients never send the fragment to a server, so the
//! key stays with whoever holds the link. The conventional
//! `origin/?id=<id>#<key>` layout is accepted when parsing.

use std::fmt;

use burn_core::SecretId;

use crate::error::LinkError;
use crate::keys::SymmetricKey;

const ID_PARAM: &str = "id";

/// A parsed or assembled share link.
#[derive(Debug, Clone)]
pub struct ShareLink {
    origin: String,
    id: SecretId,
    key: SymmetricKey,
}

impl ShareLink {
    /// Assemble a link for `id` under `origin`.
    ///
    /// Any path query or fragment already on `origin` is dropped so the key
    /// cannot end up anywhere but the fragment.
    pub fn new(origin: &str, id: SecretId, key: SymmetricKey) -> Self {
        let end = origin.find(['?', '#']).unwrap_or(origin.len());
        let origin = origin[..end].trim_end_matches('/').to_string();
        Self { origin, id, key }
    }

    /// Split a received link into its parts. Purely local.
    pub fn parse(link: &str) -> Result<Self, LinkError> {
        let link = link.trim();
        let (before, fragment) = link.split_once('#').ok_or(LinkError::MissingFragment)?;

        let (base, outer_query) = match before.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (before, None),
        };
        let (key_text, inner_query) = match fragment.split_once('?') {
            Some((key, query)) => (key, Some(query)),
            None => (fragment, None),
        };

        if key_text.is_empty() {
            return Err(LinkError::MissingKey);
        }
        let key = SymmetricKey::from_base64(key_text)?;
        if before.contains(key_text) {
            return Err(LinkError::KeyOutsideFragment);
        }

        let raw_id = inner_query
            .and_then(query_id)
            .or_else(|| outer_query.and_then(query_id))
            .ok_or(LinkError::MissingId)?;
        let id = SecretId::parse(raw_id).ok_or(LinkError::InvalidId)?;

        Ok(Self {
            origin: base.trim_end_matches('/').to_string(),
            id,
            key,
        })
    }

    pub fn id(&self) -> &SecretId {
        &self.id
    }

    pub fn key(&self) -> &SymmetricKey {
        &self.key
    }

    /// The part of the link that is safe to send to a server: the origin
    /// the secret was uploaded to.
    pub fn server_visible(&self) -> &str {
        &self.origin
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/#{}?{}={}",
            self.origin,
            self.key.to_base64(),
            ID_PARAM,
            self.id
        )
    }
}

fn query_id(query: &str) -> Option<&str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == ID_PARAM)
        .map(|(_, value)| value)
}
