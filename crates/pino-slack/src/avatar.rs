//! Avatar URLs for impersonated posts

use md5::{Digest, Md5};

/// Gravatar identicon URL derived from the MD5 of `username`.
///
/// The URL shape is fixed: `http://www.gravatar.com/avatar/<hex md5>?d=identicon`.
pub fn generate_avatar_url(username: &str) -> String {
    let digest = Md5::digest(username.as_bytes());
    format!(
        "http://www.gravatar.com/avatar/{}?d=identicon",
        hex::encode(digest)
    )
}
