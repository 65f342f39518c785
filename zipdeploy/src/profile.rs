//! Publish profile parsing
//!
//! A publish profile is the XML bundle a hosting provider hands out for
//! deploying an app. It holds one `publishProfile` element per deployment
//! method, each carrying the endpoint and the credentials for that method:
//!
//! ```xml
//! <publishData>
//!   <publishProfile publishMethod="MSDeploy" publishUrl="app.scm.example.net:443"
//!                   userName="$app" userPWD="..."/>
//!   <publishProfile publishMethod="FTP" .../>
//! </publishData>
//! ```

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use secrecy::SecretString;

use crate::errors::DeployError;

/// Publish method whose credentials are accepted by the zip deploy endpoint
pub const ZIP_DEPLOY_PUBLISH_METHOD: &str = "MSDeploy";

const PROFILE_ELEMENT: &[u8] = b"publishProfile";
const ATTR_PUBLISH_METHOD: &str = "publishMethod";
const ATTR_PUBLISH_URL: &str = "publishUrl";
const ATTR_USER_NAME: &str = "userName";
const ATTR_USER_PWD: &str = "userPWD";

/// Endpoint and credentials taken from one `publishProfile` element
#[derive(Debug, Clone)]
pub struct PublishProfile {
    /// Deployment endpoint, usually `host:port`
    pub publish_url: String,

    /// Basic auth user
    pub user_name: String,

    /// Basic auth password
    pub user_pwd: SecretString,
}

impl PublishProfile {
    /// Deployment host with any `:port` suffix removed
    pub fn host(&self) -> &str {
        self.publish_url
            .split(':')
            .next()
            .unwrap_or_default()
            .trim()
    }
}

/// Extract the credentials of the first profile using `publish_method`.
///
/// The whole document is read so malformed XML is rejected even when the
/// matching profile comes before the syntax error.
pub fn parse_publish_profile(
    xml: &str,
    publish_method: &str,
) -> Result<PublishProfile, DeployError> {
    let mut reader = Reader::from_str(xml.trim_start_matches('\u{feff}'));

    let mut depth: usize = 0;
    let mut roots: usize = 0;
    let mut found: Option<PublishProfile> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            DeployError::InvalidProfile(format!(
                "{} at position {}",
                e,
                reader.error_position()
            ))
        })?;

        match event {
            Event::Start(e) => {
                if depth == 0 {
                    roots += 1;
                }
                if depth == 1 && found.is_none() {
                    found = match_profile(&e, publish_method)?;
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 0 {
                    roots += 1;
                }
                if depth == 1 && found.is_none() {
                    found = match_profile(&e, publish_method)?;
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(DeployError::InvalidProfile(
            "unexpected end of document: unclosed element".to_string(),
        ));
    }
    match roots {
        0 => {
            return Err(DeployError::InvalidProfile(
                "document has no root element".to_string(),
            ))
        }
        1 => {}
        _ => {
            return Err(DeployError::InvalidProfile(
                "document has more than one root element".to_string(),
            ))
        }
    }

    found.ok_or_else(|| DeployError::NoMatchingProfile(publish_method.to_string()))
}

/// Returns the profile if `element` is a `publishProfile` for `publish_method`.
fn match_profile(
    element: &BytesStart<'_>,
    publish_method: &str,
) -> Result<Option<PublishProfile>, DeployError> {
    if element.name().as_ref() != PROFILE_ELEMENT {
        return Ok(None);
    }

    let mut attributes = read_attributes(element)?;
    if attributes.get(ATTR_PUBLISH_METHOD).map(String::as_str) != Some(publish_method) {
        return Ok(None);
    }

    let mut take = |name: &str| {
        attributes.remove(name).ok_or_else(|| {
            DeployError::InvalidProfile(format!(
                "{} profile is missing the {} attribute",
                publish_method, name
            ))
        })
    };

    Ok(Some(PublishProfile {
        publish_url: take(ATTR_PUBLISH_URL)?,
        user_name: take(ATTR_USER_NAME)?,
        user_pwd: SecretString::from(take(ATTR_USER_PWD)?),
    }))
}

fn read_attributes(element: &BytesStart<'_>) -> Result<HashMap<String, String>, DeployError> {
    let mut attributes = HashMap::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| DeployError::InvalidProfile(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| DeployError::InvalidProfile(e.to_string()))?
            .into_owned();
        attributes.insert(key, value);
    }
    Ok(attributes)
}
