use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_TRIBE_COUNT: u64 = 50;

pub const ALREADY_MEMBER_MESSAGE: &str = "Already a tribe member!";

pub const SOURCE_FOLLOW_SECTION: &str = "Follow Me Section";
pub const SOURCE_FOLLOW_FORM: &str = "Follow Form";
pub const SOURCE_CONTACT_FORM: &str = "Contact Form";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TribeCounter {
    pub count: u64,
    pub last_updated: DateTime<Utc>,
}

impl Default for TribeCounter {
    fn default() -> Self {
        Self {
            count: DEFAULT_TRIBE_COUNT,
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowerRecord {
    pub email: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl FollowerRecord {
    pub fn matches(&self, email: &str) -> bool {
        self.email.to_lowercase() == email.to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub name: String,
    pub email: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

// Request bodies read missing and `null` fields as empty strings so
// validation can answer with a 400 instead of the extractor's rejection.

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EmailRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ContactRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TribeCountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckFollowerResponse {
    pub is_follower: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddFollowerResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}
