//! Synadia Cloud payloads
//!
//! Every request carries the caller's Synadia Cloud API token and base URL;
//! the backend performs the actual Synadia Cloud call on the caller's behalf.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default Synadia Cloud API endpoint
pub const SYNADIA_CLOUD_BASE_URL: &str = "https://cloud.synadia.com";

/// Synadia Cloud API credentials sent with every request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynadiaAccess {
    pub saas_key: String,
    pub base_url: String,
}

impl SynadiaAccess {
    pub fn new(saas_key: impl Into<String>) -> Self {
        Self {
            saas_key: saas_key.into(),
            base_url: SYNADIA_CLOUD_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

// =============================================================================
// Requests
// =============================================================================

/// One request struct per endpoint: the access credentials flattened in,
/// followed by the endpoint's scoping ids.
macro_rules! synadia_requests {
    ($(
        $(#[$doc:meta])*
        $name:ident { $($field:ident),* }
    )*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
            pub struct $name {
                #[serde(flatten)]
                pub access: SynadiaAccess,
                $(pub $field: String,)*
            }

            impl $name {
                pub fn new(access: SynadiaAccess $(, $field: impl Into<String>)*) -> Self {
                    Self {
                        access,
                        $($field: $field.into(),)*
                    }
                }
            }
        )*
    };
}

synadia_requests! {
    ListTeamsRequest {}
    GetVersionRequest {}
    GetTeamRequest { team_id }
    GetTeamLimitsRequest { team_id }
    ListInfoAppUsersTeamRequest { team_id }
    ListPersonalAccessTokensRequest { team_id }
    ListTeamServerAccountsRequest { team_id }
    ListSystemsRequest { team_id }
    GetSystemRequest { system_id }
    GetSystemLimitsRequest { system_id }
    ListSystemAccountInfoRequest { system_id }
    ListSystemServerInfoRequest { system_id }
    ListAccountsRequest { system_id }
    /// Scoped to one account
    ListNatsUsersRequest { account_id }
    /// Scoped to one personal access token
    GetPersonalAccessTokenRequest { token_id }
}

// =============================================================================
// Replies
// =============================================================================

/// A Synadia Cloud resource: identifier, optional name, everything else
/// kept as-is so new server fields survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Paged list of resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceList {
    #[serde(default)]
    pub items: Vec<Resource>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResourceList {
    /// Identifier of the first item, the usual input for a follow-up call
    pub fn first_id(&self) -> Option<&str> {
        self.items.first().map(|item| item.id.as_str())
    }
}

/// Limits attached to a team or a system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(flatten)]
    pub limits: Map<String, Value>,
}

impl Limits {
    /// Numeric limit by name
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.limits.get(name).and_then(Value::as_i64)
    }
}

/// Synadia Cloud version information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(default)]
    pub version: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub type ListTeamsReply = ResourceList;
pub type GetTeamReply = Resource;
pub type GetTeamLimitsReply = Limits;
pub type ListInfoAppUsersTeamReply = ResourceList;
pub type ListPersonalAccessTokensReply = ResourceList;
pub type GetPersonalAccessTokenReply = Resource;
pub type ListTeamServerAccountsReply = ResourceList;
pub type ListSystemsReply = ResourceList;
pub type GetSystemReply = Resource;
pub type GetSystemLimitsReply = Limits;
pub type ListSystemAccountInfoReply = ResourceList;
pub type ListSystemServerInfoReply = ResourceList;
pub type ListAccountsReply = ResourceList;
pub type ListNatsUsersReply = ResourceList;
pub type GetVersionReply = VersionInfo;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_request_wire_shape() {
        let request = GetTeamRequest::new(SynadiaAccess::new("uat_abc"), "team-42");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "saas_key": "uat_abc",
                "base_url": "https://cloud.synadia.com",
                "team_id": "team-42"
            })
        );
    }

    #[test]
    fn test_requests_with_same_shape_are_distinct_types() {
        use std::any::TypeId;

        assert_ne!(TypeId::of::<GetTeamRequest>(), TypeId::of::<ListSystemsRequest>());
        assert_ne!(TypeId::of::<GetSystemRequest>(), TypeId::of::<ListAccountsRequest>());
        assert_ne!(TypeId::of::<ListTeamsRequest>(), TypeId::of::<GetVersionRequest>());

        let access = SynadiaAccess::new("uat_abc");
        assert_eq!(
            serde_json::to_value(ListSystemsRequest::new(access.clone(), "team-1")).unwrap(),
            serde_json::to_value(GetTeamRequest::new(access, "team-1")).unwrap()
        );
    }

    #[test]
    fn test_resource_list_keeps_unknown_fields() {
        let list: ResourceList = serde_json::from_str(
            r#"{"items":[{"id":"team-42","name":"core","created":"2024-06-05"}],"next":"abc"}"#,
        )
        .unwrap();

        assert_eq!(list.first_id(), Some("team-42"));
        assert_eq!(list.items[0].name.as_deref(), Some("core"));
        assert_eq!(list.items[0].extra["created"], "2024-06-05");
        assert_eq!(list.extra["next"], "abc");
    }

    #[test]
    fn test_empty_list() {
        let list: ResourceList = serde_json::from_str("{}").unwrap();
        assert!(list.items.is_empty());
        assert_eq!(list.first_id(), None);
    }

    #[test]
    fn test_limits_lookup() {
        let limits: Limits =
            serde_json::from_str(r#"{"max_systems": 3, "tier": "starter"}"#).unwrap();
        assert_eq!(limits.get_i64("max_systems"), Some(3));
        assert_eq!(limits.get_i64("tier"), None);
    }
}
