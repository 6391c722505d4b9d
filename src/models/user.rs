use serde::{Deserialize, Serialize};

use super::shipping::LegalIdType;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileAddress {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub postal_code: Option<String>,
}

/// Authenticated user as returned by the merchant backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub is_admin: Option<bool>,
    pub shipping_address: Option<ProfileAddress>,
    pub legal_id: Option<String>,
    pub legal_id_type: Option<LegalIdType>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin") || self.is_admin.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_by_role_or_flag() {
        let by_role = UserProfile {
            role: Some("admin".into()),
            ..Default::default()
        };
        let by_flag = UserProfile {
            is_admin: Some(true),
            ..Default::default()
        };
        assert!(by_role.is_admin());
        assert!(by_flag.is_admin());
        assert!(!UserProfile::default().is_admin());
    }

    #[test]
    fn profile_parses_backend_shape() {
        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "_id": "u1",
            "name": "Ana",
            "email": "ana@example.com",
            "isAdmin": false,
            "shippingAddress": { "city": "Medellín", "postalCode": "050001" },
            "legalIdType": "CC"
        }))
        .unwrap();
        assert_eq!(profile.id.as_deref(), Some("u1"));
        assert_eq!(
            profile.shipping_address.unwrap().postal_code.as_deref(),
            Some("050001")
        );
        assert_eq!(profile.legal_id_type, Some(LegalIdType::Cc));
    }
}
