use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The backend's description of the logged in user.
///
/// The shape of this object is owned by the server, so we only interpret the
/// handful of fields we actually need and carry everything else along
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(Map<String, Value>);

impl Profile {
    pub fn new(fields: Map<String, Value>) -> Self { Profile(fields) }

    pub fn id(&self) -> Option<i64> { self.0.get("id").and_then(Value::as_i64) }

    pub fn username(&self) -> Option<&str> {
        self.0.get("username").and_then(Value::as_str)
    }

    /// The subscription token which can be rotated with
    /// [`SessionStore::reset_credential()`](crate::SessionStore::reset_credential).
    pub fn token(&self) -> Option<&str> {
        self.0.get("token").and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> { self.0.get(field) }

    pub fn fields(&self) -> &Map<String, Value> { &self.0 }

    pub(crate) fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }
}

/// Proof that the user is logged in.
///
/// A [`Session`] only ever exists in its complete form. "Not logged in" is
/// represented by the absence of a [`Session`] (i.e. `None`), never by a
/// half-filled one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    profile: Profile,
}

impl Session {
    pub fn new(profile: Profile) -> Self { Session { profile } }

    pub fn profile(&self) -> &Profile { &self.profile }

    pub fn token(&self) -> Option<&str> { self.profile.token() }

    /// A copy of this session with the rotated token merged in, leaving every
    /// other profile field as-is.
    pub(crate) fn with_token(&self, token: &str) -> Session {
        self.with_field("token", token)
    }

    pub(crate) fn with_field(
        &self,
        field: &str,
        value: impl Into<Value>,
    ) -> Session {
        let mut profile = self.profile.clone();
        profile.set(field, value);
        Session { profile }
    }
}

#[cfg(test)]
pub(crate) fn sample_profile() -> Profile {
    serde_json::from_value(serde_json::json!({
        "id": 1,
        "username": "admin",
        "token": "0123456789abcdef",
        "created_at": "2024-01-01T00:00:00",
    }))
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_well_known_fields() {
        let profile = sample_profile();

        assert_eq!(profile.id(), Some(1));
        assert_eq!(profile.username(), Some("admin"));
        assert_eq!(profile.token(), Some("0123456789abcdef"));
        assert_eq!(
            profile.get("created_at"),
            Some(&Value::from("2024-01-01T00:00:00"))
        );
    }

    #[test]
    fn missing_fields_are_none() {
        let profile = Profile::default();

        assert_eq!(profile.id(), None);
        assert_eq!(profile.username(), None);
        assert_eq!(profile.token(), None);
    }

    #[test]
    fn rotating_the_token_leaves_other_fields_alone() {
        let original = Session::new(sample_profile());

        let got = original.with_token("fresh");

        assert_eq!(got.token(), Some("fresh"));
        assert_eq!(got.profile().username(), Some("admin"));
        assert_eq!(got.profile().id(), Some(1));
        assert_eq!(
            got.profile().get("created_at"),
            original.profile().get("created_at")
        );
        assert_eq!(original.token(), Some("0123456789abcdef"));
    }

    #[test]
    fn session_serializes_as_the_bare_profile() {
        let session = Session::new(sample_profile());

        let got = serde_json::to_value(&session).unwrap();

        assert_eq!(got, serde_json::to_value(sample_profile()).unwrap());
    }

    #[test]
    fn non_object_profiles_are_rejected() {
        assert!(serde_json::from_str::<Profile>("[1, 2, 3]").is_err());
        assert!(serde_json::from_str::<Profile>("\"admin\"").is_err());
    }
}
