use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Organizer account. The backend is inconsistent about the identifier
/// field (`organizer_ID`, `organizer_id`, `organizerId` or `id`, as a
/// string or a number); all of them land in `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOrganizer")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Organizer {
    pub id: String,
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub contact_no: String,
}

impl Organizer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.fname, self.lname).trim().to_string()
    }
}

#[derive(Deserialize)]
struct RawOrganizer {
    #[serde(rename = "organizer_ID", default, deserialize_with = "deserialize_opt_id")]
    organizer_id_upper: Option<String>,
    #[serde(rename = "organizer_id", default, deserialize_with = "deserialize_opt_id")]
    organizer_id_snake: Option<String>,
    #[serde(rename = "organizerId", default, deserialize_with = "deserialize_opt_id")]
    organizer_id_camel: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    id: Option<String>,
    #[serde(default)]
    fname: String,
    #[serde(default)]
    lname: String,
    #[serde(default)]
    email: String,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    contact_no: Option<String>,
}

impl TryFrom<RawOrganizer> for Organizer {
    type Error = String;

    fn try_from(raw: RawOrganizer) -> Result<Self, Self::Error> {
        let id = raw
            .organizer_id_upper
            .or(raw.organizer_id_snake)
            .or(raw.organizer_id_camel)
            .or(raw.id)
            .ok_or_else(|| "organizer record has no identifier".to_string())?;
        Ok(Self {
            id,
            fname: raw.fname,
            lname: raw.lname,
            email: raw.email,
            contact_no: raw.contact_no.unwrap_or_default(),
        })
    }
}

/// Accept a string or number (or null) and normalize to a string.
pub(crate) fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Registration payload.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrganizer {
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub contact_no: String,
    pub password: String,
}

impl NewOrganizer {
    /// Client-side checks the registration form performs before posting.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            &self.fname,
            &self.lname,
            &self.email,
            &self.contact_no,
            &self.password,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err("Fname, Lname, Email, Contact No, and Password are required.".to_string());
        }
        if !is_valid_email(&self.email) {
            return Err("Please enter a valid email address.".to_string());
        }
        Ok(())
    }
}

/// Profile edit payload. Blank fields are left out so the backend keeps
/// the current value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrganizerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl OrganizerUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref email) = self.email {
            if !is_valid_email(email) {
                return Err("Please enter a valid email address.".to_string());
            }
        }
        if let Some(ref contact) = self.contact_no {
            if !is_valid_contact_no(contact) {
                return Err("Contact number must be 10 digits.".to_string());
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.fname.is_none()
            && self.lname.is_none()
            && self.email.is_none()
            && self.contact_no.is_none()
            && self.password.is_none()
    }
}

/// `local@domain.tld` with no whitespace.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn is_valid_contact_no(contact: &str) -> bool {
    contact.len() == 10 && contact.chars().all(|c| c.is_ascii_digit())
}
