//! Domain types for the Estate listing client.
//!
//! Wire shapes that vary between legacy and current records (addresses,
//! images, agent references) are normalized here at decode time, so
//! everything downstream sees exactly one representation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Agent,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Buyer => "buyer",
            Self::Agent => "agent",
            Self::Admin => "admin",
        })
    }
}

/// The signed-in user. Lives in memory only; the bearer token is stored
/// separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
}

/// Local-only partial update of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl Session {
    pub fn merge(&mut self, patch: SessionPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Postal address. Legacy records carry a single free-form string, which
/// lands in `line1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "AddressWire")]
pub struct Address {
    pub line1: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl Address {
    /// Comma-joined non-empty parts, in postal order.
    pub fn one_line(&self) -> String {
        [
            &self.line1,
            &self.street,
            &self.city,
            &self.state,
            &self.zip_code,
            &self.country,
        ]
        .into_iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AddressWire {
    Line(String),
    Fields(AddressFields),
    Null,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct AddressFields {
    line1: String,
    street: String,
    city: String,
    state: String,
    #[serde(alias = "zip", alias = "postalCode")]
    zip_code: String,
    country: String,
}

impl From<AddressWire> for Address {
    fn from(wire: AddressWire) -> Self {
        match wire {
            AddressWire::Line(line1) => Self {
                line1,
                ..Self::default()
            },
            AddressWire::Fields(f) => Self {
                line1: f.line1,
                street: f.street,
                city: f.city,
                state: f.state,
                zip_code: f.zip_code,
                country: f.country,
            },
            AddressWire::Null => Self::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// A listing photo. Bare URL strings decode as non-primary images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ImageWire")]
pub struct Image {
    pub url: String,
    pub is_primary: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImageWire {
    Url(String),
    Object {
        url: String,
        #[serde(default, rename = "isPrimary")]
        is_primary: bool,
    },
}

impl From<ImageWire> for Image {
    fn from(wire: ImageWire) -> Self {
        match wire {
            ImageWire::Url(url) => Self {
                url,
                is_primary: false,
            },
            ImageWire::Object { url, is_primary } => Self { url, is_primary },
        }
    }
}

/// New image bytes attached to a create/update submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default)]
    pub license_number: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// A property's agent: either just an id or the populated record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentRef {
    Id(String),
    Populated(Agent),
}

impl AgentRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Populated(agent) => &agent.id,
        }
    }

    pub fn agent(&self) -> Option<&Agent> {
        match self {
            Self::Id(_) => None,
            Self::Populated(agent) => Some(agent),
        }
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyStatus {
    #[default]
    #[serde(rename = "For Sale")]
    ForSale,
    #[serde(rename = "For Rent")]
    ForRent,
    Sold,
    Rented,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForSale => "For Sale",
            Self::ForRent => "For Rent",
            Self::Sold => "Sold",
            Self::Rented => "Rented",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "for sale" | "sale" => Some(Self::ForSale),
            "for rent" | "rent" => Some(Self::ForRent),
            "sold" => Some(Self::Sold),
            "rented" => Some(Self::Rented),
            _ => None,
        }
    }
}

impl std::fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A listing as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: PropertyStatus,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    #[serde(default)]
    pub area: f64,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub amenities: BTreeSet<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentRef>,
    #[serde(default)]
    pub featured: bool,
}

impl Property {
    /// First image flagged primary, else the first image.
    pub fn primary_image(&self) -> Option<&Image> {
        self.images
            .iter()
            .find(|img| img.is_primary)
            .or_else(|| self.images.first())
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.agent.as_ref().map(AgentRef::id)
    }

    /// Record implied by a successful write whose response omitted the body.
    pub fn from_draft(id: impl Into<String>, draft: &PropertyDraft) -> Self {
        Self {
            id: id.into(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            kind: draft.kind.clone(),
            status: draft.status,
            price: draft.price,
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            area: draft.area,
            address: draft.address.clone(),
            amenities: draft.amenities.clone(),
            images: draft.images.clone(),
            agent: draft.agent.clone().map(AgentRef::Id),
            featured: draft.featured,
        }
    }
}

/// Write shape for create and update.
///
/// `uploads` never goes into the JSON body; when present the submission is
/// sent as a multipart form instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDraft {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: PropertyStatus,
    pub price: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area: f64,
    pub address: Address,
    pub amenities: BTreeSet<String>,
    pub images: Vec<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub featured: bool,
    #[serde(skip)]
    pub uploads: Vec<ImageUpload>,
}

impl From<&Property> for PropertyDraft {
    fn from(p: &Property) -> Self {
        Self {
            title: p.title.clone(),
            description: p.description.clone(),
            kind: p.kind.clone(),
            status: p.status,
            price: p.price,
            bedrooms: p.bedrooms,
            bathrooms: p.bathrooms,
            area: p.area,
            address: p.address.clone(),
            amenities: p.amenities.clone(),
            images: p.images.clone(),
            agent: p.agent_id().map(str::to_owned),
            featured: p.featured,
            uploads: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_properties: u64,
    pub total_users: u64,
    pub total_agents: u64,
    pub total_inquiries: u64,
    pub properties_by_status: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_string_address_lands_in_line1() {
        let p: Property = serde_json::from_value(json!({
            "_id": "p1",
            "title": "Loft",
            "address": "12 Dock Road, Leith"
        }))
        .unwrap();
        assert_eq!(p.id, "p1");
        assert_eq!(p.address.line1, "12 Dock Road, Leith");
        assert!(p.address.city.is_empty());
    }

    #[test]
    fn structured_address_and_one_line() {
        let p: Property = serde_json::from_value(json!({
            "id": "p2",
            "address": {
                "line1": "Flat 3",
                "street": "Elm St",
                "city": "Pune",
                "state": "MH",
                "zipCode": "411001",
                "country": "India"
            }
        }))
        .unwrap();
        assert_eq!(p.address.zip_code, "411001");
        assert_eq!(
            p.address.one_line(),
            "Flat 3, Elm St, Pune, MH, 411001, India"
        );
    }

    #[test]
    fn null_address_is_empty() {
        let p: Property = serde_json::from_value(json!({ "id": "p3", "address": null })).unwrap();
        assert_eq!(p.address, Address::default());
    }

    #[test]
    fn mixed_image_shapes() {
        let p: Property = serde_json::from_value(json!({
            "id": "p4",
            "images": [
                "https://cdn/x.jpg",
                { "url": "https://cdn/y.jpg", "isPrimary": true }
            ]
        }))
        .unwrap();
        assert_eq!(p.images.len(), 2);
        assert!(!p.images[0].is_primary);
        assert_eq!(p.primary_image().unwrap().url, "https://cdn/y.jpg");
    }

    #[test]
    fn primary_image_falls_back_to_first() {
        let p: Property = serde_json::from_value(json!({
            "id": "p5",
            "images": ["a.jpg", "b.jpg"]
        }))
        .unwrap();
        assert_eq!(p.primary_image().unwrap().url, "a.jpg");
    }

    #[test]
    fn agent_ref_id_or_populated() {
        let by_id: Property =
            serde_json::from_value(json!({ "id": "p6", "agent": "a1" })).unwrap();
        assert_eq!(by_id.agent_id(), Some("a1"));

        let populated: Property = serde_json::from_value(json!({
            "id": "p7",
            "agent": { "_id": "a2", "name": "Ravi", "licenseNumber": "L-9" }
        }))
        .unwrap();
        assert_eq!(populated.agent_id(), Some("a2"));
        let agent = populated.agent.as_ref().and_then(AgentRef::agent).unwrap();
        assert_eq!(agent.license_number, "L-9");
        assert!(agent.active);
    }

    #[test]
    fn status_wire_names() {
        let p: Property =
            serde_json::from_value(json!({ "id": "p8", "status": "For Rent" })).unwrap();
        assert_eq!(p.status, PropertyStatus::ForRent);
        assert_eq!(
            serde_json::to_value(PropertyStatus::ForSale).unwrap(),
            json!("For Sale")
        );
        assert_eq!(PropertyStatus::parse("for-rent"), Some(PropertyStatus::ForRent));
        assert!(PropertyStatus::parse("leased").is_none());
    }

    #[test]
    fn amenities_collapse_duplicates() {
        let p: Property = serde_json::from_value(json!({
            "id": "p9",
            "amenities": ["pool", "gym", "pool"]
        }))
        .unwrap();
        assert_eq!(p.amenities.len(), 2);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let res: Result<Session, _> =
            serde_json::from_value(json!({ "id": "u1", "role": "landlord" }));
        assert!(res.is_err());
    }

    #[test]
    fn session_merge_is_partial() {
        let mut s = Session {
            id: "u1".into(),
            name: "A".into(),
            email: "a@b.com".into(),
            role: Role::Buyer,
        };
        s.merge(SessionPatch {
            name: Some("Asha".into()),
            ..SessionPatch::default()
        });
        assert_eq!(s.name, "Asha");
        assert_eq!(s.email, "a@b.com");
        assert_eq!(s.role, Role::Buyer);
    }

    #[test]
    fn draft_json_skips_uploads() {
        let draft = PropertyDraft {
            title: "Villa".into(),
            uploads: vec![ImageUpload {
                file_name: "a.jpg".into(),
                content_type: "image/jpeg".into(),
                bytes: vec![1, 2, 3],
            }],
            ..PropertyDraft::default()
        };
        let v = serde_json::to_value(&draft).unwrap();
        assert_eq!(v["title"], "Villa");
        assert_eq!(v["status"], "For Sale");
        assert!(v.get("uploads").is_none());
        assert!(v.get("agent").is_none());
    }

    #[test]
    fn stats_default_missing_counters() {
        let s: DashboardStats =
            serde_json::from_value(json!({ "totalProperties": 42 })).unwrap();
        assert_eq!(s.total_properties, 42);
        assert_eq!(s.total_agents, 0);
    }
}
